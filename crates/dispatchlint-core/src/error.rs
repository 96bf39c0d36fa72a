use std::path::PathBuf;

use dispatchlint_parser::ParseError;
use dispatchlint_rules::RuleLoadError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalyzeError {
    /// The top-level directory is absent or unreadable, or holds neither
    /// entry file.
    #[error("{path}: {reason}")]
    MissingConfiguration { path: PathBuf, reason: &'static str },

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Rules(#[from] RuleLoadError),
}
