use std::io;
use std::path::PathBuf;

use dispatchlint_syntax::Source;
use thiserror::Error;

/// Conditions that abort a whole parse run.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("include depth exceeds the maximum of {max} while including {path}")]
    IncludeDepthExceeded { max: usize, path: PathBuf },

    #[error("configuration exceeds the maximum of {max} lines while reading {path}")]
    LineLimitExceeded { max: usize, path: PathBuf },

    #[error("{location}: include '{include}' does not match any file")]
    IncludeNotFound { include: String, location: Source },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
