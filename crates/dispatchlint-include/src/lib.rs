//! Include path resolution shared by the dispatcher and httpd parsers.

mod cache;
mod paths;
mod resolver;

pub use cache::ResolutionCache;
pub use paths::{has_pattern, normalize_path};
pub use resolver::{expand_brackets, PathResolver};
