//! Building blocks shared by the dispatchlint parsers.
//!
//! Every parsed value carries a [`Source`] so diagnostics can point at the
//! file and line it came from. The [`Scanner`] tokenises one logical line and
//! [`normalize_lines`] produces those logical lines from a file.

mod diagnostic;
mod environment;
mod line;
mod normalize;
mod scanner;
mod source;

pub use diagnostic::{Diagnostic, Diagnostics};
pub use environment::{Environment, Substitution};
pub use line::{lines_from_str, read_lines, LineRecord};
pub use normalize::{normalize_lines, ConfigLine, NormalizeOptions};
pub use scanner::{is_quote, is_quoted, strip_quotes, Dialect, Scanner};
pub use source::{Labeled, PropagateDefaults, Source, Value};
