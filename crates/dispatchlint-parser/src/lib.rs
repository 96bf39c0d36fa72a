//! Parsers for dispatcher farm files and Apache httpd configuration.
//!
//! Both dialects are read through a [`ParseSession`], which owns the include
//! resolver, the `${NAME}` environment, the recoverable diagnostics and the
//! include and line ceilings. Only the conditions listed in [`ParseError`]
//! abort a parse; everything else is recorded and skipped.

mod builder;
mod dispatcher;
mod error;
mod httpd;
pub mod model;
mod reader;
mod session;

pub use builder::{build_dispatcher_config, parse_block, parse_labeled_list};
pub use dispatcher::{build_from_lines, load_dispatcher_lines, parse_dispatcher};
pub use error::ParseError;
pub use httpd::{parse_httpd, Directive, HttpdConfig};
pub use model::{DispatcherConfig, Farm, FarmType, FilterRule, FilterType};
pub use reader::{parse_boolean, ConfigurationReader, Cursor, Token};
pub use session::ParseSession;
