//! ripgrep-backed search: argument construction, output parsing, result
//! ordering and the session that drives them.

pub mod arguments;
pub mod outcome;
pub mod parser;
pub mod results;
pub mod session;

pub use arguments::{build_arguments, parse_type_filters, render_command_line, BUILTIN_EXCLUDES};
pub use outcome::{ProcessOutcome, NO_MATCHES_EXIT_CODE};
pub use parser::{is_noise_line, LineParser, ParseEvent};
pub use results::ResultSet;
pub use session::{SearchError, SearchNotification, SearchSession, SessionUpdate};
