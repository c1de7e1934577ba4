pub mod cli;
pub mod config;
pub mod core;
pub mod export;
pub mod logging;
pub mod search;
pub mod types;
pub mod version;

// 公開API
pub use config::AppConfig;
pub use export::{ExportJob, ExportOutcome, ExportReport};
pub use search::{ProcessOutcome, ResultSet, SearchSession};
pub use types::*;
