pub mod loader;
pub mod schema;

pub use loader::{load_from_path, load_from_str, ConfigError};
pub use schema::{
    builtin_formatters, FormatterSpec, ReformatConfig, SyncMode, ValidationError,
    ValidationIssue, C_EXTENSIONS, GO_EXTENSIONS,
};
