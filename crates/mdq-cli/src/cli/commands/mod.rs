//! One module per CLI command.

mod get;
mod trim;

pub use get::run_get;
pub use trim::run_trim;
