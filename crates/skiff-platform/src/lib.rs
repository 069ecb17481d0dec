//! Platform glue shared by the Skiff host applications:
//! - Per-application config/cache/data directory resolution.
//! - Log sink bootstrap (file logger plus terminal mirror in debug builds).

pub mod logging;
mod paths;

pub use paths::{AppPaths, AppPathsError};
