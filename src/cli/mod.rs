//! Command-line interface components.

pub mod args;
pub mod logging;

pub use self::args::Args;
pub use self::logging::setup_logging;
