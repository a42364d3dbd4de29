//! # Observability
//!
//! Log output for the extension. The Lambda host captures stdout/stderr into
//! the function's log stream, so plain formatted lines are all that is needed.

pub mod logging;

pub use logging::init_tracing;
