//! # Runtime Module
//!
//! Process lifecycle: startup, the event loop, shutdown coordination, and the
//! orchestration that ties them together.

pub mod event_loop;
pub mod extension;
pub mod initialization;
pub mod shutdown;

pub use event_loop::{EventLoop, LoopExit, LoopState, RegisteredEventLoop};
pub use extension::{run_extension, ExtensionOutcome};
pub use initialization::{initialize, run, Initialized};
pub use shutdown::{CancellationCause, CancellationCoordinator, CancellationSignal};
