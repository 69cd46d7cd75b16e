//! Startup completion barrier.

pub mod completion;

pub use completion::{CompletionBarrier, WaitOutcome};
