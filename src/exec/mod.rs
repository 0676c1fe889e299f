//! Process execution: the executor contract, the default OS-backed
//! implementation, and its file-output helpers.

mod default;
mod executor;
mod request;
pub mod rotate;
pub mod script;
mod tailer;

pub use default::DefaultExecutor;
pub use executor::Executor;
pub use request::{ExecutionRequest, ExecutionResult};
pub use tailer::{FileTailer, DEFAULT_POLL_INTERVAL};
