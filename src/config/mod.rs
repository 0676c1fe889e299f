//! Configuration: the resolved model the runtime consumes, the JSON
//! procfile loader that produces it, and sample emission.

pub mod loader;
mod model;
pub mod sample;

pub use model::{
    OutputPolicy, ProcessKey, ResolvedProcess, ResolvedProcessConfig, ResolvedProcessGroup,
    RestartMode, RestartPolicy,
};
