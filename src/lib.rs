#[path = "core/prng.rs"]
pub mod prng;

#[path = "core/topology.rs"]
pub mod topology;

#[path = "core/state.rs"]
pub mod state;

#[path = "core/stimulus.rs"]
pub mod stimulus;

#[path = "core/executor.rs"]
pub mod executor;

#[path = "core/driver.rs"]
pub mod driver;

#[cfg(feature = "gpu")]
#[path = "core/gpu.rs"]
pub mod gpu;

pub mod error;

pub use error::Error;
