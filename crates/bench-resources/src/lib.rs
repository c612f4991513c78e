//! Resource sampling for benchmark runs.
//!
//! A [`ResourceMonitor`] polls a [`ProcessProbe`] on a fixed interval while a
//! run is in progress and reduces the observations into [`ResourceStats`]
//! when stopped.

pub mod error;
pub mod monitor;
pub mod probe;

pub use error::ResourceError;
pub use monitor::{MonitorHandle, ResourceMonitor, ResourceStats, DEFAULT_SAMPLE_INTERVAL};
pub use probe::{ProcessProbe, ProcessSnapshot, SysinfoProbe};
