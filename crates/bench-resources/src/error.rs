use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResourceError {
    /// The current process could not be inspected.
    #[error("Process metrics unavailable: {0}")]
    Unavailable(String),
}
