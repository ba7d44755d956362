use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DashboardError {
    #[error("Device {0} not found")]
    NotFound(String),
    #[error("Device {0} is already registered")]
    DuplicateDevice(String),
    #[error("Device {0} is not a {1}")]
    WrongKind(String, &'static str),
    #[error("Lamp {0} has a saved color and must be switched on through the color policy")]
    SavedColorPending(String),
    #[error("{0} {1} is out of range")]
    OutOfRange(&'static str, u32),
    #[error("Failed to read remote state: {0}")]
    RemoteFetch(String),
    #[error("Failed to send command: {0}")]
    RemoteWrite(String),
}

pub type Result<T> = std::result::Result<T, DashboardError>;
