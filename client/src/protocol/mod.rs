use std::time::Duration;

pub mod error;
pub mod hue;
pub mod messages;
pub mod shelly;

/// Upper bound on one HTTP exchange with a cloud server, a bridge or a plug.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
