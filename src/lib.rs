pub mod color;
pub mod dashboard;
pub mod error;
pub mod logging;
pub mod plugs;
pub mod policy;
pub mod registry;
pub mod remote;
pub mod selection;
pub mod settings;
pub mod sync;
pub mod web;

#[cfg(test)]
mod testing;

pub use dashboard::start_dashboard;
pub use error::{DashboardError, Result};
