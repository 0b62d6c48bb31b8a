//! Live registry of AIS targets: vessels, search-and-rescue transmitters and
//! aids to navigation, aged and evicted as they stop reporting.

pub mod config;
pub mod errors;
pub mod feed;
pub mod geo;
pub mod loops;
pub mod models;
pub mod mqtt;
pub mod persistence;
pub mod registry;
pub mod route;
pub mod status;
pub mod target;
pub mod trajectory;

pub use errors::RegistryError;
pub use models::{AisMessage, AisMessageType, Mmsi};
pub use registry::{TargetListener, TargetRegistry};
pub use target::{Target, TargetKind, TargetStatus};
