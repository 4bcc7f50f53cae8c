//! The configuration roots shipped with the hardware abstraction layer.

pub mod controller;
pub mod service;

pub use controller::{ControllerConfiguration, Deck, DoorSettings, Slot};
pub use service::ServiceConfiguration;

use crate::registry::ConfigurationRegistry;


/// Registers every built-in root under its root name.
pub fn register_builtin(registry: &mut ConfigurationRegistry) {
    registry.register(controller::ROOT_NAME, ControllerConfiguration::new());
    registry.register(service::ROOT_NAME, ServiceConfiguration::new());
}
