//! Persistent, reflective hardware configuration.
//!
//! Named configuration roots are registered in a [`ConfigurationRegistry`]
//! and bound to a single XML backing document. Their members are described
//! by static catalogs ([`binding::Catalog`]), which drive defaulting,
//! persistence, introspection export, bulk updates and dotted-path access.
//!
//! The library only emits `tracing` events; installing a subscriber is up
//! to the embedding program.

pub mod binding;
pub mod errors;
pub mod files;
pub mod registry;
pub mod roots;
pub mod settings;
pub mod xml;

pub use errors::{ErrorList, OperationError};
pub use registry::{
    ConfigurationObserver,
    ConfigurationRegistry,
    ConfigurationRoot,
    MigrationError,
    ObserverList,
};
