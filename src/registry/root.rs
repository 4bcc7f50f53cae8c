//! The contract every configuration root implements, and its observers.

use std::any::Any;
use std::sync::Arc;

use thiserror::Error;
use tracing::trace;

use crate::binding::Reflect;
use crate::errors::ErrorList;
use crate::xml::XmlElement;


/// Receives lifecycle notifications from a single configuration root.
pub trait ConfigurationObserver: Send + Sync {
    fn configuration_loaded(&self) {}

    fn configuration_change_start(&self) {}

    fn configuration_change_end(&self) {}
}


/// The subscribers of one configuration root, notified synchronously in the
/// order they were added.
#[derive(Default, Clone)]
pub struct ObserverList {
    observers: Vec<Arc<dyn ConfigurationObserver>>,
}

impl ObserverList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, observer: Arc<dyn ConfigurationObserver>) {
        self.observers.push(observer);
    }

    /// Removes the given observer. Returns whether it was subscribed.
    pub fn remove(&mut self, observer: &Arc<dyn ConfigurationObserver>) -> bool {
        let count_before = self.observers.len();
        self.observers
            .retain(|subscribed| !Arc::ptr_eq(subscribed, observer));

        self.observers.len() != count_before
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    pub fn notify_loaded(&self) {
        trace!(observers = self.observers.len(), "Notifying configuration loaded.");
        for observer in &self.observers {
            observer.configuration_loaded();
        }
    }

    pub fn notify_change_start(&self) {
        trace!(observers = self.observers.len(), "Notifying configuration change start.");
        for observer in &self.observers {
            observer.configuration_change_start();
        }
    }

    pub fn notify_change_end(&self) {
        trace!(observers = self.observers.len(), "Notifying configuration change end.");
        for observer in &self.observers {
            observer.configuration_change_end();
        }
    }
}

impl std::fmt::Debug for ObserverList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverList")
            .field("observers", &self.observers.len())
            .finish()
    }
}


/// Why a one-time migration hook did not run.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MigrationError {
    #[error("not supported")]
    NotSupported,

    #[error("{0}")]
    Failed(String),
}


/// A named, independently persisted configuration object.
///
/// Its config properties live in the backing document under an element
/// named [`root_name`][ConfigurationRoot::root_name], one leaf per property.
pub trait ConfigurationRoot: Reflect + Any {
    fn root_name(&self) -> &str;

    fn observers(&self) -> &ObserverList;

    fn observers_mut(&mut self) -> &mut ObserverList;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn add_observer(&mut self, observer: Arc<dyn ConfigurationObserver>) {
        self.observers_mut().add(observer);
    }

    fn remove_observer(&mut self, observer: &Arc<dyn ConfigurationObserver>) -> bool {
        self.observers_mut().remove(observer)
    }

    /// Runs after every registered root has been loaded, before this root's
    /// observers are notified.
    fn on_loaded(&mut self) {}

    /// Reads structured state the flat property leaves cannot express.
    /// Runs after the config properties have been loaded.
    fn load_properties_inner(&mut self, _document: &XmlElement, _errors: &mut ErrorList) {}

    /// Writes structured state the flat property leaves cannot express.
    /// Runs after the config properties have been stored.
    fn store_properties_inner(&self, _document: &mut XmlElement, _errors: &mut ErrorList) {}

    /// One-time import of settings from a previous installation.
    fn import(&mut self, _errors: &mut ErrorList) -> Result<(), MigrationError> {
        Err(MigrationError::NotSupported)
    }

    /// Rewrites an older backing document layout into the current one.
    fn upgrade(
        &mut self,
        _document: &mut XmlElement,
        _errors: &mut ErrorList,
    ) -> Result<(), MigrationError> {
        Err(MigrationError::NotSupported)
    }
}
