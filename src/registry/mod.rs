//! The configuration registry: named configuration roots bound to a single
//! backing XML document.
//!
//! # Lifecycle
//! Roots are constructed with their declared defaults and registered under a
//! case-insensitive name (the first registration of a name wins).
//! [`ConfigurationRegistry::load_all`] then populates every root from the
//! document and, only once all of them are populated, notifies each root that
//! loading finished. After that the roots are read and written through
//! dotted paths ([`get_by_name`][ConfigurationRegistry::get_by_name],
//! [`set_by_name`][ConfigurationRegistry::set_by_name]) or updated in bulk
//! from a property tree ([`update_from_xml`][ConfigurationRegistry::update_from_xml]);
//! every mutation is persisted straight away.
//!
//! None of the operations here are safe to interleave. Every save reads the
//! whole document, changes it in memory and rewrites it in full.

mod root;

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

pub use self::root::{ConfigurationObserver, ConfigurationRoot, MigrationError, ObserverList};
use crate::binding::{
    check_members,
    codec,
    resolve_for_read,
    resolve_for_write,
    ConfigValue,
    Member,
};
use crate::errors::{ErrorList, OperationError};
use crate::xml::{XmlElement, XmlError};


/// Name of the root element of a freshly created backing document.
pub const DOCUMENT_ROOT: &str = "Configuration";


struct RegisteredConfiguration {
    key: String,
    root: Box<dyn ConfigurationRoot>,
}


pub struct ConfigurationRegistry {
    document_path: PathBuf,
    configurations: Vec<RegisteredConfiguration>,
}

impl ConfigurationRegistry {
    pub fn new<P: Into<PathBuf>>(document_path: P) -> Self {
        Self {
            document_path: document_path.into(),
            configurations: Vec::new(),
        }
    }

    pub fn document_path(&self) -> &Path {
        &self.document_path
    }

    /// Registered names, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.configurations
            .iter()
            .map(|configuration| configuration.key.as_str())
    }

    /// Registers `root` under `name`. Names are case-insensitive and the first
    /// registration of a name wins; returns whether `root` was registered.
    ///
    /// The root's catalog is checked against its member access first. Problems
    /// are logged and do not prevent the registration.
    pub fn register<R: ConfigurationRoot>(&mut self, name: &str, mut root: R) -> bool {
        let key = name.to_lowercase();

        if self.position(&key).is_some() {
            debug!(name, "Configuration is already registered, keeping the first one.");
            return false;
        }

        let mut problems = root.catalog().validate();
        problems.extend(check_members(&mut root));

        for problem in problems {
            warn!(name, %problem, "Configuration catalog is inconsistent.");
        }

        info!(name, root_name = root.root_name(), "Registered configuration.");
        self.configurations.push(RegisteredConfiguration {
            key,
            root: Box::new(root),
        });

        true
    }

    pub fn find_configuration(&self, name: &str) -> Option<&dyn ConfigurationRoot> {
        self.position(name)
            .map(|index| self.configurations[index].root.as_ref())
    }

    pub fn find_configuration_mut(
        &mut self,
        name: &str,
    ) -> Option<&mut (dyn ConfigurationRoot + 'static)> {
        let index = self.position(name)?;
        Some(self.configurations[index].root.as_mut())
    }

    /// Finds a configuration and downcasts it to its concrete type.
    pub fn find_as<R: ConfigurationRoot>(&self, name: &str) -> Option<&R> {
        self.find_configuration(name)?.as_any().downcast_ref::<R>()
    }

    pub fn find_as_mut<R: ConfigurationRoot>(&mut self, name: &str) -> Option<&mut R> {
        self.find_configuration_mut(name)?
            .as_any_mut()
            .downcast_mut::<R>()
    }

    fn position(&self, name: &str) -> Option<usize> {
        let key = name.to_lowercase();
        self.configurations
            .iter()
            .position(|configuration| configuration.key == key)
    }


    /// Populates every registered root from the backing document, then runs
    /// the loaded notifications.
    ///
    /// A missing document is reported; an empty or malformed one is ignored.
    pub fn load_all(&mut self, errors: &mut ErrorList) {
        let Some(document) = self.read_document(errors) else {
            return;
        };

        for configuration in &mut self.configurations {
            load_root(configuration.root.as_mut(), &document, errors);
        }

        info!("Broadcast configuration load.");
        for configuration in &mut self.configurations {
            configuration.root.on_loaded();
            configuration.root.observers().notify_loaded();
        }
    }

    /// Stores every registered root into the backing document and writes it.
    pub fn save_all(&self, errors: &mut ErrorList) {
        let Some(mut document) = self.read_document(errors) else {
            return;
        };

        for configuration in &self.configurations {
            store_root(configuration.root.as_ref(), &mut document, errors);
        }

        self.write_document(&document, errors);
    }

    fn save_configuration(&self, index: usize, errors: &mut ErrorList) {
        let Some(mut document) = self.read_document(errors) else {
            return;
        };

        store_root(self.configurations[index].root.as_ref(), &mut document, errors);
        self.write_document(&document, errors);
    }

    fn read_document(&self, errors: &mut ErrorList) -> Option<XmlElement> {
        if !self.document_path.is_file() {
            errors.push(OperationError::DocumentMissing {
                path: self.document_path.clone(),
            });
            return None;
        }

        match XmlElement::load(&self.document_path) {
            Ok(document) => Some(document),
            Err(source @ XmlError::Io(_)) => {
                errors.push(OperationError::DocumentAccess {
                    path: self.document_path.clone(),
                    source,
                });
                None
            }
            Err(error) => {
                warn!(
                    path = %self.document_path.display(),
                    %error,
                    "Backing document is empty or malformed, nothing to do."
                );
                None
            }
        }
    }

    fn write_document(&self, document: &XmlElement, errors: &mut ErrorList) {
        if let Err(source) = document.save(&self.document_path) {
            errors.push(OperationError::DocumentAccess {
                path: self.document_path.clone(),
                source,
            });
        }
    }


    /// Resolves `path` against the named configuration. Unknown names and
    /// unresolvable paths give `None`.
    pub fn get_by_name(&self, name: &str, path: &str) -> Option<Member<'_>> {
        let root = self.find_configuration(name)?;
        resolve_for_read(path, root)
    }

    /// Like [`get_by_name`][Self::get_by_name], but only for plain values.
    pub fn get_value_by_name(&self, name: &str, path: &str) -> Option<ConfigValue> {
        self.get_by_name(name, path)?.into_value()
    }

    /// Writes `value` to `path` on the named configuration and persists it.
    ///
    /// Unknown names are ignored. Returns whether the value was assigned; the
    /// change notifications and the save happen either way.
    pub fn set_by_name<V: Into<ConfigValue>>(&mut self, name: &str, path: &str, value: V) -> bool {
        info!(name, path, "Property update.");

        let Some(index) = self.position(name) else {
            debug!(name, "Property update for an unknown configuration ignored.");
            return false;
        };

        let root = self.configurations[index].root.as_mut();
        broadcast_change_start(root);
        let applied = resolve_for_write(path, root, value.into());

        let mut errors = ErrorList::new();
        self.save_configuration(index, &mut errors);
        for error in errors.iter() {
            warn!(name, code = error.code(), %error, "Failed to persist property update.");
        }

        broadcast_change_end(self.configurations[index].root.as_ref());

        applied
    }

    /// The property tree of the named configuration.
    pub fn export_as_xml(&self, name: &str) -> Option<String> {
        let root = self.find_configuration(name)?;

        match codec::format_object_as_xml(root, root.root_name()) {
            Ok(text) => Some(text),
            Err(error) => {
                warn!(name, %error, "Failed to format configuration as XML.");
                None
            }
        }
    }

    /// Applies a property-tree update to the named configuration and persists it.
    pub fn update_from_xml(&mut self, name: &str, text: &str, errors: &mut ErrorList) {
        info!(name, "Configuration change.");

        let Some(index) = self.position(name) else {
            warn!(name, "Update for a configuration that doesn't exist.");
            errors.push(OperationError::UnknownConfiguration {
                name: name.to_string(),
            });
            return;
        };

        let update = match XmlElement::parse(text) {
            Ok(update) => update,
            Err(source) => {
                errors.push(OperationError::MalformedUpdate {
                    name: name.to_string(),
                    source,
                });
                return;
            }
        };

        let root = self.configurations[index].root.as_mut();
        broadcast_change_start(root);
        codec::update_object_from_xml(root, &update);

        self.save_configuration(index, errors);
        broadcast_change_end(self.configurations[index].root.as_ref());
    }


    /// Runs the named configuration's import hook and persists the result.
    pub fn import(&mut self, name: &str, errors: &mut ErrorList) {
        let Some(index) = self.position(name) else {
            errors.push(OperationError::UnknownConfiguration {
                name: name.to_string(),
            });
            return;
        };

        let result = self.configurations[index].root.import(errors);
        if report_migration(name, "import", result, errors) {
            self.save_configuration(index, errors);
        }
    }

    /// Runs the named configuration's upgrade hook against the backing
    /// document and writes the upgraded document.
    pub fn upgrade(&mut self, name: &str, errors: &mut ErrorList) {
        let Some(index) = self.position(name) else {
            errors.push(OperationError::UnknownConfiguration {
                name: name.to_string(),
            });
            return;
        };

        let Some(mut document) = self.read_document(errors) else {
            return;
        };

        let result = self.configurations[index]
            .root
            .upgrade(&mut document, errors);

        if report_migration(name, "upgrade", result, errors) {
            self.write_document(&document, errors);
        }
    }

    /// Loads everything, runs every import hook and stores every root into
    /// the document, which is written once at the end.
    pub fn load_and_import(&mut self, errors: &mut ErrorList) {
        let Some(mut document) = self.read_document(errors) else {
            return;
        };

        self.load_all(errors);

        for configuration in &mut self.configurations {
            let result = configuration.root.import(errors);
            report_migration(&configuration.key, "import", result, errors);
            store_root(configuration.root.as_ref(), &mut document, errors);
        }

        self.write_document(&document, errors);
    }

    /// Runs every upgrade hook against the document, which is written once
    /// at the end.
    pub fn load_and_upgrade(&mut self, errors: &mut ErrorList) {
        let Some(mut document) = self.read_document(errors) else {
            return;
        };

        for configuration in &mut self.configurations {
            let result = configuration.root.upgrade(&mut document, errors);
            report_migration(&configuration.key, "upgrade", result, errors);
        }

        self.write_document(&document, errors);
    }
}


fn load_root(root: &mut dyn ConfigurationRoot, document: &XmlElement, errors: &mut ErrorList) {
    match document.child(root.root_name()) {
        Some(subtree) => codec::load_properties(root, subtree),
        None => debug!(
            root_name = root.root_name(),
            "Backing document has no subtree for this configuration, keeping defaults."
        ),
    }

    root.load_properties_inner(document, errors);
}

fn store_root(root: &dyn ConfigurationRoot, document: &mut XmlElement, errors: &mut ErrorList) {
    codec::store_properties(root, document.ensure_child(root.root_name()));
    root.store_properties_inner(document, errors);
}

fn broadcast_change_start(root: &dyn ConfigurationRoot) {
    info!(root_name = root.root_name(), "Broadcast config change start.");
    root.observers().notify_change_start();
}

fn broadcast_change_end(root: &dyn ConfigurationRoot) {
    info!(root_name = root.root_name(), "Broadcast config change end.");
    root.observers().notify_change_end();
}

fn report_migration(
    name: &str,
    operation: &'static str,
    result: Result<(), MigrationError>,
    errors: &mut ErrorList,
) -> bool {
    match result {
        Ok(()) => true,
        Err(MigrationError::NotSupported) => {
            errors.push(OperationError::NotSupported {
                name: name.to_string(),
                operation,
            });
            false
        }
        Err(MigrationError::Failed(reason)) => {
            errors.push(OperationError::MigrationFailed {
                name: name.to_string(),
                operation,
                reason,
            });
            false
        }
    }
}
