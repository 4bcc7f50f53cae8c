//! The contract of configuration *files* as seen by backup/restore and
//! hardware-revision migration tooling.
//!
//! Those layers live outside this crate. Only the backing XML document is
//! described here; it can be validated but neither imported into nor
//! converted by this crate.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::errors::{ErrorList, OperationError};
use crate::xml::XmlElement;


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigurationFileKind {
    /// The XML document backing the configuration registry.
    Document,
    LegacySlotData,
    LegacySystemData,
}


/// A hardware revision a configuration file can be converted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HardwareRevision(pub String);


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionResult {
    Success,
    InvalidFile,
    NotSupported,
}


pub trait ConfigurationFile {
    fn kind(&self) -> ConfigurationFileKind;

    fn file_name(&self) -> &str;

    fn full_source_path(&self) -> &Path;

    fn import_from(&mut self, other: &dyn ConfigurationFile, errors: &mut ErrorList);

    fn convert_to(&mut self, target: &HardwareRevision, errors: &mut ErrorList) -> ConversionResult;
}


/// The backing document of a [`ConfigurationRegistry`][crate::registry::ConfigurationRegistry].
#[derive(Debug, Clone)]
pub struct XmlConfigurationFile {
    full_source_path: PathBuf,
    file_name: String,
}

impl XmlConfigurationFile {
    pub fn new<P: Into<PathBuf>>(full_source_path: P) -> Self {
        let full_source_path = full_source_path.into();
        let file_name = full_source_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            full_source_path,
            file_name,
        }
    }
}

impl ConfigurationFile for XmlConfigurationFile {
    fn kind(&self) -> ConfigurationFileKind {
        ConfigurationFileKind::Document
    }

    fn file_name(&self) -> &str {
        &self.file_name
    }

    fn full_source_path(&self) -> &Path {
        &self.full_source_path
    }

    fn import_from(&mut self, other: &dyn ConfigurationFile, errors: &mut ErrorList) {
        errors.push(OperationError::NotSupported {
            name: other.file_name().to_string(),
            operation: "import into the configuration document",
        });
    }

    /// Validates the document. It has no revision-specific layout of its own,
    /// so a well-formed document converts without changes.
    fn convert_to(
        &mut self,
        target: &HardwareRevision,
        errors: &mut ErrorList,
    ) -> ConversionResult {
        if !self.full_source_path.is_file() {
            return ConversionResult::InvalidFile;
        }

        match XmlElement::load(&self.full_source_path) {
            Ok(_) => {
                debug!(revision = %target.0, "Configuration document needs no conversion.");
                ConversionResult::Success
            }
            Err(source) => {
                errors.push(OperationError::InvalidFile {
                    path: self.full_source_path.clone(),
                    source,
                });
                ConversionResult::InvalidFile
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn describes_the_backing_document() {
        let file = XmlConfigurationFile::new("/opt/hal/hal.xml");

        assert_eq!(file.kind(), ConfigurationFileKind::Document);
        assert_eq!(file.file_name(), "hal.xml");
        assert_eq!(file.full_source_path(), Path::new("/opt/hal/hal.xml"));
    }

    #[test]
    fn conversion_validates_the_document() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("hal.xml");
        let revision = HardwareRevision("rev-b".to_string());
        let mut file = XmlConfigurationFile::new(&path);
        let mut errors = ErrorList::new();

        assert_eq!(file.convert_to(&revision, &mut errors), ConversionResult::InvalidFile);
        assert!(errors.is_empty());

        fs::write(&path, "<Configuration><Controller").unwrap();
        assert_eq!(file.convert_to(&revision, &mut errors), ConversionResult::InvalidFile);
        assert!(errors.contains_code("C001"));

        fs::write(&path, "<Configuration/>").unwrap();
        assert_eq!(file.convert_to(&revision, &mut errors), ConversionResult::Success);
    }

    #[test]
    fn importing_other_files_is_not_supported() {
        let mut document = XmlConfigurationFile::new("hal.xml");
        let other = XmlConfigurationFile::new("legacy.xml");
        let mut errors = ErrorList::new();

        document.import_from(&other, &mut errors);

        assert!(errors.contains_code("M001"));
    }
}
