use std::path::PathBuf;

use miette::{miette, Context, IntoDiagnostic, Result};
use serde::Deserialize;

use super::BasePathsSettings;
use crate::registry::DOCUMENT_ROOT;
use crate::settings::{
    traits::ResolvableSettings,
    utilities::replace_placeholders_in_path,
};
use crate::xml::XmlElement;


#[derive(Deserialize, Clone, Debug)]
pub(super) struct UnresolvedDocumentSettings {
    backing_document_path: String,

    /// Whether the tool may seed an empty document when none exists yet.
    #[serde(default)]
    create_if_missing: bool,
}

#[derive(Clone, Debug)]
pub struct DocumentSettings {
    pub backing_document_path: PathBuf,

    pub create_if_missing: bool,
}


impl ResolvableSettings for UnresolvedDocumentSettings {
    type Resolved = DocumentSettings;
    type Context = BasePathsSettings;

    fn resolve(self, context: Self::Context) -> Result<Self::Resolved> {
        let backing_document_path = replace_placeholders_in_path(
            self.backing_document_path,
            &context.placeholders_map(),
        );

        if backing_document_path.is_dir() {
            return Err(miette!(
                "Backing document path {} is a directory.",
                backing_document_path.display()
            ));
        }


        Ok(Self::Resolved {
            backing_document_path,
            create_if_missing: self.create_if_missing,
        })
    }
}

impl DocumentSettings {
    /// Writes an empty backing document if there is none and the settings
    /// allow it. Returns whether a document was created.
    pub fn create_document_if_missing(&self) -> Result<bool> {
        if !self.create_if_missing || self.backing_document_path.exists() {
            return Ok(false);
        }

        if let Some(parent) = self.backing_document_path.parent() {
            std::fs::create_dir_all(parent)
                .into_diagnostic()
                .wrap_err_with(|| {
                    miette!(
                        "Failed to create missing document directory at {}.",
                        parent.display()
                    )
                })?;
        }

        XmlElement::new(DOCUMENT_ROOT)
            .save(&self.backing_document_path)
            .into_diagnostic()
            .wrap_err_with(|| {
                miette!(
                    "Failed to create backing document at {}.",
                    self.backing_document_path.display()
                )
            })?;

        Ok(true)
    }
}
