use std::{collections::HashMap, fs, path::PathBuf};

use miette::{miette, Context, IntoDiagnostic, Result};
use serde::Deserialize;

use crate::settings::{traits::ResolvableSettings, utilities::BASE_DATA_DIRECTORY_PLACEHOLDER};


#[derive(Deserialize, Debug)]
pub(super) struct UnresolvedBasePathsSettings {
    base_data_directory_path: String,
}

#[derive(Debug, Clone)]
pub struct BasePathsSettings {
    /// Canonical directory holding the backing document and the log files.
    pub base_data_directory_path: PathBuf,
}

impl ResolvableSettings for UnresolvedBasePathsSettings {
    /// Directory of the settings file. A relative base data directory is
    /// resolved against it, not against the current directory.
    type Context = PathBuf;
    type Resolved = BasePathsSettings;

    fn resolve(self, settings_directory: Self::Context) -> Result<Self::Resolved> {
        let configured_path = PathBuf::from(self.base_data_directory_path);
        let base_data_directory_path = if configured_path.is_absolute() {
            configured_path
        } else {
            settings_directory.join(configured_path)
        };

        if base_data_directory_path.is_file() {
            return Err(miette!(
                "Base data directory {} is a file.",
                base_data_directory_path.display()
            ));
        }

        fs::create_dir_all(&base_data_directory_path)
            .into_diagnostic()
            .wrap_err_with(|| {
                miette!(
                    "Could not create base data directory {}.",
                    base_data_directory_path.display()
                )
            })?;

        Ok(BasePathsSettings {
            base_data_directory_path: dunce::canonicalize(&base_data_directory_path)
                .into_diagnostic()
                .wrap_err("Could not canonicalize base data directory path.")?,
        })
    }
}

impl BasePathsSettings {
    /// Values substituted into the other tables' paths.
    pub fn placeholders_map(&self) -> HashMap<&'static str, String> {
        HashMap::from([(
            BASE_DATA_DIRECTORY_PLACEHOLDER,
            self.base_data_directory_path.to_string_lossy().into_owned(),
        )])
    }
}
