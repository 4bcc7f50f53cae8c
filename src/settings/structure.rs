use std::fs;
use std::path::{Path, PathBuf};

use miette::{miette, Context, IntoDiagnostic, Result};
use serde::Deserialize;

pub use self::base_paths::BasePathsSettings;
use self::base_paths::UnresolvedBasePathsSettings;
pub use self::document::DocumentSettings;
use self::document::UnresolvedDocumentSettings;
pub use self::logging::LoggingSettings;
use self::logging::UnresolvedLoggingSettings;
use super::traits::ResolvableSettings;
use super::utilities::get_default_settings_file_path;

mod base_paths;
mod document;
mod logging;



#[derive(Deserialize, Debug)]
pub(crate) struct UnresolvedSettings {
    /// Base paths.
    base_paths: UnresolvedBasePathsSettings,

    /// Logging-related settings.
    logging: UnresolvedLoggingSettings,

    /// The backing configuration document.
    document: UnresolvedDocumentSettings,
}


/// All settings of the management tool.
#[derive(Debug, Clone)]
pub struct Settings {
    /// This is the file path this `Settings` instance was loaded from.
    pub file_path: PathBuf,

    /// Base paths.
    pub base_paths: BasePathsSettings,

    /// Logging-related settings.
    pub logging: LoggingSettings,

    /// The backing configuration document.
    pub document: DocumentSettings,
}


impl ResolvableSettings for UnresolvedSettings {
    type Resolved = Settings;
    type Context = PathBuf;

    fn resolve(self, context: Self::Context) -> Result<Self::Resolved> {
        let settings_directory = context
            .parent()
            .ok_or_else(|| miette!("Settings file {} has no parent directory.", context.display()))?
            .to_path_buf();

        let base_paths = self
            .base_paths
            .resolve(settings_directory)
            .wrap_err("Failed to resolve base_paths table.")?;

        let logging = self
            .logging
            .resolve(base_paths.clone())
            .wrap_err("Failed to resolve logging table.")?;

        let document = self
            .document
            .resolve(base_paths.clone())
            .wrap_err("Failed to resolve document table.")?;


        Ok(Settings {
            file_path: context,
            base_paths,
            logging,
            document,
        })
    }
}


impl Settings {
    /// Load the settings from a specific file path.
    pub fn load_from_path<S: AsRef<Path>>(settings_file_path: S) -> Result<Self> {
        let settings_file_path = settings_file_path.as_ref();

        let settings_string = fs::read_to_string(settings_file_path)
            .into_diagnostic()
            .wrap_err_with(|| {
                miette!(
                    "Could not read settings file at {}.",
                    settings_file_path.display()
                )
            })?;


        let unresolved_settings = toml::from_str::<UnresolvedSettings>(&settings_string)
            .into_diagnostic()
            .wrap_err("Could not parse settings file!")?;


        let settings_file_path = dunce::canonicalize(settings_file_path)
            .into_diagnostic()
            .wrap_err("Could not canonicalize settings file path!")?;

        let resolved_settings = unresolved_settings
            .resolve(settings_file_path)
            .wrap_err("Failed to resolve settings.")?;

        Ok(resolved_settings)
    }

    /// Load the settings from the default path (`./data/configuration.toml`).
    pub fn load_from_default_path() -> Result<Settings> {
        Settings::load_from_path(
            get_default_settings_file_path()
                .wrap_err_with(|| "Could not load settings file at default path.")?,
        )
    }
}
