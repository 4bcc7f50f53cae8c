use std::path::PathBuf;

use miette::{miette, Context, IntoDiagnostic, Result};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use super::base_paths::BasePathsSettings;
use crate::settings::{
    traits::ResolvableSettings,
    utilities::replace_placeholders_in_path,
};


fn default_log_file_name() -> String {
    "hwconf.log".to_string()
}


#[derive(Deserialize, Clone, Debug)]
pub(super) struct UnresolvedLoggingSettings {
    console_output_level_filter: String,

    log_file_output_level_filter: String,

    log_file_output_directory: String,

    #[serde(default = "default_log_file_name")]
    log_file_name: String,
}

#[derive(Clone, Debug)]
pub struct LoggingSettings {
    pub console_output_level_filter: String,

    pub log_file_output_level_filter: String,

    pub log_file_output_directory: PathBuf,

    pub log_file_name: String,
}

impl ResolvableSettings for UnresolvedLoggingSettings {
    type Resolved = LoggingSettings;
    type Context = BasePathsSettings;

    fn resolve(self, context: Self::Context) -> Result<Self::Resolved> {
        // Validate the file and console level filters.
        EnvFilter::try_new(&self.console_output_level_filter)
            .into_diagnostic()
            .wrap_err_with(|| miette!("Failed to parse field console_output_level_filter"))?;

        EnvFilter::try_new(&self.log_file_output_level_filter)
            .into_diagnostic()
            .wrap_err_with(|| miette!("Failed to parse field log_file_output_level_filter"))?;

        if self.log_file_name.trim().is_empty() {
            return Err(miette!("Field log_file_name must not be empty."));
        }


        let log_file_output_directory = replace_placeholders_in_path(
            self.log_file_output_directory,
            &context.placeholders_map(),
        );


        Ok(Self::Resolved {
            console_output_level_filter: self.console_output_level_filter,
            log_file_output_level_filter: self.log_file_output_level_filter,
            log_file_output_directory,
            log_file_name: self.log_file_name,
        })
    }
}

impl LoggingSettings {
    pub fn console_output_level_filter(&self) -> Result<EnvFilter> {
        EnvFilter::try_new(&self.console_output_level_filter)
            .into_diagnostic()
            .wrap_err("Invalid console output level filter.")
    }

    pub fn log_file_output_level_filter(&self) -> Result<EnvFilter> {
        EnvFilter::try_new(&self.log_file_output_level_filter)
            .into_diagnostic()
            .wrap_err("Invalid log file output level filter.")
    }
}
