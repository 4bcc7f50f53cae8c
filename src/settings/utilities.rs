use std::{collections::HashMap, env::current_dir, path::PathBuf};

use miette::{miette, Context, IntoDiagnostic, Result};


/// Placeholder replaced by the resolved base data directory in settings paths.
pub const BASE_DATA_DIRECTORY_PLACEHOLDER: &str = "{BASE_DATA_DIRECTORY}";


/// Returns the default settings file path,
/// `{current directory}/data/configuration.toml`.
pub fn get_default_settings_file_path() -> Result<PathBuf> {
    let mut settings_file_path = current_dir()
        .into_diagnostic()
        .wrap_err_with(|| miette!("Could not get the current directory."))?;
    settings_file_path.push("data/configuration.toml");

    if !settings_file_path.is_file() {
        return Err(miette!(
            "Could not find configuration.toml in data directory ({}).",
            settings_file_path.display()
        ));
    }

    Ok(settings_file_path)
}

#[must_use = "function returns the modified path"]
pub fn replace_placeholders_in_path<S>(
    original_path: S,
    placeholders: &HashMap<&'static str, String>,
) -> PathBuf
where
    S: Into<String>,
{
    let mut path_string: String = original_path.into();

    for (key, value) in placeholders {
        path_string = path_string.replace(key, value);
    }

    PathBuf::from(path_string)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_are_replaced() {
        let placeholders =
            HashMap::from([(BASE_DATA_DIRECTORY_PLACEHOLDER, "/srv/hal".to_string())]);

        let path = replace_placeholders_in_path("{BASE_DATA_DIRECTORY}/logs", &placeholders);

        assert_eq!(path, PathBuf::from("/srv/hal/logs"));
    }

    #[test]
    fn paths_without_placeholders_are_kept() {
        let path = replace_placeholders_in_path("/var/log/hal", &HashMap::new());

        assert_eq!(path, PathBuf::from("/var/log/hal"));
    }
}
