//! Command-line interface definitions for the management binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use hwconf::binding::ConfigValue;



/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(
    name = "hwconf",
    author,
    about = "Inspect and edit the persisted hardware configuration.",
    version
)]
pub struct CLIArgs {
    /// This is the path to the settings file to use.
    /// If unspecified, this defaults to `./data/configuration.toml`.
    #[arg(
        short = 'c',
        long = "configuration-file-path",
        help = "Path to the settings file to use. Defaults to ./data/configuration.toml"
    )]
    pub configuration_file_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CLICommand,
}


#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum CLICommand {
    /// Load every configuration from the backing document and report problems.
    Load,

    /// Load every configuration and write all of them back.
    Save,

    /// List the registered configuration names.
    List,

    /// Print the value at a dotted path, e.g. `Deck[2].Label`.
    Get { name: String, path: String },

    /// Assign a value at a dotted path and persist it.
    Set {
        name: String,

        path: String,

        #[arg(
            required = true,
            num_args = 1..,
            help = "Value to assign. Several values are passed on as a list."
        )]
        values: Vec<String>,
    },

    /// Print the property tree of a configuration.
    Export { name: String },

    /// Apply a property tree read from a file.
    Update { name: String, file: PathBuf },

    /// Load everything and run every configuration's import hook.
    Import,

    /// Run every configuration's upgrade hook against the backing document.
    Upgrade,
}


/// Turns the values given to `set` into the value passed to the registry:
/// a single value stays a scalar, several become a list.
pub fn values_to_config_value(mut values: Vec<String>) -> ConfigValue {
    if values.len() == 1 {
        return ConfigValue::from(values.remove(0));
    }

    ConfigValue::List(values.into_iter().map(ConfigValue::from).collect())
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_set_with_several_values() {
        let arguments = CLIArgs::try_parse_from([
            "hwconf",
            "-c",
            "settings.toml",
            "set",
            "Controller",
            "Deck[2].Label",
            "left",
            "rack",
        ])
        .unwrap();

        assert_eq!(arguments.configuration_file_path, Some(PathBuf::from("settings.toml")));
        assert_eq!(
            arguments.command,
            CLICommand::Set {
                name: "Controller".to_string(),
                path: "Deck[2].Label".to_string(),
                values: vec!["left".to_string(), "rack".to_string()],
            }
        );
    }

    #[test]
    fn set_requires_a_value() {
        assert!(CLIArgs::try_parse_from(["hwconf", "set", "Controller", "BaudRate"]).is_err());
    }

    #[test]
    fn single_values_stay_scalar() {
        assert_eq!(
            values_to_config_value(vec!["9600".to_string()]),
            ConfigValue::Text("9600".to_string())
        );
        assert_eq!(
            values_to_config_value(vec!["a".to_string(), "b".to_string()]),
            ConfigValue::List(vec![
                ConfigValue::Text("a".to_string()),
                ConfigValue::Text("b".to_string())
            ])
        );
    }
}
