use clap::Parser;
use hwconf::{
    binding::Member,
    roots::register_builtin,
    settings::Settings,
    ConfigurationRegistry,
    ErrorList,
    OperationError,
};
use miette::{miette, Context, IntoDiagnostic, Result};
use tracing::{info, warn};

use crate::{
    cli::{values_to_config_value, CLIArgs, CLICommand},
    logging::initialize_tracing,
};

mod cli;
mod logging;



fn run_command(
    command: CLICommand,
    registry: &mut ConfigurationRegistry,
    errors: &mut ErrorList,
) -> Result<()> {
    match command {
        CLICommand::Load => {
            registry.load_all(errors);
            println!("Loaded {} configuration(s).", registry.names().count());
        }
        CLICommand::Save => {
            registry.load_all(errors);
            registry.save_all(errors);
        }
        CLICommand::List => {
            for name in registry.names() {
                println!("{}", name);
            }
        }
        CLICommand::Get { name, path } => {
            registry.load_all(errors);
            require_configuration(registry, &name, errors);

            match registry.get_by_name(&name, &path) {
                Some(Member::Value(value)) => println!("{}", value),
                Some(Member::Object(object)) => {
                    println!("<object {}>", object.catalog().type_name())
                }
                None => println!("<absent>"),
            }
        }
        CLICommand::Set { name, path, values } => {
            registry.load_all(errors);
            if !require_configuration(registry, &name, errors) {
                return Ok(());
            }

            if !registry.set_by_name(&name, &path, values_to_config_value(values)) {
                return Err(miette!(
                    "The value was not assigned: {} does not name a writable property of {}.",
                    path,
                    name
                ));
            }
        }
        CLICommand::Export { name } => {
            registry.load_all(errors);

            match registry.export_as_xml(&name) {
                Some(text) => println!("{}", text),
                None => {
                    require_configuration(registry, &name, errors);
                }
            }
        }
        CLICommand::Update { name, file } => {
            let update = std::fs::read_to_string(&file)
                .into_diagnostic()
                .wrap_err_with(|| miette!("Failed to read update file {}.", file.display()))?;

            registry.load_all(errors);
            registry.update_from_xml(&name, &update, errors);
        }
        CLICommand::Import => registry.load_and_import(errors),
        CLICommand::Upgrade => registry.load_and_upgrade(errors),
    }

    Ok(())
}

/// Records an unknown-configuration error if `name` is not registered.
fn require_configuration(
    registry: &ConfigurationRegistry,
    name: &str,
    errors: &mut ErrorList,
) -> bool {
    if registry.find_configuration(name).is_some() {
        return true;
    }

    errors.push(OperationError::UnknownConfiguration {
        name: name.to_string(),
    });
    false
}

fn report_errors(errors: ErrorList) -> Result<()> {
    if errors.is_empty() {
        return Ok(());
    }

    let error_count = errors.len();
    for error in errors {
        warn!(code = error.code(), %error, "Operation error.");
        eprintln!("{:?}", miette::Report::new(error));
    }

    Err(miette!("The command finished with {} error(s).", error_count))
}


fn main() -> Result<()> {
    let cli_args = CLIArgs::parse();

    // Load the tool settings.
    let settings = match cli_args.configuration_file_path.as_ref() {
        Some(path) => {
            eprintln!("Loading settings: {}", path.display());
            Settings::load_from_path(path)
        }
        None => {
            eprintln!("Loading settings at default path.");
            Settings::load_from_default_path()
        }
    }
    .wrap_err("Failed to load settings file.")?;


    let logging_raii_guard = initialize_tracing(
        settings.logging.console_output_level_filter()?,
        settings.logging.log_file_output_level_filter()?,
        &settings.logging.log_file_output_directory,
        &settings.logging.log_file_name,
    )
    .wrap_err("Failed to initialize tracing.")?;

    info!(settings = %settings.file_path.display(), "Tracing initialized.");


    if settings
        .document
        .create_document_if_missing()
        .wrap_err("Failed to prepare the backing document.")?
    {
        info!(
            path = %settings.document.backing_document_path.display(),
            "Created an empty backing document."
        );
    }

    let mut registry = ConfigurationRegistry::new(&settings.document.backing_document_path);
    register_builtin(&mut registry);


    let mut errors = ErrorList::new();
    let outcome = run_command(cli_args.command, &mut registry, &mut errors);
    let reported = report_errors(errors);


    drop(logging_raii_guard);
    outcome.and(reported)
}
