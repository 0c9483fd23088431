use std::process::exit;

use worklog::config::{self, AppConfiguration, UserConfiguration};

use crate::cli::{ConfigCommand, InitConfiguration};

fn list_and_exit() {
    println!(
        "Configuration file {}:\n",
        config::configuration_file().to_string_lossy()
    );

    match config::load() {
        Ok(config) => match config::application_config_to_string(&config.redacted()) {
            Ok(toml_as_string) => println!("{toml_as_string}"),
            Err(e) => {
                eprintln!("ERROR: Unable to format the configuration, reason: {e}");
                exit(4);
            }
        },
        Err(_) => {
            println!("Config file does not exist or is empty. Use 'worklog-sync config init' to create it");
        }
    }
    exit(0);
}

fn init_and_exit(init: InitConfiguration) {
    let path = config::configuration_file();
    if path.exists() && !init.force {
        eprintln!(
            "Configuration file {} already exists, use --force to overwrite it",
            path.to_string_lossy()
        );
        exit(4);
    }

    let app_config = AppConfiguration {
        user: UserConfiguration {
            timezone: init.timezone,
            default_target: init.default_target,
            ..UserConfiguration::default()
        },
        ..AppConfiguration::default()
    };
    if let Err(e) = app_config.user_context() {
        eprintln!("ERROR: {e}");
        exit(4);
    }

    match config::save(&app_config) {
        Ok(()) => {
            println!("Configuration saved to {}", path.to_string_lossy());
            println!("Add your provider accounts as [[connections]] entries before synchronising");
            exit(0);
        }
        Err(e) => {
            eprintln!(
                "ERROR: Unable to create configuration file {}, reason: {e}",
                path.to_string_lossy()
            );
            exit(4);
        }
    }
}

pub fn execute(cmd: ConfigCommand) {
    match cmd {
        ConfigCommand::Init(init) => init_and_exit(init),
        ConfigCommand::List => list_and_exit(),
    }
}
