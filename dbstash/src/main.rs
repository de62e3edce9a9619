//! Command-line front end for the dbstash store.
//!
//! Registers logins, driver URL templates, and connection profiles, and
//! resolves profiles into connection URLs. All state lives as JSON files
//! under the config directory (default `~/.dbstash`).
//!
//! Resolved URLs are printed redacted unless `--show-password` is given;
//! passwords entered interactively are read without echo.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use dbstash_core::{
    init_logging, ConnectionProfile, DbStashError, Result, Stash, DEFAULT_URL_TEMPLATE,
};
use tracing::error;

#[derive(Parser)]
#[command(name = "dbstash")]
#[command(about = "Credential and connection-profile store for database tools")]
#[command(version)]
#[command(long_about = "
dbstash - store logins, driver URL templates, and connection profiles,
then resolve a profile into a ready-to-use connection URL.

Passwords are obfuscated at rest with reversible base64 encoding. That is
NOT encryption: anyone with the config files can reverse it. Protect the
config directory with filesystem permissions.

EXAMPLES:
  dbstash driver set pg
  dbstash login set svc --user app
  dbstash profile set core --driver pg --login svc --host db.internal --database core
  dbstash resolve core
")]
struct Cli {
    /// Config directory
    #[arg(long, env = "DBSTASH_DIR", global = true)]
    dir: Option<PathBuf>,

    /// Store new passwords without obfuscation
    #[arg(long, global = true)]
    plaintext: bool,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Only show errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Manage stored logins
    Login {
        #[command(subcommand)]
        command: LoginCommand,
    },
    /// Manage driver URL templates
    Driver {
        #[command(subcommand)]
        command: DriverCommand,
    },
    /// Manage connection profiles
    Profile {
        #[command(subcommand)]
        command: ProfileCommand,
    },
    /// Resolve a profile into a connection URL
    Resolve {
        /// Profile name
        name: String,

        /// Print the URL with the cleartext password instead of redacting it
        #[arg(long)]
        show_password: bool,
    },
}

#[derive(Subcommand)]
enum LoginCommand {
    /// Store a login (prompts for the password when not given)
    Set {
        /// Login name
        name: String,

        /// User name
        #[arg(short, long)]
        user: String,

        /// Password; prompted without echo when omitted
        #[arg(short, long)]
        password: Option<String>,
    },
    /// List stored login names
    List,
    /// Remove a stored login
    Remove {
        /// Login name
        name: String,
    },
}

#[derive(Subcommand)]
enum DriverCommand {
    /// Register a driver URL template
    Set {
        /// Driver name
        name: String,

        /// URL template with {placeholder} tokens; defaults to the
        /// conventional {driver}://{user}:{password}@{host}/{database}
        template: Option<String>,
    },
    /// List registered drivers and their templates
    List,
    /// Remove a driver template
    Remove {
        /// Driver name
        name: String,
    },
}

#[derive(Subcommand)]
enum ProfileCommand {
    /// Store a connection profile
    Set {
        /// Profile name
        name: String,

        /// Driver the profile connects through
        #[arg(long)]
        driver: String,

        /// Login name to splice credentials from at resolution time
        #[arg(long)]
        login: Option<String>,

        #[arg(long)]
        host: Option<String>,

        #[arg(long)]
        database: Option<String>,

        #[arg(long)]
        schema: Option<String>,

        #[arg(long)]
        warehouse: Option<String>,

        #[arg(long)]
        role: Option<String>,

        /// Additional driver-specific parameter, as key=value (repeatable)
        #[arg(long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,
    },
    /// List stored profile names
    List,
    /// Show a stored profile
    Show {
        /// Profile name
        name: String,
    },
    /// Remove a stored profile
    Remove {
        /// Profile name
        name: String,
    },
}

/// Parses a `key=value` pair for `--param`.
fn parse_param(raw: &str) -> std::result::Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got '{raw}'")),
    }
}

fn open_stash(cli: &Cli) -> Result<Stash> {
    match &cli.dir {
        Some(dir) => Stash::open(dir, !cli.plaintext),
        None => Stash::open_default(!cli.plaintext),
    }
}

fn run(cli: &Cli) -> Result<()> {
    let mut stash = open_stash(cli)?;

    match &cli.command {
        Command::Login { command } => match command {
            LoginCommand::Set {
                name,
                user,
                password,
            } => {
                let password = match password {
                    Some(password) => password.clone(),
                    None => prompt_password()?,
                };
                stash.vault_mut().set_login(name, user, &password)?;
                println!("login '{name}' stored");
            }
            LoginCommand::List => {
                for name in stash.vault().logins() {
                    println!("{name}");
                }
            }
            LoginCommand::Remove { name } => {
                stash.vault_mut().delete_login(name)?;
                println!("login '{name}' removed");
            }
        },
        Command::Driver { command } => match command {
            DriverCommand::Set { name, template } => {
                let template = template.as_deref().unwrap_or(DEFAULT_URL_TEMPLATE);
                stash.drivers_mut().set_driver(name, template)?;
                println!("driver '{name}' -> {template}");
            }
            DriverCommand::List => {
                for name in stash.drivers().drivers() {
                    let template = stash.drivers().get_driver(&name)?;
                    println!("{name} -> {template}");
                }
            }
            DriverCommand::Remove { name } => {
                stash.drivers_mut().delete_driver(name)?;
                println!("driver '{name}' removed");
            }
        },
        Command::Profile { command } => match command {
            ProfileCommand::Set {
                name,
                driver,
                login,
                host,
                database,
                schema,
                warehouse,
                role,
                params,
            } => {
                let mut profile = ConnectionProfile::new(driver.clone());
                profile.login = login.clone();
                profile.host = host.clone();
                profile.database = database.clone();
                profile.schema = schema.clone();
                profile.warehouse = warehouse.clone();
                profile.role = role.clone();
                for (key, value) in params {
                    profile.extra.insert(key.clone(), value.clone());
                }
                stash.profiles_mut().set_profile(name, &profile)?;
                println!("profile '{name}' stored");
            }
            ProfileCommand::List => {
                for name in stash.profiles().profiles() {
                    println!("{name}");
                }
            }
            ProfileCommand::Show { name } => {
                let profile = stash.profiles().get_profile(name)?;
                println!("driver: {}", profile.driver);
                for (label, value) in [
                    ("login", &profile.login),
                    ("host", &profile.host),
                    ("database", &profile.database),
                    ("schema", &profile.schema),
                    ("warehouse", &profile.warehouse),
                    ("role", &profile.role),
                ] {
                    if let Some(value) = value {
                        println!("{label}: {value}");
                    }
                }
                for (key, value) in &profile.extra {
                    println!("{key}: {value}");
                }
            }
            ProfileCommand::Remove { name } => {
                stash.profiles_mut().delete_profile(name)?;
                println!("profile '{name}' removed");
            }
        },
        Command::Resolve {
            name,
            show_password,
        } => {
            let descriptor = stash.resolve(name)?;
            if *show_password {
                println!("{}", descriptor.url);
            } else {
                println!("{}", descriptor.redacted());
            }
        }
    }

    Ok(())
}

fn prompt_password() -> Result<String> {
    let password = rpassword::prompt_password("Password: ")
        .map_err(|e| DbStashError::configuration(format!("failed to read password: {e}")))?;
    if password.is_empty() {
        return Err(DbStashError::configuration("password cannot be empty"));
    }
    Ok(password)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose, cli.quiet) {
        eprintln!("{e}");
        return ExitCode::FAILURE;
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
