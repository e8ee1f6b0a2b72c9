//! Command implementations for the Pheme utilities CLI
//!
//! Each subcommand loads what it needs, performs one operation and prints a
//! plain-text result on stdout so cron scripts can capture it.

use crate::cli::args::{
    Args, Commands, ConfigAction, ConfigArgs, DateAction, DateArgs, LockAction, LockArgs,
};
use crate::config::{ConfigStore, ConfigValue};
use crate::constants::DEFAULT_SECTION;
use crate::datefile::DateCursor;
use crate::lock::Lock;
use crate::logging::configure_logging;
use crate::util::strict_execute;
use anyhow::{Context, Result};
use tracing::{debug, info};

/// Main command runner
///
/// Loads configuration, sets up logging and dispatches to the subcommand.
pub fn run(args: Args) -> Result<()> {
    let config = load_configuration(&args)?;

    configure_logging(&args.logging_options(), Some(&config))
        .context("Failed to set up logging")?;
    debug!("Command line arguments: {:?}", args);
    debug!("Config sources read: {:?}", config.loaded_sources());

    match args.command {
        Some(Commands::Config(config_args)) => run_config(&config, config_args),
        Some(Commands::Date(date_args)) => run_date(date_args),
        Some(Commands::Lock(lock_args)) => run_lock(lock_args),
        None => Ok(()),
    }
}

/// Explicit `--config` files replace the default candidate list
fn load_configuration(args: &Args) -> Result<ConfigStore> {
    let store = if args.config_files.is_empty() {
        ConfigStore::from_default_sources()
    } else {
        ConfigStore::load(&args.config_files)
    };
    store.context("Failed to load configuration")
}

fn run_config(config: &ConfigStore, args: ConfigArgs) -> Result<()> {
    match args.action {
        ConfigAction::Get {
            section,
            key,
            default,
        } => {
            let value = match default {
                Some(default) => config.get_or(&section, &key, ConfigValue::Text(default)),
                None => config.get(&section, &key)?,
            };
            println!("{}", value);
        }
        ConfigAction::Dump => {
            print!("{}", render_config(config));
        }
    }
    Ok(())
}

/// Merged configuration as INI text, `DEFAULT` first
pub fn render_config(config: &ConfigStore) -> String {
    let mut out = String::new();
    let mut sections = vec![DEFAULT_SECTION];
    sections.extend(config.sections());

    for section in sections {
        let keys = config.keys(section);
        if keys.is_empty() {
            continue;
        }
        out.push_str(&format!("[{}]\n", section));
        for key in keys {
            if let Some(raw) = config.get_raw(section, key) {
                out.push_str(&format!("{} = {}\n", key, raw.replace('\n', "\n\t")));
            }
        }
        out.push('\n');
    }
    out
}

fn run_date(args: DateArgs) -> Result<()> {
    let initial = args
        .initial
        .unwrap_or_else(|| chrono::Local::now().date_naive());
    let mut cursor = DateCursor::new(initial, args.file, args.direction, args.step)
        .context("Invalid date cursor settings")?;

    match args.action {
        DateAction::Show => {
            println!("{}", cursor.get_date()?);
        }
        DateAction::Range => {
            let (start, end) = cursor.get_date_range()?;
            println!("{} {}", start, end);
        }
        DateAction::Bump => match cursor.bump_date()? {
            Some(next) => println!("{}", next),
            None => info!("No direction set; date cursor left unchanged"),
        },
    }
    Ok(())
}

fn run_lock(args: LockArgs) -> Result<()> {
    args.validate()?;
    let lock = Lock::in_dir(&args.lock_dir, &args.name);

    match args.action {
        LockAction::Status => match lock.owner() {
            Some(owner) => println!("locked {} {}", lock.path().display(), owner),
            None => println!("unlocked {}", lock.path().display()),
        },
        LockAction::Break => {
            lock.break_lock()
                .with_context(|| format!("Failed to break lock {}", lock.path().display()))?;
        }
        LockAction::Run => {
            let guard = lock.acquire(args.timeout())?;
            // One shell string; argv quoting is not preserved
            let command = args.command.join(" ");
            let outcome = strict_execute(&command, false);
            guard.release()?;
            print!("{}", outcome?);
        }
    }
    Ok(())
}
