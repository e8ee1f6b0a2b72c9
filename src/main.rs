use clap::Parser;
use pheme_util::cli::{args::Args, commands};
use std::process;

fn main() {
    // Parse command line arguments
    let args = Args::parse();

    // If no subcommand was provided, show help and available commands
    if args.command.is_none() {
        show_help_and_commands();
        process::exit(0);
    }

    match commands::run(args) {
        Ok(()) => process::exit(0),
        Err(error) => {
            // Error occurred - print to stderr and exit with error code
            eprintln!("Error: {:#}", error);
            process::exit(1);
        }
    }
}

/// Show help information and available commands when no subcommand is provided
fn show_help_and_commands() {
    println!("Pheme Utilities - configuration, date cursor and locking helpers");
    println!("================================================================");
    println!();
    println!("USAGE:");
    println!("    pheme-util [OPTIONS] <COMMAND>");
    println!();
    println!("COMMANDS:");
    println!("    config      Read merged configuration values (get, dump)");
    println!("    date        Show, range or bump a persisted date cursor");
    println!("    lock        Check, break or run a command under a named lock");
    println!("    help        Show this help message or help for specific commands");
    println!();
    println!("OPTIONS:");
    println!("    -c, --config <FILE>    Configuration file (repeatable, lowest priority first)");
    println!("    -v, --verbose          Increase logging verbosity");
    println!("    -q, --quiet            Only log errors");
    println!("    --log-file <NAME>      Log to NAME inside INHS_LOGDIR or [general] log_dir");
    println!();
    println!("EXAMPLES:");
    println!("    # Read a database setting:");
    println!("    pheme-util config get DB user");
    println!();
    println!("    # Walk backwards through history ten days per run:");
    println!("    pheme-util date range --initial 2011-04-30 --file /var/lib/job/date \\");
    println!("                          --direction backwards --step 10");
    println!("    pheme-util date bump --initial 2011-04-30 --file /var/lib/job/date \\");
    println!("                         --direction backwards --step 10");
    println!();
    println!("    # Never let two exports overlap:");
    println!("    pheme-util lock run --name export --timeout 60 -- ./export.sh");
    println!();
    println!("For detailed help on any command, use:");
    println!("    pheme-util <COMMAND> --help");
}
