//! Main entry point for the tarsync CLI app

use tarsync::catalog;
use tarsync::cli::{self, Commands};
use tarsync::config::Config;
use tarsync::logger::LogChoice;
use tarsync::workflow::{BackupOptions, RestoreOptions, Tarsync};

fn main() -> std::process::ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run_app() {
        if e.downcast_ref::<clap::Error>().is_none() {
            eprintln!("Error: {}", e);
        }
        return std::process::ExitCode::FAILURE;
    }
    std::process::ExitCode::SUCCESS
}

fn run_app() -> Result<(), Box<dyn std::error::Error>> {
    let args = cli::run()?;
    let config = Config::load_or_default(args.config.as_deref())?;

    match args.command {
        Commands::Backup { no_log } => {
            let options = BackupOptions {
                log: if no_log {
                    LogChoice::Skip
                } else {
                    LogChoice::Prompt
                },
            };
            Tarsync::new(config).backup(&options)?;
        }
        Commands::Restore {
            name,
            target,
            delete,
            dry_run,
        } => {
            let options = RestoreOptions {
                delete_extraneous: delete,
                dry_run,
            };
            Tarsync::new(config).restore(&name, &target, &options)?;
        }
        Commands::List {
            page_size,
            page,
            select,
        } => {
            let entries = catalog::list_entries(&config.store_dir)?;
            let total = entries.len();
            // Page size 0 means one page holding everything.
            let effective = if page_size == 0 { total.max(1) } else { page_size };
            let current = catalog::paginate(entries, effective, page);
            print!(
                "{}",
                catalog::render_summary(&current, effective, select, total, &config.store_dir)
            );
        }
    }

    Ok(())
}
