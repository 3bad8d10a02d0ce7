use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod cli;

use gleaner::assistant::Assistant;
use gleaner::config::GleanerConfig;
use gleaner::context::Context;
use gleaner::localize;

/// Turn free-form notes into calendar events and tasks.
#[derive(Parser, Debug)]
#[command(name = "gleaner", version, about, long_about = None)]
struct Args {
    /// Config file (default: $XDG_CONFIG_HOME/gleaner/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze text and print the suggested events and tasks
    Analyze {
        /// Read from this file instead of stdin
        file: Option<PathBuf>,
    },
    /// Analyze text, then review and add each item interactively
    Run {
        /// Read from this file instead of stdin
        file: Option<PathBuf>,
        /// Add every item to its suggested destination without asking
        #[arg(long)]
        all: bool,
    },
    /// Sign in with Google
    SignIn,
    /// Sign out and forget the stored token
    SignOut,
    /// Show the calendars and task lists of the signed-in account
    Lists,
}

/// Log to the systemd user journal (`journalctl --user -t gleaner -f`).
/// gleaner targets at info/debug, everything else at warn.
fn init_logging(debug: bool) {
    struct FilteredJournal {
        inner: systemd_journal_logger::JournalLog,
    }

    impl log::Log for FilteredJournal {
        fn enabled(&self, metadata: &log::Metadata) -> bool {
            if metadata.target().starts_with("gleaner") {
                let max = if gleaner::debug_logging() { log::LevelFilter::Debug } else { log::LevelFilter::Info };
                metadata.level() <= max
            } else {
                metadata.level() <= log::LevelFilter::Warn
            }
        }
        fn log(&self, record: &log::Record) {
            if self.enabled(record.metadata()) {
                self.inner.log(record);
            }
        }
        fn flush(&self) {
            self.inner.flush();
        }
    }

    gleaner::set_debug_logging(debug);

    let journal = match systemd_journal_logger::JournalLog::new() {
        Ok(journal) => journal.with_syslog_identifier("gleaner".to_string()),
        // No journal (container, non-systemd host): run without a logger.
        Err(_) => return,
    };
    if log::set_boxed_logger(Box::new(FilteredJournal { inner: journal })).is_ok() {
        // Global max must be Debug so gleaner debug logs can pass through when toggled
        log::set_max_level(log::LevelFilter::Debug);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = GleanerConfig::load(args.config.as_deref());
    let debug = args.debug || config.as_ref().is_ok_and(|c| c.debug_logging);
    init_logging(debug);
    localize::localize();

    let context = match config.and_then(Context::from_config) {
        Ok(context) => context,
        Err(e) => {
            log::error!("{}", e);
            cli::print_error(&e);
            return Err(e.into());
        }
    };
    log::info!(
        "Starting gleaner (extraction: {:?}, account: {:?})",
        context.extraction_mode,
        context.account_mode
    );

    let mut assistant = Assistant::new(context);
    if let Err(e) = cli::initialize(&mut assistant).await {
        cli::print_error(&e);
        return Err(e.into());
    }

    match args.command {
        Command::Analyze { file } => {
            let text = cli::read_text(file.as_deref())?;
            if let Err(e) = cli::analyze(&mut assistant, text).await {
                cli::print_error(&e);
                return Err(e.into());
            }
        }
        Command::Run { file, all } => {
            let text = cli::read_text(file.as_deref())?;
            if let Err(e) = cli::run(&mut assistant, text, all).await {
                if let Some(app_error) = e.downcast_ref::<gleaner::error::AppError>() {
                    cli::print_error(app_error);
                }
                return Err(e);
            }
        }
        Command::SignIn => cli::sign_in(&mut assistant).await?,
        Command::SignOut => cli::sign_out(&mut assistant).await?,
        Command::Lists => cli::print_lists(assistant.session()),
    }

    Ok(())
}
