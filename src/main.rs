//! # InstaLog
//!
//! Log field species observations tagged with live GPS position.
//!
//! The application finds the serial port a GPS receiver is attached to, keeps
//! the current position up to date on a background task, and records quick
//! text entries such as `amro 3` as rows of a dated CSV sheet.

use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::future::Future;
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use instalog::config::Config;
use instalog::gps::{
    discover, GpsHandle, GpsObserver, GpsSession, PositionSource, DISCOVERY_WINDOW,
};
use instalog::serial::{available_ports, PortOpener, SerialPortOpener};
use instalog::survey::Survey;

/// Log file written inside the output directory
const LOG_FILE_NAME: &str = "instalog.log";

/// Prefix that marks a REPL line as a command rather than an entry
const COMMAND_PREFIX: char = ':';

/// Lines buffered between the stdin thread and the REPL
const INPUT_BUFFER: usize = 16;

const HELP: &str = "\
Type a species and count (e.g. `amro 3`) to add a row, or a command:
  :undo                          undo the last add or delete
  :delete                        delete the last row
  :edit <row> <column> <value>   overwrite a cell (rows start at 1)
  :comment <text>                set the last row's comment
  :observers <n>                 observer count for new rows
  :new                           save and start a new sheet
  :load <path>                   continue a saved *_obs.csv sheet
  :save                          write the sheet again
  :pos                           show the current position
  :clear                         dismiss the GPS error
  :quit                          exit";

/// Command line arguments
#[derive(Debug, Parser)]
#[command(name = "instalog", version, about = "Log species observations with GPS position")]
struct Args {
    /// Settings file
    #[arg(long, default_value = "instalog.toml")]
    config: PathBuf,

    /// Directory for sheets and the log file; overrides the settings file
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

/// One line of REPL input
#[derive(Debug, Clone, PartialEq)]
enum Command {
    Entry(String),
    Undo,
    Delete,
    Edit { row: usize, column: String, value: String },
    Comment(String),
    Observers(u32),
    New,
    Load(PathBuf),
    Save,
    Position,
    ClearError,
    Help,
    Quit,
    Empty,
}

impl Command {
    /// Parse a REPL line; `Err` carries a usage message
    fn parse(line: &str) -> std::result::Result<Self, String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(Command::Empty);
        }
        let Some(body) = line.strip_prefix(COMMAND_PREFIX) else {
            return Ok(Command::Entry(line.to_string()));
        };

        let (name, rest) = body.split_once(char::is_whitespace).unwrap_or((body, ""));
        let rest = rest.trim();
        match name {
            "undo" | "u" => Ok(Command::Undo),
            "delete" | "d" => Ok(Command::Delete),
            "edit" => {
                let mut parts = rest.splitn(3, char::is_whitespace);
                let row = parts.next().and_then(|row| row.parse::<usize>().ok());
                let column = parts.next().filter(|column| !column.is_empty());
                match (row, column) {
                    (Some(row), Some(column)) if row > 0 => Ok(Command::Edit {
                        row: row - 1,
                        column: column.to_string(),
                        value: parts.next().unwrap_or("").trim().to_string(),
                    }),
                    _ => Err("usage: :edit <row> <column> <value>".to_string()),
                }
            }
            "comment" | "c" => Ok(Command::Comment(rest.to_string())),
            "observers" | "obs" => match rest.parse::<u32>() {
                Ok(n) if n > 0 => Ok(Command::Observers(n)),
                _ => Err("usage: :observers <n>, n at least 1".to_string()),
            },
            "new" => Ok(Command::New),
            "load" if !rest.is_empty() => Ok(Command::Load(PathBuf::from(rest))),
            "load" => Err("usage: :load <path>".to_string()),
            "save" | "w" => Ok(Command::Save),
            "pos" => Ok(Command::Position),
            "clear" => Ok(Command::ClearError),
            "help" | "h" | "?" => Ok(Command::Help),
            "quit" | "q" | "exit" => Ok(Command::Quit),
            other => Err(format!("unknown command :{} (try :help)", other)),
        }
    }
}

/// Shows GPS read errors on the terminal
struct ConsoleObserver;

impl GpsObserver for ConsoleObserver {
    fn show_read_error(&self, message: &str) {
        warn!("{}", message);
        eprintln!("! {}", message);
    }

    fn clear_errors(&self) {
        info!("GPS fix reacquired");
        eprintln!("GPS fix reacquired");
    }
}

/// Main entry point for InstaLog
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Load and validate settings
///    - Log to `instalog.log` in the output directory
///    - Scan serial ports for a GPS receiver; none found is fatal
///
/// 2. **Acquisition**
///    - Poll the receiver once per second on a background task
///
/// 3. **Main Loop**
///    - Read entries and commands from stdin
///    - Handle Ctrl+C for graceful shutdown
///
/// # Errors
///
/// Returns error if:
/// - The settings file is missing or invalid
/// - The output directory cannot be created
/// - No serial port carries a recognized NMEA sentence
///
/// # Examples
///
/// ```bash
/// cargo run --release -- --config config/instalog.toml --output-dir ~/surveys
/// ```
#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load(&args.config)
        .with_context(|| format!("Failed to load settings from {}", args.config.display()))?;
    let output_dir = args.output_dir.unwrap_or_else(|| config.survey.output_dir.clone());
    fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create output directory {}", output_dir.display()))?;

    let _log_guard = init_logging(&output_dir);
    info!("InstaLog v{} starting...", env!("CARGO_PKG_VERSION"));

    let candidates = if config.serial.ports.is_empty() {
        available_ports()?
    } else {
        config.serial.ports.clone()
    };
    println!("Looking for a GPS on {} port(s)...", candidates.len());

    let opener: Arc<dyn PortOpener> = Arc::new(SerialPortOpener);
    let discovered = discover(
        opener.as_ref(),
        &candidates,
        config.serial.baud_rate,
        DISCOVERY_WINDOW,
    )
    .await
    .context("GPS discovery failed")?;

    if discovered.sentence_types.trusted_kinds().is_empty() {
        warn!(
            "{} only emits {}; no position will be decoded",
            discovered.port_name, discovered.sentence_types
        );
    }
    println!(
        "GPS found on {} ({})",
        discovered.port_name, discovered.sentence_types
    );

    let handle = GpsHandle::new(&output_dir);
    let session = GpsSession::new(discovered, config.serial.baud_rate, handle.clone());
    let _acquisition = session.spawn(opener, Arc::new(ConsoleObserver));

    let mut survey = Survey::new(
        &output_dir,
        config.survey.observers,
        config.shortcuts.clone(),
        Arc::new(handle.clone()),
    );

    println!("{}", HELP);
    let mut lines = spawn_stdin_reader();
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down...");
    };
    run_repl(&mut lines, &mut survey, &handle, shutdown).await;

    if let Err(e) = handle.flush_track() {
        warn!("Failed to write GPS track on exit: {}", e);
    }
    info!("Logged {} observations", survey.ledger().len());
    Ok(())
}

/// Install the tracing subscriber writing to the log file.
///
/// Falls back to stderr if the log file cannot be opened. The returned guard
/// must be kept alive for buffered lines to reach the file.
fn init_logging(output_dir: &std::path::Path) -> Option<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(output_dir.join(LOG_FILE_NAME))
    {
        Ok(_) => {
            let file_appender = tracing_appender::rolling::never(output_dir, LOG_FILE_NAME);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(non_blocking)
                .with_ansi(false)
                .init();
            Some(guard)
        }
        Err(e) => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
            warn!("Logging to stderr, cannot open {}: {}", LOG_FILE_NAME, e);
            None
        }
    }
}

/// Forward stdin lines to the REPL from a dedicated thread.
///
/// A blocking stdin read cannot be cancelled. Keeping it off the runtime's
/// blocking pool lets the process exit on Ctrl+C without waiting for Enter.
fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(INPUT_BUFFER);
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if tx.blocking_send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!("Failed to read stdin: {}", e);
                    break;
                }
            }
        }
    });
    rx
}

/// Run commands from `lines` until `:quit`, end of input, or `shutdown`
async fn run_repl<F>(
    lines: &mut mpsc::Receiver<String>,
    survey: &mut Survey,
    handle: &GpsHandle,
    shutdown: F,
) where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            line = lines.recv() => {
                let Some(line) = line else {
                    info!("Input closed");
                    break;
                };
                match Command::parse(&line) {
                    Ok(Command::Quit) => break,
                    Ok(command) => execute(survey, handle, command),
                    Err(usage) => println!("{}", usage),
                }
            }

            _ = &mut shutdown => break,
        }
    }
}

/// Apply one REPL command; failures are reported and the loop continues
fn execute(survey: &mut Survey, handle: &GpsHandle, command: Command) {
    let result = match command {
        Command::Entry(text) => survey.record_entry(&text).map(|row| {
            println!("+ {}", row.join(" | "));
        }),
        Command::Undo => survey.undo().map(|undone| {
            if !undone {
                println!("Nothing to undo");
            }
        }),
        Command::Delete => survey.delete_last_row().map(|deleted| {
            if !deleted {
                println!("The sheet is empty");
            }
        }),
        Command::Edit { row, column, value } => survey.edit_cell(row, &column, &value),
        Command::Comment(text) => survey.edit_comment(&text),
        Command::Observers(n) => {
            survey.set_observers(n);
            Ok(())
        }
        Command::New => survey.new_sheet(),
        Command::Load(path) => survey.load_sheet(&path).map(|()| {
            println!("Loaded {} rows from {}", survey.ledger().len(), path.display());
        }),
        Command::Save => survey.save(),
        Command::Position => {
            let (latitude, longitude) = handle.get_current_position();
            let status = if handle.get_error_state() { " (no fix)" } else { "" };
            println!("{:.6}, {:.6}{}", latitude, longitude, status);
            Ok(())
        }
        Command::ClearError => {
            handle.clear_error();
            Ok(())
        }
        Command::Help => {
            println!("{}", HELP);
            Ok(())
        }
        Command::Quit | Command::Empty => Ok(()),
    };

    if let Err(e) = result {
        warn!("Command failed: {}", e);
        println!("Error: {}", e);
    }
}
