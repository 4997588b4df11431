//! Purpose: `locdb` CLI entry point for the file location directory.
//! Role: Binary crate root; parses args, builds the client, reports results.
//! Invariants: Lookup prints one location per line on stdout; add/remove print `OK`.
//! Invariants: Errors go to stderr as text on a terminal, JSON otherwise.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
#![allow(clippy::result_large_err)]
use std::ffi::OsString;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::time::Duration;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum, error::ErrorKind as ClapErrorKind};
use clap_complete::aot::Shell;
use locdb::api::{
    ClientOptions, DEFAULT_CONNECT_TIMEOUT, DEFAULT_TIMEOUT, Error, ErrorKind, LocationClient,
    LookupResult, sync_directory, to_exit_code,
};
use serde_json::{Map, Value, json};
use std::error::Error as StdError;
use tracing_subscriber::EnvFilter;

mod command_dispatch;

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }

    fn with_code(exit_code: i32) -> Self {
        Self { exit_code }
    }
}

fn main() {
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err((err, color_mode)) => {
            emit_error(&err, color_mode);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<RunOutcome, (Error, ColorMode)> {
    let cli = match Cli::try_parse_from(std::env::args_os().collect::<Vec<OsString>>()) {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    (
                        Error::new(ErrorKind::Io)
                            .with_message("failed to write help")
                            .with_source(io_err),
                        ColorMode::Auto,
                    )
                })?;
                let exit_code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(RunOutcome::with_code(exit_code));
            }
            _ => {
                return Err((
                    Error::new(ErrorKind::Usage)
                        .with_message(clap_error_summary(&err))
                        .with_hint("Try `locdb --help`."),
                    ColorMode::Auto,
                ));
            }
        },
    };

    init_tracing(cli.verbose);

    let color_mode = cli.color;
    let options = ClientOptions::new()
        .with_connect_timeout(Duration::from_millis(cli.connect_timeout_ms))
        .with_timeout(Duration::from_millis(cli.timeout_ms));

    command_dispatch::dispatch_command(cli.command, options)
        .map_err(add_transport_hint)
        .map_err(|err| (err, color_mode))
}

#[derive(Parser)]
#[command(
    name = "locdb",
    version,
    about = "Look up and register archive file locations in a location directory",
    long_about = None,
    after_help = r#"EXAMPLES
  $ locdb lookup http://replay:8080/locationdb IA-2006-01.arc.gz
  $ locdb add http://replay:8080/locationdb IA-2006-01.arc.gz http://node3/arcs/IA-2006-01.arc.gz
  $ locdb remove http://replay:8080/locationdb IA-2006-01.arc.gz http://node3/arcs/IA-2006-01.arc.gz
  $ locdb sync http://replay:8080/locationdb /data/arcs http://node3/arcs/

NOTES
  - Adding a known location or removing an unknown one is not an error.
  - lookup exits 3 when the directory knows no location for the file."#,
    arg_required_else_help = true
)]
struct Cli {
    #[arg(
        long,
        global = true,
        default_value_t = DEFAULT_CONNECT_TIMEOUT.as_millis() as u64,
        help = "Connect timeout in milliseconds"
    )]
    connect_timeout_ms: u64,
    #[arg(
        long,
        global = true,
        default_value_t = DEFAULT_TIMEOUT.as_millis() as u64,
        help = "Overall request timeout in milliseconds"
    )]
    timeout_ms: u64,
    #[arg(
        long,
        global = true,
        default_value = "auto",
        help = "Colorize error output (auto|always|never)"
    )]
    color: ColorMode,
    #[arg(short, long, global = true, help = "Log each request to stderr")]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ColorMode {
    Auto,
    Always,
    Never,
}

impl ColorMode {
    fn use_color(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Auto => is_tty,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    #[command(about = "Print every known location of a file, one per line")]
    Lookup {
        #[arg(help = "Location directory URL (http:// or https://)")]
        db_url: String,
        #[arg(help = "Archive file name")]
        name: String,
    },
    #[command(about = "Register a location for a file")]
    Add {
        #[arg(help = "Location directory URL (http:// or https://)")]
        db_url: String,
        #[arg(help = "Archive file name")]
        name: String,
        #[arg(help = "URL where the file can be retrieved")]
        url: String,
    },
    #[command(about = "Remove a location for a file")]
    Remove {
        #[arg(help = "Location directory URL (http:// or https://)")]
        db_url: String,
        #[arg(help = "Archive file name")]
        name: String,
        #[arg(help = "URL to forget for the file")]
        url: String,
    },
    #[command(
        about = "Register every .arc/.arc.gz file in a directory",
        long_about = r#"Scan DIR and register each .arc or .arc.gz file at DIR_URL followed by the file name.

DIR_URL is joined to the name as given, so it usually ends with `/`."#
    )]
    Sync {
        #[arg(help = "Location directory URL (http:// or https://)")]
        db_url: String,
        #[arg(help = "Local directory to scan")]
        dir: PathBuf,
        #[arg(help = "URL prefix the directory is served under")]
        dir_url: String,
    },
    #[command(about = "Generate shell completion scripts")]
    Completion {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn ensure_http_url(value: &str, label: &str) -> Result<(), Error> {
    if value.starts_with("http://") || value.starts_with("https://") {
        return Ok(());
    }
    Err(Error::new(ErrorKind::Usage)
        .with_message(format!("{label} must begin with http:// or https://"))
        .with_hint(format!("Got `{value}`.")))
}

fn add_transport_hint(err: Error) -> Error {
    if err.kind() != ErrorKind::Transport || err.hint().is_some() {
        return err;
    }
    err.with_hint("The location directory was unreachable or failed; retrying is safe.")
}

fn emit_lookup(result: LookupResult, name: &str) -> RunOutcome {
    match result {
        LookupResult::Found(locations) => {
            for location in locations {
                println!("{location}");
            }
            RunOutcome::ok()
        }
        LookupResult::Absent => {
            eprintln!("no locations for {name}");
            RunOutcome::with_code(to_exit_code(ErrorKind::NotFound))
        }
    }
}

fn emit_json(value: Value) {
    let json = if io::stdout().is_terminal() {
        serde_json::to_string_pretty(&value)
    } else {
        serde_json::to_string(&value)
    }
    .unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string());
    println!("{json}");
}

fn emit_error(err: &Error, color_mode: ColorMode) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        eprintln!("{}", error_text(err, color_mode.use_color(is_tty)));
        return;
    }

    let value = error_json(err);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

#[derive(Copy, Clone, Debug)]
enum AnsiColor {
    Red,
    Yellow,
}

fn colorize_label(label: &str, enabled: bool, color: AnsiColor) -> String {
    if !enabled {
        return label.to_string();
    }
    let code = match color {
        AnsiColor::Red => "31",
        AnsiColor::Yellow => "33",
    };
    format!("\u{1b}[{code}m{label}\u{1b}[0m")
}

fn error_message(err: &Error) -> String {
    if let Some(message) = err.message() {
        return message.to_string();
    }
    match err.kind() {
        ErrorKind::Internal => "internal error".to_string(),
        ErrorKind::Usage => "usage error".to_string(),
        ErrorKind::NotFound => "not found".to_string(),
        ErrorKind::Config => "invalid configuration".to_string(),
        ErrorKind::Transport => "request failed".to_string(),
        ErrorKind::Protocol => "unexpected reply from location directory".to_string(),
        ErrorKind::Io => "i/o error".to_string(),
    }
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut cur = err.source();
    while let Some(source) = cur {
        causes.push(source.to_string());
        cur = source.source();
    }
    causes
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    if let Some(name) = err.name() {
        inner.insert("name".to_string(), json!(name));
    }
    if let Some(path) = err.path() {
        inner.insert("path".to_string(), json!(path.display().to_string()));
    }
    if let Some(status) = err.status() {
        inner.insert("status".to_string(), json!(status));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn error_text(err: &Error, use_color: bool) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "{} {}",
        colorize_label("error:", use_color, AnsiColor::Red),
        error_message(err)
    ));
    if let Some(hint) = err.hint() {
        lines.push(format!(
            "{} {hint}",
            colorize_label("hint:", use_color, AnsiColor::Yellow)
        ));
    }
    if let Some(name) = err.name() {
        lines.push(format!(
            "{} {name}",
            colorize_label("name:", use_color, AnsiColor::Yellow)
        ));
    }
    if let Some(path) = err.path() {
        lines.push(format!(
            "{} {}",
            colorize_label("path:", use_color, AnsiColor::Yellow),
            path.display()
        ));
    }
    for cause in error_causes(err) {
        lines.push(format!(
            "{} {cause}",
            colorize_label("caused by:", use_color, AnsiColor::Yellow)
        ));
    }
    lines.join("\n")
}

fn clap_error_summary(err: &clap::Error) -> String {
    for line in err.to_string().lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("error:") {
            return rest.trim().to_string();
        }
        return trimmed.to_string();
    }
    "invalid arguments".to_string()
}
