use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use pdf_support_config::{Config, LoadOptions, LoggingSettings};
use pdf_support_core::{ExitCode, ScratchCoordinator, SupportError, SupportFile};
use tracing::debug;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "pdf-support",
    author,
    version,
    about = "Prepare and tear down the support files consumed by an HTML-to-PDF renderer"
)]
struct Cli {
    /// Configuration file taking precedence over discovered `.pdf-support.toml` files
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Use a private scratch subdirectory for this request id
    #[arg(long, global = true, value_name = "ID")]
    request: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the scratch directory and three empty support files
    Setup(SetupArgs),
    /// Overwrite the cover, header and footer support files
    Inject(InjectArgs),
    /// Overwrite one support file, leaving the other two untouched
    Write(WriteArgs),
    /// Print the support file paths handed to the renderer
    Paths(PathsArgs),
    /// Remove everything inside the scratch directory
    Clear,
    /// Remove the scratch directory and its contents
    Teardown,
    /// Create the output directory and print its path
    OutputDir,
}

#[derive(Args, Debug)]
struct SetupArgs {
    /// Also create the output directory
    #[arg(long)]
    output: bool,
}

#[derive(Args, Debug)]
struct InjectArgs {
    /// Cover HTML file ('-' for stdin)
    #[arg(long, value_name = "FILE", allow_hyphen_values = true)]
    cover: PathBuf,

    /// Header HTML file ('-' for stdin)
    #[arg(long, value_name = "FILE", allow_hyphen_values = true)]
    header: PathBuf,

    /// Footer HTML file ('-' for stdin)
    #[arg(long, value_name = "FILE", allow_hyphen_values = true)]
    footer: PathBuf,

    /// Stage all payloads before replacing any support file
    #[arg(long)]
    atomic: bool,
}

#[derive(Args, Debug)]
struct WriteArgs {
    /// Support file to replace: cover, header or footer
    #[arg(value_name = "NAME")]
    name: SupportFile,

    /// HTML file to copy in ('-' for stdin)
    #[arg(value_name = "FILE", allow_hyphen_values = true)]
    file: PathBuf,
}

#[derive(Args, Debug)]
struct PathsArgs {
    /// Emit JSON instead of tab-separated lines
    #[arg(long)]
    json: bool,
}

/// Entry point for CLI execution. Returns the desired exit code.
pub fn run() -> Result<i32> {
    let cli = Cli::parse();

    let mut options = LoadOptions::default();
    if let Some(path) = cli.config {
        options = options.with_override_path(path);
    }

    let config = match Config::load(options) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            return Ok(ExitCode::Config as i32);
        }
    };

    init_logging(&config.logging);
    debug!(layers = config.sources.layers.len(), "configuration resolved");

    let base = ScratchCoordinator::new(&config);
    let coordinator = match cli.request.as_deref() {
        Some(id) => match base.for_request(id) {
            Ok(scoped) => scoped,
            Err(err) => return Ok(report(&err)),
        },
        None => base,
    };

    let outcome = match cli.command {
        Command::Setup(args) => handle_setup(&coordinator, args),
        Command::Inject(args) => handle_inject(&coordinator, args),
        Command::Write(args) => handle_write(&coordinator, args),
        Command::Paths(args) => handle_paths(&coordinator, args),
        Command::Clear => handle_clear(&coordinator),
        Command::Teardown => coordinator.unset_environment().map_err(Into::into),
        Command::OutputDir => handle_output_dir(&coordinator),
    };

    match outcome {
        Ok(()) => Ok(ExitCode::Success as i32),
        Err(err) => {
            if let Some(support) = err.downcast_ref::<SupportError>() {
                return Ok(report(support));
            }
            if err.downcast_ref::<io::Error>().is_some() {
                eprintln!("{err:#}");
                return Ok(ExitCode::Io as i32);
            }
            if let Some(usage) = err.downcast_ref::<UsageError>() {
                eprintln!("{usage}");
                return Ok(ExitCode::InvalidArguments as i32);
            }
            Err(err)
        }
    }
}

fn init_logging(settings: &LoggingSettings) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.filter));

    if let Err(err) = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr).with_target(false))
        .try_init()
    {
        debug!(error = %err, "tracing subscriber already installed");
    }
}

fn report(err: &SupportError) -> i32 {
    eprintln!("{err}");
    err.exit_code() as i32
}

#[derive(Debug)]
struct UsageError(String);

impl std::fmt::Display for UsageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for UsageError {}

fn handle_setup(coordinator: &ScratchCoordinator, args: SetupArgs) -> Result<()> {
    coordinator.set_environment()?;
    if args.output {
        coordinator.ensure_output_directory()?;
    }
    Ok(())
}

fn handle_inject(coordinator: &ScratchCoordinator, args: InjectArgs) -> Result<()> {
    let InjectArgs {
        cover,
        header,
        footer,
        atomic,
    } = args;

    let stdin_uses = [&cover, &header, &footer]
        .iter()
        .filter(|path| is_stdin(path))
        .count();
    if stdin_uses > 1 {
        return Err(UsageError("at most one payload can be read from stdin".into()).into());
    }

    let cover = read_payload(&cover)?;
    let header = read_payload(&header)?;
    let footer = read_payload(&footer)?;

    if atomic {
        coordinator.inject_content_atomic(cover, header, footer)?;
    } else {
        coordinator.inject_content(cover, header, footer)?;
    }
    Ok(())
}

fn handle_write(coordinator: &ScratchCoordinator, args: WriteArgs) -> Result<()> {
    let payload = read_payload(&args.file)?;
    coordinator.inject_support_file(args.name, payload)?;
    debug!(name = %args.name, "support file written");
    Ok(())
}

fn handle_paths(coordinator: &ScratchCoordinator, args: PathsArgs) -> Result<()> {
    if args.json {
        let report = coordinator.describe();
        emit(&serde_json::to_string_pretty(&report)?)?;
        return Ok(());
    }

    let mut lines = vec![
        format!("output\t{}", coordinator.output_directory_path().display()),
        format!("scratch\t{}", coordinator.scratch_directory_path().display()),
    ];
    for (kind, path) in coordinator.named_file_paths().iter() {
        lines.push(format!("{kind}\t{}", path.display()));
    }
    emit(&lines.join("\n"))
}

fn handle_clear(coordinator: &ScratchCoordinator) -> Result<()> {
    let removed = coordinator.clear_support_files()?;
    debug!(removed, "scratch directory cleared");
    Ok(())
}

fn handle_output_dir(coordinator: &ScratchCoordinator) -> Result<()> {
    coordinator.ensure_output_directory()?;
    emit(&coordinator.output_directory_path().display().to_string())
}

fn is_stdin(path: &Path) -> bool {
    path.as_os_str() == "-"
}

fn read_payload(path: &Path) -> Result<Vec<u8>> {
    if is_stdin(path) {
        let mut buffer = Vec::new();
        io::stdin()
            .read_to_end(&mut buffer)
            .context("failed to read payload from stdin")?;
        return Ok(buffer);
    }
    fs::read(path).with_context(|| format!("failed to read payload {}", path.display()))
}

fn emit(content: &str) -> Result<()> {
    let mut stdout = io::stdout();
    writeln!(stdout, "{content}")?;
    stdout.flush()?;
    Ok(())
}
