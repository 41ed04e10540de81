use camino::Utf8PathBuf;
use clap::{Parser, ValueEnum};
use tracing::info;

use kumitate::{BuildConfig, DEFAULT, KumitateError};

/// Run a task of the front-end build pipeline.
#[derive(Debug, Parser)]
#[command(name = "kumitate", version, about, long_about = None)]
struct Args {
    /// Task or composition to run.
    #[arg(default_value = DEFAULT)]
    task: String,

    /// Build config, JSON or TOML.
    #[arg(long, short, value_name = "PATH", default_value = "kumitate.json")]
    config: Utf8PathBuf,

    /// Print the tasks and compositions, then exit.
    #[arg(long)]
    list: bool,

    /// Logging level. Falls back to `KUMITATE_LOG`, then `info`.
    #[arg(long, value_enum, value_name = "LEVEL")]
    log_level: Option<LogLevel>,
}

#[derive(Debug, Copy, Clone, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

fn main() {
    let args = Args::parse();

    if let Err(e) = kumitate::logging::init_logging(args.log_level.map(LogLevel::as_str)) {
        eprintln!("kumitate: cannot set up logging: {e:#}");
        std::process::exit(2);
    }

    if let Err(e) = run(&args) {
        eprintln!("kumitate: {e}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), KumitateError> {
    let config = BuildConfig::load(&args.config)?;
    let pipeline = kumitate::assemble(&config)?;

    if args.list {
        print!("{pipeline}");
        return Ok(());
    }

    let diagnostics = pipeline.run(&args.task)?;
    info!("finished '{}' in {:?}", args.task, diagnostics.elapsed());
    eprint!("{diagnostics}");

    Ok(())
}
