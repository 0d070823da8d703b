use std::path::PathBuf;

/// Converts CS2 demos into per-kill CSV files.
#[derive(Debug, clap::Parser)]
#[command(version, args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[arg(long, global = true, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub batch: BatchArgs,
}

#[derive(Debug, clap::Subcommand)]
pub enum Command {
    /// Convert every demo in a folder and exit (the default)
    Batch(BatchArgs),
    /// Serve an upload endpoint that converts one demo per request
    Serve(ServeArgs),
}

#[derive(Debug, Clone, clap::Args)]
pub struct BatchArgs {
    /// Folder scanned for demos, not recursive
    #[arg(long, env = "DEMO_INPUT", default_value = "demo-in")]
    pub input: PathBuf,

    /// Folder receiving one CSV per converted demo
    #[arg(long, env = "CSV_OUTPUT", default_value = "csv-out")]
    pub output: PathBuf,

    /// Upper bound on parallel conversions, defaults to the available cores
    #[arg(long, env = "WORKERS")]
    pub workers: Option<std::num::NonZeroUsize>,

    /// Extension of input files, matched case-insensitively
    #[arg(long, default_value = "dem")]
    pub extension: String,

    /// Disable the progress animation
    #[arg(long)]
    pub no_progress: bool,

    #[arg(long, value_enum, default_value_t = WinnerModeArg::Carry)]
    pub winner_mode: WinnerModeArg,

    /// Write the batch summary as JSON to this path
    #[arg(long)]
    pub report: Option<PathBuf>,
}

#[derive(Debug, Clone, clap::Args)]
pub struct ServeArgs {
    #[arg(long, env = "BIND", default_value = "0.0.0.0:8080")]
    pub bind: String,

    /// Scratch space for uploads, one folder per request
    #[arg(long, env = "WORK_DIR", default_value = "uploads")]
    pub work_dir: PathBuf,

    #[arg(long, env = "STATIC_DIR", default_value = "public")]
    pub static_dir: PathBuf,

    #[arg(long, value_enum, default_value_t = WinnerModeArg::Carry)]
    pub winner_mode: WinnerModeArg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum WinnerModeArg {
    /// Rows keep the previous round's winner until the round ends
    Carry,
    /// The winner is cleared at every round start
    Reset,
}

impl From<WinnerModeArg> for extraction::WinnerMode {
    fn from(value: WinnerModeArg) -> Self {
        match value {
            WinnerModeArg::Carry => Self::Carry,
            WinnerModeArg::Reset => Self::ResetOnRoundStart,
        }
    }
}

impl From<WinnerModeArg> for extraction::Config {
    fn from(value: WinnerModeArg) -> Self {
        Self {
            winner_mode: value.into(),
        }
    }
}
