use clap::{Parser, Subcommand, ValueEnum};
use docshape_query::RendererKind;
use std::path::PathBuf;
use tracing_subscriber::filter::LevelFilter;

/// Log level options for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// No logging output
    Off,
    /// Error messages only
    Error,
    /// Warnings and errors
    Warn,
    /// Informational messages
    Info,
    /// Debug messages (rule selection)
    Debug,
    /// Trace-level messages (bindings and rendering)
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::OFF,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

/// Output renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RendererArg {
    /// Shell syntax, e.g. `db.users.find({age: {$gt: 30}})`
    Shell,
    /// JSON database command document
    Command,
}

impl From<RendererArg> for RendererKind {
    fn from(arg: RendererArg) -> Self {
        match arg {
            RendererArg::Shell => RendererKind::Shell,
            RendererArg::Command => RendererKind::Command,
        }
    }
}

#[derive(Parser)]
#[command(name = "docshape")]
#[command(about = "docshape - translate relational query descriptors into document-store queries")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Set log level (off, error, warn, info, debug, trace)
    /// If not specified, uses RUST_LOG, then the config file value, then 'warn'
    #[arg(short = 'l', long, global = true, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Enable verbose logging (shortcut for --log-level=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path (defaults to ~/.config/docshape/config.toml)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Translate a descriptor into a document-store query
    Translate {
        /// Descriptor file (JSON or YAML); reads stdin when omitted
        file: Option<PathBuf>,

        /// Output renderer (overrides config file)
        #[arg(short, long, value_enum)]
        renderer: Option<RendererArg>,

        /// Single-line output without spaces after ':' and ','
        #[arg(long)]
        compact: bool,

        /// Print the matched rule id before the query
        #[arg(long)]
        explain: bool,
    },

    /// Print the normalized descriptor as JSON
    Parse {
        /// Descriptor file (JSON or YAML); reads stdin when omitted
        file: Option<PathBuf>,
    },

    /// List the pattern catalog
    Rules {
        /// Show a sample translation for every rule
        #[arg(long)]
        examples: bool,
    },
}

impl Cli {
    /// Level requested on the command line, if any
    pub fn requested_level(&self) -> Option<LevelFilter> {
        match (self.log_level, self.verbose) {
            (Some(level), _) => Some(level.into()),
            (None, true) => Some(LevelFilter::DEBUG),
            (None, false) => None,
        }
    }
}
