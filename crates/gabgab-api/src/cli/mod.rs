//! CLI command definitions for the `gabgab` binary.
//!
//! Uses clap derive macros for argument parsing. Each subcommand maps onto
//! one operation of the recording service.

pub mod recording;
pub mod schema;
pub mod table;

use std::path::PathBuf;
use std::str::FromStr;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

use gabgab_types::column::{ColumnValue, ExtraColumn};
use gabgab_types::predicate::Predicate;

/// Store, search and evolve voice recordings.
#[derive(Parser)]
#[command(name = "gabgab", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Data directory holding config.toml and the database.
    #[arg(long, global = true, env = "GABGAB_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Emit log lines as JSON.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Export tracing spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the recordings table if it does not exist.
    Init,

    /// Drop the recordings table and recreate it empty.
    Reset {
        /// Skip confirmation prompt. Required together with --json.
        #[arg(long, short = 'y')]
        yes: bool,
    },

    /// Insert a recording; its embedding is computed from the transcript.
    Insert(InsertArgs),

    /// Find recordings semantically similar to a query.
    Search {
        /// Free text to search for.
        query: String,

        /// Maximum number of results (defaults to the configured limit).
        #[arg(short, long)]
        limit: Option<usize>,

        /// Only keep results from this speaker (exact match).
        #[arg(long)]
        speaker: Option<String>,

        /// Apply the speaker filter before ranking instead of after.
        #[arg(long, requires = "speaker")]
        prefilter: bool,
    },

    /// Add nullable columns to the table, keeping existing rows.
    Evolve {
        /// Columns as name:type (text, int, float, bool).
        #[arg(required = true)]
        columns: Vec<ExtraColumn>,
    },

    /// Set column values on every row matching a predicate.
    Update {
        /// Row predicate, e.g. "quality_score is null" or "speaker = 'system'".
        #[arg(long = "where", value_name = "PREDICATE")]
        predicate: Predicate,

        /// Assignments as column=value.
        #[arg(long = "set", value_name = "COLUMN=VALUE", required = true)]
        assignments: Vec<Assignment>,
    },

    /// Show row count, version, schema and per-model counts.
    Stats,

    /// Roll the table back to an earlier version.
    Restore {
        /// Version to restore.
        version: u64,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[derive(clap::Args)]
pub struct InsertArgs {
    /// Recording ID (defaults to a fresh UUIDv7).
    #[arg(long)]
    pub id: Option<String>,

    /// Transcript text.
    #[arg(long, short = 't')]
    pub transcript: String,

    /// Model that produced the audio, e.g. kokoro-82m.
    #[arg(long, short = 'm')]
    pub model: String,

    /// Audio duration in milliseconds.
    #[arg(long)]
    pub duration_ms: i32,

    /// Speaker label.
    #[arg(long)]
    pub speaker: Option<String>,

    /// Path of an audio file to store with the recording.
    #[arg(long)]
    pub audio: Option<PathBuf>,

    /// Metadata as a JSON object.
    #[arg(long)]
    pub metadata: Option<String>,

    /// Creation time (RFC 3339). Defaults to now.
    #[arg(long)]
    pub timestamp: Option<String>,

    /// Values for evolved columns as column=value.
    #[arg(long = "set", value_name = "COLUMN=VALUE")]
    pub extra: Vec<Assignment>,
}

/// A `column=value` pair from the command line.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub column: String,
    pub value: ColumnValue,
}

impl FromStr for Assignment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (column, value) = s
            .split_once('=')
            .ok_or_else(|| format!("expected column=value, got '{s}'"))?;
        let column = column.trim();
        if column.is_empty() {
            return Err(format!("missing column name in '{s}'"));
        }
        Ok(Self {
            column: column.to_string(),
            value: value.parse()?,
        })
    }
}

impl From<Assignment> for (String, ColumnValue) {
    fn from(a: Assignment) -> Self {
        (a.column, a.value)
    }
}

/// Tracing filter for the verbosity flags.
pub fn log_level(verbose: u8, quiet: bool) -> &'static str {
    match verbose {
        0 if quiet => "error",
        0 => "warn",
        1 => "info,gabgab_core=debug,gabgab_infra=debug,gabgab=debug",
        _ => "trace",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_assignment() {
        let a: Assignment = "quality_score=3.8".parse().unwrap();
        assert_eq!(a.column, "quality_score");
        assert_eq!(a.value, ColumnValue::Float(3.8));

        let a: Assignment = "speaker='a=b'".parse().unwrap();
        assert_eq!(a.value, ColumnValue::from("a=b"));

        assert!("no_equals".parse::<Assignment>().is_err());
        assert!("=1".parse::<Assignment>().is_err());
    }

    #[test]
    fn test_parse_update_command() {
        let cli = Cli::try_parse_from([
            "gabgab",
            "update",
            "--where",
            "quality_score is null",
            "--set",
            "quality_score=4.0",
        ])
        .unwrap();

        match cli.command {
            Commands::Update { predicate, assignments } => {
                assert_eq!(predicate, Predicate::is_null("quality_score"));
                assert_eq!(assignments.len(), 1);
            }
            _ => panic!("expected update command"),
        }
    }

    #[test]
    fn test_parse_evolve_and_search() {
        let cli = Cli::try_parse_from([
            "gabgab",
            "--json",
            "evolve",
            "quality_score:float",
            "processing_time_ms:int",
        ])
        .unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::Evolve { columns } => assert_eq!(columns.len(), 2),
            _ => panic!("expected evolve command"),
        }

        assert!(Cli::try_parse_from(["gabgab", "search", "weather", "--prefilter"]).is_err());
        assert!(Cli::try_parse_from(["gabgab", "evolve", "bad"]).is_err());
    }

    #[test]
    fn test_insert_requires_duration() {
        let base = ["gabgab", "insert", "-t", "turn on the lights", "-m", "kokoro-82m"];
        assert!(Cli::try_parse_from(base).is_err());

        let cli = Cli::try_parse_from(base.iter().copied().chain(["--duration-ms", "2500"])).unwrap();
        match cli.command {
            Commands::Insert(args) => assert_eq!(args.duration_ms, 2500),
            _ => panic!("expected insert command"),
        }
    }

    #[test]
    fn test_log_level() {
        assert_eq!(log_level(0, true), "error");
        assert_eq!(log_level(0, false), "warn");
        assert_eq!(log_level(3, false), "trace");
    }
}
