pub mod report;

use std::{env, fmt::Display, path::PathBuf};

use anyhow::Result;
use chrono::{DateTime, Duration, Local, Utc};
use chrono_english::parse_date_string;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use now::DateTimeNow;
use tokio::io;
use tracing::{debug, level_filters::LevelFilter};

use crate::{
    analysis::analyze,
    config::{load_taxonomy, AnalyzerConfig, Taxonomy},
    ingest::load_events,
    utils::{logging::enable_logging, percentage::Percentage, time::next_day_start},
};

#[derive(Parser, Debug)]
#[command(name = "Focusweek", version, long_about = None)]
#[command(about = "Weekly productivity analysis for activity tracker exports", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(long, help = "Enable logging")]
    log: bool,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(about = "Analyze tracker exports and print the report")]
    Analyze {
        #[command(flatten)]
        command: AnalyzeCommand,
    },
    #[command(about = "Write the default category configuration to a file for customization")]
    InitConfig {
        #[arg(
            long,
            default_value = "focusweek-categories.json",
            help = "Where to write the configuration"
        )]
        to: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DateStyle {
    Uk,
    Us,
}

impl From<DateStyle> for chrono_english::Dialect {
    fn from(value: DateStyle) -> Self {
        match value {
            DateStyle::Uk => Self::Uk,
            DateStyle::Us => Self::Us,
        }
    }
}

impl Display for DateStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateStyle::Uk => write!(f, "uk"),
            DateStyle::Us => write!(f, "us"),
        }
    }
}

#[derive(Debug, Parser)]
pub struct AnalyzeCommand {
    #[arg(required = true, help = "Csv exports to analyze. Multiple files are concatenated")]
    files: Vec<PathBuf>,
    #[arg(
        long = "start",
        short,
        help = "Start of the range. Examples are \"yesterday\", \"1 hour ago\", \"15/03/2025\", \"12:00 16/03/2025\""
    )]
    start_date: Option<String>,
    #[arg(
        long = "end",
        short,
        help = "End of the range. Examples are \"yesterday\", \"1 hour ago\", \"15/03/2025\", \"12:00 16/03/2025\""
    )]
    end_date: Option<String>,
    #[arg(long, default_value_t = DateStyle::Uk, help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year")]
    date_style: DateStyle,
    #[arg(
        long = "days",
        default_value_t = false,
        help = "Take inputs as whole days. For example if start and end are both 15/03/2025 this option allows to analyze the whole day"
    )]
    treat_as_days: bool,
    #[arg(short = 'p', long = "percentage", help = "Filter top apps to have at least specified percentage of total time", default_value_t = Percentage::new_opt(1.).unwrap())]
    min_percentage: Percentage,
    #[arg(long, help = "Path to a category configuration file")]
    config: Option<PathBuf>,
    #[arg(long, help = "Print the report as json instead of text")]
    json: bool,
}

/// With no explicit range the report covers the last week plus today.
const DEFAULT_ANALYZED_DAYS: i64 = 7;

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    enable_logging(&create_application_default_path()?, logging_level, args.log)?;

    match args.commands {
        Commands::Analyze { command } => process_analyze_command(command).await,
        Commands::InitConfig { to } => {
            tokio::fs::write(&to, Taxonomy::default().to_json()).await?;
            println!("Wrote default configuration to {}", to.display());
            Ok(())
        }
    }
}

/// Runs the `analyze` command: load, filter to the requested range, analyze,
/// render.
pub async fn process_analyze_command(
    AnalyzeCommand {
        files,
        start_date,
        end_date,
        date_style,
        treat_as_days,
        min_percentage,
        config,
        json,
    }: AnalyzeCommand,
) -> Result<()> {
    let ParamParseResult { start, end } =
        match parse_values(start_date, end_date, date_style, treat_as_days) {
            Ok(value) => value,
            Err(value) => return Err(value),
        };

    let taxonomy = load_taxonomy(config.as_deref()).await?;
    let analyzer_config = AnalyzerConfig {
        taxonomy,
        ..AnalyzerConfig::default()
    };

    let (events, stats) = load_events(&files).await?;
    let loaded = events.len();
    let (start, end) = (start.with_timezone(&Utc), end.with_timezone(&Utc));
    let events: Vec<_> = events
        .into_iter()
        .filter(|v| v.start >= start && v.start < end)
        .collect();
    debug!("{} of {loaded} events fall inside {start} - {end}", events.len());

    let offset = *Local::now().offset();
    let report = analyze(events, stats, min_percentage, &analyzer_config, offset);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report::render_text(&report));
    }
    Ok(())
}

struct ParamParseResult {
    start: DateTime<Local>,
    end: DateTime<Local>,
}

/// Also provides sensible defaults for the `analyze` command.
fn parse_values(
    start_date: Option<String>,
    end_date: Option<String>,
    date_style: DateStyle,
    treat_as_days: bool,
) -> Result<ParamParseResult> {
    let now = Local::now();
    let dialect: chrono_english::Dialect = date_style.into();
    let mut start = match start_date.map(|s| parse_date_string(&s, now, dialect)) {
        Some(Ok(v)) => v.with_timezone(&Local),
        Some(Err(e)) => {
            return Err(Args::command()
                .error(
                    clap::error::ErrorKind::ValueValidation,
                    format!("Failed to validate start date {e}"),
                )
                .into());
        }
        None => now.beginning_of_day() - Duration::days(DEFAULT_ANALYZED_DAYS),
    };
    let mut end = match end_date.map(|s| parse_date_string(&s, now, dialect)) {
        Some(Ok(v)) => v.with_timezone(&Local),
        Some(Err(e)) => {
            return Err(Args::command()
                .error(
                    clap::error::ErrorKind::ValueValidation,
                    format!("Failed to validate end date {e}"),
                )
                .into());
        }
        None => now,
    };
    if treat_as_days {
        start = start.beginning_of_day();
        end = next_day_start(end);
    }

    Ok(ParamParseResult { start, end })
}

pub fn create_application_default_path() -> Result<PathBuf> {
    let path = {
        #[cfg(windows)]
        {
            let mut path =
                PathBuf::from(env::var("APPDATA").expect("APPDATA should be present on Windows"));
            path.push("focusweek");
            path
        }
        #[cfg(not(windows))]
        {
            let mut path = env::var("XDG_STATE_HOME")
                .map(PathBuf::from)
                .or_else(|_| {
                    env::var("HOME").map(|home| {
                        let mut path = PathBuf::from(home);
                        path.push(".local/state");
                        path
                    })
                })
                .expect("Couldn't find neither XDG_STATE_HOME nor HOME");
            path.push("focusweek");
            path
        }
    };

    match std::fs::create_dir_all(&path) {
        Ok(_) => Ok(path),
        Err(v) if v.kind() == io::ErrorKind::AlreadyExists => Ok(path),
        Err(v) => Err(v.into()),
    }
}
