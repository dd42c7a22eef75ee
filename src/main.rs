use std::io;
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{error, LevelFilter};

mod config;
mod console;
mod daily_command;
mod datetime;
mod duration;
mod logger;
mod project;
mod summary_command;
mod tag;
mod time_entry;
mod toggl;

use config::{display_offset, ExcludedTags};
use console::ConsoleMarkdownList;
use daily_command::{DailyArgs, DailyCommand};
use summary_command::{SummaryArgs, SummaryCommand};
use toggl::TogglClient;

/// Togglのtime entryから日次ログと集計表を出力するCLIアプリケーション。
///
/// # Examples
/// ```
/// $ cargo run -- --log-file daily --date 2023-10-10
/// $ TOGGL_EXCLUDE_TAG_IDS=1,2 cargo run -- summary --date 2023-10-10 --days 2
/// ```
#[derive(Debug, Parser)]
#[clap(version, about)]
struct Args {
    #[clap(long = "log-level", help = "Sets the log level", default_value = "info")]
    log_level: LevelFilter,

    #[clap(
        long = "log-file",
        require_equals = true,
        help = "Appends logs to a file (--log-file=PATH); uses the data directory when no path is given"
    )]
    log_file: Option<Option<PathBuf>>,

    #[clap(long = "api-key", help = "Toggl API key; defaults to TOGGL_API_KEY")]
    api_key: Option<String>,

    #[clap(subcommand)]
    subcommand: SubCommands,
}

/// サブコマンドを表す列挙型。
#[derive(Debug, Subcommand)]
enum SubCommands {
    /// Shows the time entries of a day as a list
    Daily(DailyArgs),
    /// Shows the durations per project and tag for each day as a table
    Summary(SummaryArgs),
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_file = match &args.log_file {
        Some(Some(path)) => Some(path.clone()),
        Some(None) => Some(logger::default_log_path()?),
        None => None,
    };
    logger::setup_logger(args.log_level, log_file.as_deref())?;

    if let Err(err) = run(args).await {
        error!("Unhandled error occurred: {:?}", err);
        process::exit(1);
    }

    Ok(())
}

/// 設定を読み込み、サブコマンドを実行する。
async fn run(args: Args) -> Result<()> {
    let excluded = load_excluded_tags(&args.subcommand)?;
    let offset = display_offset()?;
    let client = TogglClient::new(args.api_key).context("Failed to new toggl client")?;

    let stdout = io::stdout();
    let mut writer = stdout.lock();
    match args.subcommand {
        SubCommands::Daily(daily) => {
            let mut presenter = ConsoleMarkdownList::new(&mut writer, offset);
            DailyCommand::new(&client, offset)
                .run(daily, &mut presenter)
                .await?
        }
        SubCommands::Summary(summary) => {
            SummaryCommand::new(&client, offset, &excluded)
                .run(summary, &mut writer)
                .await?
        }
    }

    Ok(())
}

/// サブコマンドが利用する除外タグを読み込む。
///
/// 日次ログは除外タグを利用しないため、環境変数を読まずに空の集合を返す。
fn load_excluded_tags(subcommand: &SubCommands) -> Result<ExcludedTags> {
    match subcommand {
        SubCommands::Daily(_) => Ok(ExcludedTags::default()),
        SubCommands::Summary(_) => {
            ExcludedTags::from_env().context("Failed to load excluded tag ids")
        }
    }
}
