use std::io::Write;

use anyhow::{Context, Result};
use chrono::{Duration, FixedOffset, NaiveDate};
use log::info;

use crate::config::ExcludedTags;
use crate::console::ConsoleMarkdownTable;
use crate::console::SummaryPresenter;
use crate::datetime::{day_window, parse_date, today};
use crate::duration::calc_tag_durations;
use crate::toggl::TogglRepository;

/// `summary`サブコマンドの引数を表す構造体。
#[derive(Debug, clap::Args)]
pub struct SummaryArgs {
    #[clap(
        short = 'd',
        long = "date",
        help = "Sets the first date in the format YYYY-MM-DD",
        parse(try_from_str = parse_date),
    )]
    date: Option<NaiveDate>,

    #[clap(
        short = 'n',
        long = "days",
        help = "Number of days to summarize",
        default_value = "2"
    )]
    pub(crate) days: u32,
}

pub struct SummaryCommand<'a, T: TogglRepository> {
    toggl_client: &'a T,
    offset: FixedOffset,
    excluded: &'a ExcludedTags,
}

impl<'a, T: TogglRepository> SummaryCommand<'a, T> {
    /// 新しい`SummaryCommand`を返す。
    ///
    /// # Arguments
    /// * `toggl_client` - Toggl APIと通信するためのリポジトリ
    /// * `offset` - 日付の区切りに利用するタイムゾーン
    /// * `excluded` - 集計から除外するタグID
    pub fn new(toggl_client: &'a T, offset: FixedOffset, excluded: &'a ExcludedTags) -> Self {
        Self {
            toggl_client,
            offset,
            excluded,
        }
    }

    /// `summary`サブコマンドの処理を行う。
    ///
    /// 指定された日付から1日ずつ、プロジェクト、タグごとの集計結果を日毎に出力する。
    /// プロジェクトとタグの一覧は日毎に取得し直す。
    ///
    /// # Arguments
    ///
    /// * `summary` - `summary`サブコマンドの引数
    /// * `writer` - 結果の出力先
    pub async fn run<W: Write>(&self, summary: SummaryArgs, writer: &mut W) -> Result<()> {
        let first_date = summary.date.unwrap_or_else(|| today(&self.offset));

        for index in 0..summary.days {
            let date = first_date + Duration::days(i64::from(index));
            let (start_at, end_at) = day_window(date, &self.offset)?;
            info!("start date: {}", date.format("%Y-%m-%d"));

            let mut time_entries = self
                .toggl_client
                .read_time_entries(start_at, end_at)
                .await
                .with_context(|| format!("Failed to retrieve time entries for {}", date))?;
            time_entries.sort_by_key(|entry| entry.start);
            let projects = self
                .toggl_client
                .read_projects()
                .await
                .context("Failed to retrieve projects")?;
            let tags = self
                .toggl_client
                .read_tags()
                .await
                .context("Failed to retrieve tags")?;

            let durations = calc_tag_durations(&time_entries, self.excluded);

            writeln!(writer, "## {}", date.format("%Y-%m-%d")).context("Failed to write date")?;
            ConsoleMarkdownTable::new(&mut *writer)
                .show_durations(&durations, &projects, &tags)
                .with_context(|| format!("Failed to show summary for {}", date))?;
        }

        Ok(())
    }
}
