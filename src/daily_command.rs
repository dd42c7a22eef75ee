use anyhow::{Context, Result};
use chrono::{FixedOffset, NaiveDate};
use log::info;

use crate::console::DailyLogPresenter;
use crate::datetime::{day_window, parse_date, today};
use crate::toggl::TogglRepository;

/// 日毎の行動ログを出力するためのサブコマンド。
#[derive(Debug, clap::Args)]
pub struct DailyArgs {
    #[clap(
        short = 'd',
        long = "date",
        help = "Sets a custom date in the format YYYY-MM-DD",
        parse(try_from_str = parse_date),
    )]
    date: Option<NaiveDate>,
}

pub struct DailyCommand<'a, T: TogglRepository> {
    toggl_client: &'a T,
    offset: FixedOffset,
}

impl<'a, T: TogglRepository> DailyCommand<'a, T> {
    /// 新しい`DailyCommand`を返す。
    ///
    /// # Arguments
    /// * `toggl_client` - Toggl APIと通信するためのリポジトリ
    /// * `offset` - 日付の区切りと表示に利用するタイムゾーン
    pub fn new(toggl_client: &'a T, offset: FixedOffset) -> Self {
        Self {
            toggl_client,
            offset,
        }
    }

    /// `daily`サブコマンドの処理を行う。
    ///
    /// 指定された日付の00:00:00から始まる1日のタイムエントリーを取得し、開始時刻順に表示する。
    /// 日付が指定されていない場合は、現在の日付を利用する。
    ///
    /// # Arguments
    ///
    /// * `daily` - `daily`サブコマンドの引数
    /// * `presenter` - 結果の表示先
    pub async fn run<P: DailyLogPresenter>(&self, daily: DailyArgs, presenter: &mut P) -> Result<()> {
        let date = daily.date.unwrap_or_else(|| today(&self.offset));
        let (start_at, end_at) = day_window(date, &self.offset)?;
        info!("Start at: {}, End at: {}", start_at, end_at);

        let mut time_entries = self
            .toggl_client
            .read_time_entries(start_at, end_at)
            .await
            .context("Failed to retrieve time entries")?;
        time_entries.sort_by_key(|entry| entry.start);
        info!("Time entries retrieved successfully.");

        let projects = self
            .toggl_client
            .read_projects()
            .await
            .context("Failed to retrieve projects")?;

        presenter
            .show_time_entries(&time_entries, &projects)
            .with_context(|| format!("Failed to show daily log for {}", date))
    }
}
