use std::collections::HashMap;
use std::io::Write;

use anyhow::{Context, Result};
use chrono::FixedOffset;
use thiserror::Error;

use crate::duration::{QuarterHours, TagDuration};
use crate::project::Project;
use crate::tag::Tag;
use crate::time_entry::TimeEntry;

/// 終了時刻の表示形式。
///
/// 分ではなく月(`%m`)を出力しているが、既存の出力との互換のためそのままにしている。
const END_MARKER_FORMAT: &str = "%H:%m";

/// レポートの描画に失敗したことを表す。
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReportError {
    #[error("project {0} is not found")]
    UnknownProject(i64),

    #[error("tag {0} is not found")]
    UnknownTag(i64),

    #[error("no time entries to show")]
    NoEntries,

    #[error("time entry {0:?} has not stopped yet")]
    EntryNotStopped(String),
}

/// 日次のtime entryをConsoleに表示するためのtrait。
pub trait DailyLogPresenter {
    /// タイムエントリーを表示する。
    ///
    /// # Arguments
    ///
    /// * `time_entries` - 開始時刻順に並んだタイムエントリー
    /// * `projects` - タイムエントリーが参照するプロジェクト
    fn show_time_entries(&mut self, time_entries: &[TimeEntry], projects: &[Project])
        -> Result<()>;
}

/// プロジェクト、タグごとの集計結果をConsoleに表示するためのtrait。
pub trait SummaryPresenter {
    /// 集計結果を表示する。
    ///
    /// # Arguments
    ///
    /// * `durations` - プロジェクト、タグごとの経過時間
    /// * `projects` - 集計結果が参照するプロジェクト
    /// * `tags` - 集計結果が参照するタグ
    fn show_durations(
        &mut self,
        durations: &[TagDuration],
        projects: &[Project],
        tags: &[Tag],
    ) -> Result<()>;
}

/// タイムエントリーをMarkdownのlist形式で表示する。
///
/// 最後に、最後のtime entryの終了時刻を`終了`として表示する。
pub struct ConsoleMarkdownList<'a, W: Write> {
    writer: &'a mut W,
    offset: FixedOffset,
}

impl<'a, W: Write> ConsoleMarkdownList<'a, W> {
    /// 新しい`ConsoleMarkdownList`を返す。
    ///
    /// # Arguments
    /// * `writer` - 出力先
    /// * `offset` - 時刻を表示するタイムゾーン
    pub fn new(writer: &'a mut W, offset: FixedOffset) -> Self {
        Self { writer, offset }
    }
}

impl<'a, W: Write> DailyLogPresenter for ConsoleMarkdownList<'a, W> {
    fn show_time_entries(
        &mut self,
        time_entries: &[TimeEntry],
        projects: &[Project],
    ) -> Result<()> {
        let last_entry = time_entries.last().ok_or(ReportError::NoEntries)?;
        let project_names: HashMap<i64, &str> = projects
            .iter()
            .map(|project| (project.project_id, project.name.as_str()))
            .collect();

        for entry in time_entries {
            let project_name = project_names
                .get(&entry.project_id)
                .ok_or(ReportError::UnknownProject(entry.project_id))?;
            let start_str = entry
                .start
                .with_timezone(&self.offset)
                .format("%H:%M")
                .to_string();
            writeln!(self.writer, "- {} {} {}", start_str, project_name, entry.name)
                .with_context(|| format!("Failed to write time entry: {:?}", entry))?;
        }

        let stop = last_entry
            .stop
            .ok_or_else(|| ReportError::EntryNotStopped(last_entry.name.clone()))?;
        let stop_str = stop
            .with_timezone(&self.offset)
            .format(END_MARKER_FORMAT)
            .to_string();
        writeln!(self.writer, "- {} 終了", stop_str).context("Failed to write end marker")?;

        Ok(())
    }
}

/// 集計結果をMarkdownのtable形式で表示する。
///
/// プロジェクトごとに合計の行を出力し、続けてタグごとの行を出力する。時間は15分刻みに丸める。
pub struct ConsoleMarkdownTable<'a, W: Write> {
    writer: &'a mut W,
}

impl<'a, W: Write> ConsoleMarkdownTable<'a, W> {
    /// 新しい`ConsoleMarkdownTable`を返す。
    pub fn new(writer: &'a mut W) -> Self {
        Self { writer }
    }
}

impl<'a, W: Write> SummaryPresenter for ConsoleMarkdownTable<'a, W> {
    fn show_durations(
        &mut self,
        durations: &[TagDuration],
        projects: &[Project],
        tags: &[Tag],
    ) -> Result<()> {
        let project_names: HashMap<i64, &str> = projects
            .iter()
            .map(|project| (project.project_id, project.name.as_str()))
            .collect();
        let tag_names: HashMap<i64, &str> =
            tags.iter().map(|tag| (tag.tag_id, tag.name.as_str())).collect();

        // 最初に現れた順でプロジェクトごとにまとめる
        let mut groups: Vec<(i64, Vec<&TagDuration>)> = Vec::new();
        for duration in durations {
            match groups
                .iter_mut()
                .find(|(project_id, _)| *project_id == duration.project_id)
            {
                Some((_, rows)) => rows.push(duration),
                None => groups.push((duration.project_id, vec![duration])),
            }
        }

        writeln!(self.writer, "| Project | Tag | Duration |").context("Failed to write header")?;
        writeln!(self.writer, "| :------ | :-- | -------: |").context("Failed to write header")?;
        for (project_id, rows) in groups {
            let project_name = project_names
                .get(&project_id)
                .ok_or(ReportError::UnknownProject(project_id))?;
            let total: i64 = rows.iter().map(|row| row.duration).sum();
            writeln!(
                self.writer,
                "| {} | - | {} |",
                project_name,
                QuarterHours::from_seconds(total)
            )
            .with_context(|| format!("Failed to write project total: {}", project_name))?;

            for row in rows {
                let tag_name = tag_names
                    .get(&row.tag_id)
                    .ok_or(ReportError::UnknownTag(row.tag_id))?;
                writeln!(
                    self.writer,
                    "| {} | {} | {} |",
                    project_name,
                    tag_name,
                    QuarterHours::from_seconds(row.duration)
                )
                .with_context(|| format!("Failed to write tag duration: {:?}", row))?;
            }
        }

        Ok(())
    }
}
