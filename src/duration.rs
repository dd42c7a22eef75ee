use std::collections::HashMap;
use std::fmt;

use log::warn;

use crate::config::ExcludedTags;
use crate::time_entry::TimeEntry;

/// 1区切り(15分)の秒数。
const QUARTER_HOUR_SECONDS: i64 = 900;

/// プロジェクトとタグの組ごとの経過時間。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagDuration {
    pub project_id: i64,
    pub tag_id: i64,
    pub duration: i64,
}

/// `(project_id, tag_id)`をキーに経過秒数を積算する。
///
/// 最初に現れた順序を保持する。
#[derive(Debug, Default)]
struct TagDurationAccumulator {
    order: Vec<(i64, i64)>,
    totals: HashMap<(i64, i64), i64>,
}

impl TagDurationAccumulator {
    fn add(&mut self, key: (i64, i64), duration: i64) {
        if !self.totals.contains_key(&key) {
            self.order.push(key);
        }
        *self.totals.entry(key).or_insert(0) += duration;
    }

    fn into_durations(self) -> Vec<TagDuration> {
        let totals = self.totals;
        self.order
            .into_iter()
            .map(|(project_id, tag_id)| TagDuration {
                project_id,
                tag_id,
                duration: totals.get(&(project_id, tag_id)).copied().unwrap_or(0),
            })
            .collect()
    }
}

/// プロジェクトごと、かつタグごとの経過時間の総和を計算する。
///
/// 除外タグは加算前に取り除く。タグのないtime entryと経過時間のないtime entryはどの集計にも含まれない。
/// 計測中のtime entryの負の経過時間もそのまま加算するため、必要なら呼び出し側で除外すること。
///
/// # Arguments
///
/// * `time_entries` - 集計するタイムエントリー
/// * `excluded` - 集計から除外するタグID
pub fn calc_tag_durations(time_entries: &[TimeEntry], excluded: &ExcludedTags) -> Vec<TagDuration> {
    let mut accumulator = TagDurationAccumulator::default();
    for entry in time_entries {
        let Some(duration) = entry.duration else {
            warn!("Skip time entry without duration: {:?}", entry.name);
            continue;
        };
        for &tag_id in &entry.tag_ids {
            if excluded.contains(tag_id) {
                continue;
            }
            accumulator.add((entry.project_id, tag_id), duration);
        }
    }

    accumulator.into_durations()
}

/// 15分刻みに丸めた時間数。
///
/// 表示は整数なら`2.0`、それ以外は`0.25`のように最短の小数で行う。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QuarterHours(i64);

impl QuarterHours {
    /// 秒数を最も近い15分刻みに丸める。ちょうど中間の場合は偶数側に丸める。
    pub fn from_seconds(seconds: i64) -> Self {
        let quarters = seconds.div_euclid(QUARTER_HOUR_SECONDS);
        let remainder = seconds.rem_euclid(QUARTER_HOUR_SECONDS) * 2;
        let rounded = match remainder.cmp(&QUARTER_HOUR_SECONDS) {
            std::cmp::Ordering::Less => quarters,
            std::cmp::Ordering::Greater => quarters + 1,
            std::cmp::Ordering::Equal => quarters + quarters.rem_euclid(2),
        };
        Self(rounded)
    }

    pub fn hours(&self) -> f64 {
        self.0 as f64 / 4.0
    }
}

impl fmt::Display for QuarterHours {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hours = self.hours();
        if self.0 % 4 == 0 {
            write!(f, "{:.1}", hours)
        } else {
            write!(f, "{}", hours)
        }
    }
}
