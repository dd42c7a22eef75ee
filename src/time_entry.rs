use chrono::{DateTime, Utc};

/// Togglの時間記録を表す。
///
/// 時刻はAPIの境界でUTCの時刻に変換済み。表示用のタイムゾーンは描画時に決める。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimeEntry {
    pub name: String,
    pub start: DateTime<Utc>,
    /// 計測中のtime entryは`None`。
    pub stop: Option<DateTime<Utc>>,
    /// 経過秒数。計測中のtime entryでは負の値になる。
    ///
    /// 日次ログ用の縮小されたレスポンスには含まれないため`None`となる。
    pub duration: Option<i64>,
    pub project_id: i64,
    pub tag_ids: Vec<i64>,
}
