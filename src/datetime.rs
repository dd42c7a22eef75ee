use anyhow::{Context, Result};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, TimeZone, Utc};

#[cfg(not(test))]
/// 現在のUTC時間を取得する。
pub fn now() -> DateTime<Utc> {
    Utc::now()
}


#[cfg(test)]
pub use mock_datetime::now;

/// 指定したタイムゾーンでの今日の日付を返す。
pub fn today(offset: &FixedOffset) -> NaiveDate {
    now().with_timezone(offset).date_naive()
}

/// `YYYY-MM-DD`形式の日付をパースする。
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("Failed to parse date: {}", s))
}

/// 指定したタイムゾーンで`date`の00:00:00から始まる1日の範囲を返す。
///
/// 終了時刻は翌日の00:00:00で、範囲に含まない。
pub fn day_window(
    date: NaiveDate,
    offset: &FixedOffset,
) -> Result<(DateTime<FixedOffset>, DateTime<FixedOffset>)> {
    let naive_datetime = date
        .and_hms_opt(0, 0, 0)
        .context("Failed to set hour, minute, and second")?;
    let start_at = offset
        .from_local_datetime(&naive_datetime)
        .single()
        .with_context(|| format!("Failed to convert {} to DateTime<FixedOffset>", date))?;
    let end_at = start_at + Duration::days(1);

    Ok((start_at, end_at))
}
