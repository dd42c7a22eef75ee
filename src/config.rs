use std::collections::HashSet;
use std::env;
use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::FixedOffset;
use thiserror::Error;

/// Toggl APIのキーを保持する環境変数名。
pub const API_KEY_ENV: &str = "TOGGL_API_KEY";

/// 集計から除外するタグIDをカンマ区切りで保持する環境変数名。
pub const EXCLUDE_TAG_IDS_ENV: &str = "TOGGL_EXCLUDE_TAG_IDS";

/// 表示と日付の区切りに利用するUTCからのオフセット(時間)。
pub const DISPLAY_OFFSET_HOURS: i32 = 9;

/// 設定の読み込みに失敗したことを表す。
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid tag id {token:?} in TOGGL_EXCLUDE_TAG_IDS")]
    InvalidTagId { token: String },

    #[error("{name} is not valid unicode")]
    NotUnicode { name: &'static str },
}

/// 表示用のタイムゾーンを返す。
pub fn display_offset() -> Result<FixedOffset> {
    FixedOffset::east_opt(DISPLAY_OFFSET_HOURS * 3600)
        .with_context(|| format!("Invalid display offset: {} hours", DISPLAY_OFFSET_HOURS))
}

/// 集計から除外するタグIDの集合。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExcludedTags(HashSet<i64>);

impl ExcludedTags {
    /// 環境変数`TOGGL_EXCLUDE_TAG_IDS`から読み込む。
    ///
    /// 未設定の場合は空の集合を返す。
    pub fn from_env() -> std::result::Result<Self, ConfigError> {
        match env::var(EXCLUDE_TAG_IDS_ENV) {
            Ok(value) => value.parse(),
            Err(env::VarError::NotPresent) => Ok(Self::default()),
            Err(env::VarError::NotUnicode(_)) => Err(ConfigError::NotUnicode {
                name: EXCLUDE_TAG_IDS_ENV,
            }),
        }
    }

    pub fn contains(&self, tag_id: i64) -> bool {
        self.0.contains(&tag_id)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromStr for ExcludedTags {
    type Err = ConfigError;

    /// `1,2, 3`のようなカンマ区切りの文字列をパースする。空の要素は無視する。
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        s.split(',')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(|token| {
                token.parse::<i64>().map_err(|_| ConfigError::InvalidTagId {
                    token: token.to_string(),
                })
            })
            .collect::<std::result::Result<HashSet<_>, _>>()
            .map(Self)
    }
}

impl FromIterator<i64> for ExcludedTags {
    fn from_iter<I: IntoIterator<Item = i64>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
