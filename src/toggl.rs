use std::env;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, SecondsFormat};
use log::{debug, info};
use reqwest::{header::CONTENT_TYPE, Client};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::config::API_KEY_ENV;
use crate::project::Project;
use crate::tag::Tag;
use crate::time_entry::TimeEntry;

/// Toggl APIのベースURL。
const API_BASE_URL: &str = "https://api.track.toggl.com/api/v9";

/// 1リクエストあたりのタイムアウト。
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Toggl APIのタイムエントリーをデシリアライズするための構造体。
#[derive(Debug, Deserialize)]
struct TogglTimeEntry {
    description: Option<String>,
    start: String,
    stop: Option<String>,
    #[serde(default)]
    duration: Option<i64>,
    project_id: i64,
    #[serde(default)]
    tag_ids: Option<Vec<i64>>,
}

/// Toggl APIのプロジェクト情報をデシリアライズするための構造体。
#[derive(Debug, Deserialize)]
struct TogglProject {
    id: i64,
    name: String,
}

/// Toggl APIのタグ情報をデシリアライズするための構造体。
#[derive(Debug, Deserialize)]
struct TogglTag {
    id: i64,
    name: String,
}

impl TryFrom<TogglTimeEntry> for TimeEntry {
    type Error = anyhow::Error;

    fn try_from(entry: TogglTimeEntry) -> Result<Self> {
        let start = DateTime::parse_from_rfc3339(&entry.start)
            .with_context(|| format!("Failed to parse start: {}", entry.start))?
            .to_utc();
        let stop = entry
            .stop
            .map(|stop| {
                DateTime::parse_from_rfc3339(&stop)
                    .with_context(|| format!("Failed to parse stop: {}", stop))
                    .map(|stop| stop.to_utc())
            })
            .transpose()?;

        Ok(TimeEntry {
            name: entry.description.unwrap_or_default(),
            start,
            stop,
            duration: entry.duration,
            project_id: entry.project_id,
            tag_ids: entry.tag_ids.unwrap_or_default(),
        })
    }
}

impl From<TogglProject> for Project {
    fn from(project: TogglProject) -> Self {
        Project {
            project_id: project.id,
            name: project.name,
        }
    }
}

impl From<TogglTag> for Tag {
    fn from(tag: TogglTag) -> Self {
        Tag {
            tag_id: tag.id,
            name: tag.name,
        }
    }
}

/// Togglのデータを取得するためのリポジトリ。
#[allow(async_fn_in_trait)]
#[cfg_attr(test, mockall::automock)]
pub trait TogglRepository {
    /// `[start_at, end_at)`に含まれるタイムエントリーを取得する。
    async fn read_time_entries(
        &self,
        start_at: DateTime<FixedOffset>,
        end_at: DateTime<FixedOffset>,
    ) -> Result<Vec<TimeEntry>>;

    /// プロジェクト一覧を取得する。
    async fn read_projects(&self) -> Result<Vec<Project>>;

    /// タグ一覧を取得する。
    async fn read_tags(&self) -> Result<Vec<Tag>>;
}

/// Toggl APIと通信するためのクライアント。
///
/// # Examples
///
/// ```
/// let client = TogglClient::new(None).unwrap();
/// let time_entries = client.read_time_entries(start_at, end_at).await.unwrap();
/// ```
pub struct TogglClient {
    client: Client,
    api_url: String,
    api_key: String,
}

impl TogglClient {
    /// 新しい`TogglClient`を返す。
    ///
    /// `api_key`が`None`の場合は環境変数`TOGGL_API_KEY`を利用する。
    /// 環境変数も設定されていない場合は空文字列となり、リクエスト時に認証エラーとなる。
    pub fn new(api_key: Option<String>) -> Result<Self> {
        Self::with_base_url(api_key, API_BASE_URL)
    }

    /// 接続先を指定して新しい`TogglClient`を返す。
    pub fn with_base_url(api_key: Option<String>, api_url: &str) -> Result<Self> {
        let api_key = api_key.unwrap_or_else(|| env::var(API_KEY_ENV).unwrap_or_default());
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build http client")?;

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// `GET {api_url}{path}`を送信し、レスポンスをデシリアライズする。
    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = format!("{}{}", self.api_url, path);
        debug!("GET {} {:?}", url, query);

        self.client
            .get(&url)
            .basic_auth(&self.api_key, Some("api_token"))
            .header(CONTENT_TYPE, "application/json")
            .query(query)
            .send()
            .await
            .with_context(|| format!("Failed to send request to Toggl API at {}", url))?
            .error_for_status()
            .with_context(|| format!("Request to {} returned an error status", url))?
            .json::<T>()
            .await
            .with_context(|| format!("Failed to deserialize response from {}", url))
    }
}

impl TogglRepository for TogglClient {
    async fn read_time_entries(
        &self,
        start_at: DateTime<FixedOffset>,
        end_at: DateTime<FixedOffset>,
    ) -> Result<Vec<TimeEntry>> {
        // 時刻は"2023-09-12T00:00:00.000+09:00"の形式で送る
        let query = [
            (
                "start_date",
                start_at.to_rfc3339_opts(SecondsFormat::Millis, false),
            ),
            ("end_date", end_at.to_rfc3339_opts(SecondsFormat::Millis, false)),
        ];
        let toggl_time_entries: Vec<TogglTimeEntry> = self.get("/me/time_entries", &query).await?;
        info!("length of time entries: {}", toggl_time_entries.len());

        toggl_time_entries
            .into_iter()
            .map(TimeEntry::try_from)
            .collect()
    }

    async fn read_projects(&self) -> Result<Vec<Project>> {
        let projects: Vec<TogglProject> = self.get("/me/projects", &[]).await?;
        info!("length of projects: {}", projects.len());

        Ok(projects.into_iter().map(Project::from).collect())
    }

    async fn read_tags(&self) -> Result<Vec<Tag>> {
        let tags: Vec<TogglTag> = self.get("/me/tags", &[]).await?;
        info!("length of tags: {}", tags.len());

        Ok(tags.into_iter().map(Tag::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use std::env;

    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use chrono::{DateTime, FixedOffset, TimeZone, Utc};
    use mockito::{Matcher, Server};
    use rstest::rstest;
    use serde_json::json;

    use super::{TogglClient, TogglRepository};
    use crate::config::tests::ENV_LOCK;
    use crate::config::API_KEY_ENV;
    use crate::project::Project;
    use crate::tag::Tag;
    use crate::time_entry::TimeEntry;

    fn jst(day: u32, hour: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(9 * 3600)
            .unwrap()
            .with_ymd_and_hms(2023, 10, day, hour, 0, 0)
            .unwrap()
    }

    fn auth_header(api_key: &str) -> String {
        format!("Basic {}", STANDARD.encode(format!("{}:api_token", api_key)))
    }

    #[tokio::test]
    async fn test_read_time_entries() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/me/time_entries")
            .match_header("authorization", auth_header("secret").as_str())
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded(
                    "start_date".into(),
                    "2023-10-10T00:00:00.000+09:00".into(),
                ),
                Matcher::UrlEncoded("end_date".into(), "2023-10-11T00:00:00.000+09:00".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!([
                    {
                        "description": "Coding",
                        "start": "2023-10-10T09:00:00+09:00",
                        "stop": "2023-10-10T10:00:00+09:00",
                        "duration": 3600,
                        "project_id": 5,
                        "tag_ids": [1, 2]
                    },
                    {
                        "description": null,
                        "start": "2023-10-10T01:00:00Z",
                        "stop": null,
                        "duration": -1696899600,
                        "project_id": 6,
                        "tag_ids": null
                    }
                ])
                .to_string(),
            )
            .create_async()
            .await;

        let client = TogglClient::with_base_url(Some("secret".to_string()), &server.url()).unwrap();
        let entries = client
            .read_time_entries(jst(10, 0), jst(11, 0))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(
            entries,
            vec![
                TimeEntry {
                    name: "Coding".to_string(),
                    start: Utc.with_ymd_and_hms(2023, 10, 10, 0, 0, 0).unwrap(),
                    stop: Some(Utc.with_ymd_and_hms(2023, 10, 10, 1, 0, 0).unwrap()),
                    duration: Some(3600),
                    project_id: 5,
                    tag_ids: vec![1, 2]
                },
                TimeEntry {
                    name: "".to_string(),
                    start: Utc.with_ymd_and_hms(2023, 10, 10, 1, 0, 0).unwrap(),
                    stop: None,
                    duration: Some(-1696899600),
                    project_id: 6,
                    tag_ids: vec![]
                },
            ]
        );
    }

    /// 日次ログ用の縮小されたレスポンス(duration, tag_idsなし)も読み込めることを確認する。
    #[tokio::test]
    async fn test_read_time_entries_reduced_fields() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/me/time_entries")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(
                r#"[{"description":"Coding","start":"2023-10-10T09:00:00+09:00","stop":"2023-10-10T10:00:00+09:00","project_id":5}]"#,
            )
            .create_async()
            .await;

        let client = TogglClient::with_base_url(Some("key".to_string()), &server.url()).unwrap();
        let entries = client
            .read_time_entries(jst(10, 0), jst(11, 0))
            .await
            .unwrap();

        assert_eq!(
            entries,
            vec![TimeEntry {
                name: "Coding".to_string(),
                start: DateTime::parse_from_rfc3339("2023-10-10T09:00:00+09:00")
                    .unwrap()
                    .to_utc(),
                stop: Some(
                    DateTime::parse_from_rfc3339("2023-10-10T10:00:00+09:00")
                        .unwrap()
                        .to_utc()
                ),
                duration: None,
                project_id: 5,
                tag_ids: vec![]
            }]
        );
    }

    /// `Z`付きの終了時刻も同じ時刻として読み込めることを確認する。
    #[tokio::test]
    async fn test_read_time_entries_utc_stop() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/me/time_entries")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(
                json!([{
                    "description": "Coding",
                    "start": "2023-10-10T09:00:00+09:00",
                    "stop": "2023-10-10T10:00:00Z",
                    "duration": 3600,
                    "project_id": 5
                }])
                .to_string(),
            )
            .create_async()
            .await;

        let client = TogglClient::with_base_url(Some("key".to_string()), &server.url()).unwrap();
        let entries = client
            .read_time_entries(jst(10, 0), jst(11, 0))
            .await
            .unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(
            entries[0].stop,
            Some(Utc.with_ymd_and_hms(2023, 10, 10, 10, 0, 0).unwrap())
        );
        assert_eq!(entries[0].duration, Some(3600));
    }

    #[rstest]
    #[case::missing_project_id(json!([{
        "description": "Coding",
        "start": "2023-10-10T09:00:00+09:00",
        "stop": "2023-10-10T10:00:00+09:00",
        "duration": 3600
    }]))]
    #[case::invalid_start(json!([{
        "description": "Coding",
        "start": "yesterday",
        "stop": "2023-10-10T10:00:00+09:00",
        "duration": 3600,
        "project_id": 5
    }]))]
    #[case::not_a_list(json!({"id": 1}))]
    #[tokio::test]
    async fn test_read_time_entries_decode_error(#[case] body: serde_json::Value) {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/me/time_entries")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(body.to_string())
            .create_async()
            .await;

        let client = TogglClient::with_base_url(Some("key".to_string()), &server.url()).unwrap();
        let result = client.read_time_entries(jst(10, 0), jst(11, 0)).await;

        assert!(result.is_err());
    }

    #[rstest]
    #[case::unauthorized(403)]
    #[case::server_error(500)]
    #[tokio::test]
    async fn test_read_projects_error_status(#[case] status: usize) {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/me/projects")
            .with_status(status)
            .expect(1)
            .create_async()
            .await;

        let client = TogglClient::with_base_url(Some("key".to_string()), &server.url()).unwrap();
        let result = client.read_projects().await;

        mock.assert_async().await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_read_projects() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/me/projects")
            .match_header("authorization", auth_header("key").as_str())
            .with_status(200)
            .with_body(json!([{"id": 5, "name": "Work"}, {"id": 6, "name": "Study"}]).to_string())
            .create_async()
            .await;

        let client = TogglClient::with_base_url(Some("key".to_string()), &server.url()).unwrap();
        let projects = client.read_projects().await.unwrap();

        assert_eq!(
            projects,
            vec![
                Project {
                    project_id: 5,
                    name: "Work".to_string()
                },
                Project {
                    project_id: 6,
                    name: "Study".to_string()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_read_tags() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/me/tags")
            .with_status(200)
            .with_body(json!([{"id": 1, "name": "dev", "workspace_id": 9}]).to_string())
            .create_async()
            .await;

        let client = TogglClient::with_base_url(Some("key".to_string()), &server.url()).unwrap();
        let tags = client.read_tags().await.unwrap();

        assert_eq!(
            tags,
            vec![Tag {
                tag_id: 1,
                name: "dev".to_string()
            }]
        );
    }

    /// APIキーを指定しない場合は環境変数を利用し、未設定なら空文字列になることを確認する。
    #[tokio::test]
    async fn test_api_key_from_env() {
        let mut server = Server::new_async().await;
        let from_env = server
            .mock("GET", "/me/tags")
            .match_header("authorization", auth_header("env-key").as_str())
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let (with_env, without_env) = {
            let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
            env::set_var(API_KEY_ENV, "env-key");
            let with_env = TogglClient::with_base_url(None, &server.url()).unwrap();
            env::remove_var(API_KEY_ENV);
            let without_env = TogglClient::with_base_url(None, &server.url()).unwrap();
            (with_env, without_env)
        };

        with_env.read_tags().await.unwrap();
        from_env.assert_async().await;
        assert_eq!(without_env.api_key, "");
    }
}
