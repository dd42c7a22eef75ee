use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fern::colors::{Color, ColoredLevelConfig};
use file_rotate::compression::Compression;
use file_rotate::suffix::AppendCount;
use file_rotate::{ContentLimit, FileRotate};
use log::LevelFilter;

/// ログファイルを置くディレクトリ名。
const APP_DIR_NAME: &str = "toggl-reports";

/// ログファイルを切り替えるサイズ。
const LOG_FILE_MAX_BYTES: usize = 10 * 1024 * 1024;

/// 残しておく古いログファイルの数。
const LOG_FILE_BACKUPS: usize = 1;

/// ログの保存先を指定しない場合のファイルパスを返す。
///
/// Linuxでは`~/.local/share/toggl-reports/toggl-reports.log`となる。
pub fn default_log_path() -> Result<PathBuf> {
    let data_dir = dirs::data_local_dir().context("Failed to find local data directory")?;
    Ok(data_dir
        .join(APP_DIR_NAME)
        .join(format!("{}.log", APP_DIR_NAME)))
}

/// `max_bytes`を超えたら`<path>.1`へ切り替えるログファイルを返す。
fn rotating_log_file(path: &Path, max_bytes: usize) -> FileRotate<AppendCount> {
    FileRotate::new(
        path,
        AppendCount::new(LOG_FILE_BACKUPS),
        ContentLimit::Bytes(max_bytes),
        Compression::None,
        #[cfg(unix)]
        None,
    )
}

/// ログ出力を設定する。
///
/// 標準エラー出力には色付きで出力し、`log_file`が指定された場合はファイルにも追記する。
/// ファイルは10MBを超えると切り替え、古いものは1つだけ残す。
/// 標準出力はレポートの出力先として使うため、ログは出力しない。
///
/// # Arguments
///
/// * `level` - 出力するログレベル
/// * `log_file` - ログを追記するファイル
pub fn setup_logger(level: LevelFilter, log_file: Option<&Path>) -> Result<()> {
    let colors = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Blue)
        .trace(Color::BrightBlack);

    let console = fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{:>7}] {} ({}) {}",
                colors.color(record.level()),
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.target(),
                message
            ))
        })
        .chain(io::stderr());

    let mut dispatch = fern::Dispatch::new()
        .level(level)
        // 通信ライブラリのログは多いので抑える
        .level_for("hyper", LevelFilter::Warn)
        .level_for("reqwest", LevelFilter::Warn)
        .chain(console);

    if let Some(path) = log_file {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create log directory: {}", parent.display()))?;
        }
        let file: Box<dyn io::Write + Send> =
            Box::new(rotating_log_file(path, LOG_FILE_MAX_BYTES));
        dispatch = dispatch.chain(
            fern::Dispatch::new()
                .format(|out, message, record| {
                    out.finish(format_args!(
                        "[{:>7}] {} ({}) {}",
                        record.level(),
                        chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                        record.target(),
                        message
                    ))
                })
                .chain(file),
        );
    }

    dispatch.apply().context("Failed to set logger")?;

    Ok(())
}
