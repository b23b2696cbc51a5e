//! 导出文件落盘

use chrono::{DateTime, TimeZone};
use std::fmt::Display;
use std::path::{Path, PathBuf};
use tracing::info;

/// `questions_<科目代码>_<YYYYMMDDHHmmss>.xlsx`
pub fn export_file_name<Tz>(scope_code: &str, at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let code: String = scope_code
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let code = if code.is_empty() { "all".to_string() } else { code };
    format!("questions_{}_{}.xlsx", code, at.format("%Y%m%d%H%M%S"))
}

/// 写入导出内容，目录不存在时自动创建
pub async fn write_export(
    dir: &Path,
    file_name: &str,
    bytes: &[u8],
) -> std::io::Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(file_name);
    tokio::fs::write(&path, bytes).await?;
    info!("[Export] wrote {} bytes to {}", bytes.len(), path.display());
    Ok(path)
}
