//! 控制台配置
//!
//! 来源优先级：环境变量（`QB_CONSOLE__*`，会先加载 `.env`）高于
//! `config/console.toml`，未配置的键取默认值。

use anyhow::{bail, Context};
use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

pub const ENV_PREFIX: &str = "QB_CONSOLE";
pub const DEFAULT_CONFIG_FILE: &str = "config/console.toml";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConsoleConfig {
    /// 题库服务地址，接口路径拼接在其后
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub page_size: u32,
    /// 会话文件 `{token, user}`；未配置时匿名请求
    pub session_file: Option<PathBuf>,
    pub export_dir: PathBuf,
    /// 表格时间显示的 UTC 偏移（分钟）
    pub display_utc_offset_minutes: i32,
    pub log_filter: String,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:3000/api".to_string(),
            request_timeout_secs: 10,
            page_size: 10,
            session_file: None,
            export_dir: PathBuf::from("exports"),
            display_utc_offset_minutes: 0,
            log_filter: "info".to_string(),
        }
    }
}

impl ConsoleConfig {
    pub fn from_env_and_file() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::load(Some(Path::new(DEFAULT_CONFIG_FILE)))
    }

    /// 从指定文件（不存在则跳过）与环境变量加载
    pub fn load(file: Option<&Path>) -> anyhow::Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = file.filter(|p| p.exists()) {
            builder = builder.add_source(config::File::from(path));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );
        let loaded = builder.build().context("failed to read console config")?;
        let cfg: ConsoleConfig = loaded
            .try_deserialize()
            .context("invalid console config")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let url = Url::parse(self.api_base_url.trim())
            .with_context(|| format!("api_base_url is not a valid URL: {}", self.api_base_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!("api_base_url must use http or https: {}", self.api_base_url);
        }
        if !(1..=300).contains(&self.request_timeout_secs) {
            bail!(
                "request_timeout_secs must be within 1..=300, got {}",
                self.request_timeout_secs
            );
        }
        if !(1..=100).contains(&self.page_size) {
            bail!("page_size must be within 1..=100, got {}", self.page_size);
        }
        if self.display_utc_offset_minutes.abs() > 14 * 60 {
            bail!(
                "display_utc_offset_minutes out of range: {}",
                self.display_utc_offset_minutes
            );
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn display_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.display_utc_offset_minutes * 60).unwrap_or_else(|| Utc.fix())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = ConsoleConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.request_timeout(), Duration::from_secs(10));
        assert_eq!(cfg.display_offset().local_minus_utc(), 0);
    }

    #[test]
    fn test_load_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("console.toml");
        std::fs::write(
            &path,
            r#"
api_base_url = "https://qb.example.com/api"
page_size = 20
display_utc_offset_minutes = 480
session_file = "/tmp/session.json"
"#,
        )
        .unwrap();

        let cfg = ConsoleConfig::load(Some(&path)).unwrap();
        assert_eq!(cfg.api_base_url, "https://qb.example.com/api");
        assert_eq!(cfg.page_size, 20);
        assert_eq!(cfg.request_timeout_secs, 10);
        assert_eq!(cfg.session_file, Some(PathBuf::from("/tmp/session.json")));
        assert_eq!(cfg.display_offset().local_minus_utc(), 8 * 3600);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = ConsoleConfig::load(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(cfg.page_size, 10);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let cfg = ConsoleConfig {
            api_base_url: "ftp://x".into(),
            ..Default::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = ConsoleConfig {
            page_size: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = ConsoleConfig {
            display_utc_offset_minutes: 15 * 60,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }
}
