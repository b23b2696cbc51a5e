//! 登录会话来源
//!
//! 网关在每次请求时读取令牌，会话的建立与失效由外部负责。

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// 会话中的最小用户信息
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionUser {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub role: String,
}

/// 本地持久化的会话
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredSession {
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<SessionUser>,
}

/// 令牌来源
pub trait SessionSource: Send + Sync {
    /// 当前的 Bearer 令牌，未登录时返回 `None`
    fn bearer_token(&self) -> Option<String>;
}

/// 固定令牌
#[derive(Debug, Clone, Default)]
pub struct StaticSession {
    token: Option<String>,
}

impl StaticSession {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    pub fn anonymous() -> Self {
        Self { token: None }
    }
}

impl SessionSource for StaticSession {
    fn bearer_token(&self) -> Option<String> {
        self.token.clone()
    }
}

/// 从 JSON 文件读取会话，每次调用都重新读取
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Option<StoredSession> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(
                    "[Session] failed to read session file {}: {}",
                    self.path.display(),
                    e
                );
                return None;
            }
        };
        match serde_json::from_str::<StoredSession>(&raw) {
            Ok(session) => Some(session),
            Err(e) => {
                warn!(
                    "[Session] session file {} is not valid JSON: {}",
                    self.path.display(),
                    e
                );
                None
            }
        }
    }
}

impl SessionSource for FileSessionStore {
    fn bearer_token(&self) -> Option<String> {
        self.load()
            .map(|s| s.token)
            .filter(|t| !t.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_file_session_reads_token() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"token":"abc123","user":{{"id":"u1","username":"admin","role":"admin"}}}}"#
        )
        .unwrap();

        let store = FileSessionStore::new(file.path());
        assert_eq!(store.bearer_token().as_deref(), Some("abc123"));
        assert_eq!(
            store.load().and_then(|s| s.user).map(|u| u.username),
            Some("admin".to_string())
        );
    }

    #[test]
    fn test_file_session_rereads_each_call() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let store = FileSessionStore::new(&path);
        assert_eq!(store.bearer_token(), None);

        std::fs::write(&path, r#"{"token":"t1"}"#).unwrap();
        assert_eq!(store.bearer_token().as_deref(), Some("t1"));

        std::fs::write(&path, r#"{"token":"t2"}"#).unwrap();
        assert_eq!(store.bearer_token().as_deref(), Some("t2"));
    }

    #[test]
    fn test_file_session_ignores_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "not json").unwrap();
        assert_eq!(FileSessionStore::new(&path).bearer_token(), None);

        std::fs::write(&path, r#"{"token":"  "}"#).unwrap();
        assert_eq!(FileSessionStore::new(&path).bearer_token(), None);
    }

    #[test]
    fn test_static_session() {
        assert_eq!(StaticSession::new("k").bearer_token().as_deref(), Some("k"));
        assert_eq!(StaticSession::anonymous().bearer_token(), None);
    }
}
