//! 远端题库服务错误类型
//!
//! 所有网关失败都归入固定的几类，调用方只需按类别处理。

use serde::Serialize;
use thiserror::Error;

/// 网关错误
#[derive(Debug, Clone, Error, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "message")]
pub enum GatewayError {
    /// 无法连接服务（超时、DNS、连接被拒等）
    #[error("Network error: {0}")]
    Network(String),

    /// 服务端拒绝请求内容（400/409/422，或 `success: false`）
    #[error("Validation error: {0}")]
    Validation(String),

    /// 未登录或无权限（401/403）
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// 资源不存在（404）
    #[error("Not found: {0}")]
    NotFound(String),

    /// 服务端错误或响应无法解析
    #[error("Server error: {0}")]
    Server(String),

    /// 客户端配置错误（如 base URL 非法）
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl GatewayError {
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::Network(_) => "NETWORK_ERROR",
            GatewayError::Validation(_) => "VALIDATION_ERROR",
            GatewayError::Unauthorized(_) => "UNAUTHORIZED",
            GatewayError::NotFound(_) => "NOT_FOUND",
            GatewayError::Server(_) => "SERVER_ERROR",
            GatewayError::Configuration(_) => "CONFIGURATION_ERROR",
        }
    }

    /// 面向用户的提示文案
    ///
    /// 校验类错误直接透传服务端消息，其余类别使用固定文案。
    pub fn user_message(&self) -> String {
        match self {
            GatewayError::Network(_) => "网络错误，请检查网络连接".to_string(),
            GatewayError::Unauthorized(_) => "未授权，请重新登录".to_string(),
            GatewayError::NotFound(_) => "请求的资源不存在".to_string(),
            GatewayError::Server(_) => "服务器错误，请稍后重试".to_string(),
            GatewayError::Configuration(msg) => format!("配置错误：{}", msg),
            GatewayError::Validation(msg) if msg.trim().is_empty() => "请求参数错误".to_string(),
            GatewayError::Validation(msg) => msg.clone(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            GatewayError::Network(m)
            | GatewayError::Validation(m)
            | GatewayError::Unauthorized(m)
            | GatewayError::NotFound(m)
            | GatewayError::Server(m)
            | GatewayError::Configuration(m) => m,
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(e: serde_json::Error) -> Self {
        GatewayError::Server(format!("malformed response: {}", e))
    }
}

impl From<url::ParseError> for GatewayError {
    fn from(e: url::ParseError) -> Self {
        GatewayError::Configuration(e.to_string())
    }
}

/// Result 类型别名
pub type GatewayResult<T> = Result<T, GatewayError>;
