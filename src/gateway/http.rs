//! 基于 reqwest 的题库服务客户端
//!
//! 所有 JSON 响应都包在 `{success, data, message}` 信封里；
//! 导出接口直接返回文件内容。

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::error::{GatewayError, GatewayResult};
use super::traits::{QuestionGateway, SubjectGateway};
use crate::config::ConsoleConfig;
use crate::models::{
    CreateSubjectParams, Difficulty, Question, QuestionFilters, QuestionPage, QuestionPayload,
    QuestionType, Subject, SubjectFilters, SubjectPage, UpdateSubjectParams,
};
use crate::session::SessionSource;

/// 响应信封
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<serde_json::Value>,
    #[serde(default)]
    message: Option<String>,
}

/// 题目列表/导出的请求体
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QuestionQuery<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    subject_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    search_keyword: Option<&'a str>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    kind: Option<QuestionType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    difficulty: Option<Difficulty>,
    #[serde(skip_serializing_if = "Option::is_none")]
    has_audio_files: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    is_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<u32>,
}

impl<'a> QuestionQuery<'a> {
    fn from_filters(filters: &'a QuestionFilters) -> Self {
        let search = filters.search.trim();
        Self {
            subject_id: filters.scope_id.as_deref(),
            search_keyword: (!search.is_empty()).then_some(search),
            kind: filters.kind.value().copied(),
            difficulty: filters.difficulty.value().copied(),
            has_audio_files: filters.has_audio.value().copied(),
            is_enabled: filters.enabled.value().copied(),
            page: None,
            limit: None,
        }
    }

    fn paged(mut self, page: u32, limit: u32) -> Self {
        self.page = Some(page);
        self.limit = Some(limit);
        self
    }
}

#[derive(Debug, Serialize)]
struct BatchDeleteBody<'a> {
    ids: &'a [String],
}

/// HTTP 网关，同时实现题目与科目两个集合接口
pub struct HttpGateway {
    base_url: Url,
    http: Client,
    session: Arc<dyn SessionSource>,
}

impl HttpGateway {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        session: Arc<dyn SessionSource>,
    ) -> GatewayResult<Self> {
        let trimmed = base_url.trim();
        if trimmed.is_empty() {
            return Err(GatewayError::Configuration(
                "api base URL 不能为空".to_string(),
            ));
        }
        let url = Url::parse(trimmed)
            .map_err(|e| GatewayError::Configuration(format!("无效的 api base URL: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
            return Err(GatewayError::Configuration(format!(
                "api base URL 必须是 http(s) 地址: {trimmed}"
            )));
        }

        let http = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Configuration(format!("构建 HTTP 客户端失败: {e}")))?;

        Ok(Self {
            base_url: url,
            http,
            session,
        })
    }

    pub fn from_config(
        config: &ConsoleConfig,
        session: Arc<dyn SessionSource>,
    ) -> GatewayResult<Self> {
        Self::new(&config.api_base_url, config.request_timeout(), session)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// 拼接接口路径，各段按 URL 规则转义
    fn endpoint(&self, segments: &[&str]) -> GatewayResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                GatewayError::Configuration(format!("无效的 api base URL: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> GatewayResult<RequestBuilder> {
        let url = self.endpoint(segments)?;
        debug!("[HttpGateway] {} {}", method, url);
        let builder = self.http.request(method, url);
        Ok(match self.session.bearer_token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    async fn dispatch(&self, builder: RequestBuilder) -> GatewayResult<Response> {
        let response = builder.send().await.map_err(classify_transport)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.bytes().await.unwrap_or_default();
        let err = classify_status(status, &body);
        warn!("[HttpGateway] request failed: {} ({})", err, err.code());
        Err(err)
    }

    async fn read_envelope(&self, builder: RequestBuilder) -> GatewayResult<Envelope> {
        let response = self.dispatch(builder).await?;
        let body = response.bytes().await.map_err(classify_transport)?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Envelope {
                success: true,
                data: None,
                message: None,
            });
        }
        let envelope: Envelope = serde_json::from_slice(&body)?;
        if !envelope.success {
            let message = envelope
                .message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| "请求失败".to_string());
            return Err(GatewayError::Validation(message));
        }
        Ok(envelope)
    }

    async fn send_enveloped<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> GatewayResult<T> {
        let envelope = self.read_envelope(builder).await?;
        match envelope.data {
            Some(serde_json::Value::Null) | None => Err(GatewayError::Server(
                "response envelope carries no data".to_string(),
            )),
            Some(data) => Ok(serde_json::from_value(data)?),
        }
    }

    async fn send_unit(&self, builder: RequestBuilder) -> GatewayResult<()> {
        self.read_envelope(builder).await.map(|_| ())
    }

    async fn send_bytes(&self, builder: RequestBuilder) -> GatewayResult<Vec<u8>> {
        let response = self.dispatch(builder).await?;
        let body = response.bytes().await.map_err(classify_transport)?;
        Ok(body.to_vec())
    }
}

/// 传输层错误归类
fn classify_transport(e: reqwest::Error) -> GatewayError {
    if e.is_decode() {
        GatewayError::Server(e.to_string())
    } else if e.is_builder() {
        GatewayError::Configuration(e.to_string())
    } else {
        GatewayError::Network(e.to_string())
    }
}

/// 非 2xx 状态码归类，优先使用服务端返回的 message
fn classify_status(status: StatusCode, body: &[u8]) -> GatewayError {
    let server_message = serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .filter(|m| !m.trim().is_empty());
    let or = |fallback: &str| server_message.clone().unwrap_or_else(|| fallback.to_string());

    match status.as_u16() {
        400 | 409 | 422 => GatewayError::Validation(or("请求参数错误")),
        401 => GatewayError::Unauthorized(or("未授权，请重新登录")),
        403 => GatewayError::Unauthorized(or("权限不足，无法访问")),
        404 => GatewayError::NotFound(or("请求的资源不存在")),
        code if code >= 500 => GatewayError::Server(or(&format!("HTTP {}", code))),
        _ => GatewayError::Validation(or("请求失败")),
    }
}

#[async_trait]
impl QuestionGateway for HttpGateway {
    fn provider_name(&self) -> &'static str {
        "http"
    }

    async fn list_questions(
        &self,
        filters: &QuestionFilters,
        page: u32,
        page_size: u32,
    ) -> GatewayResult<QuestionPage> {
        let body = QuestionQuery::from_filters(filters).paged(page, page_size);
        let builder = self.request(Method::POST, &["questions", "list"])?.json(&body);
        self.send_enveloped(builder).await
    }

    async fn get_question(&self, id: &str) -> GatewayResult<Question> {
        let builder = self.request(Method::GET, &["questions", id])?;
        self.send_enveloped(builder).await
    }

    async fn create_question(&self, payload: &QuestionPayload) -> GatewayResult<Question> {
        let builder = self.request(Method::POST, &["questions"])?.json(payload);
        self.send_enveloped(builder).await
    }

    async fn update_question(
        &self,
        id: &str,
        payload: &QuestionPayload,
    ) -> GatewayResult<Question> {
        let builder = self.request(Method::POST, &["questions", id])?.json(payload);
        self.send_enveloped(builder).await
    }

    async fn delete_question(&self, id: &str) -> GatewayResult<()> {
        let builder = self.request(Method::DELETE, &["questions", id])?;
        self.send_unit(builder).await
    }

    async fn batch_delete_questions(&self, ids: &[String]) -> GatewayResult<()> {
        let builder = self
            .request(Method::POST, &["questions", "batch-delete"])?
            .json(&BatchDeleteBody { ids });
        self.send_unit(builder).await
    }

    async fn export_questions(&self, filters: &QuestionFilters) -> GatewayResult<Vec<u8>> {
        let body = QuestionQuery::from_filters(filters);
        let builder = self.request(Method::POST, &["questions", "export"])?.json(&body);
        self.send_bytes(builder).await
    }
}

#[async_trait]
impl SubjectGateway for HttpGateway {
    fn provider_name(&self) -> &'static str {
        "http"
    }

    async fn list_subjects(
        &self,
        filters: &SubjectFilters,
        page: u32,
        page_size: u32,
    ) -> GatewayResult<SubjectPage> {
        let mut query: Vec<(&str, String)> = vec![
            ("page", page.to_string()),
            ("limit", page_size.to_string()),
        ];
        let keyword = filters.search.trim();
        if !keyword.is_empty() {
            query.push(("searchKeyword", keyword.to_string()));
        }
        if let Some(enabled) = filters.enabled.value() {
            query.push(("isEnabled", enabled.to_string()));
        }
        let builder = self.request(Method::GET, &["subjects"])?.query(&query);
        self.send_enveloped(builder).await
    }

    async fn get_subject(&self, id: &str) -> GatewayResult<Subject> {
        let builder = self.request(Method::GET, &["subjects", id])?;
        self.send_enveloped(builder).await
    }

    async fn create_subject(&self, params: &CreateSubjectParams) -> GatewayResult<Subject> {
        let builder = self.request(Method::POST, &["subjects"])?.json(params);
        self.send_enveloped(builder).await
    }

    async fn update_subject(
        &self,
        id: &str,
        params: &UpdateSubjectParams,
    ) -> GatewayResult<Subject> {
        let builder = self.request(Method::PUT, &["subjects", id])?.json(params);
        self.send_enveloped(builder).await
    }

    async fn delete_subject(&self, id: &str) -> GatewayResult<()> {
        let builder = self.request(Method::DELETE, &["subjects", id])?;
        self.send_unit(builder).await
    }
}
