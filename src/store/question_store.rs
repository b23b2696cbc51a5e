//! 题目集合存储
//!
//! 持有当前页题目、筛选条件与分页，所有写操作结束后都按写入时的科目重新拉取，
//! 不在本地修补条目。

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::notice::Notifier;
use super::state::{Collection, CollectionSnapshot, FetchOutcome};
use crate::gateway::{GatewayError, GatewayResult, QuestionGateway};
use crate::models::{
    Difficulty, Facet, FieldValue, Pagination, Question, QuestionDraft, QuestionFilters,
    QuestionPayload, QuestionType,
};

/// 一次拉取的参数，未设置的字段沿用上次的值
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuestionFetch {
    pub scope_id: Option<String>,
    pub search: Option<String>,
    pub kind: Option<Facet<QuestionType>>,
    pub difficulty: Option<Facet<Difficulty>>,
    pub has_audio: Option<Facet<bool>>,
    pub enabled: Option<Facet<bool>>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl QuestionFetch {
    pub fn scoped(scope_id: impl Into<String>) -> Self {
        Self {
            scope_id: Some(scope_id.into()),
            ..Default::default()
        }
    }

    /// 以完整筛选条件覆盖
    pub fn with_filters(filters: &QuestionFilters) -> Self {
        Self {
            scope_id: filters.scope_id.clone(),
            search: Some(filters.search.clone()),
            kind: Some(filters.kind.clone()),
            difficulty: Some(filters.difficulty.clone()),
            has_audio: Some(filters.has_audio.clone()),
            enabled: Some(filters.enabled.clone()),
            ..Default::default()
        }
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search = Some(text.into());
        self
    }

    pub fn difficulty(mut self, facet: Facet<Difficulty>) -> Self {
        self.difficulty = Some(facet);
        self
    }

    pub fn kind(mut self, facet: Facet<QuestionType>) -> Self {
        self.kind = Some(facet);
        self
    }

    fn merge_over(
        self,
        filters: &QuestionFilters,
        pagination: &Pagination,
    ) -> (QuestionFilters, Pagination) {
        let merged = QuestionFilters {
            scope_id: self.scope_id.or_else(|| filters.scope_id.clone()),
            search: self.search.unwrap_or_else(|| filters.search.clone()),
            kind: self.kind.unwrap_or_else(|| filters.kind.clone()),
            difficulty: self.difficulty.unwrap_or_else(|| filters.difficulty.clone()),
            has_audio: self.has_audio.unwrap_or_else(|| filters.has_audio.clone()),
            enabled: self.enabled.unwrap_or_else(|| filters.enabled.clone()),
        };
        let paging = Pagination {
            total: pagination.total,
            page: self.page.unwrap_or(pagination.page).max(1),
            limit: self.page_size.unwrap_or(pagination.limit).max(1),
        };
        (merged, paging)
    }
}

/// 批量操作结果
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct BatchResult {
    pub success_count: usize,
    pub failed_count: usize,
    pub errors: Vec<String>,
    /// 失败的题目 ID，与 `errors` 一一对应
    pub failed_ids: Vec<String>,
}

impl BatchResult {
    pub fn is_complete_success(&self) -> bool {
        self.failed_count == 0
    }
}

pub struct QuestionStore {
    gateway: Arc<dyn QuestionGateway>,
    notifier: Arc<dyn Notifier>,
    collection: Collection<Question, QuestionFilters>,
}

impl QuestionStore {
    pub fn new(
        gateway: Arc<dyn QuestionGateway>,
        notifier: Arc<dyn Notifier>,
        page_size: u32,
    ) -> Self {
        Self {
            gateway,
            notifier,
            collection: Collection::new(QuestionFilters::default(), page_size.max(1)),
        }
    }

    pub fn snapshot(&self) -> CollectionSnapshot<Question, QuestionFilters> {
        self.collection.snapshot()
    }

    pub fn items(&self) -> Vec<Question> {
        self.collection.items()
    }

    pub fn find(&self, id: &str) -> Option<Question> {
        self.collection.items().into_iter().find(|q| q.id == id)
    }

    pub fn is_loading(&self) -> bool {
        self.collection.is_loading()
    }

    // ========================================================================
    // 读取
    // ========================================================================

    /// 拉取一页题目
    ///
    /// 被更新的请求取代时返回 `Superseded`，其结果（包括失败）都会被丢弃。
    pub async fn fetch(&self, params: QuestionFetch) -> GatewayResult<FetchOutcome> {
        let ticket = self
            .collection
            .begin(|filters, pagination| params.merge_over(filters, pagination));
        let generation = ticket.generation;
        debug!(
            "[QuestionStore] fetch gen={} scope={:?} page={} limit={}",
            generation, ticket.filters.scope_id, ticket.pagination.page, ticket.pagination.limit
        );

        let result = self
            .gateway
            .list_questions(&ticket.filters, ticket.pagination.page, ticket.pagination.limit)
            .await;

        match result {
            Ok(page) => {
                let outcome = self
                    .collection
                    .complete::<GatewayError>(ticket, Ok((page.questions, page.pagination)));
                if outcome == FetchOutcome::Superseded {
                    debug!("[QuestionStore] dropped stale fetch gen={}", generation);
                }
                Ok(outcome)
            }
            Err(e) => match self.collection.complete(ticket, Err(&e)) {
                FetchOutcome::Superseded => {
                    debug!(
                        "[QuestionStore] dropped stale fetch failure gen={}: {}",
                        generation, e
                    );
                    Ok(FetchOutcome::Superseded)
                }
                FetchOutcome::Applied => {
                    warn!("[QuestionStore] fetch failed gen={}: {}", generation, e);
                    self.notifier
                        .error(&format!("获取题目列表失败：{}", e.user_message()));
                    Err(e)
                }
            },
        }
    }

    /// 按上次的筛选与页码重新拉取指定科目
    pub async fn refetch(&self, scope_id: &str) -> GatewayResult<FetchOutcome> {
        self.fetch(QuestionFetch::scoped(scope_id)).await
    }

    pub async fn detail(&self, id: &str) -> GatewayResult<Question> {
        self.gateway.get_question(id).await
    }

    /// 导出符合筛选条件的题目
    pub async fn export(&self, filters: &QuestionFilters) -> GatewayResult<Vec<u8>> {
        match self.gateway.export_questions(filters).await {
            Ok(bytes) => {
                info!("[QuestionStore] exported {} bytes", bytes.len());
                Ok(bytes)
            }
            Err(e) => {
                self.notifier
                    .error(&format!("导出失败：{}", e.user_message()));
                Err(e)
            }
        }
    }

    // ========================================================================
    // 写入
    // ========================================================================

    /// 删除题目，无论成败都重新拉取
    pub async fn remove(&self, id: &str, scope_id: &str) -> GatewayResult<()> {
        let result = self.gateway.delete_question(id).await;
        match &result {
            Ok(()) => {
                info!("[QuestionStore] Deleted question id={}", id);
                self.notifier.success("题目已删除");
            }
            Err(e) => {
                warn!("[QuestionStore] delete failed id={}: {}", id, e);
                self.notifier
                    .error(&format!("删除失败：{}", e.user_message()));
            }
        }
        let _ = self.refetch(scope_id).await;
        result
    }

    /// 批量删除：一次网关调用，一次重新拉取
    pub async fn remove_many(&self, ids: &[String], scope_id: &str) -> GatewayResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let result = self.gateway.batch_delete_questions(ids).await;
        match &result {
            Ok(()) => {
                info!("[QuestionStore] Batch deleted {} questions", ids.len());
                self.notifier
                    .success(&format!("已删除 {} 道题目", ids.len()));
            }
            Err(e) => {
                warn!("[QuestionStore] batch delete failed: {}", e);
                self.notifier
                    .error(&format!("批量删除失败：{}", e.user_message()));
            }
        }
        let _ = self.refetch(scope_id).await;
        result
    }

    /// 修改单个字段
    ///
    /// 发送题目的完整可写字段，只替换 `change` 对应的一项，然后重新拉取。
    pub async fn update_field(
        &self,
        record: &Question,
        change: FieldValue,
        scope_id: &str,
    ) -> GatewayResult<Question> {
        let payload = QuestionPayload::with_changes(record, std::slice::from_ref(&change));
        let result = self.gateway.update_question(&record.id, &payload).await;
        match &result {
            Ok(_) => {
                info!(
                    "[QuestionStore] Updated question id={} field={:?}",
                    record.id,
                    change.column()
                );
                self.notifier.success(change.success_message());
            }
            Err(e) => {
                warn!("[QuestionStore] update failed id={}: {}", record.id, e);
                self.notifier
                    .error(&format!("更新失败：{}", e.user_message()));
            }
        }
        let _ = self.refetch(scope_id).await;
        result
    }

    pub async fn update_difficulty(
        &self,
        record: &Question,
        difficulty: Difficulty,
        scope_id: &str,
    ) -> GatewayResult<Question> {
        self.update_field(record, FieldValue::Difficulty(difficulty), scope_id)
            .await
    }

    pub async fn update_tags(
        &self,
        record: &Question,
        tags: Vec<String>,
        scope_id: &str,
    ) -> GatewayResult<Question> {
        self.update_field(record, FieldValue::Tags(tags), scope_id)
            .await
    }

    pub async fn update_body(
        &self,
        record: &Question,
        body_markdown: String,
        scope_id: &str,
    ) -> GatewayResult<Question> {
        self.update_field(record, FieldValue::Body(body_markdown), scope_id)
            .await
    }

    pub async fn update_kind(
        &self,
        record: &Question,
        kind: QuestionType,
        scope_id: &str,
    ) -> GatewayResult<Question> {
        self.update_field(record, FieldValue::Kind(kind), scope_id)
            .await
    }

    pub async fn update_enabled(
        &self,
        record: &Question,
        enabled: bool,
        scope_id: &str,
    ) -> GatewayResult<Question> {
        self.update_field(record, FieldValue::Enabled(enabled), scope_id)
            .await
    }

    /// 批量修改：按给定顺序逐行发送完整载荷，最后统一拉取一次
    pub async fn update_many(
        &self,
        rows: &[(Question, Vec<FieldValue>)],
        scope_id: &str,
    ) -> BatchResult {
        let mut result = BatchResult::default();
        for (record, changes) in rows {
            let payload = QuestionPayload::with_changes(record, changes);
            match self.gateway.update_question(&record.id, &payload).await {
                Ok(_) => result.success_count += 1,
                Err(e) => {
                    warn!("[QuestionStore] batch update failed id={}: {}", record.id, e);
                    result.errors.push(format!("{}: {}", record.id, e.user_message()));
                    result.failed_ids.push(record.id.clone());
                }
            }
        }
        result.failed_count = result.errors.len();

        info!(
            "[QuestionStore] Batch updated {} questions, {} failed",
            result.success_count, result.failed_count
        );
        if result.is_complete_success() {
            self.notifier
                .success(&format!("已更新 {} 道题目", result.success_count));
        } else {
            self.notifier.error(&format!(
                "批量更新完成：成功 {}，失败 {}",
                result.success_count, result.failed_count
            ));
        }

        let _ = self.refetch(scope_id).await;
        result
    }

    /// 新建题目，先校验选项约束
    pub async fn create(&self, draft: QuestionDraft) -> GatewayResult<Question> {
        let scope_id = draft.subject_id.clone();
        let payload = match draft.into_payload() {
            Ok(payload) => payload,
            Err(message) => {
                self.notifier.error(&message);
                return Err(GatewayError::Validation(message));
            }
        };

        let result = self.gateway.create_question(&payload).await;
        match &result {
            Ok(q) => {
                info!("[QuestionStore] Created question id={}", q.id);
                self.notifier.success("题目已创建");
                let _ = self.refetch(&scope_id).await;
            }
            Err(e) => {
                warn!("[QuestionStore] create failed: {}", e);
                self.notifier
                    .error(&format!("创建失败：{}", e.user_message()));
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_explicit_wins() {
        let prior = QuestionFilters {
            scope_id: Some("s1".into()),
            search: "排序".into(),
            kind: Facet::Only(QuestionType::Multiple),
            ..Default::default()
        };
        let paging = Pagination {
            total: 30,
            page: 3,
            limit: 10,
        };

        let (filters, p) = QuestionFetch::default()
            .difficulty(Facet::Only(Difficulty::Hard))
            .merge_over(&prior, &paging);
        assert_eq!(filters.scope_id.as_deref(), Some("s1"));
        assert_eq!(filters.search, "排序");
        assert_eq!(filters.kind, Facet::Only(QuestionType::Multiple));
        assert_eq!(filters.difficulty, Facet::Only(Difficulty::Hard));
        assert_eq!((p.page, p.limit), (3, 10));

        let (filters, p) = QuestionFetch::scoped("s2")
            .kind(Facet::All)
            .page(1)
            .page_size(20)
            .merge_over(&prior, &paging);
        assert_eq!(filters.scope_id.as_deref(), Some("s2"));
        assert!(filters.kind.is_all());
        assert_eq!((p.page, p.limit), (1, 20));
    }

    #[test]
    fn test_merge_clamps_zero_page() {
        let (_, p) = QuestionFetch::default()
            .page(0)
            .merge_over(&QuestionFilters::default(), &Pagination::first_page(10));
        assert_eq!(p.page, 1);
    }
}
