//! 题目浏览器
//!
//! 持有当前科目与筛选值，把科目切换、筛选、翻页、内联编辑、批量编辑与删除确认
//! 组合成对存储层的调用。每次筛选变化都回到第一页，且只触发一次拉取。

use chrono::{FixedOffset, Utc};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use crate::columns::{
    question_columns, question_edit_path, render_rows, RenderContext, RenderedRow,
    QUESTION_CREATE_PATH,
};
use crate::edit_state::{EditState, EditableColumn};
use crate::export::{export_file_name, write_export};
use crate::gateway::GatewayError;
use crate::models::{Difficulty, Facet, FieldValue, QuestionFilters, QuestionType};
use crate::store::{
    BatchResult, FetchOutcome, QuestionFetch, QuestionStore, SubjectFetch, SubjectStore,
};

/// 浏览器操作错误
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("No subject selected")]
    NoActiveScope,

    #[error("Row not loaded: {0}")]
    RowNotLoaded(String),

    #[error("Cell is not being edited: {row_id} / {column:?}")]
    NotEditing {
        row_id: String,
        column: EditableColumn,
    },

    #[error("Batch mode is not active")]
    BatchInactive,

    #[error("No delete is pending")]
    NoPendingDelete,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BrowserError {
    pub fn code(&self) -> &'static str {
        match self {
            BrowserError::Gateway(e) => e.code(),
            BrowserError::NoActiveScope => "NO_ACTIVE_SCOPE",
            BrowserError::RowNotLoaded(_) => "ROW_NOT_LOADED",
            BrowserError::NotEditing { .. } => "NOT_EDITING",
            BrowserError::BatchInactive => "BATCH_INACTIVE",
            BrowserError::NoPendingDelete => "NO_PENDING_DELETE",
            BrowserError::Io(_) => "IO_ERROR",
        }
    }
}

pub type BrowserResult<T> = Result<T, BrowserError>;

/// 单元格提交结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// 值未变化，未发请求
    Unchanged,
    /// 批量模式下暂存，等待批量提交
    Staged,
    /// 已保存并重新拉取
    Saved,
}

/// 筛选栏状态
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterState {
    /// 搜索框中的文本，点击搜索前不生效
    pub search_input: String,
    /// 最近一次生效的搜索文本
    pub applied_search: String,
    pub kind: Facet<QuestionType>,
    pub difficulty: Facet<Difficulty>,
    pub has_audio: Facet<bool>,
    pub enabled: Facet<bool>,
}

pub struct QuestionBrowser {
    questions: Arc<QuestionStore>,
    subjects: Arc<SubjectStore>,
    edit: EditState,
    active_scope: Option<String>,
    filters: FilterState,
    pending_delete: Option<String>,
    offset: FixedOffset,
}

impl QuestionBrowser {
    pub fn new(
        questions: Arc<QuestionStore>,
        subjects: Arc<SubjectStore>,
        offset: FixedOffset,
    ) -> Self {
        Self {
            questions,
            subjects,
            edit: EditState::new(),
            active_scope: None,
            filters: FilterState::default(),
            pending_delete: None,
            offset,
        }
    }

    pub fn questions(&self) -> &Arc<QuestionStore> {
        &self.questions
    }

    pub fn subjects(&self) -> &Arc<SubjectStore> {
        &self.subjects
    }

    pub fn active_scope(&self) -> Option<&str> {
        self.active_scope.as_deref()
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn edit_state(&self) -> &EditState {
        &self.edit
    }

    fn scope(&self) -> BrowserResult<String> {
        self.active_scope.clone().ok_or(BrowserError::NoActiveScope)
    }

    fn composed_filters(&self, scope_id: &str) -> QuestionFilters {
        QuestionFilters {
            scope_id: Some(scope_id.to_string()),
            search: self.filters.applied_search.clone(),
            kind: self.filters.kind.clone(),
            difficulty: self.filters.difficulty.clone(),
            has_audio: self.filters.has_audio.clone(),
            enabled: self.filters.enabled.clone(),
        }
    }

    async fn fetch_page(&mut self, page: u32) -> BrowserResult<FetchOutcome> {
        let scope = self.scope()?;
        self.edit.reset();
        let params = QuestionFetch::with_filters(&self.composed_filters(&scope)).page(page);
        Ok(self.questions.fetch(params).await?)
    }

    // ========================================================================
    // 科目
    // ========================================================================

    /// 加载科目列表；尚未选择科目时自动选中第一个并拉取题目
    pub async fn load_scopes(&mut self) -> BrowserResult<Option<String>> {
        let outcome = self.subjects.fetch(SubjectFetch::default()).await?;
        if outcome == FetchOutcome::Superseded || self.active_scope.is_some() {
            return Ok(None);
        }
        let Some(first) = self.subjects.items().into_iter().next() else {
            debug!("[QuestionBrowser] no subjects to select");
            return Ok(None);
        };
        info!("[QuestionBrowser] auto-selecting subject {}", first.code);
        self.select_scope(&first.id).await?;
        Ok(Some(first.id))
    }

    /// 切换科目：重置筛选与编辑状态，拉取第一页。选中当前科目时不做任何事
    pub async fn select_scope(&mut self, scope_id: &str) -> BrowserResult<bool> {
        if self.active_scope.as_deref() == Some(scope_id) {
            return Ok(false);
        }
        self.active_scope = Some(scope_id.to_string());
        self.filters = FilterState::default();
        self.pending_delete = None;
        self.fetch_page(1).await?;
        Ok(true)
    }

    // ========================================================================
    // 筛选与翻页
    // ========================================================================

    pub async fn set_kind_filter(&mut self, facet: Facet<QuestionType>) -> BrowserResult<()> {
        self.scope()?;
        self.filters.kind = facet;
        self.fetch_page(1).await.map(|_| ())
    }

    pub async fn set_difficulty_filter(&mut self, facet: Facet<Difficulty>) -> BrowserResult<()> {
        self.scope()?;
        self.filters.difficulty = facet;
        self.fetch_page(1).await.map(|_| ())
    }

    pub async fn set_audio_filter(&mut self, facet: Facet<bool>) -> BrowserResult<()> {
        self.scope()?;
        self.filters.has_audio = facet;
        self.fetch_page(1).await.map(|_| ())
    }

    pub async fn set_enabled_filter(&mut self, facet: Facet<bool>) -> BrowserResult<()> {
        self.scope()?;
        self.filters.enabled = facet;
        self.fetch_page(1).await.map(|_| ())
    }

    /// 只更新搜索框文本，不触发拉取
    pub fn set_search_text(&mut self, text: impl Into<String>) {
        self.filters.search_input = text.into();
    }

    /// 应用搜索框文本并拉取第一页
    pub async fn search(&mut self) -> BrowserResult<()> {
        self.scope()?;
        self.filters.applied_search = self.filters.search_input.trim().to_string();
        self.fetch_page(1).await.map(|_| ())
    }

    pub async fn go_to_page(&mut self, page: u32) -> BrowserResult<()> {
        self.fetch_page(page.max(1)).await.map(|_| ())
    }

    /// 按当前页与筛选重新拉取
    pub async fn refresh(&mut self) -> BrowserResult<()> {
        let scope = self.scope()?;
        self.questions.refetch(&scope).await?;
        Ok(())
    }

    // ========================================================================
    // 内联编辑
    // ========================================================================

    /// 进入单元格编辑；已在编辑中返回 `false`
    pub fn begin_edit(&mut self, row_id: &str, column: EditableColumn) -> BrowserResult<bool> {
        if self.questions.find(row_id).is_none() {
            return Err(BrowserError::RowNotLoaded(row_id.to_string()));
        }
        Ok(self.edit.begin(row_id, column))
    }

    pub fn cancel_edit(&mut self, row_id: &str, column: EditableColumn) {
        if self.edit.is_batch_row(row_id) {
            self.edit.unstage(row_id, column);
        } else {
            self.edit.finish(row_id, column);
        }
    }

    /// 提交单元格编辑
    ///
    /// 值未变化时直接回到查看状态；批量模式下只暂存；否则保存并重新拉取，
    /// 保存失败时单元格保持编辑状态。
    pub async fn commit_edit(
        &mut self,
        row_id: &str,
        value: FieldValue,
    ) -> BrowserResult<CommitOutcome> {
        let column = value.column();
        if !self.edit.is_editing(row_id, column) {
            return Err(BrowserError::NotEditing {
                row_id: row_id.to_string(),
                column,
            });
        }
        let record = self
            .questions
            .find(row_id)
            .ok_or_else(|| BrowserError::RowNotLoaded(row_id.to_string()))?;

        if self.edit.is_batch_row(row_id) {
            if value.is_unchanged_for(&record) {
                self.edit.unstage(row_id, column);
                return Ok(CommitOutcome::Unchanged);
            }
            self.edit.stage(row_id, value);
            return Ok(CommitOutcome::Staged);
        }

        if value.is_unchanged_for(&record) {
            self.edit.finish(row_id, column);
            return Ok(CommitOutcome::Unchanged);
        }

        let scope = self.scope()?;
        self.questions.update_field(&record, value, &scope).await?;
        self.edit.finish(row_id, column);
        Ok(CommitOutcome::Saved)
    }

    // ========================================================================
    // 批量编辑
    // ========================================================================

    pub fn is_batch(&self) -> bool {
        self.edit.is_batch()
    }

    /// 开启批量模式，当前页所有行进入编辑
    pub fn enter_batch(&mut self) {
        let ids: Vec<String> = self.questions.items().into_iter().map(|q| q.id).collect();
        debug!("[QuestionBrowser] batch mode on for {} rows", ids.len());
        self.edit.enter_batch(ids);
    }

    /// 退出批量模式，丢弃暂存修改
    pub fn exit_batch(&mut self) {
        self.edit.exit_batch();
    }

    pub fn toggle_batch(&mut self) {
        if self.edit.is_batch() {
            self.exit_batch();
        } else {
            self.enter_batch();
        }
    }

    /// 提交批量修改：按行 ID 顺序逐行更新
    ///
    /// 全部成功时退出批量模式；有失败时只保留失败的行及其暂存值。
    pub async fn commit_batch(&mut self) -> BrowserResult<BatchResult> {
        if !self.edit.is_batch() {
            return Err(BrowserError::BatchInactive);
        }
        let scope = self.scope()?;

        let staged = self.edit.staged_rows();
        if staged.is_empty() {
            self.edit.exit_batch();
            return Ok(BatchResult::default());
        }

        let mut rows = Vec::with_capacity(staged.len());
        let mut missing = Vec::new();
        for (id, changes) in staged {
            match self.questions.find(&id) {
                Some(record) => rows.push((record, changes)),
                None => missing.push(id),
            }
        }

        let mut result = self.questions.update_many(&rows, &scope).await;
        for id in missing {
            result.errors.push(format!("{}: 题目不在当前页", id));
            result.failed_ids.push(id);
        }
        result.failed_count = result.errors.len();

        if result.is_complete_success() {
            self.edit.exit_batch();
        } else {
            let failed: BTreeSet<String> = result.failed_ids.iter().cloned().collect();
            self.edit.retain_batch_rows(&failed);
        }
        Ok(result)
    }

    // ========================================================================
    // 删除
    // ========================================================================

    /// 请求删除，等待确认
    pub fn request_delete(&mut self, row_id: &str) -> BrowserResult<()> {
        if self.questions.find(row_id).is_none() {
            return Err(BrowserError::RowNotLoaded(row_id.to_string()));
        }
        self.pending_delete = Some(row_id.to_string());
        Ok(())
    }

    pub fn pending_delete(&self) -> Option<&str> {
        self.pending_delete.as_deref()
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    /// 执行已确认的删除
    pub async fn confirm_delete(&mut self) -> BrowserResult<()> {
        let scope = self.scope()?;
        let row_id = self
            .pending_delete
            .take()
            .ok_or(BrowserError::NoPendingDelete)?;
        self.questions.remove(&row_id, &scope).await?;
        self.edit.forget_row(&row_id);
        Ok(())
    }

    /// 批量删除指定行
    pub async fn delete_rows(&mut self, row_ids: &[String]) -> BrowserResult<()> {
        let scope = self.scope()?;
        self.questions.remove_many(row_ids, &scope).await?;
        for id in row_ids {
            self.edit.forget_row(id);
        }
        Ok(())
    }

    // ========================================================================
    // 导航、渲染、导出
    // ========================================================================

    pub fn edit_target(&self, row_id: &str) -> String {
        question_edit_path(row_id)
    }

    pub fn create_target(&self) -> &'static str {
        QUESTION_CREATE_PATH
    }

    pub fn rows(&self) -> Vec<RenderedRow> {
        let ctx = RenderContext::new(&self.edit, self.offset);
        render_rows(&self.questions.items(), &question_columns(), &ctx)
    }

    /// 导出当前科目在当前筛选下的题目到 `dir`
    pub async fn export(&self, dir: &Path) -> BrowserResult<PathBuf> {
        let scope = self.scope()?;
        let code = self
            .subjects
            .find(&scope)
            .map(|s| s.code)
            .unwrap_or_else(|| scope.clone());
        let bytes = self.questions.export(&self.composed_filters(&scope)).await?;
        let name = export_file_name(&code, &Utc::now().with_timezone(&self.offset));
        Ok(write_export(dir, &name, &bytes).await?)
    }
}
