//! 题库控制台数据模型
//!
//! 字段命名沿用远端题库服务的 JSON 约定（`_id`、`question_markdown`、`isEnabled` 等），
//! Rust 侧统一使用 snake_case 并通过 serde 重命名。

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

use crate::edit_state::EditableColumn;

// ============================================================================
// 枚举
// ============================================================================

/// 题目类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    #[default]
    Single,
    Multiple,
    Judgment,
    Blank,
    Answer,
    Programming,
}

impl QuestionType {
    pub const ALL: [QuestionType; 6] = [
        QuestionType::Single,
        QuestionType::Multiple,
        QuestionType::Judgment,
        QuestionType::Blank,
        QuestionType::Answer,
        QuestionType::Programming,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::Single => "single",
            QuestionType::Multiple => "multiple",
            QuestionType::Judgment => "judgment",
            QuestionType::Blank => "blank",
            QuestionType::Answer => "answer",
            QuestionType::Programming => "programming",
        }
    }

    /// 表格中展示的中文名称
    pub fn label(&self) -> &'static str {
        match self {
            QuestionType::Single => "单选题",
            QuestionType::Multiple => "多选题",
            QuestionType::Judgment => "判断题",
            QuestionType::Blank => "填空题",
            QuestionType::Answer => "简答题",
            QuestionType::Programming => "编程题",
        }
    }

    /// 是否为选择类题型（携带选项列表）
    pub fn is_choice(&self) -> bool {
        matches!(
            self,
            QuestionType::Single | QuestionType::Multiple | QuestionType::Judgment
        )
    }

    /// 是否只允许一个正确选项
    pub fn single_answer(&self) -> bool {
        matches!(self, QuestionType::Single | QuestionType::Judgment)
    }
}

/// 难度
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Difficulty::Easy => "简单",
            Difficulty::Medium => "中等",
            Difficulty::Hard => "困难",
        }
    }
}

/// 筛选项：`All` 表示不限
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Facet<T> {
    #[default]
    All,
    Only(T),
}

impl<T> Facet<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            Facet::All => None,
            Facet::Only(v) => Some(v),
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Facet::All)
    }
}

impl<T> From<Option<T>> for Facet<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Facet::All, Facet::Only)
    }
}

// ============================================================================
// 题目
// ============================================================================

/// 选项
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QuestionOption {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub is_correct: bool,
}

impl QuestionOption {
    /// 新建选项，ID 在客户端生成
    pub fn new(content: impl Into<String>, is_correct: bool) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content: content.into(),
            is_correct,
        }
    }
}

/// 附件引用（如 `audio`、`metadata`），键为附件用途，值为文件引用
pub type Attachments = BTreeMap<String, String>;

fn default_enabled() -> bool {
    true
}

/// 题目实体
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Question {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: QuestionType,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(rename = "subjectId")]
    pub subject_id: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(rename = "question_markdown", default)]
    pub body_markdown: String,
    #[serde(
        rename = "answer_simple_markdown",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub answer_short_markdown: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer_detail_markdown: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer_analysis_markdown: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<QuestionOption>>,
    #[serde(rename = "files", default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Attachments>,
    #[serde(rename = "isEnabled", default = "default_enabled")]
    pub enabled: bool,
    // 服务端历史上同时下发 camelCase 与 snake_case 两套时间字段
    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(rename = "updatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(rename = "created_at", default, skip_serializing_if = "Option::is_none")]
    pub legacy_created_at: Option<String>,
    #[serde(rename = "updated_at", default, skip_serializing_if = "Option::is_none")]
    pub legacy_updated_at: Option<String>,
}

fn first_non_empty<'a>(a: &'a Option<String>, b: &'a Option<String>) -> Option<&'a str> {
    a.as_deref()
        .filter(|s| !s.trim().is_empty())
        .or_else(|| b.as_deref().filter(|s| !s.trim().is_empty()))
}

impl Question {
    pub fn created_time(&self) -> Option<&str> {
        first_non_empty(&self.created_at, &self.legacy_created_at)
    }

    pub fn updated_time(&self) -> Option<&str> {
        first_non_empty(&self.updated_at, &self.legacy_updated_at)
    }

    pub fn has_audio(&self) -> bool {
        self.attachments
            .as_ref()
            .and_then(|files| files.get("audio"))
            .is_some_and(|audio| !audio.trim().is_empty())
    }
}

/// 分页信息
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Pagination {
    #[serde(default)]
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}

impl Pagination {
    pub fn first_page(limit: u32) -> Self {
        Self {
            total: 0,
            page: 1,
            limit,
        }
    }
}

/// 题目列表结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionPage {
    #[serde(default)]
    pub questions: Vec<Question>,
    pub pagination: Pagination,
}

/// 题目筛选参数
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuestionFilters {
    /// 所属科目
    pub scope_id: Option<String>,
    /// 搜索关键词，空串表示不搜索
    pub search: String,
    pub kind: Facet<QuestionType>,
    pub difficulty: Facet<Difficulty>,
    /// 是否带音频附件
    pub has_audio: Facet<bool>,
    pub enabled: Facet<bool>,
}

impl QuestionFilters {
    pub fn for_scope(scope_id: impl Into<String>) -> Self {
        Self {
            scope_id: Some(scope_id.into()),
            ..Default::default()
        }
    }
}

// ============================================================================
// 可编辑字段
// ============================================================================

/// 单元格编辑器的取值，同时作为一次字段修改的载体
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Body(String),
    Kind(QuestionType),
    Difficulty(Difficulty),
    Tags(Vec<String>),
    Enabled(bool),
}

impl FieldValue {
    /// 读取题目在指定列上的当前值
    pub fn of(column: EditableColumn, question: &Question) -> Self {
        match column {
            EditableColumn::Body => FieldValue::Body(question.body_markdown.clone()),
            EditableColumn::Kind => FieldValue::Kind(question.kind),
            EditableColumn::Difficulty => FieldValue::Difficulty(question.difficulty),
            EditableColumn::Tags => FieldValue::Tags(question.tags.clone()),
            EditableColumn::Enabled => FieldValue::Enabled(question.enabled),
        }
    }

    pub fn column(&self) -> EditableColumn {
        match self {
            FieldValue::Body(_) => EditableColumn::Body,
            FieldValue::Kind(_) => EditableColumn::Kind,
            FieldValue::Difficulty(_) => EditableColumn::Difficulty,
            FieldValue::Tags(_) => EditableColumn::Tags,
            FieldValue::Enabled(_) => EditableColumn::Enabled,
        }
    }

    /// 与题目当前值比较：标签按集合比较，枚举/布尔按值，文本按原样字符串
    pub fn is_unchanged_for(&self, question: &Question) -> bool {
        match self {
            FieldValue::Body(text) => *text == question.body_markdown,
            FieldValue::Kind(kind) => *kind == question.kind,
            FieldValue::Difficulty(level) => *level == question.difficulty,
            FieldValue::Enabled(flag) => *flag == question.enabled,
            FieldValue::Tags(tags) => {
                let new: BTreeSet<&str> = tags.iter().map(String::as_str).collect();
                let old: BTreeSet<&str> = question.tags.iter().map(String::as_str).collect();
                new == old
            }
        }
    }

    /// 更新成功后的提示文案
    pub fn success_message(&self) -> &'static str {
        match self {
            FieldValue::Body(_) => "题目标题已更新",
            FieldValue::Kind(_) => "题目类型已更新",
            FieldValue::Difficulty(_) => "难度已更新",
            FieldValue::Tags(_) => "标签已更新",
            FieldValue::Enabled(_) => "状态已更新",
        }
    }
}

// ============================================================================
// 写入载荷
// ============================================================================

/// 题目完整写入载荷
///
/// 更新接口不保证做字段级合并，因此每次更新都携带题目的全部可写字段，
/// 只替换本次修改的那一项。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuestionPayload {
    #[serde(rename = "type")]
    pub kind: QuestionType,
    pub difficulty: Difficulty,
    #[serde(rename = "subjectId")]
    pub subject_id: String,
    pub tags: Vec<String>,
    #[serde(rename = "question_markdown")]
    pub body_markdown: String,
    #[serde(
        rename = "answer_simple_markdown",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub answer_short_markdown: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer_detail_markdown: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer_analysis_markdown: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<QuestionOption>>,
    #[serde(rename = "files", default)]
    pub attachments: Attachments,
    #[serde(rename = "isEnabled")]
    pub enabled: bool,
}

impl QuestionPayload {
    pub fn from_record(question: &Question) -> Self {
        Self {
            kind: question.kind,
            difficulty: question.difficulty,
            subject_id: question.subject_id.clone(),
            tags: question.tags.clone(),
            body_markdown: question.body_markdown.clone(),
            answer_short_markdown: question.answer_short_markdown.clone(),
            answer_detail_markdown: question.answer_detail_markdown.clone(),
            answer_analysis_markdown: question.answer_analysis_markdown.clone(),
            options: question.options.clone(),
            attachments: question.attachments.clone().unwrap_or_default(),
            enabled: question.enabled,
        }
    }

    pub fn apply(&mut self, change: &FieldValue) {
        match change {
            FieldValue::Body(text) => self.body_markdown = text.clone(),
            FieldValue::Kind(kind) => self.kind = *kind,
            FieldValue::Difficulty(level) => self.difficulty = *level,
            FieldValue::Tags(tags) => self.tags = tags.clone(),
            FieldValue::Enabled(flag) => self.enabled = *flag,
        }
    }

    /// 以题目为底，叠加若干字段修改
    pub fn with_changes(question: &Question, changes: &[FieldValue]) -> Self {
        let mut payload = Self::from_record(question);
        for change in changes {
            payload.apply(change);
        }
        payload
    }
}

/// 新建题目的草稿
#[derive(Debug, Clone, Default)]
pub struct QuestionDraft {
    pub subject_id: String,
    pub kind: QuestionType,
    pub difficulty: Difficulty,
    pub tags: Vec<String>,
    pub body_markdown: String,
    pub answer_short_markdown: Option<String>,
    pub answer_detail_markdown: Option<String>,
    pub answer_analysis_markdown: Option<String>,
    pub options: Vec<QuestionOption>,
    pub attachments: Attachments,
    pub enabled: bool,
}

impl QuestionDraft {
    /// 提交前校验选项约束，返回可直接发送的载荷
    ///
    /// - 单选题、判断题恰好一个正确选项
    /// - 判断题恰好两个选项
    /// - 非选择题不携带选项
    pub fn into_payload(self) -> Result<QuestionPayload, String> {
        if self.subject_id.trim().is_empty() {
            return Err("请选择所属科目".to_string());
        }
        if self.body_markdown.trim().is_empty() {
            return Err("题目内容不能为空".to_string());
        }

        let options = if self.kind.is_choice() {
            if self.kind == QuestionType::Judgment && self.options.len() != 2 {
                return Err("判断题必须有两个选项".to_string());
            }
            if self.options.is_empty() {
                return Err("选择题至少需要一个选项".to_string());
            }
            if self.options.iter().any(|o| o.content.trim().is_empty()) {
                return Err("选项内容不能为空".to_string());
            }
            let correct = self.options.iter().filter(|o| o.is_correct).count();
            if correct == 0 {
                return Err("请至少设置一个正确答案".to_string());
            }
            if self.kind.single_answer() && correct > 1 {
                return Err("单选题和判断题只能有一个正确答案".to_string());
            }
            self.options
        } else {
            Vec::new()
        };

        Ok(QuestionPayload {
            kind: self.kind,
            difficulty: self.difficulty,
            subject_id: self.subject_id,
            tags: self.tags,
            body_markdown: self.body_markdown,
            answer_short_markdown: self.answer_short_markdown,
            answer_detail_markdown: self.answer_detail_markdown,
            answer_analysis_markdown: self.answer_analysis_markdown,
            options: Some(options),
            attachments: self.attachments,
            enabled: self.enabled,
        })
    }
}

// ============================================================================
// 科目
// ============================================================================

/// 科目标签
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubjectTag {
    pub name: String,
    pub value: String,
}

/// 科目实体
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    /// 创建后不可修改
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<SubjectTag>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_tags: Option<Vec<SubjectTag>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty_levels: Option<Vec<String>>,
    #[serde(default = "default_enabled")]
    pub is_enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// 科目列表结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectPage {
    #[serde(default)]
    pub subjects: Vec<Subject>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

/// 科目筛选参数
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubjectFilters {
    pub search: String,
    pub enabled: Facet<bool>,
}

/// 新建科目参数
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubjectParams {
    pub name: String,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<SubjectTag>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_tags: Option<Vec<SubjectTag>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty_levels: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_enabled: Option<bool>,
}

/// 更新科目参数（科目代码不可修改）
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSubjectParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<SubjectTag>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_tags: Option<Vec<SubjectTag>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty_levels: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_enabled: Option<bool>,
}
