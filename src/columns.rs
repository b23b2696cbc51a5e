//! 表格列绑定
//!
//! 每列是一个普通描述符 `{key, title, render}`，渲染函数读取行数据与编辑状态，
//! 产出静态展示或内联编辑器。

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use serde::Serialize;

use crate::edit_state::{EditState, EditableColumn};
use crate::models::{Difficulty, FieldValue, Question, QuestionType, Subject};

/// 表格时间格式
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 空标签占位
pub const TAGS_PLACEHOLDER: &str = "添加标签";

// ============================================================================
// 单元格视图
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Neutral,
    Info,
    Success,
    Warning,
    Danger,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Choice {
    pub value: FieldValue,
    pub label: &'static str,
}

/// 内联编辑器
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditorView {
    pub row_id: String,
    pub column: EditableColumn,
    /// 编辑器初始值；批量模式下优先取暂存值
    pub value: FieldValue,
    /// 枚举类列的可选项，文本与标签列为空
    pub choices: Vec<Choice>,
}

/// 删除前的确认提示
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfirmPrompt {
    pub title: String,
    pub ok_text: &'static str,
    pub cancel_text: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RowAction {
    Navigate {
        label: &'static str,
        path: String,
    },
    Delete {
        label: &'static str,
        row_id: String,
        confirm: ConfirmPrompt,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum CellView {
    Text { text: String },
    Badge { label: String, tone: Tone },
    Tags {
        tags: Vec<String>,
        placeholder: Option<&'static str>,
    },
    Editor(EditorView),
    Actions { actions: Vec<RowAction> },
}

impl CellView {
    pub fn text(value: impl Into<String>) -> Self {
        CellView::Text { text: value.into() }
    }

    pub fn is_editor(&self) -> bool {
        matches!(self, CellView::Editor(_))
    }

    /// 纯文本形式，用于终端输出
    pub fn plain_text(&self) -> String {
        match self {
            CellView::Text { text } => text.clone(),
            CellView::Badge { label, .. } => label.clone(),
            CellView::Tags { tags, placeholder } => {
                if tags.is_empty() {
                    placeholder.unwrap_or("").to_string()
                } else {
                    tags.join(", ")
                }
            }
            CellView::Editor(editor) => format!("[{}]", field_text(&editor.value)),
            CellView::Actions { actions } => actions
                .iter()
                .map(|a| match a {
                    RowAction::Navigate { label, .. } | RowAction::Delete { label, .. } => *label,
                })
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

fn field_text(value: &FieldValue) -> String {
    match value {
        FieldValue::Body(text) => text.clone(),
        FieldValue::Kind(kind) => kind.label().to_string(),
        FieldValue::Difficulty(level) => level.label().to_string(),
        FieldValue::Tags(tags) => tags.join(", "),
        FieldValue::Enabled(flag) => enabled_label(*flag).to_string(),
    }
}

// ============================================================================
// 列描述
// ============================================================================

pub struct RenderContext<'a> {
    pub edit: &'a EditState,
    pub offset: FixedOffset,
}

impl<'a> RenderContext<'a> {
    pub fn new(edit: &'a EditState, offset: FixedOffset) -> Self {
        Self { edit, offset }
    }
}

pub struct ColumnDescriptor<R> {
    pub key: &'static str,
    pub title: &'static str,
    pub render: fn(&R, &RenderContext<'_>) -> CellView,
}

impl<R> Clone for ColumnDescriptor<R> {
    fn clone(&self) -> Self {
        Self {
            key: self.key,
            title: self.title,
            render: self.render,
        }
    }
}

impl<R> std::fmt::Debug for ColumnDescriptor<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColumnDescriptor")
            .field("key", &self.key)
            .field("title", &self.title)
            .finish()
    }
}

/// 能作为表格行的实体
pub trait TableRow {
    fn row_id(&self) -> &str;
}

impl TableRow for Question {
    fn row_id(&self) -> &str {
        &self.id
    }
}

impl TableRow for Subject {
    fn row_id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedRow {
    pub id: String,
    pub cells: Vec<(&'static str, CellView)>,
}

impl RenderedRow {
    pub fn cell(&self, key: &str) -> Option<&CellView> {
        self.cells.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }
}

pub fn render_rows<R: TableRow>(
    rows: &[R],
    columns: &[ColumnDescriptor<R>],
    ctx: &RenderContext<'_>,
) -> Vec<RenderedRow> {
    rows.iter()
        .map(|row| RenderedRow {
            id: row.row_id().to_string(),
            cells: columns
                .iter()
                .map(|col| (col.key, (col.render)(row, ctx)))
                .collect(),
        })
        .collect()
}

// ============================================================================
// 格式化
// ============================================================================

/// 时间戳按显示时区格式化；空值显示 `-`，无法解析时原样返回
///
/// 不带时区的时间按 UTC 处理。
pub fn format_timestamp(raw: Option<&str>, offset: &FixedOffset) -> String {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return "-".to_string();
    };
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.with_timezone(offset).format(TIMESTAMP_FORMAT).to_string();
    }
    for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, pattern) {
            return Utc
                .from_utc_datetime(&naive)
                .with_timezone(offset)
                .format(TIMESTAMP_FORMAT)
                .to_string();
        }
    }
    raw.to_string()
}

pub fn enabled_label(enabled: bool) -> &'static str {
    if enabled {
        "启用"
    } else {
        "禁用"
    }
}

fn difficulty_tone(level: Difficulty) -> Tone {
    match level {
        Difficulty::Easy => Tone::Success,
        Difficulty::Medium => Tone::Warning,
        Difficulty::Hard => Tone::Danger,
    }
}

fn enabled_badge(enabled: bool) -> CellView {
    CellView::Badge {
        label: enabled_label(enabled).to_string(),
        tone: if enabled { Tone::Success } else { Tone::Danger },
    }
}

fn choices_for(column: EditableColumn) -> Vec<Choice> {
    match column {
        EditableColumn::Kind => QuestionType::ALL
            .iter()
            .map(|k| Choice {
                value: FieldValue::Kind(*k),
                label: k.label(),
            })
            .collect(),
        EditableColumn::Difficulty => Difficulty::ALL
            .iter()
            .map(|d| Choice {
                value: FieldValue::Difficulty(*d),
                label: d.label(),
            })
            .collect(),
        EditableColumn::Enabled => [true, false]
            .iter()
            .map(|flag| Choice {
                value: FieldValue::Enabled(*flag),
                label: enabled_label(*flag),
            })
            .collect(),
        EditableColumn::Body | EditableColumn::Tags => Vec::new(),
    }
}

/// 处于编辑状态时返回编辑器，否则返回 `None`
fn editor_for(
    question: &Question,
    column: EditableColumn,
    ctx: &RenderContext<'_>,
) -> Option<CellView> {
    if !ctx.edit.is_editing(&question.id, column) {
        return None;
    }
    let value = ctx
        .edit
        .staged(&question.id, column)
        .cloned()
        .unwrap_or_else(|| FieldValue::of(column, question));
    Some(CellView::Editor(EditorView {
        row_id: question.id.clone(),
        column,
        value,
        choices: choices_for(column),
    }))
}

// ============================================================================
// 题目列
// ============================================================================

fn render_question_id(q: &Question, _: &RenderContext<'_>) -> CellView {
    CellView::text(q.id.clone())
}

fn render_question_body(q: &Question, ctx: &RenderContext<'_>) -> CellView {
    editor_for(q, EditableColumn::Body, ctx)
        .unwrap_or_else(|| CellView::text(q.body_markdown.clone()))
}

fn render_question_kind(q: &Question, ctx: &RenderContext<'_>) -> CellView {
    editor_for(q, EditableColumn::Kind, ctx).unwrap_or_else(|| CellView::Badge {
        label: q.kind.label().to_string(),
        tone: Tone::Info,
    })
}

fn render_question_difficulty(q: &Question, ctx: &RenderContext<'_>) -> CellView {
    editor_for(q, EditableColumn::Difficulty, ctx).unwrap_or_else(|| CellView::Badge {
        label: q.difficulty.label().to_string(),
        tone: difficulty_tone(q.difficulty),
    })
}

fn render_question_tags(q: &Question, ctx: &RenderContext<'_>) -> CellView {
    editor_for(q, EditableColumn::Tags, ctx).unwrap_or_else(|| CellView::Tags {
        tags: q.tags.clone(),
        placeholder: q.tags.is_empty().then_some(TAGS_PLACEHOLDER),
    })
}

fn render_question_enabled(q: &Question, ctx: &RenderContext<'_>) -> CellView {
    editor_for(q, EditableColumn::Enabled, ctx).unwrap_or_else(|| enabled_badge(q.enabled))
}

fn render_question_created(q: &Question, ctx: &RenderContext<'_>) -> CellView {
    CellView::text(format_timestamp(q.created_time(), &ctx.offset))
}

fn render_question_updated(q: &Question, ctx: &RenderContext<'_>) -> CellView {
    CellView::text(format_timestamp(q.updated_time(), &ctx.offset))
}

pub fn question_edit_path(id: &str) -> String {
    format!("/questions/edit/{}", id)
}

pub const QUESTION_CREATE_PATH: &str = "/questions/new";

fn render_question_actions(q: &Question, _: &RenderContext<'_>) -> CellView {
    CellView::Actions {
        actions: vec![
            RowAction::Navigate {
                label: "编辑",
                path: question_edit_path(&q.id),
            },
            RowAction::Delete {
                label: "删除",
                row_id: q.id.clone(),
                confirm: ConfirmPrompt {
                    title: "确定要删除这个题目吗？".to_string(),
                    ok_text: "是",
                    cancel_text: "否",
                },
            },
        ],
    }
}

pub fn question_columns() -> Vec<ColumnDescriptor<Question>> {
    vec![
        ColumnDescriptor {
            key: "id",
            title: "编号",
            render: render_question_id,
        },
        ColumnDescriptor {
            key: "question_markdown",
            title: "题目",
            render: render_question_body,
        },
        ColumnDescriptor {
            key: "type",
            title: "类型",
            render: render_question_kind,
        },
        ColumnDescriptor {
            key: "difficulty",
            title: "难度",
            render: render_question_difficulty,
        },
        ColumnDescriptor {
            key: "tags",
            title: "标签",
            render: render_question_tags,
        },
        ColumnDescriptor {
            key: "isEnabled",
            title: "状态",
            render: render_question_enabled,
        },
        ColumnDescriptor {
            key: "createdAt",
            title: "创建时间",
            render: render_question_created,
        },
        ColumnDescriptor {
            key: "updatedAt",
            title: "更新时间",
            render: render_question_updated,
        },
        ColumnDescriptor {
            key: "action",
            title: "操作",
            render: render_question_actions,
        },
    ]
}

// ============================================================================
// 科目列
// ============================================================================

fn render_subject_name(s: &Subject, _: &RenderContext<'_>) -> CellView {
    CellView::text(s.name.clone())
}

fn render_subject_code(s: &Subject, _: &RenderContext<'_>) -> CellView {
    CellView::text(s.code.clone())
}

fn render_subject_description(s: &Subject, _: &RenderContext<'_>) -> CellView {
    CellView::text(s.description.clone().unwrap_or_default())
}

fn render_subject_status(s: &Subject, _: &RenderContext<'_>) -> CellView {
    enabled_badge(s.is_enabled)
}

fn render_subject_created(s: &Subject, ctx: &RenderContext<'_>) -> CellView {
    CellView::text(format_timestamp(s.created_at.as_deref(), &ctx.offset))
}

fn render_subject_actions(s: &Subject, _: &RenderContext<'_>) -> CellView {
    CellView::Actions {
        actions: vec![
            RowAction::Navigate {
                label: "编辑",
                path: format!("/subjects/edit/{}", s.id),
            },
            RowAction::Delete {
                label: "删除",
                row_id: s.id.clone(),
                confirm: ConfirmPrompt {
                    title: format!("确定要删除科目「{}」吗？", s.name),
                    ok_text: "确定",
                    cancel_text: "取消",
                },
            },
        ],
    }
}

pub fn subject_columns() -> Vec<ColumnDescriptor<Subject>> {
    vec![
        ColumnDescriptor {
            key: "name",
            title: "科目名称",
            render: render_subject_name,
        },
        ColumnDescriptor {
            key: "code",
            title: "科目代码",
            render: render_subject_code,
        },
        ColumnDescriptor {
            key: "description",
            title: "描述",
            render: render_subject_description,
        },
        ColumnDescriptor {
            key: "isEnabled",
            title: "状态",
            render: render_subject_status,
        },
        ColumnDescriptor {
            key: "createdAt",
            title: "创建时间",
            render: render_subject_created,
        },
        ColumnDescriptor {
            key: "action",
            title: "操作",
            render: render_subject_actions,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(id: &str) -> Question {
        serde_json::from_value(serde_json::json!({
            "_id": id,
            "type": "judgment",
            "difficulty": "easy",
            "subjectId": "s1",
            "tags": [],
            "question_markdown": "水在 0℃ 结冰",
            "createdAt": "2024-03-01T08:00:00Z"
        }))
        .unwrap()
    }

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    #[test]
    fn test_format_timestamp() {
        let utc = utc();
        assert_eq!(format_timestamp(None, &utc), "-");
        assert_eq!(format_timestamp(Some("  "), &utc), "-");
        assert_eq!(
            format_timestamp(Some("2024-03-01T08:00:00.123Z"), &utc),
            "2024-03-01 08:00:00"
        );
        let beijing = FixedOffset::east_opt(8 * 3600).unwrap();
        assert_eq!(
            format_timestamp(Some("2024-03-01T20:30:00Z"), &beijing),
            "2024-03-02 04:30:00"
        );
        assert_eq!(
            format_timestamp(Some("2024-03-01 08:00:00"), &utc),
            "2024-03-01 08:00:00"
        );
        assert_eq!(format_timestamp(Some("昨天"), &utc), "昨天");
    }

    #[test]
    fn test_viewing_cells_are_static() {
        let edit = EditState::new();
        let ctx = RenderContext::new(&edit, utc());
        let rows = render_rows(&[question("q1")], &question_columns(), &ctx);
        let row = &rows[0];

        assert_eq!(row.cells.len(), 9);
        assert!(row.cells.iter().all(|(_, c)| !c.is_editor()));
        assert_eq!(
            row.cell("type"),
            Some(&CellView::Badge {
                label: "判断题".into(),
                tone: Tone::Info
            })
        );
        assert_eq!(row.cell("tags").unwrap().plain_text(), TAGS_PLACEHOLDER);
        assert_eq!(row.cell("createdAt").unwrap().plain_text(), "2024-03-01 08:00:00");
        assert_eq!(row.cell("updatedAt").unwrap().plain_text(), "-");
    }

    #[test]
    fn test_editing_cell_yields_editor() {
        let mut edit = EditState::new();
        edit.begin("q1", EditableColumn::Difficulty);
        let ctx = RenderContext::new(&edit, utc());
        let rows = render_rows(&[question("q1"), question("q2")], &question_columns(), &ctx);

        match rows[0].cell("difficulty") {
            Some(CellView::Editor(editor)) => {
                assert_eq!(editor.value, FieldValue::Difficulty(Difficulty::Easy));
                assert_eq!(editor.choices.len(), 3);
            }
            other => panic!("expected editor, got {:?}", other),
        }
        assert!(!rows[0].cell("tags").unwrap().is_editor());
        assert!(!rows[1].cell("difficulty").unwrap().is_editor());
    }

    #[test]
    fn test_batch_editor_shows_staged_value() {
        let mut edit = EditState::new();
        edit.enter_batch(["q1"]);
        edit.stage("q1", FieldValue::Enabled(false));
        let ctx = RenderContext::new(&edit, utc());
        let rows = render_rows(&[question("q1")], &question_columns(), &ctx);

        for key in ["question_markdown", "type", "difficulty", "tags", "isEnabled"] {
            assert!(rows[0].cell(key).unwrap().is_editor(), "{key} should edit");
        }
        assert!(!rows[0].cell("createdAt").unwrap().is_editor());
        assert!(!rows[0].cell("id").unwrap().is_editor());
        match rows[0].cell("isEnabled") {
            Some(CellView::Editor(editor)) => {
                assert_eq!(editor.value, FieldValue::Enabled(false))
            }
            other => panic!("expected editor, got {:?}", other),
        }
    }

    #[test]
    fn test_action_column() {
        let edit = EditState::new();
        let ctx = RenderContext::new(&edit, utc());
        let cell = render_question_actions(&question("q1"), &ctx);
        let CellView::Actions { actions } = cell else {
            panic!("expected actions");
        };
        assert_eq!(
            actions[0],
            RowAction::Navigate {
                label: "编辑",
                path: "/questions/edit/q1".into()
            }
        );
        assert!(matches!(
            &actions[1],
            RowAction::Delete { confirm, .. } if confirm.title == "确定要删除这个题目吗？"
        ));
    }

    #[test]
    fn test_subject_row() {
        let subject: Subject = serde_json::from_value(serde_json::json!({
            "_id": "s9",
            "name": "数据结构",
            "code": "DS",
            "isEnabled": false
        }))
        .unwrap();
        let edit = EditState::new();
        let ctx = RenderContext::new(&edit, utc());
        let rows = render_rows(&[subject], &subject_columns(), &ctx);
        let row = &rows[0];

        assert_eq!(row.id, "s9");
        assert_eq!(row.cells.len(), 6);
        assert_eq!(row.cell("code").unwrap().plain_text(), "DS");
        assert_eq!(row.cell("description").unwrap().plain_text(), "");
        assert_eq!(
            row.cell("isEnabled"),
            Some(&CellView::Badge {
                label: "禁用".into(),
                tone: Tone::Danger
            })
        );
        assert_eq!(row.cell("createdAt").unwrap().plain_text(), "-");

        let Some(CellView::Actions { actions }) = row.cell("action") else {
            panic!("expected actions");
        };
        assert_eq!(
            actions[0],
            RowAction::Navigate {
                label: "编辑",
                path: "/subjects/edit/s9".into()
            }
        );
        assert!(matches!(
            &actions[1],
            RowAction::Delete { row_id, confirm, .. }
                if row_id == "s9" && confirm.title == "确定要删除科目「数据结构」吗？"
        ));
    }
}
