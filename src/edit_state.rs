//! 单元格编辑状态
//!
//! 每个 (行, 列) 单元格处于 Viewing 或 Editing；每列同一时刻最多一行处于单独编辑。
//! 批量模式是叠加在单元格状态之上的一层：开启后批量集合中的行在所有可编辑列上
//! 都视为 Editing，并暂存各行的修改，提交时逐行发送。

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::models::FieldValue;

/// 可内联编辑的列
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EditableColumn {
    Body,
    Kind,
    Difficulty,
    Tags,
    Enabled,
}

impl EditableColumn {
    pub const ALL: [EditableColumn; 5] = [
        EditableColumn::Body,
        EditableColumn::Kind,
        EditableColumn::Difficulty,
        EditableColumn::Tags,
        EditableColumn::Enabled,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CellMode {
    Viewing,
    Editing,
}

#[derive(Debug, Clone, Default)]
struct BatchSession {
    rows: BTreeSet<String>,
    staged: BTreeMap<String, Vec<FieldValue>>,
}

#[derive(Debug, Clone, Default)]
pub struct EditState {
    cells: HashMap<(String, EditableColumn), CellMode>,
    batch: Option<BatchSession>,
}

impl EditState {
    pub fn new() -> Self {
        Self::default()
    }

    /// 单元格的显示状态（含批量叠加）
    pub fn mode(&self, row_id: &str, column: EditableColumn) -> CellMode {
        if self.is_batch_row(row_id) {
            return CellMode::Editing;
        }
        self.cells
            .get(&(row_id.to_string(), column))
            .copied()
            .unwrap_or(CellMode::Viewing)
    }

    pub fn is_editing(&self, row_id: &str, column: EditableColumn) -> bool {
        self.mode(row_id, column) == CellMode::Editing
    }

    /// 该列当前单独编辑的行
    pub fn editing_row(&self, column: EditableColumn) -> Option<&str> {
        self.cells.iter().find_map(|((row, col), mode)| {
            (*col == column && *mode == CellMode::Editing).then_some(row.as_str())
        })
    }

    /// 进入单独编辑；已在编辑中返回 `false`
    ///
    /// 同一列另一行的编辑会被替换。
    pub fn begin(&mut self, row_id: &str, column: EditableColumn) -> bool {
        if self.is_editing(row_id, column) {
            return false;
        }
        self.cells
            .retain(|(_, col), mode| !(*col == column && *mode == CellMode::Editing));
        self.cells
            .insert((row_id.to_string(), column), CellMode::Editing);
        true
    }

    /// 结束单独编辑（提交或取消）
    pub fn finish(&mut self, row_id: &str, column: EditableColumn) {
        self.cells.remove(&(row_id.to_string(), column));
    }

    // ========================================================================
    // 批量模式
    // ========================================================================

    pub fn is_batch(&self) -> bool {
        self.batch.is_some()
    }

    /// 行是否处于批量集合中
    pub fn is_batch_row(&self, row_id: &str) -> bool {
        self.batch
            .as_ref()
            .is_some_and(|b| b.rows.contains(row_id))
    }

    /// 开启批量模式，行集合取当前已加载的全部行
    pub fn enter_batch<I, S>(&mut self, row_ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.batch = Some(BatchSession {
            rows: row_ids.into_iter().map(Into::into).collect(),
            staged: BTreeMap::new(),
        });
    }

    /// 退出批量模式，同时清除所有列的单独编辑
    pub fn exit_batch(&mut self) {
        self.batch = None;
        self.cells.clear();
    }

    pub fn batch_rows(&self) -> Vec<String> {
        self.batch
            .as_ref()
            .map(|b| b.rows.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// 暂存一行的修改；同列的旧修改被替换。行不在批量集合中时返回 `false`
    pub fn stage(&mut self, row_id: &str, change: FieldValue) -> bool {
        let Some(batch) = self.batch.as_mut() else {
            return false;
        };
        if !batch.rows.contains(row_id) {
            return false;
        }
        let changes = batch.staged.entry(row_id.to_string()).or_default();
        changes.retain(|c| c.column() != change.column());
        changes.push(change);
        true
    }

    /// 撤销一行在某列的暂存修改
    pub fn unstage(&mut self, row_id: &str, column: EditableColumn) {
        if let Some(batch) = self.batch.as_mut() {
            if let Some(changes) = batch.staged.get_mut(row_id) {
                changes.retain(|c| c.column() != column);
                if changes.is_empty() {
                    batch.staged.remove(row_id);
                }
            }
        }
    }

    pub fn staged(&self, row_id: &str, column: EditableColumn) -> Option<&FieldValue> {
        self.batch
            .as_ref()
            .and_then(|b| b.staged.get(row_id))
            .and_then(|changes| changes.iter().find(|c| c.column() == column))
    }

    /// 有暂存修改的行，按行 ID 升序
    pub fn staged_rows(&self) -> Vec<(String, Vec<FieldValue>)> {
        self.batch
            .as_ref()
            .map(|b| {
                b.staged
                    .iter()
                    .map(|(id, changes)| (id.clone(), changes.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// 批量提交部分失败后只保留失败的行及其暂存值
    pub fn retain_batch_rows(&mut self, keep: &BTreeSet<String>) {
        if let Some(batch) = self.batch.as_mut() {
            batch.rows.retain(|id| keep.contains(id));
            batch.staged.retain(|id, _| keep.contains(id));
        }
    }

    /// 行被删除后清除其全部状态
    pub fn forget_row(&mut self, row_id: &str) {
        self.cells.retain(|(row, _), _| row != row_id);
        if let Some(batch) = self.batch.as_mut() {
            batch.rows.remove(row_id);
            batch.staged.remove(row_id);
        }
    }

    pub fn reset(&mut self) {
        self.cells.clear();
        self.batch = None;
    }
}
