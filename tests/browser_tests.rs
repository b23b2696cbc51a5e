//! 题目浏览器集成测试：科目切换、筛选、内联编辑、批量编辑与删除确认

use assert_matches::assert_matches;
use chrono::FixedOffset;
use question_bank_console_lib::columns::CellView;
use question_bank_console_lib::models::{Difficulty, Facet, FieldValue, QuestionType};
use question_bank_console_lib::test_utils::{
    sample_question, sample_subject, GatewayCall, MemoryGateway,
};
use question_bank_console_lib::{
    BrowserError, CellMode, CommitOutcome, EditableColumn, FilterState, GatewayError,
    NoticeQueue, QuestionBrowser, QuestionStore, SubjectStore,
};
use std::sync::Arc;

struct Fixture {
    gateway: Arc<MemoryGateway>,
    notices: Arc<NoticeQueue>,
    browser: QuestionBrowser,
}

fn fixture() -> Fixture {
    let mut questions: Vec<_> = (1..=12)
        .map(|i| sample_question(&format!("q{:02}", i), "s1"))
        .collect();
    questions.extend((1..=3).map(|i| sample_question(&format!("p{:02}", i), "s2")));

    let gateway = Arc::new(
        MemoryGateway::new()
            .with_questions(questions)
            .with_subjects(vec![sample_subject("s1", "MATH"), sample_subject("s2", "PHYS")])
            .with_export_bytes(b"xlsx-bytes".to_vec()),
    );
    let notices = Arc::new(NoticeQueue::new());
    let question_store = Arc::new(QuestionStore::new(gateway.clone(), notices.clone(), 10));
    let subject_store = Arc::new(SubjectStore::new(gateway.clone(), notices.clone(), 50));
    let browser = QuestionBrowser::new(
        question_store,
        subject_store,
        FixedOffset::east_opt(0).unwrap(),
    );
    Fixture {
        gateway,
        notices,
        browser,
    }
}

async fn loaded() -> Fixture {
    let mut fx = fixture();
    fx.browser.load_scopes().await.unwrap();
    fx.gateway.clear_calls();
    fx.notices.drain();
    fx
}

#[tokio::test]
async fn test_first_subject_is_auto_selected() {
    let mut fx = fixture();
    let selected = fx.browser.load_scopes().await.unwrap();

    assert_eq!(selected.as_deref(), Some("s1"));
    assert_eq!(fx.browser.active_scope(), Some("s1"));
    let lists = fx.gateway.list_calls();
    assert_eq!(lists.len(), 1);
    assert_eq!(lists[0].0.scope_id.as_deref(), Some("s1"));
    assert_eq!(lists[0].1, 1);
    assert_eq!(fx.browser.questions().items().len(), 10);

    // 再次加载不会改变已选科目
    fx.gateway.clear_calls();
    assert_eq!(fx.browser.load_scopes().await.unwrap(), None);
    assert!(fx.gateway.list_calls().is_empty());
}

#[tokio::test]
async fn test_scope_switch_resets_page_and_filters() {
    let mut fx = loaded().await;
    fx.browser
        .set_difficulty_filter(Facet::Only(Difficulty::Medium))
        .await
        .unwrap();
    fx.browser.set_search_text("题目");
    fx.browser.search().await.unwrap();
    fx.browser.go_to_page(2).await.unwrap();
    fx.gateway.clear_calls();

    assert!(fx.browser.select_scope("s2").await.unwrap());

    let lists = fx.gateway.list_calls();
    assert_eq!(lists.len(), 1, "exactly one fetch per scope change");
    let (filters, page, _) = &lists[0];
    assert_eq!(filters.scope_id.as_deref(), Some("s2"));
    assert_eq!(*page, 1);
    assert!(filters.search.is_empty());
    assert!(filters.kind.is_all());
    assert!(filters.difficulty.is_all());
    assert!(filters.has_audio.is_all());
    assert!(filters.enabled.is_all());
    assert_eq!(fx.browser.filters(), &FilterState::default());
    assert_eq!(fx.browser.questions().items().len(), 3);
}

#[tokio::test]
async fn test_selecting_active_scope_is_noop() {
    let mut fx = loaded().await;
    assert!(!fx.browser.select_scope("s1").await.unwrap());
    assert!(fx.gateway.calls().is_empty());
}

#[tokio::test]
async fn test_filter_change_fetches_first_page_once() {
    let mut fx = loaded().await;
    fx.browser.go_to_page(2).await.unwrap();
    fx.gateway.clear_calls();

    fx.browser
        .set_kind_filter(Facet::Only(QuestionType::Single))
        .await
        .unwrap();
    fx.browser.set_audio_filter(Facet::Only(false)).await.unwrap();
    fx.browser.set_enabled_filter(Facet::Only(true)).await.unwrap();

    let lists = fx.gateway.list_calls();
    assert_eq!(lists.len(), 3);
    assert!(lists.iter().all(|(_, page, _)| *page == 1));
    let (filters, _, _) = lists.last().unwrap();
    assert_eq!(filters.kind, Facet::Only(QuestionType::Single));
    assert_eq!(filters.has_audio, Facet::Only(false));
    assert_eq!(filters.enabled, Facet::Only(true));
}

#[tokio::test]
async fn test_search_text_applies_only_on_trigger() {
    let mut fx = loaded().await;
    fx.browser.set_search_text("  q05 ");
    assert!(fx.gateway.calls().is_empty());

    // 未触发搜索前，其他筛选仍使用旧的搜索文本
    fx.browser
        .set_difficulty_filter(Facet::Only(Difficulty::Medium))
        .await
        .unwrap();
    assert_eq!(fx.gateway.list_calls()[0].0.search, "");

    fx.browser.search().await.unwrap();
    let lists = fx.gateway.list_calls();
    assert_eq!(lists.len(), 2);
    assert_eq!(lists[1].0.search, "q05");
    assert_eq!(lists[1].1, 1);
    assert_eq!(fx.browser.questions().items().len(), 1);
}

#[tokio::test]
async fn test_filters_require_scope() {
    let mut fx = fixture();
    let err = fx
        .browser
        .set_kind_filter(Facet::Only(QuestionType::Blank))
        .await
        .unwrap_err();
    assert_matches!(err, BrowserError::NoActiveScope);
    assert!(fx.gateway.calls().is_empty());
}

#[tokio::test]
async fn test_noop_commit_skips_network() {
    let mut fx = loaded().await;
    assert!(fx.browser.begin_edit("q01", EditableColumn::Tags).unwrap());
    assert!(fx.browser.edit_state().is_editing("q01", EditableColumn::Tags));

    let reordered = FieldValue::Tags(vec!["基础".into(), "基础".into()]);
    let outcome = fx.browser.commit_edit("q01", reordered).await.unwrap();

    assert_eq!(outcome, CommitOutcome::Unchanged);
    assert!(fx.gateway.calls().is_empty());
    assert_eq!(
        fx.browser.edit_state().mode("q01", EditableColumn::Tags),
        CellMode::Viewing
    );
}

#[tokio::test]
async fn test_commit_updates_then_refetches_active_scope() {
    let mut fx = loaded().await;
    fx.browser
        .begin_edit("q03", EditableColumn::Difficulty)
        .unwrap();

    let outcome = fx
        .browser
        .commit_edit("q03", FieldValue::Difficulty(Difficulty::Hard))
        .await
        .unwrap();
    assert_eq!(outcome, CommitOutcome::Saved);

    let calls = fx.gateway.calls();
    assert_eq!(calls.len(), 2);
    assert_matches!(
        &calls[0],
        GatewayCall::UpdateQuestion { id, payload }
            if id == "q03" && payload.difficulty == Difficulty::Hard && payload.kind == QuestionType::Single
    );
    assert_matches!(
        &calls[1],
        GatewayCall::ListQuestions { filters, .. } if filters.scope_id.as_deref() == Some("s1")
    );
    assert!(!fx.browser.edit_state().is_editing("q03", EditableColumn::Difficulty));
    assert_eq!(
        fx.browser.questions().find("q03").unwrap().difficulty,
        Difficulty::Hard
    );
}

#[tokio::test]
async fn test_commit_failure_keeps_cell_editing() {
    let mut fx = loaded().await;
    fx.gateway
        .fail_row("q04", GatewayError::Server("down".into()));
    fx.browser.begin_edit("q04", EditableColumn::Enabled).unwrap();

    let err = fx
        .browser
        .commit_edit("q04", FieldValue::Enabled(false))
        .await
        .unwrap_err();

    assert_matches!(err, BrowserError::Gateway(GatewayError::Server(_)));
    assert!(fx.browser.edit_state().is_editing("q04", EditableColumn::Enabled));

    let calls = fx.gateway.calls();
    assert_eq!(calls.len(), 2);
    assert_matches!(
        &calls[0],
        GatewayCall::UpdateQuestion { id, payload } if id == "q04" && !payload.enabled
    );
    assert_matches!(
        &calls[1],
        GatewayCall::ListQuestions { filters, .. } if filters.scope_id.as_deref() == Some("s1")
    );
    assert!(fx.notices.drain().iter().any(|n| n.message.starts_with("更新失败")));
}

#[tokio::test]
async fn test_commit_requires_editing_cell() {
    let mut fx = loaded().await;
    let err = fx
        .browser
        .commit_edit("q01", FieldValue::Enabled(false))
        .await
        .unwrap_err();
    assert_matches!(err, BrowserError::NotEditing { .. });

    assert_matches!(
        fx.browser.begin_edit("zz", EditableColumn::Body),
        Err(BrowserError::RowNotLoaded(_))
    );
}

#[tokio::test]
async fn test_batch_mode_toggles_every_row() {
    let mut fx = loaded().await;
    fx.browser.begin_edit("q02", EditableColumn::Body).unwrap();
    fx.browser.toggle_batch();
    assert!(fx.browser.is_batch());

    let rows = fx.browser.rows();
    assert_eq!(rows.len(), 10);
    for row in &rows {
        for key in ["question_markdown", "type", "difficulty", "tags", "isEnabled"] {
            assert!(row.cell(key).unwrap().is_editor(), "{} {}", row.id, key);
        }
        assert!(!row.cell("createdAt").unwrap().is_editor());
    }

    fx.browser.toggle_batch();
    assert!(!fx.browser.is_batch());
    for row in fx.browser.rows() {
        assert!(row.cells.iter().all(|(_, cell)| !cell.is_editor()));
    }
    for col in EditableColumn::ALL {
        assert_eq!(fx.browser.edit_state().editing_row(col), None);
    }
}

#[tokio::test]
async fn test_batch_commit_updates_in_id_order() {
    let mut fx = loaded().await;
    fx.browser.enter_batch();

    let staged = fx
        .browser
        .commit_edit("q07", FieldValue::Difficulty(Difficulty::Easy))
        .await
        .unwrap();
    assert_eq!(staged, CommitOutcome::Staged);
    fx.browser
        .commit_edit("q02", FieldValue::Enabled(false))
        .await
        .unwrap();
    fx.browser
        .commit_edit("q02", FieldValue::Kind(QuestionType::Multiple))
        .await
        .unwrap();
    // 与原值相同，不暂存
    assert_eq!(
        fx.browser
            .commit_edit("q05", FieldValue::Difficulty(Difficulty::Medium))
            .await
            .unwrap(),
        CommitOutcome::Unchanged
    );
    assert!(fx.gateway.calls().is_empty());

    match fx.browser.rows()[6].cell("difficulty") {
        Some(CellView::Editor(editor)) => {
            assert_eq!(editor.value, FieldValue::Difficulty(Difficulty::Easy))
        }
        other => panic!("expected editor, got {:?}", other),
    }

    let result = fx.browser.commit_batch().await.unwrap();
    assert_eq!(result.success_count, 2);
    assert_eq!(result.failed_count, 0);

    let updates = fx.gateway.update_calls();
    let ids: Vec<&str> = updates.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(ids, vec!["q02", "q07"]);
    assert!(!updates[0].1.enabled);
    assert_eq!(updates[0].1.kind, QuestionType::Multiple);
    assert_eq!(updates[1].1.difficulty, Difficulty::Easy);
    assert_eq!(fx.gateway.list_calls().len(), 1);
    assert!(!fx.browser.is_batch());
}

#[tokio::test]
async fn test_batch_partial_failure_keeps_failed_rows() {
    let mut fx = loaded().await;
    fx.gateway
        .fail_row("q03", GatewayError::Validation("题型不允许修改".into()));
    fx.browser.enter_batch();
    for id in ["q01", "q03"] {
        fx.browser
            .commit_edit(id, FieldValue::Enabled(false))
            .await
            .unwrap();
    }

    let result = fx.browser.commit_batch().await.unwrap();
    assert_eq!(result.failed_ids, vec!["q03"]);

    let edit = fx.browser.edit_state();
    assert!(edit.is_batch());
    assert_eq!(edit.batch_rows(), vec!["q03"]);
    assert_eq!(
        edit.staged("q03", EditableColumn::Enabled),
        Some(&FieldValue::Enabled(false))
    );
    assert!(!edit.is_editing("q01", EditableColumn::Enabled));
}

#[tokio::test]
async fn test_batch_commit_requires_batch_mode() {
    let mut fx = loaded().await;
    assert_matches!(
        fx.browser.commit_batch().await,
        Err(BrowserError::BatchInactive)
    );
}

#[tokio::test]
async fn test_delete_needs_confirmation() {
    let mut fx = loaded().await;
    assert_matches!(
        fx.browser.confirm_delete().await,
        Err(BrowserError::NoPendingDelete)
    );

    fx.browser.request_delete("q01").unwrap();
    assert_eq!(fx.browser.pending_delete(), Some("q01"));
    fx.browser.cancel_delete();
    assert_eq!(fx.browser.pending_delete(), None);
    assert!(fx.gateway.calls().is_empty());

    fx.browser.request_delete("q01").unwrap();
    fx.browser.confirm_delete().await.unwrap();

    let calls = fx.gateway.calls();
    assert_eq!(calls[0], GatewayCall::DeleteQuestion("q01".into()));
    assert_matches!(&calls[1], GatewayCall::ListQuestions { .. });
    assert!(fx.browser.questions().find("q01").is_none());
    assert_eq!(fx.browser.questions().snapshot().pagination.total, 11);
    assert_eq!(fx.browser.pending_delete(), None);
}

#[tokio::test]
async fn test_navigation_targets() {
    let fx = loaded().await;
    assert_eq!(fx.browser.edit_target("q09"), "/questions/edit/q09");
    assert_eq!(fx.browser.create_target(), "/questions/new");
}

#[tokio::test]
async fn test_export_writes_named_file() {
    let mut fx = loaded().await;
    fx.browser
        .set_enabled_filter(Facet::Only(true))
        .await
        .unwrap();
    fx.gateway.clear_calls();
    let dir = tempfile::tempdir().unwrap();

    let path = fx.browser.export(dir.path()).await.unwrap();

    let name = path.file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("questions_MATH_"), "{}", name);
    assert!(name.ends_with(".xlsx"));
    assert_eq!(std::fs::read(&path).unwrap(), b"xlsx-bytes");
    assert_matches!(
        &fx.gateway.calls()[0],
        GatewayCall::ExportQuestions(filters)
            if filters.scope_id.as_deref() == Some("s1") && filters.enabled == Facet::Only(true)
    );
}
