//! 科目存储集成测试

use assert_matches::assert_matches;
use question_bank_console_lib::models::{CreateSubjectParams, Facet, UpdateSubjectParams};
use question_bank_console_lib::test_utils::{sample_subject, GatewayCall, GatewayOp, MemoryGateway};
use question_bank_console_lib::{
    GatewayError, NoticeLevel, NoticeQueue, SubjectFetch, SubjectStore,
};
use std::sync::Arc;

fn store() -> (SubjectStore, Arc<MemoryGateway>, Arc<NoticeQueue>) {
    let gateway = Arc::new(MemoryGateway::new().with_subjects(vec![
        sample_subject("s1", "MATH"),
        sample_subject("s2", "PHYS"),
        sample_subject("s3", "CHEM"),
    ]));
    let notices = Arc::new(NoticeQueue::new());
    let store = SubjectStore::new(gateway.clone(), notices.clone(), 2);
    (store, gateway, notices)
}

#[tokio::test]
async fn test_fetch_and_search() {
    let (store, gateway, _) = store();
    store.fetch(SubjectFetch::default()).await.unwrap();
    let snap = store.snapshot();
    assert_eq!(snap.items.len(), 2);
    assert_eq!(snap.pagination.total, 3);

    store
        .fetch(SubjectFetch {
            page: Some(2),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(store.items().len(), 1);

    store.search(" phys ").await.unwrap();
    let snap = store.snapshot();
    assert_eq!(snap.items.len(), 1);
    assert_eq!(snap.items[0].code, "PHYS");
    assert_eq!(snap.pagination.page, 1);
    assert_eq!(snap.filters.search, "phys");

    let last = gateway.calls().last().cloned().unwrap();
    assert_matches!(last, GatewayCall::ListSubjects { page: 1, page_size: 2, .. });
}

#[tokio::test]
async fn test_enabled_facet() {
    let (store, gateway, _) = store();
    gateway.clear_calls();
    store
        .fetch(SubjectFetch {
            enabled: Some(Facet::Only(false)),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(store.items().is_empty());
}

#[tokio::test]
async fn test_add_refetches_and_notifies() {
    let (store, gateway, notices) = store();
    store.search("BIO").await.unwrap();
    gateway.clear_calls();

    let created = store
        .add(CreateSubjectParams {
            name: "生物".into(),
            code: "BIO".into(),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(created.code, "BIO");

    let calls = gateway.calls();
    assert_eq!(calls.len(), 2);
    assert_matches!(
        &calls[1],
        GatewayCall::ListSubjects { filters, .. } if filters.search == "BIO"
    );
    assert_eq!(store.items().len(), 1);
    assert_eq!(notices.drain()[0].message, "科目创建成功");
}

#[tokio::test]
async fn test_add_duplicate_code_surfaces_validation() {
    let (store, gateway, notices) = store();
    gateway.clear_calls();

    let err = store
        .add(CreateSubjectParams {
            name: "数学二".into(),
            code: "MATH".into(),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert_eq!(err, GatewayError::Validation("科目代码已存在".into()));
    let notice = &notices.drain()[0];
    assert_eq!(notice.level, NoticeLevel::Error);
    assert!(notice.message.contains("科目代码已存在"));

    let err = store.add(CreateSubjectParams::default()).await.unwrap_err();
    assert_matches!(err, GatewayError::Validation(_));
    assert_eq!(gateway.calls().len(), 1);
}

#[tokio::test]
async fn test_edit_and_remove() {
    let (store, gateway, notices) = store();
    store.fetch(SubjectFetch::default()).await.unwrap();

    let updated = store
        .edit(
            "s1",
            UpdateSubjectParams {
                name: Some("高等数学".into()),
                is_enabled: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "高等数学");
    assert!(!updated.is_enabled);
    assert_eq!(updated.code, "MATH");
    assert!(!store.find("s1").unwrap().is_enabled);

    store.remove("s2").await.unwrap();
    assert_eq!(store.snapshot().pagination.total, 2);

    gateway.fail_next(GatewayOp::DeleteSubject, GatewayError::Network("offline".into()));
    assert_matches!(store.remove("s3").await, Err(GatewayError::Network(_)));

    let messages: Vec<String> = notices.drain().into_iter().map(|n| n.message).collect();
    assert_eq!(messages[0], "科目更新成功");
    assert_eq!(messages[1], "科目删除成功");
    assert_eq!(messages[2], "删除科目失败：网络错误，请检查网络连接");
}

#[tokio::test]
async fn test_detail() {
    let (store, _, _) = store();
    assert_eq!(store.detail("s3").await.unwrap().code, "CHEM");
    assert_matches!(store.detail("nope").await, Err(GatewayError::NotFound(_)));
}
