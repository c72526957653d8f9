//! Engine behaviour against an in-memory table service.

mod common;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use common::{config, record, FakeTableService};
use notesync_core::{SyncFields, SyncMode};
use notesync_feishu::engine::{MISSING_CREDENTIALS, SYNC_SUCCESS, TOKEN_FAILURE};
use notesync_feishu::{column, StepStatus, SyncEngine, SyncOptions, UpdateData, COLUMNS};

fn engine(fake: &Arc<FakeTableService>) -> SyncEngine {
    SyncEngine::new(fake.clone()).with_options(SyncOptions {
        deadline: Duration::from_secs(5),
        field_delay: Duration::ZERO,
    })
}

fn all_columns() -> Vec<&'static str> {
    COLUMNS.iter().map(|(name, _)| *name).collect()
}

#[tokio::test]
async fn test_merge_twice_keeps_one_row() {
    let fake = Arc::new(FakeTableService::with_fields(&all_columns()));
    let engine = engine(&fake);
    let cfg = config(SyncMode::Merge, SyncFields::default());

    let first = engine.sync(&record("abc123"), &cfg, "").await;
    assert!(first.success, "{:?}", first.error);

    let mut updated = record("abc123");
    updated.likes = 250;
    let second = engine.sync(&updated, &cfg, "").await;
    assert_eq!(second.message.as_deref(), Some(SYNC_SUCCESS));

    let rows = fake.rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][column::NOTE_ID], json!("abc123"));
    assert_eq!(rows[0][column::LIKES], json!(250));
    assert_eq!(fake.calls().iter().filter(|c| **c == "update_record").count(), 1);
}

#[tokio::test]
async fn test_append_twice_creates_two_rows() {
    let fake = Arc::new(FakeTableService::with_fields(&all_columns()));
    let engine = engine(&fake);
    let cfg = config(SyncMode::Append, SyncFields::default());

    assert!(engine.sync(&record("abc123"), &cfg, "").await.success);
    assert!(engine.sync(&record("abc123"), &cfg, "").await.success);

    assert_eq!(fake.rows().len(), 2);
    assert!(!fake.calls().contains(&"search_record"));
}

#[tokio::test]
async fn test_overwrite_replaces_every_row() {
    let fake = Arc::new(FakeTableService::with_fields(&all_columns()));
    fake.seed_rows(3);
    let engine = engine(&fake);

    let response = engine
        .sync(&record("abc123"), &config(SyncMode::Overwrite, SyncFields::none()), "")
        .await;
    assert!(response.success);

    let rows = fake.rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][column::NOTE_ID], json!("abc123"));

    let calls = fake.calls();
    let deleted_at = calls.iter().position(|c| *c == "batch_delete").unwrap();
    let created_at = calls.iter().position(|c| *c == "create_record").unwrap();
    assert!(deleted_at < created_at);
}

#[tokio::test]
async fn test_missing_columns_created_once() {
    let fake = Arc::new(FakeTableService::with_fields(&[column::NOTE_ID, column::NOTE_TITLE]));
    let engine = engine(&fake);
    let fields = SyncFields {
        note_title: true,
        likes: true,
        comments: true,
        ..SyncFields::none()
    };
    let cfg = config(SyncMode::Append, fields);

    assert!(engine.sync(&record("abc123"), &cfg, "").await.success);
    assert_eq!(fake.created_fields(), vec![column::LIKES, column::COMMENTS]);

    assert!(engine.sync(&record("abc123"), &cfg, "").await.success);
    assert_eq!(fake.created_fields().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_column_creation_is_paced() {
    let fake = Arc::new(FakeTableService::with_fields(&[column::NOTE_ID]));
    let engine = SyncEngine::new(fake.clone());
    let fields = SyncFields {
        likes: true,
        comments: true,
        shares: true,
        ..SyncFields::none()
    };

    let started = tokio::time::Instant::now();
    let response = engine.sync(&record("abc123"), &config(SyncMode::Append, fields), "").await;
    assert!(response.success);
    assert!(started.elapsed() >= Duration::from_millis(600));
}

#[tokio::test]
async fn test_failed_attachments_do_not_block_sync() {
    let fake = Arc::new(FakeTableService::with_fields(&[column::NOTE_ID]));
    let engine = engine(&fake);
    let mut cfg = config(SyncMode::Append, SyncFields::none());
    cfg.upload_files = true;
    let mut rec = record("abc123");
    rec.images = vec![
        "https://cdn.example/a.jpg".into(),
        "https://cdn.example/broken.jpg".into(),
        "https://cdn.example/c.jpg".into(),
    ];

    let response = engine.sync(&rec, &cfg, "").await;
    assert!(response.success, "{:?}", response.error);

    assert_eq!(fake.created_fields(), vec![column::ATTACHMENT]);
    let rows = fake.rows();
    assert_eq!(rows[0][column::ATTACHMENT], json!("file-a.jpg, file-c.jpg"));
}

#[tokio::test]
async fn test_validation_happens_before_any_call() {
    let fake = Arc::new(FakeTableService::default());
    let engine = engine(&fake);

    let mut cfg = config(SyncMode::Append, SyncFields::default());
    cfg.app_secret = String::new();
    let response = engine.sync(&record("abc123"), &cfg, "").await;
    assert_eq!(response.error.as_deref(), Some(MISSING_CREDENTIALS));

    let mut cfg = config(SyncMode::Append, SyncFields::default());
    cfg.table_url = "https://acme.feishu.cn/docx/doc1".into();
    let response = engine.sync(&record("abc123"), &cfg, "").await;
    assert_eq!(response.error.as_deref(), Some("无效的飞书多维表格链接，请检查链接格式"));

    assert!(fake.calls().is_empty());
}

#[tokio::test]
async fn test_token_failure_message() {
    let fake = Arc::new(FakeTableService::default());
    let mut cfg = config(SyncMode::Append, SyncFields::default());
    cfg.app_secret = "wrong".into();

    let response = engine(&fake).sync(&record("abc123"), &cfg, "").await;
    assert!(!response.success);
    assert_eq!(response.error.as_deref(), Some(TOKEN_FAILURE));
    assert_eq!(fake.calls(), vec!["authenticate"]);
}

#[tokio::test]
async fn test_connection_report_all_steps_pass() {
    let fake = Arc::new(FakeTableService::with_fields(&[column::NOTE_ID, column::LIKES]));
    let report = engine(&fake)
        .test_connection(&config(SyncMode::Append, SyncFields::default()))
        .await;

    assert!(report.success);
    assert_eq!(report.test_results.len(), 5);
    assert!(report.test_results.iter().all(|s| s.status == StepStatus::Passed));
    let info = report.table_info.unwrap();
    assert_eq!(info.fields_count, 2);
    assert_eq!(info.name, "笔记库");
}

#[tokio::test]
async fn test_connection_report_halts_at_token_step() {
    let fake = Arc::new(FakeTableService::default());
    let mut cfg = config(SyncMode::Append, SyncFields::default());
    cfg.app_secret = "wrong".into();

    let report = engine(&fake).test_connection(&cfg).await;
    assert!(!report.success);
    assert_eq!(report.test_results.len(), 3);
    assert_eq!(report.failed_step().unwrap().step, "获取访问令牌");
    assert_eq!(report.error.as_deref(), Some(TOKEN_FAILURE));
}

#[tokio::test]
async fn test_create_table_provisions_every_column() {
    let fake = Arc::new(FakeTableService::default());
    let response = engine(&fake)
        .create_table(&config(SyncMode::Append, SyncFields::default()))
        .await;

    assert!(response.success);
    let table = response.table.unwrap();
    assert_eq!(table.table_url, "https://acme.feishu.cn/base/app1?table=tbl1");
    assert_eq!(table.fields_created, COLUMNS.len());
    assert_eq!(fake.created_fields(), all_columns());
}

#[tokio::test]
async fn test_empty_update_is_noop() {
    let fake = Arc::new(FakeTableService::default());
    let cfg = config(SyncMode::Append, SyncFields::default());

    let response = engine(&fake).update_table(&cfg, &UpdateData::default()).await;
    assert!(response.success);
    assert!(!fake.calls().contains(&"update_app"));

    let update = UpdateData {
        name: Some("新名字".into()),
        is_advanced: None,
    };
    let response = engine(&fake).update_table(&cfg, &update).await;
    assert_eq!(response.message.as_deref(), Some("多维表格更新成功！"));
    assert!(fake.calls().contains(&"update_app"));
}
