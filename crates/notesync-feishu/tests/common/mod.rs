//! In-memory table service shared by the engine tests.

#![allow(dead_code)]

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use notesync_core::{Error, NoteRecord, Result, SyncConfig, SyncFields, SyncMode};
use notesync_feishu::types::{CreatedApp, FieldItem, TableItem};
use notesync_feishu::{AppMetadata, ColumnSpec, Destination, Row, TableService, UpdateData};

pub const TABLE_URL: &str = "https://acme.feishu.cn/base/app1?table=tbl1";

#[derive(Default)]
struct State {
    fields: Vec<String>,
    created_fields: Vec<String>,
    rows: Vec<(String, Row)>,
    next_id: u64,
    calls: Vec<&'static str>,
}

/// Keeps one table in memory and records every call made against it.
#[derive(Default)]
pub struct FakeTableService {
    state: Mutex<State>,
}

impl FakeTableService {
    pub fn with_fields(names: &[&str]) -> Self {
        let fake = Self::default();
        fake.state.lock().unwrap().fields = names.iter().map(|n| n.to_string()).collect();
        fake
    }

    /// Seed `count` rows that pre-date the test.
    pub fn seed_rows(&self, count: usize) {
        let mut state = self.state.lock().unwrap();
        for _ in 0..count {
            state.next_id += 1;
            let id = format!("rec{}", state.next_id);
            let mut row = Row::new();
            row.insert("笔记ID".into(), Value::String(format!("old-{}", id)));
            state.rows.push((id, row));
        }
    }

    pub fn rows(&self) -> Vec<Row> {
        self.state.lock().unwrap().rows.iter().map(|(_, r)| r.clone()).collect()
    }

    pub fn created_fields(&self) -> Vec<String> {
        self.state.lock().unwrap().created_fields.clone()
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.state.lock().unwrap().calls.clone()
    }

    fn call(&self, name: &'static str) {
        self.state.lock().unwrap().calls.push(name);
    }
}

#[async_trait]
impl TableService for FakeTableService {
    async fn authenticate(&self, _app_id: &str, app_secret: &str) -> Result<String> {
        self.call("authenticate");
        if app_secret == "wrong" {
            return Err(Error::Api {
                code: 99991664,
                message: "app_secret 参数无效".into(),
            });
        }
        Ok("t-fake".into())
    }

    async fn app_metadata(&self, _token: &str, _app_token: &str) -> Result<AppMetadata> {
        self.call("app_metadata");
        Ok(AppMetadata {
            name: "笔记库".into(),
            revision: 1,
            is_advanced: false,
        })
    }

    async fn update_app(&self, _token: &str, _app_token: &str, update: &UpdateData) -> Result<AppMetadata> {
        self.call("update_app");
        Ok(AppMetadata {
            name: update.name.clone().unwrap_or_default(),
            revision: 2,
            is_advanced: update.is_advanced.unwrap_or(false),
        })
    }

    async fn create_app(&self, _token: &str, _name: &str, _time_zone: &str) -> Result<CreatedApp> {
        self.call("create_app");
        Ok(CreatedApp {
            app_token: "app1".into(),
            url: "https://acme.feishu.cn/base/app1".into(),
            default_table_id: Some("tbl1".into()),
        })
    }

    async fn list_tables(&self, _token: &str, _app_token: &str) -> Result<Vec<TableItem>> {
        self.call("list_tables");
        Ok(vec![])
    }

    async fn list_fields(&self, _token: &str, _dest: &Destination) -> Result<Vec<FieldItem>> {
        self.call("list_fields");
        Ok(self
            .state
            .lock()
            .unwrap()
            .fields
            .iter()
            .map(|name| FieldItem {
                field_name: name.clone(),
                field_id: None,
                field_type: None,
            })
            .collect())
    }

    async fn create_field(&self, _token: &str, _dest: &Destination, spec: &ColumnSpec) -> Result<()> {
        self.call("create_field");
        let mut state = self.state.lock().unwrap();
        state.fields.push(spec.name.clone());
        state.created_fields.push(spec.name.clone());
        Ok(())
    }

    async fn search_record(
        &self,
        _token: &str,
        _dest: &Destination,
        field_name: &str,
        value: &str,
    ) -> Result<Option<String>> {
        self.call("search_record");
        Ok(self
            .state
            .lock()
            .unwrap()
            .rows
            .iter()
            .find(|(_, row)| row.get(field_name).and_then(Value::as_str) == Some(value))
            .map(|(id, _)| id.clone()))
    }

    async fn list_record_ids(&self, _token: &str, _dest: &Destination) -> Result<Vec<String>> {
        self.call("list_record_ids");
        Ok(self.state.lock().unwrap().rows.iter().map(|(id, _)| id.clone()).collect())
    }

    async fn batch_delete(&self, _token: &str, _dest: &Destination, record_ids: &[String]) -> Result<()> {
        self.call("batch_delete");
        self.state
            .lock()
            .unwrap()
            .rows
            .retain(|(id, _)| !record_ids.contains(id));
        Ok(())
    }

    async fn create_record(&self, _token: &str, _dest: &Destination, row: &Row) -> Result<String> {
        self.call("create_record");
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = format!("rec{}", state.next_id);
        state.rows.push((id.clone(), row.clone()));
        Ok(id)
    }

    async fn update_record(&self, _token: &str, _dest: &Destination, record_id: &str, row: &Row) -> Result<()> {
        self.call("update_record");
        let mut state = self.state.lock().unwrap();
        match state.rows.iter_mut().find(|(id, _)| id == record_id) {
            Some((_, existing)) => {
                *existing = row.clone();
                Ok(())
            }
            None => Err(Error::Api {
                code: 1254050,
                message: "记录不存在".into(),
            }),
        }
    }

    async fn upload_image(&self, _token: &str, image_url: &str) -> Result<String> {
        self.call("upload_image");
        if image_url.contains("broken") {
            return Err(Error::Request("HTTP请求失败: 404 Not Found".into()));
        }
        let name = image_url.rsplit('/').next().unwrap_or(image_url);
        Ok(format!("file-{}", name))
    }
}

pub fn config(mode: SyncMode, fields: SyncFields) -> SyncConfig {
    SyncConfig {
        app_id: "cli_test".into(),
        app_secret: "secret".into(),
        table_url: TABLE_URL.into(),
        sync_mode: mode,
        upload_files: false,
        sync_fields: fields,
    }
}

pub fn record(id: &str) -> NoteRecord {
    let mut record = NoteRecord {
        id: id.into(),
        title: "T".into(),
        author: "作者A".into(),
        likes: 100,
        follower_count: 1000,
        publish_time: "1723800000000".into(),
        ..NoteRecord::default()
    };
    record.derive_scores();
    record
}
