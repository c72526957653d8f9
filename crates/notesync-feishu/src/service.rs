//! Table-service operations used by the sync engine.
//!
//! [`FeishuClient`](crate::FeishuClient) talks to the real service; tests
//! substitute an in-memory implementation.

use async_trait::async_trait;

use notesync_core::Result;

use crate::destination::Destination;
use crate::schema::ColumnSpec;
use crate::types::{AppMetadata, CreatedApp, FieldItem, Row, TableItem, UpdateData};

/// Remote table operations. Every call after `authenticate` takes the
/// tenant access token it returned.
#[async_trait]
pub trait TableService: Send + Sync {
    /// Exchange the app credential pair for a tenant access token.
    async fn authenticate(&self, app_id: &str, app_secret: &str) -> Result<String>;

    async fn app_metadata(&self, token: &str, app_token: &str) -> Result<AppMetadata>;

    async fn update_app(&self, token: &str, app_token: &str, update: &UpdateData) -> Result<AppMetadata>;

    async fn create_app(&self, token: &str, name: &str, time_zone: &str) -> Result<CreatedApp>;

    async fn list_tables(&self, token: &str, app_token: &str) -> Result<Vec<TableItem>>;

    async fn list_fields(&self, token: &str, dest: &Destination) -> Result<Vec<FieldItem>>;

    async fn create_field(&self, token: &str, dest: &Destination, spec: &ColumnSpec) -> Result<()>;

    /// First row whose `field_name` column equals `value`.
    async fn search_record(
        &self,
        token: &str,
        dest: &Destination,
        field_name: &str,
        value: &str,
    ) -> Result<Option<String>>;

    /// Identifiers of every row in the table.
    async fn list_record_ids(&self, token: &str, dest: &Destination) -> Result<Vec<String>>;

    async fn batch_delete(&self, token: &str, dest: &Destination, record_ids: &[String]) -> Result<()>;

    /// Create a row, returning its record id.
    async fn create_record(&self, token: &str, dest: &Destination, row: &Row) -> Result<String>;

    async fn update_record(&self, token: &str, dest: &Destination, record_id: &str, row: &Row) -> Result<()>;

    /// Download an image and re-upload it as media, returning the file token.
    async fn upload_image(&self, token: &str, image_url: &str) -> Result<String>;
}
