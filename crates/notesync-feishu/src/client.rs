//! HTTP client for the table service's open API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use notesync_core::defaults::{
    ENV_FEISHU_BASE_URL, ENV_FEISHU_TIMEOUT_SECS, FEISHU_BASE_URL, FEISHU_TIMEOUT_SECS,
};
use notesync_core::{Error, Result};

use crate::destination::Destination;
use crate::error::api_error;
use crate::schema::ColumnSpec;
use crate::service::TableService;
use crate::types::*;

/// Largest page requested from list endpoints.
const LIST_PAGE_SIZE: &str = "500";

/// Largest id set accepted by one batch-delete request.
const BATCH_DELETE_LIMIT: usize = 500;

/// File name given to uploaded images.
const UPLOAD_FILE_NAME: &str = "image.jpg";

/// Configuration for [`FeishuClient`].
#[derive(Debug, Clone)]
pub struct FeishuConfig {
    /// Open API base URL, without a trailing slash.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for FeishuConfig {
    fn default() -> Self {
        Self {
            base_url: FEISHU_BASE_URL.to_string(),
            timeout_secs: FEISHU_TIMEOUT_SECS,
        }
    }
}

impl FeishuConfig {
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var(ENV_FEISHU_BASE_URL)
                .unwrap_or_else(|_| FEISHU_BASE_URL.to_string()),
            timeout_secs: std::env::var(ENV_FEISHU_TIMEOUT_SECS)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(FEISHU_TIMEOUT_SECS),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Table-service client.
pub struct FeishuClient {
    client: Client,
    config: FeishuConfig,
}

impl FeishuClient {
    pub fn new(config: FeishuConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            subsystem = "feishu",
            component = "client",
            base_url = %config.base_url,
            timeout_secs = config.timeout_secs,
            "Initializing table-service client"
        );

        Ok(Self { client, config })
    }

    pub fn with_defaults() -> Result<Self> {
        Self::new(FeishuConfig::default())
    }

    pub fn from_env() -> Result<Self> {
        Self::new(FeishuConfig::from_env())
    }

    pub fn config(&self) -> &FeishuConfig {
        &self.config
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), endpoint)
    }

    fn get(&self, endpoint: &str, token: &str) -> RequestBuilder {
        self.client.get(self.url(endpoint)).bearer_auth(token)
    }

    fn post(&self, endpoint: &str, token: &str) -> RequestBuilder {
        self.client.post(self.url(endpoint)).bearer_auth(token)
    }

    fn put(&self, endpoint: &str, token: &str) -> RequestBuilder {
        self.client.put(self.url(endpoint)).bearer_auth(token)
    }

    /// Send a request and unwrap the `{code, msg, data}` envelope.
    async fn call<T: DeserializeOwned>(&self, request: RequestBuilder, op: &'static str) -> Result<Option<T>> {
        let response = check_status(request.send().await?, op)?;
        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| Error::Serialization(format!("Invalid {} response: {}", op, e)))?;

        if envelope.code != 0 {
            warn!(
                subsystem = "feishu",
                component = "client",
                op,
                api_code = envelope.code,
                msg = envelope.msg.as_deref().unwrap_or(""),
                "Table service returned an error"
            );
            return Err(api_error(envelope.code, envelope.msg.as_deref()));
        }
        Ok(envelope.data)
    }

    /// Collect every item of a paged list endpoint.
    async fn list_all<T: DeserializeOwned>(&self, token: &str, endpoint: &str, op: &'static str) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self.get(endpoint, token).query(&[("page_size", LIST_PAGE_SIZE)]);
            if let Some(ref pt) = page_token {
                request = request.query(&[("page_token", pt.as_str())]);
            }

            let Some(page) = self.call::<ListData<T>>(request, op).await? else {
                break;
            };
            items.extend(page.items);

            match page.page_token {
                Some(next) if page.has_more && !next.is_empty() && page_token.as_ref() != Some(&next) => {
                    page_token = Some(next)
                }
                _ => break,
            }
        }

        debug!(subsystem = "feishu", component = "client", op, item_count = items.len(), "Listed");
        Ok(items)
    }
}

fn check_status(response: Response, op: &'static str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    warn!(subsystem = "feishu", component = "client", op, status = status.as_u16(), "HTTP request failed");
    Err(Error::Request(
        format!(
            "HTTP请求失败: {} {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("")
        )
        .trim_end()
        .to_string(),
    ))
}

fn require<T>(data: Option<T>, op: &str) -> Result<T> {
    data.ok_or_else(|| Error::Serialization(format!("{} response has no data", op)))
}

fn app_path(app_token: &str) -> String {
    format!("/bitable/v1/apps/{}", app_token)
}

fn table_path(dest: &Destination, tail: &str) -> String {
    format!("/bitable/v1/apps/{}/tables/{}/{}", dest.app_token, dest.table_id, tail)
}

/// Image links on note pages are often protocol-relative.
fn absolute_image_url(url: &str) -> String {
    if url.starts_with("//") {
        format!("https:{}", url)
    } else {
        url.to_string()
    }
}

#[async_trait]
impl TableService for FeishuClient {
    #[instrument(skip_all, fields(subsystem = "feishu", component = "client", op = "authenticate"))]
    async fn authenticate(&self, app_id: &str, app_secret: &str) -> Result<String> {
        let response = self
            .client
            .post(self.url("/auth/v3/tenant_access_token/internal"))
            .json(&TokenRequest { app_id, app_secret })
            .send()
            .await?;
        let body: TokenResponse = check_status(response, "authenticate")?
            .json()
            .await
            .map_err(|e| Error::Serialization(format!("Invalid authenticate response: {}", e)))?;

        if body.code != 0 {
            warn!(api_code = body.code, "Token exchange rejected");
            return Err(api_error(body.code, body.msg.as_deref()));
        }

        let token = body
            .tenant_access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::Serialization("authenticate response has no tenant_access_token".into()))?;
        debug!(expire = body.expire, "Tenant access token obtained");
        Ok(token)
    }

    #[instrument(skip(self, token), fields(subsystem = "feishu", component = "client", op = "app_metadata"))]
    async fn app_metadata(&self, token: &str, app_token: &str) -> Result<AppMetadata> {
        let data: Option<AppData<AppMetadata>> = self.call(self.get(&app_path(app_token), token), "app_metadata").await?;
        Ok(require(data, "app_metadata")?.app)
    }

    #[instrument(skip(self, token), fields(subsystem = "feishu", component = "client", op = "update_app"))]
    async fn update_app(&self, token: &str, app_token: &str, update: &UpdateData) -> Result<AppMetadata> {
        let body = UpdateAppRequest {
            name: update.name.as_deref(),
            is_advanced: update.is_advanced,
        };
        let data: Option<AppData<AppMetadata>> = self
            .call(self.put(&app_path(app_token), token).json(&body), "update_app")
            .await?;
        Ok(require(data, "update_app")?.app)
    }

    #[instrument(skip(self, token), fields(subsystem = "feishu", component = "client", op = "create_app"))]
    async fn create_app(&self, token: &str, name: &str, time_zone: &str) -> Result<CreatedApp> {
        let data: Option<AppData<CreatedApp>> = self
            .call(
                self.post("/bitable/v1/apps", token).json(&CreateAppRequest { name, time_zone }),
                "create_app",
            )
            .await?;
        Ok(data.map(|d| d.app).unwrap_or_default())
    }

    #[instrument(skip(self, token), fields(subsystem = "feishu", component = "client", op = "list_tables"))]
    async fn list_tables(&self, token: &str, app_token: &str) -> Result<Vec<TableItem>> {
        self.list_all(token, &format!("{}/tables", app_path(app_token)), "list_tables")
            .await
    }

    #[instrument(skip(self, token), fields(subsystem = "feishu", component = "client", op = "list_fields"))]
    async fn list_fields(&self, token: &str, dest: &Destination) -> Result<Vec<FieldItem>> {
        self.list_all(token, &table_path(dest, "fields"), "list_fields").await
    }

    #[instrument(skip(self, token, dest), fields(subsystem = "feishu", component = "client", op = "create_field", field = %spec.name))]
    async fn create_field(&self, token: &str, dest: &Destination, spec: &ColumnSpec) -> Result<()> {
        let body = CreateFieldRequest {
            field_name: &spec.name,
            field_type: spec.field_type.code(),
            property: spec.property.clone(),
        };
        self.call::<Value>(self.post(&table_path(dest, "fields"), token).json(&body), "create_field")
            .await?;
        Ok(())
    }

    #[instrument(skip(self, token, dest), fields(subsystem = "feishu", component = "client", op = "search_record"))]
    async fn search_record(
        &self,
        token: &str,
        dest: &Destination,
        field_name: &str,
        value: &str,
    ) -> Result<Option<String>> {
        let data: Option<ListData<RecordItem>> = self
            .call(
                self.post(&table_path(dest, "records/search"), token)
                    .query(&[("page_size", "1")])
                    .json(&SearchRequest::field_is(field_name, value)),
                "search_record",
            )
            .await?;
        Ok(data.and_then(|d| d.items.into_iter().next()).map(|item| item.record_id))
    }

    #[instrument(skip(self, token, dest), fields(subsystem = "feishu", component = "client", op = "list_records"))]
    async fn list_record_ids(&self, token: &str, dest: &Destination) -> Result<Vec<String>> {
        let records: Vec<RecordItem> = self.list_all(token, &table_path(dest, "records"), "list_records").await?;
        Ok(records.into_iter().map(|r| r.record_id).collect())
    }

    #[instrument(skip_all, fields(subsystem = "feishu", component = "client", op = "batch_delete", item_count = record_ids.len()))]
    async fn batch_delete(&self, token: &str, dest: &Destination, record_ids: &[String]) -> Result<()> {
        for chunk in record_ids.chunks(BATCH_DELETE_LIMIT) {
            self.call::<Value>(
                self.post(&table_path(dest, "records/batch_delete"), token)
                    .json(&BatchDeleteRequest { records: chunk }),
                "batch_delete",
            )
            .await?;
        }
        Ok(())
    }

    #[instrument(skip_all, fields(subsystem = "feishu", component = "client", op = "create_record"))]
    async fn create_record(&self, token: &str, dest: &Destination, row: &Row) -> Result<String> {
        let data: Option<RecordData> = self
            .call(
                self.post(&table_path(dest, "records"), token).json(&RecordFields { fields: row }),
                "create_record",
            )
            .await?;
        Ok(data.map(|d| d.record.record_id).unwrap_or_default())
    }

    #[instrument(skip_all, fields(subsystem = "feishu", component = "client", op = "update_record", record_id = %record_id))]
    async fn update_record(&self, token: &str, dest: &Destination, record_id: &str, row: &Row) -> Result<()> {
        self.call::<Value>(
            self.put(&table_path(dest, &format!("records/{}", record_id)), token)
                .json(&RecordFields { fields: row }),
            "update_record",
        )
        .await?;
        Ok(())
    }

    #[instrument(skip(self, token), fields(subsystem = "feishu", component = "client", op = "upload_image"))]
    async fn upload_image(&self, token: &str, image_url: &str) -> Result<String> {
        let image = check_status(self.client.get(absolute_image_url(image_url)).send().await?, "download_image")?;
        let bytes = image.bytes().await?;

        let form = Form::new()
            .part("file", Part::bytes(bytes.to_vec()).file_name(UPLOAD_FILE_NAME))
            .text("file_type", "image");
        let data: Option<UploadedMedia> = self
            .call(self.post("/drive/v1/medias/upload_all", token).multipart(form), "upload_image")
            .await?;
        Ok(require(data, "upload_image")?.file_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = FeishuConfig::default();
        assert_eq!(config.base_url, "https://open.feishu.cn/open-apis");
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn test_url_joins_without_double_slash() {
        let client = FeishuClient::new(FeishuConfig::default().with_base_url("http://localhost:9/open-apis/")).unwrap();
        assert_eq!(
            client.url("/bitable/v1/apps/x"),
            "http://localhost:9/open-apis/bitable/v1/apps/x"
        );
    }

    #[test]
    fn test_table_path() {
        let dest = Destination {
            app_token: "app1".into(),
            table_id: "tbl1".into(),
        };
        assert_eq!(
            table_path(&dest, "records/search"),
            "/bitable/v1/apps/app1/tables/tbl1/records/search"
        );
    }

    #[test]
    fn test_protocol_relative_images() {
        assert_eq!(absolute_image_url("//cdn.example/a.jpg"), "https://cdn.example/a.jpg");
        assert_eq!(absolute_image_url("https://cdn.example/a.jpg"), "https://cdn.example/a.jpg");
    }
}
