//! Destination provisioning and metadata updates.

use std::time::Duration;

use serde::Serialize;
use tracing::{info, instrument, warn};

use notesync_core::defaults::{PROVISIONED_APP_NAME, PROVISIONED_TIME_ZONE};
use notesync_core::{Error, Result, SyncConfig, SyncResponse};

use crate::destination::{parse_destination, Destination};
use crate::engine::TOKEN_FAILURE;
use crate::schema::{column_spec, COLUMNS};
use crate::service::TableService;
use crate::types::UpdateData;

const MISSING_CREDENTIALS: &str = "请先填写App ID和App Secret";
const MISSING_TABLE_URL: &str = "请先填写表格链接";
const MALFORMED_TABLE_URL: &str = "表格链接格式不正确，请检查链接是否为有效的飞书多维表格链接";

/// A freshly provisioned destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionedTable {
    pub table_url: String,
    pub app_token: String,
    pub table_id: String,
    pub fields_created: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTableResponse {
    pub success: bool,
    #[serde(flatten)]
    pub table: Option<ProvisionedTable>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<Result<ProvisionedTable>> for CreateTableResponse {
    fn from(result: Result<ProvisionedTable>) -> Self {
        match result {
            Ok(table) => Self {
                success: true,
                table: Some(table),
                message: Some("多维表格创建成功！".to_string()),
                error: None,
            },
            Err(e) => Self {
                success: false,
                table: None,
                message: None,
                error: Some(e.to_string()),
            },
        }
    }
}

/// Create a new app with the full column set.
#[instrument(skip_all, fields(subsystem = "feishu", component = "provision", op = "create_table"))]
pub async fn create_table(service: &dyn TableService, config: &SyncConfig, field_delay: Duration) -> CreateTableResponse {
    let result = provision(service, config, field_delay).await;
    if let Err(ref e) = result {
        warn!(error = %e, "Provisioning failed");
    }
    result.into()
}

async fn provision(service: &dyn TableService, config: &SyncConfig, field_delay: Duration) -> Result<ProvisionedTable> {
    if !config.has_credentials() {
        return Err(Error::Validation(MISSING_CREDENTIALS.into()));
    }
    let token = authenticate(service, config).await?;

    let app = service
        .create_app(&token, PROVISIONED_APP_NAME, PROVISIONED_TIME_ZONE)
        .await?;
    if app.app_token.is_empty() {
        return Err(Error::Validation("多维表格响应数据格式错误，缺少app_token".into()));
    }

    let table_id = match app.default_table_id.filter(|id| !id.is_empty()) {
        Some(id) => id,
        None => service
            .list_tables(&token, &app.app_token)
            .await?
            .into_iter()
            .next()
            .map(|t| t.table_id)
            .ok_or_else(|| Error::Validation("多维表格中没有找到表格".into()))?,
    };

    let dest = Destination {
        app_token: app.app_token.clone(),
        table_id: table_id.clone(),
    };

    let mut created = 0;
    for (name, _) in COLUMNS {
        let spec = column_spec(name);
        match service.create_field(&token, &dest, &spec).await {
            Ok(()) => created += 1,
            Err(e) => warn!(field = %name, error = %e, "Column not provisioned"),
        }
        tokio::time::sleep(field_delay).await;
    }

    info!(
        app_token = dest.app_token_prefix(),
        table_id = %table_id,
        item_count = created,
        "Destination provisioned"
    );

    Ok(ProvisionedTable {
        table_url: format!("{}?table={}", app.url, table_id),
        app_token: app.app_token,
        table_id,
        fields_created: created,
    })
}

/// Apply `update` to the configured destination's metadata.
///
/// An empty update succeeds without contacting the service.
#[instrument(skip_all, fields(subsystem = "feishu", component = "provision", op = "update_table"))]
pub async fn update_table(service: &dyn TableService, config: &SyncConfig, update: &UpdateData) -> SyncResponse {
    match apply_update(service, config, update).await {
        Ok(()) => SyncResponse::ok("多维表格更新成功！"),
        Err(e) => {
            warn!(error = %e, "Metadata update failed");
            e.into()
        }
    }
}

async fn apply_update(service: &dyn TableService, config: &SyncConfig, update: &UpdateData) -> Result<()> {
    if !config.has_credentials() {
        return Err(Error::Validation(MISSING_CREDENTIALS.into()));
    }
    if config.table_url.trim().is_empty() {
        return Err(Error::Validation(MISSING_TABLE_URL.into()));
    }
    let dest = parse_destination(&config.table_url).map_err(|_| Error::Validation(MALFORMED_TABLE_URL.into()))?;
    let token = authenticate(service, config).await?;

    if update.is_empty() {
        info!("Nothing to update");
        return Ok(());
    }

    let app = service.update_app(&token, &dest.app_token, update).await?;
    info!(name = %app.name, is_advanced = app.is_advanced, "Destination metadata updated");
    Ok(())
}

async fn authenticate(service: &dyn TableService, config: &SyncConfig) -> Result<String> {
    service
        .authenticate(&config.app_id, &config.app_secret)
        .await
        .map_err(|e| {
            warn!(error = %e, "Token exchange failed");
            Error::Validation(TOKEN_FAILURE.into())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_response_flattens_table() {
        let response: CreateTableResponse = Ok(ProvisionedTable {
            table_url: "https://acme.feishu.cn/base/app1?table=tbl1".into(),
            app_token: "app1".into(),
            table_id: "tbl1".into(),
            fields_created: 29,
        })
        .into();

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["success"], json!(true));
        assert_eq!(value["tableUrl"], json!("https://acme.feishu.cn/base/app1?table=tbl1"));
        assert_eq!(value["appToken"], json!("app1"));
        assert_eq!(value["message"], json!("多维表格创建成功！"));
    }

    #[test]
    fn test_failure_response_has_error_only() {
        let response: CreateTableResponse = Err(Error::Validation(MISSING_CREDENTIALS.into())).into();
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value, json!({"success": false, "error": "请先填写App ID和App Secret"}));
    }
}
