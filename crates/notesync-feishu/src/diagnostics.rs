//! Connection diagnostics.
//!
//! Runs the same steps as a sync, one at a time, and reports each step's
//! status so a broken stage can be located. Halts at the first failure.

use serde::Serialize;
use tracing::{info, instrument, warn};

use notesync_core::SyncConfig;

use crate::destination::{parse_destination, INVALID_DESTINATION};
use crate::engine::TOKEN_FAILURE;
use crate::service::TableService;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Testing,
    Passed,
    Failed,
}

/// One diagnostic step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestStep {
    pub step: String,
    pub status: StepStatus,
    pub message: String,
}

/// Summary of the destination, reported when every step passes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableInfo {
    pub name: String,
    pub fields_count: usize,
    pub is_advanced: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionReport {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub test_results: Vec<TestStep>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_info: Option<TableInfo>,
}

impl ConnectionReport {
    fn new() -> Self {
        Self {
            success: false,
            message: None,
            error: None,
            test_results: Vec::new(),
            table_info: None,
        }
    }

    fn begin(&mut self, step: &str, message: &str) {
        self.test_results.push(TestStep {
            step: step.to_string(),
            status: StepStatus::Testing,
            message: message.to_string(),
        });
    }

    fn finish(&mut self, status: StepStatus, message: impl Into<String>) {
        if let Some(current) = self.test_results.last_mut() {
            current.status = status;
            current.message = message.into();
        }
    }

    fn pass(&mut self, message: impl Into<String>) {
        self.finish(StepStatus::Passed, message);
    }

    fn fail(mut self, message: impl Into<String>, error: impl Into<String>) -> Self {
        self.finish(StepStatus::Failed, message);
        let error = error.into();
        warn!(
            subsystem = "feishu",
            component = "diagnostics",
            step = self.test_results.last().map(|s| s.step.as_str()).unwrap_or(""),
            error = %error,
            "Connection test failed"
        );
        self.error = Some(error);
        self
    }

    /// The step that failed, if any.
    pub fn failed_step(&self) -> Option<&TestStep> {
        self.test_results.iter().find(|s| s.status == StepStatus::Failed)
    }
}

/// Run every diagnostic step in order.
#[instrument(skip_all, fields(subsystem = "feishu", component = "diagnostics", op = "test_connection"))]
pub async fn test_connection(service: &dyn TableService, config: &SyncConfig) -> ConnectionReport {
    let mut report = ConnectionReport::new();

    report.begin("配置验证", "检查配置完整性...");
    if !config.has_credentials() {
        return report.fail("配置不完整：缺少App ID或App Secret", "请先填写完整的App ID和App Secret");
    }
    if config.table_url.trim().is_empty() {
        return report.fail("配置不完整：缺少表格链接", "请先填写表格链接");
    }
    report.pass("配置完整性检查通过");

    report.begin("链接格式验证", "验证表格链接格式...");
    let dest = match parse_destination(&config.table_url) {
        Ok(dest) => dest,
        Err(_) => return report.fail("表格链接格式无效", INVALID_DESTINATION),
    };
    report.pass(format!("链接格式正确 (app_token: {}...)", dest.app_token_prefix()));

    report.begin("获取访问令牌", "正在获取飞书访问令牌...");
    let token = match service.authenticate(&config.app_id, &config.app_secret).await {
        Ok(token) => token,
        Err(e) => {
            warn!(error = %e, "Token exchange failed");
            return report.fail("获取访问令牌失败，请检查App ID和App Secret", TOKEN_FAILURE);
        }
    };
    report.pass("访问令牌获取成功");

    report.begin("表格访问测试", "测试多维表格访问权限...");
    let metadata = match service.app_metadata(&token, &dest.app_token).await {
        Ok(metadata) => metadata,
        Err(e) => {
            return report.fail(format!("表格访问失败: {}", e), format!("无法访问多维表格: {}", e))
        }
    };
    report.pass(format!("表格访问成功 ({})", metadata.name));

    report.begin("字段列表获取", "获取表格字段列表...");
    let fields = match service.list_fields(&token, &dest).await {
        Ok(fields) => fields,
        Err(e) => {
            return report.fail(format!("字段列表获取失败: {}", e), format!("无法获取字段列表: {}", e))
        }
    };
    report.pass(format!("字段列表获取成功 (共{}个字段)", fields.len()));

    info!(fields = fields.len(), "Connection test passed");
    report.success = true;
    report.message = Some("飞书连接测试全部通过，配置正确！".to_string());
    report.table_info = Some(TableInfo {
        name: metadata.name,
        fields_count: fields.len(),
        is_advanced: metadata.is_advanced,
    });
    report
}
