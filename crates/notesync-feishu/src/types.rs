//! Table-service request and response types.
//!
//! Every response shares the envelope `{code, msg?, data?}`; `code == 0`
//! is success. Only the fields notesync reads are modelled.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A projected destination row: column name to cell value.
pub type Row = Map<String, Value>;

// =============================================================================
// ENVELOPE
// =============================================================================

/// Common response envelope.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub code: i64,
    #[serde(default)]
    pub msg: Option<String>,
    pub data: Option<T>,
}

/// Paged list payload.
#[derive(Debug, Deserialize)]
pub struct ListData<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub page_token: Option<String>,
    #[serde(default)]
    pub total: Option<u64>,
}

// =============================================================================
// AUTH
// =============================================================================

#[derive(Debug, Serialize)]
pub struct TokenRequest<'a> {
    pub app_id: &'a str,
    pub app_secret: &'a str,
}

/// The token endpoint puts its payload at the top level, not under `data`.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub code: i64,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub tenant_access_token: Option<String>,
    #[serde(default)]
    pub expire: Option<i64>,
}

// =============================================================================
// APPS AND TABLES
// =============================================================================

/// Bitable app metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppMetadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub revision: i64,
    #[serde(default)]
    pub is_advanced: bool,
}

#[derive(Debug, Deserialize)]
pub struct AppData<T> {
    pub app: T,
}

/// Changes to apply to app metadata; absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_advanced: Option<bool>,
}

impl UpdateData {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.is_advanced.is_none()
    }
}

#[derive(Debug, Serialize)]
pub struct UpdateAppRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_advanced: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct CreateAppRequest<'a> {
    pub name: &'a str,
    pub time_zone: &'a str,
}

/// App returned by the create endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreatedApp {
    #[serde(default)]
    pub app_token: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub default_table_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TableItem {
    pub table_id: String,
    #[serde(default)]
    pub name: Option<String>,
}

// =============================================================================
// FIELDS
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct FieldItem {
    pub field_name: String,
    #[serde(default)]
    pub field_id: Option<String>,
    #[serde(default, rename = "type")]
    pub field_type: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct CreateFieldRequest<'a> {
    pub field_name: &'a str,
    #[serde(rename = "type")]
    pub field_type: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property: Option<Value>,
}

// =============================================================================
// RECORDS
// =============================================================================

#[derive(Debug, Serialize)]
pub struct RecordFields<'a> {
    pub fields: &'a Row,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordItem {
    pub record_id: String,
    #[serde(default)]
    pub fields: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct RecordData {
    pub record: RecordItem,
}

#[derive(Debug, Serialize)]
pub struct SearchRequest<'a> {
    pub filter: SearchFilter<'a>,
}

#[derive(Debug, Serialize)]
pub struct SearchFilter<'a> {
    pub conditions: Vec<SearchCondition<'a>>,
}

#[derive(Debug, Serialize)]
pub struct SearchCondition<'a> {
    pub field_name: &'a str,
    pub operator: &'static str,
    pub value: Vec<&'a str>,
}

impl<'a> SearchRequest<'a> {
    /// Exact match on one column.
    pub fn field_is(field_name: &'a str, value: &'a str) -> Self {
        Self {
            filter: SearchFilter {
                conditions: vec![SearchCondition {
                    field_name,
                    operator: "is",
                    value: vec![value],
                }],
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BatchDeleteRequest<'a> {
    pub records: &'a [String],
}

// =============================================================================
// MEDIA
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct UploadedMedia {
    pub file_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_without_data() {
        let env: Envelope<AppData<AppMetadata>> =
            serde_json::from_value(json!({"code": 1254040, "msg": "AppTokenNotFound"})).unwrap();
        assert_eq!(env.code, 1254040);
        assert!(env.data.is_none());
    }

    #[test]
    fn test_list_page_items_default_to_empty() {
        let page: ListData<FieldItem> =
            serde_json::from_value(json!({"has_more": false})).unwrap();
        assert!(page.items.is_empty());

        let page: ListData<FieldItem> = serde_json::from_value(json!({
            "items": [{"field_name": "笔记ID", "type": 1}],
            "has_more": true,
            "page_token": "p2"
        }))
        .unwrap();
        assert_eq!(page.items[0].field_name, "笔记ID");
        assert_eq!(page.page_token.as_deref(), Some("p2"));
    }

    #[test]
    fn test_search_request_shape() {
        let body = serde_json::to_value(SearchRequest::field_is("笔记ID", "abc")).unwrap();
        assert_eq!(
            body,
            json!({"filter": {"conditions": [{"field_name": "笔记ID", "operator": "is", "value": ["abc"]}]}})
        );
    }

    #[test]
    fn test_create_field_omits_null_property() {
        let body = serde_json::to_value(CreateFieldRequest {
            field_name: "发布时间",
            field_type: 5,
            property: None,
        })
        .unwrap();
        assert_eq!(body, json!({"field_name": "发布时间", "type": 5}));
    }

    #[test]
    fn test_update_data_camel_case() {
        let update: UpdateData = serde_json::from_value(json!({"isAdvanced": true})).unwrap();
        assert_eq!(update.is_advanced, Some(true));
        assert!(!update.is_empty());
        assert!(UpdateData::default().is_empty());
    }
}
