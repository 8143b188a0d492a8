use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use service_core::grpc::{proto, struct_to_json};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub entity_id: String,
    pub data: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl From<proto::Record> for Record {
    fn from(r: proto::Record) -> Self {
        Self {
            id: r.id,
            entity_id: r.entity_id,
            data: r.data.as_ref().map(struct_to_json).unwrap_or_default(),
            created_at: Some(r.created_at).filter(|s| !s.is_empty()),
            updated_at: Some(r.updated_at).filter(|s| !s.is_empty()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordPage {
    pub data: Vec<Record>,
    pub total_count: i32,
    pub page: i32,
    pub limit: i32,
}

impl From<proto::QueryResponse> for RecordPage {
    fn from(r: proto::QueryResponse) -> Self {
        Self {
            data: r.data.into_iter().map(Record::from).collect(),
            total_count: r.total_count,
            page: r.page,
            limit: r.limit,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueryFilter {
    pub field: String,
    pub operator: String,
    #[serde(default)]
    pub value: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuerySort {
    pub field: String,
    #[serde(default)]
    pub desc: bool,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct QueryPagination {
    pub page: i32,
    pub limit: i32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecordQuery {
    #[serde(default)]
    pub filters: Vec<QueryFilter>,
    pub sort: Option<QuerySort>,
    pub pagination: Option<QueryPagination>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteOutcome {
    pub success: bool,
    pub message: String,
}
