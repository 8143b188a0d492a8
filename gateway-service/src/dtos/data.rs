use serde::Deserialize;
use serde_json::{Map, Value};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct RecordDataRequest {
    pub data: Map<String, Value>,
}
