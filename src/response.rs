//! Wire shapes for the records API.

use serde::Serialize;
use serde_json::Value;

/// One page of records plus pagination bookkeeping.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPage {
    pub data: Vec<Value>,
    pub total: i64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: i64,
}

#[derive(Serialize)]
pub struct DeleteOutcome {
    pub message: String,
}

#[derive(Serialize)]
pub struct ConnectionStatus {
    pub connected: bool,
}
