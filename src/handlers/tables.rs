//! Table metadata handlers: list descriptors, describe one, probe the connection.

use crate::descriptor::TableDescriptor;
use crate::error::AppError;
use crate::response::ConnectionStatus;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    Json,
};

pub async fn list_tables(
    State(state): State<AppState>,
) -> Result<Json<Vec<TableDescriptor>>, AppError> {
    Ok(Json(state.service.list_tables().await?))
}

pub async fn get_table(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<TableDescriptor>, AppError> {
    Ok(Json(state.service.describe_table(&name).await?))
}

pub async fn connection_test(State(state): State<AppState>) -> Json<ConnectionStatus> {
    Json(ConnectionStatus {
        connected: state.service.connection_test().await,
    })
}
