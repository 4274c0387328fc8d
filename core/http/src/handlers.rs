//! Request handlers.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

use keebridge_app::api::{
    CredentialRequest, Envelope, MessageResponse, SearchRequest, SearchResponse, UnlockRequest,
    UnlockResponse,
};
use keebridge_app::VaultService;
use keebridge_common::{Error, Result};

/// State shared by every handler.
pub type AppState = Arc<VaultService>;

type JsonBody<T> = std::result::Result<Json<T>, JsonRejection>;

/// HTTP status for a service error.
pub fn status_for(error: &Error) -> StatusCode {
    match error {
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::Auth(_) | Error::Locked => StatusCode::UNAUTHORIZED,
        Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
        Error::ReloadFailure(_)
        | Error::Crypto(_)
        | Error::Io(_)
        | Error::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn respond<T: Serialize>(result: Result<T>) -> Response {
    match result {
        Ok(data) => (StatusCode::OK, Json(Envelope::ok(data))).into_response(),
        Err(e) => {
            let status = status_for(&e);
            if status.is_server_error() {
                warn!("Request failed: {}", e);
            }
            (status, Json(Envelope::<()>::failure(e))).into_response()
        }
    }
}

// Malformed bodies get the same envelope as every other error.
fn parse<T>(body: JsonBody<T>) -> Result<T> {
    body.map(|Json(value)| value)
        .map_err(|rejection| Error::InvalidInput(rejection.body_text()))
}

pub async fn unlock(State(service): State<AppState>, body: JsonBody<UnlockRequest>) -> Response {
    respond(open_vault(&service, body).await)
}

async fn open_vault(service: &VaultService, body: JsonBody<UnlockRequest>) -> Result<UnlockResponse> {
    let request = parse(body)?;
    request.validate()?;

    let path = request.vault_path(service.config());
    service
        .unlock(path.clone(), &request.password, request.keyfile_path())
        .await?;

    Ok(UnlockResponse {
        message: "Database unlocked successfully".to_string(),
        db_path: path.display().to_string(),
    })
}

pub async fn lock(State(service): State<AppState>) -> Response {
    service.lock().await;
    respond(Ok(MessageResponse::new("Database locked")))
}

pub async fn status(State(service): State<AppState>) -> Response {
    respond(Ok(service.status().await))
}

pub async fn search(State(service): State<AppState>, body: JsonBody<SearchRequest>) -> Response {
    respond(find_entries(&service, body).await)
}

async fn find_entries(service: &VaultService, body: JsonBody<SearchRequest>) -> Result<SearchResponse> {
    let request = parse(body)?;
    request.validate()?;
    let entries = service.search(&request.url).await?;
    Ok(SearchResponse { entries })
}

pub async fn get_credentials(
    State(service): State<AppState>,
    body: JsonBody<CredentialRequest>,
) -> Response {
    let result = match parse(body) {
        Ok(request) => service.fetch_credential(&request.uuid).await,
        Err(e) => Err(e),
    };
    respond(result)
}

pub async fn force_reload(State(service): State<AppState>) -> Response {
    let result = service
        .force_reload()
        .await
        .map(|()| MessageResponse::new("Database reloaded"));
    respond(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(&Error::NotFound("x".into())), StatusCode::NOT_FOUND);
        assert_eq!(status_for(&Error::Auth("x".into())), StatusCode::UNAUTHORIZED);
        assert_eq!(status_for(&Error::Locked), StatusCode::UNAUTHORIZED);
        assert_eq!(status_for(&Error::InvalidInput("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_for(&Error::ReloadFailure("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
