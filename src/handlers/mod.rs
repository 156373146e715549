pub mod auth;
pub mod entities;

use serde::de::DeserializeOwned;

use crate::http::request::InboundRequest;
use crate::http::response::Response;
use crate::storage::models::Session;
use crate::AppState;

/// Parse the JSON body of a request, or produce the error response.
///
/// A handler that needs a body answers 411 when none was sent and 400 when
/// it does not parse.
fn parse_json_body<T: DeserializeOwned>(request: &InboundRequest) -> Result<T, Response> {
    if request.body.is_empty() {
        return Err(Response::error(411, "Request body required"));
    }
    serde_json::from_slice(&request.body)
        .map_err(|_| Response::error(400, "Malformed JSON body"))
}

/// Auth gate. Every protected handler calls this before doing any work;
/// failure returns 401 without touching external collaborators. A successful
/// validation also renews the session's sliding expiry.
fn require_session(state: &AppState, request: &InboundRequest) -> Result<Session, Response> {
    let token = request.bearer_token.as_deref().unwrap_or("");
    match state.sessions.validate(token) {
        Ok(Some(session)) => Ok(session),
        Ok(None) => Err(Response::unauthorized()),
        Err(e) => {
            tracing::error!(error = %e, "Session validation failed against the store");
            Err(Response::internal_error())
        }
    }
}
