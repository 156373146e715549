//! Account and session handlers.

use serde::Deserialize;
use serde_json::json;

use super::{parse_json_body, require_session};
use crate::device;
use crate::directory::DirectoryError;
use crate::http::request::InboundRequest;
use crate::http::response::Response;
use crate::http::router::PathParams;
use crate::session::generator::generate_token;
use crate::storage::models::{ResetToken, Session};
use crate::AppState;

// ============================================================================
// Request types
// ============================================================================

#[derive(Debug, Deserialize)]
struct RegisterRequest {
    email: String,
    name: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct VerifyTokenRequest {
    token: String,
}

#[derive(Debug, Deserialize)]
struct ChangePasswordRequest {
    current_password: String,
    new_password: String,
}

#[derive(Debug, Deserialize)]
struct RequestResetRequest {
    email: String,
}

#[derive(Debug, Deserialize)]
struct ResetPasswordRequest {
    new_password: String,
    token: String,
}

// ============================================================================
// Open handlers
// ============================================================================

pub fn register(state: &AppState, request: &InboundRequest, _params: &PathParams) -> Response {
    let body: RegisterRequest = match parse_json_body(request) {
        Ok(body) => body,
        Err(response) => return response,
    };

    match state
        .directory
        .register(&body.email, &body.password, &body.name)
    {
        Ok(account) => {
            tracing::info!(user_id = account.id, "Registered user");
            Response::created(json!({
                "id": account.id,
                "email": account.email,
                "name": account.name,
            }))
        }
        Err(DirectoryError::EmailTaken) => Response::error(400, "Email already registered"),
        Err(DirectoryError::Rejected(reason)) => Response::error(400, &reason),
        Err(e) => {
            tracing::error!(error = %e, "Registration failed");
            Response::internal_error()
        }
    }
}

pub fn login(state: &AppState, request: &InboundRequest, _params: &PathParams) -> Response {
    let body: LoginRequest = match parse_json_body(request) {
        Ok(body) => body,
        Err(response) => return response,
    };

    let account = match state.directory.authenticate(&body.email, &body.password) {
        Ok(Some(account)) => account,
        Ok(None) => return Response::error(401, "Invalid credentials"),
        Err(e) => {
            tracing::error!(error = %e, "Credential check failed");
            return Response::internal_error();
        }
    };

    let client_os = device::client_os(request.header("user-agent"));
    match state
        .sessions
        .create(account.id, &account.email, &request.source_ip, &client_os)
    {
        Ok(session) => Response::ok(json!({
            "token": session.token,
            "user": {
                "id": account.id,
                "email": account.email,
                "name": account.name,
            },
        })),
        Err(e) => {
            tracing::error!(error = %e, "Failed to persist session");
            Response::internal_error()
        }
    }
}

/// Open endpoint. The token comes from the bearer header, with the request
/// body as a documented fallback for clients that cannot set headers.
pub fn verify_token(state: &AppState, request: &InboundRequest, _params: &PathParams) -> Response {
    let token = match &request.bearer_token {
        Some(token) => token.clone(),
        None => match parse_json_body::<VerifyTokenRequest>(request) {
            Ok(body) => body.token,
            Err(_) => return Response::unauthorized(),
        },
    };

    match state.sessions.validate(&token) {
        Ok(Some(session)) => Response::ok(json!({
            "valid": true,
            "userId": session.user_id,
            "email": session.email,
        })),
        Ok(None) => Response::unauthorized(),
        Err(e) => {
            tracing::error!(error = %e, "Token verification failed against the store");
            Response::internal_error()
        }
    }
}

pub fn request_reset(state: &AppState, request: &InboundRequest, _params: &PathParams) -> Response {
    let body: RequestResetRequest = match parse_json_body(request) {
        Ok(body) => body,
        Err(response) => return response,
    };

    let now = state.sessions.now();
    state.reset_tokens.drop_expired(now);

    let account = match state.directory.user_by_email(&body.email) {
        Ok(Some(account)) => account,
        Ok(None) => return Response::not_found("Unknown email"),
        Err(e) => {
            tracing::error!(error = %e, "Reset lookup failed");
            return Response::internal_error();
        }
    };

    let token = generate_token();
    state.reset_tokens.insert(ResetToken {
        created_at: now,
        email: account.email.clone(),
        token: token.clone(),
    });
    tracing::info!(user_id = account.id, "Issued password reset token");

    Response::ok(json!({ "resetToken": token }))
}

pub fn reset_password(state: &AppState, request: &InboundRequest, _params: &PathParams) -> Response {
    let body: ResetPasswordRequest = match parse_json_body(request) {
        Ok(body) => body,
        Err(response) => return response,
    };

    // Consumed here on first redemption, valid or not
    let now = state.sessions.now();
    let Some(reset) = state.reset_tokens.take(&body.token, now) else {
        return Response::error(400, "Invalid or expired reset token");
    };

    let account = match state.directory.user_by_email(&reset.email) {
        Ok(Some(account)) => account,
        Ok(None) => return Response::error(400, "Invalid or expired reset token"),
        Err(e) => {
            tracing::error!(error = %e, "Reset lookup failed");
            return Response::internal_error();
        }
    };

    if let Err(e) = state.directory.change_password(account.id, &body.new_password) {
        tracing::error!(error = %e, "Password reset failed");
        return Response::internal_error();
    }

    if let Err(e) = state.sessions.revoke_all_for_user(account.id, None) {
        tracing::error!(error = %e, "Failed to revoke sessions after reset");
        return Response::internal_error();
    }

    Response::message("Password reset")
}

// ============================================================================
// Auth-gated handlers
// ============================================================================

pub fn logout(state: &AppState, request: &InboundRequest, _params: &PathParams) -> Response {
    let session = match require_session(state, request) {
        Ok(session) => session,
        Err(response) => return response,
    };

    match state.sessions.revoke(&session.token) {
        Ok(_) => Response::message("Logged out"),
        Err(e) => {
            tracing::error!(error = %e, "Logout failed");
            Response::internal_error()
        }
    }
}

pub fn session_info(state: &AppState, request: &InboundRequest, _params: &PathParams) -> Response {
    let session = match require_session(state, request) {
        Ok(session) => session,
        Err(response) => return response,
    };

    Response::ok(session_json(&session))
}

pub fn list_sessions(state: &AppState, request: &InboundRequest, _params: &PathParams) -> Response {
    let current = match require_session(state, request) {
        Ok(session) => session,
        Err(response) => return response,
    };

    let mut sessions = state.sessions.sessions_for_user(current.user_id);
    sessions.sort_by_key(|s| s.created_at);

    let items: Vec<serde_json::Value> = sessions
        .iter()
        .map(|s| {
            let mut item = session_json(s);
            item["current"] = json!(s.token == current.token);
            item["token"] = json!(s.token);
            item
        })
        .collect();

    Response::ok(json!({ "sessions": items }))
}

/// `DELETE /sessions/{token}`. A user may revoke only their own sessions.
pub fn revoke_session(state: &AppState, request: &InboundRequest, params: &PathParams) -> Response {
    let current = match require_session(state, request) {
        Ok(session) => session,
        Err(response) => return response,
    };

    let Some(target_token) = params.token.as_deref() else {
        return Response::not_found("Session not found");
    };

    let target = match state.sessions.peek(target_token) {
        Ok(Some(target)) => target,
        Ok(None) => return Response::not_found("Session not found"),
        Err(e) => {
            tracing::error!(error = %e, "Session lookup failed");
            return Response::internal_error();
        }
    };

    if target.user_id != current.user_id {
        return Response::forbidden();
    }

    match state.sessions.revoke(target_token) {
        Ok(_) => Response::message("Session revoked"),
        Err(e) => {
            tracing::error!(error = %e, "Session revocation failed");
            Response::internal_error()
        }
    }
}

/// `PUT /password`. Changes the password and destroys every other session of
/// the user, keeping only the one making the change.
pub fn change_password(
    state: &AppState,
    request: &InboundRequest,
    _params: &PathParams,
) -> Response {
    let session = match require_session(state, request) {
        Ok(session) => session,
        Err(response) => return response,
    };

    let body: ChangePasswordRequest = match parse_json_body(request) {
        Ok(body) => body,
        Err(response) => return response,
    };

    match state
        .directory
        .authenticate(&session.email, &body.current_password)
    {
        Ok(Some(_)) => {}
        Ok(None) => return Response::error(403, "Current password is incorrect"),
        Err(e) => {
            tracing::error!(error = %e, "Credential check failed");
            return Response::internal_error();
        }
    }

    if let Err(e) = state
        .directory
        .change_password(session.user_id, &body.new_password)
    {
        tracing::error!(error = %e, "Password change failed");
        return Response::internal_error();
    }

    match state
        .sessions
        .revoke_all_for_user(session.user_id, Some(&session.token))
    {
        Ok(revoked) => {
            tracing::info!(user_id = session.user_id, revoked, "Password changed");
            Response::message("Password changed")
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to revoke sessions after password change");
            Response::internal_error()
        }
    }
}

fn session_json(session: &Session) -> serde_json::Value {
    json!({
        "userId": session.user_id,
        "email": session.email,
        "ipAddress": session.ip_address,
        "clientOs": session.client_os,
        "createdAt": session.created_at.to_rfc3339(),
        "lastActivity": session.last_activity.to_rfc3339(),
        "expiresAt": session.expires_at.to_rfc3339(),
    })
}
