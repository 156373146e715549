//! Entity CRUD handlers.
//!
//! These are thin: the auth gate runs first, then the request is delegated
//! to the [`Directory`](crate::directory::Directory) collaborator and the
//! result is wrapped in the JSON envelope. Field validation lives on the
//! collaborator's side of the boundary.

use serde_json::json;

use super::require_session;
use crate::directory::{DirectoryError, Entity};
use crate::http::request::InboundRequest;
use crate::http::response::Response;
use crate::http::router::PathParams;
use crate::AppState;

fn entity_of(params: &PathParams) -> Result<Entity, Response> {
    params
        .entity
        .ok_or_else(|| Response::not_found("Route not found"))
}

fn directory_error(e: DirectoryError) -> Response {
    match e {
        DirectoryError::Rejected(reason) => Response::error(400, &reason),
        other => {
            tracing::error!(error = %other, "Directory operation failed");
            Response::internal_error()
        }
    }
}

pub fn list(state: &AppState, request: &InboundRequest, params: &PathParams) -> Response {
    if let Err(response) = require_session(state, request) {
        return response;
    }
    let entity = match entity_of(params) {
        Ok(entity) => entity,
        Err(response) => return response,
    };

    match state.directory.list_records(entity) {
        Ok(records) => Response::ok(json!({ entity.as_str(): records })),
        Err(e) => directory_error(e),
    }
}

pub fn create(state: &AppState, request: &InboundRequest, params: &PathParams) -> Response {
    if let Err(response) = require_session(state, request) {
        return response;
    }
    let entity = match entity_of(params) {
        Ok(entity) => entity,
        Err(response) => return response,
    };
    let fields: serde_json::Value = match super::parse_json_body(request) {
        Ok(fields) => fields,
        Err(response) => return response,
    };

    match state.directory.create_record(entity, fields) {
        Ok(record) => Response::created(record),
        Err(e) => directory_error(e),
    }
}

pub fn get(state: &AppState, request: &InboundRequest, params: &PathParams) -> Response {
    if let Err(response) = require_session(state, request) {
        return response;
    }
    let entity = match entity_of(params) {
        Ok(entity) => entity,
        Err(response) => return response,
    };
    let id = params.id.unwrap_or_default();

    match state.directory.get_record(entity, id) {
        Ok(Some(record)) => Response::ok(record),
        Ok(None) => Response::not_found("Record not found"),
        Err(e) => directory_error(e),
    }
}

pub fn update(state: &AppState, request: &InboundRequest, params: &PathParams) -> Response {
    if let Err(response) = require_session(state, request) {
        return response;
    }
    let entity = match entity_of(params) {
        Ok(entity) => entity,
        Err(response) => return response,
    };
    let id = params.id.unwrap_or_default();
    let fields: serde_json::Value = match super::parse_json_body(request) {
        Ok(fields) => fields,
        Err(response) => return response,
    };

    match state.directory.update_record(entity, id, fields) {
        Ok(Some(record)) => Response::ok(record),
        Ok(None) => Response::not_found("Record not found"),
        Err(e) => directory_error(e),
    }
}

pub fn delete(state: &AppState, request: &InboundRequest, params: &PathParams) -> Response {
    if let Err(response) = require_session(state, request) {
        return response;
    }
    let entity = match entity_of(params) {
        Ok(entity) => entity,
        Err(response) => return response,
    };
    let id = params.id.unwrap_or_default();

    match state.directory.delete_record(entity, id) {
        Ok(true) => Response::message("Record deleted"),
        Ok(false) => Response::not_found("Record not found"),
        Err(e) => directory_error(e),
    }
}

/// `GET /students/{id}/portfolio`. Portfolio entries owned by one student.
pub fn student_portfolio(
    state: &AppState,
    request: &InboundRequest,
    params: &PathParams,
) -> Response {
    if let Err(response) = require_session(state, request) {
        return response;
    }
    let student_id = params.id.unwrap_or_default();

    match state.directory.list_records(Entity::Portfolio) {
        Ok(records) => {
            let entries: Vec<serde_json::Value> = records
                .into_iter()
                .filter(|r| r["studentId"] == json!(student_id))
                .collect();
            Response::ok(json!({ "portfolio": entries }))
        }
        Err(e) => directory_error(e),
    }
}
