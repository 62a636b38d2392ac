//! RFC 9457 bodies for faults outside the resource contract.
//!
//! Validation, not-found and method errors keep their plain JSON / empty
//! bodies; only storage and serialization faults are reported this way.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

pub const APPLICATION_PROBLEM_JSON: &str = "application/problem+json";

/// What broke while serving a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fault {
    /// The collection provider failed (storage error, constraint violation).
    Provider,
    /// A record could not be rendered through the descriptor's fields.
    Serialization,
}

impl Fault {
    pub fn code(self) -> &'static str {
        match self {
            Fault::Provider => "PROVIDER_FAILURE",
            Fault::Serialization => "SERIALIZATION_FAILURE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Problem {
    #[serde(rename = "type")]
    pub type_url: String,
    pub title: String,
    pub status: u16,
    pub detail: String,
    /// Resource the fault happened on.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub instance: String,
    pub code: String,
}

impl Problem {
    /// 500 problem for a fault on `resource`. The detail never carries the
    /// underlying error; that goes to the log.
    pub fn fault(fault: Fault, resource: &str) -> Self {
        Self {
            type_url: "about:blank".to_string(),
            title: "Internal Server Error".to_string(),
            status: StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
            detail: format!("failed to serve resource `{resource}`"),
            instance: resource.to_string(),
            code: fault.code().to_string(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

/// Renders a [`Problem`] with its status and the problem content type.
#[derive(Debug, Clone)]
pub struct ProblemResponse(pub Problem);

impl IntoResponse for ProblemResponse {
    fn into_response(self) -> Response {
        (
            self.0.status_code(),
            [(header::CONTENT_TYPE, APPLICATION_PROBLEM_JSON)],
            Json(self.0),
        )
            .into_response()
    }
}
