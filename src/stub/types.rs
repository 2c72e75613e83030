//! Remote record shapes and stub errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::net::ConnectionError;
use crate::session::SessionError;
use crate::stub::login::LoginError;

/// Errors raised while preparing a stub.
#[derive(Debug, Error)]
pub enum StubError {
    #[error("Login failed: {0}")]
    Login(#[from] LoginError),

    #[error("Login returned an unusable session: {0}")]
    Session(#[from] SessionError),

    /// The connection handle could not be built from a valid session.
    #[error("Failed to instantiate connection, user: {username}")]
    Setup {
        username: String,
        #[source]
        source: ConnectionError,
    },
}

/// A remote record: its type, optional id and arbitrary fields.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SObject {
    #[serde(rename = "type")]
    pub object_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl SObject {
    pub fn new(object_type: impl Into<String>) -> Self {
        Self {
            object_type: object_type.into(),
            id: None,
            fields: serde_json::Map::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }
}

/// One page of query results.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub done: bool,
    /// Cursor for `query_more` when `done` is false.
    #[serde(default)]
    pub query_locator: Option<String>,
    #[serde(default)]
    pub records: Vec<SObject>,
    #[serde(default)]
    pub size: u32,
}

/// Per-record error reported by create/update/delete.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    pub status_code: String,
    pub message: String,
    #[serde(default)]
    pub fields: Vec<String>,
}

/// Outcome of creating or updating one record.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SaveResult {
    #[serde(default)]
    pub id: Option<String>,
    pub success: bool,
    #[serde(default)]
    pub errors: Vec<ApiError>,
}

/// Outcome of deleting one record.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DeleteResult {
    #[serde(default)]
    pub id: Option<String>,
    pub success: bool,
    #[serde(default)]
    pub errors: Vec<ApiError>,
}
