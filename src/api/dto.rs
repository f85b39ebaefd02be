//! Getwork wire DTOs.
//!
//! The getwork body shape is fixed by two decades of legacy miners: a
//! request whose `data` field is absent or null asks for work; a request
//! carrying `data` submits a solved share. Unknown fields (JSON-RPC `id`,
//! `method`, ...) are tolerated and ignored.

use serde::{Deserialize, Serialize};

use crate::domain::WorkTemplate;

/// Inbound getwork request body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GetworkRequest {
    /// Solved share hex, or `None` for a work fetch.
    #[serde(default)]
    pub data: Option<String>,
}

/// Outbound getwork fetch response body.
#[derive(Debug, Clone, Serialize)]
pub struct GetworkResponse {
    /// Hex-encoded block header data to hash.
    pub data: String,
    /// Hex-encoded share target.
    pub target: String,
}

impl From<WorkTemplate> for GetworkResponse {
    fn from(template: WorkTemplate) -> Self {
        Self {
            data: template.data,
            target: template.target,
        }
    }
}
