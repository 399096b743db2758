/// Data Transfer Objects (DTOs) for REST API endpoints
use serde::{Deserialize, Serialize};

/// Response DTO for the ping endpoint
#[derive(Debug, Deserialize, Serialize)]
pub struct PingResponse {
    pub status: bool,
}

/// Generic success response
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuccessResponse {
    /// Success flag
    pub success: bool,

    /// Response message
    pub message: String,
}
