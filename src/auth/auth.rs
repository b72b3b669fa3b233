use axum::{http::StatusCode, Json};
use crate::models::ErrorResponse;

pub const CLOUD_ADMIN_PRPL: &str = "r/Colabri-CloudAdmin";

pub fn is_cloud_admin(prpls: &[String]) -> bool {
    prpls.iter().any(|p| p == CLOUD_ADMIN_PRPL)
}

pub fn ensure_cloud_admin(prpls: &[String]) -> Result<String, (StatusCode, Json<ErrorResponse>)> {
    if is_cloud_admin(prpls) {
        return Ok(CLOUD_ADMIN_PRPL.to_string());
    }
    Err(ErrorResponse::reply(StatusCode::FORBIDDEN, "Cloud Admin access required"))
}
