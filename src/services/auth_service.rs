use axum::http::{header, HeaderMap};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation, TokenData};
use tracing::info;

/// Authenticated caller, taken from a verified bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub username: Option<String>,
    pub roles: Vec<String>,
}

impl Identity {
    /// Principals used for access checks: `u/<id>` plus one `r/<role>` per role.
    pub fn principals(&self) -> Vec<String> {
        let mut prpls = vec![format!("u/{}", self.user_id)];
        for role in &self.roles {
            let role_prpl = format!("r/{}", role);
            if !prpls.contains(&role_prpl) {
                prpls.push(role_prpl);
            }
        }
        prpls
    }
}

// Get the auth token from request headers
pub fn get_auth_token(headers: &HeaderMap) -> Result<String, String> {
    // 1. Try to get token from Authorization header
    if let Some(auth_header) = headers.get(header::AUTHORIZATION) {
        let auth_str = auth_header.to_str().map_err(|_| "Invalid Authorization header".to_string())?;
        Ok(auth_str
            .strip_prefix("Bearer ")
            .unwrap_or(auth_str)
            .to_string())
    }
    // 2. Try to get token from cookies
    else {
        let cookie_header = headers.get(header::COOKIE)
            .ok_or_else(|| "Missing Authorization header or Cookie".to_string())?
            .to_str()
            .map_err(|_| "Invalid Cookie header".to_string())?;

        for cookie in cookie::Cookie::split_parse(cookie_header).flatten() {
            if cookie.name() == "auth_token" {
                return Ok(cookie.value().to_string());
            }
        }
        Err("auth_token cookie not found".to_string())
    }
}

// Turn a bearer token into an identity
pub fn identity_from_token(token: &str, secret: &str) -> Result<Identity, String> {
    let token_data = validate_jwt(token, secret).map_err(|e| format!("JWT validation failed: {}", e))?;
    let claims = &token_data.claims;

    let user_id = claims
        .get("sub")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| "Can't extract a UID from the JWT token".to_string())?
        .to_string();

    let username = claims
        .get("name")
        .or_else(|| claims.get("username"))
        .and_then(|v| v.as_str())
        .map(str::to_string);

    let roles = match claims.get("roles").and_then(|v| v.as_array()) {
        Some(roles_array) => roles_array.iter().filter_map(|r| r.as_str().map(|s| s.to_string())).collect::<Vec<String>>(),
        None => Vec::new(),
    };

    info!("JWT token validated successfully for user: {}", user_id);
    Ok(Identity { user_id, username, roles })
}

// Validate a JWT token and return the token data
pub fn validate_jwt(token: &str, secret: &str) -> Result<TokenData<serde_json::Value>, jsonwebtoken::errors::Error> {
    let validation = Validation::new(Algorithm::HS256);
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    decode::<serde_json::Value>(token, &decoding_key, &validation)
}
