use axum::http::Uri;

/// Query parameters whose values never reach the logs.
const SECRET_PARAMS: &[&str] = &["token", "access_token"];

/// Path and query of `uri` with credential parameters masked.
pub fn redact_uri(uri: &Uri) -> String {
    let Some(query) = uri.query() else {
        return uri.path().to_string();
    };

    let pairs: Vec<String> = query
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((key, _)) if SECRET_PARAMS.iter().any(|p| key.eq_ignore_ascii_case(p)) => {
                format!("{}=REDACTED", key)
            }
            _ => pair.to_string(),
        })
        .collect();

    format!("{}?{}", uri.path(), pairs.join("&"))
}
