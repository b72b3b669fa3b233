use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{DocumentRecord, DocumentUpdate, WhoAmI};
use crate::services::doc_store::StoreError;

/// HTTP client for the external document service.
///
/// The hub uses it with a self-issued service token to load and save room
/// snapshots; editor clients use it with the user's bearer token to fetch the
/// record that seeds a session.
#[derive(Debug, Clone)]
pub struct DocServiceClient {
    client: Client,
    base_url: String,
    documents_path: String,
    whoami_path: String,
    auth: ClientAuth,
}

#[derive(Debug, Clone)]
enum ClientAuth {
    None,
    Bearer(String),
    Service { jwt_secret: String, service_name: String },
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    #[serde(rename = "type")]
    type_: String,
    exp: usize,
}

impl DocServiceClient {
    pub fn new(base_url: impl Into<String>, timeout: std::time::Duration) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(StoreError::Http)?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            documents_path: "/api/documents".to_string(),
            whoami_path: "/v1/me".to_string(),
            auth: ClientAuth::None,
        })
    }

    pub fn with_documents_path(mut self, path: impl Into<String>) -> Self {
        self.documents_path = path.into();
        self
    }

    pub fn with_whoami_path(mut self, path: impl Into<String>) -> Self {
        self.whoami_path = path.into();
        self
    }

    /// Authenticate as an end user.
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.auth = ClientAuth::Bearer(token.into());
        self
    }

    /// Authenticate as this service, minting a short-lived token per request.
    pub fn with_service_token(mut self, jwt_secret: impl Into<String>, service_name: impl Into<String>) -> Self {
        self.auth = ClientAuth::Service {
            jwt_secret: jwt_secret.into(),
            service_name: service_name.into(),
        };
        self
    }

    fn generate_token(jwt_secret: &str, service_name: &str) -> Result<String, StoreError> {
        let expiration = Utc::now()
            .checked_add_signed(Duration::seconds(60)) // 1 minute expiration
            .map(|t| t.timestamp())
            .unwrap_or_else(|| Utc::now().timestamp());

        let claims = Claims {
            sub: service_name.to_string(),
            type_: "service".to_string(),
            exp: expiration as usize,
        };

        encode(&Header::default(), &claims, &EncodingKey::from_secret(jwt_secret.as_bytes()))
            .map_err(StoreError::Token)
    }

    fn authorize(&self, request: RequestBuilder) -> Result<RequestBuilder, StoreError> {
        Ok(match &self.auth {
            ClientAuth::None => request,
            ClientAuth::Bearer(token) => request.bearer_auth(token),
            ClientAuth::Service { jwt_secret, service_name } => {
                request.bearer_auth(Self::generate_token(jwt_secret, service_name)?)
            }
        })
    }

    /// URL of one document. The id is always a single, fully escaped path
    /// segment, so it can't reach other paths or add a query.
    fn document_url(&self, document_id: &str) -> Result<Url, StoreError> {
        if document_id.is_empty() || document_id == "." || document_id == ".." {
            return Err(StoreError::InvalidId(document_id.to_string()));
        }
        let base = format!("{}{}", self.base_url, self.documents_path);
        let mut url = Url::parse(&base).map_err(|_| StoreError::InvalidUrl(base.clone()))?;
        url.path_segments_mut()
            .map_err(|_| StoreError::InvalidUrl(base.clone()))?
            .pop_if_empty()
            .push(document_id);
        Ok(url)
    }

    /// Fetch a document. `Ok(None)` when the service answers 404.
    pub async fn get_document(&self, document_id: &str) -> Result<Option<DocumentRecord>, StoreError> {
        let url = self.document_url(document_id)?;
        debug!("GET {}", url);
        let response = self.authorize(self.client.get(url))?
            .send()
            .await
            .map_err(StoreError::Http)?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => response.json().await.map(Some).map_err(StoreError::Http),
            status => Err(StoreError::Status(status.as_u16())),
        }
    }

    /// Replace title and/or content. `Ok(None)` when the document is gone.
    pub async fn update_document(&self, document_id: &str, update: &DocumentUpdate) -> Result<Option<DocumentRecord>, StoreError> {
        let url = self.document_url(document_id)?;
        debug!("PUT {}", url);
        let response = self.authorize(self.client.put(url).json(update))?
            .send()
            .await
            .map_err(StoreError::Http)?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => response.json().await.map(Some).map_err(StoreError::Http),
            status => Err(StoreError::Status(status.as_u16())),
        }
    }

    /// Resolve the identity behind the configured bearer token.
    pub async fn whoami(&self) -> Result<WhoAmI, StoreError> {
        let url = format!("{}{}", self.base_url, self.whoami_path);
        let response = self.authorize(self.client.get(&url))?
            .send()
            .await
            .map_err(StoreError::Http)?;

        if !response.status().is_success() {
            return Err(StoreError::Status(response.status().as_u16()));
        }
        response.json().await.map_err(StoreError::Http)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::auth_service::validate_jwt;

    #[test]
    fn test_service_token_validates() {
        let token = DocServiceClient::generate_token("secret", "colabri-sync").unwrap();
        let data = validate_jwt(&token, "secret").unwrap();
        assert_eq!(data.claims["sub"], "colabri-sync");
        assert_eq!(data.claims["type"], "service");
        assert!(validate_jwt(&token, "other").is_err());
    }

    #[test]
    fn test_document_url_strips_trailing_slash() {
        let client = DocServiceClient::new("http://docs.test/", std::time::Duration::from_secs(1))
            .unwrap()
            .with_documents_path("/v1/docs");
        assert_eq!(client.document_url("abc").unwrap().as_str(), "http://docs.test/v1/docs/abc");
    }

    #[test]
    fn test_document_id_stays_one_segment() {
        let client = DocServiceClient::new("http://docs.test", std::time::Duration::from_secs(1)).unwrap();

        let url = client.document_url("../../admin/users").unwrap();
        assert_eq!(url.host_str(), Some("docs.test"));
        let segments: Vec<_> = url.path_segments().unwrap().collect();
        assert_eq!(segments.len(), 3);
        assert_eq!(&segments[..2], &["api", "documents"]);
        assert!(!segments[2].contains('/'));

        let url = client.document_url("x?drop=1#frag").unwrap();
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);
        assert!(url.path().starts_with("/api/documents/x"));
        assert_eq!(url.path_segments().unwrap().count(), 3);
    }

    #[test]
    fn test_dot_ids_rejected() {
        let client = DocServiceClient::new("http://docs.test", std::time::Duration::from_secs(1)).unwrap();
        for id in ["", ".", ".."] {
            assert!(matches!(client.document_url(id), Err(StoreError::InvalidId(_))));
        }
    }
}
