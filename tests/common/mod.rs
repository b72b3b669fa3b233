#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use colabri_sync::config::Config;
use colabri_sync::{build_app, AppState};
use futures_util::{SinkExt, StreamExt};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

pub const SECRET: &str = "test-secret";

pub struct TestServer {
    pub addr: SocketAddr,
    pub state: AppState,
}

impl TestServer {
    pub async fn start(config: Config) -> Self {
        let state = AppState::from_config(config).expect("app state");
        let app = build_app(state.clone());
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve");
        });
        Self { addr, state }
    }

    pub async fn open() -> Self {
        Self::start(Config::default()).await
    }

    pub async fn with_auth() -> Self {
        Self::start(Config { auth_jwt_secret: Some(SECRET.to_string()), ..Config::default() }).await
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws/docs", self.addr)
    }
}

pub fn make_token(sub: &str, name: &str) -> String {
    let exp = chrono::Utc::now().timestamp() + 3600;
    let claims = json!({ "sub": sub, "name": name, "exp": exp });
    encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET.as_bytes())).expect("token")
}

/// Raw protocol client speaking JSON frames.
pub struct WsClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsClient {
    pub async fn connect(url: &str) -> Self {
        Self::try_connect(url, None).await.expect("connect")
    }

    pub async fn try_connect(url: &str, token: Option<&str>) -> Result<Self, tungstenite::Error> {
        let mut request = url.into_client_request()?;
        if let Some(token) = token {
            request.headers_mut().insert(
                "authorization",
                HeaderValue::from_str(&format!("Bearer {}", token)).expect("header"),
            );
        }
        let (stream, _) = tokio_tungstenite::connect_async(request).await?;
        Ok(Self { stream })
    }

    pub async fn send(&mut self, value: Value) {
        self.send_raw(&value.to_string()).await;
    }

    pub async fn send_raw(&mut self, text: &str) {
        self.stream.send(Message::text(text.to_string())).await.expect("send");
    }

    pub async fn join(&mut self, doc: &str, user: &str, name: &str) -> Value {
        self.send(json!({"type": "join", "documentId": doc, "userId": user, "username": name})).await;
        let init = self.recv().await;
        assert_eq!(init["type"], "init", "unexpected reply to join: {init}");
        init
    }

    /// Next text frame, failing after a second.
    pub async fn recv(&mut self) -> Value {
        self.try_recv(Duration::from_secs(1)).await.expect("no frame received")
    }

    pub async fn try_recv(&mut self, wait: Duration) -> Option<Value> {
        let deadline = tokio::time::Instant::now() + wait;
        loop {
            let frame = tokio::time::timeout_at(deadline, self.stream.next()).await.ok()??;
            match frame {
                Ok(Message::Text(text)) => return serde_json::from_str(text.as_str()).ok(),
                Ok(Message::Close(_)) | Err(_) => return None,
                Ok(_) => continue,
            }
        }
    }

    /// True when nothing arrives for a short while.
    pub async fn is_quiet(&mut self) -> bool {
        self.try_recv(Duration::from_millis(150)).await.is_none()
    }

    pub async fn close(mut self) {
        let _ = self.stream.close(None).await;
    }
}

pub fn roster_ids(value: &Value) -> Vec<String> {
    let mut ids: Vec<String> = value
        .as_array()
        .map(|users| {
            users
                .iter()
                .filter_map(|u| u["userId"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();
    ids.sort();
    ids
}
