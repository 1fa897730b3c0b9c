//! Test helpers for integration tests
//!
//! Spawns a gateway per test and offers thin HTTP and WebSocket clients.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use futures_util::{SinkExt, StreamExt};
use live_common::{
    AppConfig, AppSettings, ChatConfig, CorsConfig, Environment, JwtConfig, JwtService,
    ServerConfig, SnowflakeConfig, StorageBackend,
};
use live_core::{ChatUser, Snowflake};
use live_gateway::protocol::{event_names, GatewayMessage};
use live_gateway::{create_app, create_app_state};
use reqwest::{Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

pub const TEST_SECRET: &str = "integration-test-secret";

/// How long a test waits for a frame before failing
pub const FRAME_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for an in-memory gateway on an ephemeral port
pub fn test_config(chat: ChatConfig) -> AppConfig {
    AppConfig {
        app: AppSettings {
            name: "live-gateway-it".into(),
            env: Environment::Development,
        },
        gateway: ServerConfig {
            host: "127.0.0.1".into(),
            port: 0,
        },
        storage: StorageBackend::Memory,
        database: None,
        jwt: JwtConfig {
            secret: TEST_SECRET.into(),
        },
        cors: CorsConfig::default(),
        chat,
        snowflake: SnowflakeConfig { worker_id: 7 },
    }
}

/// Running gateway
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: Client,
    jwt: JwtService,
    _handle: JoinHandle<()>,
}

impl TestServer {
    pub async fn start() -> Result<Self> {
        Self::start_with(ChatConfig::default()).await
    }

    pub async fn start_with(chat: ChatConfig) -> Result<Self> {
        let state = create_app_state(test_config(chat)).await?;
        let app = create_app(state);

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;

        Ok(Self {
            addr,
            client,
            jwt: JwtService::new(TEST_SECRET),
            _handle: handle,
        })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Token the auth service would issue for `user`
    pub fn token(&self, user: &ChatUser) -> String {
        self.jwt
            .issue(user, chrono::Duration::minutes(10))
            .expect("token")
    }

    pub async fn get(&self, path: &str) -> Result<Response> {
        Ok(self
            .client
            .get(format!("{}{path}", self.base_url()))
            .send()
            .await?)
    }

    pub async fn get_as(&self, user: &ChatUser, path: &str) -> Result<Response> {
        Ok(self
            .client
            .get(format!("{}{path}", self.base_url()))
            .bearer_auth(self.token(user))
            .send()
            .await?)
    }

    pub async fn post_as<T: Serialize>(
        &self,
        user: &ChatUser,
        path: &str,
        body: &T,
    ) -> Result<Response> {
        Ok(self
            .client
            .post(format!("{}{path}", self.base_url()))
            .bearer_auth(self.token(user))
            .json(body)
            .send()
            .await?)
    }

    /// POST without a body
    pub async fn action_as(&self, user: &ChatUser, path: &str) -> Result<Response> {
        Ok(self
            .client
            .post(format!("{}{path}", self.base_url()))
            .bearer_auth(self.token(user))
            .send()
            .await?)
    }

    pub async fn open_session(&self, host: &ChatUser, session_id: Snowflake) -> Result<()> {
        let response = self
            .action_as(host, &format!("/api/v1/sessions/{session_id}/open"))
            .await?;
        assert_status(response, StatusCode::OK).await
    }

    pub async fn close_session(&self, user: &ChatUser, session_id: Snowflake) -> Result<()> {
        let response = self
            .action_as(user, &format!("/api/v1/sessions/{session_id}/close"))
            .await?;
        assert_status(response, StatusCode::OK).await
    }

    pub fn stream_url(&self, session_id: Snowflake, token: &str, resume: Option<i64>) -> String {
        let mut url = format!(
            "ws://{}/api/v1/sessions/{session_id}/stream?token={token}",
            self.addr
        );
        if let Some(seq) = resume {
            url.push_str(&format!("&resume_from_seq={seq}"));
        }
        url
    }

    /// Open a stream; fails on a non-101 answer
    pub async fn connect(
        &self,
        user: &ChatUser,
        session_id: Snowflake,
        resume: Option<i64>,
    ) -> Result<StreamClient> {
        let url = self.stream_url(session_id, &self.token(user), resume);
        let (socket, _) = connect_async(url).await.context("stream upgrade")?;
        Ok(StreamClient { socket })
    }

    /// HTTP status of a refused upgrade
    pub async fn connect_status(&self, url: &str) -> Result<u16> {
        match connect_async(url).await {
            Ok(_) => bail!("upgrade unexpectedly succeeded"),
            Err(tungstenite::Error::Http(response)) => Ok(response.status().as_u16()),
            Err(e) => Err(e.into()),
        }
    }
}

/// What a stream client observed next
#[derive(Debug)]
pub enum Frame {
    Gateway(GatewayMessage),
    Closed(Option<u16>),
}

pub struct StreamClient {
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl StreamClient {
    /// Next gateway frame or close, skipping pings
    pub async fn next_frame(&mut self) -> Result<Frame> {
        loop {
            let next = tokio::time::timeout(FRAME_TIMEOUT, self.socket.next())
                .await
                .context("timed out waiting for a frame")?;

            match next {
                Some(Ok(Message::Text(text))) => {
                    return Ok(Frame::Gateway(GatewayMessage::from_json(&text)?));
                }
                Some(Ok(Message::Close(frame))) => {
                    return Ok(Frame::Closed(frame.map(|f| u16::from(f.code))));
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
                None => return Ok(Frame::Closed(None)),
            }
        }
    }

    pub async fn next_message(&mut self) -> Result<GatewayMessage> {
        match self.next_frame().await? {
            Frame::Gateway(message) => Ok(message),
            Frame::Closed(code) => bail!("stream closed with {code:?}"),
        }
    }

    /// Skip Hello and everything up to and including READY
    pub async fn until_ready(&mut self) -> Result<Vec<GatewayMessage>> {
        let mut replay = Vec::new();
        loop {
            let message = self.next_message().await?;
            match message.t.as_deref() {
                Some(event_names::READY) => return Ok(replay),
                Some(_) => replay.push(message),
                None => {}
            }
        }
    }

    /// Seq of the next MESSAGE_CREATE, skipping non-dispatch frames
    pub async fn next_seq(&mut self) -> Result<i64> {
        loop {
            let message = self.next_message().await?;
            if message.is_event(event_names::MESSAGE_CREATE) {
                return message.s.context("dispatch without seq");
            }
        }
    }

    /// Close code of the stream end, skipping anything before it
    pub async fn close_code(&mut self) -> Result<Option<u16>> {
        loop {
            if let Frame::Closed(code) = self.next_frame().await? {
                return Ok(code);
            }
        }
    }

    pub async fn send_raw(&mut self, text: &str) -> Result<()> {
        self.socket.send(Message::Text(text.to_string())).await?;
        Ok(())
    }

    pub async fn heartbeat(&mut self) -> Result<()> {
        self.send_raw(r#"{"op":1}"#).await
    }
}

pub async fn assert_json<T: DeserializeOwned>(response: Response, expected: StatusCode) -> Result<T> {
    let status = response.status();
    if status != expected {
        let body = response.text().await?;
        bail!("Expected status {expected}, got {status}. Body: {body}");
    }
    Ok(response.json().await?)
}

pub async fn assert_status(response: Response, expected: StatusCode) -> Result<()> {
    let status = response.status();
    if status != expected {
        let body = response.text().await?;
        bail!("Expected status {expected}, got {status}. Body: {body}");
    }
    Ok(())
}
