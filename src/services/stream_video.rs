use async_trait::async_trait;
use chrono::Duration;
use futures_util::{SinkExt, StreamExt};
use reqwest::Client;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::protocol::Message as WsMessage;
use tracing::{debug, info, warn};

use super::stream_auth::StreamCredentials;
use super::{RealtimeSession, ServiceError, VideoPlatform, ensure_success};
use crate::webhook::signature::SignatureVerifier;

const SERVICE: &str = "stream-video";
const AGENT_TOKEN_TTL_HOURS: i64 = 6;

/// Stream Video server-side client.
pub struct StreamVideoClient {
    client: Client,
    base_url: String,
    credentials: StreamCredentials,
    verifier: SignatureVerifier,
}

impl StreamVideoClient {
    pub fn new(base_url: impl Into<String>, credentials: StreamCredentials) -> Self {
        let verifier = SignatureVerifier::new(credentials.api_secret());
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
            verifier,
        }
    }

    fn call_url(&self, call_type: &str, call_id: &str, action: &str) -> String {
        format!(
            "{}/api/v2/video/call/{}/{}/{}?api_key={}",
            self.base_url,
            urlencoding::encode(call_type),
            urlencoding::encode(call_id),
            action,
            urlencoding::encode(self.credentials.api_key()),
        )
    }

    fn agent_bridge_url(&self, call_type: &str, call_id: &str) -> String {
        let ws_base = if let Some(rest) = self.base_url.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = self.base_url.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            self.base_url.clone()
        };
        format!(
            "{}/video/connect_agent?call_type={}&call_id={}&api_key={}",
            ws_base,
            urlencoding::encode(call_type),
            urlencoding::encode(call_id),
            urlencoding::encode(self.credentials.api_key()),
        )
    }
}

#[async_trait]
impl VideoPlatform for StreamVideoClient {
    fn verify_webhook(&self, body: &[u8], signature: &str) -> bool {
        self.verifier.verify(body, signature)
    }

    async fn end_call(&self, call_type: &str, call_id: &str) -> Result<(), ServiceError> {
        let token = self.credentials.server_token()?;
        let response = self
            .client
            .post(self.call_url(call_type, call_id, "mark_ended"))
            .header("Authorization", token)
            .header("stream-auth-type", "jwt")
            .json(&serde_json::json!({}))
            .send()
            .await?;
        ensure_success(SERVICE, response).await?;
        info!(call_type, call_id, "Call marked as ended.");
        Ok(())
    }

    async fn connect_agent(
        &self,
        call_type: &str,
        call_id: &str,
        llm_api_key: &str,
        agent_user_id: &str,
    ) -> Result<Box<dyn RealtimeSession>, ServiceError> {
        let token = self
            .credentials
            .user_token(agent_user_id, Duration::hours(AGENT_TOKEN_TTL_HOURS))?;
        let call_cid = format!("{call_type}:{call_id}");

        let mut request = self
            .agent_bridge_url(call_type, call_id)
            .into_client_request()
            .map_err(|e| ServiceError::WebSocketError(e.to_string()))?;
        let headers = request.headers_mut();
        headers.insert("Authorization", header_value(&token)?);
        headers.insert("stream-auth-type", HeaderValue::from_static("jwt"));
        headers.insert(
            "Sec-WebSocket-Protocol",
            header_value(&format!(
                "realtime, openai-insecure-api-key.{llm_api_key}, openai-beta.realtime-v1"
            ))?,
        );

        let (socket, _response) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|e| ServiceError::WebSocketError(e.to_string()))?;
        info!(call_cid = %call_cid, agent_user_id, "Realtime agent bridge connected.");

        let (commands_tx, commands_rx) = mpsc::channel::<String>(16);
        tokio::spawn(run_bridge(socket, commands_rx, call_cid));

        Ok(Box::new(RealtimeBridgeSession { commands_tx }))
    }
}

fn header_value(value: &str) -> Result<HeaderValue, ServiceError> {
    HeaderValue::from_str(value)
        .map_err(|e| ServiceError::InvalidConfiguration(format!("Invalid header value: {e}")))
}

/// Handle to a running agent bridge. Dropping it stops further session
/// updates but leaves the agent in the call until the bridge closes.
pub struct RealtimeBridgeSession {
    commands_tx: mpsc::Sender<String>,
}

pub fn session_update_frame(instructions: &str) -> String {
    serde_json::json!({
        "type": "session.update",
        "session": { "instructions": instructions },
    })
    .to_string()
}

#[async_trait]
impl RealtimeSession for RealtimeBridgeSession {
    async fn update_instructions(&self, instructions: &str) -> Result<(), ServiceError> {
        self.commands_tx
            .send(session_update_frame(instructions))
            .await
            .map_err(|_| ServiceError::SessionClosed)
    }
}

type BridgeSocket =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

async fn run_bridge(
    socket: BridgeSocket,
    mut commands_rx: mpsc::Receiver<String>,
    call_cid: String,
) {
    let (mut sink, mut stream) = socket.split();
    let mut commands_open = true;

    loop {
        tokio::select! {
            command = commands_rx.recv(), if commands_open => match command {
                Some(frame) => {
                    if let Err(e) = sink.send(WsMessage::text(frame)).await {
                        warn!(
                            call_cid = %call_cid,
                            error = %e,
                            "Failed to send frame to agent bridge."
                        );
                        break;
                    }
                }
                None => commands_open = false,
            },
            incoming = stream.next() => match incoming {
                Some(Ok(WsMessage::Text(text))) => log_bridge_event(&call_cid, text.as_str()),
                Some(Ok(WsMessage::Close(frame))) => {
                    info!(call_cid = %call_cid, ?frame, "Agent bridge closed by remote.");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(call_cid = %call_cid, error = %e, "Agent bridge receive error.");
                    break;
                }
                None => break,
            },
        }
    }
    debug!(call_cid = %call_cid, "Agent bridge task finished.");
}

fn log_bridge_event(call_cid: &str, text: &str) {
    let Ok(event) = serde_json::from_str::<serde_json::Value>(text) else {
        return;
    };
    match event.get("type").and_then(|t| t.as_str()) {
        Some("error") => {
            warn!(call_cid, error = %event["error"], "Agent bridge reported an error.");
        }
        Some(event_type) => debug!(call_cid, event_type, "Agent bridge event."),
        None => {}
    }
}
