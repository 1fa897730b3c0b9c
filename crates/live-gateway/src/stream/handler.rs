//! WebSocket handler

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use live_core::{ChatUser, DomainError, Snowflake};
use live_service::{LiveStream, ServiceError, StreamEvent};
use parking_lot::Mutex;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::time::interval;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::extractors::{AuthUser, SessionIdPath};
use crate::protocol::{CloseCode, GatewayMessage, OpCode};
use crate::response::ApiResult;
use crate::state::AppState;

/// Capacity of the reader/monitor -> writer channel
const CONTROL_BUFFER: usize = 16;

#[derive(Debug, Default, Deserialize)]
pub struct StreamParams {
    /// Last seq the client has already seen; replay starts after it
    #[serde(default)]
    pub resume_from_seq: Option<i64>,
}

/// Instruction for the writer task
#[derive(Debug)]
enum Control {
    Send(GatewayMessage),
    Close(CloseCode),
    /// Peer went away; stop without a close frame
    Stop,
}

/// GET /api/v1/sessions/:session_id/stream
///
/// Unknown sessions are rejected before the upgrade (404); a session that
/// is not active is reported after the upgrade with close code 4003.
pub async fn stream_handler(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    SessionIdPath(session_id): SessionIdPath,
    Query(params): Query<StreamParams>,
    ws: WebSocketUpgrade,
) -> ApiResult<Response> {
    state.chat().session(session_id).await?;

    Ok(ws.on_upgrade(move |socket| handle_socket(state, socket, session_id, user, params)))
}

async fn handle_socket(
    state: AppState,
    socket: WebSocket,
    session_id: Snowflake,
    user: ChatUser,
    params: StreamParams,
) {
    let conn_id = Uuid::new_v4();
    let heartbeat_interval = state.chat_config().heartbeat_interval();
    let (mut sink, source) = socket.split();

    let hello = GatewayMessage::hello(state.chat_config().heartbeat_interval_ms);
    if send_frame(&mut sink, &hello).await.is_err() {
        debug!(%conn_id, "Peer left before Hello");
        return;
    }

    let live = match state
        .chat()
        .connect(session_id, &user, params.resume_from_seq)
        .await
    {
        Ok(live) => live,
        Err(e) => {
            let code = connect_close_code(&e);
            info!(%conn_id, session_id = %session_id, user_id = %user.id, error = %e, "Stream rejected");
            close(&mut sink, code).await;
            return;
        }
    };

    info!(
        %conn_id,
        session_id = %session_id,
        user_id = %user.id,
        resume_from_seq = ?params.resume_from_seq,
        "Stream opened"
    );

    let (control_tx, control_rx) = mpsc::channel(CONTROL_BUFFER);
    let last_heartbeat = Arc::new(Mutex::new(Instant::now()));

    let reader = tokio::spawn(read_loop(
        source,
        control_tx.clone(),
        Arc::clone(&last_heartbeat),
        conn_id,
    ));
    let monitor = tokio::spawn(heartbeat_monitor(
        control_tx,
        last_heartbeat,
        heartbeat_interval,
        conn_id,
    ));

    // the writer owns the LiveStream; participation ends when it returns
    let code = write_loop(sink, live, control_rx, session_id).await;

    reader.abort();
    monitor.abort();

    info!(
        %conn_id,
        session_id = %session_id,
        user_id = %user.id,
        close_code = ?code,
        "Stream closed"
    );
}

/// Pump live events and control frames into the socket until either ends
async fn write_loop(
    mut sink: SplitSink<WebSocket, Message>,
    mut live: LiveStream,
    mut control: mpsc::Receiver<Control>,
    session_id: Snowflake,
) -> Option<CloseCode> {
    let code = loop {
        tokio::select! {
            event = live.next() => {
                let frame = match event {
                    Some(Ok(StreamEvent::Message(message))) => GatewayMessage::message_create(&message),
                    Some(Ok(StreamEvent::Ready { last_seq })) => GatewayMessage::ready(session_id, last_seq),
                    Some(Ok(StreamEvent::Ended)) => {
                        // best effort; the close frame follows either way
                        let _ = send_frame(&mut sink, &GatewayMessage::session_ended(session_id)).await;
                        break Some(CloseCode::SessionEnded);
                    }
                    Some(Err(e)) => {
                        warn!(session_id = %session_id, error = %e, "Stream failed");
                        break Some(CloseCode::UnknownError);
                    }
                    None => break Some(CloseCode::ConnectionLost),
                };

                match frame {
                    Ok(frame) => {
                        if send_frame(&mut sink, &frame).await.is_err() {
                            break None;
                        }
                    }
                    Err(e) => {
                        warn!(session_id = %session_id, error = %e, "Failed to encode frame");
                        break Some(CloseCode::UnknownError);
                    }
                }
            }
            command = control.recv() => match command {
                Some(Control::Send(frame)) => {
                    if send_frame(&mut sink, &frame).await.is_err() {
                        break None;
                    }
                }
                Some(Control::Close(code)) => break Some(code),
                Some(Control::Stop) | None => break None,
            },
        }
    };

    if let Some(code) = code {
        close(&mut sink, code).await;
    }
    code
}

/// Handle client frames; only heartbeats are accepted
async fn read_loop(
    mut source: SplitStream<WebSocket>,
    control: mpsc::Sender<Control>,
    last_heartbeat: Arc<Mutex<Instant>>,
    conn_id: Uuid,
) {
    let outcome = loop {
        let Some(frame) = source.next().await else {
            break Control::Stop;
        };

        match frame {
            Ok(Message::Text(text)) => match GatewayMessage::from_json(&text) {
                Ok(message) if message.op == OpCode::Heartbeat => {
                    *last_heartbeat.lock() = Instant::now();
                    if control
                        .send(Control::Send(GatewayMessage::heartbeat_ack()))
                        .await
                        .is_err()
                    {
                        return;
                    }
                }
                Ok(message) => {
                    debug!(%conn_id, op = %message.op, "Unexpected op from client");
                    break Control::Close(CloseCode::UnknownOpcode);
                }
                Err(e) => {
                    debug!(%conn_id, error = %e, "Undecodable frame");
                    break Control::Close(CloseCode::DecodeError);
                }
            },
            Ok(Message::Binary(_)) => break Control::Close(CloseCode::DecodeError),
            Ok(Message::Ping(_) | Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                debug!(%conn_id, "Client closed the stream");
                break Control::Stop;
            }
            Err(e) => {
                debug!(%conn_id, error = %e, "WebSocket error");
                break Control::Stop;
            }
        }
    };

    let _ = control.send(outcome).await;
}

/// Close the stream when no heartbeat arrives within two intervals
async fn heartbeat_monitor(
    control: mpsc::Sender<Control>,
    last_heartbeat: Arc<Mutex<Instant>>,
    heartbeat_interval: Duration,
    conn_id: Uuid,
) {
    let timeout = heartbeat_interval * 2;
    let mut ticker = interval((heartbeat_interval / 2).max(Duration::from_millis(10)));

    loop {
        ticker.tick().await;

        let silent_for = last_heartbeat.lock().elapsed();
        if silent_for > timeout {
            warn!(
                %conn_id,
                silent_for_ms = silent_for.as_millis(),
                "Stream timed out (no heartbeat)"
            );
            let _ = control.send(Control::Close(CloseCode::HeartbeatTimeout)).await;
            return;
        }
    }
}

fn connect_close_code(err: &ServiceError) -> CloseCode {
    match err.domain() {
        Some(DomainError::SessionNotActive(_) | DomainError::SessionNotFound(_)) => {
            CloseCode::SessionNotActive
        }
        _ => CloseCode::UnknownError,
    }
}

async fn send_frame(
    sink: &mut SplitSink<WebSocket, Message>,
    frame: &GatewayMessage,
) -> Result<(), axum::Error> {
    let json = frame.to_json().map_err(axum::Error::new)?;
    sink.send(Message::Text(json)).await
}

async fn close(sink: &mut SplitSink<WebSocket, Message>, code: CloseCode) {
    let frame = CloseFrame {
        code: code.as_u16(),
        reason: code.description().into(),
    };
    let _ = sink.send(Message::Close(Some(frame))).await;
    let _ = sink.close().await;
}
