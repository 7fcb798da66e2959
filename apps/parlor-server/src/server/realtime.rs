use std::{sync::Arc, time::Duration};

use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::HeaderMap,
    response::IntoResponse,
};
use futures_util::{stream::SplitSink, SinkExt, StreamExt};
use tokio::{
    sync::{mpsc, watch},
    time::{timeout, timeout_at, Instant},
};
use uuid::Uuid;

use parlor_protocol::parse_frame;

use self::{
    dispatch::{route_envelope, ConnectionSession},
    hub::{Connection, ConnectionControl, JoinedChannels},
};
use super::{
    auth::{authenticate_with_token, bearer_token},
    core::{ping_period, AppState, AuthContext},
    errors::ApiFailure,
    metrics::record_ws_disconnect,
    types::ChatSocketQuery,
};

pub(crate) mod dispatch;
pub(crate) mod fanout;
pub(crate) mod hub;

/// Transport-upgrade endpoint: verifies the caller's token and hands the
/// upgraded socket plus the verified user id to the connection pumps.
pub(crate) async fn chat_ws(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
    Query(query): Query<ChatSocketQuery>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiFailure> {
    let token = query
        .token
        .or_else(|| bearer_token(&headers).map(ToOwned::to_owned))
        .ok_or(ApiFailure::Unauthorized)?;
    // tolerate a "Bearer " prefix smuggled into the query parameter
    let token = token.strip_prefix("Bearer ").unwrap_or(&token).to_owned();
    let auth = authenticate_with_token(&state, &token).await?;

    Ok(ws.on_upgrade(move |socket| async move {
        handle_chat_connection(state, socket, auth).await;
    }))
}

/// Runs one connection to completion: registers it, spawns the outbound
/// pump, and drives the inbound pump on this task. The deferred cleanup
/// unconditionally unregisters, which closes the outbound queue and the
/// transport exactly once.
pub(crate) async fn handle_chat_connection(state: AppState, socket: WebSocket, auth: AuthContext) {
    let connection_id = Uuid::new_v4();
    let (sink, mut stream) = socket.split();

    let (outbound_tx, outbound_rx) = mpsc::channel::<String>(state.runtime.outbound_queue);
    let (control_tx, control_rx) = watch::channel(ConnectionControl::Open);
    let mut inbound_control = control_rx.clone();
    let channels = Arc::new(JoinedChannels::default());

    state
        .hub
        .register(Connection {
            connection_id,
            user_id: auth.user_id,
            outbound: outbound_tx.clone(),
            control: control_tx,
            channels: Arc::clone(&channels),
        })
        .await;
    tracing::info!(
        connection_id = %connection_id,
        user_id = %auth.user_id,
        "chat connection registered"
    );

    let send_task = tokio::spawn(run_outbound_pump(
        sink,
        outbound_rx,
        control_rx,
        ping_period(state.runtime.read_wait),
        state.runtime.write_wait,
    ));

    let session = ConnectionSession {
        connection_id,
        user_id: auth.user_id,
        outbound: outbound_tx,
        channels,
    };

    let read_wait = state.runtime.read_wait;
    let mut deadline = Instant::now() + read_wait;
    let mut disconnect_reason = "connection_closed";
    loop {
        let incoming = tokio::select! {
            // the hub closed this connection (eviction or unregister)
            changed = inbound_control.changed() => {
                if changed.is_err() || *inbound_control.borrow() == ConnectionControl::Close {
                    break;
                }
                continue;
            }
            read = timeout_at(deadline, stream.next()) => match read {
                Err(_) => {
                    disconnect_reason = "read_timeout";
                    break;
                }
                Ok(None) => break,
                Ok(Some(Err(_))) => {
                    disconnect_reason = "socket_error";
                    break;
                }
                Ok(Some(Ok(message))) => message,
            },
        };

        let payload: Vec<u8> = match incoming {
            Message::Text(text) => {
                if text.len() > state.runtime.max_frame_bytes {
                    disconnect_reason = "frame_too_large";
                    break;
                }
                text.as_bytes().to_vec()
            }
            Message::Binary(bytes) => {
                if bytes.len() > state.runtime.max_frame_bytes {
                    disconnect_reason = "frame_too_large";
                    break;
                }
                bytes.to_vec()
            }
            Message::Pong(_) => {
                // liveness probe answered; the only path that extends the
                // read deadline
                deadline = Instant::now() + read_wait;
                continue;
            }
            Message::Ping(_) => continue,
            Message::Close(_) => {
                disconnect_reason = "client_close";
                break;
            }
        };

        match parse_frame(&payload) {
            Ok(envelope) => route_envelope(&state, &session, envelope).await,
            Err(error) => {
                tracing::warn!(
                    connection_id = %connection_id,
                    error = %error,
                    "dropping malformed frame"
                );
            }
        }
    }

    record_ws_disconnect(disconnect_reason);
    tracing::info!(
        connection_id = %connection_id,
        user_id = %auth.user_id,
        reason = disconnect_reason,
        "chat connection closing"
    );
    state.hub.unregister(connection_id).await;
    drop(session);
    let _ = send_task.await;
}

/// Outbound pump: drains the connection's queue to its transport, sends
/// periodic liveness probes, and terminates on a close signal, a closed
/// queue, or any write failure. Termination closes the transport.
async fn run_outbound_pump(
    mut sink: SplitSink<WebSocket, Message>,
    mut outbound_rx: mpsc::Receiver<String>,
    mut control_rx: watch::Receiver<ConnectionControl>,
    ping_every: Duration,
    write_wait: Duration,
) {
    let mut ping_interval = tokio::time::interval(ping_every);
    ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    // the first tick fires immediately; skip it so the first probe waits a
    // full period
    ping_interval.tick().await;

    loop {
        tokio::select! {
            _ = ping_interval.tick() => {
                if !send_with_deadline(&mut sink, Message::Ping(Vec::new().into()), write_wait).await {
                    break;
                }
            }
            control_change = control_rx.changed() => {
                if control_change.is_err() || *control_rx.borrow() == ConnectionControl::Close {
                    let _ = send_with_deadline(
                        &mut sink,
                        Message::Close(Some(CloseFrame {
                            code: 1000,
                            reason: "closed".into(),
                        })),
                        write_wait,
                    )
                    .await;
                    break;
                }
            }
            maybe_frame = outbound_rx.recv() => {
                match maybe_frame {
                    Some(frame) => {
                        if !send_with_deadline(&mut sink, Message::Text(frame.into()), write_wait).await {
                            break;
                        }
                    }
                    None => {
                        let _ = send_with_deadline(&mut sink, Message::Close(None), write_wait).await;
                        break;
                    }
                }
            }
        }
    }

    let _ = sink.close().await;
}

async fn send_with_deadline(
    sink: &mut SplitSink<WebSocket, Message>,
    message: Message,
    write_wait: Duration,
) -> bool {
    matches!(timeout(write_wait, sink.send(message)).await, Ok(Ok(())))
}
