use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use ulid::Ulid;
use uuid::Uuid;

use parlor_core::{ChannelKind, UserId};
use parlor_protocol::{ChatMessage, Envelope, MessageKind};

use crate::server::{
    chat_repository::{ChatPersistence, ChatRepository},
    core::AppState,
    events,
    membership::authorize_channel,
};

use super::hub::{BroadcastJob, JoinedChannels};

/// Inbound-pump view of one connection: the authenticated identity plus
/// the handles the router needs to answer the peer and submit fan-out
/// jobs.
pub(crate) struct ConnectionSession {
    pub(crate) connection_id: Uuid,
    pub(crate) user_id: UserId,
    pub(crate) outbound: mpsc::Sender<String>,
    pub(crate) channels: Arc<JoinedChannels>,
}

/// Dispatch one decoded envelope. Malformed payloads and client-only kinds
/// are logged and skipped; they never terminate the connection.
pub(crate) async fn route_envelope(
    state: &AppState,
    session: &ConnectionSession,
    envelope: Envelope,
) {
    match envelope.kind {
        MessageKind::ChatRoom => {
            handle_chat_message(state, session, envelope.payload, ChannelKind::Room).await;
        }
        MessageKind::DirectChat => {
            handle_chat_message(state, session, envelope.payload, ChannelKind::DirectChat).await;
        }
        MessageKind::JoinRoom => {
            handle_join(state, session, envelope.payload, ChannelKind::Room).await;
        }
        MessageKind::JoinDirectChat => {
            handle_join(state, session, envelope.payload, ChannelKind::DirectChat).await;
        }
        MessageKind::UserLeave | MessageKind::Error | MessageKind::RoomCreated => {
            tracing::debug!(
                connection_id = %session.connection_id,
                kind = envelope.kind.as_str(),
                "ignoring client-only envelope"
            );
        }
    }
}

async fn handle_join(
    state: &AppState,
    session: &ConnectionSession,
    payload: serde_json::Value,
    kind: ChannelKind,
) {
    let Ok(channel_id) = serde_json::from_value::<String>(payload) else {
        tracing::warn!(
            connection_id = %session.connection_id,
            kind = kind.as_str(),
            "dropping malformed join payload"
        );
        return;
    };

    let user_id = session.user_id.to_string();
    let access = authorize_channel(state, &user_id, &channel_id, kind).await;
    if access.can_read {
        session.channels.join(kind, &channel_id).await;
        tracing::info!(
            user_id = %user_id,
            channel_id = %channel_id,
            kind = kind.as_str(),
            "user joined channel"
        );
    } else {
        tracing::warn!(
            user_id = %user_id,
            channel_id = %channel_id,
            kind = kind.as_str(),
            "join denied"
        );
        send_error(session, join_denied_reason(kind)).await;
    }
}

async fn handle_chat_message(
    state: &AppState,
    session: &ConnectionSession,
    payload: serde_json::Value,
    kind: ChannelKind,
) {
    let Ok(message) = serde_json::from_value::<ChatMessage>(payload) else {
        tracing::warn!(
            connection_id = %session.connection_id,
            kind = kind.as_str(),
            "dropping malformed chat payload"
        );
        return;
    };

    let user_id = session.user_id.to_string();
    let access = authorize_channel(state, &user_id, &message.room_id, kind).await;
    if !access.can_write {
        tracing::warn!(
            user_id = %user_id,
            channel_id = %message.room_id,
            kind = kind.as_str(),
            "message write denied"
        );
        send_error(session, write_denied_reason(kind)).await;
        return;
    }

    let message = normalize_message(message, &user_id, Utc::now());

    let repo = match ChatRepository::from_state(state).await {
        Ok(repo) => repo,
        Err(error) => {
            tracing::error!(error = %error, "chat repository unavailable");
            send_error(session, SAVE_FAILED_REASON).await;
            return;
        }
    };
    let saved = match kind {
        ChannelKind::Room => repo.save_room_message(&message).await,
        ChannelKind::DirectChat => repo.save_direct_message(&message).await,
    };
    // an unsaved message is never broadcast
    if let Err(error) = saved {
        tracing::error!(
            error = %error,
            channel_id = %message.room_id,
            kind = kind.as_str(),
            "message save failed"
        );
        send_error(session, SAVE_FAILED_REASON).await;
        return;
    }

    let last_update = match kind {
        ChannelKind::Room => {
            repo.update_room_last_message(&message.room_id, &message)
                .await
        }
        ChannelKind::DirectChat => {
            repo.update_direct_chat_last_message(&message.room_id, &message)
                .await
        }
    };
    if let Err(error) = last_update {
        // best-effort pointer; the message itself is already durable
        tracing::warn!(
            error = %error,
            channel_id = %message.room_id,
            kind = kind.as_str(),
            "last-message update failed"
        );
    }

    let frame = match kind {
        ChannelKind::Room => events::chat_room(&message),
        ChannelKind::DirectChat => events::direct_chat(&message),
    };
    tracing::debug!(
        kind = frame.kind.as_str(),
        channel_id = %message.room_id,
        message_id = %message.id,
        "submitting broadcast job"
    );
    let job = BroadcastJob {
        channel_id: message.room_id.clone(),
        frame: frame.frame,
    };
    match kind {
        ChannelKind::Room => state.hub.broadcast_to_room(job).await,
        ChannelKind::DirectChat => state.hub.broadcast_to_direct_chat(job).await,
    }
}

/// Server-side normalization before persist: id and `created_at` are
/// assigned if absent, `updated_at` is always restamped, and the author is
/// forced to the authenticated sender regardless of what the payload
/// claimed.
fn normalize_message(
    mut message: ChatMessage,
    author_id: &str,
    now: DateTime<Utc>,
) -> ChatMessage {
    if message.id.is_empty() {
        message.id = Ulid::new().to_string();
    }
    if message.created_at.is_none() {
        message.created_at = Some(now);
    }
    message.updated_at = Some(now);
    message.user_id = author_id.to_owned();
    message
}

const SAVE_FAILED_REASON: &str = "Failed to save message";

fn join_denied_reason(kind: ChannelKind) -> &'static str {
    match kind {
        ChannelKind::Room => "No permission to join this room",
        ChannelKind::DirectChat => "Not a member of this direct chat",
    }
}

fn write_denied_reason(kind: ChannelKind) -> &'static str {
    match kind {
        ChannelKind::Room => "No permission to send messages to this room",
        ChannelKind::DirectChat => "Not a member of this direct chat",
    }
}

/// Errors are reported only to the offending connection, over its own
/// queue. This send may wait on a congested queue; a connection stalling
/// its own inbound pump only hurts itself.
async fn send_error(session: &ConnectionSession, reason: &str) {
    let event = events::error(reason);
    let _ = session.outbound.send(event.frame).await;
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration as ChronoDuration, Utc};
    use serde_json::json;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    use parlor_core::{ChannelKind, UserId};
    use parlor_protocol::{ChatMessage, Envelope, MessageKind};

    use super::{normalize_message, route_envelope, ConnectionSession};
    use crate::server::{
        chat_repository::{ChatPersistence, ChatRepository},
        core::{AppConfig, AppState, RoomRecord},
        realtime::hub::JoinedChannels,
    };

    fn session_with_queue(
        user_id: UserId,
        capacity: usize,
    ) -> (ConnectionSession, mpsc::Receiver<String>) {
        let (outbound, receiver) = mpsc::channel(capacity);
        let session = ConnectionSession {
            connection_id: Uuid::new_v4(),
            user_id,
            outbound,
            channels: Arc::new(JoinedChannels::default()),
        };
        (session, receiver)
    }

    fn envelope(kind: MessageKind, payload: serde_json::Value) -> Envelope {
        Envelope {
            kind,
            payload,
            timestamp: None,
        }
    }

    async fn seed_room(state: &AppState, room_id: &str, owner: &str, is_private: bool) {
        let now = Utc::now();
        let repo = ChatRepository::from_state(state).await.unwrap();
        repo.create_room(&RoomRecord {
            id: room_id.to_owned(),
            name: String::from("Room"),
            description: String::new(),
            owner_id: owner.to_owned(),
            is_private,
            members: vec![owner.to_owned()],
            admins: vec![owner.to_owned()],
            last_message: None,
            image_url: String::new(),
            created_at: now,
            updated_at: now,
            is_deleted: false,
        })
        .await
        .unwrap();
    }

    #[test]
    fn normalize_assigns_id_and_timestamps_and_forces_author() {
        let now = Utc::now();
        let forged = ChatMessage {
            id: String::new(),
            content: String::from("hi"),
            user_id: String::from("someone-else"),
            room_id: String::from("r1"),
            created_at: None,
            updated_at: None,
            is_deleted: false,
        };

        let normalized = normalize_message(forged, "real-author", now);
        assert!(!normalized.id.is_empty());
        assert_eq!(normalized.user_id, "real-author");
        assert_eq!(normalized.created_at, Some(now));
        assert_eq!(normalized.updated_at, Some(now));
    }

    #[test]
    fn normalize_preserves_supplied_id_and_created_at_but_restamps_updated_at() {
        let created = Utc::now() - ChronoDuration::minutes(5);
        let now = Utc::now();
        let message = ChatMessage {
            id: String::from("client-id"),
            content: String::from("hi"),
            user_id: String::new(),
            room_id: String::from("r1"),
            created_at: Some(created),
            updated_at: Some(created),
            is_deleted: false,
        };

        let normalized = normalize_message(message, "author", now);
        assert_eq!(normalized.id, "client-id");
        assert_eq!(normalized.created_at, Some(created));
        assert_eq!(normalized.updated_at, Some(now));
    }

    #[tokio::test]
    async fn join_room_denied_for_non_member_of_private_room() {
        let state = AppState::new(&AppConfig::default()).unwrap();
        seed_room(&state, "r2", "someone", true).await;

        let (session, mut receiver) = session_with_queue(UserId::new(), 4);
        route_envelope(
            &state,
            &session,
            envelope(MessageKind::JoinRoom, json!("r2")),
        )
        .await;

        assert!(!session.channels.contains(ChannelKind::Room, "r2").await);
        let frame = receiver.recv().await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value["type"], "ERROR");
        assert_eq!(value["payload"], "No permission to join this room");
        assert!(receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn join_room_adds_channel_for_member() {
        let state = AppState::new(&AppConfig::default()).unwrap();
        let user_id = UserId::new();
        seed_room(&state, "r1", &user_id.to_string(), true).await;

        let (session, mut receiver) = session_with_queue(user_id, 4);
        route_envelope(
            &state,
            &session,
            envelope(MessageKind::JoinRoom, json!("r1")),
        )
        .await;

        assert!(session.channels.contains(ChannelKind::Room, "r1").await);
        assert!(receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn chat_room_message_denied_for_non_member_is_never_persisted() {
        let state = AppState::new(&AppConfig::default()).unwrap();
        seed_room(&state, "r1", "someone", false).await;

        let (session, mut receiver) = session_with_queue(UserId::new(), 4);
        route_envelope(
            &state,
            &session,
            envelope(
                MessageKind::ChatRoom,
                json!({"content": "hi", "roomId": "r1"}),
            ),
        )
        .await;

        let frame = receiver.recv().await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value["type"], "ERROR");
        assert_eq!(value["payload"], "No permission to send messages to this room");

        let repo = ChatRepository::from_state(&state).await.unwrap();
        assert!(repo.room_messages("r1", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn chat_room_message_persists_with_forced_author_and_updates_pointer() {
        let state = AppState::new(&AppConfig::default()).unwrap();
        let author = UserId::new();
        seed_room(&state, "r1", &author.to_string(), false).await;

        let (session, mut receiver) = session_with_queue(author, 4);
        route_envelope(
            &state,
            &session,
            envelope(
                MessageKind::ChatRoom,
                json!({"content": "hi", "roomId": "r1", "userId": "forged-user"}),
            ),
        )
        .await;

        // no local error envelope
        assert!(receiver.try_recv().is_err());

        let repo = ChatRepository::from_state(&state).await.unwrap();
        let saved = repo.room_messages("r1", 10).await.unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].user_id, author.to_string());
        assert!(!saved[0].id.is_empty());
        assert!(saved[0].created_at.is_some());

        let room = repo.get_room("r1").await.unwrap().unwrap();
        assert_eq!(room.last_message.unwrap().id, saved[0].id);
    }

    #[tokio::test]
    async fn failed_save_reports_error_and_suppresses_broadcast() {
        let state = AppState::new(&AppConfig::default()).unwrap();
        let author = UserId::new();
        // a deleted room still authorizes its members but rejects saves
        let now = Utc::now();
        let repo = ChatRepository::from_state(&state).await.unwrap();
        repo.create_room(&RoomRecord {
            id: String::from("r1"),
            name: String::from("Room"),
            description: String::new(),
            owner_id: author.to_string(),
            is_private: false,
            members: vec![author.to_string()],
            admins: Vec::new(),
            last_message: None,
            image_url: String::new(),
            created_at: now,
            updated_at: now,
            is_deleted: true,
        })
        .await
        .unwrap();

        let (sender_session, mut sender_rx) = session_with_queue(author, 4);
        let (listener_session, mut listener_rx) = session_with_queue(UserId::new(), 4);
        listener_session
            .channels
            .join(ChannelKind::Room, "r1")
            .await;
        state
            .hub
            .register(crate::server::realtime::hub::Connection {
                connection_id: listener_session.connection_id,
                user_id: listener_session.user_id,
                outbound: listener_session.outbound.clone(),
                control: tokio::sync::watch::channel(
                    crate::server::realtime::hub::ConnectionControl::Open,
                )
                .0,
                channels: Arc::clone(&listener_session.channels),
            })
            .await;

        route_envelope(
            &state,
            &sender_session,
            envelope(
                MessageKind::ChatRoom,
                json!({"content": "hi", "roomId": "r1"}),
            ),
        )
        .await;

        let frame = sender_rx.recv().await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value["type"], "ERROR");
        assert_eq!(value["payload"], "Failed to save message");

        // give the hub dispatcher a chance to process anything submitted
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(listener_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn direct_chat_message_reaches_both_participants() {
        let state = AppState::new(&AppConfig::default()).unwrap();
        let alice = UserId::new();
        let bob = UserId::new();
        let repo = ChatRepository::from_state(&state).await.unwrap();
        let chat = repo
            .find_or_create_direct_chat(&alice.to_string(), &bob.to_string())
            .await
            .unwrap();

        let (alice_session, mut alice_rx) = session_with_queue(alice, 4);
        let (bob_session, mut bob_rx) = session_with_queue(bob, 4);
        for session in [&alice_session, &bob_session] {
            route_envelope(
                &state,
                session,
                envelope(MessageKind::JoinDirectChat, json!(chat.id.clone())),
            )
            .await;
            state
                .hub
                .register(crate::server::realtime::hub::Connection {
                    connection_id: session.connection_id,
                    user_id: session.user_id,
                    outbound: session.outbound.clone(),
                    control: tokio::sync::watch::channel(
                        crate::server::realtime::hub::ConnectionControl::Open,
                    )
                    .0,
                    channels: Arc::clone(&session.channels),
                })
                .await;
        }

        route_envelope(
            &state,
            &alice_session,
            envelope(
                MessageKind::DirectChat,
                json!({"content": "hey", "roomId": chat.id.clone()}),
            ),
        )
        .await;

        for receiver in [&mut alice_rx, &mut bob_rx] {
            let frame = tokio::time::timeout(std::time::Duration::from_secs(1), receiver.recv())
                .await
                .expect("direct message should fan out")
                .unwrap();
            let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
            assert_eq!(value["type"], "DIRECT_CHAT");
            assert_eq!(value["payload"]["content"], "hey");
            assert_eq!(value["payload"]["userId"], alice.to_string());
        }

        let chat = repo.get_direct_chat(&chat.id).await.unwrap().unwrap();
        assert_eq!(chat.last_message.unwrap().content, "hey");
    }

    #[tokio::test]
    async fn unknown_and_client_only_envelopes_are_ignored() {
        let state = AppState::new(&AppConfig::default()).unwrap();
        let (session, mut receiver) = session_with_queue(UserId::new(), 4);

        route_envelope(
            &state,
            &session,
            envelope(MessageKind::UserLeave, json!("r1")),
        )
        .await;
        route_envelope(
            &state,
            &session,
            envelope(MessageKind::JoinRoom, json!({"not": "a string"})),
        )
        .await;

        assert!(receiver.try_recv().is_err());
    }
}
