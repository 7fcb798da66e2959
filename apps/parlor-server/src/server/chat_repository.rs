use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, PgPool, Row};

use parlor_protocol::ChatMessage;

use crate::server::{
    core::{AppState, DirectChatRecord, RoomRecord},
    db::ensure_db_schema,
    errors::ApiFailure,
};

/// Persistence seam for rooms, direct chats, and their messages.
///
/// Message saves fail for a missing or deleted channel; callers rely on that
/// to keep unsaved messages out of any broadcast.
pub(crate) trait ChatPersistence {
    async fn create_room(&self, room: &RoomRecord) -> Result<(), ApiFailure>;

    async fn get_room(&self, room_id: &str) -> Result<Option<RoomRecord>, ApiFailure>;

    async fn user_rooms(&self, user_id: &str) -> Result<Vec<RoomRecord>, ApiFailure>;

    async fn add_member_to_room(&self, room_id: &str, user_id: &str) -> Result<(), ApiFailure>;

    async fn room_messages(
        &self,
        room_id: &str,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, ApiFailure>;

    async fn save_room_message(&self, message: &ChatMessage) -> Result<(), ApiFailure>;

    async fn update_room_last_message(
        &self,
        room_id: &str,
        message: &ChatMessage,
    ) -> Result<(), ApiFailure>;

    async fn find_or_create_direct_chat(
        &self,
        first_user_id: &str,
        second_user_id: &str,
    ) -> Result<DirectChatRecord, ApiFailure>;

    async fn get_direct_chat(&self, chat_id: &str) -> Result<Option<DirectChatRecord>, ApiFailure>;

    async fn user_direct_chats(&self, user_id: &str) -> Result<Vec<DirectChatRecord>, ApiFailure>;

    async fn direct_chat_messages(
        &self,
        chat_id: &str,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, ApiFailure>;

    async fn save_direct_message(&self, message: &ChatMessage) -> Result<(), ApiFailure>;

    async fn update_direct_chat_last_message(
        &self,
        chat_id: &str,
        message: &ChatMessage,
    ) -> Result<(), ApiFailure>;
}

pub(crate) struct PostgresChatRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PostgresChatRepository<'a> {
    fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }
}

fn last_message_column(value: Option<String>) -> Option<ChatMessage> {
    value.and_then(|raw| serde_json::from_str(&raw).ok())
}

fn encode_last_message(message: &ChatMessage) -> Result<String, ApiFailure> {
    serde_json::to_string(message).map_err(|_| ApiFailure::Internal)
}

fn room_from_row(row: &PgRow) -> Result<RoomRecord, ApiFailure> {
    Ok(RoomRecord {
        id: row.try_get("room_id").map_err(|_| ApiFailure::Internal)?,
        name: row.try_get("name").map_err(|_| ApiFailure::Internal)?,
        description: row
            .try_get("description")
            .map_err(|_| ApiFailure::Internal)?,
        owner_id: row.try_get("owner_id").map_err(|_| ApiFailure::Internal)?,
        is_private: row
            .try_get("is_private")
            .map_err(|_| ApiFailure::Internal)?,
        members: row.try_get("members").map_err(|_| ApiFailure::Internal)?,
        admins: row.try_get("admins").map_err(|_| ApiFailure::Internal)?,
        last_message: last_message_column(
            row.try_get("last_message")
                .map_err(|_| ApiFailure::Internal)?,
        ),
        image_url: row.try_get("image_url").map_err(|_| ApiFailure::Internal)?,
        created_at: row
            .try_get("created_at")
            .map_err(|_| ApiFailure::Internal)?,
        updated_at: row
            .try_get("updated_at")
            .map_err(|_| ApiFailure::Internal)?,
        is_deleted: row
            .try_get("is_deleted")
            .map_err(|_| ApiFailure::Internal)?,
    })
}

fn direct_chat_from_row(row: &PgRow) -> Result<DirectChatRecord, ApiFailure> {
    Ok(DirectChatRecord {
        id: row.try_get("chat_id").map_err(|_| ApiFailure::Internal)?,
        user_ids: row.try_get("user_ids").map_err(|_| ApiFailure::Internal)?,
        last_message: last_message_column(
            row.try_get("last_message")
                .map_err(|_| ApiFailure::Internal)?,
        ),
        created_at: row
            .try_get("created_at")
            .map_err(|_| ApiFailure::Internal)?,
        updated_at: row
            .try_get("updated_at")
            .map_err(|_| ApiFailure::Internal)?,
        is_deleted: row
            .try_get("is_deleted")
            .map_err(|_| ApiFailure::Internal)?,
    })
}

fn message_from_row(row: &PgRow) -> Result<ChatMessage, ApiFailure> {
    let created_at: DateTime<Utc> = row
        .try_get("created_at")
        .map_err(|_| ApiFailure::Internal)?;
    let updated_at: DateTime<Utc> = row
        .try_get("updated_at")
        .map_err(|_| ApiFailure::Internal)?;
    Ok(ChatMessage {
        id: row
            .try_get("message_id")
            .map_err(|_| ApiFailure::Internal)?,
        content: row.try_get("content").map_err(|_| ApiFailure::Internal)?,
        user_id: row.try_get("author_id").map_err(|_| ApiFailure::Internal)?,
        room_id: row
            .try_get("channel_id")
            .map_err(|_| ApiFailure::Internal)?,
        created_at: Some(created_at),
        updated_at: Some(updated_at),
        is_deleted: row
            .try_get("is_deleted")
            .map_err(|_| ApiFailure::Internal)?,
    })
}

impl PostgresChatRepository<'_> {
    async fn live_room_exists(&self, room_id: &str) -> Result<bool, ApiFailure> {
        let row = sqlx::query("SELECT 1 FROM rooms WHERE room_id = $1 AND NOT is_deleted")
            .bind(room_id)
            .fetch_optional(self.pool)
            .await
            .map_err(|_| ApiFailure::Internal)?;
        Ok(row.is_some())
    }

    async fn live_direct_chat_exists(&self, chat_id: &str) -> Result<bool, ApiFailure> {
        let row = sqlx::query("SELECT 1 FROM direct_chats WHERE chat_id = $1 AND NOT is_deleted")
            .bind(chat_id)
            .fetch_optional(self.pool)
            .await
            .map_err(|_| ApiFailure::Internal)?;
        Ok(row.is_some())
    }

    async fn save_message(
        &self,
        channel_kind: &str,
        message: &ChatMessage,
    ) -> Result<(), ApiFailure> {
        sqlx::query(
            "INSERT INTO messages (message_id, channel_kind, channel_id, author_id, content, created_at, updated_at, is_deleted)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(&message.id)
        .bind(channel_kind)
        .bind(&message.room_id)
        .bind(&message.user_id)
        .bind(&message.content)
        .bind(message.created_at.unwrap_or_else(Utc::now))
        .bind(message.updated_at.unwrap_or_else(Utc::now))
        .bind(message.is_deleted)
        .execute(self.pool)
        .await
        .map_err(|_| ApiFailure::Internal)?;
        Ok(())
    }

    async fn channel_messages(
        &self,
        channel_kind: &str,
        channel_id: &str,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, ApiFailure> {
        let limit = i64::try_from(limit).map_err(|_| ApiFailure::Internal)?;
        let rows = sqlx::query(
            "SELECT message_id, channel_id, author_id, content, created_at, updated_at, is_deleted
             FROM messages
             WHERE channel_kind = $1 AND channel_id = $2 AND NOT is_deleted
             ORDER BY created_at DESC
             LIMIT $3",
        )
        .bind(channel_kind)
        .bind(channel_id)
        .bind(limit)
        .fetch_all(self.pool)
        .await
        .map_err(|_| ApiFailure::Internal)?;
        rows.iter().map(message_from_row).collect()
    }
}

impl ChatPersistence for PostgresChatRepository<'_> {
    async fn create_room(&self, room: &RoomRecord) -> Result<(), ApiFailure> {
        sqlx::query(
            "INSERT INTO rooms (room_id, name, description, owner_id, is_private, members, admins, image_url, created_at, updated_at, is_deleted)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(&room.id)
        .bind(&room.name)
        .bind(&room.description)
        .bind(&room.owner_id)
        .bind(room.is_private)
        .bind(&room.members)
        .bind(&room.admins)
        .bind(&room.image_url)
        .bind(room.created_at)
        .bind(room.updated_at)
        .bind(room.is_deleted)
        .execute(self.pool)
        .await
        .map_err(|_| ApiFailure::Internal)?;
        Ok(())
    }

    async fn get_room(&self, room_id: &str) -> Result<Option<RoomRecord>, ApiFailure> {
        let row = sqlx::query("SELECT * FROM rooms WHERE room_id = $1")
            .bind(room_id)
            .fetch_optional(self.pool)
            .await
            .map_err(|_| ApiFailure::Internal)?;
        row.as_ref().map(room_from_row).transpose()
    }

    async fn user_rooms(&self, user_id: &str) -> Result<Vec<RoomRecord>, ApiFailure> {
        let rows = sqlx::query(
            "SELECT * FROM rooms
             WHERE $1 = ANY(members) AND NOT is_deleted
             ORDER BY updated_at DESC",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await
        .map_err(|_| ApiFailure::Internal)?;
        rows.iter().map(room_from_row).collect()
    }

    async fn add_member_to_room(&self, room_id: &str, user_id: &str) -> Result<(), ApiFailure> {
        if !self.live_room_exists(room_id).await? {
            return Err(ApiFailure::NotFound);
        }
        sqlx::query(
            "UPDATE rooms
             SET members = array_append(members, $2), updated_at = $3
             WHERE room_id = $1 AND NOT ($2 = ANY(members))",
        )
        .bind(room_id)
        .bind(user_id)
        .bind(Utc::now())
        .execute(self.pool)
        .await
        .map_err(|_| ApiFailure::Internal)?;
        Ok(())
    }

    async fn room_messages(
        &self,
        room_id: &str,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, ApiFailure> {
        self.channel_messages("room", room_id, limit).await
    }

    async fn save_room_message(&self, message: &ChatMessage) -> Result<(), ApiFailure> {
        if !self.live_room_exists(&message.room_id).await? {
            return Err(ApiFailure::NotFound);
        }
        self.save_message("room", message).await
    }

    async fn update_room_last_message(
        &self,
        room_id: &str,
        message: &ChatMessage,
    ) -> Result<(), ApiFailure> {
        let encoded = encode_last_message(message)?;
        sqlx::query("UPDATE rooms SET last_message = $2, updated_at = $3 WHERE room_id = $1")
            .bind(room_id)
            .bind(encoded)
            .bind(Utc::now())
            .execute(self.pool)
            .await
            .map_err(|_| ApiFailure::Internal)?;
        Ok(())
    }

    async fn find_or_create_direct_chat(
        &self,
        first_user_id: &str,
        second_user_id: &str,
    ) -> Result<DirectChatRecord, ApiFailure> {
        let row = sqlx::query(
            "SELECT * FROM direct_chats
             WHERE $1 = ANY(user_ids) AND $2 = ANY(user_ids) AND NOT is_deleted
             LIMIT 1",
        )
        .bind(first_user_id)
        .bind(second_user_id)
        .fetch_optional(self.pool)
        .await
        .map_err(|_| ApiFailure::Internal)?;
        if let Some(row) = row {
            return direct_chat_from_row(&row);
        }

        let now = Utc::now();
        let chat = DirectChatRecord {
            id: ulid::Ulid::new().to_string(),
            user_ids: vec![first_user_id.to_owned(), second_user_id.to_owned()],
            last_message: None,
            created_at: now,
            updated_at: now,
            is_deleted: false,
        };
        sqlx::query(
            "INSERT INTO direct_chats (chat_id, user_ids, created_at, updated_at, is_deleted)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&chat.id)
        .bind(&chat.user_ids)
        .bind(chat.created_at)
        .bind(chat.updated_at)
        .bind(chat.is_deleted)
        .execute(self.pool)
        .await
        .map_err(|_| ApiFailure::Internal)?;
        Ok(chat)
    }

    async fn get_direct_chat(&self, chat_id: &str) -> Result<Option<DirectChatRecord>, ApiFailure> {
        let row = sqlx::query("SELECT * FROM direct_chats WHERE chat_id = $1")
            .bind(chat_id)
            .fetch_optional(self.pool)
            .await
            .map_err(|_| ApiFailure::Internal)?;
        row.as_ref().map(direct_chat_from_row).transpose()
    }

    async fn user_direct_chats(&self, user_id: &str) -> Result<Vec<DirectChatRecord>, ApiFailure> {
        let rows = sqlx::query(
            "SELECT * FROM direct_chats
             WHERE $1 = ANY(user_ids) AND NOT is_deleted
             ORDER BY updated_at DESC",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await
        .map_err(|_| ApiFailure::Internal)?;
        rows.iter().map(direct_chat_from_row).collect()
    }

    async fn direct_chat_messages(
        &self,
        chat_id: &str,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, ApiFailure> {
        self.channel_messages("direct_chat", chat_id, limit).await
    }

    async fn save_direct_message(&self, message: &ChatMessage) -> Result<(), ApiFailure> {
        if !self.live_direct_chat_exists(&message.room_id).await? {
            return Err(ApiFailure::NotFound);
        }
        self.save_message("direct_chat", message).await
    }

    async fn update_direct_chat_last_message(
        &self,
        chat_id: &str,
        message: &ChatMessage,
    ) -> Result<(), ApiFailure> {
        let encoded = encode_last_message(message)?;
        sqlx::query("UPDATE direct_chats SET last_message = $2, updated_at = $3 WHERE chat_id = $1")
            .bind(chat_id)
            .bind(encoded)
            .bind(Utc::now())
            .execute(self.pool)
            .await
            .map_err(|_| ApiFailure::Internal)?;
        Ok(())
    }
}

pub(crate) struct InMemoryChatRepository<'a> {
    state: &'a AppState,
}

impl<'a> InMemoryChatRepository<'a> {
    fn new(state: &'a AppState) -> Self {
        Self { state }
    }
}

fn sorted_newest_first(mut messages: Vec<ChatMessage>, limit: usize) -> Vec<ChatMessage> {
    messages.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    messages.truncate(limit);
    messages
}

impl ChatPersistence for InMemoryChatRepository<'_> {
    async fn create_room(&self, room: &RoomRecord) -> Result<(), ApiFailure> {
        self.state
            .rooms
            .write()
            .await
            .insert(room.id.clone(), room.clone());
        Ok(())
    }

    async fn get_room(&self, room_id: &str) -> Result<Option<RoomRecord>, ApiFailure> {
        Ok(self.state.rooms.read().await.get(room_id).cloned())
    }

    async fn user_rooms(&self, user_id: &str) -> Result<Vec<RoomRecord>, ApiFailure> {
        let rooms = self.state.rooms.read().await;
        let mut matching: Vec<RoomRecord> = rooms
            .values()
            .filter(|room| !room.is_deleted && room.members.iter().any(|id| id == user_id))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(matching)
    }

    async fn add_member_to_room(&self, room_id: &str, user_id: &str) -> Result<(), ApiFailure> {
        let mut rooms = self.state.rooms.write().await;
        let room = rooms
            .get_mut(room_id)
            .filter(|room| !room.is_deleted)
            .ok_or(ApiFailure::NotFound)?;
        if !room.members.iter().any(|id| id == user_id) {
            room.members.push(user_id.to_owned());
            room.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn room_messages(
        &self,
        room_id: &str,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, ApiFailure> {
        let messages = self.state.room_messages.read().await;
        Ok(sorted_newest_first(
            messages.get(room_id).cloned().unwrap_or_default(),
            limit,
        ))
    }

    async fn save_room_message(&self, message: &ChatMessage) -> Result<(), ApiFailure> {
        let rooms = self.state.rooms.read().await;
        if !rooms
            .get(&message.room_id)
            .is_some_and(|room| !room.is_deleted)
        {
            return Err(ApiFailure::NotFound);
        }
        drop(rooms);

        self.state
            .room_messages
            .write()
            .await
            .entry(message.room_id.clone())
            .or_default()
            .push(message.clone());
        Ok(())
    }

    async fn update_room_last_message(
        &self,
        room_id: &str,
        message: &ChatMessage,
    ) -> Result<(), ApiFailure> {
        let mut rooms = self.state.rooms.write().await;
        let room = rooms.get_mut(room_id).ok_or(ApiFailure::NotFound)?;
        room.last_message = Some(message.clone());
        room.updated_at = Utc::now();
        Ok(())
    }

    async fn find_or_create_direct_chat(
        &self,
        first_user_id: &str,
        second_user_id: &str,
    ) -> Result<DirectChatRecord, ApiFailure> {
        let mut chats = self.state.direct_chats.write().await;
        let existing = chats.values().find(|chat| {
            !chat.is_deleted
                && chat.user_ids.iter().any(|id| id == first_user_id)
                && chat.user_ids.iter().any(|id| id == second_user_id)
        });
        if let Some(chat) = existing {
            return Ok(chat.clone());
        }

        let now = Utc::now();
        let chat = DirectChatRecord {
            id: ulid::Ulid::new().to_string(),
            user_ids: vec![first_user_id.to_owned(), second_user_id.to_owned()],
            last_message: None,
            created_at: now,
            updated_at: now,
            is_deleted: false,
        };
        chats.insert(chat.id.clone(), chat.clone());
        Ok(chat)
    }

    async fn get_direct_chat(&self, chat_id: &str) -> Result<Option<DirectChatRecord>, ApiFailure> {
        Ok(self.state.direct_chats.read().await.get(chat_id).cloned())
    }

    async fn user_direct_chats(&self, user_id: &str) -> Result<Vec<DirectChatRecord>, ApiFailure> {
        let chats = self.state.direct_chats.read().await;
        let mut matching: Vec<DirectChatRecord> = chats
            .values()
            .filter(|chat| !chat.is_deleted && chat.user_ids.iter().any(|id| id == user_id))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(matching)
    }

    async fn direct_chat_messages(
        &self,
        chat_id: &str,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, ApiFailure> {
        let messages = self.state.direct_messages.read().await;
        Ok(sorted_newest_first(
            messages.get(chat_id).cloned().unwrap_or_default(),
            limit,
        ))
    }

    async fn save_direct_message(&self, message: &ChatMessage) -> Result<(), ApiFailure> {
        let chats = self.state.direct_chats.read().await;
        if !chats
            .get(&message.room_id)
            .is_some_and(|chat| !chat.is_deleted)
        {
            return Err(ApiFailure::NotFound);
        }
        drop(chats);

        self.state
            .direct_messages
            .write()
            .await
            .entry(message.room_id.clone())
            .or_default()
            .push(message.clone());
        Ok(())
    }

    async fn update_direct_chat_last_message(
        &self,
        chat_id: &str,
        message: &ChatMessage,
    ) -> Result<(), ApiFailure> {
        let mut chats = self.state.direct_chats.write().await;
        let chat = chats.get_mut(chat_id).ok_or(ApiFailure::NotFound)?;
        chat.last_message = Some(message.clone());
        chat.updated_at = Utc::now();
        Ok(())
    }
}

pub(crate) enum ChatRepository<'a> {
    Postgres(PostgresChatRepository<'a>),
    InMemory(InMemoryChatRepository<'a>),
}

impl<'a> ChatRepository<'a> {
    pub(crate) async fn from_state(state: &'a AppState) -> Result<ChatRepository<'a>, ApiFailure> {
        if let Some(pool) = &state.db_pool {
            ensure_db_schema(state).await?;
            Ok(ChatRepository::Postgres(PostgresChatRepository::new(pool)))
        } else {
            Ok(ChatRepository::InMemory(InMemoryChatRepository::new(state)))
        }
    }
}

impl ChatPersistence for ChatRepository<'_> {
    async fn create_room(&self, room: &RoomRecord) -> Result<(), ApiFailure> {
        match self {
            Self::Postgres(repo) => repo.create_room(room).await,
            Self::InMemory(repo) => repo.create_room(room).await,
        }
    }

    async fn get_room(&self, room_id: &str) -> Result<Option<RoomRecord>, ApiFailure> {
        match self {
            Self::Postgres(repo) => repo.get_room(room_id).await,
            Self::InMemory(repo) => repo.get_room(room_id).await,
        }
    }

    async fn user_rooms(&self, user_id: &str) -> Result<Vec<RoomRecord>, ApiFailure> {
        match self {
            Self::Postgres(repo) => repo.user_rooms(user_id).await,
            Self::InMemory(repo) => repo.user_rooms(user_id).await,
        }
    }

    async fn add_member_to_room(&self, room_id: &str, user_id: &str) -> Result<(), ApiFailure> {
        match self {
            Self::Postgres(repo) => repo.add_member_to_room(room_id, user_id).await,
            Self::InMemory(repo) => repo.add_member_to_room(room_id, user_id).await,
        }
    }

    async fn room_messages(
        &self,
        room_id: &str,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, ApiFailure> {
        match self {
            Self::Postgres(repo) => repo.room_messages(room_id, limit).await,
            Self::InMemory(repo) => repo.room_messages(room_id, limit).await,
        }
    }

    async fn save_room_message(&self, message: &ChatMessage) -> Result<(), ApiFailure> {
        match self {
            Self::Postgres(repo) => repo.save_room_message(message).await,
            Self::InMemory(repo) => repo.save_room_message(message).await,
        }
    }

    async fn update_room_last_message(
        &self,
        room_id: &str,
        message: &ChatMessage,
    ) -> Result<(), ApiFailure> {
        match self {
            Self::Postgres(repo) => repo.update_room_last_message(room_id, message).await,
            Self::InMemory(repo) => repo.update_room_last_message(room_id, message).await,
        }
    }

    async fn find_or_create_direct_chat(
        &self,
        first_user_id: &str,
        second_user_id: &str,
    ) -> Result<DirectChatRecord, ApiFailure> {
        match self {
            Self::Postgres(repo) => {
                repo.find_or_create_direct_chat(first_user_id, second_user_id)
                    .await
            }
            Self::InMemory(repo) => {
                repo.find_or_create_direct_chat(first_user_id, second_user_id)
                    .await
            }
        }
    }

    async fn get_direct_chat(&self, chat_id: &str) -> Result<Option<DirectChatRecord>, ApiFailure> {
        match self {
            Self::Postgres(repo) => repo.get_direct_chat(chat_id).await,
            Self::InMemory(repo) => repo.get_direct_chat(chat_id).await,
        }
    }

    async fn user_direct_chats(&self, user_id: &str) -> Result<Vec<DirectChatRecord>, ApiFailure> {
        match self {
            Self::Postgres(repo) => repo.user_direct_chats(user_id).await,
            Self::InMemory(repo) => repo.user_direct_chats(user_id).await,
        }
    }

    async fn direct_chat_messages(
        &self,
        chat_id: &str,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, ApiFailure> {
        match self {
            Self::Postgres(repo) => repo.direct_chat_messages(chat_id, limit).await,
            Self::InMemory(repo) => repo.direct_chat_messages(chat_id, limit).await,
        }
    }

    async fn save_direct_message(&self, message: &ChatMessage) -> Result<(), ApiFailure> {
        match self {
            Self::Postgres(repo) => repo.save_direct_message(message).await,
            Self::InMemory(repo) => repo.save_direct_message(message).await,
        }
    }

    async fn update_direct_chat_last_message(
        &self,
        chat_id: &str,
        message: &ChatMessage,
    ) -> Result<(), ApiFailure> {
        match self {
            Self::Postgres(repo) => repo.update_direct_chat_last_message(chat_id, message).await,
            Self::InMemory(repo) => repo.update_direct_chat_last_message(chat_id, message).await,
        }
    }
}
