use parlor_core::ChannelKind;

use super::{
    chat_repository::{ChatPersistence, ChatRepository},
    core::{AppState, RoomRecord},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ChannelAccess {
    pub(crate) can_read: bool,
    pub(crate) can_write: bool,
}

impl ChannelAccess {
    pub(crate) const DENIED: Self = Self {
        can_read: false,
        can_write: false,
    };
}

/// Access computation over a room record: members, admins, and the owner
/// may read and write; a public room is readable by anyone.
pub(crate) fn room_access(room: &RoomRecord, user_id: &str) -> ChannelAccess {
    let is_member = room.members.iter().any(|id| id == user_id)
        || room.admins.iter().any(|id| id == user_id)
        || room.owner_id == user_id;
    ChannelAccess {
        can_read: is_member || !room.is_private,
        can_write: is_member,
    }
}

/// Answers whether `user_id` may read and write `channel_id` right now.
/// Membership is authoritative in the store; nothing is cached past this
/// single check, and any lookup failure denies.
pub(crate) async fn authorize_channel(
    state: &AppState,
    user_id: &str,
    channel_id: &str,
    kind: ChannelKind,
) -> ChannelAccess {
    let Ok(repo) = ChatRepository::from_state(state).await else {
        return ChannelAccess::DENIED;
    };

    match kind {
        ChannelKind::Room => match repo.get_room(channel_id).await {
            Ok(Some(room)) => room_access(&room, user_id),
            Ok(None) | Err(_) => ChannelAccess::DENIED,
        },
        ChannelKind::DirectChat => match repo.get_direct_chat(channel_id).await {
            Ok(Some(chat)) => {
                let is_participant = chat.user_ids.iter().any(|id| id == user_id);
                ChannelAccess {
                    can_read: is_participant,
                    can_write: is_participant,
                }
            }
            Ok(None) | Err(_) => ChannelAccess::DENIED,
        },
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use parlor_core::ChannelKind;

    use super::{authorize_channel, room_access, ChannelAccess};
    use crate::server::{
        chat_repository::{ChatPersistence, ChatRepository},
        core::{AppConfig, AppState, RoomRecord},
    };

    fn private_room(owner: &str) -> RoomRecord {
        let now = Utc::now();
        RoomRecord {
            id: String::from("r1"),
            name: String::from("Private"),
            description: String::new(),
            owner_id: owner.to_owned(),
            is_private: true,
            members: Vec::new(),
            admins: Vec::new(),
            last_message: None,
            image_url: String::new(),
            created_at: now,
            updated_at: now,
            is_deleted: false,
        }
    }

    #[test]
    fn public_room_is_readable_but_not_writable_by_strangers() {
        let mut room = private_room("owner");
        room.is_private = false;
        let access = room_access(&room, "stranger");
        assert!(access.can_read);
        assert!(!access.can_write);
    }

    #[test]
    fn private_room_grants_access_to_members_admins_and_owner() {
        let mut room = private_room("owner");
        room.members.push(String::from("member"));
        room.admins.push(String::from("admin"));

        for user in ["member", "admin", "owner"] {
            let access = room_access(&room, user);
            assert!(access.can_read, "{user} should read");
            assert!(access.can_write, "{user} should write");
        }
        assert_eq!(room_access(&room, "stranger"), ChannelAccess::DENIED);
    }

    #[tokio::test]
    async fn direct_chat_access_is_participant_only() {
        let state = AppState::new(&AppConfig::default()).unwrap();
        let repo = ChatRepository::from_state(&state).await.unwrap();
        let chat = repo.find_or_create_direct_chat("ua", "ub").await.unwrap();

        let member = authorize_channel(&state, "ua", &chat.id, ChannelKind::DirectChat).await;
        assert!(member.can_read && member.can_write);

        let outsider = authorize_channel(&state, "uc", &chat.id, ChannelKind::DirectChat).await;
        assert_eq!(outsider, ChannelAccess::DENIED);

        let missing = authorize_channel(&state, "ua", "missing", ChannelKind::DirectChat).await;
        assert_eq!(missing, ChannelAccess::DENIED);
    }

    #[tokio::test]
    async fn unknown_room_denies_all_access() {
        let state = AppState::new(&AppConfig::default()).unwrap();
        let access = authorize_channel(&state, "ua", "missing", ChannelKind::Room).await;
        assert_eq!(access, ChannelAccess::DENIED);
    }
}
