#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use ulid::Ulid;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("name is invalid")]
    InvalidName,
    #[error("username is invalid")]
    InvalidUsername,
    #[error("user id is invalid")]
    InvalidUserId,
    #[error("channel kind is invalid")]
    InvalidChannelKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UserId(Ulid);

impl UserId {
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<String> for UserId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let parsed = Ulid::from_string(&value).map_err(|_| DomainError::InvalidUserId)?;
        Ok(Self(parsed))
    }
}

impl core::fmt::Display for UserId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Username(String);

impl Username {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Username {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        validate_username(&value)?;
        Ok(Self(value))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoomName(String);

impl RoomName {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RoomName {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        validate_name(&value, 1, 64)?;
        Ok(Self(value))
    }
}

/// Logical broadcast target kind: a chat room or a two-party direct chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Room,
    DirectChat,
}

impl ChannelKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Room => "room",
            Self::DirectChat => "direct_chat",
        }
    }
}

impl TryFrom<String> for ChannelKind {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "room" => Ok(Self::Room),
            "direct_chat" => Ok(Self::DirectChat),
            _ => Err(DomainError::InvalidChannelKind),
        }
    }
}

fn validate_username(value: &str) -> Result<(), DomainError> {
    if !(3..=32).contains(&value.len()) {
        return Err(DomainError::InvalidUsername);
    }

    if value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
    {
        return Ok(());
    }

    Err(DomainError::InvalidUsername)
}

fn validate_name(value: &str, min: usize, max: usize) -> Result<(), DomainError> {
    if !(min..=max).contains(&value.len()) {
        return Err(DomainError::InvalidName);
    }

    if value.chars().all(|c| c.is_ascii_graphic() || c == ' ') {
        return Ok(());
    }

    Err(DomainError::InvalidName)
}

#[cfg(test)]
mod tests {
    use super::{ChannelKind, DomainError, RoomName, UserId, Username};

    #[test]
    fn username_invariants_enforced() {
        let valid = Username::try_from(String::from("alice_1")).unwrap();
        assert_eq!(valid.as_str(), "alice_1");
        assert_eq!(
            Username::try_from(String::from("a")).unwrap_err(),
            DomainError::InvalidUsername
        );
        assert_eq!(
            Username::try_from(String::from("bad-name")).unwrap_err(),
            DomainError::InvalidUsername
        );
    }

    #[test]
    fn room_name_enforces_bounds() {
        let name = RoomName::try_from(String::from("General Chat")).unwrap();
        assert_eq!(name.as_str(), "General Chat");
        assert_eq!(
            RoomName::try_from(String::new()).unwrap_err(),
            DomainError::InvalidName
        );
        assert_eq!(
            RoomName::try_from("x".repeat(65)).unwrap_err(),
            DomainError::InvalidName
        );
        assert_eq!(
            RoomName::try_from(String::from("bad\u{7}name")).unwrap_err(),
            DomainError::InvalidName
        );
    }

    #[test]
    fn user_id_round_trips_through_string() {
        let id = UserId::new();
        let parsed = UserId::try_from(id.to_string()).unwrap();
        assert_eq!(parsed, id);
        assert_eq!(
            UserId::try_from(String::from("not-a-ulid")).unwrap_err(),
            DomainError::InvalidUserId
        );
    }

    #[test]
    fn channel_kind_enforces_allowed_values() {
        let room = ChannelKind::try_from(String::from("room")).unwrap();
        let direct = ChannelKind::try_from(String::from("direct_chat")).unwrap();
        assert_eq!(room.as_str(), "room");
        assert_eq!(direct.as_str(), "direct_chat");
        assert_eq!(
            ChannelKind::try_from(String::from("voice")).unwrap_err(),
            DomainError::InvalidChannelKind
        );
    }
}
