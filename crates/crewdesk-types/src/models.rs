use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// -- JWT Claims --

/// JWT claims shared across crewdesk-api (REST middleware) and
/// crewdesk-gateway (WebSocket Identify handshake). Canonical definition
/// lives here in crewdesk-types to eliminate duplication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub exp: usize,
}

/// The caller's resolved identity, injected once at the API boundary and
/// passed explicitly into every service call. Privileged callers hold the
/// shared system key and assert their member id; the service layer trusts
/// that assertion unconditionally (a documented trust boundary).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Identity {
    pub member_id: i64,
    pub privileged: bool,
}

// -- Attachment ownership --

/// Which entity owns an attachment container. The container row is created
/// before the owning row exists, so the kind tag is the only record of
/// ownership until the message/task references it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentKind {
    Task,
    RoomMessage,
    PrivateMessage,
}

impl AttachmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Task => "task",
            Self::RoomMessage => "room_message",
            Self::PrivateMessage => "private_message",
        }
    }
}

impl FromStr for AttachmentKind {
    type Err = UnknownTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "task" => Ok(Self::Task),
            "room_message" => Ok(Self::RoomMessage),
            "private_message" => Ok(Self::PrivateMessage),
            other => Err(UnknownTag(other.to_string())),
        }
    }
}

/// Media classification of an uploaded resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    File,
    Image,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Image => "image",
        }
    }
}

impl FromStr for MediaKind {
    type Err = UnknownTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "file" => Ok(Self::File),
            "image" => Ok(Self::Image),
            other => Err(UnknownTag(other.to_string())),
        }
    }
}

/// Which chat surface a message belongs to. Room and private streams are
/// fully independent, including their id sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatKind {
    Room,
    Private,
}

impl FromStr for ChatKind {
    type Err = UnknownTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "room" => Ok(Self::Room),
            "private" => Ok(Self::Private),
            other => Err(UnknownTag(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UnknownTag(pub String);

impl fmt::Display for UnknownTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown tag '{}'", self.0)
    }
}

impl std::error::Error for UnknownTag {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attachment_kind_round_trips_db_tags() {
        for kind in [
            AttachmentKind::Task,
            AttachmentKind::RoomMessage,
            AttachmentKind::PrivateMessage,
        ] {
            assert_eq!(kind.as_str().parse::<AttachmentKind>().unwrap(), kind);
        }
        assert!("chat".parse::<AttachmentKind>().is_err());
    }

    #[test]
    fn chat_kind_rejects_unknown_path_segment() {
        assert_eq!("private".parse::<ChatKind>().unwrap(), ChatKind::Private);
        assert_eq!("room".parse::<ChatKind>().unwrap(), ChatKind::Room);
        assert!("group".parse::<ChatKind>().is_err());
    }
}
