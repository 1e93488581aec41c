use serde::{Deserialize, Serialize};

use crate::permissions::Member;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: i64,
    pub user: String,
    pub avatar: String,
    pub message: String,
    /// Wall-clock `HH:MM` shown next to the message.
    pub timestamp: String,
    pub channel: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendMessage {
    pub channel: String,
    pub message: ChatMessage,
}

/// Events the client emits to the real-time server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    UserOnline(Member),
    JoinChannel(String),
    SendMessage(SendMessage),
    BanUser(String),
    KickUser(String),
}

impl ClientEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::UserOnline(_) => "userOnline",
            ClientEvent::JoinChannel(_) => "joinChannel",
            ClientEvent::SendMessage(_) => "sendMessage",
            ClientEvent::BanUser(_) => "banUser",
            ClientEvent::KickUser(_) => "kickUser",
        }
    }
}

/// Events the real-time server pushes to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    ChatHistory(Vec<ChatMessage>),
    NewMessage(ChatMessage),
    OnlineUsers(Vec<Member>),
    Banned,
    Kicked,
    ErrorMessage(String),
}

impl ServerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::ChatHistory(_) => "chatHistory",
            ServerEvent::NewMessage(_) => "newMessage",
            ServerEvent::OnlineUsers(_) => "onlineUsers",
            ServerEvent::Banned => "banned",
            ServerEvent::Kicked => "kicked",
            ServerEvent::ErrorMessage(_) => "errorMessage",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn client_events_use_wire_names() {
        let event = ClientEvent::JoinChannel("ders-yardim".into());
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value, json!({"event": "joinChannel", "data": "ders-yardim"}));
        assert_eq!(value["event"], event.name());
    }

    #[test]
    fn unit_server_events_parse_without_data() {
        let event: ServerEvent = serde_json::from_str(r#"{"event": "banned"}"#).unwrap();
        assert_eq!(event, ServerEvent::Banned);
    }

    #[test]
    fn online_users_parse_with_member_defaults() {
        let event: ServerEvent = serde_json::from_value(json!({
            "event": "onlineUsers",
            "data": [{"id": "1", "name": "Ali", "role": "founder"}]
        }))
        .unwrap();
        let ServerEvent::OnlineUsers(users) = event else {
            panic!("expected onlineUsers");
        };
        assert_eq!(users[0].role, crate::permissions::Role::Founder);
    }

    #[test]
    fn every_server_event_name_matches_serde_tag() {
        let message = ChatMessage {
            id: 1,
            user: "Ali".into(),
            avatar: "👤".into(),
            message: "selam".into(),
            timestamp: "12:00".into(),
            channel: "ders-yardim".into(),
        };
        let events = [
            ServerEvent::ChatHistory(vec![message.clone()]),
            ServerEvent::NewMessage(message),
            ServerEvent::OnlineUsers(Vec::new()),
            ServerEvent::Banned,
            ServerEvent::Kicked,
            ServerEvent::ErrorMessage("nope".into()),
        ];
        for event in events {
            let value = serde_json::to_value(&event).unwrap();
            assert_eq!(value["event"], event.name());
        }
    }
}
