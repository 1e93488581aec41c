use chrono::{Local, TimeZone};
use log::{info, warn};
use std::time::Duration;

use super::channel::{find_channel, Channel, DEFAULT_CHANNEL};
use super::connection::{ChatConnection, Transport};
use super::events::{ChatMessage, ClientEvent, SendMessage, ServerEvent};
use crate::error::{Error, Result};
use crate::moderation::{AdmissionFilter, MuteState, TimestampWindow};
use crate::permissions::{can_act_on, Capability, Member, Permissions, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Active,
    Banned,
    Kicked,
    LoggedOut,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Sent(ChatMessage),
    /// Nothing but whitespace.
    Ignored,
    NotPermitted(Capability),
    Rejected { reason: String, remaining_secs: u64 },
}

/// View-model of the chat screen for one signed-in member.
#[derive(Debug)]
pub struct ChatSession<T: Transport> {
    member: Member,
    permissions: Permissions,
    connection: ChatConnection<T>,
    filter: AdmissionFilter,
    window: TimestampWindow,
    mute: MuteState,
    channel: &'static Channel,
    messages: Vec<ChatMessage>,
    online: Vec<Member>,
    last_error: Option<String>,
    status: SessionStatus,
}

impl<T: Transport> ChatSession<T> {
    /// Connect, announce presence, and join the default channel.
    pub fn connect(member: Member, transport: T, filter: AdmissionFilter) -> Result<Self> {
        let channel = find_channel(DEFAULT_CHANNEL)?;
        let mut connection = ChatConnection::open(transport, member.clone())?;
        connection.join(channel.id)?;
        Ok(Self {
            permissions: Permissions::for_member(&member),
            member,
            connection,
            filter,
            window: TimestampWindow::new(),
            mute: MuteState::default(),
            channel,
            messages: Vec::new(),
            online: Vec::new(),
            last_error: None,
            status: SessionStatus::Active,
        })
    }

    pub fn switch_channel(&mut self, id: &str) -> Result<()> {
        self.ensure_active()?;
        let channel = find_channel(id)?;
        if self.connection.join(channel.id)? {
            self.channel = channel;
            self.messages.clear();
        }
        Ok(())
    }

    /// Run `text` through the channel permission and the admission filter,
    /// emitting it when both let it through.
    pub fn send(&mut self, text: &str, now: i64) -> Result<SendOutcome> {
        self.ensure_active()?;
        let text = text.trim();
        if text.is_empty() {
            return Ok(SendOutcome::Ignored);
        }

        let required = self.channel.required_capability();
        if !self.permissions.allows(required) {
            return Ok(SendOutcome::NotPermitted(required));
        }

        let decision = self.filter.evaluate(&self.window, &self.mute, text, now);
        let reason = decision.reason().map(str::to_string);
        let (window, mute) = decision.into_state();

        if let Some(reason) = reason {
            self.window = window;
            self.mute = mute;
            return Ok(SendOutcome::Rejected {
                reason,
                remaining_secs: self.mute.remaining_secs(now),
            });
        }

        let message = ChatMessage {
            id: now,
            user: self.member.name.clone(),
            avatar: self.member.avatar.clone(),
            message: text.to_string(),
            timestamp: clock_label(now),
            channel: self.channel.id.to_string(),
        };
        self.connection.emit(ClientEvent::SendMessage(SendMessage {
            channel: self.channel.id.to_string(),
            message: message.clone(),
        }))?;
        // only a message that actually went out counts towards the rate limit
        self.window = window;
        self.mute = mute;
        Ok(SendOutcome::Sent(message))
    }

    /// Wait up to `timeout` for one server event and apply it.
    pub fn pump(&mut self, timeout: Duration) -> Option<ServerEvent> {
        let event = self.connection.poll(timeout)?;
        self.apply(&event);
        Some(event)
    }

    /// Apply every event that is already waiting.
    pub fn drain(&mut self) -> usize {
        let mut applied = 0;
        while self.pump(Duration::ZERO).is_some() {
            applied += 1;
        }
        applied
    }

    fn apply(&mut self, event: &ServerEvent) {
        match event {
            ServerEvent::ChatHistory(history) => self.messages = history.clone(),
            ServerEvent::NewMessage(message) => {
                if message.channel == self.channel.id {
                    self.messages.push(message.clone());
                }
            }
            ServerEvent::OnlineUsers(users) => self.online = users.clone(),
            ServerEvent::Banned => self.end(SessionStatus::Banned),
            ServerEvent::Kicked => self.end(SessionStatus::Kicked),
            ServerEvent::ErrorMessage(text) => {
                warn!("chat server error: {text}");
                self.last_error = Some(text.clone());
            }
        }
    }

    fn end(&mut self, status: SessionStatus) {
        info!("chat session for {} ended: {status:?}", self.member.id);
        self.status = status;
        self.connection.close();
    }

    pub fn ban(&mut self, target_id: &str) -> Result<()> {
        self.moderate(target_id, Capability::BanUser)
    }

    pub fn kick(&mut self, target_id: &str) -> Result<()> {
        self.moderate(target_id, Capability::KickUser)
    }

    pub fn grant_admin(&mut self, target_id: &str) -> Result<()> {
        self.moderate(target_id, Capability::GrantAdmin)
    }

    pub fn revoke_admin(&mut self, target_id: &str) -> Result<()> {
        self.moderate(target_id, Capability::RevokeAdmin)
    }

    fn moderate(&mut self, target_id: &str, capability: Capability) -> Result<()> {
        self.ensure_active()?;
        let idx = self
            .online
            .iter()
            .position(|m| m.id == target_id)
            .ok_or_else(|| Error::UnknownMember(target_id.to_string()))?;
        if !can_act_on(&self.member, &self.online[idx], capability) {
            return Err(Error::NotPermitted {
                role: self.member.role,
                capability,
            });
        }

        match capability {
            Capability::BanUser => {
                self.connection.emit(ClientEvent::BanUser(target_id.to_string()))?;
                self.online.remove(idx);
            }
            Capability::KickUser => {
                self.connection.emit(ClientEvent::KickUser(target_id.to_string()))?;
                self.online.remove(idx);
            }
            Capability::GrantAdmin => self.online[idx].role = Role::Admin,
            Capability::RevokeAdmin => self.online[idx].role = Role::User,
            Capability::SendMessage | Capability::PostAnnouncement | Capability::ManageNotes => {
                return Err(Error::NotPermitted {
                    role: self.member.role,
                    capability,
                })
            }
        }
        info!("{} applied {capability} to {target_id}", self.member.id);
        Ok(())
    }

    /// Clear a lapsed mute and return the seconds still left on it.
    pub fn tick(&mut self, now: i64) -> u64 {
        self.mute.expire(now);
        self.mute.remaining_secs(now)
    }

    pub fn logout(&mut self) {
        if self.status == SessionStatus::Active {
            self.end(SessionStatus::LoggedOut);
        }
    }

    fn ensure_active(&self) -> Result<()> {
        if self.status == SessionStatus::Active && self.connection.is_open() {
            Ok(())
        } else {
            Err(Error::Disconnected)
        }
    }

    pub fn member(&self) -> &Member {
        &self.member
    }

    pub fn permissions(&self) -> &Permissions {
        &self.permissions
    }

    pub fn channel(&self) -> &Channel {
        self.channel
    }

    pub fn can_post_here(&self) -> bool {
        self.permissions.allows(self.channel.required_capability())
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn online_users(&self) -> &[Member] {
        &self.online
    }

    pub fn mute(&self) -> &MuteState {
        &self.mute
    }

    pub fn window(&self) -> &TimestampWindow {
        &self.window
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn connection(&self) -> &ChatConnection<T> {
        &self.connection
    }
}

fn clock_label(now: i64) -> String {
    Local
        .timestamp_millis_opt(now)
        .single()
        .map(|t| t.format("%H:%M").to_string())
        .unwrap_or_default()
}
