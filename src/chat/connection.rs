use log::{debug, info};
use std::collections::{HashMap, VecDeque};
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;

use super::events::{ChatMessage, ClientEvent, ServerEvent};
use crate::error::{Error, Result};
use crate::permissions::Member;

/// Real-time channel to the chat server.
pub trait Transport {
    fn emit(&mut self, event: ClientEvent) -> Result<()>;

    /// Block for up to `timeout` waiting for the next server event.
    fn recv_timeout(&mut self, timeout: Duration) -> Option<ServerEvent>;

    fn close(&mut self);
}

/// The one connection a chat session holds. Presence is announced once per
/// connection and re-joining the current channel is a no-op, so reconnect
/// paths can call these freely.
#[derive(Debug)]
pub struct ChatConnection<T: Transport> {
    transport: T,
    member: Member,
    announced: bool,
    channel: Option<String>,
    open: bool,
}

impl<T: Transport> ChatConnection<T> {
    pub fn open(transport: T, member: Member) -> Result<Self> {
        let mut conn = Self {
            transport,
            member,
            announced: false,
            channel: None,
            open: true,
        };
        conn.announce()?;
        info!("chat connection opened for {}", conn.member.id);
        Ok(conn)
    }

    /// Emit `userOnline` unless this connection already did. Returns whether
    /// anything was sent.
    pub fn announce(&mut self) -> Result<bool> {
        if self.announced {
            return Ok(false);
        }
        self.emit(ClientEvent::UserOnline(self.member.clone()))?;
        self.announced = true;
        Ok(true)
    }

    /// Join `channel` unless already in it. Returns whether anything was sent.
    pub fn join(&mut self, channel: &str) -> Result<bool> {
        if self.channel.as_deref() == Some(channel) {
            return Ok(false);
        }
        self.emit(ClientEvent::JoinChannel(channel.to_string()))?;
        self.channel = Some(channel.to_string());
        Ok(true)
    }

    pub fn emit(&mut self, event: ClientEvent) -> Result<()> {
        if !self.open {
            return Err(Error::Disconnected);
        }
        debug!("emit {}", event.name());
        self.transport.emit(event)
    }

    pub fn poll(&mut self, timeout: Duration) -> Option<ServerEvent> {
        if !self.open {
            return None;
        }
        self.transport.recv_timeout(timeout)
    }

    pub fn close(&mut self) {
        if self.open {
            self.transport.close();
            self.open = false;
            info!("chat connection closed for {}", self.member.id);
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn channel(&self) -> Option<&str> {
        self.channel.as_deref()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

impl<T: Transport> Drop for ChatConnection<T> {
    fn drop(&mut self) {
        self.close();
    }
}

/// In-process stand-in for the chat server: remembers who is online and
/// each channel's history, echoes sends back as `newMessage`, and lets a
/// [`LoopbackHandle`] push arbitrary server events.
#[derive(Debug)]
pub struct LoopbackTransport {
    pending: VecDeque<ServerEvent>,
    injected: Receiver<ServerEvent>,
    online: Vec<Member>,
    history: HashMap<String, Vec<ChatMessage>>,
    channel: Option<String>,
    emitted: Vec<ClientEvent>,
    closed: bool,
}

#[derive(Debug, Clone)]
pub struct LoopbackHandle {
    tx: Sender<ServerEvent>,
}

impl LoopbackHandle {
    /// Push an event as if the server sent it. Returns false once the
    /// transport is gone.
    pub fn push(&self, event: ServerEvent) -> bool {
        self.tx.send(event).is_ok()
    }
}

impl LoopbackTransport {
    pub fn pair() -> (Self, LoopbackHandle) {
        let (tx, rx) = mpsc::channel();
        let transport = Self {
            pending: VecDeque::new(),
            injected: rx,
            online: Vec::new(),
            history: HashMap::new(),
            channel: None,
            emitted: Vec::new(),
            closed: false,
        };
        (transport, LoopbackHandle { tx })
    }

    /// Every event emitted so far, oldest first.
    pub fn emitted(&self) -> &[ClientEvent] {
        &self.emitted
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn remove_member(&mut self, id: &str) {
        self.online.retain(|m| m.id != id);
        self.pending
            .push_back(ServerEvent::OnlineUsers(self.online.clone()));
    }
}

impl Transport for LoopbackTransport {
    fn emit(&mut self, event: ClientEvent) -> Result<()> {
        if self.closed {
            return Err(Error::Disconnected);
        }
        self.emitted.push(event.clone());
        match event {
            ClientEvent::UserOnline(member) => {
                self.online.retain(|m| m.id != member.id);
                self.online.push(member);
                self.pending
                    .push_back(ServerEvent::OnlineUsers(self.online.clone()));
            }
            ClientEvent::JoinChannel(channel) => {
                let history = self.history.get(&channel).cloned().unwrap_or_default();
                self.pending.push_back(ServerEvent::ChatHistory(history));
                self.channel = Some(channel);
            }
            ClientEvent::SendMessage(send) => {
                self.history
                    .entry(send.channel.clone())
                    .or_default()
                    .push(send.message.clone());
                if self.channel.as_deref() == Some(send.channel.as_str()) {
                    self.pending.push_back(ServerEvent::NewMessage(send.message));
                }
            }
            ClientEvent::BanUser(id) | ClientEvent::KickUser(id) => self.remove_member(&id),
        }
        Ok(())
    }

    fn recv_timeout(&mut self, timeout: Duration) -> Option<ServerEvent> {
        if let Some(event) = self.pending.pop_front() {
            return Some(event);
        }
        self.injected.recv_timeout(timeout).ok()
    }

    fn close(&mut self) {
        self.closed = true;
        self.pending.clear();
    }
}
