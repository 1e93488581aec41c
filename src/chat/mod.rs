pub mod channel;
pub mod connection;
pub mod events;
pub mod session;

pub use channel::{find_channel, Channel, CHANNELS, DEFAULT_CHANNEL};
pub use connection::{ChatConnection, LoopbackHandle, LoopbackTransport, Transport};
pub use events::{ChatMessage, ClientEvent, ServerEvent};
pub use session::{ChatSession, SendOutcome, SessionStatus};
