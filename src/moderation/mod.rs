pub mod blocklist;
pub mod filter;
pub mod mute;
pub mod window;

pub use blocklist::Blocklist;
pub use filter::{evaluate, AdmissionFilter, Decision, ModerationPolicy};
pub use mute::{MuteReason, MuteState};
pub use window::TimestampWindow;
