use serde::{Deserialize, Serialize};
use std::fmt;

/// Why the filter muted a sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MuteReason {
    Spam,
    Profanity,
}

impl MuteReason {
    pub fn as_str(self) -> &'static str {
        match self {
            MuteReason::Spam => "temporarily muted for spam",
            MuteReason::Profanity => "temporarily muted for profanity",
        }
    }
}

impl fmt::Display for MuteReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Local cooldown. `mute_until == 0` means not muted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MuteState {
    pub mute_until: i64,
    pub reason: String,
}

impl MuteState {
    pub fn new(mute_until: i64, reason: impl Into<String>) -> Self {
        Self {
            mute_until,
            reason: reason.into(),
        }
    }

    pub fn muted(now: i64, duration_ms: i64, reason: MuteReason) -> Self {
        Self::new(now.saturating_add(duration_ms), reason.as_str())
    }

    pub fn is_active(&self, now: i64) -> bool {
        self.mute_until > now
    }

    pub fn remaining_ms(&self, now: i64) -> i64 {
        self.mute_until.saturating_sub(now).max(0)
    }

    /// Whole seconds left, rounded up, as shown in the countdown.
    pub fn remaining_secs(&self, now: i64) -> u64 {
        let ms = self.remaining_ms(now) as u64;
        ms.div_ceil(1_000)
    }

    /// Reset to "not muted" once the mute has run out. Returns true when a
    /// lapsed mute was cleared.
    pub fn expire(&mut self, now: i64) -> bool {
        if self.mute_until != 0 && !self.is_active(now) {
            *self = Self::default();
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_not_muted() {
        let mute = MuteState::default();
        assert!(!mute.is_active(0));
        assert_eq!(mute.remaining_secs(0), 0);
    }

    #[test]
    fn countdown_rounds_up() {
        let mute = MuteState::muted(1_000, 30_000, MuteReason::Spam);
        assert_eq!(mute.mute_until, 31_000);
        assert_eq!(mute.remaining_secs(1_000), 30);
        assert_eq!(mute.remaining_secs(1_001), 30);
        assert_eq!(mute.remaining_secs(30_001), 1);
        assert_eq!(mute.remaining_secs(31_000), 0);
        assert_eq!(mute.remaining_secs(99_000), 0);
    }

    #[test]
    fn expire_clears_only_lapsed_mutes() {
        let mut mute = MuteState::muted(0, 120_000, MuteReason::Profanity);
        assert!(!mute.expire(119_999));
        assert!(mute.is_active(119_999));
        assert!(mute.expire(120_000));
        assert_eq!(mute, MuteState::default());
        assert!(!mute.expire(200_000));
    }

    #[test]
    fn reason_text() {
        assert!(MuteReason::Spam.to_string().contains("spam"));
        assert!(MuteReason::Profanity.to_string().contains("profanity"));
    }
}
