use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use super::blocklist::Blocklist;
use super::mute::{MuteReason, MuteState};
use super::window::TimestampWindow;
use crate::error::Result;

pub const SPAM_WINDOW_MS: i64 = 5_000;
pub const SPAM_THRESHOLD: usize = 2;
pub const SPAM_MUTE_MS: i64 = 30_000;
pub const PROFANITY_MUTE_MS: i64 = 120_000;

/// Timing knobs of the admission filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModerationPolicy {
    pub spam_window_ms: i64,
    /// Accepted sends inside the window that make the next one spam.
    pub spam_threshold: usize,
    pub spam_mute_ms: i64,
    pub profanity_mute_ms: i64,
}

impl Default for ModerationPolicy {
    fn default() -> Self {
        Self {
            spam_window_ms: SPAM_WINDOW_MS,
            spam_threshold: SPAM_THRESHOLD,
            spam_mute_ms: SPAM_MUTE_MS,
            profanity_mute_ms: PROFANITY_MUTE_MS,
        }
    }
}

/// Outcome of [`AdmissionFilter::evaluate`]. Both variants carry the state the
/// caller should store for the next attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Accepted {
        window: TimestampWindow,
        mute: MuteState,
    },
    Rejected {
        reason: String,
        window: TimestampWindow,
        mute: MuteState,
    },
}

impl Decision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Decision::Accepted { .. })
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Decision::Accepted { .. } => None,
            Decision::Rejected { reason, .. } => Some(reason),
        }
    }

    pub fn window(&self) -> &TimestampWindow {
        match self {
            Decision::Accepted { window, .. } | Decision::Rejected { window, .. } => window,
        }
    }

    pub fn mute(&self) -> &MuteState {
        match self {
            Decision::Accepted { mute, .. } | Decision::Rejected { mute, .. } => mute,
        }
    }

    pub fn into_state(self) -> (TimestampWindow, MuteState) {
        match self {
            Decision::Accepted { window, mute } | Decision::Rejected { window, mute, .. } => {
                (window, mute)
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AdmissionFilter {
    policy: ModerationPolicy,
    blocklist: Blocklist,
}

impl AdmissionFilter {
    pub fn new(policy: ModerationPolicy, blocklist: Blocklist) -> Self {
        Self { policy, blocklist }
    }

    /// Filter with the bundled blocklist plus any `extra_words`.
    pub fn with_builtin<I, S>(policy: ModerationPolicy, extra_words: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut blocklist = Blocklist::builtin()?;
        blocklist.extend(extra_words);
        Ok(Self::new(policy, blocklist))
    }

    pub fn policy(&self) -> &ModerationPolicy {
        &self.policy
    }

    pub fn blocklist(&self) -> &Blocklist {
        &self.blocklist
    }

    /// Decide whether `text`, sent at `now`, goes out. Checks run in a fixed
    /// order: an active mute, then the rate limit, then the blocklist. The
    /// window only grows on acceptance.
    pub fn evaluate(
        &self,
        window: &TimestampWindow,
        mute: &MuteState,
        text: &str,
        now: i64,
    ) -> Decision {
        if mute.is_active(now) {
            return Decision::Rejected {
                reason: mute.reason.clone(),
                window: window.clone(),
                mute: mute.clone(),
            };
        }

        let recent = window.recent(now, self.policy.spam_window_ms);
        if recent >= self.policy.spam_threshold {
            info!("muting sender for spam: {recent} sends in the last window");
            return self.reject(window, now, self.policy.spam_mute_ms, MuteReason::Spam);
        }

        if let Some(word) = self.blocklist.find_in(text) {
            info!("muting sender for profanity");
            debug!("blocked word: {word:?}");
            return self.reject(
                window,
                now,
                self.policy.profanity_mute_ms,
                MuteReason::Profanity,
            );
        }

        Decision::Accepted {
            window: window.admit(now, self.policy.spam_window_ms),
            mute: mute.clone(),
        }
    }

    fn reject(
        &self,
        window: &TimestampWindow,
        now: i64,
        duration_ms: i64,
        reason: MuteReason,
    ) -> Decision {
        Decision::Rejected {
            reason: reason.to_string(),
            window: window.clone(),
            mute: MuteState::muted(now, duration_ms, reason),
        }
    }
}

fn default_filter() -> &'static AdmissionFilter {
    static FILTER: OnceLock<AdmissionFilter> = OnceLock::new();
    FILTER.get_or_init(|| {
        let blocklist = Blocklist::builtin().unwrap_or_else(|err| {
            warn!("bundled blocklist unavailable, filtering on rate only: {err}");
            Blocklist::default()
        });
        AdmissionFilter::new(ModerationPolicy::default(), blocklist)
    })
}

/// [`AdmissionFilter::evaluate`] with the default policy and bundled
/// blocklist.
pub fn evaluate(window: &TimestampWindow, mute: &MuteState, text: &str, now: i64) -> Decision {
    default_filter().evaluate(window, mute, text, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const T: i64 = 1_700_000_000_000;

    fn filter() -> AdmissionFilter {
        AdmissionFilter::new(ModerationPolicy::default(), Blocklist::new(["darn"]))
    }

    #[test]
    fn accepts_into_empty_window() {
        let decision = filter().evaluate(&TimestampWindow::new(), &MuteState::default(), "hello", T);
        assert_matches!(decision, Decision::Accepted { ref window, .. } if window.as_slice() == [T]);
    }

    #[test]
    fn third_send_within_window_is_spam() {
        let window = TimestampWindow::from(vec![T - 100, T - 50]);
        let decision = filter().evaluate(&window, &MuteState::default(), "hello", T);
        assert_matches!(
            decision,
            Decision::Rejected { ref reason, ref mute, window: ref w }
                if reason.contains("spam") && mute.mute_until == T + 30_000 && *w == window
        );
    }

    #[test]
    fn old_sends_do_not_count_toward_spam() {
        let window = TimestampWindow::from(vec![T - 9_000, T - 5_000, T - 100]);
        let decision = filter().evaluate(&window, &MuteState::default(), "hello", T);
        assert!(decision.is_accepted());
        assert_eq!(decision.window().as_slice(), &[T - 100, T]);
    }

    #[test]
    fn blocked_word_mutes_for_two_minutes() {
        let decision = filter().evaluate(&TimestampWindow::new(), &MuteState::default(), "DARN", T);
        assert_eq!(decision.reason(), Some("temporarily muted for profanity"));
        assert_eq!(decision.mute().mute_until, T + 120_000);
        assert!(decision.window().is_empty());
    }

    #[test]
    fn active_mute_short_circuits_everything() {
        let mute = MuteState::new(T + 1, "custom reason");
        let window = TimestampWindow::from(vec![T - 10, T - 5]);
        let decision = filter().evaluate(&window, &mute, "darn", T);
        assert_eq!(
            decision,
            Decision::Rejected {
                reason: "custom reason".to_string(),
                window,
                mute,
            }
        );
    }

    #[test]
    fn spam_is_checked_before_content() {
        let window = TimestampWindow::from(vec![T - 10, T - 5]);
        let decision = filter().evaluate(&window, &MuteState::default(), "darn", T);
        assert_eq!(decision.reason(), Some("temporarily muted for spam"));
    }

    #[test]
    fn lapsed_mute_lets_messages_through() {
        let mute = MuteState::new(T, "temporarily muted for spam");
        let decision = filter().evaluate(&TimestampWindow::new(), &mute, "hi", T);
        assert!(decision.is_accepted());
    }

    #[test]
    fn custom_policy_is_honoured() {
        let policy = ModerationPolicy {
            spam_threshold: 1,
            spam_mute_ms: 10,
            ..ModerationPolicy::default()
        };
        let filter = AdmissionFilter::new(policy, Blocklist::default());
        let window = TimestampWindow::from(vec![T - 1]);
        let decision = filter.evaluate(&window, &MuteState::default(), "hi", T);
        assert_eq!(decision.mute().mute_until, T + 10);
    }

    #[test]
    fn default_evaluate_uses_bundled_blocklist() {
        let decision = evaluate(&TimestampWindow::new(), &MuteState::default(), "sen bir salaksın", T);
        assert!(!decision.is_accepted());
        let decision = evaluate(&TimestampWindow::new(), &MuteState::default(), "merhaba", T);
        assert!(decision.is_accepted());
    }

    #[test]
    fn policy_deserializes_partially() {
        let policy: ModerationPolicy = serde_json::from_str(r#"{"spam_mute_ms": 1000}"#).unwrap();
        assert_eq!(policy.spam_mute_ms, 1_000);
        assert_eq!(policy.spam_window_ms, SPAM_WINDOW_MS);
    }
}
