use serde::{Deserialize, Serialize};

pub const POINTS_PER_CORRECT: u32 = 3;
pub const EXPERIENCE_PER_CORRECT: u32 = 10;
/// Correct answers needed for a win and the quiz badge.
pub const WIN_THRESHOLD: u32 = 3;
pub const RECENT_ACTIVITY_LIMIT: usize = 10;
/// Experience needed for the next level when the backend does not say.
pub const DEFAULT_NEXT_LEVEL_EXP: u32 = 1_000;

pub const QUIZ_BADGE_ID: &str = "quiz_zeka";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
    pub id: String,
    pub name: String,
    pub icon: String,
    pub description: String,
    /// Day key the badge was earned on.
    pub earned: String,
}

impl Badge {
    pub fn quiz(day_key: &str) -> Self {
        Self {
            id: QUIZ_BADGE_ID.to_string(),
            name: "Zeka Küpü".to_string(),
            icon: "🧩".to_string(),
            description: "Günlük yarışmada 3+ doğru".to_string(),
            earned: day_key.to_string(),
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display, strum_macros::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ActivityKind {
    Quiz,
    Note,
    Chat,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub kind: ActivityKind,
    pub title: String,
    pub date: String,
}

/// Everything a completed daily quiz is worth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizReward {
    pub points: u32,
    pub experience: u32,
    pub win: bool,
    pub badge: Option<Badge>,
    pub activity: Activity,
}

pub fn reward_for(score: u32, total: usize, day_key: &str) -> QuizReward {
    let win = score >= WIN_THRESHOLD;
    QuizReward {
        points: score * POINTS_PER_CORRECT,
        experience: score * EXPERIENCE_PER_CORRECT,
        win,
        badge: win.then(|| Badge::quiz(day_key)),
        activity: Activity {
            kind: ActivityKind::Quiz,
            title: format!("Daily quiz completed ({score}/{total})"),
            date: day_key.to_string(),
        },
    }
}

/// Percentage towards the next level, capped at 100.
pub fn level_progress(experience: u32, next_level_exp: u32) -> f64 {
    if next_level_exp == 0 {
        return 100.0;
    }
    (f64::from(experience) / f64::from(next_level_exp) * 100.0).min(100.0)
}
