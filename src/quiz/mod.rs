pub mod attempt;
pub mod clocked;
pub mod question;
pub mod reward;
pub mod selector;

pub use attempt::{AnswerRecord, AttemptState, QuizAttempt, QUESTION_TIME_LIMIT_SECS};
pub use clocked::{ClockedAttempt, Turn};
pub use question::{Question, QuestionPool};
pub use reward::{reward_for, Activity, ActivityKind, Badge, QuizReward};
pub use selector::{
    day_key, parse_day_key, select_daily, today_utc, DailySelector, QuestionSelector,
    DAILY_QUESTION_COUNT,
};
