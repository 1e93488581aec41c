use chrono::NaiveDate;
use log::debug;

use super::question::Question;
use crate::error::{Error, Result};

/// Seconds allowed per question before it counts as unanswered.
pub const QUESTION_TIME_LIMIT_SECS: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    NotStarted,
    InProgress { question_index: usize, score: u32 },
    Completed { score: u32 },
    AlreadySolvedToday,
}

/// What happened to one question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerRecord {
    pub question_id: u32,
    /// `None` when the timer ran out.
    pub choice: Option<usize>,
    pub correct: bool,
}

/// One user's run through one day's selection.
#[derive(Debug, Clone)]
pub struct QuizAttempt {
    day: NaiveDate,
    questions: Vec<Question>,
    state: AttemptState,
    time_limit_secs: u32,
    time_left_secs: u32,
    answers: Vec<AnswerRecord>,
}

impl QuizAttempt {
    pub fn new(day: NaiveDate, questions: Vec<Question>) -> Self {
        Self::with_time_limit(day, questions, QUESTION_TIME_LIMIT_SECS)
    }

    pub fn with_time_limit(day: NaiveDate, questions: Vec<Question>, time_limit_secs: u32) -> Self {
        Self {
            day,
            questions,
            state: AttemptState::NotStarted,
            time_limit_secs,
            time_left_secs: time_limit_secs,
            answers: Vec::new(),
        }
    }

    /// Leave `NotStarted`. A user whose last solved day is this attempt's day
    /// lands in `AlreadySolvedToday` and can go no further.
    pub fn start(&mut self, last_solved: Option<NaiveDate>) -> AttemptState {
        if self.state != AttemptState::NotStarted {
            return self.state;
        }
        self.state = if last_solved == Some(self.day) {
            AttemptState::AlreadySolvedToday
        } else if self.questions.is_empty() {
            AttemptState::Completed { score: 0 }
        } else {
            AttemptState::InProgress {
                question_index: 0,
                score: 0,
            }
        };
        self.time_left_secs = self.time_limit_secs;
        self.state
    }

    /// Answer the current question; `None` records a timeout.
    pub fn answer(&mut self, choice: Option<usize>) -> Result<AnswerRecord> {
        let AttemptState::InProgress {
            question_index,
            score,
        } = self.state
        else {
            return Err(Error::AttemptNotInProgress);
        };

        let question = &self.questions[question_index];
        if let Some(choice) = choice {
            if choice >= question.options.len() {
                return Err(Error::InvalidChoice {
                    id: question.id,
                    choice,
                });
            }
        }

        let correct = choice.is_some_and(|c| question.is_correct(c));
        let record = AnswerRecord {
            question_id: question.id,
            choice,
            correct,
        };
        debug!(
            "question {} answered with {:?} (correct: {correct})",
            question.id, choice
        );

        let score = score + u32::from(correct);
        let next = question_index + 1;
        self.state = if next < self.questions.len() {
            AttemptState::InProgress {
                question_index: next,
                score,
            }
        } else {
            AttemptState::Completed { score }
        };
        self.time_left_secs = self.time_limit_secs;
        self.answers.push(record.clone());
        Ok(record)
    }

    /// Count down the current question's timer. When it reaches zero the
    /// question is answered with no choice and that record is returned.
    pub fn tick(&mut self, elapsed_secs: u32) -> Option<AnswerRecord> {
        if !matches!(self.state, AttemptState::InProgress { .. }) {
            return None;
        }
        self.time_left_secs = self.time_left_secs.saturating_sub(elapsed_secs);
        if self.time_left_secs == 0 {
            return self.answer(None).ok();
        }
        None
    }

    pub fn current_question(&self) -> Option<&Question> {
        match self.state {
            AttemptState::InProgress { question_index, .. } => self.questions.get(question_index),
            _ => None,
        }
    }

    pub fn state(&self) -> AttemptState {
        self.state
    }

    pub fn day(&self) -> NaiveDate {
        self.day
    }

    pub fn score(&self) -> u32 {
        match self.state {
            AttemptState::InProgress { score, .. } | AttemptState::Completed { score } => score,
            AttemptState::NotStarted | AttemptState::AlreadySolvedToday => 0,
        }
    }

    pub fn final_score(&self) -> Option<u32> {
        match self.state {
            AttemptState::Completed { score } => Some(score),
            _ => None,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(
            self.state,
            AttemptState::Completed { .. } | AttemptState::AlreadySolvedToday
        )
    }

    pub fn time_left_secs(&self) -> u32 {
        self.time_left_secs
    }

    pub fn total(&self) -> usize {
        self.questions.len()
    }

    pub fn answers(&self) -> &[AnswerRecord] {
        &self.answers
    }
}
