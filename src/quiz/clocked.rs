use std::time::Instant;

use super::attempt::{AnswerRecord, QuizAttempt};
use super::question::Question;
use crate::error::Error;
use crate::runtime::{InputEvent, SecondCounter};

/// What one input event did to a running attempt.
#[derive(Debug)]
pub enum Turn {
    /// Nothing to report; keep waiting.
    Waiting,
    Answered { question: Question, record: AnswerRecord },
    /// The clock ran out. `late_input` is set when the event was an answer
    /// that arrived after the deadline and was discarded.
    TimedOut {
        question: Question,
        record: AnswerRecord,
        late_input: bool,
    },
    /// The line was not an option number.
    Unreadable(String),
    /// The option number did not fit the question.
    Refused(Error),
    /// Input ended before the attempt did.
    Abandoned,
}

/// A [`QuizAttempt`] whose countdown follows the wall clock instead of the
/// number of events seen, so typing does not hold the timer back.
#[derive(Debug)]
pub struct ClockedAttempt {
    attempt: QuizAttempt,
    clock: SecondCounter,
}

impl ClockedAttempt {
    /// Wrap an attempt that has already been started.
    pub fn new(attempt: QuizAttempt, now: Instant) -> Self {
        Self {
            attempt,
            clock: SecondCounter::new(now),
        }
    }

    /// Options are numbered from 1 on input.
    pub fn handle(&mut self, event: InputEvent, now: Instant) -> Turn {
        let Some(question) = self.attempt.current_question().cloned() else {
            return Turn::Waiting;
        };

        if let Some(record) = self.attempt.tick(self.clock.take(now)) {
            self.clock.reset(now);
            return Turn::TimedOut {
                question,
                record,
                late_input: matches!(event, InputEvent::Line(_)),
            };
        }

        match event {
            InputEvent::Tick => Turn::Waiting,
            InputEvent::Eof => Turn::Abandoned,
            InputEvent::Line(line) => match line.trim().parse::<usize>() {
                Ok(n) if n >= 1 => match self.attempt.answer(Some(n - 1)) {
                    Ok(record) => {
                        self.clock.reset(now);
                        Turn::Answered { question, record }
                    }
                    Err(e) => Turn::Refused(e),
                },
                _ => Turn::Unreadable(line),
            },
        }
    }

    pub fn attempt(&self) -> &QuizAttempt {
        &self.attempt
    }

    pub fn into_attempt(self) -> QuizAttempt {
        self.attempt
    }
}
