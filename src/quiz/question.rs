use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::assets::read_embedded;
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: u32,
    #[serde(alias = "question")]
    pub prompt: String,
    pub options: Vec<String>,
    #[serde(alias = "correctAnswer")]
    pub correct_option: usize,
}

impl Question {
    pub fn is_correct(&self, choice: usize) -> bool {
        choice == self.correct_option
    }

    pub fn correct_text(&self) -> Option<&str> {
        self.options.get(self.correct_option).map(String::as_str)
    }

    pub fn validate(&self) -> Result<()> {
        if self.options.len() < 2 {
            return Err(Error::InvalidQuestion {
                id: self.id,
                reason: "needs at least two options",
            });
        }
        if self.correct_option >= self.options.len() {
            return Err(Error::InvalidQuestion {
                id: self.id,
                reason: "correct option is out of range",
            });
        }
        Ok(())
    }
}

/// Ordered, immutable question bank the daily selection draws from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionPool {
    #[serde(default)]
    pub name: String,
    pub questions: Vec<Question>,
}

impl QuestionPool {
    pub fn new(name: impl Into<String>, questions: Vec<Question>) -> Result<Self> {
        let pool = Self {
            name: name.into(),
            questions,
        };
        pool.validate()?;
        Ok(pool)
    }

    /// The ten general-knowledge questions shipped with the binary.
    pub fn builtin() -> Result<Self> {
        let pool: Self = read_embedded("questions.json")?;
        pool.validate()?;
        Ok(pool)
    }

    /// Accepts either a `{ "name", "questions" }` document or a bare array.
    pub fn from_json(json: &str) -> Result<Self> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Document {
            Pool(QuestionPool),
            Bare(Vec<Question>),
        }

        let pool = match serde_json::from_str(json)? {
            Document::Pool(pool) => pool,
            Document::Bare(questions) => Self {
                name: String::new(),
                questions,
            },
        };
        pool.validate()?;
        Ok(pool)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<()> {
        self.questions.iter().try_for_each(Question::validate)
    }

    pub fn as_slice(&self) -> &[Question] {
        &self.questions
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}
