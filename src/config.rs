use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::app_dirs::AppDirs;
use crate::error::Result;
use crate::moderation::{AdmissionFilter, ModerationPolicy};
use crate::permissions::{Member, Role};
use crate::quiz::{QuestionPool, DAILY_QUESTION_COUNT, QUESTION_TIME_LIMIT_SECS};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub user_id: String,
    pub user_name: String,
    pub role: Role,
    pub question_count: usize,
    pub question_secs: u32,
    /// Question bank to use instead of the bundled one.
    pub question_pool: Option<PathBuf>,
    pub moderation: ModerationPolicy,
    /// Appended to the bundled blocklist.
    pub extra_blocked_words: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user_id: "local".to_string(),
            user_name: "student".to_string(),
            role: Role::User,
            question_count: DAILY_QUESTION_COUNT,
            question_secs: QUESTION_TIME_LIMIT_SECS,
            question_pool: None,
            moderation: ModerationPolicy::default(),
            extra_blocked_words: Vec::new(),
        }
    }
}

impl Config {
    pub fn member(&self) -> Member {
        Member::new(&self.user_id, &self.user_name, self.role)
    }

    pub fn question_pool(&self) -> Result<QuestionPool> {
        match &self.question_pool {
            Some(path) => QuestionPool::from_path(path),
            None => QuestionPool::builtin(),
        }
    }

    pub fn admission_filter(&self) -> Result<AdmissionFilter> {
        AdmissionFilter::with_builtin(self.moderation, &self.extra_blocked_words)
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new() -> Self {
        Self {
            path: AppDirs::config_path(),
        }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        if let Ok(bytes) = fs::read(&self.path) {
            match serde_json::from_slice::<Config>(&bytes) {
                Ok(cfg) => return cfg,
                Err(err) => warn!(
                    "ignoring unreadable config at {}: {err}",
                    self.path.display()
                ),
            }
        }
        Config::default()
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)
    }
}
