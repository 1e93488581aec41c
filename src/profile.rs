use chrono::{Local, NaiveDate};
use log::info;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::app_dirs::AppDirs;
use crate::error::Result;
use crate::permissions::Role;
use crate::quiz::reward::{reward_for, Activity, ActivityKind, Badge, QuizReward, RECENT_ACTIVITY_LIMIT};
use crate::quiz::selector::{day_key, parse_day_key};

/// Gamification state of one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub user_id: String,
    pub name: String,
    pub role: Role,
    pub total_points: u32,
    pub experience: u32,
    pub quiz_wins: u32,
    /// Day key of the last completed daily quiz.
    pub quiz_last_solved: Option<String>,
    pub badges: Vec<Badge>,
    /// Newest first.
    pub recent_activity: Vec<Activity>,
}

impl Profile {
    pub fn new(user_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            name: name.into(),
            role: Role::User,
            total_points: 0,
            experience: 0,
            quiz_wins: 0,
            quiz_last_solved: None,
            badges: Vec::new(),
            recent_activity: Vec::new(),
        }
    }

    pub fn last_solved_day(&self) -> Option<NaiveDate> {
        self.quiz_last_solved
            .as_deref()
            .and_then(|key| parse_day_key(key).ok())
    }

    pub fn has_badge(&self, id: &str) -> bool {
        self.badges.iter().any(|b| b.id == id)
    }

    /// Credit a finished daily quiz. Returns `None` without touching anything
    /// when `day` was already credited.
    pub fn apply_quiz_result(&mut self, day: NaiveDate, score: u32, total: usize) -> Option<QuizReward> {
        if self.last_solved_day() == Some(day) {
            return None;
        }
        let key = day_key(day);
        let reward = reward_for(score, total, &key);

        self.total_points += reward.points;
        self.experience += reward.experience;
        if reward.win {
            self.quiz_wins += 1;
        }
        if let Some(badge) = &reward.badge {
            if !self.has_badge(&badge.id) {
                self.badges.push(badge.clone());
            }
        }
        self.recent_activity.insert(0, reward.activity.clone());
        self.recent_activity.truncate(RECENT_ACTIVITY_LIMIT);
        self.quiz_last_solved = Some(key);
        Some(reward)
    }
}

/// One stored daily quiz result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuizRecord {
    pub user_id: String,
    pub day: String,
    pub score: u32,
    pub total: u32,
    pub recorded_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub name: String,
    pub score: u32,
    pub total: u32,
}

/// SQLite-backed store for profiles and quiz results
#[derive(Debug)]
pub struct ProfileDb {
    conn: Connection,
}

impl ProfileDb {
    /// Open the store at its default location, creating it if needed.
    pub fn open_default() -> Result<Self> {
        let path = AppDirs::db_path().unwrap_or_else(|| PathBuf::from("notarium_profile.db"));
        Self::open(path)
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        info!("opened profile store at {}", path.display());
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS profiles (
                user_id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                role TEXT NOT NULL DEFAULT 'user',
                total_points INTEGER NOT NULL DEFAULT 0,
                experience INTEGER NOT NULL DEFAULT 0,
                quiz_wins INTEGER NOT NULL DEFAULT 0,
                quiz_last_solved TEXT
            );

            CREATE TABLE IF NOT EXISTS badges (
                user_id TEXT NOT NULL,
                badge_id TEXT NOT NULL,
                name TEXT NOT NULL,
                icon TEXT NOT NULL,
                description TEXT NOT NULL,
                earned TEXT NOT NULL,
                PRIMARY KEY (user_id, badge_id)
            );

            CREATE TABLE IF NOT EXISTS activity (
                user_id TEXT NOT NULL,
                position INTEGER NOT NULL,
                kind TEXT NOT NULL,
                title TEXT NOT NULL,
                date TEXT NOT NULL,
                PRIMARY KEY (user_id, position)
            );

            CREATE TABLE IF NOT EXISTS quiz_results (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                day TEXT NOT NULL,
                score INTEGER NOT NULL,
                total INTEGER NOT NULL,
                recorded_at TEXT NOT NULL,
                UNIQUE (user_id, day)
            );

            CREATE INDEX IF NOT EXISTS idx_quiz_results_day ON quiz_results(day);
            "#,
        )?;
        Ok(Self { conn })
    }

    pub fn load(&self, user_id: &str) -> Result<Option<Profile>> {
        let profile = self
            .conn
            .query_row(
                r#"
                SELECT user_id, name, role, total_points, experience, quiz_wins, quiz_last_solved
                FROM profiles
                WHERE user_id = ?1
                "#,
                [user_id],
                |row| {
                    Ok(Profile {
                        user_id: row.get(0)?,
                        name: row.get(1)?,
                        role: parse_text_column(row, 2)?,
                        total_points: row.get(3)?,
                        experience: row.get(4)?,
                        quiz_wins: row.get(5)?,
                        quiz_last_solved: row.get(6)?,
                        badges: Vec::new(),
                        recent_activity: Vec::new(),
                    })
                },
            )
            .optional()?;

        let Some(mut profile) = profile else {
            return Ok(None);
        };

        let mut stmt = self.conn.prepare(
            "SELECT badge_id, name, icon, description, earned FROM badges WHERE user_id = ?1 ORDER BY earned, badge_id",
        )?;
        profile.badges = stmt
            .query_map([user_id], |row| {
                Ok(Badge {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    icon: row.get(2)?,
                    description: row.get(3)?,
                    earned: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<_>>()?;

        let mut stmt = self.conn.prepare(
            "SELECT kind, title, date FROM activity WHERE user_id = ?1 ORDER BY position",
        )?;
        profile.recent_activity = stmt
            .query_map([user_id], |row| {
                Ok(Activity {
                    kind: parse_text_column(row, 0)?,
                    title: row.get(1)?,
                    date: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<_>>()?;

        Ok(Some(profile))
    }

    pub fn load_or_create(&mut self, user_id: &str, name: &str) -> Result<Profile> {
        if let Some(profile) = self.load(user_id)? {
            return Ok(profile);
        }
        let profile = Profile::new(user_id, name);
        self.save(&profile)?;
        Ok(profile)
    }

    pub fn save(&mut self, profile: &Profile) -> Result<()> {
        let tx = self.conn.transaction()?;
        write_profile(&tx, profile)?;
        tx.commit()?;
        Ok(())
    }

    /// Credit a finished daily quiz to `profile` and persist both the result
    /// and the updated profile. A day that was already credited is left alone
    /// and yields `None`. `profile` is only updated once the write commits.
    pub fn record_quiz(
        &mut self,
        profile: &mut Profile,
        day: NaiveDate,
        score: u32,
        total: usize,
    ) -> Result<Option<QuizReward>> {
        let mut updated = profile.clone();
        let Some(reward) = updated.apply_quiz_result(day, score, total) else {
            return Ok(None);
        };

        let tx = self.conn.transaction()?;
        tx.execute(
            r#"
            INSERT OR IGNORE INTO quiz_results (user_id, day, score, total, recorded_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                updated.user_id,
                day_key(day),
                score,
                total as u32,
                Local::now().to_rfc3339(),
            ],
        )?;
        write_profile(&tx, &updated)?;
        tx.commit()?;
        *profile = updated;

        info!(
            "recorded quiz for {} on {}: {score}/{total}",
            profile.user_id,
            day_key(day)
        );
        Ok(Some(reward))
    }

    /// A user's results, newest day first.
    pub fn history(&self, user_id: &str) -> Result<Vec<QuizRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT user_id, day, score, total, recorded_at
            FROM quiz_results
            WHERE user_id = ?1
            ORDER BY day DESC
            "#,
        )?;
        let records = stmt
            .query_map([user_id], |row| {
                Ok(QuizRecord {
                    user_id: row.get(0)?,
                    day: row.get(1)?,
                    score: row.get(2)?,
                    total: row.get(3)?,
                    recorded_at: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<_>>()?;
        Ok(records)
    }

    /// Best scores of a day; ties go to whoever finished first.
    pub fn leaderboard(&self, day: NaiveDate, limit: usize) -> Result<Vec<LeaderboardEntry>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT COALESCE(p.name, r.user_id), r.score, r.total
            FROM quiz_results r
            LEFT JOIN profiles p ON p.user_id = r.user_id
            WHERE r.day = ?1
            ORDER BY r.score DESC, r.recorded_at ASC
            LIMIT ?2
            "#,
        )?;
        let entries = stmt
            .query_map(params![day_key(day), limit as i64], |row| {
                Ok(LeaderboardEntry {
                    name: row.get(0)?,
                    score: row.get(1)?,
                    total: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<_>>()?;
        Ok(entries)
    }

    /// Write a user's history as CSV with a header row. Returns the number of
    /// records written.
    pub fn export_history_csv<W: Write>(&self, user_id: &str, writer: W) -> Result<usize> {
        let records = self.history(user_id)?;
        let mut csv = csv::Writer::from_writer(writer);
        for record in &records {
            csv.serialize(record)?;
        }
        csv.flush()?;
        Ok(records.len())
    }
}

fn write_profile(conn: &Connection, profile: &Profile) -> rusqlite::Result<()> {
    conn.execute(
        r#"
        INSERT INTO profiles (user_id, name, role, total_points, experience, quiz_wins, quiz_last_solved)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ON CONFLICT(user_id) DO UPDATE SET
            name = excluded.name,
            role = excluded.role,
            total_points = excluded.total_points,
            experience = excluded.experience,
            quiz_wins = excluded.quiz_wins,
            quiz_last_solved = excluded.quiz_last_solved
        "#,
        params![
            profile.user_id,
            profile.name,
            profile.role.to_string(),
            profile.total_points,
            profile.experience,
            profile.quiz_wins,
            profile.quiz_last_solved,
        ],
    )?;

    conn.execute("DELETE FROM badges WHERE user_id = ?1", [&profile.user_id])?;
    for badge in &profile.badges {
        conn.execute(
            "INSERT INTO badges (user_id, badge_id, name, icon, description, earned) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                profile.user_id,
                badge.id,
                badge.name,
                badge.icon,
                badge.description,
                badge.earned,
            ],
        )?;
    }

    conn.execute("DELETE FROM activity WHERE user_id = ?1", [&profile.user_id])?;
    for (position, activity) in profile.recent_activity.iter().enumerate() {
        conn.execute(
            "INSERT INTO activity (user_id, position, kind, title, date) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                profile.user_id,
                position as i64,
                activity.kind.to_string(),
                activity.title,
                activity.date,
            ],
        )?;
    }
    Ok(())
}

pub(crate) fn parse_text_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let text: String = row.get(idx)?;
    text.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e)))
}
