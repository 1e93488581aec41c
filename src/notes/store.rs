use chrono::NaiveDate;
use log::info;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};

use super::catalog::{default_subjects, new_subject, toggled_likes, NewNote, Note, NoteQuery, Subject, ALL_SUBJECTS};
use crate::app_dirs::AppDirs;
use crate::error::{Error, Result};
use crate::permissions::{has_capability, Capability, Member};
use crate::profile::parse_text_column;
use crate::quiz::day_key;

const NOTE_COLUMNS: &str =
    "id, title, subject, author, date, downloads, views, likes, description, tags, drive_link";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Counter {
    Downloads,
    Views,
}

/// Shared notes, their subjects and who liked what. Lives in the same
/// SQLite file as the profile store.
#[derive(Debug)]
pub struct NotesDb {
    conn: Connection,
}

impl NotesDb {
    pub fn open_default() -> Result<Self> {
        let path = AppDirs::db_path().unwrap_or_else(|| PathBuf::from("notarium_profile.db"));
        Self::open(path)
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(mut conn: Connection) -> Result<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS note_subjects (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                position INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS notes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                subject TEXT NOT NULL,
                author TEXT NOT NULL,
                date TEXT NOT NULL,
                downloads INTEGER NOT NULL DEFAULT 0,
                views INTEGER NOT NULL DEFAULT 0,
                likes INTEGER NOT NULL DEFAULT 0,
                description TEXT NOT NULL,
                tags TEXT NOT NULL DEFAULT '[]',
                drive_link TEXT NOT NULL DEFAULT ''
            );

            CREATE TABLE IF NOT EXISTS note_likes (
                user_id TEXT NOT NULL,
                note_id INTEGER NOT NULL,
                PRIMARY KEY (user_id, note_id)
            );
            "#,
        )?;

        let seeded: i64 = conn.query_row("SELECT COUNT(*) FROM note_subjects", [], |row| row.get(0))?;
        if seeded == 0 {
            let tx = conn.transaction()?;
            for (position, subject) in default_subjects()?.iter().enumerate() {
                tx.execute(
                    "INSERT INTO note_subjects (id, name, position) VALUES (?1, ?2, ?3)",
                    params![subject.id, subject.name, position as i64],
                )?;
            }
            tx.commit()?;
        }
        Ok(Self { conn })
    }

    pub fn subjects(&self) -> Result<Vec<Subject>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM note_subjects ORDER BY position")?;
        let subjects = stmt
            .query_map([], |row| {
                Ok(Subject {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<_>>()?;
        Ok(subjects)
    }

    pub fn add_subject(&mut self, actor: &Member, name: &str) -> Result<Subject> {
        require(actor, Capability::ManageNotes)?;
        let subject = new_subject(name, &self.subjects()?)?;
        if self.subject_exists(&subject.id)? {
            return Err(Error::DuplicateSubject(subject.name));
        }
        self.conn.execute(
            r#"
            INSERT INTO note_subjects (id, name, position)
            VALUES (?1, ?2, (SELECT COALESCE(MAX(position), -1) + 1 FROM note_subjects))
            "#,
            params![subject.id, subject.name],
        )?;
        info!("{} added note subject {}", actor.id, subject.id);
        Ok(subject)
    }

    fn subject_exists(&self, id: &str) -> Result<bool> {
        let found = self
            .conn
            .query_row("SELECT 1 FROM note_subjects WHERE id = ?1", [id], |_| Ok(()))
            .optional()?;
        Ok(found.is_some())
    }

    /// Every note, most recently shared first.
    pub fn notes(&self) -> Result<Vec<Note>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {NOTE_COLUMNS} FROM notes ORDER BY id DESC"))?;
        let notes = stmt.query_map([], note_from_row)?.collect::<rusqlite::Result<_>>()?;
        Ok(notes)
    }

    pub fn list(&self, query: &NoteQuery) -> Result<Vec<Note>> {
        let notes = self.notes()?;
        Ok(query.apply(&notes).into_iter().cloned().collect())
    }

    pub fn get(&self, id: i64) -> Result<Note> {
        self.conn
            .query_row(
                &format!("SELECT {NOTE_COLUMNS} FROM notes WHERE id = ?1"),
                [id],
                note_from_row,
            )
            .optional()?
            .ok_or(Error::UnknownNote(id))
    }

    pub fn add_note(&mut self, actor: &Member, new: NewNote, date: NaiveDate) -> Result<Note> {
        require(actor, Capability::ManageNotes)?;
        new.validate()?;
        if new.subject == ALL_SUBJECTS || !self.subject_exists(&new.subject)? {
            return Err(Error::UnknownSubject(new.subject));
        }

        let draft = new.into_note(0, &actor.name, date)?;
        let tags = serde_json::to_string(&draft.tags)?;
        self.conn.execute(
            r#"
            INSERT INTO notes (title, subject, author, date, description, tags, drive_link)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                draft.title,
                draft.subject,
                draft.author,
                day_key(draft.date),
                draft.description,
                tags,
                draft.drive_link,
            ],
        )?;
        let note = Note {
            id: self.conn.last_insert_rowid(),
            ..draft
        };
        info!("{} shared note {} in {}", actor.id, note.id, note.subject);
        Ok(note)
    }

    pub fn delete_note(&mut self, actor: &Member, id: i64) -> Result<()> {
        require(actor, Capability::ManageNotes)?;
        let tx = self.conn.transaction()?;
        let removed = tx.execute("DELETE FROM notes WHERE id = ?1", [id])?;
        if removed == 0 {
            return Err(Error::UnknownNote(id));
        }
        tx.execute("DELETE FROM note_likes WHERE note_id = ?1", [id])?;
        tx.commit()?;
        info!("{} deleted note {id}", actor.id);
        Ok(())
    }

    /// Like or unlike `id` for `user_id`. Returns whether the user now likes
    /// the note and its new like count.
    pub fn toggle_like(&mut self, user_id: &str, id: i64) -> Result<(bool, u32)> {
        let tx = self.conn.transaction()?;
        let likes: u32 = tx
            .query_row("SELECT likes FROM notes WHERE id = ?1", [id], |row| row.get(0))
            .optional()?
            .ok_or(Error::UnknownNote(id))?;
        let was_liked = tx
            .query_row(
                "SELECT 1 FROM note_likes WHERE user_id = ?1 AND note_id = ?2",
                params![user_id, id],
                |_| Ok(()),
            )
            .optional()?
            .is_some();

        if was_liked {
            tx.execute(
                "DELETE FROM note_likes WHERE user_id = ?1 AND note_id = ?2",
                params![user_id, id],
            )?;
        } else {
            tx.execute(
                "INSERT INTO note_likes (user_id, note_id) VALUES (?1, ?2)",
                params![user_id, id],
            )?;
        }
        let likes = toggled_likes(likes, was_liked);
        tx.execute("UPDATE notes SET likes = ?1 WHERE id = ?2", params![likes, id])?;
        tx.commit()?;
        Ok((!was_liked, likes))
    }

    pub fn liked_by(&self, user_id: &str) -> Result<Vec<i64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT note_id FROM note_likes WHERE user_id = ?1 ORDER BY note_id")?;
        let ids = stmt
            .query_map([user_id], |row| row.get(0))?
            .collect::<rusqlite::Result<_>>()?;
        Ok(ids)
    }

    /// Count a download and return the note for its link.
    pub fn download(&mut self, id: i64) -> Result<Note> {
        self.bump(id, Counter::Downloads)
    }

    /// Count a view and return the note.
    pub fn view(&mut self, id: i64) -> Result<Note> {
        self.bump(id, Counter::Views)
    }

    fn bump(&mut self, id: i64, counter: Counter) -> Result<Note> {
        let sql = match counter {
            Counter::Downloads => "UPDATE notes SET downloads = downloads + 1 WHERE id = ?1",
            Counter::Views => "UPDATE notes SET views = views + 1 WHERE id = ?1",
        };
        if self.conn.execute(sql, [id])? == 0 {
            return Err(Error::UnknownNote(id));
        }
        self.get(id)
    }
}

fn require(actor: &Member, capability: Capability) -> Result<()> {
    if has_capability(actor, capability) {
        Ok(())
    } else {
        Err(Error::NotPermitted {
            role: actor.role,
            capability,
        })
    }
}

fn note_from_row(row: &Row<'_>) -> rusqlite::Result<Note> {
    let tags: String = row.get(9)?;
    let tags = serde_json::from_str(&tags).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(9, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(Note {
        id: row.get(0)?,
        title: row.get(1)?,
        subject: row.get(2)?,
        author: row.get(3)?,
        date: parse_text_column(row, 4)?,
        downloads: row.get(5)?,
        views: row.get(6)?,
        likes: row.get(7)?,
        description: row.get(8)?,
        tags,
        drive_link: row.get(10)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notes::NoteSort;
    use crate::permissions::Role;
    use assert_matches::assert_matches;

    fn admin() -> Member {
        Member::new("a", "Hoca", Role::Admin)
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn share(db: &mut NotesDb, title: &str, subject: &str, d: u32) -> Note {
        let new = NewNote {
            title: title.into(),
            subject: subject.into(),
            description: format!("{title} özeti"),
            tags: "vize, final".into(),
            drive_link: String::new(),
        };
        db.add_note(&admin(), new, day(d)).unwrap()
    }

    #[test]
    fn subjects_are_seeded_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.db");
        let count = NotesDb::open(&path).unwrap().subjects().unwrap().len();
        assert!(count > 1);
        assert_eq!(NotesDb::open(&path).unwrap().subjects().unwrap().len(), count);
    }

    #[test]
    fn notes_round_trip_newest_shared_first() {
        let mut db = NotesDb::open_in_memory().unwrap();
        let first = share(&mut db, "Limit", "matematik", 1);
        let second = share(&mut db, "Optik", "fizik", 1);

        let notes = db.notes().unwrap();
        assert_eq!(notes, vec![second.clone(), first]);
        assert_eq!(second.tags, vec!["vize", "final"]);
        assert_eq!(second.author, "Hoca");
    }

    #[test]
    fn list_applies_the_query() {
        let mut db = NotesDb::open_in_memory().unwrap();
        share(&mut db, "Limit", "matematik", 2);
        share(&mut db, "Optik", "fizik", 3);
        share(&mut db, "Türev", "matematik", 1);

        let query = NoteQuery {
            subject: "matematik".into(),
            sort: NoteSort::Oldest,
            ..NoteQuery::default()
        };
        let titles: Vec<String> = db.list(&query).unwrap().into_iter().map(|n| n.title).collect();
        assert_eq!(titles, vec!["Türev", "Limit"]);

        let query = NoteQuery {
            search: "OPT".into(),
            ..NoteQuery::default()
        };
        assert_eq!(db.list(&query).unwrap().len(), 1);
    }

    #[test]
    fn users_cannot_manage_notes() {
        let mut db = NotesDb::open_in_memory().unwrap();
        let user = Member::new("u", "Ayşe", Role::User);
        let new = NewNote {
            title: "x".into(),
            subject: "fizik".into(),
            description: "y".into(),
            ..NewNote::default()
        };
        assert_matches!(
            db.add_note(&user, new, day(1)),
            Err(Error::NotPermitted {
                capability: Capability::ManageNotes,
                ..
            })
        );
        assert_matches!(db.add_subject(&user, "Astronomi"), Err(Error::NotPermitted { .. }));

        let note = share(&mut db, "Limit", "matematik", 1);
        assert_matches!(db.delete_note(&user, note.id), Err(Error::NotPermitted { .. }));
    }

    #[test]
    fn unknown_subject_is_refused() {
        let mut db = NotesDb::open_in_memory().unwrap();
        let new = NewNote {
            title: "x".into(),
            subject: "astroloji".into(),
            description: "y".into(),
            ..NewNote::default()
        };
        assert_matches!(db.add_note(&admin(), new, day(1)), Err(Error::UnknownSubject(_)));
    }

    #[test]
    fn likes_toggle_per_user() {
        let mut db = NotesDb::open_in_memory().unwrap();
        let note = share(&mut db, "Limit", "matematik", 1);

        assert_eq!(db.toggle_like("u1", note.id).unwrap(), (true, 1));
        assert_eq!(db.toggle_like("u2", note.id).unwrap(), (true, 2));
        assert_eq!(db.toggle_like("u1", note.id).unwrap(), (false, 1));
        assert_eq!(db.liked_by("u2").unwrap(), vec![note.id]);
        assert!(db.liked_by("u1").unwrap().is_empty());
        assert_matches!(db.toggle_like("u1", 999), Err(Error::UnknownNote(999)));
    }

    #[test]
    fn unlike_never_goes_negative() {
        let mut db = NotesDb::open_in_memory().unwrap();
        let note = share(&mut db, "Limit", "matematik", 1);
        db.conn
            .execute(
                "INSERT INTO note_likes (user_id, note_id) VALUES ('u1', ?1)",
                [note.id],
            )
            .unwrap();
        assert_eq!(db.toggle_like("u1", note.id).unwrap(), (false, 0));
    }

    #[test]
    fn delete_removes_note_and_likes() {
        let mut db = NotesDb::open_in_memory().unwrap();
        let note = share(&mut db, "Limit", "matematik", 1);
        db.toggle_like("u1", note.id).unwrap();

        db.delete_note(&admin(), note.id).unwrap();
        assert!(db.notes().unwrap().is_empty());
        assert!(db.liked_by("u1").unwrap().is_empty());
        assert_matches!(db.delete_note(&admin(), note.id), Err(Error::UnknownNote(_)));
    }

    #[test]
    fn downloads_and_views_are_counted() {
        let mut db = NotesDb::open_in_memory().unwrap();
        let note = share(&mut db, "Limit", "matematik", 1);
        db.download(note.id).unwrap();
        assert_eq!(db.download(note.id).unwrap().downloads, 2);
        assert_eq!(db.view(note.id).unwrap().views, 1);
        assert_matches!(db.view(42), Err(Error::UnknownNote(42)));
    }

    #[test]
    fn added_subjects_go_last_and_reject_duplicates() {
        let mut db = NotesDb::open_in_memory().unwrap();
        let added = db.add_subject(&admin(), "Veri Bilimi").unwrap();
        assert_eq!(db.subjects().unwrap().last(), Some(&added));
        assert_matches!(db.add_subject(&admin(), "veri bilimi"), Err(Error::DuplicateSubject(_)));
        assert_matches!(db.add_subject(&admin(), " "), Err(Error::BlankSubject));

        share(&mut db, "Regresyon", &added.id, 1);
    }
}
