use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::assets::read_embedded;
use crate::error::{Error, Result};

/// Subject id that stands for "every subject" in filters. Notes can't be
/// filed under it.
pub const ALL_SUBJECTS: &str = "all";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub id: String,
    pub name: String,
}

#[derive(Deserialize)]
struct SubjectsFile {
    subjects: Vec<Subject>,
}

/// The subject list shipped with the binary, `all` first.
pub fn default_subjects() -> Result<Vec<Subject>> {
    let file: SubjectsFile = read_embedded("subjects.json")?;
    Ok(file.subjects)
}

/// A shared course note. The file itself lives behind `drive_link`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: i64,
    pub title: String,
    pub subject: String,
    pub author: String,
    pub date: NaiveDate,
    pub downloads: u32,
    pub views: u32,
    pub likes: u32,
    pub description: String,
    pub tags: Vec<String>,
    pub drive_link: String,
}

impl Note {
    /// Case-insensitive match against title, description or any tag. An
    /// empty term matches everything.
    pub fn matches_search(&self, term: &str) -> bool {
        let term = term.to_lowercase();
        self.title.to_lowercase().contains(&term)
            || self.description.to_lowercase().contains(&term)
            || self.tags.iter().any(|t| t.to_lowercase().contains(&term))
    }

    pub fn in_subject(&self, subject: &str) -> bool {
        subject == ALL_SUBJECTS || self.subject == subject
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    clap::ValueEnum,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[strum(serialize_all = "kebab-case")]
pub enum NoteSort {
    #[default]
    Newest,
    Oldest,
    /// Most downloaded first.
    Popular,
    MostLiked,
}

/// Search term, subject filter and sort order of the notes list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteQuery {
    pub search: String,
    pub subject: String,
    pub sort: NoteSort,
}

impl Default for NoteQuery {
    fn default() -> Self {
        Self {
            search: String::new(),
            subject: ALL_SUBJECTS.to_string(),
            sort: NoteSort::default(),
        }
    }
}

impl NoteQuery {
    /// Matching notes in sort order. Ties keep their input order.
    pub fn apply<'a>(&self, notes: &'a [Note]) -> Vec<&'a Note> {
        let mut hits: Vec<&Note> = notes
            .iter()
            .filter(|n| n.matches_search(&self.search) && n.in_subject(&self.subject))
            .collect();
        match self.sort {
            NoteSort::Newest => hits.sort_by(|a, b| b.date.cmp(&a.date)),
            NoteSort::Oldest => hits.sort_by(|a, b| a.date.cmp(&b.date)),
            NoteSort::Popular => hits.sort_by(|a, b| b.downloads.cmp(&a.downloads)),
            NoteSort::MostLiked => hits.sort_by(|a, b| b.likes.cmp(&a.likes)),
        }
        hits
    }
}

/// Form input for sharing a note.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewNote {
    pub title: String,
    pub subject: String,
    pub description: String,
    /// Comma separated.
    pub tags: String,
    pub drive_link: String,
}

impl NewNote {
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty()
            || self.description.trim().is_empty()
            || self.subject.trim().is_empty()
            || self.subject == ALL_SUBJECTS
        {
            return Err(Error::IncompleteNote);
        }
        Ok(())
    }

    pub fn into_note(self, id: i64, author: &str, date: NaiveDate) -> Result<Note> {
        self.validate()?;
        Ok(Note {
            id,
            tags: parse_tags(&self.tags),
            title: self.title,
            subject: self.subject,
            author: author.to_string(),
            date,
            downloads: 0,
            views: 0,
            likes: 0,
            description: self.description,
            drive_link: self.drive_link.trim().to_string(),
        })
    }
}

pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn slug_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || "ğüşöçıİĞÜŞÖÇ".contains(c)
}

/// Lowercase `name` and collapse every run of other characters into `-`.
pub fn subject_slug(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut in_run = false;
    for c in name.to_lowercase().chars() {
        if slug_char(c) {
            slug.push(c);
            in_run = false;
        } else if !in_run {
            slug.push('-');
            in_run = true;
        }
    }
    slug
}

/// Turn a requested subject name into a new [`Subject`], refusing blanks and
/// names already taken regardless of case.
pub fn new_subject(name: &str, existing: &[Subject]) -> Result<Subject> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::BlankSubject);
    }
    let lowered = name.to_lowercase();
    if existing.iter().any(|s| s.name.to_lowercase() == lowered) {
        return Err(Error::DuplicateSubject(name.to_string()));
    }
    Ok(Subject {
        id: subject_slug(name),
        name: name.to_string(),
    })
}

/// Like count after a toggle. Never drops below zero.
pub fn toggled_likes(likes: u32, was_liked: bool) -> u32 {
    if was_liked {
        likes.saturating_sub(1)
    } else {
        likes.saturating_add(1)
    }
}
