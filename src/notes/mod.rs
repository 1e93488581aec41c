//! Shared course notes: browsing, likes and the admin-only sharing flow.
pub mod catalog;
pub mod store;

pub use catalog::{
    default_subjects, parse_tags, subject_slug, NewNote, Note, NoteQuery, NoteSort, Subject, ALL_SUBJECTS,
};
pub use store::NotesDb;
