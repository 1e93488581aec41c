use serde::Deserialize;

use crate::assets::read_embedded;
use crate::error::Result;

#[derive(Deserialize, Clone, Debug)]
struct BlocklistFile {
    #[allow(dead_code)]
    name: String,
    words: Vec<String>,
}

/// Lowercased words that get a message rejected when they occur anywhere in
/// it. Matching is plain substring containment, not word-boundary aware.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Blocklist {
    words: Vec<String>,
}

impl Blocklist {
    /// Entries are trimmed and lowercased; blank entries are dropped since an
    /// empty needle would match every message.
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list = Self::default();
        list.extend(words);
        list
    }

    /// The bundled Turkish word list.
    pub fn builtin() -> Result<Self> {
        let file: BlocklistFile = read_embedded("blocklist.json")?;
        Ok(Self::new(file.words))
    }

    pub fn extend<I, S>(&mut self, words: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for word in words {
            let word = word.as_ref().trim().to_lowercase();
            if !word.is_empty() && !self.words.contains(&word) {
                self.words.push(word);
            }
        }
    }

    /// First blocked word found in `text`, if any.
    pub fn find_in(&self, text: &str) -> Option<&str> {
        let lower = text.to_lowercase();
        self.words
            .iter()
            .find(|word| lower.contains(word.as_str()))
            .map(String::as_str)
    }

    pub fn is_blocked(&self, text: &str) -> bool {
        self.find_in(text).is_some()
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_list_loads_without_duplicates() {
        let list = Blocklist::builtin().unwrap();
        assert!(!list.is_empty());
        let mut sorted = list.words().to_vec();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), list.len());
    }

    #[test]
    fn matching_is_case_insensitive() {
        let list = Blocklist::new(["darn"]);
        assert_eq!(list.find_in("Well DARN it"), Some("darn"));
    }

    #[test]
    fn matching_is_plain_substring() {
        // "lass" inside "classic" still matches
        let list = Blocklist::new(["lass"]);
        assert!(list.is_blocked("a classic move"));
    }

    #[test]
    fn blank_entries_are_ignored() {
        let list = Blocklist::new(["", "   ", "Heck "]);
        assert_eq!(list.words(), &["heck".to_string()]);
        assert!(!list.is_blocked("hello"));
    }

    #[test]
    fn empty_list_blocks_nothing() {
        let list = Blocklist::default();
        assert!(!list.is_blocked("anything at all"));
    }
}
