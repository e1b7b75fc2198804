//! Read-only store of reference texts (assistant instructions, how-to guides)
//! loaded from a directory once at startup.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceEntry {
    /// Lowercased file stem
    pub name: String,
    pub uri: String,
    pub file_name: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceMatch<'a> {
    Found(&'a ResourceEntry),
    Ambiguous(Vec<String>),
    NotFound,
}

#[derive(Debug, Clone, Default)]
pub struct ResourceStore {
    entries: BTreeMap<String, ResourceEntry>,
}

impl ResourceStore {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from `(file_name, content)` pairs. On a name collision the
    /// first pair wins.
    pub fn from_files<I, N, C>(files: I) -> Self
    where
        I: IntoIterator<Item = (N, C)>,
        N: Into<String>,
        C: Into<String>,
    {
        let mut store = Self::default();
        for (file_name, content) in files {
            store.insert(file_name.into(), content.into());
        }
        store
    }

    /// Snapshot every regular file in `dir`. A missing directory is not an
    /// error; it yields an empty store.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            tracing::warn!(
                dir = %dir.display(),
                "resources directory not found; no resources loaded"
            );
            return Ok(Self::default());
        }

        let mut files = Vec::new();
        let listing = fs::read_dir(dir)
            .with_context(|| format!("Failed to read resources directory: {}", dir.display()))?;
        for entry in listing {
            let path = entry
                .with_context(|| format!("Failed to read entry in {}", dir.display()))?
                .path();
            if !path.is_file() {
                continue;
            }
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                tracing::warn!(path = %path.display(), "skipping resource with non UTF-8 name");
                continue;
            };
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read resource: {}", path.display()))?;
            files.push((file_name.to_string(), content));
        }
        files.sort_by(|a, b| a.0.cmp(&b.0));

        let store = Self::from_files(files);
        tracing::info!(count = store.len(), dir = %dir.display(), "loaded resources");
        Ok(store)
    }

    fn insert(&mut self, file_name: String, content: String) {
        let stem = Path::new(&file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&file_name)
            .to_string();
        let name = stem.to_lowercase();

        if let Some(existing) = self.entries.get(&name) {
            tracing::warn!(
                name = %name,
                kept = %existing.file_name,
                skipped = %file_name,
                "duplicate resource name"
            );
            return;
        }

        self.entries.insert(
            name.clone(),
            ResourceEntry {
                name,
                uri: format!("resource://{}", stem.replace(' ', "_")),
                file_name,
                content,
            },
        );
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(|e| e.content.as_str())
    }

    pub fn by_uri(&self, uri: &str) -> Option<&ResourceEntry> {
        self.entries.values().find(|e| e.uri == uri)
    }

    /// Sorted resource names
    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    pub fn entries(&self) -> impl Iterator<Item = &ResourceEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Exact name, then substring in either direction, then every word of
    /// the query contained in the name.
    pub fn lookup(&self, query: &str) -> ResourceMatch<'_> {
        let q = query.trim().to_lowercase();
        if q.is_empty() {
            return ResourceMatch::NotFound;
        }

        if let Some(entry) = self.entries.get(&q) {
            return ResourceMatch::Found(entry);
        }

        let substring: Vec<&ResourceEntry> = self
            .entries
            .values()
            .filter(|e| e.name.contains(&q) || q.contains(&e.name))
            .collect();
        if let Some(found) = Self::narrow(substring) {
            return found;
        }

        let words: Vec<&str> = q.split_whitespace().collect();
        let all_words: Vec<&ResourceEntry> = self
            .entries
            .values()
            .filter(|e| words.iter().all(|w| e.name.contains(w)))
            .collect();
        Self::narrow(all_words).unwrap_or(ResourceMatch::NotFound)
    }

    fn narrow(matches: Vec<&ResourceEntry>) -> Option<ResourceMatch<'_>> {
        match matches.as_slice() {
            [] => None,
            [only] => Some(ResourceMatch::Found(*only)),
            many => Some(ResourceMatch::Ambiguous(
                many.iter().map(|e| e.name.clone()).collect(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> ResourceStore {
        ResourceStore::from_files([
            ("Assistant_Instructions.md", "be helpful"),
            ("pipeline guide.md", "how to build pipelines"),
            ("algorithm guide.md", "how to build algorithms"),
        ])
    }

    fn found<'a>(store: &'a ResourceStore, query: &str) -> Option<&'a str> {
        match store.lookup(query) {
            ResourceMatch::Found(entry) => Some(entry.name.as_str()),
            _ => None,
        }
    }

    #[test]
    fn names_are_lowercased_stems() {
        let store = store();
        assert_eq!(
            store.names(),
            vec!["algorithm guide", "assistant_instructions", "pipeline guide"]
        );
        assert_eq!(store.get("assistant_instructions"), Some("be helpful"));
    }

    #[test]
    fn uri_replaces_spaces() {
        let store = store();
        let entry = store.by_uri("resource://pipeline_guide").unwrap();
        assert_eq!(entry.name, "pipeline guide");
    }

    #[test]
    fn lookup_exact_and_fuzzy() {
        let store = store();
        assert_eq!(found(&store, "  Pipeline Guide "), Some("pipeline guide"));
        assert_eq!(found(&store, "instructions"), Some("assistant_instructions"));
        assert_eq!(found(&store, "algorithm   guide"), Some("algorithm guide"));
    }

    #[test]
    fn lookup_reports_ambiguity() {
        let store = store();
        match store.lookup("guide") {
            ResourceMatch::Ambiguous(names) => {
                assert_eq!(names, vec!["algorithm guide", "pipeline guide"])
            }
            other => panic!("expected ambiguity, got {:?}", other),
        }
    }

    #[test]
    fn lookup_multi_word_fallback() {
        let store = store();
        assert_eq!(found(&store, "guide pipeline"), Some("pipeline guide"));
        assert_eq!(store.lookup("nothing like it"), ResourceMatch::NotFound);
    }

    #[test]
    fn first_file_wins_on_collision() {
        let store = ResourceStore::from_files([("Guide.md", "first"), ("guide.txt", "second")]);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("guide"), Some("first"));
    }
}
