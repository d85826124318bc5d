//! Cycling list source

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::info;

use crate::traits::{CandidateSource, SourceError, SourceKind};

/// Hands out a fixed list of candidates in order, wrapping around at the end.
///
/// The cursor is shared, so concurrent workers together walk the list once
/// per cycle; which worker receives which entry is unspecified.
#[derive(Debug)]
pub struct ListSource {
    name: String,
    items: Vec<String>,
    cursor: AtomicUsize,
}

impl ListSource {
    pub fn new(items: Vec<String>) -> Self {
        Self::named("list", items)
    }

    pub fn named(name: impl Into<String>, items: Vec<String>) -> Self {
        Self {
            name: name.into(),
            items,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Load a word list: one candidate per line, blank lines skipped
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| SourceError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let items: Vec<String> = text
            .lines()
            .map(|line| line.trim_end_matches('\r'))
            .filter(|line| !line.trim().is_empty())
            .map(str::to_string)
            .collect();

        info!("Loaded {} candidates from {}", items.len(), path.display());
        Ok(Self::named(path.display().to_string(), items))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl CandidateSource for ListSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SourceKind {
        SourceKind::List
    }

    fn draw(&self) -> Result<Option<String>, SourceError> {
        if self.items.is_empty() {
            return Err(SourceError::Unavailable(format!("{} is empty", self.name)));
        }
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % self.items.len();
        Ok(Some(self.items[index].clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_cycles_in_order() {
        let source = ListSource::new(vec!["a".into(), "b".into(), "c".into()]);
        let drawn: Vec<String> = (0..7).map(|_| source.draw().unwrap().unwrap()).collect();
        assert_eq!(drawn, vec!["a", "b", "c", "a", "b", "c", "a"]);
    }

    #[test]
    fn test_empty_list_is_unavailable() {
        let source = ListSource::new(Vec::new());
        let err = source.draw().unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_from_path_skips_blank_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "first line").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "   ").unwrap();
        write!(file, "second line\r\n").unwrap();

        let source = ListSource::from_path(file.path()).unwrap();
        assert_eq!(source.len(), 2);
        assert_eq!(source.kind(), SourceKind::List);
        assert_eq!(source.draw().unwrap().as_deref(), Some("first line"));
        assert_eq!(source.draw().unwrap().as_deref(), Some("second line"));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = ListSource::from_path("/definitely/not/here.txt").unwrap_err();
        assert!(matches!(err, SourceError::Io { .. }));
    }
}
