//! Line Corpus
//!
//! The rulebook as an ordered, read-only sequence of lines, plus the
//! bounded windowed search every extraction family is built on.
//!
//! # Example
//!
//! ```ignore
//! let corpus = LineCorpus::from_text("KNIFE FIGHTING\nREQUIREMENTS: Close Combat 2\n");
//! let name = corpus.search(1, Direction::Backward, 5, |_, line| {
//!     if line.is_empty() { Scan::Skip } else { Scan::Found(line.to_string()) }
//! });
//! assert_eq!(name.as_deref(), Some("KNIFE FIGHTING"));
//! ```

use std::path::Path;

use unicode_normalization::UnicodeNormalization;

use crate::core::errors::{PipelineError, Result};

// ============================================================================
// Windowed search
// ============================================================================

/// Direction of a windowed search relative to its origin line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Backward,
    Forward,
}

/// Verdict of a search predicate on one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scan<T> {
    /// Not interesting; keep scanning.
    Skip,
    /// Abort the search without a result.
    Stop,
    /// Finish with a result.
    Found(T),
}

// ============================================================================
// Corpus
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineCorpus {
    lines: Vec<String>,
}

impl LineCorpus {
    /// Build from text. Lines are NFKC-normalized so PDF ligatures and
    /// full-width forms compare like plain ASCII.
    pub fn from_text(text: &str) -> Self {
        Self {
            lines: text
                .lines()
                .map(|line| line.trim_end_matches('\r').nfkc().collect())
                .collect(),
        }
    }

    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::from_text(
            &lines
                .into_iter()
                .map(|l| l.as_ref().to_string())
                .collect::<Vec<_>>()
                .join("\n"),
        )
    }

    /// Load a text dump. Invalid UTF-8 is replaced, never fatal.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| PipelineError::read(path, e))?;
        Ok(Self::from_text(&String::from_utf8_lossy(&bytes)))
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Raw line, or "" past the end.
    pub fn line(&self, index: usize) -> &str {
        self.lines.get(index).map(String::as_str).unwrap_or("")
    }

    /// Trimmed line, or "" past the end.
    pub fn trimmed(&self, index: usize) -> &str {
        self.line(index).trim()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.lines.iter().enumerate().map(|(i, l)| (i, l.as_str()))
    }

    /// Index of the first line at or after `from` whose trimmed text
    /// satisfies `pred`.
    pub fn position_from<F>(&self, from: usize, mut pred: F) -> Option<usize>
    where
        F: FnMut(&str) -> bool,
    {
        (from..self.len()).find(|&i| pred(self.trimmed(i)))
    }

    /// Visit up to `bound` lines away from `origin` (the origin itself is
    /// excluded) and return the first [`Scan::Found`] value.
    ///
    /// The predicate receives the line index and the trimmed line.
    pub fn search<T, F>(&self, origin: usize, direction: Direction, bound: usize, mut pred: F) -> Option<T>
    where
        F: FnMut(usize, &str) -> Scan<T>,
    {
        let indices: Box<dyn Iterator<Item = usize>> = match direction {
            Direction::Backward => Box::new((origin.saturating_sub(bound)..origin.min(self.len())).rev()),
            Direction::Forward => {
                let start = origin.saturating_add(1);
                let end = origin.saturating_add(bound).saturating_add(1).min(self.len());
                Box::new(start..end.max(start))
            }
        };

        for index in indices {
            match pred(index, self.trimmed(index)) {
                Scan::Skip => continue,
                Scan::Stop => return None,
                Scan::Found(value) => return Some(value),
            }
        }
        None
    }
}
