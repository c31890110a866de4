use std::{collections::HashSet, path::Path};

use anyhow::Context;
use common::error::AppError;

/// Trigger words in file order, kept as written and matched case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordList {
    terms: Vec<String>,
    lowered: Vec<String>,
}

impl KeywordList {
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading keyword list {}", path.display()))?;
        Ok(Self::parse(&raw))
    }

    /// One term per line. Surrounding whitespace is dropped, blank lines and
    /// repeated terms are skipped.
    pub fn parse(raw: &str) -> Self {
        Self::from_terms(raw.lines())
    }

    pub fn from_terms<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let mut list = Self::default();
        for term in terms {
            let term = term.as_ref().trim();
            if term.is_empty() || !seen.insert(term.to_string()) {
                continue;
            }
            list.lowered.push(term.to_lowercase());
            list.terms.push(term.to_string());
        }
        list
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Terms occurring anywhere in `text`, in list order. Plain substring search:
    /// "gun" is found inside "SHOTGUN".
    pub fn matches(&self, text: &str) -> Vec<String> {
        let haystack = text.to_lowercase();
        self.terms
            .iter()
            .zip(&self.lowered)
            .filter(|(_, lowered)| haystack.contains(lowered.as_str()))
            .map(|(term, _)| term.clone())
            .collect()
    }
}
