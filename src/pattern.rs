//! Process-wide compiled-pattern cache
//!
//! Pattern strings come from the deployed constraint set, a small static
//! key space, so entries persist for the process lifetime with no
//! eviction. Compilation is the expensive step; two constraints declaring
//! the same pattern string share one compiled instance.

use crate::error::{ConstraintError, Result};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use regex::Regex;
use std::sync::Arc;
use tracing::debug;

/// Memoizing compiler for permission patterns
///
/// Matching is full-string: the raw pattern is anchored on both ends
/// before compilation, so `printers.*` matches `printers.edit` but not
/// `office.printers.edit`.
#[derive(Debug, Default)]
pub struct PatternCache {
    patterns: DashMap<String, Arc<Regex>>,
}

impl PatternCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self {
            patterns: DashMap::new(),
        }
    }

    /// Compile a pattern string, returning the shared instance
    ///
    /// Idempotent: repeated calls with an equal string return the same
    /// compiled pattern. A compile failure is surfaced as
    /// [`ConstraintError::PatternCompile`] and never cached, so a
    /// corrected constraint set can recompile under the same key.
    pub fn compile(&self, raw: &str) -> Result<Arc<Regex>> {
        match self.patterns.entry(raw.to_string()) {
            Entry::Occupied(entry) => Ok(Arc::clone(entry.get())),
            Entry::Vacant(entry) => {
                let regex =
                    Regex::new(&format!(r"\A(?:{})\z", raw)).map_err(|source| {
                        ConstraintError::PatternCompile {
                            pattern: raw.to_string(),
                            source,
                        }
                    })?;
                debug!(pattern = raw, "compiled permission pattern");
                Ok(Arc::clone(&entry.insert(Arc::new(regex))))
            }
        }
    }

    /// Number of compiled patterns
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
