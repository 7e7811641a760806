use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

use crate::error::{DraftError, Result};

/// Canonical song identity: trimmed, lowercased, alias-resolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SongKey(String);

impl SongKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for SongKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

const BUILTIN_ALIASES: &[(&str, &str)] = &[
    ("2001", "also sprach zarathustra"),
    ("yem", "you enjoy myself"),
];

/// Static alias map from alternate lowercase spellings to canonical titles.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    aliases: HashMap<String, String>,
}

impl AliasTable {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn builtin() -> Self {
        let mut table = Self::empty();
        for (alias, canonical) in BUILTIN_ALIASES {
            table.insert(alias, canonical);
        }
        table
    }

    // Both sides are folded so lookups stay case-insensitive.
    fn insert(&mut self, alias: &str, canonical: &str) {
        let alias = fold(alias);
        let canonical = fold(canonical);
        if alias.is_empty() || canonical.is_empty() || alias == canonical {
            return;
        }
        self.aliases.insert(alias, canonical);
    }

    /// Merge a JSON object of `{"alias": "canonical title"}` over this table.
    ///
    /// Aliases are not chained: a canonical title must not itself be an alias.
    /// On error the table is left unchanged.
    pub fn extend_from_json(&mut self, raw: &str) -> Result<()> {
        let parsed: HashMap<String, String> = serde_json::from_str(raw)
            .map_err(|err| DraftError::Configuration(format!("invalid alias json: {err}")))?;
        let mut merged = self.clone();
        for (alias, canonical) in parsed {
            merged.insert(&alias, &canonical);
        }
        merged.check_not_chained()?;
        *self = merged;
        Ok(())
    }

    pub fn extend_from_file(&mut self, path: &Path) -> Result<()> {
        let raw = fs::read_to_string(path).map_err(|err| {
            DraftError::Configuration(format!("read alias file {}: {err}", path.display()))
        })?;
        self.extend_from_json(&raw)
    }

    pub fn is_alias(&self, title: &str) -> bool {
        self.aliases.contains_key(&fold(title))
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    pub fn normalize(&self, title: &str) -> SongKey {
        let folded = fold(title);
        match self.aliases.get(&folded) {
            Some(canonical) => SongKey(canonical.clone()),
            None => SongKey(folded),
        }
    }

    // Chained aliases would make normalize() non-idempotent.
    fn check_not_chained(&self) -> Result<()> {
        for (alias, canonical) in &self.aliases {
            if self.aliases.contains_key(canonical) {
                return Err(DraftError::Configuration(format!(
                    "alias '{alias}' maps to '{canonical}', which is itself an alias"
                )));
            }
        }
        Ok(())
    }
}

fn fold(title: &str) -> String {
    title.trim().to_lowercase()
}
