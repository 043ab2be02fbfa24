//! Keyword sets and program selection

use std::collections::BTreeSet;
use std::fmt;

/// A sorted set of active keywords
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeywordSet(BTreeSet<String>);

impl KeywordSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, keyword: impl Into<String>) -> bool {
        self.0.insert(keyword.into())
    }

    pub fn remove(&mut self, keyword: &str) -> bool {
        self.0.remove(keyword)
    }

    pub fn contains(&self, keyword: &str) -> bool {
        self.0.contains(keyword)
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for KeywordSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for KeywordSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for k in &self.0 {
            if !first {
                f.write_str(" ")?;
            }
            f.write_str(k)?;
            first = false;
        }
        Ok(())
    }
}

/// Exact address of one compiled variant
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramKey {
    pub shader: String,
    pub keywords: KeywordSet,
}

impl ProgramKey {
    pub fn new(shader: impl Into<String>, keywords: KeywordSet) -> Self {
        Self {
            shader: shader.into(),
            keywords,
        }
    }
}

impl fmt::Display for ProgramKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.shader, self.keywords)
    }
}

/// Keyword state for one shader.
///
/// Only keywords the shader declares can be enabled, so the active key
/// always names a variant that exists.
#[derive(Debug, Clone)]
pub struct ShaderProgram {
    shader: String,
    available: BTreeSet<String>,
    active: KeywordSet,
}

impl ShaderProgram {
    pub fn new<I, S>(shader: impl Into<String>, available: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            shader: shader.into(),
            available: available.into_iter().map(Into::into).collect(),
            active: KeywordSet::new(),
        }
    }

    pub fn shader(&self) -> &str {
        &self.shader
    }

    pub fn is_available(&self, keyword: &str) -> bool {
        self.available.contains(keyword)
    }

    pub fn available(&self) -> impl Iterator<Item = &str> {
        self.available.iter().map(String::as_str)
    }

    /// Enable a keyword. Undeclared keywords are ignored.
    pub fn enable_keyword(&mut self, keyword: &str) {
        if self.available.contains(keyword) {
            self.active.insert(keyword);
        } else {
            log::debug!("Shader '{}' does not declare keyword {}", self.shader, keyword);
        }
    }

    pub fn disable_keyword(&mut self, keyword: &str) {
        self.active.remove(keyword);
    }

    /// Enable or disable in one call
    pub fn set_keyword(&mut self, keyword: &str, enabled: bool) {
        if enabled {
            self.enable_keyword(keyword);
        } else {
            self.disable_keyword(keyword);
        }
    }

    pub fn clear_keywords(&mut self) {
        self.active.clear();
    }

    pub fn active_keywords(&self) -> &KeywordSet {
        &self.active
    }

    /// Key of the currently selected variant
    pub fn active_key(&self) -> ProgramKey {
        ProgramKey::new(self.shader.clone(), self.active.clone())
    }
}
