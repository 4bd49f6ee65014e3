// src/domain/show.rs
use serde::{Deserialize, Serialize};

/// One provider-returned show option competing to match a query.
///
/// Identity is the provider identifier: two candidates with the same
/// `id` are the same show, whatever their display data says.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShowCandidate {
    /// Opaque unique identifier assigned by the metadata provider
    pub id: String,

    /// Display name. Providers occasionally return rows without one;
    /// such candidates still take part in identifier matching but are
    /// skipped by every name-based comparison.
    pub name: Option<String>,

    /// First-aired year, when the provider knows it
    pub year: Option<i32>,

    /// Alternative titles, in provider order
    pub aliases: Vec<String>,
}

impl ShowCandidate {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: Some(name.into()),
            year: None,
            aliases: Vec::new(),
        }
    }

    /// A candidate the provider returned without a display name
    pub fn nameless(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            year: None,
            aliases: Vec::new(),
        }
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases = aliases.into_iter().map(Into::into).collect();
        self
    }

    /// Display name, or the identifier when the provider gave none
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

impl PartialEq for ShowCandidate {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ShowCandidate {}

impl std::fmt::Display for ShowCandidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.name.as_deref(), self.year) {
            (Some(name), Some(year)) => write!(f, "{} ({})", name, year),
            (Some(name), None) => write!(f, "{}", name),
            (None, _) => write!(f, "#{}", self.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_is_by_identifier() {
        let a = ShowCandidate::new("73244", "The Office (US)").with_year(2005);
        let b = ShowCandidate::new("73244", "The Office");
        let c = ShowCandidate::new("78107", "The Office (US)").with_year(2005);

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_display_name_falls_back_to_id() {
        let named = ShowCandidate::new("1", "Robot Chicken");
        let unnamed = ShowCandidate::nameless("42");

        assert_eq!(named.display_name(), "Robot Chicken");
        assert_eq!(unnamed.display_name(), "42");
        assert_eq!(unnamed.to_string(), "#42");
    }
}
