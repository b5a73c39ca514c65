//! Environment classification for the import safety guard.

use std::fmt;

/// Names classified as production or pre-production
const PRODUCTION_NAMES: &[&str] = &[
    "prod",
    "production",
    "predprod",
    "preprod",
    "pre-prod",
    "preproduction",
    "pre-production",
];

/// The environment an operation runs in, passed in explicitly by the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment(String);

impl Environment {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    /// True when the environment is production or pre-production
    pub fn is_production(&self) -> bool {
        let lower = self.0.trim().to_lowercase();
        PRODUCTION_NAMES.contains(&lower.as_str())
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new("local")
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_production_classification() {
        assert!(Environment::new("prod").is_production());
        assert!(Environment::new("PREDPROD").is_production());
        assert!(Environment::new(" production ").is_production());
        assert!(!Environment::new("staging").is_production());
        assert!(!Environment::new("local").is_production());
        assert!(!Environment::default().is_production());
    }
}
