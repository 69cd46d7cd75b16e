//! Managed object naming and query matching.

use crate::config::types::{Result, RigError};
use crate::mgmt::protocol::ObjectInfo;
use std::fmt;

/// Hierarchical managed object name of the form
/// `<domain>:type=<TypeName>[,<key>=<value>]*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectName {
    domain: String,
    type_name: String,
    attributes: Vec<(String, String)>,
}

impl ObjectName {
    pub fn new(domain: impl Into<String>, type_name: impl Into<String>) -> Self {
        ObjectName {
            domain: domain.into(),
            type_name: type_name.into(),
            attributes: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    /// Parse a qualified name string.
    pub fn parse(name: &str) -> Result<Self> {
        let malformed = || RigError::Protocol(format!("malformed object name [{}]", name));

        let (domain, rest) = name.split_once(':').ok_or_else(malformed)?;
        if domain.is_empty() || rest.is_empty() {
            return Err(malformed());
        }

        let mut parts = rest.split(',');
        let type_part = parts.next().ok_or_else(malformed)?;
        let type_name = type_part.strip_prefix("type=").ok_or_else(malformed)?;
        if type_name.is_empty() {
            return Err(malformed());
        }

        let mut attributes = Vec::new();
        for part in parts {
            let (key, value) = part.split_once('=').ok_or_else(malformed)?;
            attributes.push((key.to_string(), value.to_string()));
        }

        Ok(ObjectName {
            domain: domain.to_string(),
            type_name: type_name.to_string(),
            attributes,
        })
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }
}

impl fmt::Display for ObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:type={}", self.domain, self.type_name)?;
        for (key, value) in &self.attributes {
            write!(f, ",{}={}", key, value)?;
        }
        Ok(())
    }
}

/// Filter over the set of managed objects exposed by a container.
///
/// An object matches when its qualified name starts with `domain_prefix`,
/// its declared type equals `type_name`, and its qualified name contains
/// every attribute pattern as a substring.
#[derive(Debug, Clone)]
pub struct ObjectQuery {
    pub domain_prefix: String,
    pub type_name: String,
    pub attribute_patterns: Vec<String>,
}

impl ObjectQuery {
    pub fn new(domain_prefix: impl Into<String>, type_name: impl Into<String>) -> Self {
        ObjectQuery {
            domain_prefix: domain_prefix.into(),
            type_name: type_name.into(),
            attribute_patterns: Vec::new(),
        }
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.attribute_patterns.push(pattern.into());
        self
    }

    pub fn matches(&self, info: &ObjectInfo) -> bool {
        if !info.name.starts_with(&self.domain_prefix) {
            return false;
        }
        if info.type_name != self.type_name {
            return false;
        }
        self.attribute_patterns
            .iter()
            .all(|pattern| info.name.contains(pattern.as_str()))
    }
}

impl fmt::Display for ObjectQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.domain_prefix, self.type_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(name: &str, type_name: &str) -> ObjectInfo {
        ObjectInfo {
            name: name.to_string(),
            type_name: type_name.to_string(),
            operations: Vec::new(),
        }
    }

    #[test]
    fn test_object_name_round_trip() {
        let name = ObjectName::new("rigbox", "ShutdownBean").with_attribute("profile", "common");
        let formatted = name.to_string();
        assert_eq!(formatted, "rigbox:type=ShutdownBean,profile=common");
        assert_eq!(ObjectName::parse(&formatted).unwrap(), name);
    }

    #[test]
    fn test_object_name_rejects_malformed() {
        assert!(ObjectName::parse("no-colon").is_err());
        assert!(ObjectName::parse("domain:name=missing-type").is_err());
        assert!(ObjectName::parse("domain:type=").is_err());
        assert!(ObjectName::parse(":type=X").is_err());
        assert!(ObjectName::parse("domain:type=X,dangling").is_err());
    }

    #[test]
    fn test_query_matches_on_prefix_type_and_patterns() {
        let query = ObjectQuery::new("rigbox", "ShutdownBean");
        assert!(query.matches(&info("rigbox:type=ShutdownBean", "ShutdownBean")));

        // Domain prefix is a prefix, not an exact match.
        assert!(query.matches(&info("rigbox.core:type=ShutdownBean", "ShutdownBean")));

        assert!(!query.matches(&info("other:type=ShutdownBean", "ShutdownBean")));
        assert!(!query.matches(&info("rigbox:type=ShutdownBean", "ComponentInfo")));
    }

    #[test]
    fn test_query_attribute_patterns_are_substrings() {
        let query = ObjectQuery::new("rigbox", "Worker").with_pattern("profile=common");
        assert!(query.matches(&info(
            "rigbox:type=Worker,profile=common",
            "Worker"
        )));
        assert!(!query.matches(&info("rigbox:type=Worker,profile=other", "Worker")));
    }
}
