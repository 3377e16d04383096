//! Org id <-> namespace mapping.
//!
//! # Invariants
//! - The mapping is a bijection between positive org ids and accepted
//!   namespaces: distinct orgs never share a namespace.

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Namespace of the default org (id 1).
pub const DEFAULT_NAMESPACE: &str = "default";
const DEFAULT_ORG_ID: i64 = 1;

static ORG_NAMESPACE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^org-([1-9][0-9]*)$").expect("org namespace pattern should compile")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamespaceError {
    Empty,
    Unrecognized(String),
}

impl Display for NamespaceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "namespace is required"),
            Self::Unrecognized(value) => write!(f, "namespace `{value}` does not map to an org"),
        }
    }
}

impl Error for NamespaceError {}

/// Maps tenants (orgs) to namespaces.
pub trait NamespaceMapper: Send + Sync {
    fn namespace(&self, org_id: i64) -> String;

    fn org_id(&self, namespace: &str) -> Result<i64, NamespaceError>;
}

/// Org 1 is `default`; every other org N is `org-N`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrgNamespaceMapper;

impl NamespaceMapper for OrgNamespaceMapper {
    fn namespace(&self, org_id: i64) -> String {
        if org_id == DEFAULT_ORG_ID {
            DEFAULT_NAMESPACE.to_string()
        } else {
            format!("org-{org_id}")
        }
    }

    fn org_id(&self, namespace: &str) -> Result<i64, NamespaceError> {
        if namespace.is_empty() {
            return Err(NamespaceError::Empty);
        }
        if namespace == DEFAULT_NAMESPACE {
            return Ok(DEFAULT_ORG_ID);
        }
        let org_id = ORG_NAMESPACE_RE
            .captures(namespace)
            .and_then(|captures| captures[1].parse::<i64>().ok())
            .ok_or_else(|| NamespaceError::Unrecognized(namespace.to_string()))?;
        // `org-1` would alias `default`.
        if org_id == DEFAULT_ORG_ID {
            return Err(NamespaceError::Unrecognized(namespace.to_string()));
        }
        Ok(org_id)
    }
}
