//! Legacy notification template record.
//!
//! # Invariants
//! - `name` is unique per org and carries no surrounding whitespace.
//! - `template` (the body) is never empty.
//! - `Provenance` string forms are stable; they are persisted and exposed as
//!   the `provenance` resource annotation.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// How a template was last authored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Provenance {
    /// Authored through the regular API with no provisioning marker.
    #[default]
    None,
    /// Provisioned through the provisioning API.
    Api,
    /// Provisioned from files on disk.
    File,
    /// Converted from a Prometheus alertmanager configuration.
    ConvertedPrometheus,
}

impl Provenance {
    /// Returns the persisted string form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "",
            Self::Api => "api",
            Self::File => "file",
            Self::ConvertedPrometheus => "converted_prometheus",
        }
    }

    /// Parses a persisted string form.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "" => Some(Self::None),
            "api" => Some(Self::Api),
            "file" => Some(Self::File),
            "converted_prometheus" => Some(Self::ConvertedPrometheus),
            _ => None,
        }
    }
}

impl Display for Provenance {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Provenance> for String {
    fn from(value: Provenance) -> Self {
        value.as_str().to_string()
    }
}

impl TryFrom<String> for Provenance {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("unknown provenance `{value}`"))
    }
}

/// Template record as stored by the legacy template service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationTemplate {
    pub name: String,
    /// Template body.
    pub template: String,
    pub provenance: Provenance,
}

impl NotificationTemplate {
    /// Creates a template with `Provenance::None`.
    pub fn new(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            template: template.into(),
            provenance: Provenance::None,
        }
    }

    /// Checks the invariants the legacy service enforces before persisting.
    pub fn validate(&self) -> Result<(), TemplateValidationError> {
        if self.name.is_empty() {
            return Err(TemplateValidationError::EmptyName);
        }
        if self.name.trim() != self.name {
            return Err(TemplateValidationError::UntrimmedName(self.name.clone()));
        }
        if self.template.trim().is_empty() {
            return Err(TemplateValidationError::EmptyBody(self.name.clone()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateValidationError {
    EmptyName,
    UntrimmedName(String),
    EmptyBody(String),
}

impl Display for TemplateValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "template name cannot be empty"),
            Self::UntrimmedName(name) => {
                write!(f, "template name `{name}` has leading or trailing whitespace")
            }
            Self::EmptyBody(name) => write!(f, "template `{name}` has an empty body"),
        }
    }
}

impl Error for TemplateValidationError {}
