//! Static roster of known identities.
//!
//! The roster is a TOML file with one `[[identity]]` table per person.
//! It is loaded once at startup and never mutated.

use crate::types::Identity;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RosterError {
    #[error("failed to read roster {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("bad roster TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("roster entry {index}: empty {field}")]
    EmptyField { index: usize, field: &'static str },
    #[error("roster entry {index}: invalid email {email:?}")]
    InvalidEmail { index: usize, email: String },
    #[error("duplicate roster name: {0}")]
    DuplicateName(String),
}

/// Top-level roster file structure.
#[derive(Debug, Deserialize)]
struct RosterFile {
    #[serde(default)]
    identity: Vec<Identity>,
}

/// Ordered, validated list of identities.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    identities: Vec<Identity>,
}

impl Roster {
    /// Validate and wrap a list of identities, preserving order.
    pub fn new(identities: Vec<Identity>) -> Result<Self, RosterError> {
        for (index, id) in identities.iter().enumerate() {
            if id.name.trim().is_empty() {
                return Err(RosterError::EmptyField { index, field: "name" });
            }
            if id.photo.trim().is_empty() {
                return Err(RosterError::EmptyField { index, field: "photo" });
            }
            if id.email.trim().is_empty() {
                return Err(RosterError::EmptyField { index, field: "email" });
            }
            if !is_plausible_email(&id.email) {
                return Err(RosterError::InvalidEmail {
                    index,
                    email: id.email.clone(),
                });
            }
            if identities[..index].iter().any(|prev| prev.name == id.name) {
                return Err(RosterError::DuplicateName(id.name.clone()));
            }
        }
        Ok(Self { identities })
    }

    pub fn from_toml_str(src: &str) -> Result<Self, RosterError> {
        let file: RosterFile = toml::from_str(src)?;
        Self::new(file.identity)
    }

    pub fn load(path: &Path) -> Result<Self, RosterError> {
        let src = std::fs::read_to_string(path).map_err(|source| RosterError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let roster = Self::from_toml_str(&src)?;
        tracing::info!(path = %path.display(), entries = roster.len(), "roster loaded");
        Ok(roster)
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    pub fn identities(&self) -> &[Identity] {
        &self.identities
    }

    pub fn find(&self, name: &str) -> Option<&Identity> {
        self.identities.iter().find(|id| id.name == name)
    }
}

/// Cheap shape check: exactly one `@` with text on both sides, no whitespace.
pub fn is_plausible_email(email: &str) -> bool {
    let mut parts = email.splitn(2, '@');
    match (parts.next(), parts.next()) {
        (Some(local), Some(domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        _ => false,
    }
}
