//! Resource URIs
//!
//! Records reference each other by URI: a submission names its form, a
//! correction names its form and its submission. All URIs are built from
//! one configured base URL.

use std::fmt;

use crate::{Error, Result};

const FORM: &str = "form/";
const SUBMISSION: &str = "assessment/";
const CORRECTION: &str = "correction/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    base: String,
}

impl Endpoint {
    /// Wrap a base URL, which must end with `/`
    pub fn new(base: impl Into<String>) -> Result<Self> {
        let base = base.into();
        if !base.ends_with('/') {
            return Err(Error::Config(format!(
                "Endpoint must end with a slash: {}",
                base
            )));
        }
        Ok(Self { base })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn form_uri(&self, id: &str) -> String {
        format!("{}{}{}", self.base, FORM, id)
    }

    pub fn submission_uri(&self, id: &str) -> String {
        format!("{}{}{}", self.base, SUBMISSION, id)
    }

    pub fn correction_uri(&self, id: &str) -> String {
        format!("{}{}{}", self.base, CORRECTION, id)
    }

    pub fn form_id<'a>(&self, uri: &'a str) -> Option<&'a str> {
        self.id_of(uri, FORM)
    }

    pub fn submission_id<'a>(&self, uri: &'a str) -> Option<&'a str> {
        self.id_of(uri, SUBMISSION)
    }

    pub fn correction_id<'a>(&self, uri: &'a str) -> Option<&'a str> {
        self.id_of(uri, CORRECTION)
    }

    fn id_of<'a>(&self, uri: &'a str, kind: &str) -> Option<&'a str> {
        let id = uri.strip_prefix(self.base.as_str())?.strip_prefix(kind)?;
        if id.is_empty() || id.contains('/') {
            return None;
        }
        Some(id)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base)
    }
}
