use std::fmt;

use serde::{Deserialize, Serialize};

/// Separator between the parts of an assessor label.
pub const LABEL_SEPARATOR: &str = "-x-";

/// A derived-data record attached to an imaging session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assessor {
    #[serde(alias = "project")]
    pub project_id: String,
    pub subject_label: String,
    pub session_label: String,
    /// `<project>-x-<subject>-x-<session>-x-<proc type>…`
    pub label: String,
}

/// Subject and session as encoded in the assessor's own label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelTokens<'a> {
    pub subject: &'a str,
    pub session: &'a str,
}

impl Assessor {
    pub fn new(project: &str, subject: &str, session: &str, label: &str) -> Self {
        Self {
            project_id: project.to_string(),
            subject_label: subject.to_string(),
            session_label: session.to_string(),
            label: label.to_string(),
        }
    }

    /// Tokens 1 and 2 of the label split on `-x-`; `None` when the label has
    /// fewer than three parts.
    pub fn label_tokens(&self) -> Option<LabelTokens<'_>> {
        let mut parts = self.label.split(LABEL_SEPARATOR).skip(1);
        let subject = parts.next()?;
        let session = parts.next()?;
        Some(LabelTokens { subject, session })
    }
}

impl fmt::Display for Assessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}
