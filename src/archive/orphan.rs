use std::collections::HashSet;

use super::model::Assessor;

// ---------------------------------------------------------------------------
// OrphanFinder
// ---------------------------------------------------------------------------

/// Assessors whose recorded labels disagree with their own identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrphanCandidates {
    pub subject_mismatch: Vec<Assessor>,
    pub session_mismatch: Vec<Assessor>,
    /// Labels too short to carry subject and session tokens.
    pub malformed: Vec<Assessor>,
}

impl OrphanCandidates {
    /// Subject mismatches followed by session mismatches. An assessor
    /// failing both checks appears twice.
    pub fn candidates(&self) -> Vec<Assessor> {
        self.subject_mismatch
            .iter()
            .chain(&self.session_mismatch)
            .cloned()
            .collect()
    }

    /// Same order as [`candidates`](Self::candidates), first occurrence of
    /// each label kept.
    pub fn deduplicated(&self) -> Vec<Assessor> {
        let mut seen = HashSet::new();
        self.subject_mismatch
            .iter()
            .chain(&self.session_mismatch)
            .filter(|a| seen.insert(a.label.as_str()))
            .cloned()
            .collect()
    }

    pub fn duplicate_count(&self) -> usize {
        self.subject_mismatch.len() + self.session_mismatch.len() - self.deduplicated().len()
    }
}

/// Split `assessors` into the two mismatch subsets.
pub fn find_orphans(assessors: &[Assessor]) -> OrphanCandidates {
    let mut found = OrphanCandidates::default();
    for a in assessors {
        match a.label_tokens() {
            Some(tokens) => {
                if a.subject_label != tokens.subject {
                    found.subject_mismatch.push(a.clone());
                }
            }
            None => found.malformed.push(a.clone()),
        }
    }
    for a in assessors {
        if let Some(tokens) = a.label_tokens() {
            if a.session_label != tokens.session {
                found.session_mismatch.push(a.clone());
            }
        }
    }
    found
}

/// Assessors attached to `subject`.
pub fn for_subject<'a>(assessors: &'a [Assessor], subject: &str) -> Vec<&'a Assessor> {
    assessors
        .iter()
        .filter(|a| a.subject_label == subject)
        .collect()
}
