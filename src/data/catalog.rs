use std::collections::{BTreeMap, BTreeSet};

use crate::error::{PipelineError, PipelineResult};

// ---------------------------------------------------------------------------
// LabelCatalog – segmentation value → structure name
// ---------------------------------------------------------------------------

/// Read-only lookup built once from the reference table and shared by every
/// extraction call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelCatalog {
    names: BTreeMap<i64, String>,
}

impl LabelCatalog {
    /// Build from `(index, name)` pairs. Rebinding an index to a different
    /// name is rejected with the 1-based position of the offending pair.
    pub fn from_entries<I, S>(entries: I) -> Result<Self, (usize, String)>
    where
        I: IntoIterator<Item = (i64, S)>,
        S: Into<String>,
    {
        let mut names = BTreeMap::new();
        for (pos, (index, name)) in entries.into_iter().enumerate() {
            let name = name.into();
            match names.get(&index) {
                Some(existing) if *existing != name => {
                    log::warn!("Label index {index} maps to both '{existing}' and '{name}'");
                    return Err((
                        pos + 1,
                        format!("index {index} already bound to '{existing}', got '{name}'"),
                    ));
                }
                Some(_) => {}
                None => {
                    names.insert(index, name);
                }
            }
        }
        Ok(Self { names })
    }

    pub fn get(&self, index: i64) -> Option<&str> {
        self.names.get(&index).map(String::as_str)
    }

    /// Names for `labels` in ascending label order.
    pub fn resolve_all(&self, labels: &BTreeSet<i64>) -> PipelineResult<Vec<String>> {
        labels
            .iter()
            .map(|&value| {
                self.get(value)
                    .map(str::to_string)
                    .ok_or(PipelineError::UnknownLabel { value })
            })
            .collect()
    }

    /// Known label indices, ascending.
    pub fn indices(&self) -> impl Iterator<Item = i64> + '_ {
        self.names.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_in_label_order() {
        let catalog =
            LabelCatalog::from_entries([(53, "Right-Hippocampus"), (17, "Left-Hippocampus")])
                .unwrap();
        let names = catalog.resolve_all(&BTreeSet::from([53, 17])).unwrap();
        assert_eq!(names, vec!["Left-Hippocampus", "Right-Hippocampus"]);
    }

    #[test]
    fn unknown_label_is_typed() {
        let catalog = LabelCatalog::from_entries([(17, "Left-Hippocampus")]).unwrap();
        let err = catalog.resolve_all(&BTreeSet::from([17, 99])).unwrap_err();
        assert!(matches!(err, PipelineError::UnknownLabel { value: 99 }));
    }

    #[test]
    fn conflicting_names_are_rejected() {
        let err = LabelCatalog::from_entries([(4, "A"), (5, "B"), (4, "C")]).unwrap_err();
        assert_eq!(err.0, 3);
    }

    #[test]
    fn exact_repeats_are_accepted() {
        let catalog = LabelCatalog::from_entries([(4, "A"), (4, "A")]).unwrap();
        assert_eq!(catalog.len(), 1);
    }
}
