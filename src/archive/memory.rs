use std::cell::{Cell, RefCell};

use super::client::ArchiveClient;
use super::model::Assessor;
use crate::error::ArchiveError;

/// In-memory archive with scripted timeouts.
#[derive(Default)]
pub struct InMemoryArchive {
    assessors: RefCell<Vec<Assessor>>,
    timeouts_left: Cell<u32>,
    pub delete_calls: Cell<u32>,
    pub exists_calls: Cell<u32>,
}

impl InMemoryArchive {
    pub fn new(assessors: Vec<Assessor>) -> Self {
        Self {
            assessors: RefCell::new(assessors),
            ..Self::default()
        }
    }

    /// The next `n` existence checks time out.
    pub fn with_timeouts(self, n: u32) -> Self {
        self.timeouts_left.set(n);
        self
    }

    pub fn remaining(&self) -> Vec<Assessor> {
        self.assessors.borrow().clone()
    }

    fn maybe_time_out(&self) -> Result<(), ArchiveError> {
        let left = self.timeouts_left.get();
        if left > 0 {
            self.timeouts_left.set(left - 1);
            return Err(ArchiveError::Timeout("scripted".into()));
        }
        Ok(())
    }
}

impl ArchiveClient for InMemoryArchive {
    fn list_project_assessors(&self, project: &str) -> Result<Vec<Assessor>, ArchiveError> {
        Ok(self
            .assessors
            .borrow()
            .iter()
            .filter(|a| a.project_id == project)
            .cloned()
            .collect())
    }

    fn assessor_exists(&self, assessor: &Assessor) -> Result<bool, ArchiveError> {
        self.exists_calls.set(self.exists_calls.get() + 1);
        self.maybe_time_out()?;
        Ok(self.assessors.borrow().iter().any(|a| a == assessor))
    }

    fn delete_assessor(&self, assessor: &Assessor) -> Result<(), ArchiveError> {
        self.delete_calls.set(self.delete_calls.get() + 1);
        let mut all = self.assessors.borrow_mut();
        let before = all.len();
        all.retain(|a| a != assessor);
        if all.len() == before {
            return Err(ArchiveError::NotFound(assessor.label.clone()));
        }
        Ok(())
    }
}
