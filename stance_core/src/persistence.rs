use crate::context::StanceContext;
use crate::manager::StanceManager;
use serde::Serialize;
use stability_core::StabilityRecord;
use std::cell::RefCell;
use std::rc::Rc;

/// Collaborator notified after every outcome dispatch
pub trait OutcomePersistence {
    fn record_result(&mut self, result: &str, context: &StanceContext, manager: &StanceManager);
}

/// Snapshot taken when an outcome is recorded
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutcomeEntry {
    pub result: String,
    pub stance: Option<String>,
    pub record: Option<StabilityRecord>,
    pub charge: i32,
    pub hp: i32,
}

/// In-memory outcome history
///
/// Clones share the same history.
#[derive(Debug, Default, Clone)]
pub struct OutcomeLog {
    entries: Rc<RefCell<Vec<OutcomeEntry>>>,
}

impl OutcomeLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<OutcomeEntry> {
        self.entries.borrow().clone()
    }

    pub fn last(&self) -> Option<OutcomeEntry> {
        self.entries.borrow().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl OutcomePersistence for OutcomeLog {
    fn record_result(&mut self, result: &str, context: &StanceContext, manager: &StanceManager) {
        self.entries.borrow_mut().push(OutcomeEntry {
            result: result.to_string(),
            stance: manager.current_identifier().map(str::to_string),
            record: manager.current_record().cloned(),
            charge: context.charge,
            hp: context.hp,
        });
    }
}
