//! Instrumented behavior for lifecycle tests

use std::cell::RefCell;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::BehaviorState;
use crate::actor::Actor;
use crate::context::SimContext;

thread_local! {
    static LOG: RefCell<HashMap<u32, Vec<&'static str>>> = RefCell::new(HashMap::new());
}

fn record(id: u32, event: &'static str) {
    LOG.with(|log| log.borrow_mut().entry(id).or_default().push(event));
}

/// Lifecycle calls recorded for `id` on this thread
pub(crate) fn recorded_calls(id: u32) -> Vec<&'static str> {
    LOG.with(|log| log.borrow().get(&id).cloned().unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recorder {
    pub id: u32,
    /// Complete after this many evaluations; 0 runs forever
    pub finish_after: u32,
    pub evaluations: u32,
}

impl Recorder {
    pub fn new(id: u32) -> Self {
        Self::finishing_after(id, 0)
    }

    pub fn finishing_after(id: u32, finish_after: u32) -> Self {
        Self {
            id,
            finish_after,
            evaluations: 0,
        }
    }

    pub fn from_args(id: u32, finish_after: u32) -> Self {
        Self::finishing_after(id, finish_after)
    }
}

impl BehaviorState for Recorder {
    fn begin(&mut self, _actor: &mut Actor, _ctx: &mut SimContext<'_>) {
        record(self.id, "begin");
    }

    fn evaluate(&mut self, _actor: &mut Actor, _ctx: &mut SimContext<'_>) -> bool {
        record(self.id, "evaluate");
        self.evaluations += 1;
        self.finish_after == 0 || self.evaluations < self.finish_after
    }

    fn end(&mut self, _actor: &mut Actor, _ctx: &mut SimContext<'_>) {
        record(self.id, "end");
    }

    fn show_info(&self) -> String {
        format!("recorder {} ({} evaluations)", self.id, self.evaluations)
    }
}
