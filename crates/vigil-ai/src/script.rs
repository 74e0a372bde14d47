//! Script collaborator
//!
//! Actors don't interpret scripts; they hand labels to a [`ScriptHost`] and
//! apply the [`ActorCommand`]s a thread issues until it suspends.
//! [`ScriptBook`] is a table-driven host: each label is a fixed list of steps.

use std::collections::BTreeMap;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use vigil_core::EntityId;

use crate::commands::ActorCommand;
use crate::error::AiError;

/// Upper bound on steps one `run` call executes
const MAX_STEPS_PER_RUN: usize = 256;

/// Handle to a script thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ThreadId(pub u32);

/// A resolved `"file::label"` reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptLabel(pub String);

/// Where a thread was, so it can be resumed exactly there
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeMarker {
    pub thread: ThreadId,
    pub label: Option<String>,
    pub pc: usize,
    pub waiting: bool,
}

/// A variable exported to a script
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScriptValue {
    Float(f32),
    Str(String),
    Vector(Vec3),
    Entity(Option<EntityId>),
}

/// Scripting collaborator
pub trait ScriptHost {
    /// Resolve a `"file::label"` reference
    fn resolve(&self, label: &str) -> Option<ScriptLabel>;

    /// Create a thread for `owner` parked at `label`
    fn create_thread(&mut self, owner: EntityId, label: &ScriptLabel) -> ThreadId;

    fn thread_alive(&self, thread: ThreadId) -> bool;

    /// Record where `thread` currently is
    fn mark(&self, thread: ThreadId) -> Option<ResumeMarker>;

    /// Put a thread back at a recorded position; `None` if it no longer exists
    fn restore(&mut self, marker: &ResumeMarker) -> Option<ThreadId>;

    /// Move a thread to the start of `label`
    fn goto(&mut self, thread: ThreadId, label: &ScriptLabel);

    /// Run a thread until it suspends, returning the commands it issued
    fn run(&mut self, thread: ThreadId) -> Vec<ActorCommand>;

    /// Wake a thread waiting on its behavior and run it
    fn behavior_done(&mut self, thread: ThreadId) -> Vec<ActorCommand>;

    fn set_var(&mut self, thread: ThreadId, name: &str, value: ScriptValue);

    /// Drop every thread owned by `owner`
    fn remove_threads(&mut self, owner: EntityId);

    /// Serialized thread state for save games
    fn save_threads(&self) -> Result<serde_json::Value, AiError> {
        Ok(serde_json::Value::Null)
    }

    fn load_threads(&mut self, _state: serde_json::Value) -> Result<(), AiError> {
        Ok(())
    }
}

/// One step of a table-driven script
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScriptStep {
    Command(ActorCommand),
    /// Suspend until the actor's behavior completes
    WaitBehavior,
    /// Continue at another label
    Goto(String),
    /// End the thread
    Stop,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ScriptThread {
    owner: Option<EntityId>,
    label: Option<String>,
    pc: usize,
    waiting: bool,
    vars: BTreeMap<String, ScriptValue>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ThreadState {
    threads: BTreeMap<ThreadId, ScriptThread>,
    next_thread: u32,
}

/// Script host where every label is a fixed list of steps
#[derive(Debug, Clone, Default)]
pub struct ScriptBook {
    labels: BTreeMap<String, Vec<ScriptStep>>,
    state: ThreadState,
    /// Every label a thread was sent to, in order
    log: Vec<(ThreadId, String)>,
}

impl ScriptBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define (or replace) a label
    pub fn define(&mut self, label: &str, steps: Vec<ScriptStep>) {
        self.labels.insert(label.to_string(), steps);
    }

    /// Labels threads were sent to, oldest first
    pub fn dispatch_log(&self) -> &[(ThreadId, String)] {
        &self.log
    }

    /// How many times any thread was sent to `label`
    pub fn dispatch_count(&self, label: &str) -> usize {
        self.log.iter().filter(|(_, l)| l == label).count()
    }

    pub fn var(&self, thread: ThreadId, name: &str) -> Option<&ScriptValue> {
        self.state.threads.get(&thread)?.vars.get(name)
    }

    pub fn is_waiting(&self, thread: ThreadId) -> bool {
        self.state.threads.get(&thread).is_some_and(|t| t.waiting)
    }
}

impl ScriptHost for ScriptBook {
    fn resolve(&self, label: &str) -> Option<ScriptLabel> {
        if label.contains("::") && self.labels.contains_key(label) {
            Some(ScriptLabel(label.to_string()))
        } else {
            None
        }
    }

    fn create_thread(&mut self, owner: EntityId, label: &ScriptLabel) -> ThreadId {
        self.state.next_thread += 1;
        let id = ThreadId(self.state.next_thread);
        self.state.threads.insert(
            id,
            ScriptThread {
                owner: Some(owner),
                label: Some(label.0.clone()),
                ..Default::default()
            },
        );
        id
    }

    fn thread_alive(&self, thread: ThreadId) -> bool {
        self.state.threads.contains_key(&thread)
    }

    fn mark(&self, thread: ThreadId) -> Option<ResumeMarker> {
        let t = self.state.threads.get(&thread)?;
        Some(ResumeMarker {
            thread,
            label: t.label.clone(),
            pc: t.pc,
            waiting: t.waiting,
        })
    }

    fn restore(&mut self, marker: &ResumeMarker) -> Option<ThreadId> {
        let t = self.state.threads.get_mut(&marker.thread)?;
        t.label = marker.label.clone();
        t.pc = marker.pc;
        t.waiting = marker.waiting;
        Some(marker.thread)
    }

    fn goto(&mut self, thread: ThreadId, label: &ScriptLabel) {
        if let Some(t) = self.state.threads.get_mut(&thread) {
            t.label = Some(label.0.clone());
            t.pc = 0;
            t.waiting = false;
            self.log.push((thread, label.0.clone()));
        }
    }

    fn run(&mut self, thread: ThreadId) -> Vec<ActorCommand> {
        let mut issued = Vec::new();
        let Some(t) = self.state.threads.get_mut(&thread) else {
            return issued;
        };
        if t.waiting {
            return issued;
        }

        for _ in 0..MAX_STEPS_PER_RUN {
            let Some(label) = t.label.clone() else {
                break;
            };
            let step = self.labels.get(&label).and_then(|steps| steps.get(t.pc)).cloned();
            match step {
                Some(ScriptStep::Command(command)) => {
                    issued.push(command);
                    t.pc += 1;
                }
                Some(ScriptStep::WaitBehavior) => {
                    t.pc += 1;
                    t.waiting = true;
                    break;
                }
                Some(ScriptStep::Goto(next)) => {
                    self.log.push((thread, next.clone()));
                    t.label = Some(next);
                    t.pc = 0;
                }
                Some(ScriptStep::Stop) | None => {
                    t.label = None;
                    t.pc = 0;
                    break;
                }
            }
        }
        issued
    }

    fn behavior_done(&mut self, thread: ThreadId) -> Vec<ActorCommand> {
        match self.state.threads.get_mut(&thread) {
            Some(t) if t.waiting => t.waiting = false,
            _ => return Vec::new(),
        }
        self.run(thread)
    }

    fn set_var(&mut self, thread: ThreadId, name: &str, value: ScriptValue) {
        if let Some(t) = self.state.threads.get_mut(&thread) {
            t.vars.insert(name.to_string(), value);
        }
    }

    fn remove_threads(&mut self, owner: EntityId) {
        self.state.threads.retain(|_, t| t.owner != Some(owner));
    }

    fn save_threads(&self) -> Result<serde_json::Value, AiError> {
        Ok(serde_json::to_value(&self.state)?)
    }

    fn load_threads(&mut self, state: serde_json::Value) -> Result<(), AiError> {
        if !state.is_null() {
            self.state = serde_json::from_value(state)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book() -> ScriptBook {
        let mut book = ScriptBook::new();
        book.define(
            "guard::main",
            vec![
                ScriptStep::Command(ActorCommand::behavior("Idle", &[])),
                ScriptStep::WaitBehavior,
                ScriptStep::Command(ActorCommand::ClearEnemies),
                ScriptStep::Goto("guard::rest".to_string()),
            ],
        );
        book.define(
            "guard::rest",
            vec![ScriptStep::Command(ActorCommand::EndBehavior), ScriptStep::Stop],
        );
        book
    }

    #[test]
    fn test_resolve_requires_file_and_label() {
        let book = book();
        assert!(book.resolve("guard::main").is_some());
        assert!(book.resolve("main").is_none());
        assert!(book.resolve("guard::missing").is_none());
    }

    #[test]
    fn test_run_suspends_and_wakes() {
        let mut book = book();
        let label = book.resolve("guard::main").unwrap();
        let thread = book.create_thread(EntityId(1), &label);

        assert_eq!(book.run(thread), vec![ActorCommand::behavior("Idle", &[])]);
        assert!(book.is_waiting(thread));
        assert!(book.run(thread).is_empty());

        let woke = book.behavior_done(thread);
        assert_eq!(woke, vec![ActorCommand::ClearEnemies, ActorCommand::EndBehavior]);
        assert_eq!(book.dispatch_count("guard::rest"), 1);
        assert!(book.behavior_done(thread).is_empty());
    }

    #[test]
    fn test_marker_restores_position() {
        let mut book = book();
        let label = book.resolve("guard::main").unwrap();
        let thread = book.create_thread(EntityId(1), &label);
        book.run(thread);
        let marker = book.mark(thread).unwrap();

        let rest = book.resolve("guard::rest").unwrap();
        book.goto(thread, &rest);
        assert!(!book.is_waiting(thread));

        assert_eq!(book.restore(&marker), Some(thread));
        assert!(book.is_waiting(thread));

        book.remove_threads(EntityId(1));
        assert_eq!(book.restore(&marker), None);
    }
}
