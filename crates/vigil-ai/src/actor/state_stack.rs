//! Scripted action dispatch, the suspended-state stack and the behavior
//! install/end path.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use vigil_nav::Path;

use super::{Actor, StateTable};
use crate::behavior::Behavior;
use crate::commands::{ActorCommand, CommandTarget};
use crate::context::SimContext;
use crate::error::AiError;
use crate::script::{ResumeMarker, ScriptLabel, ThreadId};
use crate::steering::{ChaseGoal, TurnGoal};

/// Nesting limit for dispatches triggered by dispatches
const MAX_DISPATCH_DEPTH: u32 = 16;

/// A suspended execution state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorState {
    pub name: String,
    pub anim: String,
    pub anim_done: Option<String>,
    pub behavior: Option<Behavior>,
    pub behavior_thread: Option<ThreadId>,
    pub path: Option<Path>,
    /// Where the bound script thread was when this state was suspended
    pub marker: Option<ResumeMarker>,
    pub actions: StateTable,
}

impl Actor {
    /// Run the script response to `name`, suspending the current state.
    /// Returns whether a dispatch happened.
    pub fn do_action(&mut self, name: &str, force: bool, ctx: &mut SimContext<'_>) -> bool {
        let Some(entry) = self.actions.get(name) else {
            return false;
        };
        if entry.ignore && !force {
            return false;
        }
        let Some(label) = ctx.scripts.resolve(&entry.response) else {
            warn!(
                "Actor '{}' response '{}' to '{}' does not resolve",
                self.name, entry.response, name
            );
            return false;
        };
        if self.dispatch_depth >= MAX_DISPATCH_DEPTH {
            warn!("Actor '{}' dropped '{}': dispatch nested too deep", self.name, name);
            return false;
        }

        let thread = self.bound_thread(&label, ctx);
        let marker = ctx.scripts.mark(thread);
        self.push_state(marker);

        if self.has_anim("idle", ctx) {
            self.set_anim("idle", ctx);
        }
        self.state_name = name.to_string();
        self.export_vars(thread, ctx);

        info!("Actor '{}' dispatching '{}' -> {}", self.name, name, label.0);
        ctx.scripts.goto(thread, &label);
        let commands = ctx.scripts.run(thread);
        self.apply_commands(Some(thread), commands, ctx);
        true
    }

    /// Bind the actor's own script thread and run it up to its first
    /// suspension point
    pub fn bind_script(&mut self, label: &str, ctx: &mut SimContext<'_>) -> Result<(), AiError> {
        let Some(resolved) = ctx.scripts.resolve(label) else {
            return Err(AiError::UnresolvedScript {
                id: self.id,
                name: self.name.clone(),
                label: label.to_string(),
            });
        };
        let thread = ctx.scripts.create_thread(self.id, &resolved);
        self.thread = Some(thread);
        self.export_vars(thread, ctx);
        ctx.scripts.goto(thread, &resolved);
        let commands = ctx.scripts.run(thread);
        self.apply_commands(Some(thread), commands, ctx);
        Ok(())
    }

    fn bound_thread(&mut self, label: &ScriptLabel, ctx: &mut SimContext<'_>) -> ThreadId {
        match self.thread {
            Some(thread) if ctx.scripts.thread_alive(thread) => thread,
            _ => {
                let thread = ctx.scripts.create_thread(self.id, label);
                self.thread = Some(thread);
                thread
            }
        }
    }

    /// Move the live execution state onto the stack
    fn push_state(&mut self, marker: Option<ResumeMarker>) {
        let state = ActorState {
            name: self.state_name.clone(),
            anim: self.anim.name.clone(),
            anim_done: self.anim.on_done.clone(),
            behavior: self.behavior.take(),
            behavior_thread: self.behavior_thread.take(),
            path: self.path.take(),
            marker,
            actions: self.actions.clone(),
        };
        self.state_stack.push(state);
    }

    /// Resume the most recently suspended state. With nothing to resume the
    /// current behavior is ended and `false` returned.
    pub fn pop_state(&mut self, ctx: &mut SimContext<'_>) -> bool {
        let Some(state) = self.state_stack.pop() else {
            self.end_behavior(None, ctx);
            debug!("Actor '{}' has no state to resume", self.name);
            return false;
        };

        // The restored thread must not hear about the behavior being replaced
        let thread = self.thread.take();
        self.behavior_thread = None;
        if let Some(mut previous) = self.behavior.take() {
            debug!("Actor '{}' ends {} on resume", self.name, previous.kind());
            previous.end(self, ctx);
        }

        self.thread = match &state.marker {
            Some(marker) => {
                let restored = ctx.scripts.restore(marker);
                if restored.is_none() {
                    warn!("Actor '{}' lost its script thread on resume", self.name);
                }
                restored
            }
            None => thread,
        };

        if state.anim.is_empty() {
            self.anim = Default::default();
            self.movement.speed = 0.0;
        } else {
            self.set_anim_with(&state.anim, state.anim_done, ctx);
        }
        self.path = state.path;
        self.actions = state.actions;
        self.state_name = state.name;

        // resumed, not restarted: no second begin
        self.behavior = state.behavior;
        self.behavior_thread = state.behavior_thread;
        true
    }

    /// End every suspended state, discarding their behaviors and paths
    pub fn clear_state_stack(&mut self, ctx: &mut SimContext<'_>) {
        while let Some(mut state) = self.state_stack.pop() {
            if let Some(mut behavior) = state.behavior.take() {
                behavior.end(self, ctx);
            }
        }
    }

    /// Replace the active behavior. `caller` is the thread that asked for
    /// it; it is woken when the new behavior completes.
    pub fn set_behavior(&mut self, behavior: Behavior, caller: Option<ThreadId>, ctx: &mut SimContext<'_>) {
        self.end_behavior(caller, ctx);
        // a woken waiter may already have installed something
        if let Some(mut other) = self.behavior.take() {
            other.end(self, ctx);
        }
        self.behavior_thread = None;

        let mut behavior = behavior;
        debug!("Actor '{}' begins {}", self.name, behavior.kind());
        behavior.begin(self, ctx);
        self.behavior = Some(behavior);
        self.behavior_thread = caller;
    }

    /// End the active behavior and wake its waiting thread unless that is
    /// `caller` itself
    pub fn end_behavior(&mut self, caller: Option<ThreadId>, ctx: &mut SimContext<'_>) {
        let waiter = self.behavior_thread.take();
        let Some(mut behavior) = self.behavior.take() else {
            return;
        };
        debug!("Actor '{}' ends {}", self.name, behavior.kind());
        behavior.end(self, ctx);
        self.settle(ctx);

        if let Some(waiter) = waiter.filter(|w| Some(*w) != caller) {
            self.notify_behavior_done(waiter, ctx);
        }
    }

    /// Stop moving once no behavior drives the actor
    fn settle(&mut self, ctx: &SimContext<'_>) {
        if self.movement.speed == 0.0 {
            return;
        }
        if !(self.has_anim("idle", ctx) && self.set_anim("idle", ctx)) {
            self.movement.speed = 0.0;
        }
    }

    fn notify_behavior_done(&mut self, waiter: ThreadId, ctx: &mut SimContext<'_>) {
        let commands = ctx.scripts.behavior_done(waiter);
        self.apply_commands(Some(waiter), commands, ctx);
    }

    /// Evaluate the active behavior, ending it when it reports completion
    pub(crate) fn evaluate_behavior(&mut self, ctx: &mut SimContext<'_>) {
        let Some(mut behavior) = self.behavior.take() else {
            return;
        };
        let keep = behavior.evaluate(self, ctx);

        if keep && self.behavior.is_none() {
            self.behavior = Some(behavior);
            return;
        }

        debug!("Actor '{}' completed {}", self.name, behavior.kind());
        behavior.end(self, ctx);
        if self.behavior.is_none() {
            self.settle(ctx);
        }
        if let Some(waiter) = self.behavior_thread.take() {
            self.notify_behavior_done(waiter, ctx);
        }
    }

    /// Dispatch actions queued during evaluation
    pub(crate) fn flush_pending(&mut self, ctx: &mut SimContext<'_>) {
        for action in std::mem::take(&mut self.pending) {
            self.do_action(&action.name, action.force, ctx);
        }
    }

    /// Apply commands a script thread issued
    pub fn apply_commands(
        &mut self,
        thread: Option<ThreadId>,
        commands: Vec<ActorCommand>,
        ctx: &mut SimContext<'_>,
    ) {
        if commands.is_empty() {
            return;
        }
        if self.dispatch_depth >= MAX_DISPATCH_DEPTH {
            warn!(
                "Actor '{}' dropped {} script commands: dispatch nested too deep",
                self.name,
                commands.len()
            );
            return;
        }
        self.dispatch_depth += 1;
        for command in commands {
            self.apply_command(thread, command, ctx);
        }
        self.dispatch_depth -= 1;
    }

    fn apply_command(&mut self, thread: Option<ThreadId>, command: ActorCommand, ctx: &mut SimContext<'_>) {
        match command {
            ActorCommand::Behavior { name, args } => {
                let behavior = Behavior::from_name(&name, &args).unwrap_or_else(|err| {
                    warn!("Actor '{}': {}; idling instead", self.name, err);
                    Behavior::idle()
                });
                self.set_behavior(behavior, thread, ctx);
            }
            ActorCommand::EndBehavior => self.end_behavior(thread, ctx),
            ActorCommand::PopState => {
                self.pop_state(ctx);
            }
            ActorCommand::SetState { action } => {
                if !self.do_action(&action, true, ctx) {
                    warn!("Actor '{}' has no usable response to '{}'", self.name, action);
                }
            }
            ActorCommand::SetAnim { name, on_done } => {
                self.set_anim_with(&name, on_done, ctx);
            }
            ActorCommand::DefineResponse { action, label } => self.actions.define(&action, &label),
            ActorCommand::CopyResponse { from, to } => {
                if !self.actions.copy(&from, &to) {
                    warn!("Actor '{}' cannot copy missing response '{}'", self.name, from);
                }
            }
            ActorCommand::EnableResponse { action } => self.actions.enable(&action),
            ActorCommand::DisableResponse { action } => self.actions.disable(&action),
            ActorCommand::ClearResponses => self.actions.clear(),
            ActorCommand::SetDisposition { disposition } => self.disposition = disposition,
            ActorCommand::SetVision { distance } => self.perception.vision_distance = distance.max(0.0),
            ActorCommand::SetFov { degrees } => self.perception.set_fov(degrees),
            ActorCommand::SetAttackRange { range } => self.combat.attack_range = range.max(0.0),
            ActorCommand::SetMeleeRange { range } => self.combat.melee_range = range.max(0.0),
            ActorCommand::SetTurnSpeed { degrees } => self.movement.turn_speed = degrees.max(0.0),
            ActorCommand::SetEyeOffset { offset } => self.perception.eye_offset = offset,
            ActorCommand::ClearEnemies => self.clear_enemies(),
            ActorCommand::LookAt { target } => {
                if let Some(point) = self.resolve_target(&target, ctx) {
                    self.face(point);
                }
            }
            ActorCommand::TurnTo { target } => {
                let goal = match target {
                    CommandTarget::Entity(id) => Some(TurnGoal::Entity(id)),
                    other => self.resolve_target(&other, ctx).map(TurnGoal::Point),
                };
                match goal {
                    Some(goal) => self.set_behavior(Behavior::turn_to(goal), thread, ctx),
                    None => warn!("Actor '{}' cannot turn to an unknown target", self.name),
                }
            }
            ActorCommand::WalkTo { target } => self.command_move(target, "walk", thread, ctx),
            ActorCommand::RunTo { target } => self.command_move(target, "run", thread, ctx),
            ActorCommand::JumpTo { target } => match self.resolve_target(&target, ctx) {
                Some(point) => self.set_behavior(Behavior::jump_to(point), thread, ctx),
                None => warn!("Actor '{}' cannot jump to an unknown target", self.name),
            },
            ActorCommand::Attack { target } => self.attack(target),
            ActorCommand::AttackPlayer => match ctx.world.player() {
                Some(player) => self.attack(player.id),
                None => warn!("Actor '{}' was told to attack a missing player", self.name),
            },
        }
    }

    fn command_move(
        &mut self,
        target: CommandTarget,
        anim: &str,
        thread: Option<ThreadId>,
        ctx: &mut SimContext<'_>,
    ) {
        let goal = match target {
            CommandTarget::Entity(id) => Some(ChaseGoal::Entity(id)),
            CommandTarget::Point(point) => Some(ChaseGoal::Point(point)),
            CommandTarget::Node(name) => ctx.nav.find_by_name(&name).map(ChaseGoal::Node),
        };
        match goal {
            Some(goal) => self.set_behavior(Behavior::goto(goal, anim), thread, ctx),
            None => warn!("Actor '{}' cannot move to an unknown target", self.name),
        }
    }

    /// World position of a command target
    pub fn resolve_target(&self, target: &CommandTarget, ctx: &SimContext<'_>) -> Option<glam::Vec3> {
        match target {
            CommandTarget::Entity(id) => ctx.world.get(*id).map(|e| e.origin),
            CommandTarget::Point(point) => Some(*point),
            CommandTarget::Node(name) => ctx
                .nav
                .find_by_name(name)
                .and_then(|id| ctx.nav.node(id))
                .map(|n| n.origin),
        }
    }
}
