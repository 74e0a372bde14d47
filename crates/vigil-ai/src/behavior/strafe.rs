//! Sidestepping

use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};
use vigil_core::angles::angles_to_vectors;

use super::aim::{has_shot, Aim};
use super::BehaviorState;
use crate::actor::Actor;
use crate::context::SimContext;

/// Default sidestep length
pub(crate) const STRAFE_DISTANCE: f32 = 96.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// Multiplier on the actor's right vector
    fn sign(self) -> f32 {
        match self {
            Side::Left => -1.0,
            Side::Right => 1.0,
        }
    }

    fn anim(self) -> &'static str {
        match self {
            Side::Left => "strafe_left",
            Side::Right => "strafe_right",
        }
    }

    fn flip(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

pub(crate) fn side_from_name(name: &str) -> Option<Side> {
    match name.to_ascii_lowercase().as_str() {
        "left" => Some(Side::Left),
        "right" => Some(Side::Right),
        _ => None,
    }
}

/// One tick of sideways movement toward `side`
fn side_step(actor: &Actor, side: Side, ctx: &SimContext<'_>) -> Vec3 {
    let (_, right, _) = angles_to_vectors(Vec3::new(0.0, actor.yaw(), 0.0));
    right * side.sign() * actor.movement.speed * ctx.frame_time
}

fn start_strafe_anim(actor: &mut Actor, side: Side, ctx: &SimContext<'_>) {
    if !actor.set_anim(side.anim(), ctx) {
        actor.set_anim("walk", ctx);
    }
}

/// Sidestep a fixed distance without turning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrafeTo {
    pub side: Side,
    pub distance: f32,
    target: Option<Vec3>,
    moved: bool,
}

impl StrafeTo {
    pub fn new(side: Side, distance: f32) -> Self {
        Self {
            side,
            distance,
            target: None,
            moved: false,
        }
    }
}

impl BehaviorState for StrafeTo {
    fn begin(&mut self, actor: &mut Actor, ctx: &mut SimContext<'_>) {
        let (_, right, _) = angles_to_vectors(Vec3::new(0.0, actor.yaw(), 0.0));
        self.target = Some(actor.origin + right * self.side.sign() * self.distance);
        start_strafe_anim(actor, self.side, ctx);
    }

    fn evaluate(&mut self, actor: &mut Actor, ctx: &mut SimContext<'_>) -> bool {
        let Some(target) = self.target else {
            return false;
        };
        if self.moved && actor.movement.last_result.failed() {
            return false;
        }

        let mut remaining = target - actor.origin;
        remaining.z = 0.0;
        let step = actor.movement.speed * ctx.frame_time;
        self.moved = true;
        if remaining.length() <= step {
            actor.movement.frame_delta = Some(remaining);
            return false;
        }
        actor.movement.frame_delta = Some(remaining.normalize() * step);
        true
    }

    fn show_info(&self) -> String {
        format!("strafe {:?} {:.0} to {:?}", self.side, self.distance, self.target)
    }
}

/// Sidestep back and forth while shooting at the enemy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrafeAttack {
    pub duration: f32,
    until: f32,
    side: Side,
    moved: bool,
    aim: Aim,
}

impl StrafeAttack {
    pub fn new(duration: f32) -> Self {
        Self {
            duration,
            until: 0.0,
            side: Side::Left,
            moved: false,
            aim: Aim::default(),
        }
    }
}

impl BehaviorState for StrafeAttack {
    fn begin(&mut self, actor: &mut Actor, ctx: &mut SimContext<'_>) {
        self.until = ctx.time + self.duration;
        self.side = if ctx.rng.gen_bool(0.5) { Side::Left } else { Side::Right };
        start_strafe_anim(actor, self.side, ctx);
    }

    fn evaluate(&mut self, actor: &mut Actor, ctx: &mut SimContext<'_>) -> bool {
        if ctx.time >= self.until {
            return false;
        }
        let Some(enemy) = actor.live_enemy(ctx) else {
            return false;
        };

        if self.moved && actor.movement.last_result.failed() {
            self.side = self.side.flip();
            start_strafe_anim(actor, self.side, ctx);
        }
        actor.movement.frame_delta = Some(side_step(actor, self.side, ctx));
        self.moved = true;

        self.aim.track(actor, enemy.origin, ctx);
        if self.aim.is_aligned(actor, enemy.origin)
            && actor.weapon_ready(ctx)
            && has_shot(actor, enemy, ctx)
        {
            actor.fire(enemy, ctx);
        }
        true
    }

    fn show_info(&self) -> String {
        format!("strafe attack {:?} until {:.2}", self.side, self.until)
    }
}
