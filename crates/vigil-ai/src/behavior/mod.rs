//! Behavior library
//!
//! A behavior is a resumable strategy the actor runs until it completes or
//! is replaced. Every variant is plain serializable data; the owning actor
//! is passed in on each call.

mod aim;
mod idle;
mod jump;
mod melee;
mod roam;
mod search;
mod strafe;

#[cfg(test)]
pub(crate) mod recorder;

pub use aim::{Aim, AimAndShoot, FireMode, FireOnSight, ShootMode};
pub use idle::{Idle, PlayAnim, PlayAnimSeekEnemy, TurnTo};
pub use jump::{Jump, JumpMode};
pub use melee::{AimAndMelee, Melee, PickupAndThrow, Repel};
pub use roam::Roam;
pub use search::{
    FindCover, FindEnemy, FindFlee, Flee, FleeAndRemove, GetCloseToEnemy, GetCloseToObject,
    GotoPathNode, Hide, Investigate, InvestigateMode, NodeKind, NodeSearch, SearchMode, SearchStep,
};
pub use strafe::{Side, StrafeAttack, StrafeTo};

use glam::Vec3;
use serde::{Deserialize, Serialize};
use vigil_core::EntityId;

use crate::actor::{Actor, MoveType};
use crate::context::SimContext;
use crate::error::AiError;
use crate::steering::{ChaseGoal, TurnGoal};

/// Lifecycle every behavior follows: `begin` once, `evaluate` each tick
/// until it returns false or the behavior is replaced, `end` once.
pub trait BehaviorState {
    fn begin(&mut self, _actor: &mut Actor, _ctx: &mut SimContext<'_>) {}

    /// Returns false when the behavior has completed
    fn evaluate(&mut self, actor: &mut Actor, ctx: &mut SimContext<'_>) -> bool;

    fn end(&mut self, _actor: &mut Actor, _ctx: &mut SimContext<'_>) {}

    fn show_info(&self) -> String;
}

/// Run `$body` with `$state` bound to the variant's state
macro_rules! with_state {
    ($behavior:expr, $state:ident => $body:expr) => {
        match $behavior {
            Behavior::Idle($state) => $body,
            Behavior::Aim($state) => $body,
            Behavior::FireOnSight($state) => $body,
            Behavior::TurnTo($state) => $body,
            Behavior::Jump($state) => $body,
            Behavior::GotoPathNode($state) => $body,
            Behavior::Investigate($state) => $body,
            Behavior::Flee($state) => $body,
            Behavior::FindFlee($state) => $body,
            Behavior::FindCover($state) => $body,
            Behavior::FindEnemy($state) => $body,
            Behavior::Hide($state) => $body,
            Behavior::FleeAndRemove($state) => $body,
            Behavior::AimAndShoot($state) => $body,
            Behavior::AimAndMelee($state) => $body,
            Behavior::Melee($state) => $body,
            Behavior::Repel($state) => $body,
            Behavior::PickupAndThrow($state) => $body,
            Behavior::StrafeAttack($state) => $body,
            Behavior::StrafeTo($state) => $body,
            Behavior::Swim($state)
            | Behavior::SwimCloseAttack($state)
            | Behavior::Fly($state)
            | Behavior::FlyCloseAttack($state)
            | Behavior::Wander($state)
            | Behavior::WanderCloseAttack($state) => $body,
            Behavior::GetCloseToEnemy($state) => $body,
            Behavior::GetCloseToObject($state) => $body,
            Behavior::PlayAnim($state) => $body,
            Behavior::PlayAnimSeekEnemy($state) => $body,
            #[cfg(test)]
            Behavior::Recorder($state) => $body,
        }
    };
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Behavior {
    Idle(Idle),
    Aim(Aim),
    FireOnSight(FireOnSight),
    TurnTo(TurnTo),
    Jump(Jump),
    GotoPathNode(GotoPathNode),
    Investigate(Investigate),
    Flee(Flee),
    FindFlee(FindFlee),
    FindCover(FindCover),
    FindEnemy(FindEnemy),
    Hide(Hide),
    FleeAndRemove(FleeAndRemove),
    AimAndShoot(AimAndShoot),
    AimAndMelee(AimAndMelee),
    Melee(Melee),
    Repel(Repel),
    PickupAndThrow(PickupAndThrow),
    StrafeAttack(StrafeAttack),
    StrafeTo(StrafeTo),
    Swim(Roam),
    SwimCloseAttack(Roam),
    Fly(Roam),
    FlyCloseAttack(Roam),
    Wander(Roam),
    WanderCloseAttack(Roam),
    GetCloseToEnemy(GetCloseToEnemy),
    GetCloseToObject(GetCloseToObject),
    PlayAnim(PlayAnim),
    PlayAnimSeekEnemy(PlayAnimSeekEnemy),
    #[cfg(test)]
    Recorder(recorder::Recorder),
}

impl Behavior {
    pub fn idle() -> Self {
        Self::Idle(Idle::default())
    }

    pub fn turn_to(goal: TurnGoal) -> Self {
        Self::TurnTo(TurnTo::new(goal))
    }

    pub fn goto(goal: ChaseGoal, anim: &str) -> Self {
        Self::GotoPathNode(GotoPathNode::to_goal(goal, anim))
    }

    pub fn jump_to(target: Vec3) -> Self {
        Self::Jump(Jump::toward(Some(target)))
    }

    /// Build a behavior from a script command. Names are case-insensitive.
    pub fn from_name(name: &str, args: &[String]) -> Result<Self, AiError> {
        let args = Args { args };
        let behavior = match name.to_ascii_lowercase().as_str() {
            "idle" => Self::idle(),
            "aim" => Self::Aim(Aim::new(args.f32_or("Aim", 0, aim::AIM_TOLERANCE)?)),
            "fireonsight" => Self::FireOnSight(FireOnSight::new()),
            "turnto" => {
                let mut turn = TurnTo::new(TurnGoal::Yaw(args.f32("TurnTo", 0, "yaw")?));
                turn.set_tolerance(args.f32_or("TurnTo", 1, 1.0)?);
                Self::TurnTo(turn)
            }
            "jump" => Self::Jump(Jump::toward(args.vec3_opt("Jump", 0)?)),
            "gotopathnode" => Self::GotoPathNode(GotoPathNode::to_node(
                args.str("GotoPathNode", 0, "node")?,
                args.str_or(1, "walk"),
            )),
            "investigate" => Self::Investigate(Investigate::new()),
            "flee" => Self::Flee(Flee::new()),
            "findflee" => Self::FindFlee(FindFlee::new()),
            "findcover" => Self::FindCover(FindCover::new()),
            "findenemy" => Self::FindEnemy(FindEnemy::new()),
            "hide" => Self::Hide(Hide::new()),
            "fleeandremove" => Self::FleeAndRemove(FleeAndRemove::new()),
            "aimandshoot" => Self::AimAndShoot(AimAndShoot::new(args.u32_or("AimAndShoot", 0, 1)?)),
            "aimandmelee" => Self::AimAndMelee(AimAndMelee::new()),
            "melee" => Self::Melee(Melee::new()),
            "repel" => Self::Repel(Repel::new(args.f32_or("Repel", 0, melee::REPEL_KNOCKBACK)?)),
            "pickupandthrow" => Self::PickupAndThrow(PickupAndThrow::new(args.entity("PickupAndThrow", 0)?)),
            "strafeattack" => Self::StrafeAttack(StrafeAttack::new(args.f32_or("StrafeAttack", 0, 3.0)?)),
            "strafeto" => Self::StrafeTo(StrafeTo::new(
                strafe::side_from_name(&args.str_or(0, "left"))
                    .ok_or_else(|| args.invalid("StrafeTo", 0))?,
                args.f32_or("StrafeTo", 1, strafe::STRAFE_DISTANCE)?,
            )),
            "swim" => Self::Swim(Roam::new(MoveType::Swim, false)),
            "swimcloseattack" => Self::SwimCloseAttack(Roam::new(MoveType::Swim, true)),
            "fly" => Self::Fly(Roam::new(MoveType::Fly, false)),
            "flycloseattack" => Self::FlyCloseAttack(Roam::new(MoveType::Fly, true)),
            "wander" => Self::Wander(Roam::new(MoveType::Walk, false)),
            "wandercloseattack" => Self::WanderCloseAttack(Roam::new(MoveType::Walk, true)),
            "getclosetoenemy" => Self::GetCloseToEnemy(GetCloseToEnemy::new(args.f32_opt("GetCloseToEnemy", 0)?)),
            "getclosetoobject" => Self::GetCloseToObject(GetCloseToObject::new(
                args.entity("GetCloseToObject", 0)?,
                args.f32_opt("GetCloseToObject", 1)?,
            )),
            "playanim" => Self::PlayAnim(PlayAnim::new(args.str("PlayAnim", 0, "anim")?)),
            "playanimseekenemy" => {
                Self::PlayAnimSeekEnemy(PlayAnimSeekEnemy::new(args.str("PlayAnimSeekEnemy", 0, "anim")?))
            }
            #[cfg(test)]
            "recorder" => Self::Recorder(recorder::Recorder::from_args(args.u32_or("Recorder", 0, 0)?, args.u32_or("Recorder", 1, 0)?)),
            _ => return Err(AiError::UnknownBehavior(name.to_string())),
        };
        Ok(behavior)
    }

    /// Stable name of the variant
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Idle(_) => "Idle",
            Self::Aim(_) => "Aim",
            Self::FireOnSight(_) => "FireOnSight",
            Self::TurnTo(_) => "TurnTo",
            Self::Jump(_) => "Jump",
            Self::GotoPathNode(_) => "GotoPathNode",
            Self::Investigate(_) => "Investigate",
            Self::Flee(_) => "Flee",
            Self::FindFlee(_) => "FindFlee",
            Self::FindCover(_) => "FindCover",
            Self::FindEnemy(_) => "FindEnemy",
            Self::Hide(_) => "Hide",
            Self::FleeAndRemove(_) => "FleeAndRemove",
            Self::AimAndShoot(_) => "AimAndShoot",
            Self::AimAndMelee(_) => "AimAndMelee",
            Self::Melee(_) => "Melee",
            Self::Repel(_) => "Repel",
            Self::PickupAndThrow(_) => "PickupAndThrow",
            Self::StrafeAttack(_) => "StrafeAttack",
            Self::StrafeTo(_) => "StrafeTo",
            Self::Swim(_) => "Swim",
            Self::SwimCloseAttack(_) => "SwimCloseAttack",
            Self::Fly(_) => "Fly",
            Self::FlyCloseAttack(_) => "FlyCloseAttack",
            Self::Wander(_) => "Wander",
            Self::WanderCloseAttack(_) => "WanderCloseAttack",
            Self::GetCloseToEnemy(_) => "GetCloseToEnemy",
            Self::GetCloseToObject(_) => "GetCloseToObject",
            Self::PlayAnim(_) => "PlayAnim",
            Self::PlayAnimSeekEnemy(_) => "PlayAnimSeekEnemy",
            #[cfg(test)]
            Self::Recorder(_) => "Recorder",
        }
    }

    fn state(&self) -> &dyn BehaviorState {
        with_state!(self, b => b as &dyn BehaviorState)
    }

    fn state_mut(&mut self) -> &mut dyn BehaviorState {
        with_state!(self, b => b as &mut dyn BehaviorState)
    }

    pub fn begin(&mut self, actor: &mut Actor, ctx: &mut SimContext<'_>) {
        self.state_mut().begin(actor, ctx);
    }

    pub fn evaluate(&mut self, actor: &mut Actor, ctx: &mut SimContext<'_>) -> bool {
        self.state_mut().evaluate(actor, ctx)
    }

    pub fn end(&mut self, actor: &mut Actor, ctx: &mut SimContext<'_>) {
        self.state_mut().end(actor, ctx);
    }

    pub fn show_info(&self) -> String {
        format!("{}: {}", self.kind(), self.state().show_info())
    }
}

/// Positional script arguments
struct Args<'a> {
    args: &'a [String],
}

impl Args<'_> {
    fn get(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str).filter(|a| !a.is_empty())
    }

    fn invalid(&self, behavior: &'static str, index: usize) -> AiError {
        AiError::InvalidArgument {
            behavior,
            value: self.get(index).unwrap_or_default().to_string(),
        }
    }

    fn str(&self, behavior: &'static str, index: usize, argument: &'static str) -> Result<String, AiError> {
        self.get(index)
            .map(str::to_string)
            .ok_or(AiError::MissingArgument { behavior, argument })
    }

    fn str_or(&self, index: usize, default: &str) -> String {
        self.get(index).unwrap_or(default).to_string()
    }

    fn f32_opt(&self, behavior: &'static str, index: usize) -> Result<Option<f32>, AiError> {
        self.get(index)
            .map(|value| value.parse::<f32>().map_err(|_| self.invalid(behavior, index)))
            .transpose()
    }

    fn f32(&self, behavior: &'static str, index: usize, argument: &'static str) -> Result<f32, AiError> {
        self.f32_opt(behavior, index)?
            .ok_or(AiError::MissingArgument { behavior, argument })
    }

    fn f32_or(&self, behavior: &'static str, index: usize, default: f32) -> Result<f32, AiError> {
        Ok(self.f32_opt(behavior, index)?.unwrap_or(default))
    }

    fn u32_or(&self, behavior: &'static str, index: usize, default: u32) -> Result<u32, AiError> {
        match self.get(index) {
            Some(value) => value.parse().map_err(|_| self.invalid(behavior, index)),
            None => Ok(default),
        }
    }

    fn entity(&self, behavior: &'static str, index: usize) -> Result<EntityId, AiError> {
        let value = self.get(index).ok_or(AiError::MissingArgument {
            behavior,
            argument: "entity",
        })?;
        value
            .trim_start_matches('#')
            .parse()
            .map(EntityId)
            .map_err(|_| self.invalid(behavior, index))
    }

    /// Three consecutive numbers starting at `index`, if present
    fn vec3_opt(&self, behavior: &'static str, index: usize) -> Result<Option<Vec3>, AiError> {
        let Some(x) = self.f32_opt(behavior, index)? else {
            return Ok(None);
        };
        let y = self.f32(behavior, index + 1, "y")?;
        let z = self.f32(behavior, index + 2, "z")?;
        Ok(Some(Vec3::new(x, y, z)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_names_are_case_insensitive() {
        let behavior = Behavior::from_name("FIREONSIGHT", &[]).unwrap();
        assert_eq!(behavior.kind(), "FireOnSight");
        let behavior = Behavior::from_name("wanderCloseAttack", &[]).unwrap();
        assert_eq!(behavior.kind(), "WanderCloseAttack");
    }

    #[test]
    fn test_argument_errors() {
        assert!(matches!(
            Behavior::from_name("dance", &[]),
            Err(AiError::UnknownBehavior(_))
        ));
        assert!(matches!(
            Behavior::from_name("PlayAnim", &[]),
            Err(AiError::MissingArgument { argument: "anim", .. })
        ));
        assert!(matches!(
            Behavior::from_name("TurnTo", &args(&["north"])),
            Err(AiError::InvalidArgument { .. })
        ));
        assert!(Behavior::from_name("Jump", &args(&["1", "2", "3"])).is_ok());
        assert!(Behavior::from_name("GetCloseToObject", &args(&["#7"])).is_ok());
    }

    #[test]
    fn test_archive_is_tagged_by_kind() {
        let behavior = Behavior::from_name("TurnTo", &args(&["90"])).unwrap();
        let json = serde_json::to_value(&behavior).unwrap();
        assert_eq!(json["kind"], "TurnTo");
        let restored: Behavior = serde_json::from_value(json).unwrap();
        assert_eq!(restored, behavior);
    }
}
