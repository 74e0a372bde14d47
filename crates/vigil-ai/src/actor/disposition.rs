//! Who likes and hates whom
//!
//! Relations are computed pairwise from dispositions and player flags every
//! time they are asked for; nothing is stored.

use serde::{Deserialize, Serialize};

use super::Actor;
use crate::world::{EntityFlags, EntityInfo};

/// Disposition category. Declaration order is the category ordering:
/// everything up to and including `Enemy` counts as hostile stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Disposition {
    Inanimate,
    Monster,
    Enemy,
    Civilian,
    Friend,
    Animal,
}

impl Disposition {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "inanimate" => Some(Self::Inanimate),
            "monster" => Some(Self::Monster),
            "enemy" => Some(Self::Enemy),
            "civilian" => Some(Self::Civilian),
            "friend" => Some(Self::Friend),
            "animal" => Some(Self::Animal),
            _ => None,
        }
    }
}

impl Actor {
    /// Whether this actor counts `other` as an ally
    pub fn likes(&self, other: &EntityInfo) -> bool {
        if other.is_player() {
            return other.is_alive() && self.disposition == Disposition::Friend;
        }
        match other.actor {
            Some(actor) => {
                self.disposition != Disposition::Monster && actor.disposition == self.disposition
            }
            None => false,
        }
    }

    /// Whether this actor is hostile toward `other`
    pub fn hates(&self, other: &EntityInfo) -> bool {
        let mine = self.disposition;
        if mine == Disposition::Inanimate {
            return false;
        }

        if other.is_player() {
            if mine == Disposition::Enemy && other.flags.contains(EntityFlags::MUTANT) {
                return false;
            }
            return !matches!(mine, Disposition::Civilian | Disposition::Friend);
        }

        let Some(actor) = other.actor else {
            return false;
        };
        let theirs = actor.disposition;
        if theirs == Disposition::Inanimate {
            return false;
        }
        if mine <= Disposition::Enemy && theirs <= Disposition::Enemy {
            return false;
        }
        (mine == Disposition::Friend && theirs <= Disposition::Enemy)
            || (mine <= Disposition::Enemy && theirs == Disposition::Friend)
    }
}
