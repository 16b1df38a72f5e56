//! Contract between the synchronization core and whatever draws the world.
//!
//! The core never touches drawing primitives. It only tells the adapter which entities
//! appeared, changed or went away, and which cues and camera moves to perform. Adapters
//! must tolerate calls for ids they no longer know, including after `discard_all`.

use crate::world::{Player, Projectile, Resource};
use shared::{Color, EntityId};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Player,
    Resource,
    Projectile,
    /// Short-lived explosion effect owned by the event bridge.
    Burst,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: EntityId,
}

impl EntityRef {
    pub fn player(id: impl Into<EntityId>) -> Self {
        Self {
            kind: EntityKind::Player,
            id: id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Burst {
    pub id: EntityId,
    pub x: f32,
    pub y: f32,
    pub color: Color,
}

/// Borrowed view of an entity handed to the adapter on create and update.
#[derive(Debug, Clone, Copy)]
pub enum EntityView<'a> {
    Player(&'a Player),
    Resource(&'a Resource),
    Projectile(&'a Projectile),
    Burst(&'a Burst),
}

impl EntityView<'_> {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Player(_) => EntityKind::Player,
            Self::Resource(_) => EntityKind::Resource,
            Self::Projectile(_) => EntityKind::Projectile,
            Self::Burst(_) => EntityKind::Burst,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Player(p) => &p.id,
            Self::Resource(r) => &r.id,
            Self::Projectile(b) => &b.id,
            Self::Burst(b) => &b.id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cue {
    Impact,
    Explosion,
    Collect,
}

pub trait RenderAdapter {
    fn create_entity(&mut self, view: EntityView<'_>);

    fn update_entity(&mut self, view: EntityView<'_>);

    fn remove_entity(&mut self, kind: EntityKind, id: &str);

    fn play_cue(&mut self, cue: Cue);

    fn camera_follow(&mut self, target: EntityRef);

    fn camera_center(&mut self, x: f32, y: f32);

    fn camera_shake(&mut self, intensity: f32, duration: Duration);

    /// Drops every visual the adapter owns.
    fn discard_all(&mut self);

    fn connection_lost(&mut self) {}
}
