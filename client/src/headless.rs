//! Recording collaborators for running the engine without a window.
//!
//! Used by the unit and integration tests, and handy for bots or replay tooling.

use crate::connection::Intents;
use crate::render::{Cue, EntityKind, EntityRef, EntityView, RenderAdapter};
use crate::stats::{Stats, UiSink};
use shared::{ClientMessage, EntityId};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum RenderCall {
    Create(EntityKind, EntityId),
    Update(EntityKind, EntityId),
    Remove(EntityKind, EntityId),
    Cue(Cue),
    Follow(EntityRef),
    Center(f32, f32),
    Shake(f32, Duration),
    DiscardAll,
    ConnectionLost,
}

/// Keeps every adapter call in order, plus the last position seen per entity.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    pub calls: Vec<RenderCall>,
}

impl RecordingRenderer {
    pub fn created(&self, kind: EntityKind) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, RenderCall::Create(k, _) if *k == kind))
            .count()
    }

    pub fn removals_of(&self, kind: EntityKind, id: &str) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, RenderCall::Remove(k, i) if *k == kind && i == id))
            .count()
    }

    pub fn cues(&self) -> Vec<Cue> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                RenderCall::Cue(cue) => Some(*cue),
                _ => None,
            })
            .collect()
    }

    pub fn shakes(&self) -> Vec<(f32, Duration)> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                RenderCall::Shake(intensity, duration) => Some((*intensity, *duration)),
                _ => None,
            })
            .collect()
    }

    /// Ids of bursts created so far.
    pub fn bursts(&self) -> Vec<EntityId> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                RenderCall::Create(EntityKind::Burst, id) => Some(id.clone()),
                _ => None,
            })
            .collect()
    }
}

impl RenderAdapter for RecordingRenderer {
    fn create_entity(&mut self, view: EntityView<'_>) {
        self.calls
            .push(RenderCall::Create(view.kind(), view.id().to_string()));
    }

    fn update_entity(&mut self, view: EntityView<'_>) {
        self.calls
            .push(RenderCall::Update(view.kind(), view.id().to_string()));
    }

    fn remove_entity(&mut self, kind: EntityKind, id: &str) {
        self.calls.push(RenderCall::Remove(kind, id.to_string()));
    }

    fn play_cue(&mut self, cue: Cue) {
        self.calls.push(RenderCall::Cue(cue));
    }

    fn camera_follow(&mut self, target: EntityRef) {
        self.calls.push(RenderCall::Follow(target));
    }

    fn camera_center(&mut self, x: f32, y: f32) {
        self.calls.push(RenderCall::Center(x, y));
    }

    fn camera_shake(&mut self, intensity: f32, duration: Duration) {
        self.calls.push(RenderCall::Shake(intensity, duration));
    }

    fn discard_all(&mut self) {
        self.calls.push(RenderCall::DiscardAll);
    }

    fn connection_lost(&mut self) {
        self.calls.push(RenderCall::ConnectionLost);
    }
}

#[derive(Debug, Default)]
pub struct RecordingUi {
    pub stats: Vec<Stats>,
    pub game_overs: usize,
    pub lost: Vec<String>,
}

impl UiSink for RecordingUi {
    fn stats(&mut self, stats: &Stats) {
        self.stats.push(stats.clone());
    }

    fn game_over(&mut self) {
        self.game_overs += 1;
    }

    fn connection_lost(&mut self, reason: &str) {
        self.lost.push(reason.to_string());
    }
}

/// Collects intents as the messages a connection would have sent.
#[derive(Debug, Default)]
pub struct RecordingIntents {
    pub sent: Vec<ClientMessage>,
}

impl RecordingIntents {
    pub fn collected(&self) -> Vec<&str> {
        self.sent
            .iter()
            .filter_map(|message| match message {
                ClientMessage::ResourceCollected { id } => Some(id.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl Intents for RecordingIntents {
    fn move_to(&mut self, x: f32, y: f32, vx: f32, vy: f32) {
        self.sent.push(ClientMessage::PlayerMove { x, y, vx, vy });
    }

    fn shoot(&mut self, target_x: f32, target_y: f32) {
        self.sent.push(ClientMessage::Shoot { target_x, target_y });
    }

    fn collect(&mut self, resource_id: &str) {
        self.sent.push(ClientMessage::ResourceCollected {
            id: resource_id.to_string(),
        });
    }
}
