//! Client-side prediction for the controlled player.
//!
//! Local input moves the controlled player immediately and the new position is sent to
//! the server as an intent. The server never corrects that position through snapshots.
//! Resource pickups are decided locally too: an overlapping resource disappears at once
//! and a collect intent is sent. If the server disagrees it simply keeps listing the
//! resource and the next snapshot brings it back.

use crate::config::{EngineConfig, TimeStep};
use crate::connection::Intents;
use crate::input::{Axes, FireGesture, InputSource, Viewport};
use crate::render::{Cue, EntityRef, EntityView, RenderAdapter};
use crate::sync::StateSynchronizer;
use crate::world::WorldState;
use log::trace;
use shared::EntityId;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MotionState {
    #[default]
    Idle,
    Moving,
}

/// Velocity and displacement for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Motion {
    pub vx: f32,
    pub vy: f32,
    pub dx: f32,
    pub dy: f32,
}

/// Normalizes the sampled axes so diagonals are no faster than straight moves.
pub fn predict_motion(axes: Axes, speed: f32, dt: f32) -> Option<Motion> {
    let (raw_x, raw_y) = axes.vector();
    let magnitude = (raw_x * raw_x + raw_y * raw_y).sqrt();
    if magnitude == 0.0 {
        return None;
    }

    let vx = raw_x / magnitude * speed;
    let vy = raw_y / magnitude * speed;
    Some(Motion {
        vx,
        vy,
        dx: vx * dt,
        dy: vy * dt,
    })
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickOutcome {
    pub state: MotionState,
    /// New predicted position, when the player moved this tick.
    pub position: Option<(f32, f32)>,
    /// Resources picked up this tick, in id order.
    pub collected: Vec<EntityId>,
}

pub struct PredictionEngine {
    input: InputSource,
    speed: f32,
    time_step: TimeStep,
    state: MotionState,
    velocity: (f32, f32),
    focus_captured: bool,
}

impl PredictionEngine {
    pub fn new(input: InputSource, config: &EngineConfig) -> Self {
        Self {
            input,
            speed: config.player_speed,
            time_step: config.time_step,
            state: MotionState::Idle,
            velocity: (0.0, 0.0),
            focus_captured: false,
        }
    }

    pub fn input_mut(&mut self) -> &mut InputSource {
        &mut self.input
    }

    pub fn state(&self) -> MotionState {
        self.state
    }

    pub fn velocity(&self) -> (f32, f32) {
        self.velocity
    }

    /// While a text field or overlay holds focus, movement and firing are ignored.
    pub fn set_focus_captured(&mut self, captured: bool) {
        self.focus_captured = captured;
    }

    pub fn tick(
        &mut self,
        world: &mut WorldState,
        elapsed: Duration,
        intents: &mut dyn Intents,
        render: &mut dyn RenderAdapter,
        sync: &StateSynchronizer,
    ) -> TickOutcome {
        let mut outcome = TickOutcome::default();
        if world.controlled_player().is_none() {
            self.state = MotionState::Idle;
            return outcome;
        }

        let motion = if self.focus_captured {
            None
        } else {
            predict_motion(
                self.input.sample(),
                self.speed,
                self.time_step.seconds(elapsed),
            )
        };

        match (motion, world.controlled_player_mut()) {
            (Some(motion), Some(player)) => {
                player.x += motion.dx;
                player.y += motion.dy;
                render.update_entity(EntityView::Player(player));
                render.camera_follow(EntityRef::player(player.id.clone()));
                intents.move_to(player.x, player.y, motion.vx, motion.vy);

                self.state = MotionState::Moving;
                self.velocity = (motion.vx, motion.vy);
                outcome.position = Some((player.x, player.y));
            }
            _ => {
                self.state = MotionState::Idle;
                self.velocity = (0.0, 0.0);
            }
        }

        outcome.collected = collect_overlapping(world, intents, render, sync);
        outcome.state = self.state;
        outcome
    }

    /// Sends a shoot intent at the gesture's world target.
    pub fn fire(
        &self,
        world: &WorldState,
        gesture: FireGesture,
        viewport: &Viewport,
        intents: &mut dyn Intents,
    ) -> Option<(f32, f32)> {
        if self.focus_captured || world.controlled_player().is_none() {
            return None;
        }

        let (target_x, target_y) = gesture.target(viewport);
        intents.shoot(target_x, target_y);
        Some((target_x, target_y))
    }
}

/// Speculatively collects every resource strictly inside the controlled player's radius.
fn collect_overlapping(
    world: &mut WorldState,
    intents: &mut dyn Intents,
    render: &mut dyn RenderAdapter,
    sync: &StateSynchronizer,
) -> Vec<EntityId> {
    let Some(player) = world.controlled_player() else {
        return Vec::new();
    };

    let mut touched: Vec<EntityId> = world
        .resources
        .values()
        .filter(|resource| player.distance_to(resource.x, resource.y) < player.radius)
        .map(|resource| resource.id.clone())
        .collect();
    touched.sort();

    for id in &touched {
        if sync.remove_resource(world, id, render).is_some() {
            trace!("Collected {}", id);
            render.play_cue(Cue::Collect);
            intents.collect(id);
        }
    }

    touched
}
