//! The client engine: one owner for the world mirror and every component that touches it.
//!
//! Everything here runs on the frame thread. Each frame the host calls `pump` to apply
//! whatever the server sent since the last frame, then `tick` to advance prediction.
//! Because both run in sequence on one thread, a snapshot is always applied completely
//! before or after a prediction tick, never in the middle of one.

use crate::config::EngineConfig;
use crate::connection::{ConnectionManager, Inbound};
use crate::events::EventBridge;
use crate::input::{FireGesture, InputSource, Viewport};
use crate::prediction::{PredictionEngine, TickOutcome};
use crate::render::RenderAdapter;
use crate::stats::UiSink;
use crate::sync::StateSynchronizer;
use crate::transport::Channel;
use crate::world::WorldState;
use log::{info, warn};
use std::time::{Duration, Instant};

/// Timing for one frame.
#[derive(Debug, Clone, Copy)]
pub struct Frame {
    pub now: Instant,
    /// Time since the previous frame.
    pub elapsed: Duration,
}

pub struct Engine<R: RenderAdapter, U: UiSink> {
    world: WorldState,
    connection: ConnectionManager,
    sync: StateSynchronizer,
    prediction: PredictionEngine,
    events: EventBridge,
    render: R,
    ui: U,
}

impl<R: RenderAdapter, U: UiSink> Engine<R, U> {
    pub fn new(config: EngineConfig, input: InputSource, render: R, ui: U) -> Self {
        Self {
            world: WorldState::new(),
            connection: ConnectionManager::new(),
            sync: StateSynchronizer::new(),
            prediction: PredictionEngine::new(input, &config),
            events: EventBridge::new(&config),
            render,
            ui,
        }
    }

    pub fn attach(&mut self, channel: Channel, name: &str) {
        self.connection.attach(channel, name);
    }

    /// Applies every message received since the last call. Returns how many were handled.
    pub fn pump(&mut self, now: Instant) -> usize {
        let inbound = self.connection.poll();
        let handled = inbound.len();
        for message in inbound {
            self.dispatch(message, now);
        }
        handled
    }

    pub fn dispatch(&mut self, inbound: Inbound, now: Instant) {
        match inbound {
            Inbound::Joined(joined) => {
                info!(
                    "Spawned as {} at ({:.0}, {:.0})",
                    joined.player_id, joined.spawn_x, joined.spawn_y
                );
                self.world.controlled = Some(joined.player_id);
                self.render.camera_center(joined.spawn_x, joined.spawn_y);
            }
            Inbound::Snapshot(snapshot) => {
                let report =
                    self.sync
                        .reconcile(&mut self.world, snapshot, &mut self.render, &mut self.ui);
                for player in &report.departed {
                    self.events.depart(player, now, &mut self.render);
                }
            }
            Inbound::Event(event) => self.events.handle(
                event,
                now,
                &mut self.world,
                &self.sync,
                &mut self.render,
                &mut self.ui,
            ),
            Inbound::Lost => {
                warn!("Connection to server lost");
                self.render.connection_lost();
                self.ui.connection_lost("Connection to server lost");
            }
        }
    }

    /// Expires finished bursts, then runs one prediction step.
    pub fn tick(&mut self, frame: Frame) -> TickOutcome {
        self.events.advance(frame.now, &mut self.render);
        self.prediction.tick(
            &mut self.world,
            frame.elapsed,
            &mut self.connection,
            &mut self.render,
            &self.sync,
        )
    }

    pub fn fire(&mut self, gesture: FireGesture, viewport: &Viewport) -> Option<(f32, f32)> {
        self.prediction
            .fire(&self.world, gesture, viewport, &mut self.connection)
    }

    pub fn restart(&mut self) {
        info!("Requesting restart");
        self.connection.restart();
    }

    pub fn set_ui_focus(&mut self, captured: bool) {
        self.prediction.set_focus_captured(captured);
    }

    /// Closes the connection and drops every visual. Pending burst cleanups still run
    /// on later ticks. Safe to call more than once.
    pub fn teardown(&mut self) {
        self.connection.close();
        self.render.discard_all();
        self.world.reset();
        info!("Engine torn down");
    }

    pub fn world(&self) -> &WorldState {
        &self.world
    }

    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    pub fn prediction(&self) -> &PredictionEngine {
        &self.prediction
    }

    pub fn input_mut(&mut self) -> &mut InputSource {
        self.prediction.input_mut()
    }

    pub fn pending_bursts(&self) -> usize {
        self.events.pending_bursts()
    }

    pub fn render(&self) -> &R {
        &self.render
    }

    pub fn render_mut(&mut self) -> &mut R {
        &mut self.render
    }

    pub fn ui(&self) -> &U {
        &self.ui
    }

    pub fn ui_mut(&mut self) -> &mut U {
        &mut self.ui
    }

    /// Both collaborators at once, for drawing.
    pub fn collaborators_mut(&mut self) -> (&mut R, &mut U) {
        (&mut self.render, &mut self.ui)
    }
}
