//! Discrete server events turned into effects.
//!
//! Events never wait for the next snapshot: hits and deaths spawn a burst at once, and
//! a departure removes the player immediately. Bursts are short-lived entities whose
//! cleanup is scheduled here and run from `advance`, even after the scene was torn down.

use crate::config::EngineConfig;
use crate::connection::ServerEvent;
use crate::render::{Burst, Cue, EntityKind, EntityView, RenderAdapter};
use crate::stats::UiSink;
use crate::sync::StateSynchronizer;
use crate::world::{Player, WorldState};
use log::{debug, info};
use shared::{Color, EntityId};
use std::time::{Duration, Instant};

pub const HIT_COLOR: Color = 0xff4444;
pub const EXPLOSION_COLOR: Color = 0xffff00;
pub const DEPARTURE_COLOR: Color = 0xaaaaaa;

#[derive(Debug)]
struct PendingCleanup {
    id: EntityId,
    deadline: Instant,
}

pub struct EventBridge {
    burst_lifetime: Duration,
    shake_intensity: f32,
    shake_duration: Duration,
    next_burst: u64,
    pending: Vec<PendingCleanup>,
}

impl EventBridge {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            burst_lifetime: config.burst_lifetime,
            shake_intensity: config.hit_shake_intensity,
            shake_duration: config.hit_shake_duration,
            next_burst: 0,
            pending: Vec::new(),
        }
    }

    /// Bursts still waiting for their cleanup deadline.
    pub fn pending_bursts(&self) -> usize {
        self.pending.len()
    }

    pub fn handle(
        &mut self,
        event: ServerEvent,
        now: Instant,
        world: &mut WorldState,
        sync: &StateSynchronizer,
        render: &mut dyn RenderAdapter,
        ui: &mut dyn UiSink,
    ) {
        match event {
            ServerEvent::Hit(hit) => {
                render.play_cue(Cue::Impact);
                self.burst(hit.x, hit.y, hit.color.unwrap_or(HIT_COLOR), now, render);
                if world.is_controlled(&hit.player_id) {
                    render.camera_shake(self.shake_intensity, self.shake_duration);
                }
            }
            ServerEvent::Died(death) | ServerEvent::Exploded(death) => {
                render.play_cue(Cue::Explosion);
                self.burst(death.x, death.y, death.color.unwrap_or(HIT_COLOR), now, render);
                if world.is_controlled(&death.player_id) {
                    info!(
                        "Controlled player destroyed ({})",
                        death.reason.as_deref().unwrap_or("no reason given")
                    );
                    ui.game_over();
                }
            }
            ServerEvent::Left(id) => {
                if let Some(player) = sync.remove_player(world, &id, render) {
                    debug!("Player {} left", id);
                    self.depart(&player, now, render);
                }
            }
            ServerEvent::Explosion(explosion) => {
                render.play_cue(Cue::Explosion);
                self.burst(
                    explosion.x,
                    explosion.y,
                    explosion.color.unwrap_or(EXPLOSION_COLOR),
                    now,
                    render,
                );
            }
            ServerEvent::BulletFired(bullet) => sync.upsert_projectile(world, &bullet, render),
            ServerEvent::Collected(collected) => {
                if world.is_controlled(&collected.player_id) {
                    debug!("Server confirmed pickup");
                }
            }
        }
    }

    /// Departure burst at the player's last mirrored position. The player is already gone.
    pub fn depart(&mut self, player: &Player, now: Instant, render: &mut dyn RenderAdapter) {
        self.burst(player.x, player.y, DEPARTURE_COLOR, now, render);
    }

    /// Removes every burst whose lifetime has run out. Returns how many were removed.
    pub fn advance(&mut self, now: Instant, render: &mut dyn RenderAdapter) -> usize {
        let before = self.pending.len();
        self.pending.retain(|cleanup| {
            if cleanup.deadline <= now {
                render.remove_entity(EntityKind::Burst, &cleanup.id);
                false
            } else {
                true
            }
        });
        before - self.pending.len()
    }

    fn burst(&mut self, x: f32, y: f32, color: Color, now: Instant, render: &mut dyn RenderAdapter) {
        self.next_burst += 1;
        let burst = Burst {
            id: format!("burst-{}", self.next_burst),
            x,
            y,
            color,
        };
        render.create_entity(EntityView::Burst(&burst));
        self.pending.push(PendingCleanup {
            id: burst.id,
            deadline: now + self.burst_lifetime,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::{RecordingRenderer, RecordingUi, RenderCall};
    use shared::{
        CollectedPayload, DeathPayload, ExplosionPayload, HitPayload, PlayerData, Snapshot,
    };

    struct Fixture {
        bridge: EventBridge,
        world: WorldState,
        sync: StateSynchronizer,
        render: RecordingRenderer,
        ui: RecordingUi,
        now: Instant,
    }

    impl Fixture {
        fn new() -> Self {
            let mut fixture = Self {
                bridge: EventBridge::new(&EngineConfig::default()),
                world: WorldState::new(),
                sync: StateSynchronizer::new(),
                render: RecordingRenderer::default(),
                ui: RecordingUi::default(),
                now: Instant::now(),
            };
            fixture.world.controlled = Some("me".into());
            fixture.sync.reconcile(
                &mut fixture.world,
                Snapshot::new(
                    vec![
                        PlayerData::new("me", 0.0, 0.0),
                        PlayerData::new("other", 30.0, 40.0),
                    ],
                    vec![],
                    vec![],
                ),
                &mut fixture.render,
                &mut fixture.ui,
            );
            fixture.render.calls.clear();
            fixture
        }

        fn handle(&mut self, event: ServerEvent) {
            self.bridge.handle(
                event,
                self.now,
                &mut self.world,
                &self.sync,
                &mut self.render,
                &mut self.ui,
            );
        }
    }

    fn death(id: &str) -> DeathPayload {
        DeathPayload {
            player_id: id.into(),
            x: 1.0,
            y: 2.0,
            color: None,
            reason: None,
        }
    }

    #[test]
    fn test_hit_on_controlled_player_shakes_camera() {
        let mut f = Fixture::new();
        f.handle(ServerEvent::Hit(HitPayload {
            player_id: "me".into(),
            x: 5.0,
            y: 5.0,
            color: None,
        }));

        assert_eq!(f.render.cues(), vec![Cue::Impact]);
        assert_eq!(f.render.bursts().len(), 1);
        assert_eq!(
            f.render.shakes(),
            vec![(0.008, Duration::from_millis(150))]
        );
    }

    #[test]
    fn test_hit_on_other_player_does_not_shake() {
        let mut f = Fixture::new();
        f.handle(ServerEvent::Hit(HitPayload {
            player_id: "other".into(),
            x: 5.0,
            y: 5.0,
            color: Some(0x00ff00),
        }));
        assert!(f.render.shakes().is_empty());
    }

    #[test]
    fn test_game_over_only_for_controlled_player() {
        let mut f = Fixture::new();
        f.handle(ServerEvent::Died(death("other")));
        assert_eq!(f.ui.game_overs, 0);

        f.handle(ServerEvent::Exploded(death("me")));
        assert_eq!(f.ui.game_overs, 1);
        assert_eq!(f.render.cues(), vec![Cue::Explosion, Cue::Explosion]);
    }

    #[test]
    fn test_departure_removes_player_immediately() {
        let mut f = Fixture::new();
        f.handle(ServerEvent::Left("other".into()));
        f.handle(ServerEvent::Left("other".into()));

        assert!(!f.world.players.contains_key("other"));
        assert_eq!(f.render.removals_of(EntityKind::Player, "other"), 1);
        assert_eq!(f.render.bursts().len(), 1);
        assert!(f.render.cues().is_empty());
        assert!(f.render.calls.contains(&RenderCall::Create(EntityKind::Burst, "burst-1".into())));
    }

    #[test]
    fn test_pickup_confirmation_has_no_effects() {
        let mut f = Fixture::new();
        f.handle(ServerEvent::Collected(CollectedPayload {
            player_id: "me".into(),
            resource_type: Some("proton".into()),
        }));
        f.handle(ServerEvent::Collected(CollectedPayload {
            player_id: "other".into(),
            resource_type: None,
        }));

        assert!(f.render.calls.is_empty());
        assert_eq!(f.bridge.pending_bursts(), 0);
        assert_eq!(f.world.players.len(), 2);
    }

    #[test]
    fn test_bursts_expire_after_lifetime() {
        let mut f = Fixture::new();
        f.handle(ServerEvent::Explosion(ExplosionPayload {
            x: 0.0,
            y: 0.0,
            color: None,
        }));
        f.handle(ServerEvent::Explosion(ExplosionPayload {
            x: 9.0,
            y: 9.0,
            color: None,
        }));
        let ids = f.render.bursts();
        assert_eq!(ids, vec!["burst-1".to_string(), "burst-2".to_string()]);

        assert_eq!(f.bridge.advance(f.now + Duration::from_millis(500), &mut f.render), 0);
        assert_eq!(f.bridge.advance(f.now + Duration::from_millis(800), &mut f.render), 2);
        assert_eq!(f.bridge.pending_bursts(), 0);
        assert_eq!(f.render.removals_of(EntityKind::Burst, "burst-1"), 1);
    }

    #[test]
    fn test_bullet_fired_upserts_projectile() {
        let mut f = Fixture::new();
        f.handle(ServerEvent::BulletFired(shared::BulletData::new("b1", 3.0, 4.0)));
        assert!(f.world.projectiles.contains_key("b1"));
        assert_eq!(
            f.render.calls,
            vec![RenderCall::Create(EntityKind::Projectile, "b1".into())]
        );
    }
}
