//! Snapshot reconciliation.
//!
//! Each `gameState` carries the complete authoritative entity sets, so the synchronizer
//! computes its own diff against the local mirror. Per collection it removes stale
//! entities first, then creates unknown ids and updates known ones in place.

use crate::render::{EntityKind, EntityView, RenderAdapter};
use crate::stats::{Stats, UiSink};
use crate::world::{Player, Projectile, Resource, WorldState};
use log::{debug, warn};
use shared::{BulletData, EntityId, PlayerData, ResourceData, Snapshot};
use std::collections::{HashMap, HashSet};

/// A locally mirrored entity built from its wire data.
trait Mirrored: Sized {
    type Data;
    const KIND: EntityKind;

    fn data_id(data: &Self::Data) -> &str;
    fn create(data: &Self::Data) -> Self;
    /// `owned_position` is true only for the controlled player.
    fn update(&mut self, data: &Self::Data, owned_position: bool);
    fn view(&self) -> EntityView<'_>;
}

impl Mirrored for Player {
    type Data = PlayerData;
    const KIND: EntityKind = EntityKind::Player;

    fn data_id(data: &PlayerData) -> &str {
        &data.id
    }

    fn create(data: &PlayerData) -> Self {
        Player::from_data(data)
    }

    fn update(&mut self, data: &PlayerData, owned_position: bool) {
        self.apply(data, owned_position);
    }

    fn view(&self) -> EntityView<'_> {
        EntityView::Player(self)
    }
}

impl Mirrored for Resource {
    type Data = ResourceData;
    const KIND: EntityKind = EntityKind::Resource;

    fn data_id(data: &ResourceData) -> &str {
        &data.id
    }

    fn create(data: &ResourceData) -> Self {
        Resource::from_data(data)
    }

    fn update(&mut self, data: &ResourceData, _owned_position: bool) {
        self.apply(data);
    }

    fn view(&self) -> EntityView<'_> {
        EntityView::Resource(self)
    }
}

impl Mirrored for Projectile {
    type Data = BulletData;
    const KIND: EntityKind = EntityKind::Projectile;

    fn data_id(data: &BulletData) -> &str {
        &data.id
    }

    fn create(data: &BulletData) -> Self {
        Projectile::from_data(data)
    }

    fn update(&mut self, data: &BulletData, _owned_position: bool) {
        self.apply(data);
    }

    fn view(&self) -> EntityView<'_> {
        EntityView::Projectile(self)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionDiff {
    pub created: usize,
    pub updated: usize,
    pub removed: Vec<EntityId>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileReport {
    pub players: CollectionDiff,
    pub resources: CollectionDiff,
    pub projectiles: CollectionDiff,
    /// Players that vanished from the snapshot, as last mirrored. These left the game;
    /// they did not die.
    pub departed: Vec<Player>,
    /// Entities dropped while decoding the snapshot.
    pub skipped: usize,
    pub stats_pushed: bool,
}

fn reconcile_collection<E: Mirrored>(
    entities: &mut HashMap<EntityId, E>,
    incoming: &[E::Data],
    controlled: Option<&str>,
    render: &mut dyn RenderAdapter,
) -> (CollectionDiff, Vec<E>) {
    let live: HashSet<&str> = incoming.iter().map(E::data_id).collect();
    let stale: Vec<EntityId> = entities
        .keys()
        .filter(|id| !live.contains(id.as_str()))
        .cloned()
        .collect();

    let mut removed = Vec::with_capacity(stale.len());
    for id in &stale {
        if let Some(entity) = entities.remove(id) {
            render.remove_entity(E::KIND, id);
            removed.push(entity);
        }
    }

    let mut diff = CollectionDiff {
        removed: stale,
        ..CollectionDiff::default()
    };

    for data in incoming {
        let id = E::data_id(data);
        if let Some(existing) = entities.get_mut(id) {
            existing.update(data, controlled == Some(id));
            render.update_entity(existing.view());
            diff.updated += 1;
        } else {
            let entity = E::create(data);
            render.create_entity(entity.view());
            entities.insert(id.to_string(), entity);
            diff.created += 1;
        }
    }

    (diff, removed)
}

#[derive(Debug, Default)]
pub struct StateSynchronizer {
    snapshots_applied: u64,
}

impl StateSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshots_applied(&self) -> u64 {
        self.snapshots_applied
    }

    /// Brings `world` in line with one full snapshot and pushes the stats summary.
    pub fn reconcile(
        &mut self,
        world: &mut WorldState,
        snapshot: Snapshot,
        render: &mut dyn RenderAdapter,
        ui: &mut dyn UiSink,
    ) -> ReconcileReport {
        let controlled = world.controlled.clone();
        let controlled = controlled.as_deref();

        let (players, departed) =
            reconcile_collection(&mut world.players, &snapshot.players, controlled, render);
        let (resources, _) =
            reconcile_collection(&mut world.resources, &snapshot.resources, None, render);
        let (projectiles, _) =
            reconcile_collection(&mut world.projectiles, &snapshot.bullets, None, render);

        if snapshot.skipped > 0 {
            warn!(
                "Snapshot contained {} entities without an id; skipped them",
                snapshot.skipped
            );
        }
        for player in &departed {
            debug!("Player {} left the world", player.id);
        }

        let mut report = ReconcileReport {
            players,
            resources,
            projectiles,
            departed,
            skipped: snapshot.skipped,
            stats_pushed: false,
        };

        if let Some(player) = world.controlled_player() {
            let stats = Stats::summarize(player, snapshot.players, snapshot.world_totals);
            ui.stats(&stats);
            report.stats_pushed = true;
        }

        self.snapshots_applied += 1;
        debug!(
            "Snapshot {}: {} players, {} resources, {} projectiles",
            self.snapshots_applied,
            world.players.len(),
            world.resources.len(),
            world.projectiles.len()
        );

        report
    }

    /// Removes a player and releases its visual. Unknown ids are ignored.
    pub fn remove_player(
        &self,
        world: &mut WorldState,
        id: &str,
        render: &mut dyn RenderAdapter,
    ) -> Option<Player> {
        let removed = world.players.remove(id)?;
        render.remove_entity(EntityKind::Player, id);
        Some(removed)
    }

    pub fn remove_resource(
        &self,
        world: &mut WorldState,
        id: &str,
        render: &mut dyn RenderAdapter,
    ) -> Option<Resource> {
        let removed = world.resources.remove(id)?;
        render.remove_entity(EntityKind::Resource, id);
        Some(removed)
    }

    /// Inserts or updates a single projectile announced outside a snapshot.
    pub fn upsert_projectile(
        &self,
        world: &mut WorldState,
        data: &BulletData,
        render: &mut dyn RenderAdapter,
    ) {
        if let Some(existing) = world.projectiles.get_mut(&data.id) {
            existing.apply(data);
            render.update_entity(EntityView::Projectile(existing));
        } else {
            let projectile = Projectile::from_data(data);
            render.create_entity(EntityView::Projectile(&projectile));
            world.projectiles.insert(data.id.clone(), projectile);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::{RecordingRenderer, RecordingUi, RenderCall};
    use shared::ResourceKind;

    fn player(id: &str, x: f32, y: f32) -> PlayerData {
        PlayerData::new(id, x, y)
    }

    fn setup() -> (StateSynchronizer, WorldState, RecordingRenderer, RecordingUi) {
        (
            StateSynchronizer::new(),
            WorldState::new(),
            RecordingRenderer::default(),
            RecordingUi::default(),
        )
    }

    #[test]
    fn test_creates_unknown_entities() {
        let (mut sync, mut world, mut render, mut ui) = setup();
        let snapshot = Snapshot::new(
            vec![player("a", 1.0, 2.0), player("b", 3.0, 4.0)],
            vec![ResourceData::new("r1", 5.0, 5.0, ResourceKind::Electron)],
            vec![BulletData::new("b1", 0.0, 0.0)],
        );

        let report = sync.reconcile(&mut world, snapshot, &mut render, &mut ui);

        assert_eq!(report.players.created, 2);
        assert_eq!(report.resources.created, 1);
        assert_eq!(report.projectiles.created, 1);
        assert_eq!(world.players.len(), 2);
        assert_eq!(render.created(EntityKind::Player), 2);
        assert_eq!(render.created(EntityKind::Resource), 1);
        assert_eq!(render.created(EntityKind::Projectile), 1);
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let (mut sync, mut world, mut render, mut ui) = setup();
        world.controlled = Some("a".into());
        let mut me = player("a", 10.0, 10.0);
        me.stability = 42.0;
        let snapshot = Snapshot::new(
            vec![me, player("b", 50.0, 60.0)],
            vec![ResourceData::new("r1", 5.0, 5.0, ResourceKind::Proton)],
            vec![],
        );

        sync.reconcile(&mut world, snapshot.clone(), &mut render, &mut ui);
        let first: Vec<(String, f32, f32, f32)> = sorted_players(&world);

        let report = sync.reconcile(&mut world, snapshot, &mut render, &mut ui);
        let second = sorted_players(&world);

        assert_eq!(first, second);
        assert_eq!(report.players.created, 0);
        assert_eq!(report.players.updated, 2);
        assert!(report.players.removed.is_empty());
        assert_eq!(world.resources.len(), 1);
    }

    fn sorted_players(world: &WorldState) -> Vec<(String, f32, f32, f32)> {
        let mut players: Vec<_> = world
            .players
            .values()
            .map(|p| (p.id.clone(), p.x, p.y, p.stability))
            .collect();
        players.sort_by(|a, b| a.0.cmp(&b.0));
        players
    }

    #[test]
    fn test_absent_entities_removed_exactly_once() {
        let (mut sync, mut world, mut render, mut ui) = setup();
        let first = Snapshot::new(
            vec![player("a", 0.0, 0.0), player("b", 0.0, 0.0)],
            vec![
                ResourceData::new("r1", 0.0, 0.0, ResourceKind::Proton),
                ResourceData::new("r2", 0.0, 0.0, ResourceKind::Neutron),
            ],
            vec![BulletData::new("x", 0.0, 0.0)],
        );
        let second = Snapshot::new(
            vec![player("b", 1.0, 1.0)],
            vec![ResourceData::new("r2", 0.0, 0.0, ResourceKind::Neutron)],
            vec![],
        );

        sync.reconcile(&mut world, first, &mut render, &mut ui);
        let report = sync.reconcile(&mut world, second.clone(), &mut render, &mut ui);
        assert_eq!(report.players.removed, vec!["a".to_string()]);
        let departed = &report.departed;
        assert_eq!(departed.len(), 1);
        assert_eq!((departed[0].id.as_str(), departed[0].x), ("a", 0.0));
        assert_eq!(report.resources.removed, vec!["r1".to_string()]);
        assert_eq!(report.projectiles.removed, vec!["x".to_string()]);

        sync.reconcile(&mut world, second, &mut render, &mut ui);

        assert_eq!(render.removals_of(EntityKind::Player, "a"), 1);
        assert_eq!(render.removals_of(EntityKind::Resource, "r1"), 1);
        assert_eq!(render.removals_of(EntityKind::Projectile, "x"), 1);
        assert!(render
            .calls
            .iter()
            .filter(|c| matches!(c, RenderCall::Update(EntityKind::Player, id) if id == "a"))
            .count()
            == 0);
    }

    #[test]
    fn test_removals_happen_before_creations() {
        let (mut sync, mut world, mut render, mut ui) = setup();
        sync.reconcile(
            &mut world,
            Snapshot::new(vec![player("old", 0.0, 0.0)], vec![], vec![]),
            &mut render,
            &mut ui,
        );
        render.calls.clear();

        sync.reconcile(
            &mut world,
            Snapshot::new(vec![player("new", 0.0, 0.0)], vec![], vec![]),
            &mut render,
            &mut ui,
        );

        assert_eq!(
            render.calls,
            vec![
                RenderCall::Remove(EntityKind::Player, "old".into()),
                RenderCall::Create(EntityKind::Player, "new".into()),
            ]
        );
    }

    #[test]
    fn test_controlled_position_is_never_overwritten() {
        let (mut sync, mut world, mut render, mut ui) = setup();
        world.controlled = Some("me".into());
        sync.reconcile(
            &mut world,
            Snapshot::new(vec![player("me", 5.0, 5.0)], vec![], vec![]),
            &mut render,
            &mut ui,
        );
        assert_eq!(world.players["me"].x, 5.0);

        world.controlled_player_mut().unwrap().x = 77.0;
        world.controlled_player_mut().unwrap().y = 88.0;

        let mut update = player("me", 5.0, 5.0);
        update.radius = 35.0;
        update.stability = 12.0;
        update.element = "Boron".into();
        update.composition.protons = 5;
        sync.reconcile(
            &mut world,
            Snapshot::new(vec![update], vec![], vec![]),
            &mut render,
            &mut ui,
        );

        let me = &world.players["me"];
        assert_eq!((me.x, me.y), (77.0, 88.0));
        assert_eq!(me.radius, 35.0);
        assert_eq!(me.stability, 12.0);
        assert_eq!(me.element, "Boron");
        assert_eq!(me.composition.protons, 5);
    }

    #[test]
    fn test_other_players_take_server_position() {
        let (mut sync, mut world, mut render, mut ui) = setup();
        world.controlled = Some("me".into());
        let first = Snapshot::new(vec![player("other", 5.0, 5.0)], vec![], vec![]);
        sync.reconcile(&mut world, first, &mut render, &mut ui);

        world.players.get_mut("other").unwrap().x = 1000.0;
        let second = Snapshot::new(vec![player("other", 6.0, 7.0)], vec![], vec![]);
        sync.reconcile(&mut world, second, &mut render, &mut ui);

        assert_eq!((world.players["other"].x, world.players["other"].y), (6.0, 7.0));
    }

    #[test]
    fn test_identity_survives_updates() {
        let (mut sync, mut world, mut render, mut ui) = setup();
        for step in 0..3 {
            sync.reconcile(
                &mut world,
                Snapshot::new(
                    vec![player("a", step as f32, 0.0)],
                    vec![ResourceData::new("r", 0.0, step as f32, ResourceKind::Proton)],
                    vec![],
                ),
                &mut render,
                &mut ui,
            );
        }

        assert_eq!(world.players["a"].revision, 2);
        assert_eq!(world.resources["r"].revision, 2);
        assert_eq!(render.created(EntityKind::Player), 1);
    }

    #[test]
    fn test_duplicate_ids_in_snapshot_are_updates() {
        let (mut sync, mut world, mut render, mut ui) = setup();
        let report = sync.reconcile(
            &mut world,
            Snapshot::new(
                vec![player("a", 1.0, 1.0), player("a", 2.0, 2.0)],
                vec![],
                vec![],
            ),
            &mut render,
            &mut ui,
        );

        assert_eq!(world.players.len(), 1);
        assert_eq!(report.players.created, 1);
        assert_eq!(report.players.updated, 1);
        assert_eq!(world.players["a"].x, 2.0);
    }

    #[test]
    fn test_stats_pushed_once_per_snapshot_with_controlled_player() {
        let (mut sync, mut world, mut render, mut ui) = setup();
        let snapshot = Snapshot::new(vec![player("a", 0.0, 0.0)], vec![], vec![])
            .with_world_totals(serde_json::json!({ "protons": 3 }));

        let report = sync.reconcile(&mut world, snapshot.clone(), &mut render, &mut ui);
        assert!(!report.stats_pushed);
        assert!(ui.stats.is_empty());

        world.controlled = Some("a".into());
        sync.reconcile(&mut world, snapshot.clone(), &mut render, &mut ui);
        sync.reconcile(&mut world, snapshot, &mut render, &mut ui);

        assert_eq!(ui.stats.len(), 2);
        let stats = &ui.stats[1];
        assert_eq!(stats.players.len(), 1);
        assert_eq!(stats.world_total("protons"), Some(3));
        assert_eq!(sync.snapshots_applied(), 3);
    }

    #[test]
    fn test_remove_paths_ignore_unknown_ids() {
        let (sync, mut world, mut render, _) = setup();
        assert!(sync.remove_player(&mut world, "ghost", &mut render).is_none());
        assert!(sync.remove_resource(&mut world, "ghost", &mut render).is_none());
        assert!(render.calls.is_empty());
    }

    #[test]
    fn test_upsert_projectile() {
        let (sync, mut world, mut render, _) = setup();
        sync.upsert_projectile(&mut world, &BulletData::new("b", 1.0, 1.0), &mut render);
        sync.upsert_projectile(&mut world, &BulletData::new("b", 2.0, 3.0), &mut render);

        assert_eq!(world.projectiles.len(), 1);
        assert_eq!((world.projectiles["b"].x, world.projectiles["b"].y), (2.0, 3.0));
        assert_eq!(
            render.calls,
            vec![
                RenderCall::Create(EntityKind::Projectile, "b".into()),
                RenderCall::Update(EntityKind::Projectile, "b".into()),
            ]
        );
    }
}
