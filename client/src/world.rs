//! Local mirror of the server's world.
//!
//! `WorldState` is the only shared mutable state on the client. The synchronizer writes
//! every field except the controlled player's position, which belongs to the prediction
//! engine between snapshots.

use shared::{
    BulletData, Color, Composition, EntityId, PlayerData, ResourceData, ResourceKind,
};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub id: EntityId,
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub color: Color,
    pub composition: Composition,
    pub element: String,
    pub stability: f32,
    /// Number of snapshots applied to this entity since it was created.
    pub revision: u64,
}

impl Player {
    pub fn from_data(data: &PlayerData) -> Self {
        Self {
            id: data.id.clone(),
            name: data.name.clone(),
            x: data.x,
            y: data.y,
            radius: data.radius,
            color: data.color,
            composition: data.composition,
            element: data.element.clone(),
            stability: data.stability,
            revision: 0,
        }
    }

    /// Overwrites every server-owned field. Position is left alone when it is owned locally.
    pub fn apply(&mut self, data: &PlayerData, keep_position: bool) {
        if !keep_position {
            self.x = data.x;
            self.y = data.y;
        }
        self.name.clone_from(&data.name);
        self.radius = data.radius;
        self.color = data.color;
        self.composition = data.composition;
        self.element.clone_from(&data.element);
        self.stability = data.stability;
        self.revision += 1;
    }

    pub fn distance_to(&self, x: f32, y: f32) -> f32 {
        let dx = x - self.x;
        let dy = y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub id: EntityId,
    pub x: f32,
    pub y: f32,
    pub kind: Option<ResourceKind>,
    pub revision: u64,
}

impl Resource {
    pub fn from_data(data: &ResourceData) -> Self {
        Self {
            id: data.id.clone(),
            x: data.x,
            y: data.y,
            kind: data.kind,
            revision: 0,
        }
    }

    pub fn apply(&mut self, data: &ResourceData) {
        self.x = data.x;
        self.y = data.y;
        self.kind = data.kind;
        self.revision += 1;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Projectile {
    pub id: EntityId,
    pub x: f32,
    pub y: f32,
    pub owner: Option<EntityId>,
    pub revision: u64,
}

impl Projectile {
    pub fn from_data(data: &BulletData) -> Self {
        Self {
            id: data.id.clone(),
            x: data.x,
            y: data.y,
            owner: data.owner.clone(),
            revision: 0,
        }
    }

    pub fn apply(&mut self, data: &BulletData) {
        self.x = data.x;
        self.y = data.y;
        self.owner.clone_from(&data.owner);
        self.revision += 1;
    }
}

#[derive(Debug, Clone, Default)]
pub struct WorldState {
    pub players: HashMap<EntityId, Player>,
    pub resources: HashMap<EntityId, Resource>,
    pub projectiles: HashMap<EntityId, Projectile>,
    /// Id of the player this session moves and fires as, once the server has assigned it.
    pub controlled: Option<EntityId>,
}

impl WorldState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears all three collections. The controlled id survives until the next `joined`.
    pub fn reset(&mut self) {
        self.players.clear();
        self.resources.clear();
        self.projectiles.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty() && self.resources.is_empty() && self.projectiles.is_empty()
    }

    pub fn is_controlled(&self, id: &str) -> bool {
        self.controlled.as_deref() == Some(id)
    }

    pub fn controlled_player(&self) -> Option<&Player> {
        self.controlled.as_ref().and_then(|id| self.players.get(id))
    }

    pub fn controlled_player_mut(&mut self) -> Option<&mut Player> {
        let id = self.controlled.as_ref()?;
        self.players.get_mut(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_apply_keeps_owned_position() {
        let mut player = Player::from_data(&PlayerData::new("p1", 5.0, 5.0));
        player.x = 42.0;

        let mut update = PlayerData::new("p1", 900.0, 900.0);
        update.stability = 55.0;
        update.radius = 31.0;
        player.apply(&update, true);

        assert_eq!(player.x, 42.0);
        assert_eq!(player.y, 5.0);
        assert_eq!(player.stability, 55.0);
        assert_eq!(player.radius, 31.0);
        assert_eq!(player.revision, 1);

        player.apply(&update, false);
        assert_eq!((player.x, player.y), (900.0, 900.0));
        assert_eq!(player.revision, 2);
    }

    #[test]
    fn test_controlled_player_lookup() {
        let mut world = WorldState::new();
        assert!(world.controlled_player().is_none());

        world
            .players
            .insert("p1".into(), Player::from_data(&PlayerData::new("p1", 1.0, 2.0)));
        assert!(world.controlled_player().is_none());

        world.controlled = Some("p1".into());
        assert!(world.is_controlled("p1"));
        assert!(!world.is_controlled("p2"));
        world.controlled_player_mut().unwrap().x = 8.0;
        assert_eq!(world.controlled_player().unwrap().x, 8.0);
    }

    #[test]
    fn test_reset_clears_collections_only() {
        let mut world = WorldState::new();
        world.controlled = Some("p1".into());
        world
            .players
            .insert("p1".into(), Player::from_data(&PlayerData::new("p1", 0.0, 0.0)));
        world.resources.insert(
            "r1".into(),
            Resource::from_data(&ResourceData::new("r1", 0.0, 0.0, ResourceKind::Proton)),
        );
        world
            .projectiles
            .insert("b1".into(), Projectile::from_data(&BulletData::new("b1", 0.0, 0.0)));

        world.reset();

        assert!(world.is_empty());
        assert_eq!(world.controlled.as_deref(), Some("p1"));
    }
}
