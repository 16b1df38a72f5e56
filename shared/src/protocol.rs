//! JSON wire protocol between the Atoms client and the game server.
//!
//! Every frame is an adjacently tagged object: `{"type": "playerMove", "data": {...}}`.
//! Entity lists inside `gameState` are decoded leniently so a single malformed entity
//! never costs the rest of the snapshot.

use crate::{from_wire_list, wire_color, BulletData, Color, EntityId, PlayerData, ResourceData};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Intents sent by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ClientMessage {
    Join {
        name: String,
    },
    PlayerMove {
        x: f32,
        y: f32,
        vx: f32,
        vy: f32,
    },
    Shoot {
        #[serde(rename = "targetX")]
        target_x: f32,
        #[serde(rename = "targetY")]
        target_y: f32,
    },
    ResourceCollected {
        id: EntityId,
    },
    RestartGame,
}

impl ClientMessage {
    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Wire name of the message, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Join { .. } => "join",
            Self::PlayerMove { .. } => "playerMove",
            Self::Shoot { .. } => "shoot",
            Self::ResourceCollected { .. } => "resourceCollected",
            Self::RestartGame => "restartGame",
        }
    }
}

/// Messages pushed by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ServerMessage {
    Joined(JoinedPayload),
    GameState(Snapshot),
    BulletFired(BulletData),
    /// Carries the bare player id.
    PlayerLeft(EntityId),
    PlayerHit(HitPayload),
    PlayerDied(DeathPayload),
    PlayerExploded(DeathPayload),
    Explosion(ExplosionPayload),
    /// Confirms a pickup that the collecting client already applied locally.
    ResourceCollected(CollectedPayload),
}

impl ServerMessage {
    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Joined(_) => "joined",
            Self::GameState(_) => "gameState",
            Self::BulletFired(_) => "bulletFired",
            Self::PlayerLeft(_) => "playerLeft",
            Self::PlayerHit(_) => "playerHit",
            Self::PlayerDied(_) => "playerDied",
            Self::PlayerExploded(_) => "playerExploded",
            Self::Explosion(_) => "explosion",
            Self::ResourceCollected(_) => "resourceCollected",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinedPayload {
    #[serde(rename = "playerId")]
    pub player_id: EntityId,
    #[serde(rename = "spawnX", alias = "playerX", default)]
    pub spawn_x: f32,
    #[serde(rename = "spawnY", alias = "playerY", default)]
    pub spawn_y: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HitPayload {
    #[serde(rename = "playerId")]
    pub player_id: EntityId,
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    #[serde(default, deserialize_with = "lenient_color")]
    pub color: Option<Color>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeathPayload {
    #[serde(rename = "playerId")]
    pub player_id: EntityId,
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    #[serde(default, deserialize_with = "lenient_color")]
    pub color: Option<Color>,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplosionPayload {
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    #[serde(default, deserialize_with = "lenient_color")]
    pub color: Option<Color>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectedPayload {
    #[serde(rename = "playerId")]
    pub player_id: EntityId,
    #[serde(rename = "resourceType", default)]
    pub resource_type: Option<String>,
}

fn lenient_color<'de, D>(deserializer: D) -> Result<Option<Color>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(wire_color(value.as_ref()))
}

/// One full authoritative description of the world at a server tick.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "RawSnapshot")]
pub struct Snapshot {
    pub players: Vec<PlayerData>,
    pub resources: Vec<ResourceData>,
    pub bullets: Vec<BulletData>,
    /// Server-computed aggregate, passed through untouched.
    #[serde(rename = "worldTotals")]
    pub world_totals: Value,
    /// Entities dropped during decoding because they carried no usable id.
    #[serde(skip)]
    pub skipped: usize,
}

#[derive(Deserialize)]
struct RawSnapshot {
    #[serde(default)]
    players: Value,
    #[serde(default, alias = "particles")]
    resources: Value,
    #[serde(default)]
    bullets: Value,
    #[serde(default, rename = "worldTotals")]
    world_totals: Value,
}

impl From<RawSnapshot> for Snapshot {
    fn from(raw: RawSnapshot) -> Self {
        let (players, skipped_players) = from_wire_list(&raw.players);
        let (resources, skipped_resources) = from_wire_list(&raw.resources);
        let (bullets, skipped_bullets) = from_wire_list(&raw.bullets);

        Self {
            players,
            resources,
            bullets,
            world_totals: raw.world_totals,
            skipped: skipped_players + skipped_resources + skipped_bullets,
        }
    }
}

impl Snapshot {
    pub fn new(
        players: Vec<PlayerData>,
        resources: Vec<ResourceData>,
        bullets: Vec<BulletData>,
    ) -> Self {
        Self {
            players,
            resources,
            bullets,
            world_totals: Value::Null,
            skipped: 0,
        }
    }

    pub fn with_world_totals(mut self, totals: Value) -> Self {
        self.world_totals = totals;
        self
    }
}
