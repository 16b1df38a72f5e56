//! Entity data and wire protocol shared by every Atoms client component.
//!
//! Nothing in here performs I/O. The entity `*Data` types are the server's view of the
//! world exactly as it arrives on the wire, after lenient field defaulting.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub mod protocol;

pub use protocol::{
    ClientMessage, CollectedPayload, DeathPayload, ExplosionPayload, HitPayload, JoinedPayload, ProtocolError,
    ServerMessage, Snapshot,
};

/// Predicted movement speed of the controlled entity, in world units per second.
pub const PLAYER_SPEED: f32 = 1000.0;
/// Nominal duration of one client tick, in seconds.
pub const TICK_SECONDS: f32 = 0.016;
pub const WORLD_WIDTH: f32 = 9000.0;
pub const WORLD_HEIGHT: f32 = 9000.0;

pub const DEFAULT_PLAYER_RADIUS: f32 = 20.0;
pub const DEFAULT_PLAYER_COLOR: Color = 0xffffff;
pub const DEFAULT_STABILITY: f32 = 100.0;
pub const DEFAULT_ELEMENT: &str = "Unknown";

pub type EntityId = String;
/// 0xRRGGBB
pub type Color = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Composition {
    pub protons: u32,
    pub neutrons: u32,
    pub electrons: u32,
}

impl Composition {
    pub fn total(&self) -> u32 {
        self.protons + self.neutrons + self.electrons
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerData {
    pub id: EntityId,
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub color: Color,
    #[serde(flatten)]
    pub composition: Composition,
    pub element: String,
    pub stability: f32,
}

impl PlayerData {
    pub fn new(id: impl Into<EntityId>, x: f32, y: f32) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            x,
            y,
            radius: DEFAULT_PLAYER_RADIUS,
            color: DEFAULT_PLAYER_COLOR,
            composition: Composition::default(),
            element: DEFAULT_ELEMENT.to_string(),
            stability: DEFAULT_STABILITY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Proton,
    Neutron,
    Electron,
}

impl ResourceKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "proton" => Some(Self::Proton),
            "neutron" => Some(Self::Neutron),
            "electron" => Some(Self::Electron),
            _ => None,
        }
    }

    pub fn color(&self) -> Color {
        match self {
            Self::Proton => 0xff4444,
            Self::Neutron => 0x888888,
            Self::Electron => 0x4444ff,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceData {
    pub id: EntityId,
    pub x: f32,
    pub y: f32,
    /// `None` when the server sent a type this client does not know.
    #[serde(rename = "type")]
    pub kind: Option<ResourceKind>,
}

impl ResourceData {
    pub fn new(id: impl Into<EntityId>, x: f32, y: f32, kind: ResourceKind) -> Self {
        Self {
            id: id.into(),
            x,
            y,
            kind: Some(kind),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulletData {
    pub id: EntityId,
    pub x: f32,
    pub y: f32,
    #[serde(rename = "ownerId", skip_serializing_if = "Option::is_none")]
    pub owner: Option<EntityId>,
}

impl BulletData {
    pub fn new(id: impl Into<EntityId>, x: f32, y: f32) -> Self {
        Self {
            id: id.into(),
            x,
            y,
            owner: None,
        }
    }
}

/// Builds an entity from an arbitrary JSON value, defaulting every field it can.
///
/// Returns `None` only when no usable id is present, since the entity could not be keyed.
pub trait FromWire: Sized {
    fn from_wire(value: &Value) -> Option<Self>;
}

impl FromWire for PlayerData {
    fn from_wire(value: &Value) -> Option<Self> {
        let id = wire_id(value.get("id"))?;
        Some(Self {
            id,
            name: wire_string(value.get("name")).unwrap_or_default(),
            x: wire_f32(value.get("x")).unwrap_or(0.0),
            y: wire_f32(value.get("y")).unwrap_or(0.0),
            radius: wire_f32(value.get("radius"))
                .filter(|r| *r > 0.0)
                .unwrap_or(DEFAULT_PLAYER_RADIUS),
            color: wire_color(value.get("color")).unwrap_or(DEFAULT_PLAYER_COLOR),
            composition: Composition {
                protons: wire_count(value.get("protons")),
                neutrons: wire_count(value.get("neutrons")),
                electrons: wire_count(value.get("electrons")),
            },
            element: wire_string(value.get("element"))
                .filter(|e| !e.is_empty())
                .unwrap_or_else(|| DEFAULT_ELEMENT.to_string()),
            stability: wire_f32(value.get("stability"))
                .unwrap_or(DEFAULT_STABILITY)
                .clamp(0.0, 100.0),
        })
    }
}

impl FromWire for ResourceData {
    fn from_wire(value: &Value) -> Option<Self> {
        Some(Self {
            id: wire_id(value.get("id"))?,
            x: wire_f32(value.get("x")).unwrap_or(0.0),
            y: wire_f32(value.get("y")).unwrap_or(0.0),
            kind: value
                .get("type")
                .and_then(Value::as_str)
                .and_then(ResourceKind::parse),
        })
    }
}

impl FromWire for BulletData {
    fn from_wire(value: &Value) -> Option<Self> {
        Some(Self {
            id: wire_id(value.get("id"))?,
            x: wire_f32(value.get("x")).unwrap_or(0.0),
            y: wire_f32(value.get("y")).unwrap_or(0.0),
            owner: wire_id(value.get("ownerId").or_else(|| value.get("owner"))),
        })
    }
}

macro_rules! deserialize_from_wire {
    ($($ty:ty),*) => {$(
        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let value = Value::deserialize(deserializer)?;
                <$ty>::from_wire(&value)
                    .ok_or_else(|| D::Error::custom(concat!(stringify!($ty), " without an id")))
            }
        }
    )*};
}

deserialize_from_wire!(PlayerData, ResourceData, BulletData);

/// Ids arrive as strings from most servers, but numeric ids are accepted too.
fn wire_id(value: Option<&Value>) -> Option<EntityId> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn wire_string(value: Option<&Value>) -> Option<String> {
    value.and_then(Value::as_str).map(str::to_string)
}

fn wire_f32(value: Option<&Value>) -> Option<f32> {
    let v = value?.as_f64()? as f32;
    v.is_finite().then_some(v)
}

fn wire_count(value: Option<&Value>) -> u32 {
    match value.and_then(Value::as_f64) {
        Some(n) if n.is_finite() && n > 0.0 => n.min(u32::MAX as f64) as u32,
        _ => 0,
    }
}

/// Accepts `0xff4444`, `"#ff4444"` and `"0xff4444"`.
pub fn wire_color(value: Option<&Value>) -> Option<Color> {
    match value? {
        Value::Number(n) => n.as_u64().map(|c| (c & 0xffffff) as Color),
        Value::String(s) => {
            let hex = s
                .strip_prefix('#')
                .or_else(|| s.strip_prefix("0x"))
                .unwrap_or(s);
            Color::from_str_radix(hex, 16).ok().map(|c| c & 0xffffff)
        }
        _ => None,
    }
}

/// Builds every keyable entity of a JSON array, returning them with the number skipped.
///
/// A missing, `null` or non-array value yields an empty list.
pub fn from_wire_list<T: FromWire>(value: &Value) -> (Vec<T>, usize) {
    let Value::Array(items) = value else {
        return (Vec::new(), 0);
    };

    let parsed: Vec<T> = items.iter().filter_map(T::from_wire).collect();
    let skipped = items.len() - parsed.len();
    (parsed, skipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use serde_json::json;

    #[test]
    fn test_player_from_complete_value() {
        let value = json!({
            "id": "p1", "name": "neon", "x": 10.5, "y": -3, "radius": 32,
            "color": 0x00ff00, "protons": 3, "neutrons": 2, "electrons": 1,
            "element": "Lithium", "stability": 72.5
        });

        let player = PlayerData::from_wire(&value).unwrap();
        assert_eq!(player.id, "p1");
        assert_eq!(player.name, "neon");
        assert_approx_eq!(player.x, 10.5);
        assert_approx_eq!(player.y, -3.0);
        assert_approx_eq!(player.radius, 32.0);
        assert_eq!(player.color, 0x00ff00);
        assert_eq!(player.composition.total(), 6);
        assert_eq!(player.element, "Lithium");
        assert_approx_eq!(player.stability, 72.5);
    }

    #[test]
    fn test_player_missing_fields_use_defaults() {
        let player = PlayerData::from_wire(&json!({ "id": "p2" })).unwrap();
        assert_eq!(player.name, "");
        assert_eq!(player.radius, DEFAULT_PLAYER_RADIUS);
        assert_eq!(player.color, DEFAULT_PLAYER_COLOR);
        assert_eq!(player.composition, Composition::default());
        assert_eq!(player.element, DEFAULT_ELEMENT);
        assert_eq!(player.stability, DEFAULT_STABILITY);
    }

    #[test]
    fn test_player_malformed_fields_use_defaults() {
        let value = json!({
            "id": 7, "x": "left", "radius": -4, "color": [1, 2],
            "protons": -2, "stability": 180
        });

        let player = PlayerData::from_wire(&value).unwrap();
        assert_eq!(player.id, "7");
        assert_eq!(player.x, 0.0);
        assert_eq!(player.radius, DEFAULT_PLAYER_RADIUS);
        assert_eq!(player.color, DEFAULT_PLAYER_COLOR);
        assert_eq!(player.composition.protons, 0);
        assert_eq!(player.stability, 100.0);
    }

    #[test]
    fn test_entity_without_id_is_rejected() {
        assert!(PlayerData::from_wire(&json!({ "x": 1.0 })).is_none());
        assert!(ResourceData::from_wire(&json!({ "id": "" })).is_none());
        assert!(BulletData::from_wire(&json!({ "id": null })).is_none());
    }

    #[test]
    fn test_resource_kind_parsing() {
        let known = ResourceData::from_wire(&json!({ "id": "r", "type": "Electron" })).unwrap();
        assert_eq!(known.kind, Some(ResourceKind::Electron));

        let unknown = ResourceData::from_wire(&json!({ "id": "r", "type": "quark" })).unwrap();
        assert_eq!(unknown.kind, None);
    }

    #[test]
    fn test_color_formats() {
        assert_eq!(wire_color(Some(&json!("#ff4444"))), Some(0xff4444));
        assert_eq!(wire_color(Some(&json!("0x00ff00"))), Some(0x00ff00));
        assert_eq!(wire_color(Some(&json!(16776960))), Some(0xffff00));
        assert_eq!(wire_color(Some(&json!("purple"))), None);
        assert_eq!(wire_color(None), None);
    }

    #[test]
    fn test_wire_list_skips_unkeyed_entries() {
        let value = json!([{ "id": "a" }, { "name": "ghost" }, 12, { "id": "b" }]);
        let (players, skipped) = from_wire_list::<PlayerData>(&value);
        assert_eq!(players.len(), 2);
        assert_eq!(skipped, 2);

        let (none, skipped) = from_wire_list::<PlayerData>(&Value::Null);
        assert!(none.is_empty());
        assert_eq!(skipped, 0);
    }

    #[test]
    fn test_bullet_owner_is_optional() {
        let bullet = BulletData::from_wire(&json!({ "id": "b1", "x": 1, "y": 2 })).unwrap();
        assert_eq!(bullet.owner, None);

        let owned = BulletData::from_wire(&json!({ "id": "b2", "ownerId": "p1" })).unwrap();
        assert_eq!(owned.owner.as_deref(), Some("p1"));
    }
}
