//! Stats summary pushed to the UI after every reconciled snapshot.

use crate::world::Player;
use serde_json::Value;
use shared::{Composition, EntityId, PlayerData, WORLD_HEIGHT, WORLD_WIDTH};

/// Receives what the HUD shows. Implementations must not fail.
pub trait UiSink {
    /// Called exactly once per reconciled snapshot while a controlled player exists.
    fn stats(&mut self, stats: &Stats);

    fn game_over(&mut self);

    fn connection_lost(&mut self, reason: &str);
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stats {
    pub player_id: EntityId,
    pub composition: Composition,
    pub element: String,
    pub stability: f32,
    /// Full roster from the snapshot, in server order.
    pub players: Vec<PlayerData>,
    pub world_totals: Value,
}

impl Stats {
    pub fn summarize(controlled: &Player, roster: Vec<PlayerData>, world_totals: Value) -> Self {
        Self {
            player_id: controlled.id.clone(),
            composition: controlled.composition,
            element: controlled.element.clone(),
            stability: controlled.stability,
            players: roster,
            world_totals,
        }
    }

    pub fn band(&self) -> StabilityBand {
        StabilityBand::of(self.stability)
    }

    /// Players ordered by proton count, highest first.
    pub fn leaderboard(&self, limit: usize) -> Vec<&PlayerData> {
        let mut ranked: Vec<&PlayerData> = self.players.iter().collect();
        ranked.sort_by(|a, b| b.composition.protons.cmp(&a.composition.protons));
        ranked.truncate(limit);
        ranked
    }

    pub fn advice(&self) -> Advice {
        let Composition {
            protons,
            neutrons,
            electrons,
        } = self.composition;
        let charge = protons as i64 - electrons as i64;
        let nucleus = protons as i64 - neutrons as i64;

        if self.stability > 80.0 {
            Advice::Grow
        } else if charge > 2 {
            Advice::NeedElectrons
        } else if charge < -2 {
            Advice::NeedProtons
        } else if nucleus.abs() > 3 {
            if neutrons < protons {
                Advice::NeedNeutrons
            } else {
                Advice::BalanceNucleus
            }
        } else {
            Advice::Rebalance
        }
    }

    /// HUD line for the world totals, `None` when the server sent none of the counters.
    pub fn world_totals_line(&self) -> Option<String> {
        let totals: Vec<String> = ["protons", "neutrons", "electrons", "total"]
            .iter()
            .filter_map(|key| self.world_total(key).map(|n| format!("{}: {}", key, n)))
            .collect();
        if totals.is_empty() {
            None
        } else {
            Some(format!("World  {}", totals.join("  ")))
        }
    }

    /// Roster positions scaled onto a square map of `size` pixels, clamped to its edges.
    pub fn minimap_dots(&self, size: f32) -> Vec<MinimapDot> {
        self.players
            .iter()
            .map(|player| MinimapDot {
                x: (player.x / WORLD_WIDTH * size).clamp(0.0, size),
                y: (player.y / WORLD_HEIGHT * size).clamp(0.0, size),
                current: player.id == self.player_id,
            })
            .collect()
    }

    /// Reads one counter out of the opaque world totals, if the server sent it.
    pub fn world_total(&self, key: &str) -> Option<u64> {
        self.world_totals.get(key).and_then(Value::as_u64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinimapDot {
    pub x: f32,
    pub y: f32,
    /// The dot belongs to the controlled player.
    pub current: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StabilityBand {
    Stable,
    Unstable,
    Critical,
}

impl StabilityBand {
    pub fn of(stability: f32) -> Self {
        if stability > 60.0 {
            Self::Stable
        } else if stability > 30.0 {
            Self::Unstable
        } else {
            Self::Critical
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Stable => "Stable",
            Self::Unstable => "Unstable",
            Self::Critical => "Critical",
        }
    }

    pub fn color(&self) -> shared::Color {
        match self {
            Self::Stable => 0x00ff00,
            Self::Unstable => 0xffff00,
            Self::Critical => 0xff0000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advice {
    Grow,
    NeedElectrons,
    NeedProtons,
    NeedNeutrons,
    BalanceNucleus,
    Rebalance,
}

impl Advice {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Grow => "You're stable - explore or collect more to grow!",
            Self::NeedElectrons => "Collect more electrons to balance charge!",
            Self::NeedProtons => "Collect more protons to balance charge!",
            Self::NeedNeutrons => "Collect neutrons for stability!",
            Self::BalanceNucleus => "Collect protons to balance nucleus!",
            Self::Rebalance => "Slightly unstable - balance particles to stabilize!",
        }
    }
}
