use crate::input::{VirtualStick, Viewport};
use crate::render::{Cue, EntityKind, EntityRef, EntityView, RenderAdapter};
use crate::stats::{Stats, UiSink};
use log::debug;
use macroquad::prelude::*;
use shared::{ResourceKind, WORLD_HEIGHT, WORLD_WIDTH};
use std::collections::HashMap;
use std::time::Duration;

const FOLLOW_LERP: f32 = 0.05;
const GRID_SPACING: f32 = 50.0;
const RESOURCE_RADIUS: f32 = 8.0;
const PROJECTILE_RADIUS: f32 = 6.0;
const BURST_SECONDS: f64 = 0.8;
const BURST_RADIUS: f32 = 40.0;
const LEADERBOARD_SIZE: usize = 10;
pub const MINIMAP_SIZE: f32 = 200.0;
pub const MINIMAP_SIZE_TOUCH: f32 = 120.0;
const MINIMAP_MARGIN: f32 = 16.0;

fn hex(color: shared::Color) -> Color {
    Color::from_hex(color)
}

#[derive(Debug, Clone)]
struct PlayerSprite {
    x: f32,
    y: f32,
    radius: f32,
    color: shared::Color,
    name: String,
    stability: f32,
}

#[derive(Debug, Clone, Copy)]
struct Dot {
    x: f32,
    y: f32,
    color: shared::Color,
}

#[derive(Debug, Clone, Copy)]
struct BurstSprite {
    x: f32,
    y: f32,
    color: shared::Color,
    born: f64,
}

#[derive(Debug, Clone, Copy)]
struct Shake {
    intensity: f32,
    until: f64,
}

/// Retained scene drawn with macroquad. Mirrors only what the engine told it about.
pub struct SceneRenderer {
    width: f32,
    height: f32,
    players: HashMap<String, PlayerSprite>,
    resources: HashMap<String, Dot>,
    projectiles: HashMap<String, Dot>,
    bursts: HashMap<String, BurstSprite>,
    camera: (f32, f32),
    shake_offset: (f32, f32),
    follow: Option<EntityRef>,
    shake: Option<Shake>,
    disconnected: bool,
}

impl SceneRenderer {
    pub fn new(width: usize, height: usize) -> Self {
        SceneRenderer {
            width: width as f32,
            height: height as f32,
            players: HashMap::new(),
            resources: HashMap::new(),
            projectiles: HashMap::new(),
            bursts: HashMap::new(),
            camera: (WORLD_WIDTH / 2.0, WORLD_HEIGHT / 2.0),
            shake_offset: (0.0, 0.0),
            follow: None,
            shake: None,
            disconnected: false,
        }
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.width = width;
        self.height = height;
    }

    /// Eases the camera toward its follow target and rolls the shake offset for this frame.
    pub fn update_camera(&mut self) {
        if let Some(target) = self
            .follow
            .as_ref()
            .and_then(|target| self.players.get(&target.id))
        {
            self.camera.0 += (target.x - self.camera.0) * FOLLOW_LERP;
            self.camera.1 += (target.y - self.camera.1) * FOLLOW_LERP;
        }

        let half_w = self.width / 2.0;
        let half_h = self.height / 2.0;
        self.camera.0 = self.camera.0.clamp(half_w, (WORLD_WIDTH - half_w).max(half_w));
        self.camera.1 = self.camera.1.clamp(half_h, (WORLD_HEIGHT - half_h).max(half_h));

        self.shake_offset = match self.shake {
            Some(shake) if get_time() < shake.until => (
                macroquad::rand::gen_range(-1.0f32, 1.0) * shake.intensity * self.width,
                macroquad::rand::gen_range(-1.0f32, 1.0) * shake.intensity * self.height,
            ),
            _ => {
                self.shake = None;
                (0.0, 0.0)
            }
        };
    }

    pub fn viewport(&self) -> Viewport {
        Viewport {
            scroll_x: self.camera.0 - self.width / 2.0 + self.shake_offset.0,
            scroll_y: self.camera.1 - self.height / 2.0 + self.shake_offset.1,
            width: self.width,
            height: self.height,
        }
    }

    pub fn render(&self, hud: &Hud) {
        clear_background(hex(0x0a0a1a));
        let view = self.viewport();

        self.draw_grid(&view);

        for resource in self.resources.values() {
            draw_circle(
                resource.x - view.scroll_x,
                resource.y - view.scroll_y,
                RESOURCE_RADIUS,
                hex(resource.color),
            );
        }

        for bullet in self.projectiles.values() {
            let (x, y) = (bullet.x - view.scroll_x, bullet.y - view.scroll_y);
            draw_circle_lines(x, y, PROJECTILE_RADIUS + 2.0, 1.0, WHITE);
            draw_circle(x, y, PROJECTILE_RADIUS, hex(bullet.color));
        }

        for (id, player) in &self.players {
            let is_followed = self.follow.as_ref().is_some_and(|f| &f.id == id);
            self.draw_player(player, &view, is_followed);
        }

        let now = get_time();
        for burst in self.bursts.values() {
            let age = ((now - burst.born) / BURST_SECONDS).clamp(0.0, 1.0) as f32;
            let mut color = hex(burst.color);
            color.a = 1.0 - age;
            draw_circle_lines(
                burst.x - view.scroll_x,
                burst.y - view.scroll_y,
                BURST_RADIUS * (0.3 + age),
                3.0,
                color,
            );
        }

        hud.draw(self.width, self.height);

        if self.disconnected {
            draw_text("OFFLINE", self.width - 90.0, self.height - 16.0, 20.0, RED);
        }
    }

    fn draw_grid(&self, view: &Viewport) {
        let line = Color::from_rgba(255, 255, 255, 20);
        let first_x = (view.scroll_x / GRID_SPACING).floor() * GRID_SPACING;
        let first_y = (view.scroll_y / GRID_SPACING).floor() * GRID_SPACING;

        let mut x = first_x;
        while x <= view.scroll_x + view.width {
            draw_line(x - view.scroll_x, 0.0, x - view.scroll_x, view.height, 1.0, line);
            x += GRID_SPACING;
        }

        let mut y = first_y;
        while y <= view.scroll_y + view.height {
            draw_line(0.0, y - view.scroll_y, view.width, y - view.scroll_y, 1.0, line);
            y += GRID_SPACING;
        }
    }

    fn draw_player(&self, player: &PlayerSprite, view: &Viewport, is_followed: bool) {
        let x = player.x - view.scroll_x;
        let y = player.y - view.scroll_y;
        let band = crate::stats::StabilityBand::of(player.stability);

        let mut glow = hex(player.color);
        glow.a = 0.3;
        draw_circle(x, y, player.radius, glow);
        draw_circle(x, y, player.radius * 0.6, hex(player.color));
        draw_circle_lines(x, y, player.radius + 3.0, 2.0, hex(band.color()));

        if is_followed {
            draw_circle_lines(x, y, player.radius + 7.0, 1.0, WHITE);
        }

        if !player.name.is_empty() {
            let size = measure_text(&player.name, None, 16, 1.0);
            draw_text(
                &player.name,
                x - size.width / 2.0,
                y - player.radius - 10.0,
                16.0,
                WHITE,
            );
        }
    }
}

impl RenderAdapter for SceneRenderer {
    fn create_entity(&mut self, view: EntityView<'_>) {
        self.update_entity(view);
    }

    fn update_entity(&mut self, view: EntityView<'_>) {
        match view {
            EntityView::Player(player) => {
                self.players.insert(
                    player.id.clone(),
                    PlayerSprite {
                        x: player.x,
                        y: player.y,
                        radius: player.radius,
                        color: player.color,
                        name: player.name.clone(),
                        stability: player.stability,
                    },
                );
            }
            EntityView::Resource(resource) => {
                let color = resource.kind.as_ref().map_or(0xffffff, ResourceKind::color);
                self.resources.insert(
                    resource.id.clone(),
                    Dot {
                        x: resource.x,
                        y: resource.y,
                        color,
                    },
                );
            }
            EntityView::Projectile(bullet) => {
                self.projectiles.insert(
                    bullet.id.clone(),
                    Dot {
                        x: bullet.x,
                        y: bullet.y,
                        color: 0xffff00,
                    },
                );
            }
            EntityView::Burst(burst) => {
                let born = self
                    .bursts
                    .get(&burst.id)
                    .map_or_else(get_time, |existing| existing.born);
                self.bursts.insert(
                    burst.id.clone(),
                    BurstSprite {
                        x: burst.x,
                        y: burst.y,
                        color: burst.color,
                        born,
                    },
                );
            }
        }
    }

    fn remove_entity(&mut self, kind: EntityKind, id: &str) {
        let removed = match kind {
            EntityKind::Player => self.players.remove(id).is_some(),
            EntityKind::Resource => self.resources.remove(id).is_some(),
            EntityKind::Projectile => self.projectiles.remove(id).is_some(),
            EntityKind::Burst => self.bursts.remove(id).is_some(),
        };
        if !removed {
            debug!("Ignoring removal of unknown {:?} {}", kind, id);
        }
    }

    fn play_cue(&mut self, cue: Cue) {
        debug!("Cue: {:?}", cue);
    }

    fn camera_follow(&mut self, target: EntityRef) {
        self.follow = Some(target);
    }

    fn camera_center(&mut self, x: f32, y: f32) {
        self.camera = (x, y);
    }

    fn camera_shake(&mut self, intensity: f32, duration: Duration) {
        self.shake = Some(Shake {
            intensity,
            until: get_time() + duration.as_secs_f64(),
        });
    }

    fn discard_all(&mut self) {
        self.players.clear();
        self.resources.clear();
        self.projectiles.clear();
        self.bursts.clear();
        self.follow = None;
        self.shake = None;
    }

    fn connection_lost(&mut self) {
        self.disconnected = true;
    }
}

/// HUD state fed by the engine's stats pushes.
#[derive(Debug)]
pub struct Hud {
    stats: Option<Stats>,
    game_over: bool,
    lost: Option<String>,
    minimap_size: f32,
}

impl Hud {
    /// `minimap_size` is the side of the square minimap in pixels.
    pub fn new(minimap_size: f32) -> Self {
        Self {
            stats: None,
            game_over: false,
            lost: None,
            minimap_size,
        }
    }

    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    pub fn dismiss_game_over(&mut self) {
        self.game_over = false;
    }

    /// True while an overlay should swallow gameplay input.
    pub fn captures_focus(&self) -> bool {
        self.game_over || self.lost.is_some()
    }

    pub fn draw(&self, width: f32, height: f32) {
        if let Some(stats) = &self.stats {
            self.draw_stats(stats, width, height);
        }

        if self.game_over {
            draw_rectangle(0.0, 0.0, width, height, Color::from_rgba(0, 0, 0, 170));
            let title = "ATOM DESTROYED";
            let size = measure_text(title, None, 48, 1.0);
            draw_text(title, (width - size.width) / 2.0, height / 2.0 - 20.0, 48.0, RED);
            let hint = "Press R to respawn";
            let size = measure_text(hint, None, 24, 1.0);
            draw_text(hint, (width - size.width) / 2.0, height / 2.0 + 24.0, 24.0, WHITE);
        }

        if let Some(reason) = &self.lost {
            draw_text(reason, 10.0, height - 16.0, 20.0, RED);
        }
    }

    fn draw_stats(&self, stats: &Stats, width: f32, height: f32) {
        let band = stats.band();
        let lines = [
            (format!("Element: {}", stats.element), WHITE),
            (
                format!(
                    "P: {}  N: {}  E: {}",
                    stats.composition.protons,
                    stats.composition.neutrons,
                    stats.composition.electrons
                ),
                WHITE,
            ),
            (
                format!("Stability: {:.0}% ({})", stats.stability, band.label()),
                hex(band.color()),
            ),
            (stats.advice().message().to_string(), LIGHTGRAY),
        ];
        for (i, (text, color)) in lines.iter().enumerate() {
            draw_text(text, 10.0, 24.0 + i as f32 * 20.0, 18.0, *color);
        }

        let board_x = width - 200.0;
        draw_text("Leaderboard", board_x, 24.0, 18.0, YELLOW);
        for (i, player) in stats.leaderboard(LEADERBOARD_SIZE).iter().enumerate() {
            let name = if player.name.is_empty() {
                player.id.as_str()
            } else {
                player.name.as_str()
            };
            let entry = format!(
                "{}. {} {} ({}p)",
                i + 1,
                name,
                player.element,
                player.composition.protons
            );
            draw_text(&entry, board_x, 44.0 + i as f32 * 18.0, 16.0, WHITE);
        }

        self.draw_minimap(stats, width, height);

        if let Some(totals) = stats.world_totals_line() {
            draw_text(&totals, 10.0, height - 40.0, 16.0, GRAY);
        }
    }

    fn draw_minimap(&self, stats: &Stats, width: f32, height: f32) {
        let size = self.minimap_size;
        let left = width - size - MINIMAP_MARGIN;
        let top = height - size - MINIMAP_MARGIN;
        draw_rectangle(left, top, size, size, Color::from_rgba(31, 41, 55, 230));
        draw_rectangle_lines(left, top, size, size, 2.0, Color::from_rgba(59, 130, 246, 128));

        // Others first so the controlled dot stays on top.
        let dots = stats.minimap_dots(size);
        for dot in dots.iter().filter(|d| !d.current).chain(dots.iter().filter(|d| d.current)) {
            let color = if dot.current { hex(0x22d3ee) } else { hex(0xf87171) };
            draw_circle(left + dot.x, top + dot.y, 3.0, color);
        }
    }
}

impl UiSink for Hud {
    fn stats(&mut self, stats: &Stats) {
        self.stats = Some(stats.clone());
    }

    fn game_over(&mut self) {
        self.game_over = true;
    }

    fn connection_lost(&mut self, reason: &str) {
        self.lost = Some(reason.to_string());
    }
}

/// Draws the on-screen stick and fire button for touch sessions.
pub fn draw_touch_controls(stick: &VirtualStick, stick_base: Vec2, fire_button: Vec2, fire_radius: f32) {
    let ring = Color::from_rgba(255, 255, 255, 60);
    draw_circle(stick_base.x, stick_base.y, stick.radius(), ring);
    let (dx, dy) = stick.thumb();
    draw_circle(stick_base.x + dx, stick_base.y + dy, stick.radius() * 0.4, WHITE);

    draw_circle(fire_button.x, fire_button.y, fire_radius, Color::from_rgba(255, 68, 68, 120));
    draw_text("FIRE", fire_button.x - 20.0, fire_button.y + 6.0, 20.0, WHITE);
}
