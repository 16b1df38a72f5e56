//! Input sources for the controlled entity.
//!
//! The device class is decided once at startup. Keyboards report held keys; the touch
//! stick reports a thumb offset that is folded into the same four directional axes.

use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceClass {
    Desktop,
    Touch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
    W,
    A,
    S,
    D,
}

/// Four independent directional contributions sampled in one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Axes {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl Axes {
    /// Summed raw vector, screen oriented (y grows downwards).
    pub fn vector(&self) -> (f32, f32) {
        let mut vx = 0.0;
        let mut vy = 0.0;
        if self.left {
            vx -= 1.0;
        }
        if self.right {
            vx += 1.0;
        }
        if self.up {
            vy -= 1.0;
        }
        if self.down {
            vy += 1.0;
        }
        (vx, vy)
    }

    pub fn is_neutral(&self) -> bool {
        self.vector() == (0.0, 0.0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Keyboard {
    held: HashSet<Key>,
}

impl Keyboard {
    pub fn press(&mut self, key: Key) {
        self.held.insert(key);
    }

    pub fn release(&mut self, key: Key) {
        self.held.remove(&key);
    }

    pub fn set(&mut self, key: Key, down: bool) {
        if down {
            self.press(key);
        } else {
            self.release(key);
        }
    }

    fn is_down(&self, key: Key) -> bool {
        self.held.contains(&key)
    }

    /// Arrow keys and WASD drive the same axes.
    pub fn axes(&self) -> Axes {
        Axes {
            up: self.is_down(Key::Up) || self.is_down(Key::W),
            down: self.is_down(Key::Down) || self.is_down(Key::S),
            left: self.is_down(Key::Left) || self.is_down(Key::A),
            right: self.is_down(Key::Right) || self.is_down(Key::D),
        }
    }
}

pub const STICK_RADIUS: f32 = 60.0;
pub const STICK_FORCE_MIN: f32 = 16.0;

/// On-screen joystick with eight-direction output.
#[derive(Debug, Clone)]
pub struct VirtualStick {
    radius: f32,
    force_min: f32,
    thumb: (f32, f32),
}

impl Default for VirtualStick {
    fn default() -> Self {
        Self::new(STICK_RADIUS, STICK_FORCE_MIN)
    }
}

impl VirtualStick {
    pub fn new(radius: f32, force_min: f32) -> Self {
        Self {
            radius,
            force_min,
            thumb: (0.0, 0.0),
        }
    }

    /// Moves the thumb to an offset from the stick base; travel is clamped to the radius.
    pub fn move_thumb(&mut self, dx: f32, dy: f32) {
        let length = (dx * dx + dy * dy).sqrt();
        self.thumb = if length > self.radius {
            (dx / length * self.radius, dy / length * self.radius)
        } else {
            (dx, dy)
        };
    }

    pub fn release(&mut self) {
        self.thumb = (0.0, 0.0);
    }

    pub fn thumb(&self) -> (f32, f32) {
        self.thumb
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn axes(&self) -> Axes {
        let (dx, dy) = self.thumb;
        let force = (dx * dx + dy * dy).sqrt();
        if force < self.force_min {
            return Axes::default();
        }

        // Degrees in (-180, 180], 0 pointing right, positive angles pointing down.
        let angle = dy.atan2(dx).to_degrees();
        Axes {
            right: angle > -67.5 && angle < 67.5,
            left: !(-112.5..=112.5).contains(&angle),
            down: angle > 22.5 && angle < 157.5,
            up: angle < -22.5 && angle > -157.5,
        }
    }
}

/// The one input source active for this session.
#[derive(Debug, Clone)]
pub enum InputSource {
    Keyboard(Keyboard),
    VirtualStick(VirtualStick),
}

impl InputSource {
    pub fn for_device(class: DeviceClass) -> Self {
        match class {
            DeviceClass::Desktop => Self::Keyboard(Keyboard::default()),
            DeviceClass::Touch => Self::VirtualStick(VirtualStick::default()),
        }
    }

    pub fn device_class(&self) -> DeviceClass {
        match self {
            Self::Keyboard(_) => DeviceClass::Desktop,
            Self::VirtualStick(_) => DeviceClass::Touch,
        }
    }

    pub fn sample(&self) -> Axes {
        match self {
            Self::Keyboard(keyboard) => keyboard.axes(),
            Self::VirtualStick(stick) => stick.axes(),
        }
    }

    pub fn keyboard_mut(&mut self) -> Option<&mut Keyboard> {
        match self {
            Self::Keyboard(keyboard) => Some(keyboard),
            Self::VirtualStick(_) => None,
        }
    }

    pub fn stick_mut(&mut self) -> Option<&mut VirtualStick> {
        match self {
            Self::VirtualStick(stick) => Some(stick),
            Self::Keyboard(_) => None,
        }
    }
}

/// Screen-space camera window used to turn pointer positions into world positions.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Viewport {
    pub scroll_x: f32,
    pub scroll_y: f32,
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn to_world(&self, screen_x: f32, screen_y: f32) -> (f32, f32) {
        (screen_x + self.scroll_x, screen_y + self.scroll_y)
    }

    pub fn midpoint(&self) -> (f32, f32) {
        (
            self.scroll_x + self.width / 2.0,
            self.scroll_y + self.height / 2.0,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FireGesture {
    /// Mouse click at a screen position.
    Pointer { screen_x: f32, screen_y: f32 },
    /// On-screen fire button; aims at the middle of the view.
    Button,
}

impl FireGesture {
    pub fn target(&self, viewport: &Viewport) -> (f32, f32) {
        match *self {
            Self::Pointer { screen_x, screen_y } => viewport.to_world(screen_x, screen_y),
            Self::Button => viewport.midpoint(),
        }
    }
}
