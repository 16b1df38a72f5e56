use clap::Parser;
use client::config::{EngineConfig, TimeStep};
use client::engine::{Engine, Frame};
use client::input::{DeviceClass, FireGesture, InputSource, Key};
use client::rendering::{draw_touch_controls, Hud, SceneRenderer, MINIMAP_SIZE, MINIMAP_SIZE_TOUCH};
use client::transport;
use log::{error, info};
use macroquad::input::{
    is_key_down, is_key_pressed, is_mouse_button_pressed, mouse_position, touches, KeyCode,
    MouseButton, TouchPhase,
};
use macroquad::math::{vec2, Vec2};
use macroquad::window::{next_frame, screen_height, screen_width, Conf};
use std::time::{Duration, Instant};

const FIRE_BUTTON_RADIUS: f32 = 45.0;
const MAX_MEASURED_STEP: f32 = 0.05;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// WebSocket endpoint of the game server
    #[arg(
        short = 's',
        long,
        env = "ATOMS_SERVER_URL",
        default_value = "ws://127.0.0.1:3001"
    )]
    server: String,

    /// Display name sent when joining
    #[arg(short = 'n', long, default_value = "Atom")]
    name: String,

    /// Simulate network latency in milliseconds
    #[arg(short = 'l', long, default_value = "0")]
    fake_ping: u64,

    /// Use the on-screen stick and fire button instead of keyboard and mouse
    #[arg(long)]
    touch: bool,

    /// Advance prediction by real frame time instead of a fixed step
    #[arg(long)]
    measured_delta: bool,

    /// Window width
    #[arg(short = 'w', long, default_value = "1280")]
    width: usize,

    /// Window height (no short flag to avoid conflict with --help)
    #[arg(long, default_value = "720")]
    height: usize,
}

const KEY_BINDINGS: [(KeyCode, Key); 8] = [
    (KeyCode::Up, Key::Up),
    (KeyCode::Down, Key::Down),
    (KeyCode::Left, Key::Left),
    (KeyCode::Right, Key::Right),
    (KeyCode::W, Key::W),
    (KeyCode::A, Key::A),
    (KeyCode::S, Key::S),
    (KeyCode::D, Key::D),
];

fn window_conf() -> Conf {
    let args = Args::parse();
    Conf {
        window_title: "Atoms".to_owned(),
        window_width: args.width as i32,
        window_height: args.height as i32,
        ..Default::default()
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    if let Err(e) = run(args).await {
        error!("Client stopped: {}", e);
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Runtime::new()?;

    info!("Starting client...");
    info!("Connecting to: {}", args.server);
    let channel = runtime.block_on(transport::connect(
        &args.server,
        Duration::from_millis(args.fake_ping),
    ))?;

    let device = if args.touch {
        DeviceClass::Touch
    } else {
        DeviceClass::Desktop
    };
    let config = EngineConfig {
        time_step: if args.measured_delta {
            TimeStep::Measured {
                max: MAX_MEASURED_STEP,
            }
        } else {
            TimeStep::default()
        },
        ..EngineConfig::default()
    };

    let mut engine = Engine::new(
        config,
        InputSource::for_device(device),
        SceneRenderer::new(args.width, args.height),
        Hud::new(match device {
            DeviceClass::Desktop => MINIMAP_SIZE,
            DeviceClass::Touch => MINIMAP_SIZE_TOUCH,
        }),
    );
    engine.attach(channel, &args.name);

    match device {
        DeviceClass::Desktop => info!("Controls: WASD/arrows to move, click to shoot, Esc to quit"),
        DeviceClass::Touch => info!("Controls: drag the stick to move, tap FIRE to shoot"),
    }

    let mut last_frame = Instant::now();
    loop {
        if is_key_pressed(KeyCode::Escape) {
            break;
        }

        let now = Instant::now();
        let elapsed = now - last_frame;
        last_frame = now;

        engine.render_mut().resize(screen_width(), screen_height());
        engine.pump(now);

        if engine.ui().is_game_over() && is_key_pressed(KeyCode::R) {
            engine.ui_mut().dismiss_game_over();
            engine.restart();
        }
        let focus = engine.ui().captures_focus();
        engine.set_ui_focus(focus);

        let viewport = engine.render().viewport();
        let stick_base = vec2(100.0, screen_height() - 120.0);
        let fire_button = vec2(screen_width() - 100.0, screen_height() - 120.0);

        match device {
            DeviceClass::Desktop => {
                if let Some(keyboard) = engine.input_mut().keyboard_mut() {
                    for (code, key) in KEY_BINDINGS {
                        keyboard.set(key, is_key_down(code));
                    }
                }
                if is_mouse_button_pressed(MouseButton::Left) {
                    let (screen_x, screen_y) = mouse_position();
                    engine.fire(FireGesture::Pointer { screen_x, screen_y }, &viewport);
                }
            }
            DeviceClass::Touch => {
                if poll_touches(&mut engine, stick_base, fire_button) {
                    engine.fire(FireGesture::Button, &viewport);
                }
            }
        }

        engine.tick(Frame { now, elapsed });

        let (scene, hud) = engine.collaborators_mut();
        scene.update_camera();
        scene.render(hud);
        if let Some(stick) = engine.input_mut().stick_mut() {
            draw_touch_controls(stick, stick_base, fire_button, FIRE_BUTTON_RADIUS);
        }

        next_frame().await;
    }

    engine.teardown();
    info!("Client shut down");
    Ok(())
}

/// Feeds the active touches into the virtual stick. Returns true when FIRE was tapped.
fn poll_touches(
    engine: &mut Engine<SceneRenderer, Hud>,
    stick_base: Vec2,
    fire_button: Vec2,
) -> bool {
    let mut fired = false;
    let mut thumb = None;

    for touch in touches() {
        if touch.position.distance(fire_button) < FIRE_BUTTON_RADIUS {
            fired |= touch.phase == TouchPhase::Started;
            continue;
        }

        let active = matches!(
            touch.phase,
            TouchPhase::Started | TouchPhase::Moved | TouchPhase::Stationary
        );
        if active && touch.position.x < screen_width() / 2.0 {
            thumb = Some(touch.position - stick_base);
        }
    }

    if let Some(stick) = engine.input_mut().stick_mut() {
        match thumb {
            Some(offset) => stick.move_thumb(offset.x, offset.y),
            None => stick.release(),
        }
    }

    fired
}
