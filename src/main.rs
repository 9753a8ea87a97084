/// Entry point and game loop.

mod config;
mod domain;
mod error;
mod logging;
mod sim;
mod ui;

use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent};
use log::{error, info, warn};

use config::GameConfig;
use domain::direction::Direction;
use sim::event::GameEvent;
use sim::ledger::{FileScoreStore, ScoreLedger};
use sim::session::Command;
use sim::world::{Phase, WorldState};
use ui::gamepad::GamepadState;
use ui::input::{self, InputState, TextEdit};
use ui::renderer::Renderer;
use ui::sound::SoundEngine;

const FRAME_SLEEP: Duration = Duration::from_millis(10);

fn main() {
    let config = GameConfig::load();
    logging::init(&config.log);
    for w in &config.warnings {
        warn!("config: {w}");
    }

    let store = FileScoreStore::new(&config.score_file);
    info!("top list at {}", store.path().display());
    let ledger = ScoreLedger::open(Box::new(store));

    let mut world = WorldState::new(ledger, &config);

    let mut renderer = Renderer::new();
    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let sound = if config.sound { SoundEngine::new() } else { None };

    let result = game_loop(&mut world, &mut renderer, sound.as_ref(), &config);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }

    if let Err(e) = result {
        error!("game loop failed: {e}");
        eprintln!("Game error: {e}");
    }

    println!("Thanks for playing 2048!");
    if let Some(best) = world.ledger.entries().first() {
        println!("Best score so far: {} by {}", best.score, best.name);
    }
}

fn game_loop(
    world: &mut WorldState,
    renderer: &mut Renderer,
    sound: Option<&SoundEngine>,
    config: &GameConfig,
) -> std::io::Result<()> {
    let mut kb = InputState::new();
    let mut gp = GamepadState::new(&config.gamepad);

    loop {
        kb.drain_events();
        gp.update();

        if kb.ctrl_c_pressed() {
            world.abort();
            break;
        }

        let mut exit = false;
        for key in kb.presses() {
            if handle_key(world, sound, key) {
                exit = true;
                break;
            }
        }
        if exit || handle_gamepad(world, sound, &gp) {
            break;
        }

        let frame = renderer.render(world);
        abort_on_error(world, frame)?;
        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}

/// A failed frame ends the program, so the running game is committed first.
fn abort_on_error<T>(world: &mut WorldState, result: std::io::Result<T>) -> std::io::Result<T> {
    if result.is_err() {
        world.abort();
    }
    result
}

/// Route one key press by phase. Returns `true` to exit the program.
fn handle_key(world: &mut WorldState, sound: Option<&SoundEngine>, key: &KeyEvent) -> bool {
    match world.phase {
        Phase::Menu => {
            world.message.clear();
            match key.code {
                KeyCode::Up | KeyCode::Char('w') => world.menu_move(-1),
                KeyCode::Down | KeyCode::Char('s') => world.menu_move(1),
                KeyCode::Enter => return world.menu_select(),
                KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('Q') => return true,
                _ => {}
            }
        }
        Phase::TopList if input::dismisses_screen(key) => world.close_top_list(),
        Phase::TopList => {}
        Phase::Naming => match input::text_edit(key) {
            Some(TextEdit::Insert(c)) => world.type_char(c),
            Some(TextEdit::Backspace) => world.backspace(),
            Some(TextEdit::Submit) => world.confirm_name(),
            Some(TextEdit::Cancel) => world.cancel_naming(),
            None => {}
        },
        Phase::Playing => {
            if let Some(cmd) = input::game_command(key) {
                let events = world.command(cmd);
                process_sound_events(sound, &events);
            }
        }
        Phase::GameOver if input::dismisses_screen(key) => world.return_to_menu(),
        Phase::GameOver => {}
    }
    false
}

/// Gamepad counterpart of `handle_key`.
fn handle_gamepad(world: &mut WorldState, sound: Option<&SoundEngine>, gp: &GamepadState) -> bool {
    let dir = gp.direction_pressed();
    match world.phase {
        Phase::Menu => {
            match dir {
                Some(Direction::Up) => world.menu_move(-1),
                Some(Direction::Down) => world.menu_move(1),
                _ => {}
            }
            if gp.confirm_pressed() {
                return world.menu_select();
            }
            if gp.quit_pressed() {
                return true;
            }
        }
        Phase::TopList | Phase::GameOver => {
            if gp.confirm_pressed() || gp.quit_pressed() {
                if world.phase == Phase::TopList {
                    world.close_top_list();
                } else {
                    world.return_to_menu();
                }
            }
        }
        Phase::Naming => {
            if gp.confirm_pressed() {
                world.confirm_name();
            } else if gp.quit_pressed() {
                world.cancel_naming();
            }
        }
        Phase::Playing => {
            let cmd = if let Some(d) = dir {
                Some(Command::Move(d))
            } else if gp.undo_pressed() {
                Some(Command::Undo)
            } else if gp.quit_pressed() {
                Some(Command::Quit)
            } else {
                None
            };
            if let Some(cmd) = cmd {
                let events = world.command(cmd);
                process_sound_events(sound, &events);
            }
        }
    }
    false
}

fn process_sound_events(sound: Option<&SoundEngine>, events: &[GameEvent]) {
    let sfx = match sound {
        Some(s) => s,
        None => return,
    };
    for event in events {
        match event {
            GameEvent::Slid { merged: true, .. } => sfx.play_merge(),
            GameEvent::Slid { merged: false, .. } => sfx.play_slide(),
            GameEvent::UndoApplied { .. } => sfx.play_undo(),
            GameEvent::UndoRefused => sfx.play_refused(),
            GameEvent::Defeated { .. } => sfx.play_game_over(),
            _ => {}
        }
    }
}
