/// Logger setup.
///
/// The terminal is in raw mode on the alternate screen while the game runs,
/// so records go to a file instead of stderr. `RUST_LOG` overrides the
/// configured level.

use std::fs::OpenOptions;

use env_logger::{Env, Target};
use log::LevelFilter;

use crate::config::LogConfig;

pub fn init(config: &LogConfig) {
    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or(&config.level));

    match OpenOptions::new().create(true).append(true).open(&config.file) {
        Ok(file) => {
            builder.target(Target::Pipe(Box::new(file)));
        }
        // Nowhere to write that won't garble the screen
        Err(_) => {
            builder.filter_level(LevelFilter::Off);
        }
    }

    // A second init (tests) is harmless
    let _ = builder.try_init();
}
