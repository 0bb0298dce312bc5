use std::io::Write;

use env_logger::{Builder, Target};
use log::LevelFilter;

/// Sends diagnostics to stderr as `level: message`. Repeated calls keep the first logger.
pub fn init(level: LevelFilter) {
    let installed = Builder::new()
        .filter_level(level)
        .target(Target::Stderr)
        .format(|buf, record| {
            let level = record.level().as_str().to_ascii_lowercase();
            writeln!(buf, "{level}: {}", record.args())
        })
        .try_init();
    if installed.is_err() {
        log::debug!("logger already installed, keeping it");
    }
}
