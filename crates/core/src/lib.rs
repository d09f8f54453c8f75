pub mod config;
pub mod path_utils;

use tracing::debug;

pub fn init() {
    debug!("🗄️ Archiver core initialized");
}
