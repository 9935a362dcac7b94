#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;

use nova_compositor::{Config, Environment};
use novade_compositor_core::RenderingMode;

/// Environment that records writes instead of touching the process.
#[derive(Debug, Default)]
pub struct RecordingEnv {
    vars: HashMap<String, String>,
}

impl RecordingEnv {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }
}

impl Environment for RecordingEnv {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }

    fn set_var(&mut self, key: &str, value: &str) {
        self.vars.insert(key.to_string(), value.to_string());
    }
}

/// Default configuration with its socket in `runtime_dir`.
pub fn test_config(runtime_dir: &Path) -> Config {
    let mut config = Config::default();
    config.socket.runtime_dir = Some(runtime_dir.to_path_buf());
    config.backend.rendering_mode = RenderingMode::Software;
    config
}

pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("debug")
        .try_init();
}
