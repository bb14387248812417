//! Logger initialisation.
//!
//! The engine only talks to the `log` facade. Binaries call [`init_logging`]
//! once early in `main` to install `env_logger`.

use std::sync::Once;

/// `env_filter` follows the `env_logger` filter syntax, e.g.
/// `"info"` or `"scene_ngin=debug,wgpu=warn"`.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
    pub write_style: env_logger::WriteStyle,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            write_style: env_logger::WriteStyle::Auto,
        }
    }
}

static INIT: Once = Once::new();

/// Installs the global logger. `RUST_LOG` takes precedence over the configured
/// filter; without either, `info` is used with `wgpu` and `naga` held at `warn`.
///
/// Subsequent calls are ignored.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();

        if let Ok(filter) = std::env::var("RUST_LOG") {
            builder.parse_filters(&filter);
        } else if let Some(filter) = config.env_filter {
            builder.parse_filters(&filter);
        } else {
            builder
                .filter_level(log::LevelFilter::Info)
                .filter_module("wgpu_core", log::LevelFilter::Warn)
                .filter_module("wgpu_hal", log::LevelFilter::Warn)
                .filter_module("naga", log::LevelFilter::Warn);
        }

        builder.write_style(config.write_style);

        if let Err(e) = builder.try_init() {
            eprintln!("Warning: Could not initialize logger: {}", e);
        }
        log::debug!("logging initialized");
    });
}
