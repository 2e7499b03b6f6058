use std::sync::Once;

/// Logger settings, usually built from the `[logging]` config section.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// `env_logger` filter syntax, e.g. `"bastion_engine=debug,wgpu_core=warn"`.
    /// `None` defers to `RUST_LOG`, then to `info`.
    pub env_filter: Option<String>,
    pub write_style: env_logger::WriteStyle,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { env_filter: None, write_style: env_logger::WriteStyle::Auto }
    }
}

impl LoggingConfig {
    fn filter(&self) -> Option<String> {
        self.env_filter.clone().or_else(|| std::env::var("RUST_LOG").ok())
    }
}

static INIT: Once = Once::new();

/// Installs the global logger. Only the first call has any effect.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();
        match config.filter() {
            Some(filter) => builder.parse_filters(&filter),
            // wgpu is chatty at info.
            None => builder.filter_level(log::LevelFilter::Info).filter_module("wgpu_core", log::LevelFilter::Warn),
        };
        builder.write_style(config.write_style).format_timestamp_millis();

        if let Err(err) = builder.try_init() {
            eprintln!("logger already installed: {err}");
            return;
        }
        log::debug!("logging initialized");
    });
}
