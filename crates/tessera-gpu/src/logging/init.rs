use std::sync::Once;

use log::LevelFilter;

/// Logger configuration.
///
/// Levels are resolved per log target: the longest `targets` prefix that
/// matches a record's module path wins, `default_level` covers the rest.
/// `directives` (or `RUST_LOG` when unset) are parsed last in `env_logger`
/// syntax and override both.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub default_level: LevelFilter,
    pub targets: Vec<(String, LevelFilter)>,
    pub directives: Option<String>,
    pub write_style: env_logger::WriteStyle,
}

impl Default for LoggingConfig {
    /// Device lifecycle at info; per-call context chatter only on warnings.
    fn default() -> Self {
        Self {
            default_level: LevelFilter::Info,
            targets: vec![
                ("tessera_gpu::device".to_string(), LevelFilter::Info),
                ("tessera_gpu::gl".to_string(), LevelFilter::Warn),
            ],
            directives: None,
            write_style: env_logger::WriteStyle::Auto,
        }
    }
}

impl LoggingConfig {
    /// Debug output for the whole device crate, warnings for everything else.
    pub fn verbose() -> Self {
        Self {
            default_level: LevelFilter::Warn,
            targets: vec![("tessera_gpu".to_string(), LevelFilter::Debug)],
            ..Self::default()
        }
    }

    /// Sets the level of `target`, replacing an existing entry.
    pub fn with_target(mut self, target: &str, level: LevelFilter) -> Self {
        match self.targets.iter_mut().find(|(t, _)| t == target) {
            Some(entry) => entry.1 = level,
            None => self.targets.push((target.to_string(), level)),
        }
        self
    }

    /// Effective level for a record logged from `module_path`.
    pub fn level_for(&self, module_path: &str) -> LevelFilter {
        self.targets
            .iter()
            .filter(|(t, _)| module_path.starts_with(t.as_str()))
            .max_by_key(|(t, _)| t.len())
            .map_or(self.default_level, |(_, level)| *level)
    }
}

static INIT: Once = Once::new();

/// Initializes the global logger once.
///
/// This function is idempotent; subsequent calls are ignored. A logger that
/// was already installed by someone else is left in place.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();
        builder.filter_level(config.default_level);
        for (target, level) in &config.targets {
            builder.filter_module(target, *level);
        }
        if let Some(directives) = config.directives.clone().or_else(|| std::env::var("RUST_LOG").ok()) {
            builder.parse_filters(&directives);
        }
        builder.write_style(config.write_style);

        if builder.try_init().is_ok() {
            log::debug!("logging initialized ({} target filters)", config.targets.len());
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_quiets_the_context_layer() {
        let config = LoggingConfig::default();
        assert_eq!(config.level_for("tessera_gpu::device::submit"), LevelFilter::Info);
        assert_eq!(config.level_for("tessera_gpu::gl::webgl"), LevelFilter::Warn);
        assert_eq!(config.level_for("some_app::render"), LevelFilter::Info);
    }

    #[test]
    fn verbose_covers_the_whole_crate() {
        let config = LoggingConfig::verbose();
        assert_eq!(config.level_for("tessera_gpu::device"), LevelFilter::Debug);
        assert_eq!(config.level_for("tessera_gpu::gl::recording"), LevelFilter::Debug);
        assert_eq!(config.level_for("other_crate"), LevelFilter::Warn);
    }

    #[test]
    fn longest_prefix_wins() {
        let config = LoggingConfig::default().with_target("tessera_gpu", LevelFilter::Debug);
        assert_eq!(config.level_for("tessera_gpu::pass::command"), LevelFilter::Debug);
        assert_eq!(config.level_for("tessera_gpu::device::create"), LevelFilter::Info);
        assert_eq!(config.level_for("tessera_gpu::gl"), LevelFilter::Warn);
    }

    #[test]
    fn with_target_replaces_existing_entries() {
        let config = LoggingConfig::default().with_target("tessera_gpu::gl", LevelFilter::Trace);
        assert_eq!(config.targets.len(), 2);
        assert_eq!(config.level_for("tessera_gpu::gl"), LevelFilter::Trace);
    }
}
