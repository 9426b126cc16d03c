//! Structured logging helpers.

/// Build filter directives string from LoggingConfig
///
/// Constructs a tracing filter string that includes the base log level
/// and any component-specific log levels configured in the LoggingConfig.
///
/// # Examples
///
/// ```
/// use warden::config::LoggingConfig;
/// use warden::logging::build_filter_directives;
/// use std::collections::HashMap;
///
/// let mut component_levels = HashMap::new();
/// component_levels.insert("poller".to_string(), "debug".to_string());
///
/// let config = LoggingConfig {
///     level: "info".to_string(),
///     format: warden::config::LogFormat::Pretty,
///     component_levels: Some(component_levels),
/// };
///
/// let filter_str = build_filter_directives(&config);
/// assert_eq!(filter_str, "info,warden::poller=debug");
/// ```
pub fn build_filter_directives(config: &crate::config::LoggingConfig) -> String {
    let mut filter_str = config.level.clone();

    if let Some(component_levels) = &config.component_levels {
        let mut components: Vec<_> = component_levels.iter().collect();
        components.sort();
        for (component, level) in components {
            filter_str.push_str(&format!(",warden::{}={}", component, level));
        }
    }

    filter_str
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoggingConfig;
    use std::collections::HashMap;

    #[test]
    fn test_base_level_only() {
        let config = LoggingConfig::default();
        assert_eq!(build_filter_directives(&config), "info");
    }

    #[test]
    fn test_component_levels_sorted() {
        let mut component_levels = HashMap::new();
        component_levels.insert("poller".to_string(), "trace".to_string());
        component_levels.insert("dispatch".to_string(), "debug".to_string());

        let config = LoggingConfig {
            level: "warn".to_string(),
            component_levels: Some(component_levels),
            ..LoggingConfig::default()
        };

        assert_eq!(
            build_filter_directives(&config),
            "warn,warden::dispatch=debug,warden::poller=trace"
        );
    }
}
