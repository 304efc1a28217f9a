//! Game configuration.

use std::time::Duration;

use crate::clock::DEFAULT_TICK;

/// Configuration shared by every match of a registry.
#[derive(Debug, Clone)]
pub struct GameConfig {
    /// How often a running clock settles elapsed time.
    pub tick_interval: Duration,
    /// Time controls the host can cycle through in the settings menu.
    pub time_controls: Vec<Duration>,
    /// Time control preselected for new invitations.
    pub default_time_control: Option<Duration>,
    /// Display name used when a user cannot be resolved.
    pub fallback_name: String,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            tick_interval: DEFAULT_TICK,
            time_controls: vec![
                Duration::from_secs(3 * 60),
                Duration::from_secs(5 * 60),
                Duration::from_secs(10 * 60),
            ],
            default_time_control: None,
            fallback_name: "Player".to_string(),
        }
    }
}

impl GameConfig {
    /// Creates a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the clock tick interval.
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Sets the selectable time controls.
    pub fn with_time_controls(mut self, controls: Vec<Duration>) -> Self {
        self.time_controls = controls;
        self
    }

    /// Sets the time control new invitations start with.
    pub fn with_default_time_control(mut self, control: Option<Duration>) -> Self {
        self.default_time_control = control;
        self
    }

    /// Sets the fallback display name.
    pub fn with_fallback_name(mut self, name: impl Into<String>) -> Self {
        self.fallback_name = name.into();
        self
    }

    /// The control after `current` in the menu cycle: off, then each
    /// configured control in order, then off again.
    pub fn next_time_control(&self, current: Option<Duration>) -> Option<Duration> {
        match current {
            None => self.time_controls.first().copied(),
            Some(current) => self
                .time_controls
                .iter()
                .position(|c| *c == current)
                .and_then(|idx| self.time_controls.get(idx + 1))
                .copied(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GameConfig::default();

        assert_eq!(config.tick_interval, Duration::from_millis(100));
        assert_eq!(config.time_controls.len(), 3);
        assert_eq!(config.default_time_control, None);
        assert_eq!(config.fallback_name, "Player");
    }

    #[test]
    fn test_config_builder() {
        let config = GameConfig::new()
            .with_tick_interval(Duration::from_millis(250))
            .with_time_controls(vec![Duration::from_secs(60)])
            .with_default_time_control(Some(Duration::from_secs(60)))
            .with_fallback_name("Someone");

        assert_eq!(config.tick_interval, Duration::from_millis(250));
        assert_eq!(config.time_controls, vec![Duration::from_secs(60)]);
        assert_eq!(config.default_time_control, Some(Duration::from_secs(60)));
        assert_eq!(config.fallback_name, "Someone");
    }

    #[test]
    fn time_controls_cycle_back_to_off() {
        let config = GameConfig::default();
        let mut current = None;
        let mut seen = Vec::new();

        for _ in 0..4 {
            current = config.next_time_control(current);
            seen.push(current.map(|d| d.as_secs() / 60));
        }

        assert_eq!(seen, vec![Some(3), Some(5), Some(10), None]);
    }
}
