//! Base rule constants for a match.
//!
//! Cooldowns are in hundredths of a round. An action is legal only while
//! the relevant cooldown is at or below `action_threshold`.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Metric compared, in order, to break a tie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TiebreakMetric {
    /// More captured flags wins.
    FlagsCaptured,
    /// More live entities wins.
    LiveEntities,
    /// Higher summed health of live entities wins.
    TotalHealth,
}

/// Rule constants. Deserialises from JSON with every field optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleConfig {
    /// Rounds before the tiebreak decides the match.
    pub max_rounds: u32,
    /// Starting and maximum health.
    pub max_health: u32,
    /// Damage dealt by one attack.
    pub attack_damage: u32,
    /// Maximum squared distance of an attack.
    pub attack_radius_sq: u32,
    /// Health restored by one heal before upgrades.
    pub base_heal: u32,
    /// Maximum squared distance of a heal.
    pub heal_radius_sq: u32,
    /// Highest cooldown at which an action is still legal.
    pub action_threshold: u32,
    /// Cooldown recovered per round on a fully passable cell, before upgrades.
    pub base_cooldown_reduction: u32,
    /// Movement cooldown added by a move.
    pub move_cooldown: u32,
    /// Action cooldown added by an attack.
    pub attack_cooldown: u32,
    /// Action cooldown added by a heal.
    pub heal_cooldown: u32,
    /// Action cooldown added by a flag pickup or drop.
    pub flag_cooldown: u32,
    /// Rounds a dropped flag waits before returning home, before upgrades.
    pub flag_return_delay: u32,
    /// Captures needed to win. `None` means every opposing flag.
    pub flags_to_win: Option<u32>,
    /// Every this many rounds each team earns one upgrade point. 0 disables.
    pub upgrade_interval: u32,
    /// Metrics compared at the round limit, before the seeded fallback.
    pub tiebreak: Vec<TiebreakMetric>,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            max_rounds: 2000,
            max_health: 1000,
            attack_damage: 150,
            attack_radius_sq: 4,
            base_heal: 80,
            heal_radius_sq: 4,
            action_threshold: 9,
            base_cooldown_reduction: 10,
            move_cooldown: 10,
            attack_cooldown: 20,
            heal_cooldown: 30,
            flag_cooldown: 10,
            flag_return_delay: 4,
            flags_to_win: None,
            upgrade_interval: 600,
            tiebreak: vec![
                TiebreakMetric::FlagsCaptured,
                TiebreakMetric::LiveEntities,
                TiebreakMetric::TotalHealth,
            ],
        }
    }
}

impl RuleConfig {
    /// Check the constants for values that would make a match meaningless.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Rule`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("max_rounds", self.max_rounds),
            ("max_health", self.max_health),
            ("base_cooldown_reduction", self.base_cooldown_reduction),
            ("flag_return_delay", self.flag_return_delay),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(ConfigError::Rule {
                    name,
                    reason: "must be positive".to_string(),
                });
            }
        }
        if self.flags_to_win == Some(0) {
            return Err(ConfigError::Rule {
                name: "flags_to_win",
                reason: "must be positive when set".to_string(),
            });
        }
        if self.max_rounds > u32::MAX / 2 {
            return Err(ConfigError::Rule {
                name: "max_rounds",
                reason: format!("{} is unreasonably large", self.max_rounds),
            });
        }
        Ok(())
    }

    /// Captures a team needs, given how many flags its opponent owns.
    #[must_use]
    pub fn captures_to_win(&self, opposing_flags: u32) -> u32 {
        self.flags_to_win.unwrap_or(opposing_flags)
    }

    /// Does `round` give each team an upgrade point?
    #[must_use]
    pub const fn grants_upgrade_point(&self, round: u32) -> bool {
        self.upgrade_interval > 0 && round % self.upgrade_interval == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(RuleConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_rounds_rejected() {
        let rules = RuleConfig {
            max_rounds: 0,
            ..RuleConfig::default()
        };
        assert!(matches!(
            rules.validate(),
            Err(ConfigError::Rule { name: "max_rounds", .. })
        ));
    }

    #[test]
    fn test_upgrade_point_rounds() {
        let rules = RuleConfig {
            upgrade_interval: 3,
            ..RuleConfig::default()
        };
        assert!(!rules.grants_upgrade_point(1));
        assert!(rules.grants_upgrade_point(3));
        assert!(rules.grants_upgrade_point(6));
        let disabled = RuleConfig {
            upgrade_interval: 0,
            ..RuleConfig::default()
        };
        assert!(!disabled.grants_upgrade_point(0));
        assert!(!disabled.grants_upgrade_point(600));
    }

    #[test]
    fn test_zero_flags_to_win_rejected() {
        let rules = RuleConfig {
            flags_to_win: Some(0),
            ..RuleConfig::default()
        };
        assert!(rules.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let rules: RuleConfig =
            serde_json::from_str(r#"{"max_rounds": 50, "tiebreak": ["total_health"]}"#).unwrap();
        assert_eq!(rules.max_rounds, 50);
        assert_eq!(rules.attack_damage, RuleConfig::default().attack_damage);
        assert_eq!(rules.tiebreak, vec![TiebreakMetric::TotalHealth]);
    }

    #[test]
    fn test_captures_to_win() {
        let rules = RuleConfig::default();
        assert_eq!(rules.captures_to_win(3), 3);
        let rules = RuleConfig {
            flags_to_win: Some(2),
            ..RuleConfig::default()
        };
        assert_eq!(rules.captures_to_win(3), 2);
    }
}
