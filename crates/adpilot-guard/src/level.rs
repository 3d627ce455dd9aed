use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Three automation levels:
///
/// - **Advisory**: the engine only suggests; everything that would
///   auto-execute is escalated to the approval queue instead.
/// - **Semi**: routine actions auto-execute, but every budget change
///   requires approval (the major-change threshold is forced to 0).
/// - **Full**: actions within guardrails execute without a human.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutomationLevel {
    Advisory,
    Semi,
    Full,
}

impl AutomationLevel {
    /// Whether any proposal may execute without a human in the loop.
    pub fn allows_auto_execution(&self) -> bool {
        *self != Self::Advisory
    }

    /// The effective major-change threshold under this level: Semi escalates every
    /// budget change, the others use the configured fraction.
    pub fn effective_major_change_fraction(&self, configured: f64) -> f64 {
        match self {
            Self::Semi => 0.0,
            _ => configured,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Advisory => "Suggest only; every action needs approval",
            Self::Semi => "Routine actions auto-execute, budget changes need approval",
            Self::Full => "Actions within guardrails execute autonomously",
        }
    }
}

impl fmt::Display for AutomationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Advisory => "advisory",
            Self::Semi => "semi",
            Self::Full => "full",
        };
        f.write_str(s)
    }
}

impl FromStr for AutomationLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "advisory" => Ok(Self::Advisory),
            "semi" => Ok(Self::Semi),
            "full" => Ok(Self::Full),
            other => Err(format!("unknown automation level: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_roundtrip() {
        for level in [
            AutomationLevel::Advisory,
            AutomationLevel::Semi,
            AutomationLevel::Full,
        ] {
            assert_eq!(level.to_string().parse::<AutomationLevel>().unwrap(), level);
        }
        assert!("manual".parse::<AutomationLevel>().is_err());
    }

    #[test]
    fn semi_forces_major_threshold_to_zero() {
        assert_eq!(
            AutomationLevel::Semi.effective_major_change_fraction(0.2),
            0.0
        );
        assert_eq!(
            AutomationLevel::Full.effective_major_change_fraction(0.2),
            0.2
        );
    }

    #[test]
    fn advisory_blocks_auto_execution() {
        assert!(!AutomationLevel::Advisory.allows_auto_execution());
        assert!(AutomationLevel::Semi.allows_auto_execution());
        assert!(AutomationLevel::Full.allows_auto_execution());
    }
}
