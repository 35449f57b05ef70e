//! Outcome — the binary seasonal result a forecaster votes for.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The two seasonal outcomes.
///
/// `EarlySpring` is the tie-break winner everywhere a vote is exactly split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    EarlySpring,
    LongWinter,
}

impl Outcome {
    /// A seen shadow means six more weeks of winter.
    pub fn from_shadow(shadow_seen: bool) -> Self {
        if shadow_seen {
            Self::LongWinter
        } else {
            Self::EarlySpring
        }
    }

    /// Vote sign: +1 for early spring, -1 for long winter.
    pub fn sign(self) -> f64 {
        match self {
            Self::EarlySpring => 1.0,
            Self::LongWinter => -1.0,
        }
    }

    /// Resolve a signed score; zero resolves to early spring.
    pub fn from_score(score: f64) -> Self {
        if score >= 0.0 {
            Self::EarlySpring
        } else {
            Self::LongWinter
        }
    }

    pub fn flipped(self) -> Self {
        match self {
            Self::EarlySpring => Self::LongWinter,
            Self::LongWinter => Self::EarlySpring,
        }
    }

    /// Binary label used by the stacked model (1 = early spring).
    pub fn label(self) -> f64 {
        match self {
            Self::EarlySpring => 1.0,
            Self::LongWinter => 0.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::EarlySpring => "EARLY_SPRING",
            Self::LongWinter => "LONG_WINTER",
        }
    }

    /// Lenient parse of the spellings found in outcome files.
    ///
    /// Returns `None` for blanks and unknown spellings; such rows carry no
    /// ground truth.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "EARLY_SPRING" | "ES" => Some(Self::EarlySpring),
            "LONG_WINTER" | "LW" | "MORE_WINTER" => Some(Self::LongWinter),
            _ => None,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shadow_maps_to_long_winter() {
        assert_eq!(Outcome::from_shadow(true), Outcome::LongWinter);
        assert_eq!(Outcome::from_shadow(false), Outcome::EarlySpring);
    }

    #[test]
    fn zero_score_is_early_spring() {
        assert_eq!(Outcome::from_score(0.0), Outcome::EarlySpring);
        assert_eq!(Outcome::from_score(-1e-12), Outcome::LongWinter);
    }

    #[test]
    fn parse_accepts_aliases() {
        assert_eq!(Outcome::parse(" es "), Some(Outcome::EarlySpring));
        assert_eq!(Outcome::parse("more_winter"), Some(Outcome::LongWinter));
        assert_eq!(Outcome::parse("LW"), Some(Outcome::LongWinter));
        assert_eq!(Outcome::parse(""), None);
        assert_eq!(Outcome::parse("SUMMER"), None);
    }

    #[test]
    fn serde_uses_screaming_case() {
        let json = serde_json::to_string(&Outcome::LongWinter).unwrap();
        assert_eq!(json, "\"LONG_WINTER\"");
    }
}
