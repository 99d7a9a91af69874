//! Capital-tier sizing multipliers.
//!
//! A market-cap dependent multiplier applied to either the margin or the
//! leverage before an entry is sized. Tiers are half-open `[low, high)`
//! ranges; the table is total: caps outside every tier get multiplier 1.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::value_objects::DomainError;

/// What the tier multiplier scales.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TierTarget {
    /// Multiply the session margin size
    Margin,
    /// Multiply the session leverage (result truncated to an integer)
    Leverage,
}

impl std::str::FromStr for TierTarget {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "margin" => Ok(TierTarget::Margin),
            "leverage" => Ok(TierTarget::Leverage),
            other => Err(DomainError::InvalidTierTable(format!("Unknown tier target: {}", other))),
        }
    }
}

/// One capital tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapTier {
    /// Lower bound, inclusive
    pub low: Decimal,
    /// Upper bound, exclusive; None = unbounded
    pub high: Option<Decimal>,
    /// Sizing multiplier for caps inside `[low, high)`
    pub multiplier: Decimal,
}

/// Ordered, non-overlapping tier table.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TierTable {
    tiers: Vec<CapTier>,
}

impl TierTable {
    /// Create a table with validation.
    ///
    /// # Errors
    /// Returns `DomainError::InvalidTierTable` when bounds are inverted,
    /// tiers overlap, an unbounded tier is not last, or a multiplier is
    /// non-positive.
    pub fn new(tiers: Vec<CapTier>) -> Result<Self, DomainError> {
        for (i, tier) in tiers.iter().enumerate() {
            if tier.multiplier <= Decimal::ZERO {
                return Err(DomainError::InvalidTierTable(format!(
                    "Tier {} multiplier {} must be positive",
                    i, tier.multiplier
                )));
            }
            match tier.high {
                Some(high) if high <= tier.low => {
                    return Err(DomainError::InvalidTierTable(format!(
                        "Tier {} bounds [{}, {}) are inverted",
                        i, tier.low, high
                    )));
                }
                None if i + 1 != tiers.len() => {
                    return Err(DomainError::InvalidTierTable(
                        "Only the last tier may be unbounded".to_string(),
                    ));
                }
                _ => {}
            }
            if i > 0 {
                let prev = &tiers[i - 1];
                match prev.high {
                    Some(prev_high) if tier.low < prev_high => {
                        return Err(DomainError::InvalidTierTable(format!(
                            "Tier {} overlaps the previous tier",
                            i
                        )));
                    }
                    _ => {}
                }
            }
        }
        Ok(Self { tiers })
    }

    /// An empty table; every cap resolves to 1.
    pub fn empty() -> Self {
        Self { tiers: Vec::new() }
    }

    /// Resolve the multiplier for a market cap. Total: returns 1 when no
    /// tier matches.
    pub fn resolve(&self, cap: Decimal) -> Decimal {
        self.tiers
            .iter()
            .find(|tier| {
                cap >= tier.low
                    && match tier.high {
                        Some(high) => cap < high,
                        None => true,
                    }
            })
            .map(|tier| tier.multiplier)
            .unwrap_or(Decimal::ONE)
    }

    /// Configured tiers
    pub fn tiers(&self) -> &[CapTier] {
        &self.tiers
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn table() -> TierTable {
        TierTable::new(vec![
            CapTier { low: dec!(0), high: Some(dec!(100)), multiplier: dec!(2) },
            CapTier { low: dec!(100), high: Some(dec!(500)), multiplier: dec!(1.5) },
            CapTier { low: dec!(500), high: None, multiplier: dec!(1) },
        ])
        .unwrap()
    }

    #[test]
    fn test_resolve_half_open_bounds() {
        let t = table();
        assert_eq!(t.resolve(dec!(0)), dec!(2));
        assert_eq!(t.resolve(dec!(99.99)), dec!(2));
        // Upper bound belongs to the next tier
        assert_eq!(t.resolve(dec!(100)), dec!(1.5));
        assert_eq!(t.resolve(dec!(500)), dec!(1));
        assert_eq!(t.resolve(dec!(1_000_000)), dec!(1));
    }

    #[test]
    fn test_resolve_default_is_one() {
        let t = TierTable::new(vec![CapTier {
            low: dec!(100),
            high: Some(dec!(200)),
            multiplier: dec!(3),
        }])
        .unwrap();
        assert_eq!(t.resolve(dec!(50)), dec!(1));
        assert_eq!(t.resolve(dec!(200)), dec!(1));
        assert_eq!(TierTable::empty().resolve(dec!(123)), dec!(1));
    }

    #[test]
    fn test_rejects_inverted_bounds() {
        assert!(TierTable::new(vec![CapTier {
            low: dec!(200),
            high: Some(dec!(100)),
            multiplier: dec!(1),
        }])
        .is_err());
    }

    #[test]
    fn test_rejects_overlap() {
        assert!(TierTable::new(vec![
            CapTier { low: dec!(0), high: Some(dec!(150)), multiplier: dec!(2) },
            CapTier { low: dec!(100), high: Some(dec!(300)), multiplier: dec!(1) },
        ])
        .is_err());
    }

    #[test]
    fn test_rejects_unbounded_not_last() {
        assert!(TierTable::new(vec![
            CapTier { low: dec!(0), high: None, multiplier: dec!(2) },
            CapTier { low: dec!(100), high: Some(dec!(300)), multiplier: dec!(1) },
        ])
        .is_err());
    }

    #[test]
    fn test_rejects_non_positive_multiplier() {
        assert!(TierTable::new(vec![CapTier {
            low: dec!(0),
            high: Some(dec!(100)),
            multiplier: dec!(0),
        }])
        .is_err());
    }

    #[test]
    fn test_tier_target_parse() {
        use std::str::FromStr;
        assert_eq!(TierTarget::from_str("margin").unwrap(), TierTarget::Margin);
        assert_eq!(TierTarget::from_str("LEVERAGE").unwrap(), TierTarget::Leverage);
        assert!(TierTarget::from_str("both").is_err());
    }
}
