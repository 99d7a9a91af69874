//! Take-profit ladder configuration.
//!
//! A ladder is an ordered list of rungs, each carrying a price offset from
//! entry (percent) and a share of the remaining volume (percent). The final
//! rung always consumes whatever volume is still left, so the configured
//! volume of the last rung is a hint rather than a bound.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::value_objects::DomainError;

// =============================================================================
// Ladder
// =============================================================================

/// One rung of a take-profit ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LadderStep {
    /// Offset from entry price, in percent (always positive; direction
    /// comes from the position side)
    pub offset_pct: Decimal,
    /// Share of the remaining volume, in percent
    pub volume_pct: Decimal,
}

/// Validated take-profit ladder.
///
/// # Invariants
/// - At least one rung
/// - Offsets strictly increasing and positive
/// - Each volume share in (0, 100], shares summing to at most 100
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ladder(Vec<LadderStep>);

impl Ladder {
    /// Create a ladder with validation.
    ///
    /// # Errors
    /// Returns `DomainError::InvalidLadder` when any invariant is violated.
    pub fn new(steps: Vec<LadderStep>) -> Result<Self, DomainError> {
        if steps.is_empty() {
            return Err(DomainError::InvalidLadder("Ladder must have at least one rung".to_string()));
        }

        let mut prev_offset = Decimal::ZERO;
        let mut volume_total = Decimal::ZERO;
        for (i, step) in steps.iter().enumerate() {
            if step.offset_pct <= prev_offset {
                return Err(DomainError::InvalidLadder(format!(
                    "Rung {} offset {} must exceed the previous offset {}",
                    i, step.offset_pct, prev_offset
                )));
            }
            if step.volume_pct <= Decimal::ZERO || step.volume_pct > Decimal::ONE_HUNDRED {
                return Err(DomainError::InvalidLadder(format!(
                    "Rung {} volume {} must be in (0, 100]",
                    i, step.volume_pct
                )));
            }
            prev_offset = step.offset_pct;
            volume_total += step.volume_pct;
        }

        if volume_total > Decimal::ONE_HUNDRED {
            return Err(DomainError::InvalidLadder(format!(
                "Volume shares sum to {}, must not exceed 100",
                volume_total
            )));
        }

        Ok(Self(steps))
    }

    /// Build a ladder from offsets, all rungs sharing one volume percent.
    pub fn from_offsets(offsets: &[Decimal], volume_pct: Decimal) -> Result<Self, DomainError> {
        let steps = offsets
            .iter()
            .map(|&offset_pct| LadderStep { offset_pct, volume_pct })
            .collect();
        Self::new(steps)
    }

    /// Rungs in ascending offset order
    pub fn steps(&self) -> &[LadderStep] {
        &self.0
    }

    /// Number of rungs
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false for a validated ladder, present for completeness
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// =============================================================================
// Stop mode
// =============================================================================

/// How the trailing stop level is derived from ladder progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopMode {
    /// Stop trails at a fixed percent offset below (Long) or above (Short)
    /// the most recently reached level
    FixedOffset,
    /// Stop sits exactly on the rung price one step behind the current
    /// progress; falls back to the fixed offset before any rung is reached
    BreakEvenLadder,
}

impl std::str::FromStr for StopMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fixed" | "fixed-offset" => Ok(StopMode::FixedOffset),
            "break-even" | "break-even-ladder" => Ok(StopMode::BreakEvenLadder),
            other => Err(DomainError::InvalidLadder(format!("Unknown stop mode: {}", other))),
        }
    }
}

// =============================================================================
// Capital-dependent ladder selection
// =============================================================================

/// One market-cap band mapped to a set of ladder offsets.
///
/// Bounds are half-open `[low, high)` and expressed in millions of quote
/// units; `high = None` extends the band to infinity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapBand {
    /// Lower bound in millions, inclusive
    pub low_millions: Decimal,
    /// Upper bound in millions, exclusive; None = unbounded
    pub high_millions: Option<Decimal>,
    /// Ladder offsets for caps inside this band
    pub offsets: Vec<Decimal>,
}

impl CapBand {
    const MILLION: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

    fn contains(&self, cap: Decimal) -> bool {
        let low = self.low_millions * Self::MILLION;
        match self.high_millions {
            Some(high) => cap >= low && cap < high * Self::MILLION,
            None => cap >= low,
        }
    }
}

/// Ordered capital-to-ladder mapping.
///
/// Every band shares one per-rung volume percent; resolution pairs the
/// band's offsets with that share.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LadderBook {
    bands: Vec<CapBand>,
    volume_pct: Decimal,
}

impl LadderBook {
    /// Create a ladder book, validating that every band's offsets form a
    /// valid ladder with the shared volume share.
    pub fn new(bands: Vec<CapBand>, volume_pct: Decimal) -> Result<Self, DomainError> {
        for band in &bands {
            Ladder::from_offsets(&band.offsets, volume_pct)?;
        }
        Ok(Self { bands, volume_pct })
    }

    /// Resolve the ladder for a market cap (in plain quote units).
    ///
    /// Returns None when no band matches; callers fall back to the session
    /// default ladder.
    pub fn resolve(&self, cap: Decimal) -> Option<Ladder> {
        self.bands.iter().find(|band| band.contains(cap)).map(|band| {
            // Bands are validated at construction, rebuilding cannot fail.
            Ladder::from_offsets(&band.offsets, self.volume_pct)
                .unwrap_or_else(|_| unreachable!("band validated at construction"))
        })
    }

    /// Number of configured bands
    pub fn len(&self) -> usize {
        self.bands.len()
    }

    /// True when no bands are configured
    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================
