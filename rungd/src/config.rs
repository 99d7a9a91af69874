//! Daemon configuration.
//!
//! Loads configuration from environment variables with sensible defaults.
//! Structured values use compact string formats:
//!
//! - `RUNG_TP_OFFSETS`: comma-separated percents, `1,2,3,4,5`
//! - `RUNG_TIERS`: `low-high:multiplier` entries in millions of quote
//!   units, `0-500:1.5,500-1000:2,1000+:3`
//! - `RUNG_CAP_LADDERS`: `low-high=offsets` bands in millions,
//!   `0-500=2,4,6;1000+=5,10,15`

use std::env;
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use rung_domain::{CapBand, CapTier, LadderBook, StopMode, TierTable, TierTarget};
use rung_engine::PacingConfig;

use crate::error::{DaemonError, DaemonResult};

const MILLION: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

// =============================================================================
// Configuration
// =============================================================================

/// Daemon configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Entry sizing configuration
    pub sizing: SizingConfig,

    /// Take-profit ladder configuration
    pub ladder: LadderSettings,

    /// Stop configuration
    pub stop: StopSettings,

    /// Ladder placement pacing
    pub pacing: PacingConfig,

    /// Loop intervals and windows
    pub timing: TimingConfig,

    /// Environment (test, development, production)
    pub environment: Environment,
}

/// Entry sizing configuration.
#[derive(Debug, Clone)]
pub struct SizingConfig {
    /// Margin per position, quote units
    pub margin_size: Decimal,
    /// Requested leverage
    pub leverage: u32,
    /// What capital tiers scale
    pub tier_target: TierTarget,
    /// Capital-tier table, bounds in plain quote units
    pub tiers: TierTable,
}

/// Take-profit ladder configuration.
#[derive(Debug, Clone)]
pub struct LadderSettings {
    /// Per-rung share of the remaining volume, percent
    pub volume_pct: Decimal,
    /// Default ladder offsets, percent
    pub default_offsets: Vec<Decimal>,
    /// Market-cap dependent ladder overrides
    pub cap_ladders: LadderBook,
}

/// Stop configuration.
#[derive(Debug, Clone, Copy)]
pub struct StopSettings {
    /// Trailing mode
    pub mode: StopMode,
    /// Base offset, percent (magnitude is what matters)
    pub offset_pct: Decimal,
}

/// Loop intervals and windows.
#[derive(Debug, Clone, Copy)]
pub struct TimingConfig {
    /// Reconciler cycle interval
    pub sync_interval: Duration,
    /// Stop supervision tick interval
    pub supervisor_interval: Duration,
    /// Instrument cache refresh interval
    pub instrument_refresh: Duration,
    /// How long the ladder scheduler waits for the entry fill
    pub entry_wait: Duration,
    /// Poll interval while waiting for the fill
    pub entry_poll: Duration,
    /// Signals older than this are dropped
    pub signal_timeout: Duration,
    /// Identical signals inside this window are suppressed
    pub repeat_window: Duration,
    /// Minimum spacing between closing reports for one slot
    pub pnl_debounce: Duration,
}

/// Environment type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    /// Test environment (uses stubs)
    Test,
    /// Development environment
    Development,
    /// Production environment
    Production,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> DaemonResult<Self> {
        // Load .env file if present (ignore errors)
        let _ = dotenvy::dotenv();

        Ok(Self {
            sizing: Self::load_sizing()?,
            ladder: Self::load_ladder()?,
            stop: Self::load_stop()?,
            pacing: Self::load_pacing()?,
            timing: Self::load_timing()?,
            environment: Self::load_environment()?,
        })
    }

    /// Create test configuration: tight intervals, no pacing noise.
    pub fn test() -> Self {
        Self {
            sizing: SizingConfig {
                margin_size: dec!(20),
                leverage: 20,
                tier_target: TierTarget::Margin,
                tiers: TierTable::empty(),
            },
            ladder: LadderSettings {
                volume_pct: dec!(20),
                default_offsets: vec![dec!(1), dec!(2), dec!(3), dec!(4), dec!(5)],
                cap_ladders: LadderBook::new(Vec::new(), dec!(20))
                    .unwrap_or_else(|_| unreachable!("empty book is valid")),
            },
            stop: StopSettings { mode: StopMode::FixedOffset, offset_pct: dec!(20) },
            pacing: PacingConfig { base_secs: 0.0, increment_secs: 0.0, noise_secs: 0.0 },
            timing: TimingConfig {
                sync_interval: Duration::from_millis(20),
                supervisor_interval: Duration::from_millis(10),
                instrument_refresh: Duration::from_millis(100),
                entry_wait: Duration::from_millis(500),
                entry_poll: Duration::from_millis(5),
                signal_timeout: Duration::from_secs(10),
                repeat_window: Duration::from_secs(5),
                pnl_debounce: Duration::from_millis(100),
            },
            environment: Environment::Test,
        }
    }

    fn load_environment() -> DaemonResult<Environment> {
        let env_str = env::var("RUNG_ENV").unwrap_or_else(|_| "development".to_string());

        match env_str.to_lowercase().as_str() {
            "test" => Ok(Environment::Test),
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(DaemonError::Config(format!(
                "Invalid RUNG_ENV: {}. Expected: test, development, production",
                other
            ))),
        }
    }

    fn load_sizing() -> DaemonResult<SizingConfig> {
        let margin_size = load_decimal_env("RUNG_MARGIN_SIZE", dec!(20))?;
        let leverage = load_u64_env("RUNG_LEVERAGE", 20)? as u32;
        let tier_target = match env::var("RUNG_TIER_TARGET") {
            Ok(val) => TierTarget::from_str(&val)
                .map_err(|e| DaemonError::Config(format!("Invalid RUNG_TIER_TARGET: {}", e)))?,
            Err(_) => TierTarget::Margin,
        };
        let tiers = match env::var("RUNG_TIERS") {
            Ok(val) if !val.trim().is_empty() => parse_tiers(&val)?,
            _ => TierTable::empty(),
        };

        Ok(SizingConfig { margin_size, leverage, tier_target, tiers })
    }

    fn load_ladder() -> DaemonResult<LadderSettings> {
        let volume_pct = load_decimal_env("RUNG_TP_VOLUME_PCT", dec!(20))?;
        let default_offsets = match env::var("RUNG_TP_OFFSETS") {
            Ok(val) => parse_offsets(&val)
                .map_err(|e| DaemonError::Config(format!("Invalid RUNG_TP_OFFSETS: {}", e)))?,
            Err(_) => vec![dec!(1), dec!(2), dec!(3), dec!(4), dec!(5)],
        };
        let cap_ladders = match env::var("RUNG_CAP_LADDERS") {
            Ok(val) if !val.trim().is_empty() => parse_cap_ladders(&val, volume_pct)?,
            _ => LadderBook::new(Vec::new(), volume_pct)
                .map_err(|e| DaemonError::Config(e.to_string()))?,
        };

        Ok(LadderSettings { volume_pct, default_offsets, cap_ladders })
    }

    fn load_stop() -> DaemonResult<StopSettings> {
        let mode = match env::var("RUNG_SL_MODE") {
            Ok(val) => StopMode::from_str(&val)
                .map_err(|e| DaemonError::Config(format!("Invalid RUNG_SL_MODE: {}", e)))?,
            Err(_) => StopMode::FixedOffset,
        };
        let offset_pct = load_decimal_env("RUNG_SL_OFFSET_PCT", dec!(20))?;

        Ok(StopSettings { mode, offset_pct })
    }

    fn load_pacing() -> DaemonResult<PacingConfig> {
        Ok(PacingConfig {
            base_secs: load_f64_env("RUNG_PACING_BASE_SECS", 1.0)?,
            increment_secs: load_f64_env("RUNG_PACING_INCREMENT_SECS", 0.5)?,
            noise_secs: load_f64_env("RUNG_PACING_NOISE_SECS", 0.5)?,
        })
    }

    fn load_timing() -> DaemonResult<TimingConfig> {
        Ok(TimingConfig {
            sync_interval: Duration::from_millis(load_u64_env("RUNG_SYNC_INTERVAL_MS", 1000)?),
            supervisor_interval: Duration::from_millis(load_u64_env(
                "RUNG_SUPERVISOR_INTERVAL_MS",
                250,
            )?),
            instrument_refresh: Duration::from_millis(load_u64_env(
                "RUNG_INSTRUMENT_REFRESH_MS",
                5000,
            )?),
            entry_wait: Duration::from_millis(load_u64_env("RUNG_ENTRY_WAIT_MS", 30_000)?),
            entry_poll: Duration::from_millis(load_u64_env("RUNG_ENTRY_POLL_MS", 150)?),
            signal_timeout: Duration::from_secs(load_u64_env("RUNG_SIGNAL_TIMEOUT_SECS", 10)?),
            repeat_window: Duration::from_secs(load_u64_env("RUNG_REPEAT_WINDOW_SECS", 5)?),
            pnl_debounce: Duration::from_millis(load_u64_env("RUNG_PNL_DEBOUNCE_MS", 3000)?),
        })
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Test => write!(f, "test"),
            Environment::Development => write!(f, "development"),
            Environment::Production => write!(f, "production"),
        }
    }
}

// =============================================================================
// Env helpers and format parsers
// =============================================================================

fn load_decimal_env(key: &str, default: Decimal) -> DaemonResult<Decimal> {
    match env::var(key) {
        Ok(val) => Decimal::from_str(&val)
            .map_err(|_| DaemonError::Config(format!("Invalid {} value: {}", key, val))),
        Err(_) => Ok(default),
    }
}

fn load_u64_env(key: &str, default: u64) -> DaemonResult<u64> {
    match env::var(key) {
        Ok(val) => val
            .parse::<u64>()
            .map_err(|_| DaemonError::Config(format!("Invalid {} value: {}", key, val))),
        Err(_) => Ok(default),
    }
}

fn load_f64_env(key: &str, default: f64) -> DaemonResult<f64> {
    match env::var(key) {
        Ok(val) => val
            .parse::<f64>()
            .map_err(|_| DaemonError::Config(format!("Invalid {} value: {}", key, val))),
        Err(_) => Ok(default),
    }
}

/// Parse `1,2,3,4,5` into ladder offsets.
pub fn parse_offsets(s: &str) -> Result<Vec<Decimal>, String> {
    s.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| Decimal::from_str(part).map_err(|_| format!("bad offset: {}", part)))
        .collect()
}

/// Parse a `low-high` or `low+` range in millions into plain quote units.
fn parse_range_millions(s: &str) -> Result<(Decimal, Option<Decimal>), String> {
    if let Some(low) = s.strip_suffix('+') {
        let low = Decimal::from_str(low.trim()).map_err(|_| format!("bad range: {}", s))?;
        return Ok((low * MILLION, None));
    }
    let (low, high) = s.split_once('-').ok_or_else(|| format!("bad range: {}", s))?;
    let low = Decimal::from_str(low.trim()).map_err(|_| format!("bad range: {}", s))?;
    let high = Decimal::from_str(high.trim()).map_err(|_| format!("bad range: {}", s))?;
    Ok((low * MILLION, Some(high * MILLION)))
}

/// Parse `0-500:1.5,500-1000:2,1000+:3` into a tier table.
pub fn parse_tiers(s: &str) -> DaemonResult<TierTable> {
    let mut tiers = Vec::new();
    for entry in s.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (range, multiplier) = entry
            .split_once(':')
            .ok_or_else(|| DaemonError::Config(format!("Invalid RUNG_TIERS entry: {}", entry)))?;
        let (low, high) = parse_range_millions(range)
            .map_err(|e| DaemonError::Config(format!("Invalid RUNG_TIERS entry: {}", e)))?;
        let multiplier = Decimal::from_str(multiplier.trim()).map_err(|_| {
            DaemonError::Config(format!("Invalid RUNG_TIERS multiplier: {}", multiplier))
        })?;
        tiers.push(CapTier { low, high, multiplier });
    }
    TierTable::new(tiers).map_err(|e| DaemonError::Config(e.to_string()))
}

/// Parse `0-500=2,4,6;1000+=5,10,15` into a ladder book.
///
/// Ranges in millions; the second half of each band is the offset list for
/// caps inside it. Note ranges keep the millions unit here, `CapBand`
/// scales internally.
pub fn parse_cap_ladders(s: &str, volume_pct: Decimal) -> DaemonResult<LadderBook> {
    let mut bands = Vec::new();
    for entry in s.split(';').map(str::trim).filter(|e| !e.is_empty()) {
        let (range, offsets) = entry.split_once('=').ok_or_else(|| {
            DaemonError::Config(format!("Invalid RUNG_CAP_LADDERS entry: {}", entry))
        })?;
        let (low, high) = parse_range_millions(range)
            .map_err(|e| DaemonError::Config(format!("Invalid RUNG_CAP_LADDERS entry: {}", e)))?;
        let offsets = parse_offsets(offsets).map_err(|e| {
            DaemonError::Config(format!("Invalid RUNG_CAP_LADDERS offsets: {}", e))
        })?;
        bands.push(CapBand {
            low_millions: low / MILLION,
            high_millions: high.map(|h| h / MILLION),
            offsets,
        });
    }
    LadderBook::new(bands, volume_pct).map_err(|e| DaemonError::Config(e.to_string()))
}

// =============================================================================
// Tests
// =============================================================================
