//! Rung Daemon
//!
//! Position lifecycle and order-ladder engine for futures signals.
//!
//! # Usage
//!
//! ```bash
//! # Start with default configuration
//! cargo run -p rungd
//!
//! # Start with custom environment
//! RUNG_ENV=test RUNG_MARGIN_SIZE=50 cargo run -p rungd
//! ```
//!
//! # Environment Variables
//!
//! - `RUNG_ENV`: Environment (test, development, production)
//! - `RUNG_MARGIN_SIZE`: Margin per position (default: 20)
//! - `RUNG_LEVERAGE`: Requested leverage (default: 20)
//! - `RUNG_TP_OFFSETS`: Default ladder offsets (default: 1,2,3,4,5)
//! - `RUNG_TP_VOLUME_PCT`: Per-rung volume share (default: 20)
//! - `RUNG_SL_MODE`: Stop mode, fixed or break-even (default: fixed)
//! - `RUNG_SL_OFFSET_PCT`: Stop offset percent (default: 20)
//! - `RUNG_TIERS`: Capital tiers, e.g. 0-500:1.5,1000+:3
//! - `RUNG_CAP_LADDERS`: Cap-dependent ladders, e.g. 0-500=2,4,6;1000+=5,10,15

use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use rungd::{Config, Session};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("rungd=info".parse()?))
        .init();

    // Load configuration
    let config = Config::from_env()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = %config.environment,
        margin_size = %config.sizing.margin_size,
        leverage = config.sizing.leverage,
        "Rung Daemon"
    );

    // Signal and order-update sources plug in here; the stub session runs
    // with idle channels until a connector feeds them.
    let (_signal_tx, signal_rx) = mpsc::channel(256);
    let (_update_tx, update_rx) = mpsc::channel(1024);

    let session = Session::new_stub(config);
    session.run(signal_rx, update_rx).await?;

    Ok(())
}
