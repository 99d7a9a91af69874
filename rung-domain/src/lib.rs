//! Rung domain layer.
//!
//! Pure domain logic with zero I/O dependencies: validated value objects,
//! instrument specs, ladder and tier configuration, the position record
//! with its lifecycle state machine, and structured notification bodies.

#![warn(missing_docs)]
#![warn(clippy::all)]

// Public modules
pub mod instrument;
pub mod ladder;
pub mod notification;
pub mod record;
pub mod tiers;
pub mod value_objects;

// Re-export commonly used types
pub use instrument::SymbolSpec;
pub use ladder::{CapBand, Ladder, LadderBook, LadderStep, StopMode};
pub use notification::{format_duration, Notification, OrderScope};
pub use record::{LifecycleState, OpenOrder, OrderState, PositionRecord};
pub use tiers::{CapTier, TierTable, TierTarget};
pub use value_objects::{DomainError, OrderSide, Price, Quantity, Side, Symbol, TriggerDirection};
