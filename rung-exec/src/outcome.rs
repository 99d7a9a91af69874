//! Order outcome validation.
//!
//! Normalizes raw gateway responses into a shape the rest of the engine
//! can branch on without touching exchange quirks. Validation never
//! fails: a missing or malformed response is just an unsuccessful
//! outcome.

use chrono::Utc;

use crate::ports::{GatewayError, RawOrderResponse};

/// Fallback reason when the exchange refuses without saying why.
pub const UNKNOWN_ERROR: &str = "unknown error";

/// Normalized result of one order placement or cancellation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderOutcome {
    /// The exchange accepted the order
    pub success: bool,
    /// Assigned order id on success
    pub order_id: Option<String>,
    /// Exchange timestamp when reported, local clock otherwise
    pub timestamp_ms: i64,
    /// Failure reason on rejection
    pub reason: Option<String>,
}

impl OrderOutcome {
    /// Interpret a gateway call result.
    ///
    /// Acceptance requires both the success flag and a zero error code.
    /// Absence of a response (gateway error) is treated as failure with
    /// the error's message as the reason.
    pub fn from_result(result: Result<RawOrderResponse, GatewayError>) -> Self {
        match result {
            Ok(response) => {
                let accepted = response.success && response.code == 0;
                let timestamp_ms = response
                    .timestamp_ms
                    .unwrap_or_else(|| Utc::now().timestamp_millis());
                if accepted {
                    Self {
                        success: true,
                        order_id: response.order_id,
                        timestamp_ms,
                        reason: None,
                    }
                } else {
                    Self {
                        success: false,
                        order_id: None,
                        timestamp_ms,
                        reason: Some(
                            response.message.unwrap_or_else(|| UNKNOWN_ERROR.to_string()),
                        ),
                    }
                }
            }
            Err(e) => Self {
                success: false,
                order_id: None,
                timestamp_ms: Utc::now().timestamp_millis(),
                reason: Some(e.to_string()),
            },
        }
    }

    /// Failure reason, falling back to the unknown-error sentinel.
    pub fn reason(&self) -> &str {
        self.reason.as_deref().unwrap_or(UNKNOWN_ERROR)
    }
}

// =============================================================================
// Tests
// =============================================================================
