//! Venue and order primitives.
//!
//! Provides the closed set of supported venues, order side, and the
//! deterministic client order id used for venue-side idempotency.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::command::CommandId;
use crate::error::CoreError;

/// Supported execution venues.
///
/// A closed set: adding a venue means adding one variant plus one adapter,
/// never branching logic scattered across the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Venue {
    Coinbase,
    Binanceus,
    Kraken,
}

impl Venue {
    /// Wire name as used by the Bus and in receipts.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Coinbase => "COINBASE",
            Self::Binanceus => "BINANCEUS",
            Self::Kraken => "KRAKEN",
        }
    }

    /// All supported venues.
    pub fn all() -> [Venue; 3] {
        [Self::Coinbase, Self::Binanceus, Self::Kraken]
    }
}

impl fmt::Display for Venue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Venue {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "COINBASE" => Ok(Self::Coinbase),
            "BINANCEUS" => Ok(Self::Binanceus),
            "KRAKEN" => Ok(Self::Kraken),
            other => Err(CoreError::UnknownVenue(other.to_string())),
        }
    }
}

/// Order side: buy or sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Returns the opposite side.
    pub fn opposite(&self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
        }
    }
}

/// Client order id for venue-side idempotency.
///
/// CRITICAL: derived deterministically from the command id, never random.
/// Resubmission of the same command after a network fault therefore carries
/// the same client order id and is deduplicated by the venue (or by the
/// adapter's local submission cache where the venue lacks idempotency keys).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientOrderId(String);

impl ClientOrderId {
    /// Derive the client order id for a command.
    ///
    /// Format: `edge-{command_id}`
    pub fn for_command(id: &CommandId) -> Self {
        Self(format!("edge-{id}"))
    }

    /// Create from an existing string (for parsing responses).
    pub fn from_string(s: String) -> Self {
        Self(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientOrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ClientOrderId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_venue_roundtrip() {
        for venue in Venue::all() {
            assert_eq!(venue.as_str().parse::<Venue>().unwrap(), venue);
        }
    }

    #[test]
    fn test_venue_parse_case_insensitive() {
        assert_eq!("coinbase".parse::<Venue>().unwrap(), Venue::Coinbase);
        assert!("MEXC".parse::<Venue>().is_err());
    }

    #[test]
    fn test_venue_serde_wire_names() {
        let json = serde_json::to_string(&Venue::Binanceus).unwrap();
        assert_eq!(json, r#""BINANCEUS""#);
    }

    #[test]
    fn test_order_side_opposite() {
        assert_eq!(OrderSide::Buy.opposite(), OrderSide::Sell);
        assert_eq!(OrderSide::Sell.opposite(), OrderSide::Buy);
    }

    #[test]
    fn test_client_order_id_deterministic() {
        let cmd = CommandId::new("c1");
        let a = ClientOrderId::for_command(&cmd);
        let b = ClientOrderId::for_command(&cmd);
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "edge-c1");
    }
}
