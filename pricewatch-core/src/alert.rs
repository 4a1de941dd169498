//! Price alert definitions

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::PricewatchError;

/// Identifier assigned by the alert store at creation
pub type AlertId = i64;

/// Which side of the target price triggers an alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Fires once the price reaches or exceeds the target
    Above,
    /// Fires once the price reaches or drops under the target
    Below,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Above => "above",
            Direction::Below => "below",
        }
    }

    /// Whether `price` satisfies this direction against `target`.
    ///
    /// The boundary is inclusive for both directions.
    pub fn is_crossed(&self, price: Decimal, target: Decimal) -> bool {
        match self {
            Direction::Above => price >= target,
            Direction::Below => price <= target,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Direction {
    type Err = PricewatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "above" => Ok(Direction::Above),
            "below" => Ok(Direction::Below),
            _ => Err(PricewatchError::invalid_input(format!(
                "direction must be either \"above\" or \"below\", got \"{}\"",
                s
            ))),
        }
    }
}

/// Input for creating an alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAlert {
    /// Opaque recipient identifier (e.g. a Discord user id)
    pub owner_id: String,
    pub asset_id: String,
    pub target_price: Decimal,
    pub direction: Direction,
}

/// A stored price alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: AlertId,
    pub owner_id: String,
    pub asset_id: String,
    pub target_price: Decimal,
    pub direction: Direction,
    /// Once true, never reset
    pub fired: bool,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fired_at: Option<DateTime<Utc>>,
}

impl Alert {
    /// Whether this alert should fire at `price`. Fired alerts never fire again.
    pub fn should_fire(&self, price: Decimal) -> bool {
        !self.fired && self.direction.is_crossed(price, self.target_price)
    }
}
