//! Identifiers, value objects and enumerations shared across the rental domain.
//!
//! Enumerations persist as their lowercase literal (`"automatic"`, `"paid"`,
//! ...) both in JSON and in the database, so stored rows and redirect URLs
//! written by earlier deployments keep parsing.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random id.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wraps an existing `Uuid`.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// The inner `Uuid`.
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for a car in the catalog.
    CarId
);
uuid_id!(
    /// Unique identifier for a registered user.
    UserId
);
uuid_id!(
    /// Unique identifier for an order.
    OrderId
);
uuid_id!(
    /// Unique identifier for a review.
    ReviewId
);

// ============================================================================
// Money (cents-based to avoid floating point errors)
// ============================================================================

/// An amount of money in minor units (cents).
///
/// The API speaks in major units (`100` means one hundred of the shop
/// currency, `89.5` is allowed), so serde converts at the boundary.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(u64);

impl Money {
    /// Zero.
    pub const ZERO: Self = Self(0);

    /// Creates a `Money` value from cents.
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Creates a `Money` value from whole currency units, `None` on overflow.
    #[must_use]
    pub const fn checked_from_major(units: u64) -> Option<Self> {
        match units.checked_mul(100) {
            Some(cents) => Some(Self(cents)),
            None => None,
        }
    }

    /// Creates a `Money` value from a decimal major-unit amount, rounding
    /// to the nearest cent. Negative, NaN and out-of-range amounts give `None`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_major_f64(amount: f64) -> Option<Self> {
        if !amount.is_finite() || amount < 0.0 {
            return None;
        }
        let cents = (amount * 100.0).round();
        if cents > 9_007_199_254_740_991.0 {
            return None;
        }
        Some(Self(cents as u64))
    }

    /// The amount in cents.
    #[must_use]
    pub const fn cents(&self) -> u64 {
        self.0
    }

    /// The amount in major units, for display and JSON.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_major_f64(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Adds two amounts with overflow checking.
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(result) => Some(Self(result)),
            None => None,
        }
    }

    /// Multiplies by a quantity with overflow checking.
    #[must_use]
    pub const fn checked_multiply(self, quantity: u32) -> Option<Self> {
        match self.0.checked_mul(quantity as u64) {
            Some(result) => Some(Self(result)),
            None => None,
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_major_f64())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let amount = f64::deserialize(deserializer)?;
        Self::from_major_f64(amount)
            .ok_or_else(|| serde::de::Error::custom("amount must be a non-negative number"))
    }
}

// ============================================================================
// Enumerations
// ============================================================================

/// Error returned when a stored or submitted literal is not a known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    /// Which enumeration was being parsed.
    pub kind: &'static str,
    /// The rejected literal.
    pub value: String,
}

macro_rules! literal_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $($(#[$vmeta:meta])* $variant:ident => $lit:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The persisted literal.
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $lit),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($lit => Ok(Self::$variant),)+
                    other => Err(UnknownVariant {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

literal_enum!(
    /// Gearbox type.
    Transmission, "transmission" {
        /// Automatic gearbox
        Automatic => "automatic",
        /// Manual gearbox
        Manual => "manual",
    }
);

literal_enum!(
    /// Fuel / drive type.
    FuelType, "fuel type" {
        /// Petrol engine
        Petrol => "petrol",
        /// Diesel engine
        Diesel => "diesel",
        /// Battery electric
        Electric => "electric",
        /// Hybrid drive
        Hybrid => "hybrid",
    }
);

literal_enum!(
    /// Body type used for catalog filtering.
    CarType, "car type" {
        /// Sedan
        Sedan => "sedan",
        /// Sport utility vehicle
        Suv => "suv",
        /// Hatchback
        Hatchback => "hatchback",
        /// Sports car
        Sports => "sports",
        /// Luxury car
        Luxury => "luxury",
        /// Van
        Van => "van",
    }
);

literal_enum!(
    /// Order status.
    ///
    /// `pending` moves to exactly one of the terminal states `paid` or
    /// `cancelled`. Nothing leaves a terminal state.
    OrderStatus, "order status" {
        /// Checkout started, payment outcome unknown
        Pending => "pending",
        /// Processor confirmed payment
        Paid => "paid",
        /// Session expired, payment failed or the client aborted
        Cancelled => "cancelled",
    }
);

impl OrderStatus {
    /// `paid` and `cancelled` are final.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Paid | Self::Cancelled)
    }

    /// Whether moving from `self` to `next` is a real transition.
    ///
    /// Only `pending` can move, and only into a terminal state.
    #[must_use]
    pub const fn can_transition_to(&self, next: Self) -> bool {
        matches!(self, Self::Pending) && next.is_terminal()
    }
}
