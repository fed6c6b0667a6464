use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::ShipmentError;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn as_uuid(&self) -> &Uuid {
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
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = ShipmentError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim()).map(Self).map_err(|e| {
                    ShipmentError::ValidationError(format!("invalid {} '{}': {}", $label, s, e))
                })
            }
        }
    };
}

uuid_id!(
    /// Internal identifier of a shipment document. Opaque to customers, who
    /// only ever see the tracking number.
    ShipmentId,
    "shipment id"
);
uuid_id!(
    /// Reference to a user supplied by the identity provider.
    UserId,
    "user id"
);
uuid_id!(PaymentId, "payment id");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_parse_and_display() {
        let id = ShipmentId::new();
        let parsed: ShipmentId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_invalid_id_is_validation_error() {
        let result = "not-a-uuid".parse::<UserId>();
        assert!(matches!(result, Err(ShipmentError::ValidationError(_))));
    }
}
