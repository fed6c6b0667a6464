use crate::error::ShipmentError;
use chrono::{NaiveDate, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;
use std::sync::Mutex;

pub const DEFAULT_PREFIX: &str = "EHE";

/// Range of the random suffix. Always five digits.
pub const SUFFIX_RANGE: RangeInclusive<u32> = 10_000..=99_999;

const DATE_FORMAT: &str = "%Y%m%d";

/// Public identifier of a shipment: `PREFIX-YYYYMMDD-NNNNN`.
///
/// Only well-formed values can be constructed, so anything holding a
/// `TrackingNumber` can rely on the format.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TrackingNumber(String);

impl TrackingNumber {
    pub fn compose(prefix: &str, date: NaiveDate, suffix: u32) -> Result<Self, ShipmentError> {
        validate_prefix(prefix)?;
        if !SUFFIX_RANGE.contains(&suffix) {
            return Err(ShipmentError::ValidationError(format!(
                "tracking number suffix {} out of range",
                suffix
            )));
        }
        Ok(Self(format!(
            "{}-{}-{}",
            prefix,
            date.format(DATE_FORMAT),
            suffix
        )))
    }

    pub fn parse(value: &str) -> Result<Self, ShipmentError> {
        let invalid =
            || ShipmentError::ValidationError(format!("malformed tracking number '{}'", value));

        let mut parts = value.rsplitn(3, '-');
        let (Some(suffix), Some(date), Some(prefix)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };

        if date.len() != 8 || suffix.len() != 5 || !suffix.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let date = NaiveDate::parse_from_str(date, DATE_FORMAT).map_err(|_| invalid())?;
        let suffix: u32 = suffix.parse().map_err(|_| invalid())?;

        Self::compose(prefix, date, suffix).map_err(|_| invalid())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn prefix(&self) -> &str {
        // compose() guarantees the two separators
        let end = self.0.len() - "-YYYYMMDD-NNNNN".len();
        &self.0[..end]
    }

    pub fn date(&self) -> Option<NaiveDate> {
        let start = self.prefix().len() + 1;
        NaiveDate::parse_from_str(&self.0[start..start + 8], DATE_FORMAT).ok()
    }
}

fn validate_prefix(prefix: &str) -> Result<(), ShipmentError> {
    if prefix.is_empty()
        || !prefix
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
    {
        return Err(ShipmentError::ValidationError(format!(
            "tracking prefix must be uppercase alphanumeric, got '{}'",
            prefix
        )));
    }
    Ok(())
}

impl fmt::Display for TrackingNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TrackingNumber {
    type Err = ShipmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s.trim())
    }
}

impl TryFrom<String> for TrackingNumber {
    type Error = ShipmentError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TrackingNumber> for String {
    fn from(value: TrackingNumber) -> Self {
        value.0
    }
}

/// Source of fresh tracking numbers.
///
/// Generated values are not guaranteed unique on their own; the shipment
/// store enforces uniqueness and the caller regenerates on a conflict.
pub trait TrackingNumberGenerator: Send + Sync {
    fn generate(&self) -> TrackingNumber;
}

/// Default generator: today's UTC date plus a random five-digit suffix.
pub struct RandomTrackingNumbers {
    prefix: String,
    rng: Mutex<StdRng>,
}

impl RandomTrackingNumbers {
    pub fn new(prefix: &str) -> Result<Self, ShipmentError> {
        Self::with_rng(prefix, StdRng::from_entropy())
    }

    /// Reproducible sequence, for tests and simulations.
    pub fn seeded(prefix: &str, seed: u64) -> Result<Self, ShipmentError> {
        Self::with_rng(prefix, StdRng::seed_from_u64(seed))
    }

    fn with_rng(prefix: &str, rng: StdRng) -> Result<Self, ShipmentError> {
        validate_prefix(prefix)?;
        Ok(Self {
            prefix: prefix.to_string(),
            rng: Mutex::new(rng),
        })
    }

    pub fn generate_on(&self, date: NaiveDate) -> TrackingNumber {
        let suffix = {
            let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            rng.gen_range(SUFFIX_RANGE)
        };
        TrackingNumber(format!(
            "{}-{}-{}",
            self.prefix,
            date.format(DATE_FORMAT),
            suffix
        ))
    }
}

impl TrackingNumberGenerator for RandomTrackingNumbers {
    fn generate(&self) -> TrackingNumber {
        self.generate_on(Utc::now().date_naive())
    }
}
