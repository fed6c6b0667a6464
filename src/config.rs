use crate::domain::query::{MAX_PAGE_SIZE, PageRequest};
use crate::domain::rate::RateTable;
use crate::domain::status::TransitionPolicy;
use crate::domain::tracking_number::{DEFAULT_PREFIX, RandomTrackingNumbers};
use crate::error::{Result, ShipmentError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Runtime settings for [`ShipmentService`](crate::application::service::ShipmentService).
///
/// Every field has a default, so a config file only needs the keys it
/// overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub tracking_prefix: String,
    /// Tracking numbers minted per creation before giving up on collisions.
    pub max_tracking_number_attempts: u32,
    pub transition_policy: TransitionPolicy,
    pub page_size: u32,
    pub rates: RateTable,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            tracking_prefix: DEFAULT_PREFIX.to_string(),
            max_tracking_number_attempts: 10,
            transition_policy: TransitionPolicy::default(),
            page_size: 10,
            rates: RateTable::default(),
        }
    }
}

impl ServiceConfig {
    /// Loads a JSON config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        // rejects bad prefixes with the generator's own rules
        RandomTrackingNumbers::new(&self.tracking_prefix)?;

        if self.max_tracking_number_attempts == 0 {
            return Err(ShipmentError::ValidationError(
                "max_tracking_number_attempts must be at least 1".to_string(),
            ));
        }
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(ShipmentError::ValidationError(format!(
                "page_size must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }
        if self.rates.currency.trim().is_empty() {
            return Err(ShipmentError::ValidationError(
                "rates.currency is required".to_string(),
            ));
        }
        self.rates.validate()
    }

    pub fn default_page(&self) -> PageRequest {
        PageRequest::new(1, self.page_size)
    }
}
