use crate::error::ShipmentError;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Named delivery tier. Determines the pricing card and the nominal
/// transit time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceClass {
    Express,
    Standard,
    Freight,
    International,
}

impl ServiceClass {
    pub const ALL: [ServiceClass; 4] = [
        ServiceClass::Express,
        ServiceClass::Standard,
        ServiceClass::Freight,
        ServiceClass::International,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceClass::Express => "express",
            ServiceClass::Standard => "standard",
            ServiceClass::Freight => "freight",
            ServiceClass::International => "international",
        }
    }

    /// Resolves a service name for quoting.
    ///
    /// Unknown or misspelled names are priced as `Standard`. Quotes are a
    /// public convenience and never fail on the service name; creating a
    /// shipment still requires a valid class.
    pub fn from_name_or_standard(name: &str) -> Self {
        match name.parse() {
            Ok(class) => class,
            Err(_) => {
                tracing::warn!(service = name, "unknown service class, quoting as standard");
                ServiceClass::Standard
            }
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ServiceClass::Express => "Express Delivery",
            ServiceClass::Standard => "Standard Delivery",
            ServiceClass::Freight => "Freight Service",
            ServiceClass::International => "International Shipping",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ServiceClass::Express => "Next-day delivery for urgent shipments",
            ServiceClass::Standard => "Reliable delivery at an affordable price",
            ServiceClass::Freight => "For large and heavy shipments",
            ServiceClass::International => "Worldwide delivery with customs clearance",
        }
    }
}

impl fmt::Display for ServiceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceClass {
    type Err = ShipmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|class| class.as_str() == needle)
            .ok_or_else(|| ShipmentError::ValidationError(format!("unknown service class '{}'", s)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitWindow {
    pub min_days: u32,
    pub max_days: u32,
}

/// Pricing and timing for one service class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateCard {
    pub base_rate: Decimal,
    pub per_kg_rate: Decimal,
    pub estimated_days: u32,
    pub transit: TransitWindow,
}

/// Longest transit a rate card may promise.
pub const MAX_TRANSIT_DAYS: u32 = 365;

/// Largest total the engine will quote.
pub const MAX_QUOTE_TOTAL: Decimal = dec!(1000000000000);

static STANDARD_CARD: RateCard = RateCard {
    base_rate: dec!(15),
    per_kg_rate: dec!(3),
    estimated_days: 3,
    transit: TransitWindow {
        min_days: 2,
        max_days: 4,
    },
};

/// The Rate Engine: a lookup table of [`RateCard`]s plus the insurance and
/// tax parameters applied on top of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateTable {
    pub cards: BTreeMap<ServiceClass, RateCard>,
    /// Fraction of the declared value charged as insurance.
    pub insurance_rate: Decimal,
    /// Floor for the insurance charge.
    pub insurance_minimum: Decimal,
    pub tax_rate: Decimal,
    pub currency: String,
}

impl Default for RateTable {
    fn default() -> Self {
        let cards = BTreeMap::from([
            (
                ServiceClass::Express,
                RateCard {
                    base_rate: dec!(25),
                    per_kg_rate: dec!(5),
                    estimated_days: 1,
                    transit: TransitWindow {
                        min_days: 1,
                        max_days: 1,
                    },
                },
            ),
            (ServiceClass::Standard, STANDARD_CARD.clone()),
            (
                ServiceClass::Freight,
                RateCard {
                    base_rate: dec!(50),
                    per_kg_rate: dec!(8),
                    estimated_days: 5,
                    transit: TransitWindow {
                        min_days: 4,
                        max_days: 7,
                    },
                },
            ),
            (
                ServiceClass::International,
                RateCard {
                    base_rate: dec!(75),
                    per_kg_rate: dec!(12),
                    estimated_days: 10,
                    transit: TransitWindow {
                        min_days: 7,
                        max_days: 14,
                    },
                },
            ),
        ]);

        Self {
            cards,
            insurance_rate: dec!(0.01),
            insurance_minimum: dec!(2),
            tax_rate: dec!(0.08),
            currency: "USD".to_string(),
        }
    }
}

impl RateTable {
    /// Card for `class`. A table missing that class (e.g. a trimmed config
    /// file) prices it as standard, and a table missing standard too uses
    /// the built-in standard card.
    pub fn card(&self, class: ServiceClass) -> &RateCard {
        self.cards
            .get(&class)
            .or_else(|| self.cards.get(&ServiceClass::Standard))
            .unwrap_or(&STANDARD_CARD)
    }

    /// Prices a parcel. Pure and deterministic.
    ///
    /// Components are kept at full precision; `total` is their exact sum.
    /// Use [`Quote::to_pricing`] for the rounded figures stored on a
    /// shipment. Inputs whose price cannot be represented, or exceeds
    /// [`MAX_QUOTE_TOTAL`], are a validation error.
    pub fn quote(
        &self,
        weight: Decimal,
        class: ServiceClass,
        declared_value: Decimal,
    ) -> Result<Quote, ShipmentError> {
        let card = self.card(class);
        let out_of_range = || {
            ShipmentError::ValidationError(format!(
                "price for {} kg declared at {} is out of range",
                weight, declared_value
            ))
        };

        let base_rate = card.base_rate;
        let weight_charge = card.per_kg_rate.checked_mul(weight).ok_or_else(out_of_range)?;
        let insurance = declared_value
            .checked_mul(self.insurance_rate)
            .ok_or_else(out_of_range)?
            .max(self.insurance_minimum);
        let subtotal = base_rate
            .checked_add(weight_charge)
            .and_then(|sum| sum.checked_add(insurance))
            .ok_or_else(out_of_range)?;
        let tax = subtotal.checked_mul(self.tax_rate).ok_or_else(out_of_range)?;
        let total = subtotal.checked_add(tax).ok_or_else(out_of_range)?;
        if total.abs() > MAX_QUOTE_TOTAL {
            return Err(out_of_range());
        }

        Ok(Quote {
            service: class,
            base_rate,
            weight_charge,
            insurance,
            tax,
            total,
            currency: self.currency.clone(),
            estimated_days: card.estimated_days,
        })
    }

    /// Like [`RateTable::quote`] but takes the service by name, falling back
    /// to standard for unknown names.
    pub fn quote_named(
        &self,
        weight: Decimal,
        service: &str,
        declared_value: Decimal,
    ) -> Result<Quote, ShipmentError> {
        self.quote(
            weight,
            ServiceClass::from_name_or_standard(service),
            declared_value,
        )
    }

    /// Rejects tables that could price negatively or push delivery dates
    /// out of range.
    pub fn validate(&self) -> Result<(), ShipmentError> {
        let non_negative = [
            ("insurance_rate", self.insurance_rate),
            ("insurance_minimum", self.insurance_minimum),
            ("tax_rate", self.tax_rate),
        ];
        for (field, value) in non_negative {
            if value < Decimal::ZERO {
                return Err(ShipmentError::ValidationError(format!(
                    "{} must not be negative",
                    field
                )));
            }
        }

        for (class, card) in &self.cards {
            if card.base_rate < Decimal::ZERO || card.per_kg_rate < Decimal::ZERO {
                return Err(ShipmentError::ValidationError(format!(
                    "rates for {} must not be negative",
                    class
                )));
            }
            if card.estimated_days > MAX_TRANSIT_DAYS || card.transit.max_days > MAX_TRANSIT_DAYS {
                return Err(ShipmentError::ValidationError(format!(
                    "transit days for {} must be at most {}",
                    class, MAX_TRANSIT_DAYS
                )));
            }
            if card.transit.min_days > card.transit.max_days {
                return Err(ShipmentError::ValidationError(format!(
                    "transit window for {} has min_days above max_days",
                    class
                )));
            }
        }
        Ok(())
    }

    pub fn transit_time(&self, class: ServiceClass, now: DateTime<Utc>) -> TransitEstimate {
        let window = self.card(class).transit;
        TransitEstimate {
            service: class,
            min_days: window.min_days,
            max_days: window.max_days,
            estimated_delivery: now + Duration::days(i64::from(window.max_days)),
        }
    }

    pub fn services(&self) -> Vec<ServiceInfo> {
        ServiceClass::ALL
            .into_iter()
            .map(|class| {
                let card = self.card(class);
                ServiceInfo {
                    service: class,
                    name: class.display_name().to_string(),
                    description: class.description().to_string(),
                    estimated_days: card.estimated_days,
                    base_rate: card.base_rate,
                    per_kg_rate: card.per_kg_rate,
                }
            })
            .collect()
    }
}

/// Unrounded price breakdown returned by the Rate Engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub service: ServiceClass,
    pub base_rate: Decimal,
    pub weight_charge: Decimal,
    pub insurance: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub currency: String,
    pub estimated_days: u32,
}

impl Quote {
    /// Rounds every component to cents and re-sums them, so the stored
    /// total is always exactly the sum of the stored components.
    pub fn to_pricing(&self) -> Pricing {
        let base_rate = round_minor(self.base_rate);
        let weight_charge = round_minor(self.weight_charge);
        let insurance = round_minor(self.insurance);
        let tax = round_minor(self.tax);

        Pricing {
            base_rate,
            weight_charge,
            insurance,
            tax,
            total: base_rate + weight_charge + insurance + tax,
            currency: self.currency.clone(),
        }
    }
}

/// Price stored on a shipment. Computed once at creation and never
/// re-derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pricing {
    pub base_rate: Decimal,
    pub weight_charge: Decimal,
    pub insurance: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitEstimate {
    pub service: ServiceClass,
    pub min_days: u32,
    pub max_days: u32,
    pub estimated_delivery: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub service: ServiceClass,
    pub name: String,
    pub description: String,
    pub estimated_days: u32,
    pub base_rate: Decimal,
    pub per_kg_rate: Decimal,
}

pub fn round_minor(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
