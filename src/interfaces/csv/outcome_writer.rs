use crate::domain::shipment::Shipment;
use crate::error::{Result, ShipmentError};
use serde::Serialize;
use std::io::Write;

/// Result of applying one bulk status update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateOutcome {
    pub tracking_number: String,
    pub status: String,
    /// Ledger length after the update; empty for rejected rows.
    pub events: Option<usize>,
    pub outcome: String,
}

impl UpdateOutcome {
    pub fn applied(shipment: &Shipment) -> Self {
        Self {
            tracking_number: shipment.tracking_number().to_string(),
            status: shipment.status().to_string(),
            events: Some(shipment.tracking().len()),
            outcome: "applied".to_string(),
        }
    }

    pub fn rejected(tracking_number: &str, requested_status: &str, error: &ShipmentError) -> Self {
        Self {
            tracking_number: tracking_number.to_string(),
            status: requested_status.to_string(),
            events: None,
            outcome: format!("rejected: {}", error),
        }
    }
}

/// Writes update outcomes as CSV with a header row.
pub struct OutcomeWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> OutcomeWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write(&mut self, outcome: &UpdateOutcome) -> Result<()> {
        self.writer.serialize(outcome)?;
        Ok(())
    }

    pub fn finish(mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ids::UserId;
    use crate::domain::shipment::fixtures;

    #[test]
    fn test_writes_applied_and_rejected_rows() {
        let shipment = fixtures::shipment(UserId::new());
        let mut buffer = Vec::new();
        {
            let mut writer = OutcomeWriter::new(&mut buffer);
            writer.write(&UpdateOutcome::applied(&shipment)).unwrap();
            writer
                .write(&UpdateOutcome::rejected(
                    "EHE-20250104-99999",
                    "delivered",
                    &ShipmentError::not_found("Shipment", "EHE-20250104-99999"),
                ))
                .unwrap();
            writer.finish().unwrap();
        }

        let output = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], "tracking_number,status,events,outcome");
        assert_eq!(lines[1], "EHE-20250104-12345,pending,1,applied");
        assert!(lines[2].starts_with("EHE-20250104-99999,delivered,,rejected: "));
    }
}
