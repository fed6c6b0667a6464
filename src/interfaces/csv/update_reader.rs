use crate::domain::shipment::StatusUpdate;
use crate::domain::status::ShipmentStatus;
use crate::domain::tracking::Coordinates;
use crate::domain::tracking_number::TrackingNumber;
use crate::error::{Result, ShipmentError};
use serde::Deserialize;
use std::io::Read;

/// One line of a bulk status-update file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TrackingUpdateRow {
    pub tracking_number: String,
    pub status: String,
    pub location: String,
    pub description: String,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
}

impl TrackingUpdateRow {
    /// Parses the row into the tracking number it targets and the update to
    /// apply. Coordinates are attached only when both are present.
    pub fn into_update(self) -> Result<(TrackingNumber, StatusUpdate)> {
        let tracking_number = TrackingNumber::parse(&self.tracking_number)?;
        let status: ShipmentStatus = self.status.parse()?;
        let coordinates = match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Some(Coordinates { lat, lng }),
            (None, None) => None,
            _ => {
                return Err(ShipmentError::ValidationError(format!(
                    "{}: lat and lng must be given together",
                    self.tracking_number
                )));
            }
        };
        let update = StatusUpdate {
            status,
            location: self.location,
            description: self.description,
            coordinates,
        };
        Ok((tracking_number, update))
    }
}

/// Reads status updates from a CSV source.
///
/// Like the other readers in this crate it trims whitespace and tolerates
/// short records, so trailing coordinate columns may be left off.
pub struct TrackingUpdateReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> TrackingUpdateReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily deserializes rows; a malformed line yields an error item and
    /// reading continues with the next one.
    pub fn rows(self) -> impl Iterator<Item = Result<TrackingUpdateRow>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(ShipmentError::from))
    }
}
