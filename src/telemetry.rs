//! Logging setup for the binary.
//!
//! Logs go to stderr so stdout stays reserved for command output. The
//! filter comes from `RUST_LOG` (e.g. `info`, `haulage=debug`) and defaults
//! to `info`.

use crate::error::{Result, ShipmentError};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .try_init()
        .map_err(|e| ShipmentError::InternalError(Box::new(e)))?;

    tracing::debug!("tracing initialized");
    Ok(())
}
