use clap::{Parser, Subcommand};
use haulage::application::service::{ShipmentSearch, ShipmentService};
use haulage::config::ServiceConfig;
use haulage::domain::authorization::{Caller, Role};
use haulage::domain::ids::{ShipmentId, UserId};
use haulage::domain::ports::{PaymentStoreBox, ShipmentStoreBox};
use haulage::domain::query::PageRequest;
use haulage::domain::rate::{Pricing, ServiceClass};
use haulage::domain::shipment::{NewShipment, StatusUpdate};
use haulage::domain::status::ShipmentStatus;
use haulage::domain::tracking_number::TrackingNumber;
use haulage::infrastructure::gateway::SimulatedGateway;
use haulage::infrastructure::in_memory::{InMemoryPaymentStore, InMemoryShipmentStore};
#[cfg(feature = "storage-rocksdb")]
use haulage::infrastructure::rocksdb::RocksDBStore;
use haulage::interfaces::csv::outcome_writer::{OutcomeWriter, UpdateOutcome};
use haulage::interfaces::csv::update_reader::TrackingUpdateReader;
use haulage::telemetry;
use miette::{IntoDiagnostic, Result};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON config file overriding the default rate table and settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    /// Acting user id; a fresh id is used when omitted
    #[arg(long, global = true)]
    user: Option<UserId>,

    /// Acting role
    #[arg(long, global = true, default_value = "customer")]
    role: Role,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Price a parcel without creating a shipment
    Quote {
        #[arg(long)]
        weight: Decimal,
        #[arg(long, default_value = "standard")]
        service: String,
        /// Declared value used for the insurance surcharge
        #[arg(long, default_value = "0")]
        value: Decimal,
    },
    /// List the service catalog
    Services,
    /// Create a shipment from a JSON request file
    Create { request: PathBuf },
    /// Public tracking lookup
    Track { tracking_number: String },
    /// Cancel one of your shipments
    Cancel { id: ShipmentId },
    /// Record a status update (agent or admin)
    Advance {
        /// Shipment id or tracking number
        target: String,
        #[arg(long)]
        status: ShipmentStatus,
        #[arg(long)]
        location: String,
        #[arg(long)]
        description: String,
        #[arg(long, requires = "lng")]
        lat: Option<f64>,
        #[arg(long, requires = "lat")]
        lng: Option<f64>,
    },
    /// Apply a CSV of status updates and print one outcome row per update
    ApplyUpdates { input: PathBuf },
    /// List your shipments, or search all shipments as admin
    List {
        #[arg(long)]
        status: Option<ShipmentStatus>,
        /// Tracking-number fragment (admin only)
        #[arg(long)]
        search: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long)]
        limit: Option<u32>,
    },
}

#[derive(Serialize)]
struct QuoteOutput {
    service: ServiceClass,
    estimated_days: u32,
    #[serde(flatten)]
    pricing: Pricing,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init_tracing().into_diagnostic()?;

    let config = match &cli.config {
        Some(path) => ServiceConfig::load(path).into_diagnostic()?,
        None => ServiceConfig::default(),
    };
    let (shipments, payments) = open_stores(cli.db_path)?;
    let service = ShipmentService::new(
        shipments,
        payments,
        Box::new(SimulatedGateway::new()),
        config,
    )
    .into_diagnostic()?;
    let caller = Caller::new(cli.user.unwrap_or_default(), cli.role);

    match cli.command {
        Command::Quote {
            weight,
            service: class,
            value,
        } => {
            let quote = service.quote(weight, &class, value).into_diagnostic()?;
            print_json(&QuoteOutput {
                service: quote.service,
                estimated_days: quote.estimated_days,
                pricing: quote.to_pricing(),
            })?;
        }
        Command::Services => print_json(&service.services())?,
        Command::Create { request } => {
            let file = File::open(request).into_diagnostic()?;
            let request: NewShipment = serde_json::from_reader(file).into_diagnostic()?;
            let shipment = service
                .create_shipment(&caller, request)
                .await
                .into_diagnostic()?;
            print_json(&shipment)?;
        }
        Command::Track { tracking_number } => {
            let snapshot = service.track(&tracking_number).await.into_diagnostic()?;
            print_json(&snapshot)?;
        }
        Command::Cancel { id } => {
            let shipment = service
                .cancel_shipment(&caller, id)
                .await
                .into_diagnostic()?;
            print_json(&shipment)?;
        }
        Command::Advance {
            target,
            status,
            location,
            description,
            lat,
            lng,
        } => {
            let mut update = StatusUpdate::new(status, &location, &description);
            if let (Some(lat), Some(lng)) = (lat, lng) {
                update = update.with_coordinates(lat, lng);
            }
            let shipment = match target.parse::<ShipmentId>() {
                Ok(id) => service.advance_status(&caller, id, update).await,
                Err(_) => {
                    let number = TrackingNumber::parse(&target).into_diagnostic()?;
                    service
                        .advance_status_by_tracking_number(&caller, &number, update)
                        .await
                }
            }
            .into_diagnostic()?;
            print_json(&shipment)?;
        }
        Command::ApplyUpdates { input } => apply_updates(&service, &caller, input).await?,
        Command::List {
            status,
            search,
            page,
            limit,
        } => {
            let page = PageRequest::new(page, limit.unwrap_or(service.config().page_size));
            let results = if caller.role == Role::Admin {
                let search = ShipmentSearch {
                    status,
                    tracking_number_contains: search,
                    page: Some(page),
                };
                service.search_shipments(&caller, search).await
            } else {
                service.list_shipments(&caller, status, Some(page)).await
            }
            .into_diagnostic()?;
            print_json(&results)?;
        }
    }

    Ok(())
}

fn open_stores(db_path: Option<PathBuf>) -> Result<(ShipmentStoreBox, PaymentStoreBox)> {
    match db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => {
            // Use persistent storage (RocksDB)
            let store = RocksDBStore::open(path).into_diagnostic()?;
            Ok((Box::new(store.clone()), Box::new(store)))
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => {
            eprintln!(
                "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
            );
            Ok(in_memory_stores())
        }
        None => Ok(in_memory_stores()),
    }
}

fn in_memory_stores() -> (ShipmentStoreBox, PaymentStoreBox) {
    (
        Box::new(InMemoryShipmentStore::new()),
        Box::new(InMemoryPaymentStore::new()),
    )
}

async fn apply_updates(service: &ShipmentService, caller: &Caller, input: PathBuf) -> Result<()> {
    let file = File::open(input).into_diagnostic()?;
    let reader = TrackingUpdateReader::new(file);
    let stdout = io::stdout();
    let mut writer = OutcomeWriter::new(stdout.lock());

    for row_result in reader.rows() {
        let row = match row_result {
            Ok(row) => row,
            Err(e) => {
                eprintln!("Error reading update: {}", e);
                continue;
            }
        };

        let tracking_number = row.tracking_number.clone();
        let requested_status = row.status.clone();
        let result = match row.into_update() {
            Ok((number, update)) => {
                service
                    .advance_status_by_tracking_number(caller, &number, update)
                    .await
            }
            Err(e) => Err(e),
        };
        let outcome = match result {
            Ok(shipment) => UpdateOutcome::applied(&shipment),
            Err(e) => UpdateOutcome::rejected(&tracking_number, &requested_status, &e),
        };
        writer.write(&outcome).into_diagnostic()?;
    }

    writer.finish().into_diagnostic()
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value).into_diagnostic()?;
    writeln!(stdout).into_diagnostic()
}
