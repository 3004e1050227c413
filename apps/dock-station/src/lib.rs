//! # Dock Station Library
//!
//! Console receiving station built on the scan engine.
//!
//! ## Module Organization
//! ```text
//! dock_station_lib/
//! ├── lib.rs          ◄─── You are here (startup & run loop)
//! ├── station.rs      ◄─── Engine wiring, one command at a time
//! ├── catalog.rs      ◄─── In-memory InventoryResolver
//! ├── console.rs      ◄─── Notifier, picker, context, commands
//! └── error.rs        ◄─── Station error type
//! ```

pub mod catalog;
pub mod console;
pub mod error;
pub mod station;

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use dock_scan::ScanConfig;

use catalog::Catalog;
use console::{Command, Console};
use error::StationResult;
use station::{Flow, Station};

/// Runs the station until `:quit` or end of input.
///
/// ## Startup Sequence
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │                       Station Startup                                   │
/// │                                                                         │
/// │  1. Initialize Logging ──────► tracing-subscriber, RUST_LOG override   │
/// │  2. Load Configuration ──────► scan.toml + DOCK_* env, or defaults     │
/// │  3. Load Catalog ────────────► station.catalog JSON, or demo catalog   │
/// │  4. Build Runtime ───────────► multi-thread tokio                      │
/// │  5. Open Station ────────────► coordinator attached to input field     │
/// │  6. Read stdin lines ────────► one command at a time                   │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn run() -> StationResult<()> {
    init_tracing();

    let config = ScanConfig::load_or_default(None);
    let catalog = match &config.station.catalog {
        Some(path) => Catalog::load(path)?,
        None => {
            info!("No catalog configured, using demo catalog");
            Catalog::demo()
        }
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(serve(config, catalog))
}

async fn serve(config: ScanConfig, catalog: Catalog) -> StationResult<()> {
    let console = Arc::new(Console::stdout());
    let station = Station::open(&config, catalog, console.clone()).await?;

    console.say(format!("{} ready. :help for commands.", station.name()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let result = match line.parse::<Command>() {
            Ok(command) => station.handle(command).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(Flow::Continue) => {}
            Ok(Flow::Quit) => break,
            Err(e) if e.is_fatal() => {
                error!(error = %e, "Station stopped");
                station.close();
                return Err(e);
            }
            Err(e) => {
                warn!(error = %e, "Command failed");
                console.say(e.to_string());
            }
        }
    }

    station.close();
    Ok(())
}

/// Initializes the tracing subscriber for structured logging.
///
/// Logs go to stderr so they never interleave with station output.
/// - `RUST_LOG=debug` - Show resolver payloads
/// - Default: INFO level
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,dock_scan=info,dock_station_lib=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
