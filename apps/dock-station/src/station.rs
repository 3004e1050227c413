//! # Receiving Station
//!
//! Wires the scan engine to the console and runs one operator command at a
//! time.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Station wiring                                  │
//! │                                                                         │
//! │  stdin line ──► Command                                                │
//! │                   │                                                     │
//! │     Scan(raw) ────┴──► InputField.type_text + press_enter              │
//! │                              │ ScanSink.offer                          │
//! │                              ▼                                          │
//! │                        ScanCoordinator ──► CatalogResolver             │
//! │                              │                 │                        │
//! │            released ◄────────┤                 ▼                        │
//! │       "(not a product code)" │        ConsoleNotifier / ConsolePicker  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use tracing::{info, warn};

use dock_scan::{
    Claim, InputField, ReceivingScreen, ReleasedScan, ScanConfig, ScanCoordinator, ScanServices,
};

use crate::catalog::{Catalog, CatalogResolver};
use crate::console::{Command, Console, ConsoleContext, ConsoleNotifier, ConsolePicker, HELP};
use crate::error::{StationError, StationResult};

/// What the loop does after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// A receiving station attached to its screen.
pub struct Station {
    name: String,
    console: Arc<Console>,
    coordinator: ScanCoordinator,
    resolver: Arc<CatalogResolver>,
    context: Arc<ConsoleContext>,
    picker: Arc<ConsolePicker>,
    field: InputField,
}

impl Station {
    /// Builds the station and attaches the coordinator to its input field.
    ///
    /// Must be called inside a tokio runtime.
    pub async fn open(
        config: &ScanConfig,
        catalog: Catalog,
        console: Arc<Console>,
    ) -> StationResult<Self> {
        let resolver = Arc::new(CatalogResolver::new(catalog));
        let context = Arc::new(ConsoleContext::new(config.station.picking_id));
        let picker = Arc::new(ConsolePicker::new(console.clone()));

        let services = ScanServices::new(resolver.clone(), context.clone())
            .with_notifier(Arc::new(ConsoleNotifier::new(console.clone())))
            .with_picker(picker.clone());
        let coordinator = ScanCoordinator::new(config, services)?;

        let field = InputField::new();
        let released = console.clone();
        let surface = field.surface(Arc::new(move |scan: ReleasedScan| {
            released.say(format!("(not a product code) {}", scan.raw_text()));
        }));

        coordinator.activate_with(ReceivingScreen::new().with_surface(surface))?;
        if !coordinator.attached().await {
            return Err(StationError::Unavailable(
                "Receiving screen did not attach".into(),
            ));
        }

        info!(station = %config.station.name, picking_id = ?context.picking_id(), "Station open");

        Ok(Station {
            name: config.station.name.clone(),
            console,
            coordinator,
            resolver,
            context,
            picker,
            field,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn coordinator(&self) -> &ScanCoordinator {
        &self.coordinator
    }

    pub fn resolver(&self) -> &CatalogResolver {
        &self.resolver
    }

    /// Runs one command to completion, including any resolver calls it
    /// triggered.
    pub async fn handle(&self, command: Command) -> StationResult<Flow> {
        match command {
            Command::Scan(raw) => {
                if raw.trim().is_empty() {
                    return Ok(Flow::Continue);
                }
                self.field.type_text(&raw);
                if self.field.press_enter() == Claim::Declined {
                    warn!("Scan declined, coordinator not attached");
                    self.console.say(format!("(not intercepted) {raw}"));
                    self.field.clear();
                }
            }
            Command::Picking(picking_id) => {
                let label = match picking_id {
                    Some(id) => match self.resolver.catalog().picking(id) {
                        Some(picking) => picking.name.clone(),
                        None => format!("#{id} (unknown)"),
                    },
                    None => "none".to_string(),
                };
                self.context.set(picking_id);
                self.console.say(format!("Active picking: {label}"));
            }
            Command::Pick(number) => {
                let name = self.picker.pick(number)?;
                self.console.say(format!("Selected {name}"));
            }
            Command::Dismiss => {
                if !self.picker.dismiss() {
                    return Err(StationError::Unavailable(
                        "No variant choice is open".into(),
                    ));
                }
                self.console.say("Variant choice dismissed");
            }
            Command::Reopen => {
                let pending = self.coordinator.pending_choices();
                let choice = pending.last().ok_or_else(|| {
                    StationError::Unavailable("No dismissed choice to reopen".into())
                })?;
                self.coordinator.reopen_choice(choice.scan_id)?;
            }
            Command::Stats => {
                self.console.say(self.coordinator.stats().to_string());
            }
            Command::Lines => {
                let moves = self.resolver.planned_moves();
                if moves.is_empty() {
                    self.console.say("No lines recorded");
                }
                for planned in moves {
                    self.console.say(format!(
                        "  picking {}: {} planned {}",
                        planned.picking_id, planned.name, planned.planned
                    ));
                }
            }
            Command::Help => {
                for line in HELP {
                    self.console.say(*line);
                }
            }
            Command::Quit => return Ok(Flow::Quit),
        }

        self.coordinator.settle().await;
        Ok(Flow::Continue)
    }

    /// Detaches from the screen.
    pub fn close(&self) {
        self.coordinator.teardown();
        info!(station = %self.name, stats = %self.coordinator.stats(), "Station closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn station(picking_id: Option<i64>) -> (Station, Arc<Console>) {
        let mut config = ScanConfig::default();
        config.station.picking_id = picking_id;
        let console = Arc::new(Console::silent());
        let station = Station::open(&config, Catalog::demo(), console.clone())
            .await
            .unwrap();
        (station, console)
    }

    async fn run(station: &Station, line: &str) -> StationResult<Flow> {
        station.handle(line.parse()?).await
    }

    #[tokio::test]
    async fn test_single_variant_scan_is_applied() {
        let (station, console) = station(Some(1)).await;

        run(&station, "(01)04006381333931(37)3(10)B-77").await.unwrap();

        assert_eq!(
            console.transcript(),
            vec!["[ ok ] Added line for Work Gloves (planned +3)"]
        );
        assert_eq!(station.resolver().move_lines()[0].lot.as_deref(), Some("B-77"));
    }

    #[tokio::test]
    async fn test_variant_choice_then_pick() {
        let (station, console) = station(Some(1)).await;

        run(&station, "0112345678901231").await.unwrap();
        assert!(console.transcript().iter().any(|l| l == "  2) Polo Shirt (M) [Units]"));

        run(&station, ":pick 2").await.unwrap();
        let transcript = console.transcript();
        assert_eq!(
            transcript.last().map(String::as_str),
            Some("[ ok ] Added line for Polo Shirt (M) (planned +1)")
        );
        assert_eq!(station.resolver().move_lines()[0].variant_id, 101);
    }

    #[tokio::test]
    async fn test_dismiss_and_reopen() {
        let (station, console) = station(Some(1)).await;

        run(&station, "0112345678901231").await.unwrap();
        run(&station, ":dismiss").await.unwrap();
        assert_eq!(station.coordinator().pending_choices().len(), 1);

        run(&station, ":reopen").await.unwrap();
        run(&station, ":pick 3").await.unwrap();
        assert_eq!(
            console.transcript().last().map(String::as_str),
            Some("[ ok ] Added line for Polo Shirt (L) (planned +1)")
        );
        assert!(matches!(
            run(&station, ":reopen").await,
            Err(StationError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_without_picking() {
        let (station, console) = station(None).await;

        run(&station, "4006381333931").await.unwrap();
        assert_eq!(console.transcript(), vec!["[FAIL] Picking not found"]);

        run(&station, ":picking 2").await.unwrap();
        run(&station, "4006381333931").await.unwrap();
        assert_eq!(
            console.transcript().last().map(String::as_str),
            Some("[ ok ] Added line for Work Gloves (planned +1)")
        );
        assert_eq!(station.resolver().move_lines()[0].picking_id, 2);
    }

    #[tokio::test]
    async fn test_non_product_code_goes_to_default_handling() {
        let (station, console) = station(Some(1)).await;

        run(&station, "WH-STOCK-A1").await.unwrap();
        assert_eq!(console.transcript(), vec!["(not a product code) WH-STOCK-A1"]);
        assert!(station.resolver().move_lines().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_product() {
        let (station, console) = station(Some(1)).await;

        run(&station, "012345678905").await.unwrap();
        assert_eq!(
            console.transcript(),
            vec!["[FAIL] Product not found for scanned code"]
        );
    }

    #[tokio::test]
    async fn test_quit_and_close() {
        let (station, _console) = station(Some(1)).await;
        assert_eq!(run(&station, ":quit").await.unwrap(), Flow::Quit);

        station.close();
        assert!(!station.coordinator().state().is_installed());
        assert_eq!(
            station.handle(Command::Scan("4006381333931".into())).await.unwrap(),
            Flow::Continue
        );
        assert!(station.resolver().move_lines().is_empty());
    }
}
