//! # Console Collaborators
//!
//! The terminal stands in for the receiving screen: notifications become
//! printed lines, the variant dialog becomes a numbered list answered with
//! `:pick <n>`, and `:picking <id>` switches the active receipt.
//!
//! Everything printed also lands in a transcript so the station can be
//! exercised without a terminal.

use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dock_core::{PickingContext, Severity, VariantCandidate};
use dock_scan::{ContextProvider, Notifier, VariantPicker, VariantSelection};

use crate::error::{StationError, StationResult};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// Console Output
// =============================================================================

/// Line-oriented output with a transcript.
#[derive(Default)]
pub struct Console {
    echo: bool,
    transcript: Mutex<Vec<String>>,
}

impl Console {
    /// Prints to stdout and records.
    pub fn stdout() -> Self {
        Console {
            echo: true,
            transcript: Mutex::default(),
        }
    }

    /// Records only.
    pub fn silent() -> Self {
        Console::default()
    }

    pub fn say(&self, line: impl Into<String>) {
        let line = line.into();
        if self.echo {
            println!("{line}");
        }
        lock(&self.transcript).push(line);
    }

    pub fn transcript(&self) -> Vec<String> {
        lock(&self.transcript).clone()
    }
}

// =============================================================================
// Notifier
// =============================================================================

pub struct ConsoleNotifier {
    console: Arc<Console>,
}

impl ConsoleNotifier {
    pub fn new(console: Arc<Console>) -> Self {
        ConsoleNotifier { console }
    }
}

impl Notifier for ConsoleNotifier {
    fn notify(&self, message: &str, severity: Severity) {
        let tag = match severity {
            Severity::Info => "info",
            Severity::Success => " ok ",
            Severity::Warning => "warn",
            Severity::Danger => "FAIL",
        };
        self.console.say(format!("[{tag}] {message}"));
    }
}

// =============================================================================
// Variant Picker
// =============================================================================

/// Keeps the open choice until the operator answers it.
pub struct ConsolePicker {
    console: Arc<Console>,
    open: Mutex<Option<VariantSelection>>,
}

impl ConsolePicker {
    pub fn new(console: Arc<Console>) -> Self {
        ConsolePicker {
            console,
            open: Mutex::default(),
        }
    }

    pub fn is_open(&self) -> bool {
        lock(&self.open).is_some()
    }

    /// Selects the `number`th candidate (1-based). Returns its name.
    pub fn pick(&self, number: usize) -> StationResult<String> {
        let selection = lock(&self.open)
            .take()
            .ok_or_else(|| StationError::Unavailable("No variant choice is open".into()))?;

        let Some(candidate) = number
            .checked_sub(1)
            .and_then(|index| selection.candidates().get(index))
            .cloned()
        else {
            let count = selection.candidates().len();
            *lock(&self.open) = Some(selection);
            return Err(StationError::Unavailable(format!(
                "Choose a number between 1 and {count}"
            )));
        };

        match selection.select(candidate.id) {
            Ok(()) => Ok(candidate.display_name),
            Err(selection) => {
                *lock(&self.open) = Some(selection);
                Err(StationError::Unavailable(format!(
                    "{} cannot be selected",
                    candidate.display_name
                )))
            }
        }
    }

    /// Closes the open choice without selecting.
    pub fn dismiss(&self) -> bool {
        // Dropped outside the lock: dismissal may park the choice.
        let selection = lock(&self.open).take();
        selection.is_some()
    }
}

impl VariantPicker for ConsolePicker {
    fn open(&self, candidates: Vec<VariantCandidate>, on_select: VariantSelection) {
        self.console
            .say("Several variants share this code. Choose one with :pick <n>");
        for (number, candidate) in candidates.iter().enumerate() {
            self.console.say(format!(
                "  {}) {} [{}]",
                number + 1,
                candidate.display_name,
                candidate.uom
            ));
        }

        let previous = lock(&self.open).replace(on_select);
        drop(previous);
    }
}

// =============================================================================
// Picking Context
// =============================================================================

/// The receipt currently shown on the screen.
pub struct ConsoleContext {
    current: Mutex<PickingContext>,
}

impl ConsoleContext {
    pub fn new(picking_id: Option<i64>) -> Self {
        ConsoleContext {
            current: Mutex::new(PickingContext { picking_id }),
        }
    }

    pub fn set(&self, picking_id: Option<i64>) {
        lock(&self.current).picking_id = picking_id;
    }

    pub fn picking_id(&self) -> Option<i64> {
        lock(&self.current).picking_id
    }
}

impl ContextProvider for ConsoleContext {
    fn current_picking_context(&self) -> PickingContext {
        *lock(&self.current)
    }
}

// =============================================================================
// Commands
// =============================================================================

/// One line of operator input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Anything not starting with `:` is scanner input.
    Scan(String),
    Picking(Option<i64>),
    Pick(usize),
    Dismiss,
    Reopen,
    Stats,
    Lines,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = StationError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim_end_matches(['\r', '\n']);
        let Some(command) = line.strip_prefix(':') else {
            return Ok(Command::Scan(line.to_string()));
        };

        let mut words = command.split_whitespace();
        let name = words.next().unwrap_or_default();
        let argument = words.next();
        let unknown = || StationError::UnknownCommand(line.to_string());

        let parsed = match (name, argument) {
            ("picking", Some("none")) => Command::Picking(None),
            ("picking", Some(id)) => Command::Picking(Some(id.parse().map_err(|_| unknown())?)),
            ("pick", Some(n)) => Command::Pick(n.parse().map_err(|_| unknown())?),
            ("dismiss", None) => Command::Dismiss,
            ("reopen", None) => Command::Reopen,
            ("stats", None) => Command::Stats,
            ("lines", None) => Command::Lines,
            ("help", None) => Command::Help,
            ("quit" | "q", None) => Command::Quit,
            _ => return Err(unknown()),
        };

        if words.next().is_some() {
            return Err(unknown());
        }
        Ok(parsed)
    }
}

pub const HELP: &[&str] = &[
    "Type or scan a code and press Enter.",
    "  :picking <id>|none   switch the active receipt",
    "  :pick <n>            choose a variant",
    "  :dismiss             close the variant choice",
    "  :reopen              reopen the last dismissed choice",
    "  :stats               scan counters",
    "  :lines               recorded move lines",
    "  :quit                leave the station",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scan_lines() {
        assert_eq!(
            "0112345678901231".parse::<Command>().unwrap(),
            Command::Scan("0112345678901231".into())
        );
        assert_eq!(
            " (01)1234 \r\n".parse::<Command>().unwrap(),
            Command::Scan(" (01)1234 ".into())
        );
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(":picking 4".parse::<Command>().unwrap(), Command::Picking(Some(4)));
        assert_eq!(":picking none".parse::<Command>().unwrap(), Command::Picking(None));
        assert_eq!(":pick 2".parse::<Command>().unwrap(), Command::Pick(2));
        assert_eq!(":dismiss".parse::<Command>().unwrap(), Command::Dismiss);
        assert_eq!(":q".parse::<Command>().unwrap(), Command::Quit);
    }

    #[test]
    fn test_parse_rejects_malformed_commands() {
        for line in [":picking", ":picking x", ":pick", ":stats now", ":launch"] {
            assert!(
                matches!(line.parse::<Command>(), Err(StationError::UnknownCommand(_))),
                "{line}"
            );
        }
    }

    #[test]
    fn test_notifier_tags_severity() {
        let console = Arc::new(Console::silent());
        let notifier = ConsoleNotifier::new(console.clone());
        notifier.notify("Picking not found", Severity::Danger);
        assert_eq!(console.transcript(), vec!["[FAIL] Picking not found"]);
    }

    #[test]
    fn test_context_switch() {
        let context = ConsoleContext::new(Some(1));
        context.set(None);
        assert_eq!(context.current_picking_context(), PickingContext::none());
    }

    #[test]
    fn test_pick_without_open_choice() {
        let picker = ConsolePicker::new(Arc::new(Console::silent()));
        assert!(!picker.is_open());
        assert!(matches!(picker.pick(1), Err(StationError::Unavailable(_))));
        assert!(!picker.dismiss());
    }
}
