//! Input field filled by a keyboard-wedge scanner.
//!
//! The scanner types the code into the field and ends with Enter. Enter and
//! the change notification both submit the current value as notifications of
//! one gesture; whichever comes first while the coordinator is attached
//! claims it and clears the field.
//! A declined submission leaves the value in place for the host's own
//! handling.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::trace;

use dock_core::ScanSource;

use crate::coalesce::Gesture;
use crate::error::ScanResult;
use crate::surface::{Claim, DefaultHandler, ScanSink, ScanSurface};

/// What submitted the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitTrigger {
    Enter,
    Change,
}

impl std::fmt::Display for SubmitTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubmitTrigger::Enter => write!(f, "enter"),
            SubmitTrigger::Change => write!(f, "change"),
        }
    }
}

#[derive(Default)]
struct FieldState {
    value: String,
    gesture: Gesture,
    sink: Option<ScanSink>,
}

impl FieldState {
    fn reset(&mut self) {
        self.value.clear();
        self.gesture = Gesture::new();
    }
}

/// The host's side of the field.
#[derive(Clone, Default)]
pub struct InputField {
    state: Arc<Mutex<FieldState>>,
}

impl InputField {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, FieldState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends typed text. Input notifications never submit.
    pub fn type_text(&self, text: &str) {
        self.lock().value.push_str(text);
    }

    pub fn value(&self) -> String {
        self.lock().value.clone()
    }

    pub fn clear(&self) {
        self.lock().reset();
    }

    pub fn press_enter(&self) -> Claim {
        self.submit(SubmitTrigger::Enter)
    }

    /// Change notification, fired when the field loses focus.
    pub fn commit(&self) -> Claim {
        self.submit(SubmitTrigger::Change)
    }

    fn submit(&self, trigger: SubmitTrigger) -> Claim {
        let mut state = self.lock();
        let claim = match state.sink.as_ref() {
            Some(sink) => sink.offer_notification(state.value.as_str(), state.gesture),
            None => Claim::Declined,
        };

        if claim.is_owned() {
            state.reset();
        }
        trace!(%trigger, owned = claim.is_owned(), "Input field submitted");
        claim
    }

    /// Surface to hand to the coordinator.
    pub fn surface(&self, default_handler: Arc<dyn DefaultHandler>) -> InputFieldSurface {
        InputFieldSurface {
            field: self.clone(),
            default_handler,
        }
    }

    pub fn is_intercepted(&self) -> bool {
        self.lock().sink.is_some()
    }
}

/// The field as seen by the coordinator.
pub struct InputFieldSurface {
    field: InputField,
    default_handler: Arc<dyn DefaultHandler>,
}

impl ScanSurface for InputFieldSurface {
    fn source(&self) -> ScanSource {
        ScanSource::InputField
    }

    fn default_handler(&self) -> Arc<dyn DefaultHandler> {
        Arc::clone(&self.default_handler)
    }

    fn attach(&mut self, sink: ScanSink) -> ScanResult<()> {
        self.field.lock().sink = Some(sink);
        Ok(())
    }

    fn detach(&mut self) {
        self.field.lock().sink = None;
    }
}
