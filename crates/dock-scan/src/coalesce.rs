//! Collapsing of repeated notifications for one physical scan.
//!
//! A surface can see one physical scan more than once: an input field fires
//! both on Enter and on change. Such a surface tags every notification of the
//! same gesture with one [`Gesture`] and offers them through
//! [`ScanSink::offer_notification`](crate::ScanSink::offer_notification).
//! Only a repeat of an already seen `(gesture, raw text)` pair is collapsed.
//! Untagged offers are separate physical scans and always pass, even when
//! their text repeats. Nothing is delayed and order is kept.

use std::collections::VecDeque;

use uuid::Uuid;

/// Gestures remembered per dispatcher. A surface repeats a notification
/// right away, so a short memory is enough.
pub const RECENT_GESTURES: usize = 64;

/// Identity of one physical scan as seen by a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Gesture(Uuid);

impl Gesture {
    pub fn new() -> Self {
        Gesture(Uuid::new_v4())
    }
}

impl Default for Gesture {
    fn default() -> Self {
        Self::new()
    }
}

/// Remembers recent tagged notifications.
#[derive(Debug)]
pub struct NotificationFilter {
    recent: VecDeque<(Gesture, String)>,
    capacity: usize,
}

impl NotificationFilter {
    pub fn new(capacity: usize) -> Self {
        NotificationFilter {
            recent: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    /// True if the notification must be considered, false if it repeats a
    /// notification of the same gesture.
    pub fn admit(&mut self, gesture: Option<Gesture>, raw_text: &str) -> bool {
        let Some(gesture) = gesture else {
            return true;
        };

        let seen = self
            .recent
            .iter()
            .any(|(g, raw)| *g == gesture && raw == raw_text);
        if seen {
            return false;
        }

        if self.recent.len() == self.capacity {
            self.recent.pop_front();
        }
        self.recent.push_back((gesture, raw_text.to_string()));
        true
    }
}

impl Default for NotificationFilter {
    fn default() -> Self {
        Self::new(RECENT_GESTURES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untagged_repeats_always_pass() {
        let mut filter = NotificationFilter::default();
        assert!(filter.admit(None, "LOC-A-01"));
        assert!(filter.admit(None, "LOC-A-01"));
    }

    #[test]
    fn test_repeat_of_same_gesture_is_collapsed() {
        let mut filter = NotificationFilter::default();
        let gesture = Gesture::new();
        assert!(filter.admit(Some(gesture), "4006381333931"));
        assert!(!filter.admit(Some(gesture), "4006381333931"));

        // Same text from another gesture is another scan
        assert!(filter.admit(Some(Gesture::new()), "4006381333931"));
    }

    #[test]
    fn test_different_text_in_one_gesture_passes() {
        let mut filter = NotificationFilter::default();
        let gesture = Gesture::new();
        assert!(filter.admit(Some(gesture), "40063"));
        assert!(filter.admit(Some(gesture), "4006381333931"));
    }

    #[test]
    fn test_memory_is_bounded() {
        let mut filter = NotificationFilter::new(2);
        let oldest = Gesture::new();
        assert!(filter.admit(Some(oldest), "a"));
        assert!(filter.admit(Some(Gesture::new()), "b"));
        assert!(filter.admit(Some(Gesture::new()), "c"));

        // Forgotten once it left the window
        assert!(filter.admit(Some(oldest), "a"));
    }
}
