//! Search-as-you-type: decides when the geocoding lookup actually fires.
//!
//! The debouncer is a plain state machine driven with explicit instants.
//! The controller owns the clock and calls [`SearchDebouncer::on_timer_expired`]
//! once [`SearchDebouncer::deadline`] has passed.

use tokio::time::{Duration, Instant};

use crate::{config::SearchSettings, model::LocationCandidate};

/// A lookup that should be sent now. `generation` identifies the reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupTicket {
    pub generation: u64,
    pub query: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextChange {
    /// Too short: timer cancelled and candidates dropped.
    Cleared,
    /// Timer (re)started; fires at the given instant unless edited again.
    Scheduled(Instant),
}

#[derive(Debug)]
pub struct SearchDebouncer {
    quiet_interval: Duration,
    min_chars: usize,
    text: String,
    deadline: Option<Instant>,
    generation: u64,
    candidates: Vec<LocationCandidate>,
    selected: Option<LocationCandidate>,
}

impl SearchDebouncer {
    pub fn new(settings: &SearchSettings) -> Self {
        Self {
            quiet_interval: settings.quiet_interval(),
            min_chars: settings.min_query_chars,
            text: String::new(),
            deadline: None,
            generation: 0,
            candidates: Vec::new(),
            selected: None,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn candidates(&self) -> &[LocationCandidate] {
        &self.candidates
    }

    pub fn selected(&self) -> Option<&LocationCandidate> {
        self.selected.as_ref()
    }

    fn long_enough(&self, query: &str) -> bool {
        query.chars().count() >= self.min_chars
    }

    /// Every edit restarts the quiet interval (debounce, not throttle).
    ///
    /// Typing also drops the selected candidate: the field no longer names it.
    pub fn on_text_changed(&mut self, text: &str, now: Instant) -> TextChange {
        self.text = text.to_string();
        self.deadline = None;
        self.selected = None;

        if !self.long_enough(self.text.trim()) {
            self.candidates.clear();
            // a lookup already in flight must not repopulate the list
            self.generation += 1;
            return TextChange::Cleared;
        }

        let deadline = now + self.quiet_interval;
        self.deadline = Some(deadline);
        TextChange::Scheduled(deadline)
    }

    /// Quiet interval elapsed: re-read the text and issue at most one lookup.
    ///
    /// Without a pending deadline this is a no-op.
    pub fn on_timer_expired(&mut self) -> Option<LookupTicket> {
        self.deadline.take()?;

        let query = self.text.trim();
        if !self.long_enough(query) {
            return None;
        }

        self.generation += 1;
        Some(LookupTicket { generation: self.generation, query: query.to_string() })
    }

    /// Apply a lookup reply. Returns `false` when it belongs to a superseded lookup.
    pub fn on_lookup_finished(&mut self, generation: u64, candidates: Vec<LocationCandidate>) -> bool {
        if generation != self.generation {
            return false;
        }
        self.candidates = candidates;
        true
    }

    /// Make candidate `index` the selected location.
    ///
    /// The field shows the candidate's display string without scheduling a
    /// new lookup, and the candidate list is hidden.
    pub fn select(&mut self, index: usize) -> Option<LocationCandidate> {
        let candidate = self.candidates.get(index)?.clone();

        self.text = candidate.display_name();
        self.deadline = None;
        self.candidates.clear();
        self.generation += 1;
        self.selected = Some(candidate.clone());

        Some(candidate)
    }

    /// Replace the field text without triggering a lookup.
    pub fn set_text_silently(&mut self, text: &str) {
        self.text = text.to_string();
    }

    /// Forget the selected candidate once another location is being shown.
    pub fn forget_selection(&mut self) {
        self.selected = None;
    }

    /// Reset text, timer, candidates and selection together.
    pub fn clear(&mut self) {
        self.text.clear();
        self.deadline = None;
        self.candidates.clear();
        self.selected = None;
        self.generation += 1;
    }
}
