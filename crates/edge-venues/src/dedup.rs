//! Local submission cache.
//!
//! Tracks which client order ids have been sent toward a venue and with what
//! certainty. The rule is conservative: a submission whose outcome is
//! unknown is never re-executed. Definite non-acceptance (reject, throttle,
//! auth failure) releases the id so a retry of the same command can proceed.

use dashmap::DashMap;

use edge_core::ClientOrderId;

use crate::error::VenueError;

/// Certainty about a submitted client order id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionState {
    /// Sent, outcome not yet known (or never will be).
    InDoubt,
    /// Venue confirmed acceptance.
    Confirmed,
}

/// In-memory ledger of submissions keyed by client order id.
#[derive(Debug, Default)]
pub struct SubmissionCache {
    entries: DashMap<ClientOrderId, SubmissionState>,
}

impl SubmissionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record intent to submit. Returns `false` if the id is already
    /// tracked, meaning a submission must NOT be sent.
    pub fn begin(&self, id: &ClientOrderId) -> bool {
        use dashmap::mapref::entry::Entry;
        match self.entries.entry(id.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(v) => {
                v.insert(SubmissionState::InDoubt);
                true
            }
        }
    }

    /// Venue accepted the order.
    pub fn confirm(&self, id: &ClientOrderId) {
        self.entries.insert(id.clone(), SubmissionState::Confirmed);
    }

    /// Venue definitively did not accept the order; the id may be reused.
    pub fn release(&self, id: &ClientOrderId) {
        self.entries.remove(id);
    }

    /// Resolve a failed submission attempt.
    ///
    /// Definite non-acceptance always releases the id so a bounded retry can
    /// resend. Transient failures are ambiguous (a timeout after send may
    /// have executed): `venue_dedups` marks venues that deduplicate on the
    /// client order id natively, for which a resend is still safe; without
    /// native dedup the id stays held and a resend attempt is refused.
    pub fn settle(&self, id: &ClientOrderId, error: &VenueError, venue_dedups: bool) {
        if error.is_definitely_not_accepted() || venue_dedups {
            self.release(id);
        }
    }

    pub fn state(&self, id: &ClientOrderId) -> Option<SubmissionState> {
        self.entries.get(id).map(|e| *e.value())
    }
}
