//! Event source configuration.

use dl1dh_core::TelescopeId;
use std::collections::BTreeSet;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration of an event source.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SourceConfig {
    /// Telescopes to keep. Empty keeps all.
    pub allowed_tels: BTreeSet<TelescopeId>,
    /// Stop after this many yielded events.
    pub max_events: Option<usize>,
}

impl SourceConfig {
    /// Restrict events to the given telescopes.
    #[must_use]
    pub fn with_allowed_tels<I: IntoIterator<Item = TelescopeId>>(mut self, tels: I) -> Self {
        self.allowed_tels = tels.into_iter().collect();
        self
    }

    /// Limit the number of yielded events.
    #[must_use]
    pub fn with_max_events(mut self, max_events: usize) -> Self {
        self.max_events = Some(max_events);
        self
    }

    /// Applies the telescope filter.
    ///
    /// Returns `None` when the filter is active and none of `tels_with_data`
    /// is allowed; the event is then dropped.
    #[must_use]
    pub fn select(&self, tels_with_data: BTreeSet<TelescopeId>) -> Option<BTreeSet<TelescopeId>> {
        if self.allowed_tels.is_empty() {
            return Some(tels_with_data);
        }
        let selected: BTreeSet<_> = tels_with_data
            .intersection(&self.allowed_tels)
            .copied()
            .collect();
        (!selected.is_empty()).then_some(selected)
    }
}
