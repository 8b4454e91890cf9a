//! # Event Filtering
//!
//! The router is generic over the event type; it only needs to know which
//! [`EventKind`] an event belongs to.

use walletkit_types::EventKind;

/// An event the router can fan out.
pub trait RoutedEvent: Clone + Send + Sync + 'static {
    /// Kind used for filtering and metrics.
    fn kind(&self) -> EventKind;
}

/// Selects events by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    /// Kinds to include. Empty means all kinds.
    pub kinds: Vec<EventKind>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific kinds.
    #[must_use]
    pub fn kinds(kinds: Vec<EventKind>) -> Self {
        Self { kinds }
    }

    /// Create a filter for the three approve/reject request kinds.
    #[must_use]
    pub fn requests() -> Self {
        Self::kinds(
            EventKind::ALL
                .into_iter()
                .filter(EventKind::is_request)
                .collect(),
        )
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches<E: RoutedEvent>(&self, event: &E) -> bool {
        self.accepts(event.kind())
    }

    /// Check if a kind passes this filter.
    #[must_use]
    pub fn accepts(&self, kind: EventKind) -> bool {
        self.kinds.is_empty() || self.kinds.contains(&kind)
    }
}
