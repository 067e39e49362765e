//! View selection: maps endpoint statuses to what the viewer shows.
//!
//! Pure and deterministic so the viewer can recompute it on every status
//! change and tests can cover every status combination.

use crate::status::{Endpoint, Status, Statuses};

/// Ordered subset of endpoints whose panels are shown.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PanelSet(Vec<Endpoint>);

impl PanelSet {
    #[must_use]
    pub fn contains(&self, endpoint: Endpoint) -> bool {
        self.0.contains(&endpoint)
    }

    #[must_use]
    pub fn first(&self) -> Option<Endpoint> {
        self.0.first().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Endpoint> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Endpoint> for PanelSet {
    fn from_iter<I: IntoIterator<Item = Endpoint>>(iter: I) -> Self {
        let mut endpoints: Vec<Endpoint> = iter.into_iter().collect();
        endpoints.sort_unstable();
        endpoints.dedup();
        Self(endpoints)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewState {
    /// At least one endpoint has not been polled yet.
    Loading,
    /// Every endpoint is disconnected.
    Failed,
    /// One tab per connected endpoint; never empty.
    Panels(PanelSet),
}

/// Select the view for the given statuses.
///
/// Waiting takes precedence over everything; failure requires all three
/// endpoints to be disconnected.
#[must_use]
pub fn select_view(statuses: &Statuses) -> ViewState {
    if statuses.iter().any(|(_, s)| s == Status::Waiting) {
        return ViewState::Loading;
    }
    let connected: PanelSet = statuses
        .iter()
        .filter(|(_, s)| *s == Status::Connected)
        .map(|(e, _)| e)
        .collect();
    if connected.is_empty() {
        ViewState::Failed
    } else {
        ViewState::Panels(connected)
    }
}

/// Keep the selected tab while it stays visible, otherwise fall back to the
/// first visible tab.
#[must_use]
pub fn reconcile_active_tab(active: Option<Endpoint>, view: &ViewState) -> Option<Endpoint> {
    match view {
        ViewState::Panels(panels) => match active {
            Some(endpoint) if panels.contains(endpoint) => Some(endpoint),
            _ => panels.first(),
        },
        ViewState::Loading | ViewState::Failed => None,
    }
}

#[cfg(test)]
#[path = "view_test.rs"]
mod tests;
