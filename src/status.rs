//! Endpoints and their derived connection status.

use std::fmt;
use std::str::FromStr;

use crate::socket::ReadyState;

/// One of the three backend services the viewer probes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Endpoint {
    Chat,
    Goal,
    Map,
}

impl Endpoint {
    /// Display order for tabs.
    pub const ALL: [Endpoint; 3] = [Endpoint::Chat, Endpoint::Goal, Endpoint::Map];

    /// Path suffix appended to the base address.
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::Chat => "/chat",
            Self::Goal => "/goal",
            Self::Map => "/map",
        }
    }

    #[must_use]
    pub fn tab_label(self) -> &'static str {
        match self {
            Self::Chat => "Robot Chat",
            Self::Goal => "Goal Viewer",
            Self::Map => "Map Viewer",
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Goal => "goal",
            Self::Map => "map",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown endpoint `{0}` (expected chat, goal, or map)")]
pub struct UnknownEndpoint(pub String);

impl FromStr for Endpoint {
    type Err = UnknownEndpoint;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "chat" => Ok(Self::Chat),
            "goal" => Ok(Self::Goal),
            "map" => Ok(Self::Map),
            _ => Err(UnknownEndpoint(raw.to_owned())),
        }
    }
}

/// Derived readiness of an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    /// Not yet resolved by a poll tick.
    #[default]
    Waiting,
    Connected,
    Disconnected,
}

impl Status {
    /// Any state other than `Open` counts as disconnected once polled.
    #[must_use]
    pub fn from_ready_state(state: ReadyState) -> Self {
        if state.is_open() { Self::Connected } else { Self::Disconnected }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Waiting => "wait",
            Self::Connected => "on",
            Self::Disconnected => "off",
        };
        f.write_str(label)
    }
}

/// Status of all three endpoints at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Statuses {
    pub chat: Status,
    pub goal: Status,
    pub map: Status,
}

impl Statuses {
    #[must_use]
    pub const fn new(chat: Status, goal: Status, map: Status) -> Self {
        Self { chat, goal, map }
    }

    /// Mount-time value: every endpoint waiting.
    #[must_use]
    pub const fn waiting() -> Self {
        Self::new(Status::Waiting, Status::Waiting, Status::Waiting)
    }

    #[must_use]
    pub fn get(&self, endpoint: Endpoint) -> Status {
        match endpoint {
            Endpoint::Chat => self.chat,
            Endpoint::Goal => self.goal,
            Endpoint::Map => self.map,
        }
    }

    /// Build from one ready state per endpoint.
    pub fn from_ready_states(mut ready: impl FnMut(Endpoint) -> ReadyState) -> Self {
        Self {
            chat: Status::from_ready_state(ready(Endpoint::Chat)),
            goal: Status::from_ready_state(ready(Endpoint::Goal)),
            map: Status::from_ready_state(ready(Endpoint::Map)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Endpoint, Status)> + '_ {
        Endpoint::ALL.into_iter().map(|e| (e, self.get(e)))
    }
}

impl fmt::Display for Statuses {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chat={} goal={} map={}", self.chat, self.goal, self.map)
    }
}

#[cfg(test)]
#[path = "status_test.rs"]
mod tests;
