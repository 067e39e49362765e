//! Tabbed viewer for a robot backend's chat, goal, and map WebSocket
//! endpoints.
//!
//! The viewer polls each endpoint's socket readiness once a second and
//! derives what to show from the three statuses: a loading indicator, a
//! failure notice, or one tab per connected endpoint.

pub mod chat;
pub mod config;
pub mod input;
pub mod poller;
pub mod render;
pub mod socket;
pub mod status;
pub mod view;
pub mod viewer;

#[cfg(test)]
mod test_helpers;
