//! The tabbed viewer: owns the endpoint sockets, the poller, and chat state.
//!
//! LIFECYCLE
//! =========
//! 1. `mount` opens one probe socket per endpoint plus a separate chat
//!    session socket, then starts the poller.
//! 2. `run` applies terminal commands and redraws on any status change. The
//!    chat session's own state changes and inbound messages redraw too.
//! 3. `unmount` stops the poller first, then closes every socket.
//!
//! The chat status probe and the chat session are two connections to
//! `/chat`: the probe only answers "is the endpoint up", the session carries
//! the conversation.

use std::future::Future;
use std::io::Write;
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use crate::chat::ChatState;
use crate::config::{ConfigError, ViewerConfig};
use crate::input::{Command, parse_command};
use crate::poller::{Poller, ProbeSet};
use crate::render::{ChatPanel, RemotePanel, RenderContext, render};
use crate::socket::{InboundMessage, ReadyProbe, SocketError, SocketHandle};
use crate::status::{Endpoint, Statuses};
use crate::view::{ViewState, reconcile_active_tab, select_view};

// =============================================================================
// ERRORS / OUTCOME
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ViewerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("chat send failed: {0}")]
    Socket(#[from] SocketError),
    #[error("chat payload encode failed: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("terminal I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// What the run loop should do after a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Redraw,
    /// Show a one-line message without changing state.
    Notice(String),
    Quit,
}

// =============================================================================
// VIEWER
// =============================================================================

struct EndpointSockets {
    chat: Arc<SocketHandle>,
    goal: Arc<SocketHandle>,
    map: Arc<SocketHandle>,
}

pub struct Viewer {
    config: ViewerConfig,
    probes: EndpointSockets,
    chat_session: SocketHandle,
    chat_inbound: broadcast::Receiver<InboundMessage>,
    poller: Poller,
    chat: ChatState,
    active_tab: Option<Endpoint>,
}

impl Viewer {
    /// Open all sockets and start polling. Must be called inside a runtime.
    #[must_use]
    pub fn mount(config: ViewerConfig) -> Self {
        info!(base_url = %config.base_url, poll_ms = config.poll_interval.as_millis(), "mounting viewer");

        let open = |endpoint: Endpoint| Arc::new(SocketHandle::open(config.endpoint_url(endpoint), config.reconnect));
        let probes = EndpointSockets {
            chat: open(Endpoint::Chat),
            goal: open(Endpoint::Goal),
            map: open(Endpoint::Map),
        };
        let chat_session = SocketHandle::open(config.endpoint_url(Endpoint::Chat), config.reconnect);
        let chat_inbound = chat_session.subscribe();

        let poller = Poller::spawn(
            ProbeSet {
                chat: probes.chat.clone(),
                goal: probes.goal.clone(),
                map: probes.map.clone(),
            },
            config.poll_interval,
        );

        Self {
            chat: ChatState::new(config.username.clone()),
            config,
            probes,
            chat_session,
            chat_inbound,
            poller,
            active_tab: None,
        }
    }

    #[must_use]
    pub fn statuses(&self) -> Statuses {
        self.poller.current()
    }

    #[must_use]
    pub fn view(&self) -> ViewState {
        select_view(&self.statuses())
    }

    #[must_use]
    pub fn subscribe_statuses(&self) -> watch::Receiver<Statuses> {
        self.poller.subscribe()
    }

    #[must_use]
    pub fn active_tab(&self) -> Option<Endpoint> {
        reconcile_active_tab(self.active_tab, &self.view())
    }

    #[must_use]
    pub fn chat(&self) -> &ChatState {
        &self.chat
    }

    /// Subscribe to the chat session's inbound messages.
    #[must_use]
    pub fn subscribe_chat(&self) -> broadcast::Receiver<InboundMessage> {
        self.chat_session.subscribe()
    }

    /// Re-derive the active tab after a status change.
    pub fn refresh(&mut self) {
        let view = self.view();
        let active = reconcile_active_tab(self.active_tab, &view);
        if active != self.active_tab {
            debug!(from = ?self.active_tab, to = ?active, "active tab changed");
        }
        self.active_tab = active;
    }

    /// Apply a message received on the chat session.
    pub fn ingest(&mut self, message: &InboundMessage) {
        if !self.chat.receive(message) {
            debug!(seq = message.seq, "non-chat message on chat session");
        }
    }

    pub fn handle_command(&mut self, command: Command) -> Result<Outcome, ViewerError> {
        match command {
            Command::Empty => Ok(Outcome::Redraw),
            Command::Quit => Ok(Outcome::Quit),
            Command::SelectTab(endpoint) => match self.view() {
                ViewState::Panels(panels) if panels.contains(endpoint) => {
                    self.active_tab = Some(endpoint);
                    Ok(Outcome::Redraw)
                }
                _ => Ok(Outcome::Notice(format!("{} is not connected", endpoint.tab_label()))),
            },
            Command::SetUsername(name) => {
                info!(username = %name, "username changed");
                self.chat.set_username(name);
                Ok(Outcome::Redraw)
            }
            Command::Focus(robot) => {
                if self.chat.focus(&robot) {
                    Ok(Outcome::Redraw)
                } else {
                    Ok(Outcome::Notice(format!("no conversation with {robot}")))
                }
            }
            Command::Say(text) => {
                let chat_visible = matches!(self.view(), ViewState::Panels(ref p) if p.contains(Endpoint::Chat));
                if !chat_visible {
                    return Ok(Outcome::Notice("chat is not connected".to_owned()));
                }
                let payload = self.chat.outbound_payload(&text)?;
                self.chat_session.sender().send(payload)?;
                if self.chat.record_outgoing(&text) {
                    Ok(Outcome::Redraw)
                } else {
                    Ok(Outcome::Notice("no conversation focused; message sent".to_owned()))
                }
            }
        }
    }

    /// Render the current view as text.
    #[must_use]
    pub fn render(&self) -> String {
        let statuses = self.statuses();
        let view = select_view(&statuses);
        let last_message = self.chat_session.last_message();
        let ctx = RenderContext {
            statuses,
            base_url: &self.config.base_url,
            active: reconcile_active_tab(self.active_tab, &view),
            chat: ChatPanel {
                chat: &self.chat,
                last_message: last_message.as_ref(),
                ready_state: self.chat_session.ready_state(),
            },
            goal: RemotePanel { endpoint: Endpoint::Goal, url: self.probes.goal.url() },
            map: RemotePanel { endpoint: Endpoint::Map, url: self.probes.map.url() },
        };
        render(&view, &ctx)
    }

    /// Drive the viewer until `/quit`, `shutdown` resolves, or the poller
    /// stops. Unmounts before returning.
    pub async fn run<R, W, S>(mut self, input: R, out: &mut W, shutdown: S) -> Result<(), ViewerError>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
        S: Future<Output = ()>,
    {
        let mut lines = input.lines();
        let mut input_open = true;
        let mut chat_open = true;
        let mut statuses = self.poller.subscribe();
        let mut session_state = self.chat_session.watch_ready_state();
        let mut session_open = true;
        tokio::pin!(shutdown);

        let result = match self.draw(out) {
            Err(e) => Err(e),
            Ok(()) => loop {
                tokio::select! {
                    () = &mut shutdown => break Ok(()),
                    changed = statuses.changed() => {
                        if changed.is_err() {
                            break Ok(());
                        }
                        let current = *statuses.borrow_and_update();
                        info!(statuses = %current, "endpoint statuses updated");
                        self.refresh();
                        if let Err(e) = self.draw(out) {
                            break Err(e);
                        }
                    }
                    changed = session_state.changed(), if session_open => {
                        if changed.is_err() {
                            session_open = false;
                        } else {
                            let state = *session_state.borrow_and_update();
                            debug!(%state, "chat session state changed");
                            if let Err(e) = self.draw(out) {
                                break Err(e);
                            }
                        }
                    }
                    inbound = self.chat_inbound.recv(), if chat_open => match inbound {
                        Ok(message) => {
                            self.ingest(&message);
                            if let Err(e) = self.draw(out) {
                                break Err(e);
                            }
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped, "chat session lagged; messages dropped");
                        }
                        Err(RecvError::Closed) => chat_open = false,
                    },
                    line = lines.next_line(), if input_open => match line {
                        Ok(Some(line)) => match self.apply_line(&line, out) {
                            Ok(true) => {}
                            Ok(false) => break Ok(()),
                            Err(e) => break Err(e),
                        },
                        Ok(None) => {
                            debug!("input closed");
                            input_open = false;
                        }
                        Err(e) => break Err(ViewerError::Io(e)),
                    },
                }
            },
        };

        self.unmount().await;
        result
    }

    /// Returns `false` when the viewer should stop.
    fn apply_line<W: Write>(&mut self, line: &str, out: &mut W) -> Result<bool, ViewerError> {
        let outcome = match parse_command(line) {
            Ok(command) => self
                .handle_command(command)
                .unwrap_or_else(|e| Outcome::Notice(e.to_string())),
            Err(e) => Outcome::Notice(e.to_string()),
        };
        match outcome {
            Outcome::Redraw => self.draw(out)?,
            Outcome::Notice(notice) => {
                writeln!(out, "! {notice}")?;
                out.flush()?;
            }
            Outcome::Quit => return Ok(false),
        }
        Ok(true)
    }

    fn draw<W: Write>(&self, out: &mut W) -> Result<(), ViewerError> {
        writeln!(out, "{}", self.render())?;
        out.flush()?;
        Ok(())
    }

    /// Stop polling, then close every socket.
    pub async fn unmount(self) {
        let Self { probes, chat_session, poller, .. } = self;
        poller.shutdown().await;

        chat_session.close().await;
        for (endpoint, handle) in [
            (Endpoint::Chat, probes.chat),
            (Endpoint::Goal, probes.goal),
            (Endpoint::Map, probes.map),
        ] {
            match Arc::try_unwrap(handle) {
                Ok(handle) => handle.close().await,
                Err(shared) => {
                    warn!(%endpoint, "probe socket still shared at unmount; aborting");
                    drop(shared);
                }
            }
        }
        info!("viewer unmounted");
    }
}

#[cfg(test)]
#[path = "viewer_test.rs"]
mod tests;
