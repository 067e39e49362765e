//! Plain-text rendering of the selected view.
//!
//! The tab bar mirrors the view state: a single "Connecting..." or
//! "Connection Failed" tab, or one tab per connected endpoint with the active
//! one starred. Only the active panel body is drawn.

use std::fmt::Write as _;

use crate::chat::{ChatState, Direction};
use crate::socket::{InboundMessage, ReadyState};
use crate::status::{Endpoint, Statuses};
use crate::view::ViewState;

const RULE_WIDTH: usize = 60;

/// Something that can draw itself as a tab body.
pub trait Panel {
    fn render(&self, out: &mut String);
}

/// Chat tab body, wired to the chat session state.
#[derive(Debug, Clone, Copy)]
pub struct ChatPanel<'a> {
    pub chat: &'a ChatState,
    pub last_message: Option<&'a InboundMessage>,
    pub ready_state: ReadyState,
}

impl Panel for ChatPanel<'_> {
    fn render(&self, out: &mut String) {
        let _ = writeln!(out, "user: {}    session: {}", self.chat.username(), self.ready_state);

        let conversations = self.chat.conversations();
        if conversations.is_empty() {
            out.push_str("no conversations yet\n");
        } else {
            out.push_str("conversations:\n");
            for row in conversations {
                let marker = if row.active { '*' } else { ' ' };
                let _ = writeln!(
                    out,
                    "  {marker} {}  {}",
                    row.robot_name,
                    row.preview.as_deref().unwrap_or("")
                );
            }
        }

        if let Some(chat) = self.chat.current() {
            let _ = writeln!(out, "--- {} ---", chat.robot_name);
            for message in &chat.messages {
                let arrow = match message.direction {
                    Direction::Incoming => "<",
                    Direction::Outgoing => ">",
                };
                let _ = writeln!(out, "{arrow} {}: {}", message.sender, message.text);
            }
        }

        if let Some(last) = self.last_message {
            let _ = writeln!(out, "last received: {}", last.text);
        }
    }
}

/// Goal and map tabs: rendered elsewhere, so only their source is shown.
#[derive(Debug, Clone, Copy)]
pub struct RemotePanel<'a> {
    pub endpoint: Endpoint,
    pub url: &'a str,
}

impl Panel for RemotePanel<'_> {
    fn render(&self, out: &mut String) {
        let _ = writeln!(out, "{} streaming from {}", self.endpoint.tab_label(), self.url);
    }
}

/// Everything one frame of output needs.
pub struct RenderContext<'a> {
    pub statuses: Statuses,
    pub base_url: &'a str,
    pub active: Option<Endpoint>,
    pub chat: ChatPanel<'a>,
    pub goal: RemotePanel<'a>,
    pub map: RemotePanel<'a>,
}

impl RenderContext<'_> {
    fn panel(&self, endpoint: Endpoint) -> &dyn Panel {
        match endpoint {
            Endpoint::Chat => &self.chat,
            Endpoint::Goal => &self.goal,
            Endpoint::Map => &self.map,
        }
    }
}

/// Render `view` into a block of text.
#[must_use]
pub fn render(view: &ViewState, ctx: &RenderContext<'_>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "[{}]", ctx.statuses);

    match view {
        ViewState::Loading => {
            out.push_str("[ Connecting... ]\n");
            push_rule(&mut out);
            out.push_str("Connecting...\n");
        }
        ViewState::Failed => {
            out.push_str("[ Connection Failed ]\n");
            push_rule(&mut out);
            out.push_str("Connection Failed!\n");
            out.push_str("WebSocket URLs:\n");
            let _ = writeln!(out, "{}", ctx.base_url);
        }
        ViewState::Panels(panels) => {
            let tabs: Vec<String> = panels
                .iter()
                .map(|endpoint| {
                    if ctx.active == Some(endpoint) {
                        format!("[*{}*]", endpoint.tab_label())
                    } else {
                        format!("[ {} ]", endpoint.tab_label())
                    }
                })
                .collect();
            out.push_str(&tabs.join(" "));
            out.push('\n');
            push_rule(&mut out);
            if let Some(active) = ctx.active.filter(|e| panels.contains(*e)) {
                ctx.panel(active).render(&mut out);
            }
        }
    }

    out
}

fn push_rule(out: &mut String) {
    out.push_str(&"-".repeat(RULE_WIDTH));
    out.push('\n');
}

#[cfg(test)]
#[path = "render_test.rs"]
mod tests;
