//! Chat panel state: conversations with robots, the focused chat, and the
//! local username.
//!
//! Inbound chat traffic is JSON `{"sender": .., "message": ..}` (optionally
//! with `profileImagePath`). Anything else is not a chat message; the viewer
//! still shows it as the last received message.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::socket::InboundMessage;

const PREVIEW_CHARS: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Incoming,
    Outgoing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: Uuid,
    pub sender: String,
    pub text: String,
    pub direction: Direction,
}

/// One conversation with a robot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chat {
    pub robot_name: String,
    pub profile_image_path: Option<String>,
    pub messages: Vec<ChatMessage>,
}

impl Chat {
    fn new(robot_name: &str) -> Self {
        Self { robot_name: robot_name.to_owned(), profile_image_path: None, messages: Vec::new() }
    }
}

/// Row in the conversation list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationSummary {
    pub robot_name: String,
    pub preview: Option<String>,
    pub active: bool,
}

#[derive(Debug, Deserialize)]
struct InboundChat {
    sender: String,
    message: String,
    #[serde(default, alias = "profileImagePath")]
    profile_image_path: Option<String>,
}

#[derive(Debug, Serialize)]
struct OutboundChat<'a> {
    username: &'a str,
    message: &'a str,
}

#[derive(Debug, Clone, Default)]
pub struct ChatState {
    chats: Vec<Chat>,
    current: Option<usize>,
    username: String,
}

impl ChatState {
    #[must_use]
    pub fn new(username: impl Into<String>) -> Self {
        Self { chats: Vec::new(), current: None, username: username.into() }
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn set_username(&mut self, username: impl Into<String>) {
        self.username = username.into();
    }

    #[must_use]
    pub fn chats(&self) -> &[Chat] {
        &self.chats
    }

    #[must_use]
    pub fn chat(&self, robot_name: &str) -> Option<&Chat> {
        self.chats.iter().find(|c| c.robot_name == robot_name)
    }

    /// The focused conversation, if any.
    #[must_use]
    pub fn current(&self) -> Option<&Chat> {
        self.current.and_then(|i| self.chats.get(i))
    }

    /// Focus the chat with `robot_name`. Returns `false` if no such chat.
    pub fn focus(&mut self, robot_name: &str) -> bool {
        match self.chats.iter().position(|c| c.robot_name == robot_name) {
            Some(index) => {
                self.current = Some(index);
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn conversations(&self) -> Vec<ConversationSummary> {
        self.chats
            .iter()
            .enumerate()
            .map(|(i, chat)| ConversationSummary {
                robot_name: chat.robot_name.clone(),
                preview: chat.messages.last().map(|m| preview(&m.text)),
                active: self.current == Some(i),
            })
            .collect()
    }

    /// Apply an inbound socket message. Returns `true` if it was chat traffic.
    ///
    /// The first chat seen gets focus so there is always something to show.
    pub fn receive(&mut self, inbound: &InboundMessage) -> bool {
        let Ok(parsed) = serde_json::from_str::<InboundChat>(&inbound.text) else {
            return false;
        };
        let index = self.ensure_chat(&parsed.sender);
        let chat = &mut self.chats[index];
        if parsed.profile_image_path.is_some() {
            chat.profile_image_path = parsed.profile_image_path;
        }
        chat.messages.push(ChatMessage {
            id: Uuid::new_v4(),
            sender: parsed.sender,
            text: parsed.message,
            direction: Direction::Incoming,
        });
        if self.current.is_none() {
            self.current = Some(index);
        }
        true
    }

    /// Record a message the local user sent to the focused chat. Returns
    /// `false` when no chat is focused and nothing was recorded.
    pub fn record_outgoing(&mut self, text: &str) -> bool {
        let Some(index) = self.current else {
            return false;
        };
        let sender = self.username.clone();
        self.chats[index].messages.push(ChatMessage {
            id: Uuid::new_v4(),
            sender,
            text: text.to_owned(),
            direction: Direction::Outgoing,
        });
        true
    }

    /// Wire payload for a user message.
    pub fn outbound_payload(&self, text: &str) -> Result<String, serde_json::Error> {
        serde_json::to_string(&OutboundChat { username: &self.username, message: text })
    }

    fn ensure_chat(&mut self, robot_name: &str) -> usize {
        if let Some(index) = self.chats.iter().position(|c| c.robot_name == robot_name) {
            return index;
        }
        self.chats.push(Chat::new(robot_name));
        self.chats.len() - 1
    }
}

fn preview(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() { format!("{head}...") } else { head }
}

#[cfg(test)]
#[path = "chat_test.rs"]
mod tests;
