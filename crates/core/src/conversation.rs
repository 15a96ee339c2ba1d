//! Conversation types and history parsing
//!
//! Front-ends deliver conversation history in several shapes: role+content
//! objects, content-only objects, bare strings, nested arrays, and objects
//! with ad-hoc text keys. All of them are normalized into [`Message`] here,
//! in one place; nothing past this boundary sees a raw shape.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// A single conversation turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Keys checked, in order, when an object has no `content` field
const TEXT_KEYS: &[&str] = &["text", "message", "msg", "content", "body", "data"];

/// Parse raw conversation history into standardized messages.
///
/// Unparseable entries are skipped with a warning rather than failing the
/// request. When a shape carries no role, it is inferred from the entry's
/// position: even indices are user turns, odd indices assistant turns.
pub fn parse_history(raw: &[Value]) -> Vec<Message> {
    let mut messages = Vec::with_capacity(raw.len());

    for (index, value) in raw.iter().enumerate() {
        match parse_single(value, index) {
            Some(message) => messages.push(message),
            None => {
                tracing::warn!(index, "skipping unparseable history entry");
            }
        }
    }

    messages
}

fn parse_single(value: &Value, index: usize) -> Option<Message> {
    match value {
        Value::Object(map) => {
            let content = map
                .get("content")
                .and_then(Value::as_str)
                .map(str::to_string)
                .or_else(|| extract_text(map))?;
            let content = content.trim().to_string();
            if content.is_empty() {
                return None;
            }

            let role = map
                .get("role")
                .and_then(Value::as_str)
                .and_then(parse_role)
                .unwrap_or_else(|| role_for_index(index));
            Some(Message { role, content })
        }
        Value::String(s) => {
            let content = s.trim();
            if content.is_empty() {
                return None;
            }
            Some(Message {
                role: role_for_index(index),
                content: content.to_string(),
            })
        }
        Value::Array(items) => {
            let content = items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.clone()),
                    Value::Null => None,
                    other => Some(other.to_string()),
                })
                .collect::<Vec<_>>()
                .join(" ");
            let content = content.trim();
            if content.is_empty() {
                return None;
            }
            Some(Message {
                role: role_for_index(index),
                content: content.to_string(),
            })
        }
        Value::Null => None,
        other => {
            let content = other.to_string();
            Some(Message {
                role: role_for_index(index),
                content,
            })
        }
    }
}

fn parse_role(raw: &str) -> Option<Role> {
    match raw.to_lowercase().as_str() {
        "user" => Some(Role::User),
        "assistant" | "chatbot" => Some(Role::Assistant),
        _ => None,
    }
}

fn role_for_index(index: usize) -> Role {
    if index % 2 == 0 {
        Role::User
    } else {
        Role::Assistant
    }
}

fn extract_text(map: &serde_json::Map<String, Value>) -> Option<String> {
    for key in TEXT_KEYS {
        if let Some(text) = map.get(*key).and_then(Value::as_str) {
            let text = text.trim();
            if !text.is_empty() {
                return Some(text.to_string());
            }
        }
    }

    // Last resort: concatenate every string value in the object
    let parts: Vec<&str> = map
        .values()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}
