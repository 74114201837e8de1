//! Abstract prompt: the input of every dialect

use serde::{Deserialize, Serialize};
use std::borrow::Cow;

use super::message::{Message, MessageRole};
use super::tool::ToolDefinition;
use crate::error::{Error, ErrorContext};

/// Provider-agnostic conversation handed to a dialect.
///
/// Messages are kept in conversation order. A top-level `system`
/// instruction is an alternative to a leading system message; a prompt
/// may carry one or the other, not both.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Prompt {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
}

impl Prompt {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            system: None,
            messages,
            tools: Vec::new(),
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Parse and validate a prompt from JSON.
    pub fn from_json(raw: &str) -> crate::Result<Self> {
        let prompt: Prompt = serde_json::from_str(raw)?;
        prompt.validate()?;
        Ok(prompt)
    }

    /// Check the structural contract every dialect relies on.
    pub fn validate(&self) -> crate::Result<()> {
        for (i, msg) in self.messages.iter().enumerate() {
            let field = format!("prompt.messages[{}]", i);
            match msg.role {
                MessageRole::System if i > 0 => {
                    return Err(contract_violation(
                        "system message must lead the conversation",
                        field,
                    ));
                }
                MessageRole::System if self.system.is_some() => {
                    return Err(contract_violation(
                        "prompt has both a top-level system instruction and a system message",
                        field,
                    ));
                }
                MessageRole::ToolCall if msg.tool_calls.is_empty() => {
                    return Err(contract_violation(
                        "tool_call message carries no tool calls",
                        format!("{}.tool_calls", field),
                    ));
                }
                MessageRole::Tool if msg.tool_result.is_none() => {
                    return Err(contract_violation(
                        "tool message carries no tool result",
                        format!("{}.tool_result", field),
                    ));
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Messages in conversation order with the top-level system instruction,
    /// if any, materialized as the leading system message.
    pub fn conversation(&self) -> Cow<'_, [Message]> {
        match &self.system {
            Some(system) => {
                let mut messages = Vec::with_capacity(self.messages.len() + 1);
                messages.push(Message::system(system.clone()));
                messages.extend(self.messages.iter().cloned());
                Cow::Owned(messages)
            }
            None => Cow::Borrowed(&self.messages),
        }
    }

    pub fn has_tools(&self) -> bool {
        !self.tools.is_empty()
    }
}

fn contract_violation(msg: &str, field: String) -> Error {
    Error::validation_with_context(
        msg,
        ErrorContext::new()
            .with_field_path(field)
            .with_source("prompt_validator"),
    )
}
