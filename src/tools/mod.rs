//! 工具模式转换模块 — 将工具定义、调用与结果转换为各厂商格式
//!
//! Tool schema translation. A [`ToolsDialect`] knows how one provider family
//! declares tools, how recorded tool calls and tool results are written back
//! into the conversation, and how tool calls are read out of model output.
//!
//! | Translator | Used when |
//! |------------|-----------|
//! | [`NativeTools`] | the model supports function calling natively |
//! | [`XmlTools`] | tools must be explained in the system prompt and invoked through XML |

pub mod native;
pub mod xml;

use serde_json::{json, Map, Value};
use std::collections::HashSet;

use crate::error::{Error, ErrorContext};
use crate::types::{Message, ToolCall, ToolDefinition, ToolResult};

pub use native::{FunctionStyle, NativeTools};
pub use xml::XmlTools;

/// Provider-specific tool wire format.
pub trait ToolsDialect: Send + Sync + std::fmt::Debug {
    /// Tool definitions this translator was built from.
    fn tools(&self) -> &[ToolDefinition];

    /// Whether tools travel as structured request fields rather than prompt text.
    fn is_native(&self) -> bool;

    /// Tool declarations in the provider's format.
    fn translated_tools(&self) -> crate::Result<Value>;

    /// Extra system prompt text; empty when the provider calls tools natively.
    fn instructions(&self) -> String;

    /// Render a `tool_call` message as assistant content.
    fn from_raw_tool_call(&self, message: &Message) -> crate::Result<String>;

    /// Render a `tool` message as user content.
    fn from_raw_tool(&self, message: &Message) -> crate::Result<String>;

    /// Read tool calls out of model output. Output without calls yields none.
    fn parse_tool_calls(&self, output: &str) -> Vec<ToolCall>;
}

/// Pick the translator for a model.
pub fn create_tools_dialect(
    tools: &[ToolDefinition],
    native: bool,
    style: FunctionStyle,
) -> Box<dyn ToolsDialect> {
    if native {
        Box::new(NativeTools::new(tools.to_vec(), style))
    } else {
        Box::new(XmlTools::new(tools.to_vec()))
    }
}

/// Reject definitions no provider would accept: empty or duplicate tool
/// names, and empty or duplicate parameter names.
pub fn validate_tools(tools: &[ToolDefinition]) -> crate::Result<()> {
    let mut names = HashSet::new();
    for (i, tool) in tools.iter().enumerate() {
        if tool.name.trim().is_empty() {
            return Err(malformed("tool name must not be empty", format!("tools[{}].name", i)));
        }
        if !names.insert(tool.name.as_str()) {
            return Err(malformed(
                &format!("duplicate tool name '{}'", tool.name),
                format!("tools[{}].name", i),
            ));
        }
        let mut params = HashSet::new();
        for (j, param) in tool.parameters.iter().enumerate() {
            let field = format!("tools[{}].parameters[{}].name", i, j);
            if param.name.trim().is_empty() {
                return Err(malformed("parameter name must not be empty", field));
            }
            if !params.insert(param.name.as_str()) {
                return Err(malformed(
                    &format!("duplicate parameter '{}' in tool '{}'", param.name, tool.name),
                    field,
                ));
            }
        }
    }
    Ok(())
}

fn malformed(msg: &str, field: String) -> Error {
    Error::validation_with_context(
        msg,
        ErrorContext::new()
            .with_field_path(field)
            .with_source("tool_validator"),
    )
}

/// JSON schema object describing a tool's parameters.
pub fn parameters_schema(tool: &ToolDefinition) -> Value {
    let properties: Map<String, Value> = tool
        .parameters
        .iter()
        .map(|p| {
            let mut prop = Map::new();
            prop.insert("type".into(), Value::String(p.param_type.clone()));
            if !p.description.is_empty() {
                prop.insert("description".into(), Value::String(p.description.clone()));
            }
            if let Some(values) = &p.enum_values {
                prop.insert("enum".into(), json!(values));
            }
            if let Some(item_type) = &p.item_type {
                prop.insert("items".into(), json!({ "type": item_type }));
            }
            (p.name.clone(), Value::Object(prop))
        })
        .collect();

    let required: Vec<&str> = tool.required_parameters().map(|p| p.name.as_str()).collect();

    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

/// Id for a tool call the provider returned without one.
pub fn generate_call_id() -> String {
    format!("tool_{}", uuid::Uuid::new_v4().simple())
}

pub(crate) fn require_tool_calls(message: &Message) -> crate::Result<&[ToolCall]> {
    if message.tool_calls.is_empty() {
        return Err(Error::validation_with_context(
            "tool_call message carries no tool calls",
            ErrorContext::new()
                .with_field_path("message.tool_calls")
                .with_source("tools_dialect"),
        ));
    }
    Ok(&message.tool_calls)
}

pub(crate) fn require_tool_result(message: &Message) -> crate::Result<&ToolResult> {
    message.tool_result.as_ref().ok_or_else(|| {
        Error::validation_with_context(
            "tool message carries no tool result",
            ErrorContext::new()
                .with_field_path("message.tool_result")
                .with_source("tools_dialect"),
        )
    })
}
