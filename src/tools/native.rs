//! Native function calling: tools travel as structured request fields.

use serde_json::{json, Value};

use super::{
    generate_call_id, parameters_schema, require_tool_calls, require_tool_result, validate_tools,
    ToolsDialect,
};
use crate::types::{Message, ToolCall, ToolDefinition};

/// Shape of a native tool declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionStyle {
    /// `{"type": "function", "function": {"name", "description", "parameters"}}`
    OpenAi,
    /// `{"name", "description", "input_schema"}`
    Anthropic,
}

#[derive(Debug, Clone)]
pub struct NativeTools {
    tools: Vec<ToolDefinition>,
    style: FunctionStyle,
}

impl NativeTools {
    pub fn new(tools: Vec<ToolDefinition>, style: FunctionStyle) -> Self {
        Self { tools, style }
    }

    fn declaration(&self, tool: &ToolDefinition) -> Value {
        match self.style {
            FunctionStyle::OpenAi => json!({
                "type": "function",
                "function": {
                    "name": tool.name,
                    "description": tool.description,
                    "parameters": parameters_schema(tool),
                }
            }),
            FunctionStyle::Anthropic => json!({
                "name": tool.name,
                "description": tool.description,
                "input_schema": parameters_schema(tool),
            }),
        }
    }
}

impl ToolsDialect for NativeTools {
    fn tools(&self) -> &[ToolDefinition] {
        &self.tools
    }

    fn is_native(&self) -> bool {
        true
    }

    fn translated_tools(&self) -> crate::Result<Value> {
        validate_tools(&self.tools)?;
        Ok(Value::Array(
            self.tools.iter().map(|t| self.declaration(t)).collect(),
        ))
    }

    fn instructions(&self) -> String {
        String::new()
    }

    fn from_raw_tool_call(&self, message: &Message) -> crate::Result<String> {
        let calls = require_tool_calls(message)?;
        let rendered = match calls {
            [single] => serde_json::to_string(single)?,
            many => serde_json::to_string(many)?,
        };
        Ok(rendered)
    }

    fn from_raw_tool(&self, message: &Message) -> crate::Result<String> {
        let result = require_tool_result(message)?;
        let mut rendered = json!({
            "tool_call_id": result.call_id,
            "content": result.content,
        });
        if let Some(name) = &result.name {
            rendered["name"] = Value::String(name.clone());
        }
        Ok(rendered.to_string())
    }

    fn parse_tool_calls(&self, output: &str) -> Vec<ToolCall> {
        let Ok(value) = serde_json::from_str::<Value>(output.trim()) else {
            return Vec::new();
        };
        let items = match value {
            Value::Array(items) => items,
            obj @ Value::Object(_) => vec![obj],
            _ => return Vec::new(),
        };
        items.iter().filter_map(parse_call_value).collect()
    }
}

/// Accepts `{"id", "name", "arguments"}`, OpenAI `{"id", "function": {...}}`
/// and Anthropic `{"type": "tool_use", "id", "name", "input"}` objects.
fn parse_call_value(value: &Value) -> Option<ToolCall> {
    let (name, arguments) = match value.get("function") {
        Some(function) => (
            function.get("name")?.as_str()?,
            function.get("arguments"),
        ),
        None => (
            value.get("name")?.as_str()?,
            value.get("arguments").or_else(|| value.get("input")),
        ),
    };

    let arguments = match arguments {
        Some(Value::String(raw)) => {
            serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.clone()))
        }
        Some(other) => other.clone(),
        None => Value::Object(Default::default()),
    };

    let id = value
        .get("id")
        .and_then(Value::as_str)
        .map(String::from)
        .unwrap_or_else(generate_call_id);

    Some(ToolCall::new(id, name, arguments))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ToolParameter, ToolResult};

    fn tools() -> Vec<ToolDefinition> {
        vec![ToolDefinition::new("search", "Search the forum")
            .with_parameter(ToolParameter::new("query", "string", "Search terms").required())]
    }

    #[test]
    fn test_openai_declarations() {
        let native = NativeTools::new(tools(), FunctionStyle::OpenAi);
        let translated = native.translated_tools().unwrap();
        assert_eq!(translated[0]["type"], "function");
        assert_eq!(translated[0]["function"]["name"], "search");
        assert_eq!(translated[0]["function"]["parameters"]["required"], json!(["query"]));
        assert_eq!(native.instructions(), "");
    }

    #[test]
    fn test_anthropic_declarations() {
        let native = NativeTools::new(tools(), FunctionStyle::Anthropic);
        let translated = native.translated_tools().unwrap();
        assert_eq!(translated[0]["name"], "search");
        assert_eq!(translated[0]["input_schema"]["type"], "object");
        assert!(translated[0].get("function").is_none());
    }

    #[test]
    fn test_malformed_tools_are_rejected() {
        let native = NativeTools::new(vec![ToolDefinition::new("", "")], FunctionStyle::OpenAi);
        assert!(native.translated_tools().unwrap_err().is_validation());
    }

    #[test]
    fn test_tool_call_round_trip() {
        let native = NativeTools::new(tools(), FunctionStyle::OpenAi);
        let call = ToolCall::new("call_7", "search", json!({"query": "rust dialects"}));
        let msg = Message::tool_call(vec![call.clone()]);
        let rendered = native.from_raw_tool_call(&msg).unwrap();
        assert_eq!(native.parse_tool_calls(&rendered), vec![call]);
    }

    #[test]
    fn test_multiple_calls_render_as_array() {
        let native = NativeTools::new(tools(), FunctionStyle::OpenAi);
        let calls = vec![
            ToolCall::new("a", "search", json!({"query": "one"})),
            ToolCall::new("b", "search", json!({"query": "two"})),
        ];
        let rendered = native
            .from_raw_tool_call(&Message::tool_call(calls.clone()))
            .unwrap();
        assert!(rendered.starts_with('['));
        assert_eq!(native.parse_tool_calls(&rendered), calls);
    }

    #[test]
    fn test_tool_result_rendering() {
        let native = NativeTools::new(tools(), FunctionStyle::OpenAi);
        let msg = Message::tool_result(
            ToolResult::new("call_7", json!({"hits": 3})).with_name("search"),
        );
        let rendered: Value = serde_json::from_str(&native.from_raw_tool(&msg).unwrap()).unwrap();
        assert_eq!(
            rendered,
            json!({"tool_call_id": "call_7", "name": "search", "content": {"hits": 3}})
        );
    }

    #[test]
    fn test_parse_provider_shapes() {
        let native = NativeTools::new(tools(), FunctionStyle::OpenAi);
        let openai = r#"[{"id": "call_1", "type": "function",
            "function": {"name": "search", "arguments": "{\"query\":\"x\"}"}}]"#;
        assert_eq!(
            native.parse_tool_calls(openai),
            vec![ToolCall::new("call_1", "search", json!({"query": "x"}))]
        );

        let anthropic = r#"{"type": "tool_use", "id": "toolu_1", "name": "search", "input": {"query": "y"}}"#;
        assert_eq!(
            native.parse_tool_calls(anthropic),
            vec![ToolCall::new("toolu_1", "search", json!({"query": "y"}))]
        );

        let without_id = native.parse_tool_calls(r#"{"name": "search"}"#);
        assert!(without_id[0].id.starts_with("tool_"));
        assert_eq!(without_id[0].arguments, json!({}));

        assert!(native.parse_tool_calls("plain prose").is_empty());
    }

    #[test]
    fn test_missing_payloads_are_rejected() {
        let native = NativeTools::new(tools(), FunctionStyle::OpenAi);
        assert!(native.from_raw_tool_call(&Message::assistant("hi")).is_err());
        assert!(native.from_raw_tool(&Message::assistant("hi")).is_err());
    }
}
