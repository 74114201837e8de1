//! Text-convention tool calling for models without native function calling.
//!
//! Tools are described inside the system prompt and the model is asked to
//! emit `<function_calls>` blocks, which [`XmlTools::parse_tool_calls`] reads
//! back. Parameter values are XML-escaped on the way out and unescaped on
//! the way in. An untagged value that parses as JSON comes back as JSON, so
//! rendered strings that would be misread carry `type="string"`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::debug;

use super::{generate_call_id, require_tool_calls, require_tool_result, validate_tools, ToolsDialect};
use crate::error::{Error, ErrorContext};
use crate::types::{Message, ToolCall, ToolDefinition, ToolParameter};

static INVOKE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<invoke>(.*?)</invoke>").expect("valid invoke pattern"));
static TOOL_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<tool_name>(.*?)</tool_name>").expect("valid tool_name pattern"));
static TOOL_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<tool_id>(.*?)</tool_id>").expect("valid tool_id pattern"));
static PARAMETERS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<parameters>(.*?)</parameters>").expect("valid parameters pattern")
});
static PARAM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?s)<([A-Za-z_][A-Za-z0-9_\-]*)(?:\s+type="([a-z]+)")?>(.*?)</([A-Za-z_][A-Za-z0-9_\-]*)>"#,
    )
    .expect("valid parameter pattern")
});
static PARAM_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_\-]*$").expect("valid parameter name pattern")
});

const INSTRUCTIONS_PREAMBLE: &str = "In this environment you have access to a set of tools you can use to answer the user's question.
You may call them like this.

<function_calls>
<invoke>
<tool_name>$TOOL_NAME</tool_name>
<parameters>
<$PARAMETER_NAME>$PARAMETER_VALUE</$PARAMETER_NAME>
...
</parameters>
</invoke>
</function_calls>

If you wish to call multiple function in one reply, wrap multiple <invoke>
block in a single <function_calls> block.

Always prefer to lead with tool calls, if you need to execute any.
Avoid all niceties prior to tool calls, Eg: \"Let me look this up for you..\" etc.
Here are the complete list of tools available:";

#[derive(Debug, Clone)]
pub struct XmlTools {
    tools: Vec<ToolDefinition>,
}

impl XmlTools {
    pub fn new(tools: Vec<ToolDefinition>) -> Self {
        Self { tools }
    }

    fn describe_tools(&self) -> String {
        let descriptions: Vec<String> = self.tools.iter().map(describe_tool).collect();
        format!("<tools>\n{}\n</tools>", descriptions.join("\n"))
    }
}

fn describe_tool(tool: &ToolDefinition) -> String {
    let parameters: String = tool.parameters.iter().map(describe_parameter).collect();
    format!(
        "<tool_description>\n<tool_name>{}</tool_name>\n<description>{}</description>\n<parameters>\n{}</parameters>\n</tool_description>",
        tool.name,
        escape(&tool.description),
        parameters
    )
}

fn describe_parameter(param: &ToolParameter) -> String {
    let options = param
        .enum_values
        .as_ref()
        .map(|values| format!("<options>{}</options>\n", escape(&values.join(","))))
        .unwrap_or_default();
    let item_type = param
        .item_type
        .as_ref()
        .map(|t| format!("<item_type>{}</item_type>\n", t))
        .unwrap_or_default();
    format!(
        "<parameter>\n<name>{}</name>\n<type>{}</type>\n<description>{}</description>\n<required>{}</required>\n{}{}</parameter>\n",
        param.name,
        param.param_type,
        escape(&param.description),
        param.required,
        options,
        item_type
    )
}

fn render_arguments(index: usize, arguments: &Value) -> crate::Result<String> {
    let parsed;
    let object = match arguments {
        Value::Object(map) => map,
        Value::String(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => {
                parsed = map;
                &parsed
            }
            _ => {
                debug!("tool call arguments are not an object, rendering without parameters");
                return Ok(String::new());
            }
        },
        Value::Null => return Ok(String::new()),
        _ => {
            debug!("tool call arguments are not an object, rendering without parameters");
            return Ok(String::new());
        }
    };

    let mut rendered = String::new();
    for (key, value) in object {
        if !PARAM_NAME_RE.is_match(key) {
            return Err(Error::validation_with_context(
                format!("argument name {key:?} cannot be written as an XML tag"),
                ErrorContext::new()
                    .with_field_path(format!("message.tool_calls[{index}].arguments.{key}"))
                    .with_source("xml_tools"),
            ));
        }
        match value {
            Value::String(s) if parse_untyped(s) != *value => {
                rendered.push_str(&format!("<{key} type=\"string\">{}</{key}>\n", escape(s)));
            }
            Value::String(s) => rendered.push_str(&format!("<{key}>{}</{key}>\n", escape(s))),
            other => rendered.push_str(&format!("<{key}>{}</{key}>\n", escape(&other.to_string()))),
        }
    }
    Ok(rendered)
}

fn render_invoke(index: usize, call: &ToolCall) -> crate::Result<String> {
    Ok(format!(
        "<invoke>\n<tool_name>{}</tool_name>\n<parameters>\n{}</parameters>\n<tool_id>{}</tool_id>\n</invoke>\n",
        call.name,
        render_arguments(index, &call.arguments)?,
        call.id
    ))
}

/// Value of a parameter tag. `type="string"` keeps the text verbatim and
/// `type="json"` forces a JSON read. Untagged text, as models write it, is
/// trimmed and read as JSON when it looks like JSON.
fn parse_value(raw: &str, value_type: Option<&str>) -> Value {
    match value_type {
        Some("string") => Value::String(unescape(raw)),
        Some("json") => {
            let text = unescape(raw.trim());
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        }
        _ => parse_untyped(&unescape(raw)),
    }
}

fn parse_untyped(text: &str) -> Value {
    let text = text.trim();
    let looks_structured = text.starts_with(['{', '[', '"'])
        || matches!(text, "true" | "false" | "null")
        || text.parse::<f64>().is_ok();
    if looks_structured {
        if let Ok(value) = serde_json::from_str(text) {
            return value;
        }
    }
    Value::String(text.to_string())
}

fn parse_invoke(block: &str) -> Option<ToolCall> {
    let name = TOOL_NAME_RE.captures(block)?.get(1)?.as_str().trim().to_string();
    if name.is_empty() {
        return None;
    }

    let mut arguments = Map::new();
    if let Some(params) = PARAMETERS_RE.captures(block).and_then(|c| c.get(1)) {
        for cap in PARAM_RE.captures_iter(params.as_str()) {
            if cap[1] != cap[4] {
                continue;
            }
            let value_type = cap.get(2).map(|m| m.as_str());
            arguments.insert(cap[1].to_string(), parse_value(&cap[3], value_type));
        }
    }

    let id = TOOL_ID_RE
        .captures(block)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|id| !id.is_empty())
        .unwrap_or_else(generate_call_id);

    Some(ToolCall::new(id, name, Value::Object(arguments)))
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

impl ToolsDialect for XmlTools {
    fn tools(&self) -> &[ToolDefinition] {
        &self.tools
    }

    fn is_native(&self) -> bool {
        false
    }

    fn translated_tools(&self) -> crate::Result<Value> {
        validate_tools(&self.tools)?;
        if self.tools.is_empty() {
            return Ok(Value::String(String::new()));
        }
        Ok(Value::String(self.describe_tools()))
    }

    fn instructions(&self) -> String {
        if self.tools.is_empty() {
            return String::new();
        }
        format!("{}\n{}", INSTRUCTIONS_PREAMBLE, self.describe_tools())
    }

    fn from_raw_tool_call(&self, message: &Message) -> crate::Result<String> {
        let calls = require_tool_calls(message)?;
        let invokes = calls
            .iter()
            .enumerate()
            .map(|(i, call)| render_invoke(i, call))
            .collect::<crate::Result<String>>()?;
        Ok(format!("<function_calls>\n{}</function_calls>", invokes))
    }

    fn from_raw_tool(&self, message: &Message) -> crate::Result<String> {
        let result = require_tool_result(message)?;
        let name = result
            .name
            .as_ref()
            .map(|n| format!("<tool_name>{}</tool_name>\n", n))
            .unwrap_or_default();
        Ok(format!(
            "<function_results>\n<result>\n{}<tool_id>{}</tool_id>\n<json>\n{}\n</json>\n</result>\n</function_results>",
            name,
            result.call_id,
            result.content_text()
        ))
    }

    fn parse_tool_calls(&self, output: &str) -> Vec<ToolCall> {
        INVOKE_RE
            .captures_iter(output)
            .filter_map(|cap| cap.get(1))
            .filter_map(|block| parse_invoke(block.as_str()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ToolResult;
    use serde_json::json;

    fn tools() -> Vec<ToolDefinition> {
        vec![ToolDefinition::new("search", "Search <posts> & topics")
            .with_parameter(ToolParameter::new("query", "string", "Search terms").required())
            .with_parameter(ToolParameter::new("order", "string", "").with_enum(["latest", "oldest"]))]
    }

    #[test]
    fn test_instructions_describe_tools() {
        let xml = XmlTools::new(tools());
        let instructions = xml.instructions();
        assert!(instructions.starts_with("In this environment you have access to a set of tools"));
        assert!(instructions.contains("<tool_name>search</tool_name>"));
        assert!(instructions.contains("<description>Search &lt;posts&gt; &amp; topics</description>"));
        assert!(instructions.contains("<required>true</required>"));
        assert!(instructions.contains("<options>latest,oldest</options>"));
        assert!(instructions.ends_with("</tools>"));
    }

    #[test]
    fn test_no_tools_no_instructions() {
        let xml = XmlTools::new(Vec::new());
        assert_eq!(xml.instructions(), "");
        assert_eq!(xml.translated_tools().unwrap(), Value::String(String::new()));
    }

    #[test]
    fn test_tool_call_rendering() {
        let xml = XmlTools::new(tools());
        let msg = Message::tool_call(vec![ToolCall::new(
            "call_1",
            "search",
            json!({"query": "a < b"}),
        )]);
        assert_eq!(
            xml.from_raw_tool_call(&msg).unwrap(),
            "<function_calls>\n<invoke>\n<tool_name>search</tool_name>\n<parameters>\n<query>a &lt; b</query>\n</parameters>\n<tool_id>call_1</tool_id>\n</invoke>\n</function_calls>"
        );
    }

    #[test]
    fn test_tool_call_round_trip() {
        let xml = XmlTools::new(tools());
        let calls = vec![
            ToolCall::new("call_1", "search", json!({"query": "dialects & <tools>", "limit": 5})),
            ToolCall::new("call_2", "search", json!({"query": "vision", "tags": ["a", "b"]})),
        ];
        let rendered = xml.from_raw_tool_call(&Message::tool_call(calls.clone())).unwrap();
        assert_eq!(xml.parse_tool_calls(&rendered), calls);
    }

    #[test]
    fn test_json_looking_strings_survive_round_trip() {
        let xml = XmlTools::new(tools());
        let call = ToolCall::new(
            "call_1",
            "search",
            json!({
                "code": "42",
                "flag": "true",
                "nothing": "null",
                "list": "[1, 2]",
                "pad": "  x  ",
                "zip": "02139",
                "count": 42,
                "enabled": true
            }),
        );
        let rendered = xml.from_raw_tool_call(&Message::tool_call(vec![call.clone()])).unwrap();
        assert!(rendered.contains("<code type=\"string\">42</code>"));
        assert!(rendered.contains("<pad type=\"string\">  x  </pad>"));
        assert!(rendered.contains("<zip>02139</zip>"));
        assert!(rendered.contains("<count>42</count>"));
        assert_eq!(xml.parse_tool_calls(&rendered), vec![call]);
    }

    #[test]
    fn test_unrepresentable_argument_names_are_rejected() {
        let xml = XmlTools::new(tools());
        for key in ["k.dot", "1st", "größe", "two words"] {
            let mut arguments = Map::new();
            arguments.insert(key.to_string(), json!("v"));
            let msg = Message::tool_call(vec![
                ToolCall::new("ok", "search", json!({"query": "fine"})),
                ToolCall::new("bad", "search", Value::Object(arguments)),
            ]);
            let err = xml.from_raw_tool_call(&msg).unwrap_err();
            assert!(matches!(err, Error::Validation { .. }), "{key}: {err}");
            let context = err.context().unwrap();
            assert_eq!(
                context.field_path.as_deref(),
                Some(format!("message.tool_calls[1].arguments.{key}").as_str())
            );
            assert_eq!(context.source.as_deref(), Some("xml_tools"));
        }
    }

    #[test]
    fn test_typed_parameters_in_model_output() {
        let xml = XmlTools::new(tools());
        let output = "<invoke>\n<tool_name>search</tool_name>\n<parameters>\n<query type=\"string\"> 7 </query>\n<limit type=\"json\">7</limit>\n<order>\n latest \n</order>\n</parameters>\n</invoke>";
        let calls = xml.parse_tool_calls(output);
        assert_eq!(
            calls[0].arguments,
            json!({"query": " 7 ", "limit": 7, "order": "latest"})
        );
    }

    #[test]
    fn test_string_arguments_are_decoded() {
        let xml = XmlTools::new(tools());
        let call = ToolCall::new("c", "search", Value::String(r#"{"query":"x"}"#.into()));
        let rendered = xml.from_raw_tool_call(&Message::tool_call(vec![call])).unwrap();
        assert!(rendered.contains("<query>x</query>"));
    }

    #[test]
    fn test_tool_result_rendering() {
        let xml = XmlTools::new(tools());
        let msg = Message::tool_result(ToolResult::new("call_1", json!("3 results")).with_name("search"));
        assert_eq!(
            xml.from_raw_tool(&msg).unwrap(),
            "<function_results>\n<result>\n<tool_name>search</tool_name>\n<tool_id>call_1</tool_id>\n<json>\n3 results\n</json>\n</result>\n</function_results>"
        );
    }

    #[test]
    fn test_parse_model_output() {
        let xml = XmlTools::new(tools());
        let output = "Sure.\n<function_calls>\n<invoke>\n<tool_name>search</tool_name>\n<parameters>\n<query>rust</query>\n<order>latest</order>\n</parameters>\n</invoke>\n</function_calls>";
        let calls = xml.parse_tool_calls(output);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "search");
        assert_eq!(calls[0].arguments, json!({"query": "rust", "order": "latest"}));
        assert!(calls[0].id.starts_with("tool_"));

        assert!(xml.parse_tool_calls("no tools here").is_empty());
        assert!(xml
            .parse_tool_calls("<invoke><parameters></parameters></invoke>")
            .is_empty());
    }
}
