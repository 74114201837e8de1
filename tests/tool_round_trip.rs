//! Tool calls rendered by a dialect parse back into the abstract form

use serde_json::json;

use ai_dialects::vision::NoUploads;
use ai_dialects::{
    DialectRegistry, Error, Message, ModelConfig, Prompt, ToolCall, ToolDefinition, ToolParameter,
};

fn tools() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::new("search", "Search forum posts")
            .with_parameter(ToolParameter::new("query", "string", "Search terms").required())
            .with_parameter(ToolParameter::new("limit", "integer", "Maximum results")),
        ToolDefinition::new("read_topic", "Read a topic by id")
            .with_parameter(ToolParameter::new("topic_id", "integer", "Topic id").required()),
    ]
}

fn calls() -> Vec<ToolCall> {
    vec![
        ToolCall::new("call_a", "search", json!({"query": "rust <dialects> & tools", "limit": 3})),
        ToolCall::new("call_b", "read_topic", json!({"topic_id": 42})),
    ]
}

fn assert_round_trip(config: ModelConfig) {
    let prompt = Prompt::new(vec![Message::user("find it")]).with_tools(tools());
    let registry = DialectRegistry::new();
    let dialect = registry.dialect_for(&prompt, &config, &NoUploads);
    let tools_dialect = dialect.tools_dialect();

    let rendered = tools_dialect
        .from_raw_tool_call(&Message::tool_call(calls()))
        .unwrap();
    let parsed = tools_dialect.parse_tool_calls(&rendered);

    let expected: Vec<_> = calls().into_iter().map(|c| (c.name, c.arguments)).collect();
    let actual: Vec<_> = parsed.into_iter().map(|c| (c.name, c.arguments)).collect();
    assert_eq!(actual, expected, "round trip failed for {}", config.name);
}

#[test]
fn test_xml_round_trip() {
    assert_round_trip(ModelConfig::new("llama-3.1-70b"));
    assert_round_trip(ModelConfig::new("claude-2"));
}

#[test]
fn test_native_round_trip() {
    assert_round_trip(ModelConfig::new("gpt-4o").with_native_tool_support(true));
    assert_round_trip(ModelConfig::new("claude-3-5-sonnet").with_native_tool_support(true));
}

#[test]
fn test_native_tools_via_custom_param() {
    let config = ModelConfig::new("qwen-2.5").with_custom_param("enable_native_tool", json!(true));
    let prompt = Prompt::new(vec![Message::user("u")]).with_tools(tools());
    let registry = DialectRegistry::new();
    let dialect = registry.dialect_for(&prompt, &config, &NoUploads);
    assert!(dialect.tools_dialect().is_native());
    assert_eq!(dialect.tools().unwrap().as_array().map(Vec::len), Some(2));
}

#[test]
fn test_xml_instructions_land_in_system_prompt() {
    let prompt = Prompt::new(vec![Message::system("Be helpful."), Message::user("u")])
        .with_tools(tools());
    let out = DialectRegistry::new()
        .translate(&prompt, &ModelConfig::new("llama-3.1-70b"), &NoUploads)
        .unwrap();
    let system = out.messages()[0].content.text_content();
    assert!(system.starts_with("Be helpful.\n\nIn this environment"));
    assert!(system.contains("<tool_name>read_topic</tool_name>"));
}

#[test]
fn test_parse_model_output_with_prose() {
    let prompt = Prompt::new(vec![Message::user("u")]).with_tools(tools());
    let config = ModelConfig::new("llama-3.1-70b");
    let registry = DialectRegistry::new();
    let dialect = registry.dialect_for(&prompt, &config, &NoUploads);

    let output = "I will look that up.\n<function_calls>\n<invoke>\n<tool_name>read_topic</tool_name>\n<parameters>\n<topic_id>7</topic_id>\n</parameters>\n</invoke>\n</function_calls>";
    let parsed = dialect.tools_dialect().parse_tool_calls(output);
    assert_eq!(parsed.len(), 1);
    assert_eq!(parsed[0].name, "read_topic");
    assert_eq!(parsed[0].arguments, json!({"topic_id": 7}));
    assert!(!parsed[0].id.is_empty());
}

#[test]
fn test_xml_round_trip_keeps_string_arguments() {
    let prompt = Prompt::new(vec![Message::user("find it")]).with_tools(tools());
    let config = ModelConfig::new("llama-3.1-70b");
    let registry = DialectRegistry::new();
    let dialect = registry.dialect_for(&prompt, &config, &NoUploads);
    let tools_dialect = dialect.tools_dialect();

    let call = ToolCall::new(
        "call_c",
        "search",
        json!({"query": "42", "flag": "true", "pad": "  x  ", "zip": "02139", "limit": 2}),
    );
    let rendered = tools_dialect
        .from_raw_tool_call(&Message::tool_call(vec![call.clone()]))
        .unwrap();
    assert_eq!(tools_dialect.parse_tool_calls(&rendered), vec![call]);
}

#[test]
fn test_xml_rejects_dotted_argument_names() {
    let prompt = Prompt::new(vec![
        Message::user("find it"),
        Message::tool_call(vec![ToolCall::new("call_d", "search", json!({"k.dot": "v"}))]),
    ])
    .with_tools(tools());
    let err = DialectRegistry::new()
        .translate(&prompt, &ModelConfig::new("llama-3.1-70b"), &NoUploads)
        .unwrap_err();
    assert!(matches!(err, Error::Validation { .. }));
    assert_eq!(
        err.context().and_then(|c| c.field_path.as_deref()),
        Some("message.tool_calls[0].arguments.k.dot")
    );

    let native = ModelConfig::new("gpt-4o").with_native_tool_support(true);
    assert!(DialectRegistry::new().translate(&prompt, &native, &NoUploads).is_ok());
}
