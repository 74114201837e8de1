//! End-to-end dialect translation through the public API

use ai_dialects::types::{ContentPart, PayloadRole};
use ai_dialects::vision::{EncodedUpload, InMemoryUploads, NoUploads};
use ai_dialects::{
    translate, Dialect, DialectRegistry, Message, MessageContent, ModelConfig, OpenAiCompatible,
    Prompt, TranslatedMessage,
};

fn conversation() -> Prompt {
    Prompt::new(vec![
        Message::system("You are a forum helper."),
        Message::user("first question").with_id("alice"),
        Message::assistant("first answer"),
        Message::user("second question").with_id("bob"),
        Message::assistant("second answer"),
        Message::user("third question"),
    ])
}

#[test]
fn test_translation_is_deterministic() {
    let prompt = conversation();
    for model in ["gpt-4o", "claude-3-5-sonnet", "mistral-large"] {
        let config = ModelConfig::new(model);
        let first = translate(&prompt, &config, &NoUploads).unwrap();
        let second = translate(&prompt, &config, &NoUploads).unwrap();
        assert_eq!(first, second, "translation for {} differs between runs", model);
    }
}

#[test]
fn test_order_is_preserved_within_budget() {
    let prompt = conversation();
    let out = translate(&prompt, &ModelConfig::new("gpt-4o"), &NoUploads).unwrap();

    let texts: Vec<String> = out.iter().map(|m| m.content.text_content()).collect();
    assert_eq!(
        texts,
        vec![
            "You are a forum helper.",
            "alice: first question",
            "first answer",
            "bob: second question",
            "second answer",
            "third question",
        ]
    );
    let roles: Vec<_> = out.iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![
            PayloadRole::System,
            PayloadRole::User,
            PayloadRole::Assistant,
            PayloadRole::User,
            PayloadRole::Assistant,
            PayloadRole::User,
        ]
    );
}

#[test]
fn test_input_prompt_is_untouched() {
    let prompt = conversation().with_tools(Vec::new());
    let before = prompt.clone();
    let config = ModelConfig::new("gpt-4o")
        .with_disable_system_prompt(true)
        .with_max_prompt_tokens(10);
    translate(&prompt, &config, &NoUploads).unwrap();
    assert_eq!(prompt, before);
}

#[test]
fn test_disabled_system_prompt_merges_first_turn() {
    let prompt = Prompt::new(vec![
        Message::system("S"),
        Message::user("U"),
        Message::assistant("A"),
    ]);
    let config = ModelConfig::new("llama-3.1-8b").with_disable_system_prompt(true);
    let out = translate(&prompt, &config, &NoUploads).unwrap();
    assert_eq!(
        out.messages(),
        &[
            TranslatedMessage::user(MessageContent::text("S\nU")),
            TranslatedMessage::assistant("A"),
        ]
    );

    let lone = Prompt::new(vec![Message::user("U")]);
    let out = translate(&lone, &config, &NoUploads).unwrap();
    assert_eq!(out.messages(), &[TranslatedMessage::user(MessageContent::text("U"))]);
}

#[test]
fn test_vision_inlines_images_before_text() {
    let uploads = InMemoryUploads::new()
        .with_upload("a.png", EncodedUpload::new("image/png", "QUFB"))
        .with_upload("b.jpg", EncodedUpload::new("image/jpeg", "QkJC"));
    let prompt = Prompt::new(vec![Message::user("compare these")
        .with_id("42")
        .with_attachments(["a.png", "missing.gif", "b.jpg"])]);

    let config = ModelConfig::new("gpt-4o").with_vision_support(true);
    let out = translate(&prompt, &config, &uploads).unwrap();
    assert_eq!(
        out.messages()[0].content,
        MessageContent::parts(vec![
            ContentPart::image_data_url("image/png", "QUFB"),
            ContentPart::image_data_url("image/jpeg", "QkJC"),
            ContentPart::text("42: compare these"),
        ])
    );

    let json = out.to_json().unwrap();
    assert_eq!(json[0]["content"][0]["type"], "image_url");
    assert_eq!(
        json[0]["content"][0]["image_url"]["url"],
        "data:image/png;base64,QUFB"
    );
    assert_eq!(json[0]["content"][2]["text"], "42: compare these");
}

#[test]
fn test_vision_disabled_keeps_plain_string() {
    let uploads = InMemoryUploads::new().with_upload("a.png", EncodedUpload::new("image/png", "QUFB"));
    let prompt = Prompt::new(vec![Message::user("look").with_attachment("a.png")]);
    let out = translate(&prompt, &ModelConfig::new("gpt-4o"), &uploads).unwrap();
    assert_eq!(out.messages()[0].content, MessageContent::text("look"));
    assert_eq!(out.to_json().unwrap()[0]["content"], "look");
}

#[test]
fn test_prompt_budget() {
    let prompt = Prompt::default();
    let default = ModelConfig::new("gpt-4o");
    assert_eq!(
        OpenAiCompatible::new(&prompt, &default, &NoUploads).max_prompt_tokens(),
        32_000
    );

    let small = ModelConfig::new("gpt-4o").with_max_prompt_tokens(8000);
    let registry = DialectRegistry::new();
    assert_eq!(
        registry
            .dialect_for(&prompt, &small, &NoUploads)
            .max_prompt_tokens(),
        8000
    );
}

#[test]
fn test_user_id_prefix() {
    let prompt = Prompt::new(vec![Message::user("hi").with_id("42"), Message::user("hi")]);
    let out = translate(&prompt, &ModelConfig::new("gpt-4o"), &NoUploads).unwrap();
    assert_eq!(out.messages()[0].content, MessageContent::text("42: hi"));
    assert_eq!(out.messages()[1].content, MessageContent::text("hi"));
}

#[test]
fn test_trimming_keeps_system_and_newest() {
    let mut messages = vec![Message::system("Be brief.")];
    for i in 0..200 {
        messages.push(Message::user(format!("question number {} about dialect translation", i)));
        messages.push(Message::assistant(format!("answer number {} about token budgets", i)));
    }
    let prompt = Prompt::new(messages);
    let config = ModelConfig::new("gpt-4o").with_max_prompt_tokens(300);
    let out = translate(&prompt, &config, &NoUploads).unwrap();

    assert!(out.len() < 401);
    assert_eq!(out.messages()[0], TranslatedMessage::system("Be brief."));
    assert_eq!(
        out.messages().last().map(|m| m.content.text_content()),
        Some("answer number 199 about token budgets".to_string())
    );
}

#[test]
fn test_structural_violation_aborts() {
    let prompt = Prompt::new(vec![Message::user("u"), Message::system("late")]);
    let err = translate(&prompt, &ModelConfig::new("gpt-4o"), &NoUploads).unwrap_err();
    assert!(err.is_validation());
    assert_eq!(
        err.context().and_then(|c| c.field_path.as_deref()),
        Some("prompt.messages[1]")
    );
}

#[test]
fn test_unknown_role_is_rejected() {
    let raw = r#"{"messages": [{"role": "narrator", "content": "once upon a time"}]}"#;
    assert!(Prompt::from_json(raw).is_err());
}

#[test]
fn test_prompt_from_json() {
    let raw = r#"{
        "system": "Be brief.",
        "messages": [
            {"role": "user", "content": "what time is it", "id": "sam"},
            {"role": "tool_call", "tool_calls": [{"call_id": "c1", "name": "time", "arguments": {}}]},
            {"role": "tool", "tool_result": {"call_id": "c1", "name": "time", "content": "noon"}}
        ],
        "tools": [{"name": "time", "description": "Current time"}]
    }"#;
    let prompt = Prompt::from_json(raw).unwrap();
    let out = translate(&prompt, &ModelConfig::new("claude-3-haiku"), &NoUploads).unwrap();

    let (system, turns) = out.split_system();
    let system = system.unwrap();
    assert!(system.starts_with("Be brief.\n\n"));
    assert!(system.contains("<tool_name>time</tool_name>"));
    assert_eq!(turns[0].content, MessageContent::text("sam: what time is it"));
    assert_eq!(turns[1].role, PayloadRole::Assistant);
    assert_eq!(turns[2].role, PayloadRole::User);
}
