//! Rebuild training conversations from stored inferences.

use crate::config::FunctionType;
use crate::dataset::{Conversation, RawSample, RenderedMessage, Role};
use crate::error::{TrainingError, TrainingResult};
use crate::template::TemplateSet;
use serde_json::{Map, Value};

/// Convert one stored inference into a conversation.
///
/// Message order is: an optional system message, the input messages in stored
/// order, then exactly one assistant message built from the output.
pub fn to_conversation(
    sample: &RawSample,
    function_type: FunctionType,
    templates: &TemplateSet,
) -> TrainingResult<Conversation> {
    let label = sample.label();
    let input: Value = serde_json::from_str(&sample.input).map_err(|e| {
        TrainingError::structural(format!("input of {label}"), format!("invalid JSON: {e}"))
    })?;

    let mut messages = Vec::new();

    if let Some(system) = render_system(&input, templates, &label)? {
        messages.push(RenderedMessage { role: Role::System, content: system });
    }

    let input_messages = match input.get("messages") {
        None | Some(Value::Null) => &[][..],
        Some(Value::Array(items)) => items.as_slice(),
        Some(other) => {
            return Err(TrainingError::structural(
                format!("input of {label}"),
                format!("`messages` is not a list: {other}"),
            ));
        }
    };

    for (idx, message) in input_messages.iter().enumerate() {
        let context = format!("message {idx} of {label}");
        let role = match message.get("role").and_then(Value::as_str) {
            Some("user") => Role::User,
            Some("assistant") => Role::Assistant,
            Some(other) => {
                return Err(TrainingError::structural(
                    context,
                    format!("unexpected role `{other}`"),
                ));
            }
            None => return Err(TrainingError::structural(context, "missing role")),
        };
        let content = message.get("content").unwrap_or(&Value::Null);
        let content = templates.render_content(role, content, &context)?;
        messages.push(RenderedMessage { role, content });
    }

    messages.push(RenderedMessage {
        role: Role::Assistant,
        content: render_output(&sample.output, function_type, &label)?,
    });

    let conversation = Conversation { messages };
    conversation.validate()?;
    Ok(conversation)
}

/// Convert every sample, stopping at the first malformed one.
pub fn to_conversations(
    samples: &[RawSample],
    function_type: FunctionType,
    templates: &TemplateSet,
) -> TrainingResult<Vec<Conversation>> {
    samples.iter().map(|s| to_conversation(s, function_type, templates)).collect()
}

fn render_system(input: &Value, templates: &TemplateSet, label: &str) -> TrainingResult<Option<String>> {
    let system = input.get("system").unwrap_or(&Value::Null);
    let has_template = templates.has(Role::System);

    match system {
        Value::String(text) if !text.is_empty() => Ok(Some(text.clone())),
        Value::Object(bindings) if has_template => Ok(Some(templates.render(Role::System, bindings)?)),
        Value::Object(bindings) if !bindings.is_empty() => Err(TrainingError::structural(
            format!("system input of {label}"),
            "structured system input requires a system template",
        )),
        Value::Null | Value::String(_) | Value::Object(_) if has_template => {
            Ok(Some(templates.render(Role::System, &Map::new())?))
        }
        Value::Null | Value::String(_) | Value::Object(_) => Ok(None),
        other => Err(TrainingError::structural(
            format!("system input of {label}"),
            format!("expected a string or an object: {other}"),
        )),
    }
}

fn render_output(output: &str, function_type: FunctionType, label: &str) -> TrainingResult<String> {
    let context = format!("output of {label}");
    let parsed: Value = serde_json::from_str(output)
        .map_err(|e| TrainingError::structural(&context, format!("invalid JSON: {e}")))?;

    match function_type {
        FunctionType::Chat => {
            let blocks = parsed.as_array().map(Vec::as_slice).unwrap_or_default();
            let [block] = blocks else {
                return Err(TrainingError::structural(
                    context,
                    format!("expected exactly one content block: {output}"),
                ));
            };
            if block.get("type").and_then(Value::as_str) != Some("text") {
                return Err(TrainingError::structural(
                    context,
                    format!("expected a text block: {output}"),
                ));
            }
            block.get("text").and_then(Value::as_str).map(str::to_string).ok_or_else(|| {
                TrainingError::structural(context, format!("text block has no `text`: {output}"))
            })
        }
        FunctionType::Json => parsed.get("raw").and_then(Value::as_str).map(str::to_string).ok_or_else(
            || TrainingError::structural(context, format!("missing raw output string: {output}")),
        ),
    }
}
