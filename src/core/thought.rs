//! Agent-thinking markers decoded from `"m"` events.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};

fn episode_regex() -> &'static Regex {
    static CACHED: OnceLock<Regex> = OnceLock::new();
    CACHED.get_or_init(|| {
        Regex::new(r"^Episode (\d+): (\d+) commands?$").expect("episode regex must compile")
    })
}

/// One command an agent planned to send to the terminal.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedCommand {
    pub command_text: String,
    pub timeout_seconds: Option<f64>,
}

/// Decoded payload of a marker event.
#[derive(Debug, Clone, PartialEq)]
pub enum ThoughtContent {
    Episode {
        episode_number: u32,
        command_count: u32,
        raw: String,
    },
    Thinking {
        state_analysis: Option<String>,
        explanation: Option<String>,
        commands: Option<Vec<PlannedCommand>>,
        is_task_complete: Option<bool>,
        /// Keys without a dedicated field, kept verbatim for display.
        extra: BTreeMap<String, Value>,
    },
    Unparseable {
        raw_content: String,
    },
}

/// A marker event positioned on the timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentThought {
    pub timestamp_offset: f64,
    pub content: ThoughtContent,
}

/// A labelled value for rendering a thought as a list of fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThoughtField {
    pub label: String,
    pub value: String,
}

impl AgentThought {
    /// Decodes a marker whose wire content was a JSON string.
    pub fn from_text(timestamp_offset: f64, text: &str) -> Self {
        Self {
            timestamp_offset,
            content: decode_text(text),
        }
    }

    /// Decodes a marker whose wire content was any JSON value.
    pub fn from_value(timestamp_offset: f64, value: &Value) -> Self {
        let content = match value {
            Value::String(text) => decode_text(text),
            Value::Object(fields) => decode_fields(fields),
            other => ThoughtContent::Unparseable {
                raw_content: other.to_string(),
            },
        };
        Self {
            timestamp_offset,
            content,
        }
    }

    /// One-line description suitable for a status bar.
    pub fn summary(&self) -> String {
        match &self.content {
            ThoughtContent::Episode {
                episode_number,
                command_count,
                ..
            } => {
                let noun = if *command_count == 1 {
                    "command"
                } else {
                    "commands"
                };
                format!("Episode {episode_number}: {command_count} {noun}")
            }
            ThoughtContent::Thinking {
                state_analysis,
                explanation,
                commands,
                is_task_complete,
                extra,
            } => {
                let headline = state_analysis
                    .as_deref()
                    .or(explanation.as_deref())
                    .and_then(first_non_empty_line);
                if let Some(headline) = headline {
                    return headline.to_string();
                }
                if let Some(commands) = commands {
                    return format!("{} planned commands", commands.len());
                }
                if *is_task_complete == Some(true) {
                    return "Task complete".to_string();
                }
                extra
                    .keys()
                    .next()
                    .map(|key| format!("{}: {}", humanize_key(key), display_value(&extra[key])))
                    .unwrap_or_default()
            }
            ThoughtContent::Unparseable { raw_content } => first_non_empty_line(raw_content)
                .unwrap_or_default()
                .to_string(),
        }
    }

    /// Labelled fields in display order. Extra keys come last, under their own names.
    pub fn display_fields(&self) -> Vec<ThoughtField> {
        let mut fields = Vec::new();
        match &self.content {
            ThoughtContent::Episode {
                episode_number,
                command_count,
                ..
            } => {
                push_field(&mut fields, "Episode", episode_number.to_string());
                push_field(&mut fields, "Commands", command_count.to_string());
            }
            ThoughtContent::Thinking {
                state_analysis,
                explanation,
                commands,
                is_task_complete,
                extra,
            } => {
                if let Some(value) = state_analysis {
                    push_field(&mut fields, "State analysis", value.clone());
                }
                if let Some(value) = explanation {
                    push_field(&mut fields, "Explanation", value.clone());
                }
                if let Some(commands) = commands {
                    let rendered = commands
                        .iter()
                        .map(|command| match command.timeout_seconds {
                            Some(timeout) => format!("{} (timeout {timeout}s)", command.command_text),
                            None => command.command_text.clone(),
                        })
                        .collect::<Vec<_>>()
                        .join("\n");
                    push_field(&mut fields, "Commands", rendered);
                }
                if let Some(done) = is_task_complete {
                    push_field(&mut fields, "Task complete", done.to_string());
                }
                for (key, value) in extra {
                    push_field(&mut fields, &humanize_key(key), display_value(value));
                }
            }
            ThoughtContent::Unparseable { raw_content } => {
                push_field(&mut fields, "Raw", raw_content.clone());
            }
        }
        fields
    }
}

fn decode_text(text: &str) -> ThoughtContent {
    if let Some(episode) = decode_episode(text) {
        return episode;
    }

    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(fields)) => decode_fields(&fields),
        _ => ThoughtContent::Unparseable {
            raw_content: text.to_string(),
        },
    }
}

fn decode_episode(text: &str) -> Option<ThoughtContent> {
    let captures = episode_regex().captures(text.trim())?;
    let episode_number = captures.get(1)?.as_str().parse::<u32>().ok()?;
    let command_count = captures.get(2)?.as_str().parse::<u32>().ok()?;
    if episode_number == 0 {
        return None;
    }
    Some(ThoughtContent::Episode {
        episode_number,
        command_count,
        raw: text.to_string(),
    })
}

fn decode_fields(fields: &Map<String, Value>) -> ThoughtContent {
    let mut extra: BTreeMap<String, Value> = fields
        .iter()
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    let state_analysis = take_string(&mut extra, "state_analysis");
    let explanation = take_string(&mut extra, "explanation");
    let is_task_complete = match extra.get("is_task_complete") {
        Some(Value::Bool(done)) => {
            let done = *done;
            extra.remove("is_task_complete");
            Some(done)
        }
        _ => None,
    };
    let commands = match extra.get("commands").and_then(decode_commands) {
        Some(commands) => {
            extra.remove("commands");
            Some(commands)
        }
        None => None,
    };

    ThoughtContent::Thinking {
        state_analysis,
        explanation,
        commands,
        is_task_complete,
        extra,
    }
}

fn take_string(fields: &mut BTreeMap<String, Value>, key: &str) -> Option<String> {
    match fields.get(key) {
        Some(Value::String(_)) => match fields.remove(key) {
            Some(Value::String(value)) => Some(value),
            _ => None,
        },
        _ => None,
    }
}

// Every entry must decode, otherwise the whole list stays in `extra`.
fn decode_commands(value: &Value) -> Option<Vec<PlannedCommand>> {
    value.as_array()?.iter().map(decode_command).collect()
}

fn decode_command(value: &Value) -> Option<PlannedCommand> {
    if let Some(text) = value.as_str() {
        return Some(PlannedCommand {
            command_text: text.to_string(),
            timeout_seconds: None,
        });
    }

    let command_text = ["keystrokes", "command", "commandText"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))?
        .to_string();
    let timeout_seconds = ["timeout_sec", "timeout", "timeoutSeconds"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_f64));

    Some(PlannedCommand {
        command_text,
        timeout_seconds,
    })
}

fn push_field(fields: &mut Vec<ThoughtField>, label: &str, value: String) {
    fields.push(ThoughtField {
        label: label.to_string(),
        value,
    });
}

fn first_non_empty_line(text: &str) -> Option<&str> {
    text.lines().map(str::trim).find(|line| !line.is_empty())
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// `plan_next_step` / `planNextStep` -> `Plan next step`.
fn humanize_key(key: &str) -> String {
    let mut words = String::with_capacity(key.len() + 4);
    let mut previous_lower = false;
    for ch in key.chars() {
        if ch == '_' || ch == '-' {
            words.push(' ');
            previous_lower = false;
            continue;
        }
        if ch.is_uppercase() && previous_lower {
            words.push(' ');
        }
        previous_lower = ch.is_lowercase() || ch.is_ascii_digit();
        words.extend(ch.to_lowercase());
    }

    let words = words.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut chars = words.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
