use crate::error::{TrainingError, TrainingResult};
use crate::metric::FeedbackValue;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Stable identifier for a dataset (content hash).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetId(pub String);

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = TrainingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system" => Ok(Self::System),
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            other => Err(TrainingError::unsupported("message role", other)),
        }
    }
}

/// One inference joined to its latest qualifying feedback.
///
/// `input` and `output` hold the serialized JSON exactly as stored by the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    pub variant_name: String,
    pub input: String,
    pub output: String,
    #[serde(rename = "value")]
    pub feedback_value: FeedbackValue,
    pub episode_id: String,
}

impl RawSample {
    /// Short label used in error messages.
    #[must_use]
    pub fn label(&self) -> String {
        format!("sample (episode {}, variant {})", self.episode_id, self.variant_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedMessage {
    pub role: Role,
    pub content: String,
}

/// A training conversation; serialized as one JSONL record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub messages: Vec<RenderedMessage>,
}

impl Conversation {
    /// Check the shape every conversation must have: non-empty, a system
    /// message only in first position, and an assistant message last.
    pub fn validate(&self) -> TrainingResult<()> {
        let Some(last) = self.messages.last() else {
            return Err(TrainingError::structural("conversation", "no messages"));
        };
        if last.role != Role::Assistant {
            return Err(TrainingError::structural(
                "conversation",
                format!("last message has role `{}`, expected `assistant`", last.role),
            ));
        }
        if let Some(idx) =
            self.messages.iter().skip(1).position(|m| m.role == Role::System)
        {
            return Err(TrainingError::structural(
                "conversation",
                format!("system message at position {}", idx + 1),
            ));
        }
        Ok(())
    }
}

pub fn compute_dataset_id(conversations: &[Conversation]) -> TrainingResult<DatasetId> {
    let mut hasher = Sha256::new();

    for conversation in conversations {
        let bytes = serde_json::to_vec(conversation)?;
        hasher.update(bytes);
        hasher.update(b"\n");
    }

    Ok(DatasetId(hex::encode(hasher.finalize())))
}

/// Serialize conversations as newline-delimited JSON.
pub fn to_jsonl(conversations: &[Conversation]) -> TrainingResult<String> {
    let mut out = String::new();
    for conversation in conversations {
        out.push_str(&serde_json::to_string(conversation)?);
        out.push('\n');
    }
    Ok(out)
}
