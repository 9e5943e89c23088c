use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Participant role on a transcript message. Closed set: the protocol knows
/// no other participants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    pub fn is_user(self) -> bool {
        self == Role::User
    }

    pub fn is_assistant(self) -> bool {
        self == Role::Assistant
    }
}

impl AsRef<str> for Role {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl TryFrom<&str> for Role {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            _ => Err(format!("invalid role: {value}")),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from(value.as_str())
    }
}

impl From<Role> for String {
    fn from(value: Role) -> Self {
        value.as_str().to_string()
    }
}

/// One transcript turn. Immutable once created; transcripts only ever append.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// The request and response body exchanged with the backend.
///
/// `thread_id` is backend-assigned and opaque; `None` means no thread exists
/// yet. The same shape travels in both directions, with the role authority
/// split enforced by [`MessageEnvelope::ensure_outbound`] and
/// [`MessageEnvelope::ensure_inbound`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageEnvelope {
    #[serde(default)]
    pub thread_id: Option<String>,
    pub message: Message,
}

impl MessageEnvelope {
    pub fn outbound(thread_id: Option<String>, content: impl Into<String>) -> Self {
        Self {
            thread_id,
            message: Message::user(content),
        }
    }

    /// The client is the sole authority for user content.
    pub fn ensure_outbound(&self) -> Result<(), SchemaError> {
        if self.message.role.is_user() {
            Ok(())
        } else {
            Err(SchemaError::WrongDirection {
                expected: Role::User,
                found: self.message.role,
            })
        }
    }

    /// The backend is the sole authority for assistant content.
    pub fn ensure_inbound(&self) -> Result<(), SchemaError> {
        if self.message.role.is_assistant() {
            Ok(())
        } else {
            Err(SchemaError::WrongDirection {
                expected: Role::Assistant,
                found: self.message.role,
            })
        }
    }
}

/// Malformed local or remote data. Never coerced; always fails loudly.
#[derive(Debug)]
pub enum SchemaError {
    /// The value is not a JSON object where one was required.
    NotAnObject(&'static str),
    /// A required field is absent.
    MissingField(&'static str),
    /// The role is not one of the two enumerated values.
    InvalidRole(String),
    /// `content` is present but not a string.
    InvalidContent,
    /// `thread_id` is present but neither a string nor null.
    InvalidThreadId,
    /// The body could not be decoded as JSON at all.
    InvalidJson(String),
    /// The envelope carries a role the sending side has no authority over.
    WrongDirection { expected: Role, found: Role },
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaError::NotAnObject(what) => write!(f, "{what} is not a JSON object"),
            SchemaError::MissingField(field) => write!(f, "missing required field: {field}"),
            SchemaError::InvalidRole(value) => write!(f, "invalid role: {value}"),
            SchemaError::InvalidContent => write!(f, "message content must be a string"),
            SchemaError::InvalidThreadId => write!(f, "thread_id must be a string or null"),
            SchemaError::InvalidJson(detail) => write!(f, "invalid JSON body: {detail}"),
            SchemaError::WrongDirection { expected, found } => write!(
                f,
                "envelope role must be {} here, got {}",
                expected.as_str(),
                found.as_str()
            ),
        }
    }
}

impl std::error::Error for SchemaError {}

/// Validate an untyped value as a [`Message`].
///
/// Empty content is valid at this layer; emptiness policy belongs to the UI.
pub fn validate_message(value: &Value) -> Result<Message, SchemaError> {
    let object = value.as_object().ok_or(SchemaError::NotAnObject("message"))?;
    let role_value = object.get("role").ok_or(SchemaError::MissingField("role"))?;
    let role_str = role_value
        .as_str()
        .ok_or_else(|| SchemaError::InvalidRole(role_value.to_string()))?;
    let role = Role::try_from(role_str).map_err(SchemaError::InvalidRole)?;
    let content = object
        .get("content")
        .ok_or(SchemaError::MissingField("content"))?
        .as_str()
        .ok_or(SchemaError::InvalidContent)?;
    Ok(Message::new(role, content))
}

/// Validate an untyped value as a [`MessageEnvelope`].
///
/// Applied twice per round trip: to the outbound envelope before it is sent
/// and to the inbound body after it is received. The backend is never trusted
/// to return well-shaped data.
pub fn validate_envelope(value: &Value) -> Result<MessageEnvelope, SchemaError> {
    let object = value
        .as_object()
        .ok_or(SchemaError::NotAnObject("envelope"))?;
    let thread_id = match object.get("thread_id") {
        None | Some(Value::Null) => None,
        Some(Value::String(id)) => Some(id.clone()),
        Some(_) => return Err(SchemaError::InvalidThreadId),
    };
    let message_value = object
        .get("message")
        .ok_or(SchemaError::MissingField("message"))?;
    let message = validate_message(message_value)?;
    Ok(MessageEnvelope { thread_id, message })
}

pub mod client;
