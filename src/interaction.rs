use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;

/// The interaction types this bot understands. Anything else is kept as
/// `Unrecognized`, with its raw code when the type is an unsigned integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionKind {
    Ping,
    Command,
    ModalSubmit,
    Unrecognized(Option<u64>),
}

impl InteractionKind {
    pub fn from_code(code: u64) -> Self {
        match code {
            1 => InteractionKind::Ping,
            2 => InteractionKind::Command,
            5 => InteractionKind::ModalSubmit,
            other => InteractionKind::Unrecognized(Some(other)),
        }
    }

    fn from_value(value: &Value) -> Self {
        value
            .as_u64()
            .map_or(InteractionKind::Unrecognized(None), Self::from_code)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("interaction body is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("interaction body is not a JSON object")]
    NotAnObject,
    #[error("interaction body has no type")]
    MissingType,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
}

/// A decoded interaction. `data` is left untyped until a handler asks for it.
#[derive(Debug, Clone)]
pub struct Interaction {
    pub kind: InteractionKind,
    pub id: Option<String>,
    pub channel_id: Option<String>,
    pub data: Value,
    /// Guild interactions carry the user under `member`, DMs under `user`
    pub user: Option<User>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommandData {
    pub name: String,
    #[serde(default)]
    pub options: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModalField {
    pub custom_id: String,
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct ModalSubmitData {
    pub fields: Vec<ModalField>,
}

impl ModalSubmitData {
    pub fn field(&self, custom_id: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.custom_id == custom_id)
            .map(|f| f.value.as_str())
    }
}

#[derive(Debug, Deserialize)]
struct RawModalData {
    #[serde(default)]
    components: Vec<RawComponent>,
}

/// Submitted components come back either as action rows (`components`) or as
/// labels wrapping a single input (`component`).
#[derive(Debug, Deserialize)]
struct RawComponent {
    #[serde(default)]
    custom_id: Option<String>,
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    component: Option<Box<RawComponent>>,
    #[serde(default)]
    components: Vec<RawComponent>,
}

fn flatten_fields(components: Vec<RawComponent>, out: &mut Vec<ModalField>) {
    for component in components {
        if let (Some(custom_id), Some(value)) = (component.custom_id, component.value) {
            out.push(ModalField { custom_id, value });
        }
        if let Some(inner) = component.component {
            flatten_fields(vec![*inner], out);
        }
        flatten_fields(component.components, out);
    }
}

fn user_from(value: &Value) -> Option<User> {
    User::deserialize(value).ok()
}

/// Decode the exact bytes that passed signature verification.
///
/// Only the envelope is checked: an object with a `type`. Everything else is
/// read leniently and left for handlers to validate.
pub fn decode(body: &[u8]) -> Result<Interaction, DecodeError> {
    let Value::Object(mut fields) = serde_json::from_slice(body)? else {
        return Err(DecodeError::NotAnObject);
    };

    let kind = match fields.get("type") {
        None | Some(Value::Null) => return Err(DecodeError::MissingType),
        Some(code) => InteractionKind::from_value(code),
    };

    let text = |key: &str| fields.get(key).and_then(Value::as_str).map(str::to_string);
    let id = text("id");
    let channel_id = text("channel_id");
    let user = fields
        .get("member")
        .and_then(|m| m.get("user"))
        .and_then(user_from)
        .or_else(|| fields.get("user").and_then(user_from));

    Ok(Interaction {
        kind,
        id,
        channel_id,
        data: fields.remove("data").unwrap_or(Value::Null),
        user,
    })
}

impl Interaction {
    pub fn modal_custom_id(&self) -> Option<&str> {
        self.data.get("custom_id").and_then(Value::as_str)
    }

    pub fn channel_id(&self) -> Result<&str> {
        self.channel_id
            .as_deref()
            .context("Interaction has no channel_id")
    }

    pub fn command_data(&self) -> Result<CommandData> {
        CommandData::deserialize(&self.data).context("Invalid application command data")
    }

    pub fn modal_data(&self) -> Result<ModalSubmitData> {
        let raw = RawModalData::deserialize(&self.data).context("Invalid modal submit data")?;
        let mut fields = Vec::new();
        flatten_fields(raw.components, &mut fields);
        Ok(ModalSubmitData { fields })
    }

    /// Short description of who triggered the interaction, for logs.
    pub fn invoker(&self) -> String {
        match &self.user {
            Some(User {
                id,
                username: Some(name),
            }) => format!("{} ({})", name, id),
            Some(user) => user.id.clone(),
            None => "unknown".to_string(),
        }
    }
}
