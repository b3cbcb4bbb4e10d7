use serde::Serialize;
use serde_json::{json, Value};

pub const PONG: u8 = 1;
pub const CHANNEL_MESSAGE_WITH_SOURCE: u8 = 4;
pub const MODAL: u8 = 9;

pub const FLAG_EPHEMERAL: u64 = 1 << 6;
pub const FLAG_IS_COMPONENTS_V2: u64 = 1 << 15;

pub const COMPONENT_TEXT_INPUT: u8 = 4;
pub const COMPONENT_TEXT_DISPLAY: u8 = 10;
pub const COMPONENT_LABEL: u8 = 18;

pub const TEXT_INPUT_PARAGRAPH: u8 = 2;

/// Body returned to Discord for a handled interaction.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct InteractionResponse {
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ResponseData>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ResponseData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flags: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<Vec<Value>>,
}

impl InteractionResponse {
    pub fn pong() -> Self {
        Self {
            kind: PONG,
            data: None,
        }
    }

    /// Reply visible only to the user who triggered the interaction.
    pub fn ephemeral(content: impl Into<String>) -> Self {
        Self {
            kind: CHANNEL_MESSAGE_WITH_SOURCE,
            data: Some(ResponseData {
                flags: Some(FLAG_EPHEMERAL),
                content: Some(content.into()),
                ..Default::default()
            }),
        }
    }

    /// Components-v2 message made of a single text display.
    pub fn text_display(content: impl Into<String>) -> Self {
        Self {
            kind: CHANNEL_MESSAGE_WITH_SOURCE,
            data: Some(ResponseData {
                flags: Some(FLAG_IS_COMPONENTS_V2),
                components: Some(vec![json!({
                    "type": COMPONENT_TEXT_DISPLAY,
                    "content": content.into(),
                })]),
                ..Default::default()
            }),
        }
    }

    pub fn modal(custom_id: &str, title: &str, components: Vec<Value>) -> Self {
        Self {
            kind: MODAL,
            data: Some(ResponseData {
                custom_id: Some(custom_id.to_string()),
                title: Some(title.to_string()),
                components: Some(components),
                ..Default::default()
            }),
        }
    }
}

#[cfg(test)]
impl InteractionResponse {
    pub fn content(&self) -> Option<&str> {
        self.data.as_ref().and_then(|d| d.content.as_deref())
    }
}

/// A labelled paragraph input for use inside a modal.
pub fn paragraph_input(
    label: &str,
    custom_id: &str,
    value: &str,
    max_length: usize,
) -> Value {
    json!({
        "type": COMPONENT_LABEL,
        "label": label,
        "component": {
            "type": COMPONENT_TEXT_INPUT,
            "custom_id": custom_id,
            "style": TEXT_INPUT_PARAGRAPH,
            "value": value,
            "max_length": max_length,
        },
    })
}
