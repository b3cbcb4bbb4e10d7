//! `/summary`: keeps one pinned, bot-authored summary message per channel.
//!
//! The command opens a modal pre-filled with the current summary. Submitting
//! the modal edits that message in place, or creates and pins a new one when
//! the channel has none yet.

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{info, warn};

use super::{Command, CommandDefinition, Env};
use crate::discord::{ChannelApi, Message, PinnedItem};
use crate::interaction::Interaction;
use crate::response::{paragraph_input, InteractionResponse};

pub const MODAL_ID: &str = "summary_modal";
pub const MODAL_TEXT_ID: &str = "summary_text";
pub const SUMMARY_HEADER: &str = "**CHANNEL SUMMARY**\n";
pub const SPACER: &str = "------------------------------------------------\n";

/// Discord caps message content at 2000 characters, prefix included.
const MAX_SUMMARY_LEN: usize = 2000 - SUMMARY_HEADER.len() - SPACER.len();

pub fn summary_content(text: &str) -> String {
    format!("{}{}{}", SUMMARY_HEADER, SPACER, text)
}

/// First pinned message written by us that looks like a summary. Pin order is
/// whatever Discord returns; if several match, the first one wins.
pub fn find_in_pins<'a>(pins: &'a [PinnedItem], application_id: &str) -> Option<&'a Message> {
    pins.iter().map(|p| &p.message).find(|m| {
        m.author.id == application_id
            && m.content
                .strip_prefix(SUMMARY_HEADER)
                .is_some_and(|rest| rest.starts_with(SPACER))
    })
}

/// Look up the channel's summary message. A failed pin listing is logged and
/// treated as "no summary yet".
pub async fn find_existing(
    channels: &dyn ChannelApi,
    channel_id: &str,
    application_id: &str,
) -> Option<Message> {
    match channels.list_pins(channel_id).await {
        Ok(pins) => find_in_pins(&pins, application_id).cloned(),
        Err(failure) => {
            warn!("{}", failure);
            None
        }
    }
}

/// Text of a summary message without the fixed header.
pub fn summary_text(message: &Message) -> &str {
    message
        .content
        .strip_prefix(SUMMARY_HEADER)
        .and_then(|rest| rest.strip_prefix(SPACER))
        .unwrap_or(&message.content)
}

pub fn summary_modal(existing: Option<&Message>) -> InteractionResponse {
    let (title, prefill) = match existing {
        Some(message) => ("Edit Channel Summary", summary_text(message)),
        None => ("Create Channel Summary", ""),
    };

    InteractionResponse::modal(
        MODAL_ID,
        title,
        vec![paragraph_input(
            "Channel Summary",
            MODAL_TEXT_ID,
            prefill,
            MAX_SUMMARY_LEN,
        )],
    )
}

/// How a submission ended. Each variant tells the user what state the
/// channel is actually in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    CreateFailed,
    CreatedNotPinned,
    CreatedAndPinned,
    EditFailed,
    Updated,
}

impl SubmitOutcome {
    pub fn message(self) -> &'static str {
        match self {
            SubmitOutcome::CreateFailed => {
                "Failed to create new summary message. Please try again later."
            }
            SubmitOutcome::CreatedNotPinned => {
                "Created, but failed to pin, new summary message. Please pin it manually."
            }
            SubmitOutcome::CreatedAndPinned => "Created and pinned new summary message.",
            SubmitOutcome::EditFailed => {
                "Failed to edit pinned summary message. Please try again later."
            }
            SubmitOutcome::Updated => "Updated pinned summary message.",
        }
    }
}

/// Create-or-update the summary. At most one create and one pin per call.
pub async fn upsert_summary(
    channels: &dyn ChannelApi,
    channel_id: &str,
    application_id: &str,
    text: &str,
) -> SubmitOutcome {
    let content = summary_content(text);

    let Some(existing) = find_existing(channels, channel_id, application_id).await else {
        let created = match channels.create_message(channel_id, &content).await {
            Ok(message) => message,
            Err(failure) => {
                warn!("{}", failure);
                return SubmitOutcome::CreateFailed;
            }
        };

        if let Err(failure) = channels.pin_message(channel_id, &created.id).await {
            warn!("{}", failure);
            return SubmitOutcome::CreatedNotPinned;
        }
        info!(
            "Created and pinned summary {} in channel {}",
            created.id, channel_id
        );
        return SubmitOutcome::CreatedAndPinned;
    };

    if let Err(failure) = channels
        .edit_message(channel_id, &existing.id, &content)
        .await
    {
        warn!("{}", failure);
        return SubmitOutcome::EditFailed;
    }
    info!(
        "Updated summary {} in channel {}",
        existing.id, channel_id
    );
    SubmitOutcome::Updated
}

pub struct SummaryCommand;

#[async_trait]
impl Command for SummaryCommand {
    fn definition(&self) -> CommandDefinition {
        CommandDefinition {
            name: "summary".to_string(),
            description: "Create or edit this channel's pinned summary message".to_string(),
        }
    }

    async fn execute(&self, interaction: &Interaction, env: &Env) -> Result<InteractionResponse> {
        let channel_id = interaction.channel_id()?;
        let existing =
            find_existing(env.channels.as_ref(), channel_id, &env.application_id).await;
        Ok(summary_modal(existing.as_ref()))
    }

    fn modal_id(&self) -> Option<&'static str> {
        Some(MODAL_ID)
    }

    async fn handle_modal(
        &self,
        interaction: &Interaction,
        env: &Env,
    ) -> Result<InteractionResponse> {
        let channel_id = interaction.channel_id()?;
        let data = interaction.modal_data()?;
        let text = data
            .field(MODAL_TEXT_ID)
            .with_context(|| format!("Modal submission has no '{}' field", MODAL_TEXT_ID))?;

        let outcome =
            upsert_summary(env.channels.as_ref(), channel_id, &env.application_id, text).await;
        info!(
            "Summary submission from {} in {}: {:?}",
            interaction.invoker(),
            channel_id,
            outcome
        );
        Ok(InteractionResponse::ephemeral(outcome.message()))
    }
}
