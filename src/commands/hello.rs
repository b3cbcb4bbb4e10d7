use anyhow::Result;
use async_trait::async_trait;

use super::{Command, CommandDefinition, Env};
use crate::interaction::Interaction;
use crate::response::InteractionResponse;

pub struct HelloCommand;

#[async_trait]
impl Command for HelloCommand {
    fn definition(&self) -> CommandDefinition {
        CommandDefinition {
            name: "hello".to_string(),
            description: "Test if the bot is working".to_string(),
        }
    }

    async fn execute(&self, _interaction: &Interaction, _env: &Env) -> Result<InteractionResponse> {
        Ok(InteractionResponse::text_display("Hello World"))
    }
}
