pub mod hello;
pub mod summary;

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use crate::discord::ChannelApi;
use crate::interaction::Interaction;
use crate::response::InteractionResponse;

/// Metadata pushed to Discord when registering commands
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CommandDefinition {
    pub name: String,
    pub description: String,
}

/// What a handler gets besides the interaction itself. Built once at startup.
#[derive(Clone)]
pub struct Env {
    pub application_id: String,
    pub channels: Arc<dyn ChannelApi>,
}

/// A slash command, optionally owning a modal whose submissions it handles.
#[async_trait]
pub trait Command: Send + Sync {
    fn definition(&self) -> CommandDefinition;

    async fn execute(&self, interaction: &Interaction, env: &Env) -> Result<InteractionResponse>;

    fn modal_id(&self) -> Option<&'static str> {
        None
    }

    async fn handle_modal(
        &self,
        _interaction: &Interaction,
        _env: &Env,
    ) -> Result<InteractionResponse> {
        anyhow::bail!("Command '{}' has no modal handler", self.definition().name)
    }
}

/// Lookup from command name and modal id to handler. Filled at startup and
/// read-only afterwards.
#[derive(Clone, Default)]
pub struct CommandRegistry {
    commands: HashMap<String, Arc<dyn Command>>,
    modals: HashMap<String, Arc<dyn Command>>,
    order: Vec<String>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every command this bot ships with.
    pub fn with_builtin_commands() -> Result<Self> {
        let mut registry = Self::new();
        registry.register(Arc::new(hello::HelloCommand))?;
        registry.register(Arc::new(summary::SummaryCommand))?;
        Ok(registry)
    }

    pub fn register(&mut self, command: Arc<dyn Command>) -> Result<()> {
        let definition = command.definition();
        if self.commands.contains_key(&definition.name) {
            anyhow::bail!("Command '{}' is already registered", definition.name);
        }
        if let Some(modal_id) = command.modal_id() {
            if self.modals.contains_key(modal_id) {
                anyhow::bail!("Modal '{}' is already registered", modal_id);
            }
            self.modals.insert(modal_id.to_string(), command.clone());
        }

        info!("Registered command: /{}", definition.name);
        self.order.push(definition.name.clone());
        self.commands.insert(definition.name, command);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Command>> {
        self.commands.get(name)
    }

    pub fn modal_handler(&self, modal_id: &str) -> Option<&Arc<dyn Command>> {
        self.modals.get(modal_id)
    }

    /// Definitions in registration order.
    pub fn definitions(&self) -> Vec<CommandDefinition> {
        self.order
            .iter()
            .filter_map(|name| self.commands.get(name))
            .map(|c| c.definition())
            .collect()
    }
}
