use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::commands::CommandDefinition;

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Author {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Message {
    pub id: String,
    #[serde(default)]
    pub content: String,
    pub author: Author,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PinnedItem {
    pub message: Message,
}

#[derive(Debug, Deserialize)]
struct PinsPage {
    #[serde(default)]
    items: Vec<PinnedItem>,
}

#[derive(Debug, Serialize)]
struct MessageBody<'a> {
    content: &'a str,
}

/// A failed Discord REST call, with enough context to diagnose it from logs.
#[derive(Debug, Clone, thiserror::Error)]
#[error(
    "Error {action}: {method} {url} -> {}{}",
    describe_status(.status),
    describe_body(.body)
)]
pub struct ApiFailure {
    pub action: &'static str,
    pub method: Method,
    pub url: String,
    /// `None` when the request never got a response (connect error, timeout)
    pub status: Option<StatusCode>,
    pub body: Option<String>,
}

fn describe_status(status: &Option<StatusCode>) -> String {
    match status {
        Some(status) => status.to_string(),
        None => "no response".to_string(),
    }
}

fn describe_body(body: &Option<String>) -> String {
    match body {
        Some(body) => format!("\n\n{}", body),
        None => String::new(),
    }
}

/// The channel operations the summary workflow needs. Every call is a single
/// attempt; failures come back as values so callers can branch on them.
#[async_trait]
pub trait ChannelApi: Send + Sync {
    async fn list_pins(&self, channel_id: &str) -> Result<Vec<PinnedItem>, ApiFailure>;

    async fn create_message(&self, channel_id: &str, content: &str)
        -> Result<Message, ApiFailure>;

    async fn edit_message(
        &self,
        channel_id: &str,
        message_id: &str,
        content: &str,
    ) -> Result<(), ApiFailure>;

    async fn pin_message(&self, channel_id: &str, message_id: &str) -> Result<(), ApiFailure>;
}

pub struct DiscordClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl DiscordClient {
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send one request and turn any non-success outcome into an `ApiFailure`.
    async fn send<B: Serialize + ?Sized>(
        &self,
        action: &'static str,
        method: Method,
        url: String,
        body: Option<&B>,
    ) -> Result<reqwest::Response, ApiFailure> {
        debug!("Discord API {} {}", method, url);

        let mut request = self
            .client
            .request(method.clone(), url.as_str())
            .header("Authorization", format!("Bot {}", self.token));
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                return Err(ApiFailure {
                    action,
                    method,
                    url,
                    status: None,
                    body: Some(e.to_string()),
                })
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.ok().filter(|b| !b.is_empty());
            return Err(ApiFailure {
                action,
                method,
                url,
                status: Some(status),
                body,
            });
        }

        Ok(response)
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        action: &'static str,
        method: Method,
        url: String,
        response: reqwest::Response,
    ) -> Result<T, ApiFailure> {
        let status = response.status();
        response.json::<T>().await.map_err(|e| ApiFailure {
            action,
            method,
            url,
            status: Some(status),
            body: Some(format!("unreadable response body: {}", e)),
        })
    }

    /// Overwrite the application's global command list.
    pub async fn register_commands(
        &self,
        application_id: &str,
        commands: &[CommandDefinition],
    ) -> Result<serde_json::Value> {
        let url = self.url(&format!("/applications/{}/commands", application_id));
        info!("Registering {} command(s) at {}", commands.len(), url);

        let response = self
            .send("registering commands", Method::PUT, url, Some(commands))
            .await?;
        response
            .json()
            .await
            .context("Failed to parse command registration response")
    }
}

#[async_trait]
impl ChannelApi for DiscordClient {
    async fn list_pins(&self, channel_id: &str) -> Result<Vec<PinnedItem>, ApiFailure> {
        let url = self.url(&format!("/channels/{}/messages/pins", channel_id));
        let response = self
            .send::<()>("fetching pinned messages", Method::GET, url.clone(), None)
            .await?;
        let page: PinsPage =
            Self::read_json("fetching pinned messages", Method::GET, url, response).await?;
        Ok(page.items)
    }

    async fn create_message(
        &self,
        channel_id: &str,
        content: &str,
    ) -> Result<Message, ApiFailure> {
        let url = self.url(&format!("/channels/{}/messages", channel_id));
        let response = self
            .send(
                "creating message",
                Method::POST,
                url.clone(),
                Some(&MessageBody { content }),
            )
            .await?;
        Self::read_json("creating message", Method::POST, url, response).await
    }

    async fn edit_message(
        &self,
        channel_id: &str,
        message_id: &str,
        content: &str,
    ) -> Result<(), ApiFailure> {
        let url = self.url(&format!("/channels/{}/messages/{}", channel_id, message_id));
        self.send(
            "editing message",
            Method::PATCH,
            url,
            Some(&MessageBody { content }),
        )
        .await?;
        Ok(())
    }

    async fn pin_message(&self, channel_id: &str, message_id: &str) -> Result<(), ApiFailure> {
        let url = self.url(&format!(
            "/channels/{}/messages/pins/{}",
            channel_id, message_id
        ));
        self.send::<()>("pinning message", Method::PUT, url, None)
            .await?;
        Ok(())
    }
}
