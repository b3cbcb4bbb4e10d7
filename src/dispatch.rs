use std::future::Future;
use std::panic::AssertUnwindSafe;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use ed25519_dalek::VerifyingKey;
use futures::FutureExt;
use serde_json::json;
use tracing::{debug, error, warn};

use crate::commands::{CommandRegistry, Env};
use crate::interaction::{self, InteractionKind};
use crate::response::InteractionResponse;
use crate::verify;

/// Every way a request can end without a normal interaction response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchError {
    /// Bad or missing signature, or a body that does not decode. The two are
    /// deliberately indistinguishable to the caller.
    Unauthorized,
    UnknownCommand,
    UnknownInteractionType,
    Internal,
}

impl DispatchError {
    pub fn status(self) -> StatusCode {
        match self {
            DispatchError::Unauthorized => StatusCode::UNAUTHORIZED,
            DispatchError::UnknownCommand | DispatchError::UnknownInteractionType => {
                StatusCode::BAD_REQUEST
            }
            DispatchError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            DispatchError::Unauthorized => "Invalid request signature",
            DispatchError::UnknownCommand => "Unknown command",
            DispatchError::UnknownInteractionType => "Unknown interaction type",
            DispatchError::Internal => "Internal Server Error",
        }
    }
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = json!({ "status": status.as_u16(), "error": self.message() });
        (status, Json(body)).into_response()
    }
}

/// Run a handler, turning both errors and panics into `Internal`.
async fn run_handler<F>(name: &str, handler: F) -> Result<InteractionResponse, DispatchError>
where
    F: Future<Output = anyhow::Result<InteractionResponse>>,
{
    match AssertUnwindSafe(handler).catch_unwind().await {
        Ok(Ok(response)) => Ok(response),
        Ok(Err(e)) => {
            error!("Handler '{}' failed: {:#}", name, e);
            Err(DispatchError::Internal)
        }
        Err(_) => {
            error!("Handler '{}' panicked", name);
            Err(DispatchError::Internal)
        }
    }
}

/// Verify, decode, classify and route one interaction request.
///
/// `body` is the raw request body, used for both the signature check and
/// decoding.
pub async fn dispatch(
    registry: &CommandRegistry,
    env: &Env,
    public_key: &VerifyingKey,
    signature: Option<&str>,
    timestamp: Option<&str>,
    body: &[u8],
) -> Result<InteractionResponse, DispatchError> {
    if !verify::verify(body, signature, timestamp, public_key) {
        warn!("Rejected interaction with invalid signature");
        return Err(DispatchError::Unauthorized);
    }

    let interaction = match interaction::decode(body) {
        Ok(interaction) => interaction,
        Err(e) => {
            warn!("Rejected signed interaction: {}", e);
            return Err(DispatchError::Unauthorized);
        }
    };

    debug!(
        "Interaction {} ({:?}) from {}",
        interaction.id.as_deref().unwrap_or("-"),
        interaction.kind,
        interaction.invoker()
    );

    match interaction.kind {
        InteractionKind::Ping => Ok(InteractionResponse::pong()),
        InteractionKind::Command => {
            let data = match interaction.command_data() {
                Ok(data) => data,
                Err(e) => {
                    warn!("Unreadable command data: {:#}", e);
                    return Err(DispatchError::UnknownCommand);
                }
            };
            let Some(command) = registry.get(&data.name) else {
                warn!("Unknown command: {}", data.name);
                return Err(DispatchError::UnknownCommand);
            };
            debug!("Command /{} with {} option(s)", data.name, data.options.len());
            run_handler(&data.name, command.execute(&interaction, env)).await
        }
        InteractionKind::ModalSubmit => {
            let handler = interaction
                .modal_custom_id()
                .and_then(|id| registry.modal_handler(id).map(|h| (id, h)));
            let Some((modal_id, command)) = handler else {
                warn!(
                    "No handler for modal {:?}",
                    interaction.modal_custom_id()
                );
                return Err(DispatchError::UnknownInteractionType);
            };
            run_handler(modal_id, command.handle_modal(&interaction, env)).await
        }
        InteractionKind::Unrecognized(code) => {
            warn!("Unknown interaction type: {:?}", code);
            Err(DispatchError::UnknownInteractionType)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{Command, CommandDefinition};
    use crate::discord::tests::FakeChannels;
    use crate::interaction::Interaction;
    use crate::verify::tests::{sign, signing_key};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct Failing;

    #[async_trait]
    impl Command for Failing {
        fn definition(&self) -> CommandDefinition {
            CommandDefinition {
                name: "fail".to_string(),
                description: "always errors".to_string(),
            }
        }

        async fn execute(&self, _: &Interaction, _: &Env) -> anyhow::Result<InteractionResponse> {
            anyhow::bail!("boom")
        }
    }

    struct Panicking;

    #[async_trait]
    impl Command for Panicking {
        fn definition(&self) -> CommandDefinition {
            CommandDefinition {
                name: "panic".to_string(),
                description: "always panics".to_string(),
            }
        }

        async fn execute(&self, _: &Interaction, _: &Env) -> anyhow::Result<InteractionResponse> {
            panic!("handler bug")
        }
    }

    fn registry() -> CommandRegistry {
        let mut registry = CommandRegistry::with_builtin_commands().unwrap();
        registry.register(Arc::new(Failing)).unwrap();
        registry.register(Arc::new(Panicking)).unwrap();
        registry
    }

    fn env() -> Env {
        Env {
            application_id: "app".to_string(),
            channels: Arc::new(FakeChannels::default()),
        }
    }

    async fn signed(body: &str) -> Result<InteractionResponse, DispatchError> {
        let key = signing_key();
        let sig = sign(&key, "1700000000", body.as_bytes());
        dispatch(
            &registry(),
            &env(),
            &key.verifying_key(),
            Some(&sig),
            Some("1700000000"),
            body.as_bytes(),
        )
        .await
    }

    #[tokio::test]
    async fn test_ping_returns_pong() {
        assert_eq!(
            signed(r#"{"type":1}"#).await,
            Ok(InteractionResponse::pong())
        );
    }

    #[tokio::test]
    async fn test_missing_header_rejected_before_decode() {
        // With both headers this body routes to UnknownCommand, so getting
        // Unauthorized back means the decoder never ran.
        let key = signing_key();
        let body = r#"{"type":2,"data":{"name":"nope"}}"#;
        let sig = sign(&key, "1700000000", body.as_bytes());
        assert_eq!(signed(body).await, Err(DispatchError::UnknownCommand));

        for (signature, timestamp) in [(None, Some("1700000000")), (Some(sig.as_str()), None)] {
            let result = dispatch(
                &registry(),
                &env(),
                &key.verifying_key(),
                signature,
                timestamp,
                body.as_bytes(),
            )
            .await;
            assert_eq!(result, Err(DispatchError::Unauthorized));
        }
    }

    #[tokio::test]
    async fn test_bad_json_looks_like_bad_signature() {
        assert_eq!(signed("{oops").await, Err(DispatchError::Unauthorized));
        assert_eq!(
            signed(r#"{"data":{}}"#).await,
            Err(DispatchError::Unauthorized)
        );
        assert_eq!(signed("[1]").await, Err(DispatchError::Unauthorized));
    }

    #[tokio::test]
    async fn test_unknown_command() {
        assert_eq!(
            signed(r#"{"type":2,"data":{"name":"nope"}}"#).await,
            Err(DispatchError::UnknownCommand)
        );
        assert_eq!(
            signed(r#"{"type":2}"#).await,
            Err(DispatchError::UnknownCommand)
        );
    }

    #[tokio::test]
    async fn test_unknown_modal_falls_through_to_unknown_type() {
        assert_eq!(
            signed(r#"{"type":5,"data":{"custom_id":"other_modal"}}"#).await,
            Err(DispatchError::UnknownInteractionType)
        );
    }

    #[tokio::test]
    async fn test_unrecognized_type() {
        assert_eq!(
            signed(r#"{"type":3,"data":{}}"#).await,
            Err(DispatchError::UnknownInteractionType)
        );
        assert_eq!(
            signed(r#"{"type":"2","data":{"name":"hello"}}"#).await,
            Err(DispatchError::UnknownInteractionType)
        );
        assert_eq!(
            signed(r#"{"type":-1}"#).await,
            Err(DispatchError::UnknownInteractionType)
        );
    }

    #[tokio::test]
    async fn test_malformed_user_does_not_block_routing() {
        let response = signed(r#"{"type":2,"channel_id":7,"user":{"id":5},"data":{"name":"hello"}}"#)
            .await
            .unwrap();
        assert_eq!(response, InteractionResponse::text_display("Hello World"));
    }

    #[tokio::test]
    async fn test_handler_error_and_panic_become_internal() {
        assert_eq!(
            signed(r#"{"type":2,"data":{"name":"fail"}}"#).await,
            Err(DispatchError::Internal)
        );
        assert_eq!(
            signed(r#"{"type":2,"data":{"name":"panic"}}"#).await,
            Err(DispatchError::Internal)
        );
    }

    #[tokio::test]
    async fn test_hello_command() {
        let response = signed(r#"{"type":2,"data":{"name":"hello"}}"#)
            .await
            .unwrap();
        assert_eq!(response, InteractionResponse::text_display("Hello World"));
    }

    #[test]
    fn test_error_statuses() {
        assert_eq!(DispatchError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(DispatchError::UnknownCommand.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            DispatchError::UnknownInteractionType.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            DispatchError::Internal.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
