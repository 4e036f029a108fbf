//! Turning a game snapshot into one validated action.
//!
//! Each call walks `build prompt -> send -> sanitize -> parse/validate` and
//! ends in exactly one of three ways: an accepted response, the catalog's idle
//! action after `max_attempts` rejected answers, or a transport error that the
//! client could not recover from.

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::catalog::ActionCatalog;
use crate::client::LlmClient;
use crate::errors::{Rejection, TransportResult};
use crate::normalize::normalize;
use crate::prompt::{GameSnapshot, PromptBuilder};
use crate::sanitize::sanitize;
use crate::transport::ChatTransport;
use crate::types::{ActionResponse, Turn};

/// The action chosen for one step
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub response: ActionResponse,
    /// Requests sent to the model, including the accepted one.
    pub attempts: u32,
    /// True when every answer was rejected and the idle action was substituted.
    pub fell_back: bool,
}

pub struct ActionSelector<T> {
    client: LlmClient<T>,
    prompts: PromptBuilder,
    max_attempts: u32,
    feedback_on_retry: bool,
}

impl<T: ChatTransport> ActionSelector<T> {
    pub fn new(client: LlmClient<T>, prompts: PromptBuilder, max_attempts: u32) -> Self {
        Self {
            client,
            prompts,
            max_attempts: max_attempts.max(1),
            feedback_on_retry: false,
        }
    }

    /// On a rejected answer, resend with a note explaining the rejection
    /// instead of resending the identical request.
    pub fn with_feedback_on_retry(mut self, enabled: bool) -> Self {
        self.feedback_on_retry = enabled;
        self
    }

    pub fn client(&self) -> &LlmClient<T> {
        &self.client
    }

    /// Asks the model for the next action.
    ///
    /// Parse and validation failures never escape: they are retried and then
    /// replaced by the idle action. Only transport errors are returned.
    pub async fn select(
        &self,
        catalog: &ActionCatalog,
        snapshot: &GameSnapshot<'_>,
    ) -> TransportResult<Selection> {
        let conversation = self.prompts.build(catalog, snapshot);
        let profile = self.client.profile();
        let mut turns = normalize(
            &conversation,
            profile.supports_system_role,
            profile.context_budget,
        );

        for attempt in 1..=self.max_attempts {
            for turn in &turns {
                debug!(role = %turn.role, content = %turn.content, "Sending turn");
            }

            let raw = self.client.send(&turns, true).await?;
            let clean = sanitize(&raw);
            debug!(attempt, response = %clean, "Model answered");

            match parse_action(&clean, catalog) {
                Ok(response) => {
                    info!(attempt, action = %response.chosen_action, "Accepted action");
                    return Ok(Selection {
                        response,
                        attempts: attempt,
                        fell_back: false,
                    });
                }
                Err(rejection) => {
                    warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        %rejection,
                        "Rejected model answer"
                    );
                    if self.feedback_on_retry {
                        let mut retry = conversation.clone();
                        retry.push(Turn::assistant(clean));
                        retry.push(Turn::user(format!(
                            "Your previous answer was rejected: {}. Answer again with a JSON \
object whose `chosen_action` is one of the available actions.",
                            rejection
                        )));
                        turns = normalize(&retry, profile.supports_system_role, profile.context_budget);
                    }
                }
            }
        }

        warn!(
            attempts = self.max_attempts,
            fallback = catalog.idle_action(),
            "No valid action from model, falling back"
        );
        Ok(Selection {
            response: ActionResponse::named(catalog.idle_action()),
            attempts: self.max_attempts,
            fell_back: true,
        })
    }
}

/// Parses sanitized model output and checks the chosen action against the catalog.
pub fn parse_action(text: &str, catalog: &ActionCatalog) -> Result<ActionResponse, Rejection> {
    let value: Value = serde_json::from_str(text).map_err(|e| Rejection::Parse(e.to_string()))?;
    let Value::Object(mut fields) = value else {
        return Err(Rejection::Parse("expected a JSON object".to_string()));
    };

    let chosen_action = match fields.remove("chosen_action") {
        Some(Value::String(action)) => action,
        _ => return Err(Rejection::MissingChosenAction),
    };
    if !catalog.contains(&chosen_action) {
        return Err(Rejection::UnknownAction(chosen_action));
    }

    Ok(ActionResponse {
        chosen_action,
        extra: fields,
    })
}
