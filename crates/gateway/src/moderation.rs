use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::metrics;

/// Outcome of one moderation evaluation. Only `Allowed` and `Flagged` are
/// cacheable; `RateLimited` and `Unavailable` are transient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModerationOutcome {
    Allowed,
    Flagged { categories: Vec<String> },
    RateLimited,
    Unavailable { cause: UnavailableCause },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "cause", rename_all = "snake_case")]
pub enum UnavailableCause {
    MissingCredentials,
    Upstream { status: u16 },
    Transport,
    InvalidResponse,
}

impl std::fmt::Display for UnavailableCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnavailableCause::MissingCredentials => {
                write!(f, "moderation credentials are not configured")
            }
            UnavailableCause::Upstream { status } => {
                write!(f, "moderation provider returned status {}", status)
            }
            UnavailableCause::Transport => write!(f, "moderation request failed in transport"),
            UnavailableCause::InvalidResponse => {
                write!(f, "moderation provider returned an undecodable response")
            }
        }
    }
}

pub struct ModerationClientConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    /// Ordered list of models to try; later entries are fallbacks for
    /// accounts without access to earlier ones.
    pub models: Vec<String>,
    pub max_chars: usize,
    pub timeout: Duration,
}

#[derive(Clone)]
pub struct ModerationClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    models: Vec<String>,
    max_chars: usize,
}

impl ModerationClient {
    pub fn new(config: ModerationClientConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            http,
            endpoint: config.endpoint,
            api_key: config.api_key,
            models: config.models,
            max_chars: config.max_chars,
        })
    }

    /// Classify a query against the provider, trying each configured model in
    /// order. Fail-closed: missing credentials, transport failures, and
    /// undecodable responses all yield `Unavailable`, never `Allowed`.
    pub async fn classify(&self, text: &str) -> ModerationOutcome {
        let Some(api_key) = self.api_key.as_deref() else {
            return ModerationOutcome::Unavailable {
                cause: UnavailableCause::MissingCredentials,
            };
        };

        let input = truncate_chars(text, self.max_chars);
        let mut last_status = None;

        for model in &self.models {
            let sent = self
                .http
                .post(&self.endpoint)
                .bearer_auth(api_key)
                .json(&serde_json::json!({ "model": model, "input": input }))
                .send()
                .await;

            let response = match sent {
                Ok(response) => response,
                Err(err) => {
                    metrics::observe_moderation_call(model, "transport");
                    tracing::warn!(model = %model, error = %err, "moderation request failed");
                    return ModerationOutcome::Unavailable {
                        cause: UnavailableCause::Transport,
                    };
                }
            };

            let status = response.status();
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                metrics::observe_moderation_call(model, "rate_limited");
                return ModerationOutcome::RateLimited;
            }
            if !status.is_success() {
                metrics::observe_moderation_call(model, "http_error");
                tracing::warn!(model = %model, status = status.as_u16(), "moderation attempt failed");
                last_status = Some(status.as_u16());
                continue;
            }

            let body = match response.json::<ModerationResponse>().await {
                Ok(body) => body,
                Err(_) => {
                    metrics::observe_moderation_call(model, "invalid_response");
                    return ModerationOutcome::Unavailable {
                        cause: UnavailableCause::InvalidResponse,
                    };
                }
            };

            metrics::observe_moderation_call(model, "success");
            return outcome_from_response(body);
        }

        match last_status {
            Some(status) => ModerationOutcome::Unavailable {
                cause: UnavailableCause::Upstream { status },
            },
            None => ModerationOutcome::Unavailable {
                cause: UnavailableCause::Transport,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct ModerationResponse {
    #[serde(default)]
    results: Vec<ModerationResult>,
}

#[derive(Debug, Deserialize)]
struct ModerationResult {
    #[serde(default)]
    flagged: bool,
    // BTreeMap keeps the flagged category labels in stable order.
    #[serde(default)]
    categories: BTreeMap<String, bool>,
}

fn outcome_from_response(body: ModerationResponse) -> ModerationOutcome {
    let Some(result) = body.results.into_iter().next() else {
        return ModerationOutcome::Unavailable {
            cause: UnavailableCause::InvalidResponse,
        };
    };

    if !result.flagged {
        return ModerationOutcome::Allowed;
    }

    let categories = result
        .categories
        .into_iter()
        .filter_map(|(label, flagged)| flagged.then_some(label))
        .collect();
    ModerationOutcome::Flagged { categories }
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
