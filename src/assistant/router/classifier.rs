//! Intent router: optional remote classification with a keyword safety net.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::assistant::core::config::ClassifierConfig;
use crate::assistant::core::intent::Intent;
use crate::assistant::router::keywords::classify_by_keywords;
use crate::llm::{Prompt, TextGenerator};

const CLASSIFY_SYSTEM: &str = "You are an intent classifier for a medical assistant. \
Answer with the category name only.";

/// Ordered substring probes applied to the remote reply.
const REPLY_PROBES: [(&str, Intent); 8] = [
    ("symptom", Intent::SymptomCheck),
    ("appointment", Intent::AppointmentScheduling),
    ("medication", Intent::MedicationReminder),
    ("reminder", Intent::MedicationReminder),
    ("health", Intent::HealthRecommendation),
    ("recommendation", Intent::HealthRecommendation),
    ("record", Intent::MedicalRecordQuery),
    ("general", Intent::General),
];

/// Classifies queries into an [`Intent`]. Never fails.
#[derive(Clone)]
pub struct IntentRouter {
    remote: Option<Arc<dyn TextGenerator>>,
    timeout: Duration,
}

impl std::fmt::Debug for IntentRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntentRouter")
            .field("remote", &self.remote.as_ref().map(|g| g.name().to_string()))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for IntentRouter {
    fn default() -> Self {
        Self::keywords_only()
    }
}

impl IntentRouter {
    /// Router that only applies keyword rules.
    #[must_use]
    pub fn keywords_only() -> Self {
        Self {
            remote: None,
            timeout: ClassifierConfig::default().timeout(),
        }
    }

    /// Router that asks `remote` first, bounded by `timeout`.
    #[must_use]
    pub const fn with_remote(remote: Arc<dyn TextGenerator>, timeout: Duration) -> Self {
        Self {
            remote: Some(remote),
            timeout,
        }
    }

    /// Build from configuration; `generator` is used only when remote classification is on.
    #[must_use]
    pub fn from_config(config: &ClassifierConfig, generator: Arc<dyn TextGenerator>) -> Self {
        if config.remote {
            Self::with_remote(generator, config.timeout())
        } else {
            Self::keywords_only()
        }
    }

    /// Whether a remote classifier is configured.
    #[must_use]
    pub const fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    /// Classify a query.
    pub async fn classify(&self, query: &str) -> Intent {
        let remote_intent = match &self.remote {
            Some(remote) => self.classify_remote(remote.as_ref(), query).await,
            None => None,
        };
        if let Some(intent) = remote_intent {
            debug!(intent = %intent, "remote classification");
            return intent;
        }
        let intent = classify_by_keywords(query);
        debug!(intent = %intent, "keyword classification");
        intent
    }

    async fn classify_remote(&self, remote: &dyn TextGenerator, query: &str) -> Option<Intent> {
        let prompt = Prompt::new(CLASSIFY_SYSTEM, classification_request(query), query);
        match tokio::time::timeout(self.timeout, remote.generate(&prompt)).await {
            Ok(Ok(reply)) => {
                let intent = intent_from_reply(&reply);
                if intent.is_none() {
                    warn!(backend = remote.name(), "classifier reply named no category");
                }
                intent
            }
            Ok(Err(err)) => {
                warn!(backend = remote.name(), error = %err, "remote classification failed");
                None
            }
            Err(_) => {
                warn!(
                    backend = remote.name(),
                    timeout_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
                    "remote classification timed out"
                );
                None
            }
        }
    }
}

fn classification_request(query: &str) -> String {
    let labels = Intent::ALL
        .iter()
        .map(|intent| intent.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    format!("Classify the following message into one of these categories: {labels}.\nMessage: {query}")
}

/// Map a free-text classifier reply onto an intent.
#[must_use]
pub fn intent_from_reply(reply: &str) -> Option<Intent> {
    let reply = reply.to_lowercase();
    REPLY_PROBES
        .iter()
        .find(|(probe, _)| reply.contains(probe))
        .map(|(_, intent)| *intent)
}
