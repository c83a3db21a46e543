//! Chatbot orchestrator: session → intent → prompt → backend → normalizer → session.
//!
//! Every failure path ends in a normalized reply. Only startup can fail.

use std::sync::Arc;

use serde::Serialize;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::assistant::core::config::{AssistantConfig, BackendKind};
use crate::assistant::core::errors::AssistantResult;
use crate::assistant::core::ids::{RequestId, UserId};
use crate::assistant::core::intent::Intent;
use crate::assistant::core::turn::ConversationTurn;
use crate::assistant::handlers::{ChatContext, PromptBuilder, REPORT_TEXT_KEY};
use crate::assistant::normalize::ResponseNormalizer;
use crate::assistant::router::IntentRouter;
use crate::assistant::session::{SessionHistory, SessionStore};
use crate::llm::{KnowledgeBase, TextGenerator, build_generator};

/// Query used when a report is summarized.
pub const SUMMARIZE_QUERY: &str = "Please summarize this medical report";

const BACKEND_FAILURE: &str = "**Error**
- I apologize, but I encountered an error
- Please try rephrasing your question

**Next Steps**
- Try asking your question in a different way
- Make sure your question is clear and specific
- Try again in a few moments";

const EMPTY_QUERY: &str = "**Information**
- Your message was empty
- Please describe your question or symptoms

**Next Steps**
- Type your question and send it again";

const INVALID_USER: &str = "**Error**
- I apologize, but this request could not be linked to a conversation
- Please sign in again or refresh the page

**Next Steps**
- Try again in a few moments";

/// Normalized reply plus the intent that produced it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AssistantReply {
    /// Normalized response text.
    pub text: String,
    /// Intent used to build the prompt.
    pub intent: Intent,
}

/// Glue between the session store, router, prompt builder, backend, and normalizer.
pub struct ChatbotOrchestrator {
    store: SessionStore,
    router: IntentRouter,
    prompts: PromptBuilder,
    generator: Arc<dyn TextGenerator>,
    normalizer: ResponseNormalizer,
}

impl ChatbotOrchestrator {
    /// Assemble an orchestrator from parts.
    ///
    /// # Errors
    /// Returns an error if the normalizer patterns fail to compile.
    pub fn new(
        store: SessionStore,
        router: IntentRouter,
        prompts: PromptBuilder,
        generator: Arc<dyn TextGenerator>,
    ) -> AssistantResult<Self> {
        Ok(Self {
            store,
            router,
            prompts,
            generator,
            normalizer: ResponseNormalizer::new()?,
        })
    }

    /// Build everything from configuration.
    ///
    /// Model backends get knowledge-base context in their prompts; the
    /// knowledge-base backend already answers from it.
    ///
    /// # Errors
    /// Returns an error if the store or backend cannot be created.
    pub async fn from_config(config: &AssistantConfig) -> AssistantResult<Self> {
        let store = SessionStore::from_config(&config.session).await?;
        let generator = build_generator(&config.llm)?;
        let router = IntentRouter::from_config(&config.classifier, Arc::clone(&generator));
        let knowledge =
            (config.llm.backend != BackendKind::KnowledgeBase).then(KnowledgeBase::default);
        let prompts = PromptBuilder::new(config.prompt.history_turns, knowledge);

        info!(
            backend = generator.name(),
            remote_classifier = router.has_remote(),
            "chatbot orchestrator ready"
        );
        Self::new(store, router, prompts, generator)
    }

    /// Answer a query; always returns normalized text.
    pub async fn process(&self, user_id: &str, query: &str, context: Option<&ChatContext>) -> String {
        self.process_detailed(user_id, query, context).await.text
    }

    /// Same as [`ChatbotOrchestrator::process`], also reporting the intent.
    pub async fn process_detailed(
        &self,
        user_id: &str,
        query: &str,
        context: Option<&ChatContext>,
    ) -> AssistantReply {
        let request_id = RequestId::new();
        let span = info_span!("chat", request_id = %request_id, user_id = %user_id);
        self.respond(user_id, query, None, context)
            .instrument(span)
            .await
    }

    /// Summarize a medical report for a user.
    pub async fn summarize_report(&self, user_id: &str, report_text: &str) -> AssistantReply {
        let mut context = ChatContext::new();
        context.insert(
            REPORT_TEXT_KEY.to_string(),
            serde_json::Value::String(report_text.to_string()),
        );
        let request_id = RequestId::new();
        let span = info_span!("summarize", request_id = %request_id, user_id = %user_id);
        self.respond(
            user_id,
            SUMMARIZE_QUERY,
            Some(Intent::MedicalRecordQuery),
            Some(&context),
        )
        .instrument(span)
        .await
    }

    /// A user's history, oldest first.
    ///
    /// # Errors
    /// Returns an error if the user id is invalid.
    pub async fn history(&self, user_id: &str) -> AssistantResult<SessionHistory> {
        let user_id = UserId::new(user_id)?;
        Ok(self.store.load(&user_id).await)
    }

    /// Forget a user's history.
    ///
    /// # Errors
    /// Returns an error if the user id is invalid or the record cannot be removed.
    pub async fn clear(&self, user_id: &str) -> AssistantResult<()> {
        let user_id = UserId::new(user_id)?;
        self.store.clear(&user_id).await
    }

    /// Normalize arbitrary text with this orchestrator's normalizer.
    #[must_use]
    pub fn normalize(&self, text: &str) -> String {
        self.normalizer.normalize(text)
    }

    async fn respond(
        &self,
        user_id: &str,
        query: &str,
        forced: Option<Intent>,
        context: Option<&ChatContext>,
    ) -> AssistantReply {
        let user_id = match UserId::new(user_id) {
            Ok(user_id) => user_id,
            Err(err) => {
                warn!(error = %err, "rejected user id");
                return self.templated(INVALID_USER, Intent::General);
            }
        };

        let query = query.trim();
        if query.is_empty() {
            debug!("empty query");
            return self.templated(EMPTY_QUERY, Intent::General);
        }

        let history = self.store.load(&user_id).await;
        let intent = match forced {
            Some(intent) => intent,
            None => self.router.classify(query).await,
        };
        let prompt = self.prompts.build(intent, query, &history, context);

        let raw = match self.generator.generate(&prompt).await {
            Ok(raw) => raw,
            Err(err) => {
                error!(
                    backend = self.generator.name(),
                    intent = %intent,
                    error = %err,
                    retryable = err.is_retryable(),
                    "model call failed"
                );
                BACKEND_FAILURE.to_string()
            }
        };
        let text = self.normalizer.normalize(&raw);

        self.remember(&user_id, ConversationTurn::user(query)).await;
        self.remember(&user_id, ConversationTurn::assistant(text.clone()))
            .await;

        let turns = (history.len() + 2).min(self.store.max_turns());
        info!(intent = %intent, turns, "reply ready");
        AssistantReply { text, intent }
    }

    async fn remember(&self, user_id: &UserId, turn: ConversationTurn) {
        if let Err(err) = self.store.append(user_id, turn).await {
            error!(user_id = %user_id, error = %err, "failed to persist history");
        }
    }

    fn templated(&self, template: &str, intent: Intent) -> AssistantReply {
        AssistantReply {
            text: self.normalizer.normalize(template),
            intent,
        }
    }
}
