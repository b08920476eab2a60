//! Conversation engine
//!
//! One inbound message in, exactly one reply out. Unknown senders go
//! through the registration machine; known senders through the intent
//! router. External-service failures never escape as errors: every path
//! resolves to reply text.

use crate::completion::{self, Completion};
use crate::directory::{UserDirectory, UserPatch};
use crate::escalation;
use crate::market::{self, MarketData};
use crate::models::{Priority, UserRecord};
use crate::notify::Notifier;
use crate::registration::{self, SessionStore, StepOutcome};
use crate::router::{self, Intent, IntentRouter};
use crate::Result;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

const APOLOGY: &str = "😔 Sorry, something went wrong on our side. Please try again in a moment.";

const MARKET_UNAVAILABLE: &str = "⚠️ Couldn't fetch market data right now. Please try again later.";

const COMPLETION_UNAVAILABLE: &str =
    "😔 I couldn't come up with an answer right now. Please try again later.";

const UNKNOWN_COMPANY: &str = "📊 Please provide a valid company name, e.g. Apple or TCS.";

pub struct ConversationEngine {
    directory: Arc<dyn UserDirectory>,
    sessions: SessionStore,
    router: IntentRouter,
    market: Arc<dyn MarketData>,
    completion: Arc<dyn Completion>,
    notifier: Arc<dyn Notifier>,
    support_email: String,
}

impl ConversationEngine {
    pub fn new(
        directory: Arc<dyn UserDirectory>,
        market: Arc<dyn MarketData>,
        completion: Arc<dyn Completion>,
        notifier: Arc<dyn Notifier>,
        support_email: String,
    ) -> Self {
        Self {
            directory,
            sessions: SessionStore::new(),
            router: IntentRouter::new(),
            market,
            completion,
            notifier,
            support_email,
        }
    }

    /// Handle one inbound message. Always produces reply text; internal
    /// failures are logged and mapped to a fixed apology.
    pub async fn handle_message(&self, sender_id: &str, text: &str) -> String {
        match self.try_handle(sender_id, text).await {
            Ok(reply) => reply,
            Err(error) => {
                error!(sender_id, %error, "Message handling failed");
                APOLOGY.to_string()
            }
        }
    }

    async fn try_handle(&self, sender_id: &str, text: &str) -> Result<String> {
        self.sessions.sweep().await;

        let Some(user) = self.directory.find(sender_id).await? else {
            return self.register(sender_id, text).await;
        };

        let normalized = text.trim().to_lowercase();
        let intent = self.router.classify(&normalized);
        debug!(sender_id, ?intent, "Dispatching");

        // Escalations skip query history; every other branch records the
        // raw message before its handler runs.
        if !matches!(intent, Intent::Escalation) {
            self.directory
                .update(
                    sender_id,
                    UserPatch {
                        push_query: Some(text.to_string()),
                        ..Default::default()
                    },
                )
                .await?;
        }

        let reply = match intent {
            Intent::Escalation => self.escalate(sender_id, text).await,
            Intent::Faq(answer) => answer.to_string(),
            Intent::BankAccount(fields) => router::bank_account_reply(&user, fields, &normalized),
            Intent::MarketQuote(symbol) => self.quote_reply(symbol).await,
            Intent::PersonalField(field) => router::personal_field_reply(&user, field),
            Intent::Fallback => self.fallback_reply(sender_id, &user, text).await,
        };

        Ok(reply)
    }

    /// Drive the onboarding dialogue for a sender with no user record.
    async fn register(&self, sender_id: &str, text: &str) -> Result<String> {
        match self.sessions.advance(sender_id, text).await {
            Some(StepOutcome::Prompt(prompt)) => Ok(prompt),
            Some(StepOutcome::Complete(record)) => {
                info!(sender_id, name = %record.name, "Creating user record");
                self.directory.create(record).await?;
                Ok(registration::COMPLETION_MESSAGE.to_string())
            }
            None => Ok(self.sessions.start(sender_id).await),
        }
    }

    /// Raise priority, notify support best-effort, return the fixed ack.
    /// Neither a directory nor a notification failure blocks the ack.
    async fn escalate(&self, sender_id: &str, raw: &str) -> String {
        if let Err(error) = self
            .directory
            .update(
                sender_id,
                UserPatch {
                    priority: Some(Priority::High),
                    ..Default::default()
                },
            )
            .await
        {
            error!(sender_id, %error, "Failed to raise priority");
        }

        let subject = format!("🚨 Urgent support request from {}", sender_id);
        let body = format!("Sender: {}\nMessage: {}", sender_id, raw);
        if let Err(error) = self
            .notifier
            .send(&subject, &body, &self.support_email)
            .await
        {
            warn!(sender_id, %error, "Support notification failed");
        }

        escalation::ESCALATION_ACK.to_string()
    }

    async fn quote_reply(&self, symbol: Option<&'static str>) -> String {
        let Some(symbol) = symbol else {
            return UNKNOWN_COMPANY.to_string();
        };

        match self.market.quote(symbol).await {
            Ok(quote) => market::format_quote(symbol, &quote),
            Err(error) => {
                warn!(symbol, %error, "Quote lookup failed");
                MARKET_UNAVAILABLE.to_string()
            }
        }
    }

    async fn fallback_reply(&self, sender_id: &str, user: &UserRecord, raw: &str) -> String {
        let prompt = completion::build_prompt(user, raw);

        match self
            .completion
            .complete(&prompt, completion::MAX_REPLY_TOKENS)
            .await
        {
            Ok(answer) => {
                if let Err(error) = self
                    .directory
                    .update(
                        sender_id,
                        UserPatch {
                            last_ai_response: Some(answer.clone()),
                            ..Default::default()
                        },
                    )
                    .await
                {
                    warn!(sender_id, %error, "Failed to store AI response");
                }
                answer
            }
            Err(error) => {
                warn!(sender_id, %error, "Completion failed");
                COMPLETION_UNAVAILABLE.to_string()
            }
        }
    }
}
