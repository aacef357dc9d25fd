//! Dialogue engine executor

use super::traits::Storage;
use super::{Command, SseEvent};

use crate::gateway::{AnswerService, Classifier};
use crate::state_machine::{
    transition, ConversationState, DialogueContext, Effect, Event, Snapshot, TransitionError,
};
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};

/// Runs one session: serial event processing, spawned gateway calls
pub struct DialogueEngine<S, C, A>
where
    S: Storage + Clone + 'static,
    C: Classifier + ?Sized + 'static,
    A: AnswerService + ?Sized + 'static,
{
    context: DialogueContext,
    profile_key: String,
    state: ConversationState,
    storage: S,
    classifier: Arc<C>,
    answerer: Arc<A>,
    command_rx: mpsc::Receiver<Command>,
    /// Gateway completions posted back by spawned calls
    event_rx: mpsc::Receiver<Event>,
    event_tx: mpsc::Sender<Event>,
    broadcast_tx: broadcast::Sender<SseEvent>,
    /// Latest state, published after effects have run
    state_tx: watch::Sender<ConversationState>,
}

impl<S, C, A> DialogueEngine<S, C, A>
where
    S: Storage + Clone + 'static,
    C: Classifier + ?Sized + 'static,
    A: AnswerService + ?Sized + 'static,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        context: DialogueContext,
        profile_key: impl Into<String>,
        state: ConversationState,
        storage: S,
        classifier: Arc<C>,
        answerer: Arc<A>,
        command_rx: mpsc::Receiver<Command>,
        broadcast_tx: broadcast::Sender<SseEvent>,
        state_tx: watch::Sender<ConversationState>,
    ) -> Self {
        let (event_tx, event_rx) = mpsc::channel(32);
        Self {
            context,
            profile_key: profile_key.into(),
            state,
            storage,
            classifier,
            answerer,
            command_rx,
            event_rx,
            event_tx,
            broadcast_tx,
            state_tx,
        }
    }

    pub async fn run(mut self) {
        tracing::info!(session = %self.context.session_key, "Starting dialogue engine");

        loop {
            tokio::select! {
                command = self.command_rx.recv() => {
                    let Some(Command { event, reply }) = command else {
                        break;
                    };
                    let result = self.process_event(event).await;
                    if let Err(e) = &result {
                        let _ = self.broadcast_tx.send(SseEvent::Error {
                            message: e.to_string(),
                        });
                    }
                    let _ = reply.send(result);
                }
                Some(event) = self.event_rx.recv() => {
                    match self.process_event(event).await {
                        Ok(()) => {}
                        Err(e @ TransitionError::StaleCompletion { .. }) => {
                            tracing::debug!(session = %self.context.session_key, error = %e, "Dropping completion");
                        }
                        Err(e) => {
                            tracing::warn!(session = %self.context.session_key, error = %e, "Completion rejected");
                        }
                    }
                }
            }
        }

        tracing::info!(session = %self.context.session_key, "Dialogue engine stopped");
    }

    async fn process_event(&mut self, event: Event) -> Result<(), TransitionError> {
        let event_name = event.name();
        let snapshot = self.snapshot().await;
        let result = transition(&self.state, &self.context, &snapshot, event)?;

        let from = self.state.stage;
        self.state = result.new_state;
        tracing::debug!(
            session = %self.context.session_key,
            event = event_name,
            from = ?from,
            to = ?self.state.stage,
            generation = self.state.generation,
            "Transition applied"
        );

        for effect in result.effects {
            self.execute_effect(effect).await;
        }

        self.state_tx.send_replace(self.state.clone());
        Ok(())
    }

    /// Profile as of now; an unreadable profile counts as empty
    async fn snapshot(&self) -> Snapshot {
        let profile = match self.storage.profile(&self.profile_key).await {
            Ok(profile) => profile,
            Err(e) => {
                tracing::warn!(profile_key = %self.profile_key, error = %e, "Failed to read profile");
                crate::profile::UserProfile::default()
            }
        };
        Snapshot {
            profile,
            now: Utc::now(),
        }
    }

    async fn execute_effect(&mut self, effect: Effect) {
        match effect {
            Effect::PersistState => {
                if let Err(e) = self
                    .storage
                    .save_state(&self.context.session_key, &self.state)
                    .await
                {
                    tracing::error!(session = %self.context.session_key, error = %e, "Failed to persist state");
                    let _ = self.broadcast_tx.send(SseEvent::Error {
                        message: format!("Failed to save conversation: {e}"),
                    });
                }
                let _ = self.broadcast_tx.send(SseEvent::StateChange {
                    state: serde_json::to_value(&self.state).unwrap_or(Value::Null),
                    input_enabled: self.state.input_enabled(),
                });
            }

            Effect::RequestClassification {
                question,
                generation,
            } => {
                let classifier = Arc::clone(&self.classifier);
                let event_tx = self.event_tx.clone();
                tokio::spawn(async move {
                    let event = match classifier.classify(&question).await {
                        Ok(result) => Event::ClassificationReady { generation, result },
                        Err(error) => Event::ClassificationFailed { generation, error },
                    };
                    let _ = event_tx.send(event).await;
                });
            }

            Effect::RequestAnswer {
                request,
                generation,
            } => {
                let answerer = Arc::clone(&self.answerer);
                let event_tx = self.event_tx.clone();
                tokio::spawn(async move {
                    let event = match answerer.predict(&request).await {
                        Ok(answer) => Event::AnswerReady { generation, answer },
                        Err(error) => Event::AnswerFailed { generation, error },
                    };
                    let _ = event_tx.send(event).await;
                });
            }

            Effect::NotifyClient { event_type, data } => {
                let _ = self
                    .broadcast_tx
                    .send(SseEvent::Notice { event_type, data });
            }
        }
    }
}
