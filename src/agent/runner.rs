//! Turn Runner - Drives one conversation turn through the graph
//!
//! Information Hiding:
//! - Per-thread serialisation hidden behind `start_turn`
//! - Checkpoint cadence and rollback on failure internalized
//! - Step budget enforcement hidden from callers

use super::graph::{route, Node};
use super::invoker::ModelInvoker;
use crate::core::{AgentError, BackoffPolicy, ChatModel, ConversationState, Message};
use crate::storage::CheckpointStore;
use crate::tools::{ToolMetadata, ToolRegistry};
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

pub const DEFAULT_MAX_STEPS: usize = 25;

/// Result of a completed turn
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub reply: String,
    /// Agent and Tools node executions taken this turn
    pub steps: usize,
    pub state: ConversationState,
}

/// One async lock per thread id; idle entries are pruned on acquire
#[derive(Default)]
struct ThreadLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl ThreadLocks {
    async fn acquire(&self, thread_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(thread_id.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }
}

pub struct TurnRunner {
    invoker: ModelInvoker,
    tools: Arc<ToolRegistry>,
    tool_descriptors: Vec<ToolMetadata>,
    checkpoints: Arc<dyn CheckpointStore>,
    max_steps: usize,
    turn_timeout: Option<Duration>,
    locks: ThreadLocks,
}

impl TurnRunner {
    pub fn new(
        model: Arc<dyn ChatModel>,
        tools: Arc<ToolRegistry>,
        checkpoints: Arc<dyn CheckpointStore>,
    ) -> Self {
        let tool_descriptors = tools.list_tools();
        Self {
            invoker: ModelInvoker::new(model, BackoffPolicy::default()),
            tools,
            tool_descriptors,
            checkpoints,
            max_steps: DEFAULT_MAX_STEPS,
            turn_timeout: None,
            locks: ThreadLocks::default(),
        }
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.invoker = self.invoker.with_backoff(backoff);
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps.max(1);
        self
    }

    /// Deadline for a whole turn; an expired turn is rolled back like any other failure
    pub fn with_turn_timeout(mut self, limit: Duration) -> Self {
        self.turn_timeout = Some(limit);
        self
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    /// Process one user message on a thread and return the final reply text
    pub async fn start_turn(&self, thread_id: &str, user_message: &str) -> Result<String, AgentError> {
        Ok(self.run_turn(thread_id, user_message).await?.reply)
    }

    /// Like `start_turn`, also reporting the step count and resulting state
    pub async fn run_turn(
        &self,
        thread_id: &str,
        user_message: &str,
    ) -> Result<TurnOutcome, AgentError> {
        if thread_id.trim().is_empty() {
            return Err(AgentError::InvalidInput("thread id cannot be empty".to_string()));
        }
        if user_message.trim().is_empty() {
            return Err(AgentError::InvalidInput("message cannot be empty".to_string()));
        }

        let _guard = self.locks.acquire(thread_id).await;

        let base = self
            .checkpoints
            .load(thread_id)
            .await
            .map_err(persistence_failure)?;

        tracing::info!(
            "[Turn {}] Starting turn ({} prior message(s))",
            thread_id,
            base.as_ref().map_or(0, |s| s.len())
        );

        let mut state = base.clone().unwrap_or_default();
        let mut steps = 0;

        let driven = match self.turn_timeout {
            Some(limit) => {
                let turn = self.drive(thread_id, &mut state, user_message, &mut steps);
                match tokio::time::timeout(limit, turn).await {
                    Ok(result) => result,
                    Err(_) => Err(AgentError::Upstream(format!(
                        "turn timed out after {} ms",
                        limit.as_millis()
                    ))),
                }
            }
            None => self.drive(thread_id, &mut state, user_message, &mut steps).await,
        };

        match driven {
            Ok(()) => {
                let reply = state
                    .last()
                    .map(|m| m.content().to_string())
                    .unwrap_or_default();
                tracing::info!("[Turn {}] Completed in {} step(s)", thread_id, steps);
                Ok(TurnOutcome { reply, steps, state })
            }
            Err(err) => {
                tracing::error!(
                    "[Turn {}] Failed after {} step(s): {}",
                    thread_id,
                    steps,
                    err
                );
                self.rollback(thread_id, base.as_ref()).await;
                Err(err)
            }
        }
    }

    /// Load a thread's transcript, empty if it has never been saved
    pub async fn history(&self, thread_id: &str) -> Result<ConversationState, AgentError> {
        Ok(self
            .checkpoints
            .load(thread_id)
            .await
            .map_err(persistence_failure)?
            .unwrap_or_default())
    }

    async fn drive(
        &self,
        thread_id: &str,
        state: &mut ConversationState,
        user_message: &str,
        steps: &mut usize,
    ) -> Result<(), AgentError> {
        // A previous turn may have stopped between requesting tools and running them
        if !state.pending_tool_calls().is_empty() {
            tracing::warn!("[Turn {}] Resuming unanswered tool call(s)", thread_id);
            self.take_step(steps)?;
            self.run_tools(thread_id, state).await;
            self.checkpoint(thread_id, state).await?;
        }

        state.push(Message::user(user_message));

        let mut node = Node::Agent;
        loop {
            match node {
                Node::Agent => {
                    self.take_step(steps)?;
                    let reply = self.invoker.invoke(state, &self.tool_descriptors).await?;
                    tracing::debug!(
                        "[Turn {}] Agent replied with {} tool call(s)",
                        thread_id,
                        reply.tool_calls().len()
                    );
                    state.push(reply);
                    self.checkpoint(thread_id, state).await?;
                    node = route(state);
                }
                Node::Tools => {
                    self.take_step(steps)?;
                    self.run_tools(thread_id, state).await;
                    self.checkpoint(thread_id, state).await?;
                    node = Node::Agent;
                }
                Node::End => return Ok(()),
            }
        }
    }

    fn take_step(&self, steps: &mut usize) -> Result<(), AgentError> {
        if *steps >= self.max_steps {
            return Err(AgentError::LoopLimitExceeded {
                limit: self.max_steps,
            });
        }
        *steps += 1;
        Ok(())
    }

    /// Answer every pending tool call, results appended in request order
    async fn run_tools(&self, thread_id: &str, state: &mut ConversationState) {
        let calls = state.pending_tool_calls();
        for call in &calls {
            tracing::info!("[Turn {}] Executing tool: {}", thread_id, call.name);
        }

        let results = join_all(calls.iter().map(|call| self.tools.execute_call(call))).await;

        for (call, result) in calls.iter().zip(results) {
            if !result.success {
                tracing::debug!("[Turn {}] Tool '{}' reported failure", thread_id, call.name);
            }
            state.push(Message::tool_result(&call.id, &call.name, result.to_content()));
        }
    }

    async fn checkpoint(&self, thread_id: &str, state: &ConversationState) -> Result<(), AgentError> {
        self.checkpoints
            .save(thread_id, state)
            .await
            .map_err(persistence_failure)
    }

    /// Restore the checkpoint that existed when the turn started
    async fn rollback(&self, thread_id: &str, base: Option<&ConversationState>) {
        let restored = match base {
            Some(state) => self.checkpoints.save(thread_id, state).await,
            None => self.checkpoints.delete(thread_id).await,
        };

        if let Err(e) = restored {
            tracing::error!("[Turn {}] Rollback failed: {:#}", thread_id, e);
        }
    }
}

fn persistence_failure(e: anyhow::Error) -> AgentError {
    AgentError::PersistenceFailure(format!("{:#}", e))
}
