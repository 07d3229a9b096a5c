//! The redrive engine.
//!
//! Drains the dead-letter queue one batch at a time. Every message in a batch
//! is decoded, its payload resolved (stored inline or replayed from the
//! stream), and the target function invoked synchronously. Messages whose
//! invocation succeeded are deleted with one batch request once the whole
//! batch has been handled. The loop ends when a receive comes back empty.
//!
//! # Failure handling
//!
//! The default [`FailurePolicy::FailFast`] aborts the run on the first message
//! that cannot be redriven. Nothing from that batch is deleted, so every
//! message in it (including ones already invoked) stays on the queue and is
//! redriven again by a later run. Targets must therefore tolerate duplicate
//! invocations. A poison message blocks everything received after it.
//!
//! [`FailurePolicy::SkipAndContinue`] instead leaves the failing message on the
//! queue and carries on; each message is attempted at most once per run.

mod payload;

pub use payload::PayloadSource;

use snafu::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{Config, FailurePolicy, ReceiveConfig};
use crate::dlq::{DeleteEntry, FailedItem, QueueMessage, QueueService};
use crate::emit;
use crate::error::{
    CancelledSnafu, DeleteSnafu, FunctionExecutionSnafu, InvokeTransportSnafu, ItemCancelledSnafu,
    ItemError, ReceiveSnafu, RedriveError,
};
use crate::invoke::FunctionService;
use crate::metrics::events::{
    BatchCompleted, DeleteFailures, InvokeCompleted, ItemFailed, ItemRedriven, MessagesDeleted,
    MessagesReceived, PayloadKind,
};
use crate::stream::{StreamReplayer, StreamService};

/// The external services a run talks to.
#[derive(Clone)]
pub struct Services {
    pub queue: Arc<dyn QueueService>,
    pub streams: Arc<dyn StreamService>,
    pub functions: Arc<dyn FunctionService>,
}

/// Running totals for a redrive run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedriveStats {
    /// Non-empty batches received.
    pub batches: usize,
    /// Messages received, cumulative.
    pub received: usize,
    /// Messages whose invocation succeeded.
    pub redriven: usize,
    /// Messages deleted from the queue.
    pub deleted: usize,
    /// Messages left on the queue under `SkipAndContinue`.
    pub skipped: usize,
    /// Delete entries the queue refused.
    pub delete_failures: usize,
}

/// How a received batch ended.
enum BatchOutcome {
    /// The queue had nothing to give.
    Empty,
    /// Every message in the batch was already attempted during this run.
    /// Only reached under `SkipAndContinue`.
    OnlyRepeats,
    /// The batch was handled.
    Processed { received: usize },
}

/// Drains a dead-letter queue by re-invoking each failed item.
pub struct Redriver {
    queue: Arc<dyn QueueService>,
    functions: Arc<dyn FunctionService>,
    replayer: StreamReplayer,
    receive: ReceiveConfig,
    policy: FailurePolicy,
    shutdown: CancellationToken,
    stats: RedriveStats,
    attempted: HashSet<String>,
}

impl Redriver {
    pub fn new(config: &Config, services: Services, shutdown: CancellationToken) -> Self {
        let replayer = StreamReplayer::new(
            services.streams,
            config.replay.max_fetches,
            shutdown.clone(),
        );
        Self {
            queue: services.queue,
            functions: services.functions,
            replayer,
            receive: config.receive.clone(),
            policy: config.failure_policy,
            shutdown,
            stats: RedriveStats::default(),
            attempted: HashSet::new(),
        }
    }

    /// Totals so far. Still meaningful after `run` returned an error.
    pub fn stats(&self) -> &RedriveStats {
        &self.stats
    }

    /// Drain the queue until a receive comes back empty.
    pub async fn run(&mut self) -> Result<RedriveStats, RedriveError> {
        info!(
            max_messages = self.receive.max_messages,
            wait_time_secs = self.receive.wait_time_secs,
            policy = ?self.policy,
            "Starting redrive"
        );

        loop {
            let batch = self.stats.batches + 1;
            match self.drain_batch(batch).await {
                Ok(BatchOutcome::Empty) => {
                    debug!(batch, "Queue returned no messages");
                    break;
                }
                Ok(BatchOutcome::OnlyRepeats) => {
                    info!(batch, "Only messages already attempted in this run remain");
                    break;
                }
                Ok(BatchOutcome::Processed { received }) => {
                    info!(received, total = self.stats.received, "Batch redriven");
                }
                Err(e) => {
                    error!(
                        total = self.stats.received,
                        redriven = self.stats.redriven,
                        deleted = self.stats.deleted,
                        "Redrive aborted: {}",
                        e
                    );
                    return Err(e);
                }
            }
        }

        info!(
            total = self.stats.received,
            redriven = self.stats.redriven,
            deleted = self.stats.deleted,
            skipped = self.stats.skipped,
            "Redrive complete"
        );
        Ok(self.stats.clone())
    }

    async fn drain_batch(&mut self, batch: usize) -> Result<BatchOutcome, RedriveError> {
        let messages = self
            .shutdown
            .run_until_cancelled(
                self.queue
                    .receive(self.receive.max_messages, self.receive.wait_time()),
            )
            .await
            .context(CancelledSnafu { batch })?
            .context(ReceiveSnafu { batch })?;

        if messages.is_empty() {
            return Ok(BatchOutcome::Empty);
        }

        if self.skips_failures()
            && messages
                .iter()
                .all(|message| self.attempted.contains(&message.message_id))
        {
            return Ok(BatchOutcome::OnlyRepeats);
        }

        let started = Instant::now();
        self.stats.batches = batch;
        self.stats.received += messages.len();
        emit!(MessagesReceived {
            count: messages.len()
        });

        let mut deletes = Vec::with_capacity(messages.len());

        for (index, message) in messages.iter().enumerate() {
            if self.skips_failures() && !self.attempted.insert(message.message_id.clone()) {
                debug!(batch, index, message_id = %message.message_id, "Already attempted in this run");
                continue;
            }

            match self.redrive_message(message).await {
                Ok(kind) => {
                    emit!(ItemRedriven { source: kind });
                    self.stats.redriven += 1;
                    deletes.push(DeleteEntry::for_message(index, message));
                }
                Err(source) => {
                    emit!(ItemFailed {
                        kind: source.kind()
                    });
                    if source.is_cancelled() {
                        return CancelledSnafu { batch }.fail();
                    }
                    match self.policy {
                        FailurePolicy::FailFast => {
                            return Err(RedriveError::Item {
                                batch,
                                index,
                                message_id: message.message_id.clone(),
                                source,
                            });
                        }
                        FailurePolicy::SkipAndContinue => {
                            warn!(
                                batch,
                                index,
                                message_id = %message.message_id,
                                kind = source.kind().as_str(),
                                "Leaving message on queue: {}",
                                snafu::Report::from_error(&source)
                            );
                            self.stats.skipped += 1;
                        }
                    }
                }
            }
        }

        self.delete(batch, deletes).await?;
        emit!(BatchCompleted {
            duration: started.elapsed()
        });
        Ok(BatchOutcome::Processed {
            received: messages.len(),
        })
    }

    /// Under `SkipAndContinue` a failed message comes back on a later receive;
    /// it is attempted at most once per run.
    fn skips_failures(&self) -> bool {
        self.policy == FailurePolicy::SkipAndContinue
    }

    async fn redrive_message(&self, message: &QueueMessage) -> Result<PayloadKind, ItemError> {
        let item = FailedItem::decode(&message.body)?;
        debug!(
            message_id = %message.message_id,
            request_id = %item.request_context.request_id,
            function_arn = %item.request_context.function_arn,
            condition = %item.request_context.condition,
            "Redriving item"
        );
        let source = PayloadSource::for_item(&item)?;
        let kind = source.kind();
        let payload = source.resolve(&self.replayer).await?;

        let context = &item.request_context;
        let function_arn = context.function_arn.as_str();
        let started = Instant::now();
        let outcome = self
            .shutdown
            .run_until_cancelled(self.functions.invoke(function_arn, payload))
            .await
            .context(ItemCancelledSnafu)?
            .context(InvokeTransportSnafu { function_arn })?;
        emit!(InvokeCompleted {
            duration: started.elapsed()
        });

        if let Some(function_error) = outcome.function_error {
            return FunctionExecutionSnafu {
                function_arn,
                status_code: outcome.status_code,
                function_error,
            }
            .fail();
        }

        debug!(
            request_id = %context.request_id,
            function_arn,
            source = kind.as_str(),
            status_code = outcome.status_code,
            "Invocation succeeded"
        );
        Ok(kind)
    }

    async fn delete(&mut self, batch: usize, entries: Vec<DeleteEntry>) -> Result<(), RedriveError> {
        if entries.is_empty() {
            return Ok(());
        }

        let requested = entries.len();
        let outcome = self
            .shutdown
            .run_until_cancelled(self.queue.delete_batch(entries))
            .await
            .context(CancelledSnafu { batch })?
            .context(DeleteSnafu { batch })?;

        let deleted = requested.saturating_sub(outcome.failed.len());
        self.stats.deleted += deleted;
        emit!(MessagesDeleted { count: deleted });

        if !outcome.is_complete() {
            for failure in &outcome.failed {
                warn!(
                    batch,
                    id = %failure.id,
                    reason = %failure.message,
                    "Queue refused delete; message will be redriven again"
                );
            }
            self.stats.delete_failures += outcome.failed.len();
            emit!(DeleteFailures {
                count: outcome.failed.len()
            });
        }

        Ok(())
    }
}
