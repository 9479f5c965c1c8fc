//! Ordered, per-run writer for job records.
//!
//! Stage markers are queued and the run moves on without waiting. The
//! terminal record goes through the same queue, so it always lands after
//! every stage marker, and the caller awaits its acknowledgement. Anything
//! queued after the terminal record is dropped.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::job::JobRecord;
use crate::store::{JobStateStore, StoreError};

enum WriteCommand {
    Stage(JobRecord),
    Terminal(JobRecord, oneshot::Sender<Result<(), StoreError>>),
}

pub struct StageWriter {
    tx: mpsc::UnboundedSender<WriteCommand>,
    handle: JoinHandle<()>,
}

impl StageWriter {
    /// Starts the writer task. Must be called inside a tokio runtime.
    pub fn spawn(store: Arc<dyn JobStateStore>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<WriteCommand>();

        let handle = tokio::spawn(async move {
            let mut terminal_written = false;
            while let Some(command) = rx.recv().await {
                match command {
                    WriteCommand::Stage(record) => {
                        if terminal_written {
                            debug!(job_id = %record.id, "Dropping stage write after terminal record");
                            continue;
                        }
                        if let Err(e) = put(store.clone(), record).await {
                            warn!(error = %e, "Stage write failed");
                        }
                    }
                    WriteCommand::Terminal(record, ack) => {
                        let result = if terminal_written {
                            Ok(())
                        } else {
                            put(store.clone(), record).await
                        };
                        terminal_written = result.is_ok();
                        let _ = ack.send(result);
                    }
                }
            }
        });

        Self { tx, handle }
    }

    /// Queues a stage marker without waiting for it to be stored.
    pub fn stage(&self, record: &JobRecord) {
        if self.tx.send(WriteCommand::Stage(record.clone())).is_err() {
            warn!(job_id = %record.id, stage = %record.stage.as_str(), "Stage writer closed, marker lost");
        }
    }

    /// Queues the terminal record and waits until it is stored.
    pub async fn finish(&self, record: &JobRecord) -> Result<(), StoreError> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.tx
            .send(WriteCommand::Terminal(record.clone(), ack_tx))
            .map_err(|_| StoreError::WriterClosed)?;
        ack_rx.await.map_err(|_| StoreError::WriterClosed)?
    }

    /// Drains the queue and stops the writer task.
    pub async fn close(self) {
        drop(self.tx);
        if let Err(e) = self.handle.await {
            warn!(error = %e, "Stage writer task ended abnormally");
        }
    }
}

async fn put(store: Arc<dyn JobStateStore>, record: JobRecord) -> Result<(), StoreError> {
    tokio::task::spawn_blocking(move || store.put(&record.id, &record))
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
}
