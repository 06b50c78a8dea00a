use std::time::Instant;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use super::{VoteConfirmer, VoteDecision, VoteStats};
use crate::error::ConfirmerClosed;

const QUEUE_DEPTH: usize = 64;

enum Command {
    Observe {
        code: Option<String>,
        confidence: f32,
        now: Instant,
        reply: oneshot::Sender<VoteDecision>,
    },
    Reset {
        reply: oneshot::Sender<()>,
    },
    Stats {
        reply: oneshot::Sender<VoteStats>,
    },
}

/// Shared access to one confirmer from several producers.
///
/// A background task owns the confirmer and applies commands strictly in the
/// order they reach its queue. Clones of the handle feed the same queue. The
/// task stops once every handle is dropped.
#[derive(Clone)]
pub struct ConfirmerHandle {
    sender: mpsc::Sender<Command>,
}

impl ConfirmerHandle {
    /// Move `confirmer` into a task on the current tokio runtime
    pub fn spawn(confirmer: VoteConfirmer) -> Self {
        let (sender, receiver) = mpsc::channel(QUEUE_DEPTH);
        tokio::spawn(run(confirmer, receiver));
        Self { sender }
    }

    pub async fn observe(
        &self,
        code: Option<String>,
        confidence: f32,
        now: Instant,
    ) -> Result<VoteDecision, ConfirmerClosed> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Observe {
            code,
            confidence,
            now,
            reply,
        })
        .await?;
        response.await.map_err(|_| ConfirmerClosed)
    }

    pub async fn reset(&self) -> Result<(), ConfirmerClosed> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Reset { reply }).await?;
        response.await.map_err(|_| ConfirmerClosed)
    }

    pub async fn stats(&self) -> Result<VoteStats, ConfirmerClosed> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Stats { reply }).await?;
        response.await.map_err(|_| ConfirmerClosed)
    }

    async fn send(&self, command: Command) -> Result<(), ConfirmerClosed> {
        self.sender.send(command).await.map_err(|_| ConfirmerClosed)
    }
}

async fn run(mut confirmer: VoteConfirmer, mut receiver: mpsc::Receiver<Command>) {
    while let Some(command) = receiver.recv().await {
        // A dropped reply only means the caller stopped waiting
        match command {
            Command::Observe {
                code,
                confidence,
                now,
                reply,
            } => {
                let _ = reply.send(confirmer.observe(code.as_deref(), confidence, now));
            }
            Command::Reset { reply } => {
                confirmer.reset();
                let _ = reply.send(());
            }
            Command::Stats { reply } => {
                let _ = reply.send(confirmer.stats());
            }
        }
    }
    debug!("Vote confirmer task finished");
}
