//! Response writer: runs one turn on its own task and exposes its frames.
//!
//! The producer races the composer against two things: the turn budget and
//! a cancellation token tied to the lifetime of the returned [`TurnStream`].
//! Dropping the stream cancels the turn and aborts whatever the composer is
//! waiting on.

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::Stream;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info};

use crate::compose::{channel, Composer, StreamFrame, TurnOutcome};
use crate::error::ChatcastError;
use crate::types::UiMessage;
use crate::util::timeout::with_timeout;

/// Start a turn. Frames can be pulled from the returned stream right away.
pub fn spawn_turn(composer: Composer, messages: Vec<UiMessage>, budget: Duration) -> TurnStream {
    let (mut sink, rx) = channel();
    let cancel = CancellationToken::new();
    let token = cancel.clone();

    let task = tokio::spawn(async move {
        let result = tokio::select! {
            _ = token.cancelled() => Err(ChatcastError::Cancelled),
            result = with_timeout(budget, composer.compose(&messages, &mut sink)) => result,
        };
        let outcome = sink.finish(result);
        match &outcome {
            TurnOutcome::Completed => info!("turn completed"),
            TurnOutcome::Failed(reason) => info!(reason = %reason, "turn ended with error"),
            TurnOutcome::Abandoned => debug!("turn abandoned by consumer"),
        }
        outcome
    });

    TurnStream {
        frames: UnboundedReceiverStream::new(rx),
        cancel: cancel.clone(),
        _guard: cancel.drop_guard(),
        task: Some(task),
    }
}

/// The frames of one running turn. Ends after the terminal frame, or without
/// one when the turn was cancelled.
pub struct TurnStream {
    frames: UnboundedReceiverStream<StreamFrame>,
    cancel: CancellationToken,
    _guard: DropGuard,
    task: Option<JoinHandle<TurnOutcome>>,
}

impl TurnStream {
    /// Stop the producer. Nothing further is written.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Handle to the producer task, resolving to how the turn ended.
    pub fn take_task(&mut self) -> Option<JoinHandle<TurnOutcome>> {
        self.task.take()
    }
}

impl Stream for TurnStream {
    type Item = StreamFrame;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.frames).poll_next(cx)
    }
}
