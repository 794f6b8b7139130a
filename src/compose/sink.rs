//! The single outbound channel of a turn.
//!
//! [`ChunkSink`] is the only writer. It ends in exactly one way: a close
//! marker after a successful turn, one error frame after a fatal fault, or a
//! silent release when the consumer has gone away. Once ended, every further
//! write is refused. Dropping an open sink closes it.

use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::error::{ChatcastError, Result};
use crate::types::Chunk;

/// One item on the outbound channel.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamFrame {
    Chunk(Chunk),
    /// Terminal fault. Nothing follows.
    Error(String),
    /// Clean end of the turn. Nothing follows.
    Close,
}

impl StreamFrame {
    /// The SSE `data:` payload for this frame.
    pub fn sse_data(&self) -> String {
        match self {
            StreamFrame::Chunk(chunk) => json_text(chunk),
            StreamFrame::Error(text) => json_text(&Chunk::Error {
                error_text: text.clone(),
            }),
            StreamFrame::Close => "[DONE]".to_string(),
        }
    }

    /// Whether this frame ends the stream.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StreamFrame::Chunk(_))
    }
}

fn json_text(chunk: &Chunk) -> String {
    serde_json::to_string(chunk).unwrap_or_else(|e| {
        format!(r#"{{"type":"error","errorText":"chunk encoding failed: {e}"}}"#)
    })
}

/// How a turn ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    Completed,
    Failed(String),
    /// The consumer went away; nothing more was written.
    Abandoned,
}

pub type FrameReceiver = mpsc::UnboundedReceiver<StreamFrame>;

/// Create a sink and the receiving end read by the response writer.
pub fn channel() -> (ChunkSink, FrameReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ChunkSink { tx: Some(tx) }, rx)
}

#[derive(Debug)]
pub struct ChunkSink {
    tx: Option<mpsc::UnboundedSender<StreamFrame>>,
}

impl ChunkSink {
    /// Write one chunk.
    ///
    /// Fails with [`ChatcastError::StreamClosed`] after the sink has ended and
    /// with [`ChatcastError::Cancelled`] when the consumer is gone.
    pub fn emit(&mut self, chunk: Chunk) -> Result<()> {
        let Some(tx) = &self.tx else {
            return Err(ChatcastError::StreamClosed);
        };
        if tx.send(StreamFrame::Chunk(chunk)).is_err() {
            self.tx = None;
            return Err(ChatcastError::Cancelled);
        }
        Ok(())
    }

    /// End with a close marker. Returns false if already ended.
    pub fn close(&mut self) -> bool {
        match self.tx.take() {
            Some(tx) => {
                let _ = tx.send(StreamFrame::Close);
                true
            }
            None => false,
        }
    }

    /// End with one error frame. Returns false if already ended.
    pub fn fail(&mut self, err: &ChatcastError) -> bool {
        match self.tx.take() {
            Some(tx) => {
                let _ = tx.send(StreamFrame::Error(err.to_string()));
                true
            }
            None => false,
        }
    }

    /// End without writing anything.
    pub fn release(&mut self) {
        self.tx = None;
    }

    /// End according to the producer's result.
    pub fn finish(&mut self, outcome: Result<()>) -> TurnOutcome {
        match outcome {
            Ok(()) => {
                self.close();
                TurnOutcome::Completed
            }
            Err(e) if e.is_cancellation() => {
                debug!("consumer disconnected, releasing chunk stream");
                self.release();
                TurnOutcome::Abandoned
            }
            Err(e) => {
                error!(error = %e, "turn failed");
                self.fail(&e);
                TurnOutcome::Failed(e.to_string())
            }
        }
    }
}

impl Drop for ChunkSink {
    fn drop(&mut self) {
        if self.close() {
            debug!("chunk sink dropped while open, closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(rx: &mut FrameReceiver) -> Vec<StreamFrame> {
        let mut frames = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            frames.push(frame);
        }
        frames
    }

    #[test]
    fn close_happens_once_and_blocks_writes() {
        let (mut sink, mut rx) = channel();
        sink.emit(Chunk::Finish).unwrap();
        assert!(sink.close());
        assert!(!sink.close());
        assert!(!sink.fail(&ChatcastError::Stream("late".into())));
        assert!(matches!(sink.emit(Chunk::Finish), Err(ChatcastError::StreamClosed)));
        drop(sink);

        assert_eq!(drain(&mut rx), vec![StreamFrame::Chunk(Chunk::Finish), StreamFrame::Close]);
    }

    #[test]
    fn failure_writes_one_error_and_no_close() {
        let (mut sink, mut rx) = channel();
        let outcome = sink.finish(Err(ChatcastError::Stream("model died".into())));
        assert_eq!(outcome, TurnOutcome::Failed("Stream error: model died".into()));
        drop(sink);

        assert_eq!(drain(&mut rx), vec![StreamFrame::Error("Stream error: model died".into())]);
    }

    #[test]
    fn drop_closes_an_open_sink() {
        let (sink, mut rx) = channel();
        drop(sink);
        assert_eq!(drain(&mut rx), vec![StreamFrame::Close]);
    }

    #[test]
    fn disconnected_consumer_cancels_writes() {
        let (mut sink, rx) = channel();
        drop(rx);
        assert!(matches!(sink.emit(Chunk::Finish), Err(ChatcastError::Cancelled)));
        assert!(matches!(sink.emit(Chunk::Finish), Err(ChatcastError::StreamClosed)));
        assert_eq!(sink.finish(Err(ChatcastError::Cancelled)), TurnOutcome::Abandoned);
    }

    #[test]
    fn frames_encode_as_sse_payloads() {
        assert_eq!(StreamFrame::Close.sse_data(), "[DONE]");
        assert_eq!(
            StreamFrame::Error("Timeout after 30000ms".into()).sse_data(),
            r#"{"type":"error","errorText":"Timeout after 30000ms"}"#
        );
        assert_eq!(StreamFrame::Chunk(Chunk::StartStep).sse_data(), r#"{"type":"start-step"}"#);
        assert!(StreamFrame::Close.is_terminal());
        assert!(!StreamFrame::Chunk(Chunk::Finish).is_terminal());
    }
}
