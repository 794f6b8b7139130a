//! Conversion of a provider delta stream into the UI message sub-stream.
//!
//! The sub-stream opens with `start` and `start-step`, wraps model text in a
//! single `text-start`/`text-delta`/`text-end` part, and closes with
//! `finish-step` and `finish`. Completion is reported separately through a
//! [`Completion`] future that resolves exactly once, after the last chunk has
//! been pulled.

use futures::stream::BoxStream;
use futures::StreamExt;
use tokio::sync::oneshot;

use crate::encoder::make_id;
use crate::error::ChatcastError;
use crate::types::*;

/// A model sub-stream together with its completion event.
pub struct UiMessageStream {
    pub chunks: BoxStream<'static, Result<Chunk, ChatcastError>>,
    pub completion: Completion,
}

/// Resolves with the finish event once the sub-stream has been fully
/// consumed. Resolves to `None` if the stream failed or was dropped early.
pub struct Completion {
    rx: oneshot::Receiver<FinishEvent>,
}

impl Completion {
    pub async fn wait(self) -> Option<FinishEvent> {
        self.rx.await.ok()
    }
}

/// Wrap provider deltas into UI message chunks.
pub fn to_ui_message_stream(
    deltas: BoxStream<'static, Result<TextStreamDelta, ChatcastError>>,
) -> UiMessageStream {
    let (tx, rx) = oneshot::channel();

    let chunks = async_stream::stream! {
        let mut deltas = deltas;
        let text_id = make_id("text");
        let mut text_open = false;
        let mut text = String::new();
        let mut usage = Usage::default();
        let mut finish_reason = None;

        yield Ok(Chunk::Start { message_id: Some(make_id("msg")) });
        yield Ok(Chunk::StartStep);

        while let Some(item) = deltas.next().await {
            let delta = match item {
                Ok(delta) => delta,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };
            if let Some(u) = delta.usage {
                usage = u;
            }
            if delta.finish_reason.is_some() {
                finish_reason = delta.finish_reason;
            }
            if delta.text.is_empty() {
                continue;
            }
            if !text_open {
                text_open = true;
                yield Ok(Chunk::TextStart { id: text_id.clone() });
            }
            text.push_str(&delta.text);
            yield Ok(Chunk::TextDelta { id: text_id.clone(), delta: delta.text });
        }

        if text_open {
            yield Ok(Chunk::TextEnd { id: text_id.clone() });
        }
        yield Ok(Chunk::FinishStep);
        yield Ok(Chunk::Finish);

        let _ = tx.send(FinishEvent { text, usage, finish_reason });
    };

    UiMessageStream {
        chunks: Box::pin(chunks),
        completion: Completion { rx },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn deltas(
        items: Vec<Result<TextStreamDelta, ChatcastError>>,
    ) -> BoxStream<'static, Result<TextStreamDelta, ChatcastError>> {
        futures::stream::iter(items).boxed()
    }

    #[tokio::test]
    async fn wraps_text_in_one_part_and_reports_completion() {
        let usage = Usage {
            total_tokens: Some(7),
            ..Default::default()
        };
        let UiMessageStream { chunks, completion } = to_ui_message_stream(deltas(vec![
            Ok(TextStreamDelta::text("Hel")),
            Ok(TextStreamDelta::text("lo")),
            Ok(TextStreamDelta::done(Some(FinishReason::Stop), Some(usage.clone()))),
        ]));

        let collected: Vec<Chunk> = chunks.map(|c| c.unwrap()).collect().await;
        let kinds: Vec<String> = collected.iter().map(|c| c.kind().into_owned()).collect();
        assert_eq!(
            kinds,
            vec!["start", "start-step", "text-start", "text-delta", "text-delta", "text-end", "finish-step", "finish"]
        );
        let text_ids: Vec<&str> = collected.iter().filter_map(Chunk::id).collect();
        assert!(text_ids.windows(2).all(|w| w[0] == w[1]));

        let finish = completion.wait().await.unwrap();
        assert_eq!(finish.text, "Hello");
        assert_eq!(finish.usage, usage);
        assert_eq!(finish.finish_reason, Some(FinishReason::Stop));
    }

    #[tokio::test]
    async fn empty_model_output_has_no_text_part() {
        let UiMessageStream { chunks, completion } =
            to_ui_message_stream(deltas(vec![Ok(TextStreamDelta::done(None, None))]));
        let kinds: Vec<String> = chunks.map(|c| c.unwrap().kind().into_owned()).collect().await;
        assert_eq!(kinds, vec!["start", "start-step", "finish-step", "finish"]);
        assert!(completion.wait().await.unwrap().usage.is_empty());
    }

    #[tokio::test]
    async fn error_ends_stream_without_completion() {
        let UiMessageStream { chunks, completion } = to_ui_message_stream(deltas(vec![
            Ok(TextStreamDelta::text("partial")),
            Err(ChatcastError::Stream("socket reset".into())),
            Ok(TextStreamDelta::text("never")),
        ]));
        let items: Vec<Result<Chunk, ChatcastError>> = chunks.collect().await;
        assert!(matches!(items.last(), Some(Err(ChatcastError::Stream(_)))));
        assert_eq!(items.len(), 5);
        assert!(completion.wait().await.is_none());
    }
}
