//! Client-side SSE parsing.
//!
//! A background task reads the response body line by line and forwards
//! parsed `(event, data)` pairs over an `mpsc` channel; [`SseStream`]
//! exposes that channel as a `futures::Stream`. `data:` lines are handed
//! to the caller raw, who decodes them against whichever envelope shape
//! the endpoint promises (task status vs skill-stream).

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{RuntimeError, RuntimeResult};

/// One parsed SSE record.
#[derive(Debug, Clone)]
pub struct SseMessage {
    pub event: Option<String>,
    pub data: String,
}

/// A parsed SSE stream backed by a background line-reading task.
pub struct SseStream {
    receiver: mpsc::Receiver<RuntimeResult<SseMessage>>,
    _task: JoinHandle<()>,
}

impl SseStream {
    pub fn from_response(response: reqwest::Response) -> Self {
        let (tx, rx) = mpsc::channel(32);

        let task = tokio::spawn(async move {
            if let Err(err) = pump(response, tx.clone()).await {
                let _ = tx.send(Err(err)).await;
            }
        });

        Self {
            receiver: rx,
            _task: task,
        }
    }

    pub async fn next(&mut self) -> Option<RuntimeResult<SseMessage>> {
        self.receiver.recv().await
    }

    pub fn into_stream(self) -> impl Stream<Item = RuntimeResult<SseMessage>> {
        SseStreamAdapter { inner: self }
    }
}

struct SseStreamAdapter {
    inner: SseStream,
}

impl Stream for SseStreamAdapter {
    type Item = RuntimeResult<SseMessage>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.receiver.poll_recv(cx)
    }
}

async fn pump(
    response: reqwest::Response,
    tx: mpsc::Sender<RuntimeResult<SseMessage>>,
) -> RuntimeResult<()> {
    let mut bytes_stream = response.bytes_stream();
    let mut buffer = String::new();
    let mut pending_event: Option<String> = None;
    let mut pending_data = String::new();

    while let Some(chunk) = bytes_stream.next().await {
        let chunk = chunk.map_err(|e| RuntimeError::Transport(e.to_string()))?;
        buffer.push_str(&String::from_utf8_lossy(&chunk));

        while let Some(pos) = buffer.find('\n') {
            let line = buffer[..pos].trim_end_matches('\r').to_string();
            buffer.drain(..=pos);

            if line.is_empty() {
                if !pending_data.is_empty() {
                    let message = SseMessage {
                        event: pending_event.take(),
                        data: std::mem::take(&mut pending_data),
                    };
                    if tx.send(Ok(message)).await.is_err() {
                        return Ok(());
                    }
                }
                continue;
            }

            if let Some(rest) = line.strip_prefix("event:") {
                pending_event = Some(rest.trim().to_string());
            } else if let Some(rest) = line.strip_prefix("data:") {
                if !pending_data.is_empty() {
                    pending_data.push('\n');
                }
                pending_data.push_str(rest.trim_start());
            }
            // Comment lines (":") and any other field are ignored.
        }
    }

    Ok(())
}
