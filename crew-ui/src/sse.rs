//! Server-Sent Events stream of pipeline progress.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use crew::pipeline::PipelineEvent;
use futures::stream::Stream;
use tokio::sync::broadcast;
use tracing::warn;

use crate::state::AppState;

/// SSE endpoint handler.
pub async fn events_handler(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.event_tx.subscribe();
    Sse::new(progress_stream(rx)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

fn progress_stream(
    mut rx: broadcast::Receiver<PipelineEvent>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    async_stream::stream! {
        yield Ok(Event::default().event("connected").data("{}"));

        loop {
            match rx.recv().await {
                Ok(event) => {
                    if let Some(sse) = to_sse(&event) {
                        yield Ok(sse);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(skipped = n, "SSE client lagged, some events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    break;
                }
            }
        }
    }
}

fn to_sse(event: &PipelineEvent) -> Option<Event> {
    let json = serde_json::to_string(event).ok()?;
    Some(Event::default().event("progress").data(json))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crew::agents::Stage;
    use futures::StreamExt;

    #[tokio::test]
    async fn stream_starts_connected_then_forwards_events() {
        let (tx, rx) = broadcast::channel(8);
        let stream = progress_stream(rx);
        futures::pin_mut!(stream);

        assert!(stream.next().await.is_some());

        tx.send(PipelineEvent::StageStarted {
            iteration: 1,
            stage: Stage::Qa,
            role: "QA Engineer",
        })
        .expect("send");
        drop(tx);

        assert!(stream.next().await.is_some());
        assert!(stream.next().await.is_none());
    }

    #[test]
    fn progress_payload_is_tagged_json() {
        let event = PipelineEvent::IterationStarted {
            iteration: 2,
            max_iterations: 3,
        };
        let json = serde_json::to_value(&event).expect("json");
        assert_eq!(json["type"], "iteration_started");
        assert!(to_sse(&event).is_some());
    }
}
