//! Server-Sent Events streaming
//!
//! Emits the streaming envelope for a chat request: progress events while
//! the pipeline runs, a language_detected event after routing, the answer
//! re-streamed word by word, citations, then exactly one of complete/error,
//! and finally end. Dropping the stream (client disconnect) cancels the
//! in-flight pipeline run.

use std::convert::Infallible;
use std::time::Duration;

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio_util::sync::CancellationToken;

use climate_agent_core::{Language, ProgressEvent};
use climate_agent_pipeline::{progress_channel, LanguageRouter};

use crate::http::{citation_json, ChatRequest};
use crate::metrics::{record_latency, record_request};
use crate::state::AppState;

/// Build the SSE response for a chat request
pub fn stream_response(
    state: AppState,
    request: ChatRequest,
    request_id: String,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (progress_tx, mut progress_rx) = progress_channel(32);
    let cancel = CancellationToken::new();

    // Surface the routed language and family up front, the way the
    // pipeline will see them
    let declared = Language::from_code(&request.language);
    let detected = LanguageRouter::new()
        .detect_language(&request.query)
        .or(declared)
        .unwrap_or_default();

    let pipeline = std::sync::Arc::clone(&state.pipeline);
    let query_request = request.into_query_request();
    let mut task = tokio::spawn({
        let cancel = cancel.clone();
        async move { pipeline.process(query_request, Some(progress_tx), cancel).await }
    });

    let stream = async_stream::stream! {
        // Cancels the pipeline if the client goes away mid-stream
        let _cancel_guard = cancel.drop_guard();

        yield sse_json(&serde_json::json!({
            "type": "language_detected",
            "language": detected.code(),
            "family": detected.family().label(),
            "request_id": request_id,
        }));

        let mut progress_closed = false;
        let outcome = loop {
            tokio::select! {
                maybe_event = progress_rx.recv(), if !progress_closed => {
                    match maybe_event {
                        Some(event) => yield progress_json(&event, &request_id),
                        None => progress_closed = true,
                    }
                }
                joined = &mut task => {
                    // Flush progress emitted between the last recv and
                    // task completion
                    while let Ok(event) = progress_rx.try_recv() {
                        yield progress_json(&event, &request_id);
                    }
                    break joined;
                }
            }
        };

        match outcome {
            Ok(outcome) => {
                record_request(outcome.success, true);
                record_latency(outcome.processing_time);

                if outcome.success {
                    // Word-chunked token re-streaming; backends that do not
                    // stream still produce incremental delivery
                    let mut partial = String::new();
                    for word in outcome.response.split_inclusive(' ') {
                        partial.push_str(word);
                        yield sse_json(&serde_json::json!({
                            "type": "token",
                            "content": word,
                            "partial_response": partial.trim_end(),
                            "request_id": request_id,
                        }));
                    }

                    for citation in &outcome.citations {
                        yield sse_json(&serde_json::json!({
                            "type": "citation",
                            "citation": citation_json(citation),
                            "request_id": request_id,
                        }));
                    }

                    yield sse_json(&serde_json::json!({
                        "type": "complete",
                        "final_response": outcome.response,
                        "citations": outcome.citations,
                        "faithfulness_score": outcome.faithfulness_score,
                        "model_used": outcome.model_used,
                        "language_used": outcome.language_code,
                        "request_id": request_id,
                    }));
                } else {
                    yield sse_json(&serde_json::json!({
                        "type": "error",
                        "error": outcome.response,
                        "request_id": request_id,
                    }));
                }
            }
            Err(e) => {
                tracing::error!(error = %e, request_id, "pipeline task failed");
                record_request(false, true);
                yield sse_json(&serde_json::json!({
                    "type": "error",
                    "error": "Internal processing error",
                    "request_id": request_id,
                }));
            }
        }

        yield sse_json(&serde_json::json!({
            "type": "end",
            "request_id": request_id,
        }));
    };

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}

fn sse_json(value: &serde_json::Value) -> Result<Event, Infallible> {
    Ok(Event::default().data(value.to_string()))
}

fn progress_json(event: &ProgressEvent, request_id: &str) -> Result<Event, Infallible> {
    Ok(Event::default().data(
        serde_json::json!({
            "type": "progress",
            "stage": event.stage,
            "pct": event.pct,
            "request_id": request_id,
        })
        .to_string(),
    ))
}
