use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use async_stream::stream;
use axum::{
    Json, debug_handler,
    extract::{Extension, Query},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::Stream;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;
use waflow_core::StoredMessage;

use crate::http::{ApiResult, GatewayState};

#[derive(Debug, Default, Deserialize)]
pub struct PhoneFilter {
    pub phone: Option<String>,
}

#[debug_handler]
pub async fn list(
    Extension(state): Extension<Arc<GatewayState>>,
    Query(filter): Query<PhoneFilter>,
) -> ApiResult<Vec<StoredMessage>> {
    Ok(Json(state.store.list(filter.phone.as_deref()).await))
}

/// Records a message the UI composed itself, e.g. after a send it tracked.
#[debug_handler]
pub async fn record(
    Extension(state): Extension<Arc<GatewayState>>,
    Json(message): Json<StoredMessage>,
) -> ApiResult<Value> {
    state.store.add(message).await;
    Ok(Json(json!({ "success": true })))
}

/// Live store events. Slow subscribers skip what they missed.
pub async fn stream(
    Extension(state): Extension<Arc<GatewayState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut rx = state.store.subscribe();
    let events = stream! {
        loop {
            match rx.recv().await {
                Ok(event) => match Event::default().json_data(&event) {
                    Ok(sse) => yield Ok::<_, Infallible>(sse),
                    Err(err) => warn!(error = %err, "failed to encode store event"),
                },
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "message stream subscriber lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    };
    Sse::new(events).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
