//! Server-sent events: live collection snapshots
//!
//! Each connection receives the current contents of the collection, then a
//! `snapshot` event after every write to it.

use std::{convert::Infallible, sync::Arc, time::Duration};

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
};
use tokio_stream::{Stream, StreamExt};

use crate::{
    error::{AppError, AppResult},
    store::{collections, Document, Snapshot},
};

use super::AuthenticatedUser;

/// Drop password hashes before anything leaves the server
fn redact(collection: &str, snapshot: &[Document]) -> Vec<Document> {
    snapshot
        .iter()
        .cloned()
        .map(|mut doc| {
            if collection == collections::USERS {
                if let Some(fields) = doc.data.as_object_mut() {
                    fields.remove("password");
                }
            }
            doc
        })
        .collect()
}

fn snapshot_event(collection: &str, snapshot: &[Document]) -> Event {
    Event::default()
        .event("snapshot")
        .json_data(redact(collection, snapshot))
        .unwrap_or_else(|e| Event::default().event("error").data(e.to_string()))
}

/// Subscribe to a collection
#[utoipa::path(
    get,
    path = "/stream/{collection}",
    tag = "stream",
    security(("bearer_auth" = [])),
    params(("collection" = String, Path, description = "Collection name, e.g. systems or details")),
    responses(
        (status = 200, description = "text/event-stream of `snapshot` events"),
        (status = 404, description = "Unknown collection", body = crate::error::ErrorResponse)
    )
)]
pub async fn subscribe(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(collection): Path<String>,
) -> AppResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    if !collections::is_known(&collection) {
        return Err(AppError::NotFound(format!("Unknown collection {}", collection)));
    }
    if collection == collections::USERS {
        claims.require_admin()?;
    }

    let repository = state.services.repository();
    // Subscribe before reading so no write falls between the two
    let subscription = repository.subscribe(&collection).await?;
    let initial: Snapshot = Arc::new(repository.dump(&collection).await?);
    tracing::debug!("{} subscribed to {}", claims.sub, collection);

    let name = collection.clone();
    let stream = tokio_stream::once(initial)
        .chain(subscription.into_stream())
        .map(move |snapshot| Ok(snapshot_event(&name, &snapshot)));

    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15))))
}
