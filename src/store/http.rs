// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Broker REST client.
//!
//! ```text
//! GET   {url}/reports/{thing}   -> {"item": {...}}   (snapshot)
//! PATCH {url}/reports/{thing}   <- {"item": {...}}   (merge patch)
//! ```
//!
//! The REST surface has no push channel, so a subscription polls the report
//! on a fixed interval and only yields a snapshot when it differs from the
//! last one delivered. A `404` is read as an empty document: the thing has
//! simply not been reported yet.
//!
//! # Failure Handling
//!
//! - `listen()` fails if the first fetch fails, so the consumer backs off
//! - A transport failure while polling is yielded once, then the stream ends
//! - A body that is not JSON is yielded as `MalformedSnapshot` and polling
//!   continues

use crate::config::StoreConfig;
use crate::document::Document;
use crate::error::{AdapterError, Result};
use crate::store::{BoxFuture, ShadowStore, SnapshotStream};
use futures::stream;
use reqwest::{Client, StatusCode, Url};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, trace};

/// Shadow store reached over the broker's REST API.
#[derive(Debug, Clone)]
pub struct HttpStore {
    client: Client,
    base_url: Url,
    poll_interval: Duration,
}

impl HttpStore {
    /// Build a client from store settings.
    pub fn new(config: &StoreConfig) -> Result<Self> {
        let base_url = Url::parse(&config.url).map_err(|e| {
            AdapterError::Config(format!("store url '{}' is invalid: {}", config.url, e))
        })?;
        let client = Client::builder()
            .timeout(config.request_timeout_duration())
            .build()
            .map_err(|e| AdapterError::Config(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            poll_interval: config.poll_interval_duration(),
        })
    }

    /// `{base}/reports/{thing}`, with `thing` percent-encoded as one segment.
    pub fn report_url(&self, thing: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                AdapterError::Config(format!("store url '{}' cannot be a base", self.base_url))
            })?
            .pop_if_empty()
            .push("reports")
            .push(thing);
        Ok(url)
    }
}

async fn fetch(client: &Client, url: &Url) -> Result<Document> {
    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| AdapterError::transport("GET report", e))?;

    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        trace!(url = %url, "Report not found, treating as empty");
        return Ok(Document::empty());
    }
    if !status.is_success() {
        return Err(AdapterError::transport_msg(
            "GET report",
            format!("{} returned {}", url, status),
        ));
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| AdapterError::transport("GET report", e))?;
    decode_snapshot(&body)
}

/// Decode a report body. The document lives under `item`; a bare object is
/// accepted as the document itself.
fn decode_snapshot(body: &[u8]) -> Result<Document> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| AdapterError::MalformedSnapshot(format!("report body is not JSON: {}", e)))?;
    Ok(match value {
        Value::Object(mut map) => match map.remove("item") {
            Some(item) => Document::from(item),
            None => Document::from(Value::Object(map)),
        },
        other => Document::from(other),
    })
}

struct Poll {
    client: Client,
    url: Url,
    ticker: Interval,
    pending: Option<Document>,
    last: Option<Document>,
    closed: bool,
}

impl Poll {
    async fn next(mut self) -> Option<(Result<Document>, Self)> {
        if self.closed {
            return None;
        }
        if let Some(first) = self.pending.take() {
            self.last = Some(first.clone());
            return Some((Ok(first), self));
        }

        loop {
            self.ticker.tick().await;
            match fetch(&self.client, &self.url).await {
                Ok(doc) => {
                    if self.last.as_ref() == Some(&doc) {
                        continue;
                    }
                    self.last = Some(doc.clone());
                    return Some((Ok(doc), self));
                }
                Err(e) => {
                    self.closed = e.is_retryable();
                    return Some((Err(e), self));
                }
            }
        }
    }
}

impl ShadowStore for HttpStore {
    fn listen(&self, thing: &str) -> BoxFuture<'_, SnapshotStream> {
        let thing = thing.to_string();
        Box::pin(async move {
            let url = self.report_url(&thing)?;
            debug!(url = %url, poll_interval = ?self.poll_interval, "Subscribing to report");

            let first = fetch(&self.client, &url).await?;

            let mut ticker = interval_at(Instant::now() + self.poll_interval, self.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            let poll = Poll {
                client: self.client.clone(),
                url,
                ticker,
                pending: Some(first),
                last: None,
                closed: false,
            };
            Ok(Box::pin(stream::unfold(poll, Poll::next)) as SnapshotStream)
        })
    }

    fn patch(&self, thing: &str, patch: Document) -> BoxFuture<'_, ()> {
        let thing = thing.to_string();
        Box::pin(async move {
            let url = self.report_url(&thing)?;
            let response = self
                .client
                .patch(url)
                .json(&json!({ "item": patch }))
                .send()
                .await
                .map_err(|e| AdapterError::transport("PATCH report", e))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(AdapterError::Publish {
                    thing,
                    message: format!("broker returned {}: {}", status, body.trim()),
                });
            }
            Ok(())
        })
    }
}
