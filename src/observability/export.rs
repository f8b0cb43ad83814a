//! Batched span export.
//!
//! # Responsibilities
//! - Buffer closed spans in a bounded, process-wide queue
//! - Ship batches to the trace collector off the request path
//! - Absorb collector outages without surfacing them to callers
//!
//! # Design Decisions
//! - Enqueue never blocks: at capacity the oldest span is evicted and a
//!   drop counter incremented
//! - A batch ships when the export interval elapses or the batch threshold
//!   is reached, whichever comes first
//! - Failed batches are logged and discarded, never requeued (at-most-once
//!   delivery keeps memory bounded)

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use metrics::counter;
use serde::Serialize;
use tokio::sync::{broadcast, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::TracingConfig;
use crate::observability::metrics::SPANS_DROPPED_TOTAL;
use crate::observability::span::Span;

/// Bounded buffer of closed spans awaiting export, shared across all
/// in-flight requests.
pub struct ExportQueue {
    inner: Mutex<VecDeque<Span>>,
    capacity: usize,
    batch_size: usize,
    batch_ready: Notify,
    dropped: AtomicU64,
    enqueued: AtomicU64,
}

impl ExportQueue {
    pub fn new(capacity: usize, batch_size: usize) -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity.max(1))),
            capacity: capacity.max(1),
            batch_size: batch_size.max(1),
            batch_ready: Notify::new(),
            dropped: AtomicU64::new(0),
            enqueued: AtomicU64::new(0),
        }
    }

    /// Insert a closed span. Never blocks beyond the queue mutex; at
    /// capacity the oldest span is evicted to make room.
    pub fn enqueue(&self, span: Span) {
        let notify = {
            let mut queue = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            if queue.len() == self.capacity {
                queue.pop_front();
                self.dropped.fetch_add(1, Ordering::Relaxed);
                counter!(SPANS_DROPPED_TOTAL).increment(1);
            }
            queue.push_back(span);
            self.enqueued.fetch_add(1, Ordering::Relaxed);
            queue.len() >= self.batch_size
        };
        if notify {
            self.batch_ready.notify_one();
        }
    }

    /// Remove and return up to `max` spans, oldest first.
    pub fn drain(&self, max: usize) -> Vec<Span> {
        let mut queue = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let take = max.min(queue.len());
        queue.drain(..take).collect()
    }

    /// Resolves once the queue holds at least a full batch.
    pub async fn batch_ready(&self) {
        self.batch_ready.notified().await;
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Spans evicted because the queue was full.
    pub fn dropped_total(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Spans ever accepted, including later-evicted ones.
    pub fn enqueued_total(&self) -> u64 {
        self.enqueued.load(Ordering::Relaxed)
    }
}

#[derive(Serialize)]
struct ExportBatch<'a> {
    service: &'a str,
    spans: Vec<Span>,
}

/// Background task shipping span batches to the trace collector.
pub struct BatchSpanExporter {
    queue: Arc<ExportQueue>,
    client: reqwest::Client,
    endpoint: String,
    service_name: String,
    batch_size: usize,
    interval: Duration,
}

impl BatchSpanExporter {
    pub fn new(queue: Arc<ExportQueue>, client: reqwest::Client, config: &TracingConfig) -> Self {
        Self {
            queue,
            client,
            endpoint: config.collector_endpoint.clone(),
            service_name: config.service_name.clone(),
            batch_size: config.batch_size.max(1),
            interval: Duration::from_millis(config.export_interval_ms.max(1)),
        }
    }

    /// Spawn the export loop. It drains the queue until the shutdown signal
    /// fires, then flushes whatever is left.
    pub fn spawn(self, mut shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = self.queue.batch_ready() => {}
                    _ = shutdown.recv() => break,
                }
                self.export_batch().await;
            }

            // Final flush so short-lived processes do not lose their spans.
            while !self.queue.is_empty() {
                self.export_batch().await;
            }
            tracing::debug!("span exporter stopped");
        })
    }

    async fn export_batch(&self) {
        let spans = self.queue.drain(self.batch_size);
        if spans.is_empty() {
            return;
        }
        let count = spans.len();
        let batch = ExportBatch {
            service: &self.service_name,
            spans,
        };

        match self.client.post(&self.endpoint).json(&batch).send().await {
            Ok(response) if response.status().is_success() => {
                tracing::trace!(count, "exported span batch");
            }
            Ok(response) => {
                tracing::warn!(
                    count,
                    status = %response.status(),
                    "trace collector rejected span batch, dropping it"
                );
            }
            Err(error) => {
                tracing::warn!(count, %error, "span batch export failed, dropping it");
            }
        }
    }
}
