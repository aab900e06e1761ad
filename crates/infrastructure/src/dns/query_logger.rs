use sentry_dns_application::ports::{MetricsSink, QueryLogStorage};
use sentry_dns_domain::QueryEvent;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Async query logger (§4.7): a bounded channel fed by `try_send` so the
/// DNS hot path never blocks on logging, drained by a background worker
/// that batches by size or flush interval, whichever comes first. Once the
/// channel is full, new events are dropped and counted rather than
/// applying backpressure to query processing.
pub struct AsyncQueryLogger {
    sender: mpsc::Sender<QueryEvent>,
    dropped: Arc<AtomicU64>,
    failed_batches: Arc<AtomicU64>,
    capacity: usize,
    high_watermark_warned: AtomicBool,
}

impl AsyncQueryLogger {
    /// Spawns the background flush worker and returns the handle used to
    /// submit events plus the worker's `JoinHandle` for graceful shutdown.
    pub fn start(
        storage: Arc<dyn QueryLogStorage>,
        buffer_size: usize,
        batch_size: usize,
        flush_interval: Duration,
        shutdown: CancellationToken,
        metrics: Arc<dyn MetricsSink>,
    ) -> (Self, tokio::task::JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(buffer_size.max(1));
        let dropped = Arc::new(AtomicU64::new(0));
        let failed_batches = Arc::new(AtomicU64::new(0));

        let handle = tokio::spawn(run_worker(
            storage,
            rx,
            batch_size.max(1),
            flush_interval,
            shutdown,
            dropped.clone(),
            failed_batches.clone(),
            metrics,
        ));

        (
            Self {
                sender: tx,
                dropped,
                failed_batches,
                capacity: buffer_size.max(1),
                high_watermark_warned: AtomicBool::new(false),
            },
            handle,
        )
    }

    /// Submits an event without blocking. Returns `false` if the channel
    /// is full and the event was dropped (counted, not fatal).
    pub fn submit(&self, event: QueryEvent) -> bool {
        self.check_watermark();
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    fn check_watermark(&self) {
        let occupancy = 1.0 - (self.sender.capacity() as f64 / self.capacity as f64);
        let already_warned = self.high_watermark_warned.load(Ordering::Relaxed);

        if occupancy > 0.8 && !already_warned {
            self.high_watermark_warned.store(true, Ordering::Relaxed);
            warn!(occupancy_pct = (occupancy * 100.0) as u32, "query logger buffer above high watermark");
        } else if occupancy < 0.5 && already_warned {
            self.high_watermark_warned.store(false, Ordering::Relaxed);
            debug!("query logger buffer back under low watermark");
        }
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Number of batches whose storage commit failed (§4.7: "the batch is
    /// counted as failed"), not the number of events lost (a failed batch
    /// is logged and discarded, not retried).
    pub fn failed_batches_count(&self) -> u64 {
        self.failed_batches.load(Ordering::Relaxed)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

async fn run_worker(
    storage: Arc<dyn QueryLogStorage>,
    mut rx: mpsc::Receiver<QueryEvent>,
    batch_size: usize,
    flush_interval: Duration,
    shutdown: CancellationToken,
    dropped: Arc<AtomicU64>,
    failed_batches: Arc<AtomicU64>,
    metrics: Arc<dyn MetricsSink>,
) {
    let mut batch = Vec::with_capacity(batch_size);
    let mut ticker = tokio::time::interval(flush_interval);
    ticker.tick().await;

    loop {
        tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                drain_remaining(&mut rx, &mut batch, batch_size);
                flush(&storage, &mut batch, &failed_batches, &metrics).await;
                storage.close().await;
                break;
            }

            maybe_event = rx.recv() => {
                match maybe_event {
                    Some(event) => {
                        batch.push(event);
                        if batch.len() >= batch_size {
                            flush(&storage, &mut batch, &failed_batches, &metrics).await;
                        }
                    }
                    None => {
                        flush(&storage, &mut batch, &failed_batches, &metrics).await;
                        storage.close().await;
                        break;
                    }
                }
            }

            _ = ticker.tick() => {
                if !batch.is_empty() {
                    flush(&storage, &mut batch, &failed_batches, &metrics).await;
                }
            }
        }
    }

    let total_dropped = dropped.load(Ordering::Relaxed);
    let total_failed_batches = failed_batches.load(Ordering::Relaxed);
    debug!(total_dropped, total_failed_batches, "query logger worker shut down");
}

fn drain_remaining(rx: &mut mpsc::Receiver<QueryEvent>, batch: &mut Vec<QueryEvent>, batch_size: usize) {
    while let Ok(event) = rx.try_recv() {
        batch.push(event);
        if batch.len() >= batch_size * 4 {
            break;
        }
    }
}

/// Commits one batch, recording its outcome to `storage.batch.*` (§6.4) and
/// the failed-batch counter (§4.7) on a storage error.
async fn flush(
    storage: &Arc<dyn QueryLogStorage>,
    batch: &mut Vec<QueryEvent>,
    failed_batches: &Arc<AtomicU64>,
    metrics: &Arc<dyn MetricsSink>,
) {
    if batch.is_empty() {
        return;
    }
    let events = std::mem::take(batch);
    let batch_len = events.len();
    let started = Instant::now();
    let result = storage.log_query_batch(&events).await;
    metrics.observe_histogram("storage.batch.flush_duration", started.elapsed().as_secs_f64() * 1000.0);
    metrics.observe_histogram("storage.batch.flush_size", batch_len as f64);
    if let Err(err) = result {
        failed_batches.fetch_add(1, Ordering::Relaxed);
        warn!(error = %err, batch_size = batch_len, "failed to persist query log batch");
    }
}
