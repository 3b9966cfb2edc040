use super::config::ClientConfig;
use super::printer::LinePrinter;
use crate::buffer::{Batch, BatchAccumulator, BatchType};
use crate::domain::QueuedRecord;
use crate::sender::{BatchSink, TransmissionStats};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Lifecycle of the dispatch loop. Transitions are strictly
/// Running -> Draining -> Stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherState {
    Running,
    Draining,
    Stopped,
}

/// Upper bound on a single flush wait; longer waits mean size-only flushing.
const MAX_FLUSH_WAIT: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Bundled parameters for the dispatch loop.
pub struct DispatcherParams<S, P> {
    pub config: ClientConfig,
    pub intake_rx: mpsc::Receiver<QueuedRecord>,
    pub shutdown: CancellationToken,
    pub sink: S,
    pub printer: P,
    pub stats: Arc<TransmissionStats>,
    pub state_tx: watch::Sender<DispatcherState>,
}

/// Run the dispatch loop: intake -> print/accumulate -> flush.
///
/// Each iteration handles exactly one of: shutdown, a new record, or the
/// flush timer. A flush is awaited inline, so no new record or timer event
/// is handled while a push is in flight. On exit any pending entries are
/// flushed once as a final batch.
pub async fn run_dispatch_loop<S, P>(params: DispatcherParams<S, P>)
where
    S: BatchSink,
    P: LinePrinter,
{
    let DispatcherParams {
        config,
        mut intake_rx,
        shutdown,
        sink,
        printer,
        stats,
        state_tx,
    } = params;

    info!(
        "Starting dispatch loop (batch_entries_number={}, batch_wait={:?})",
        config.batch_entries_number, config.batch_wait
    );

    let policy = config.level_policy();
    let mut accumulator = BatchAccumulator::new(config.batch_entries_number);
    let flush_timer = sleep_until(flush_deadline(config.batch_wait));
    tokio::pin!(flush_timer);

    loop {
        tokio::select! {
            () = shutdown.cancelled() => {
                info!("Received shutdown signal, stopping dispatch loop");
                break;
            }

            received = intake_rx.recv() => {
                let Some(QueuedRecord { record, level }) = received else {
                    info!("Intake queue closed, stopping dispatch loop");
                    break;
                };

                let decision = policy.decide(level);
                if decision.print {
                    printer.print_line(&record.line);
                }

                if decision.send && accumulator.push(record) {
                    if let Some(batch) = accumulator.take(&config.labels, BatchType::SizeBased) {
                        flush_batch(&sink, &stats, batch).await;
                    }
                    // Restart the whole wait window after a size-triggered flush
                    flush_timer.as_mut().reset(flush_deadline(config.batch_wait));
                }
            }

            () = &mut flush_timer => {
                if let Some(batch) = accumulator.take(&config.labels, BatchType::TimeBased) {
                    flush_batch(&sink, &stats, batch).await;
                }
                flush_timer.as_mut().reset(flush_deadline(config.batch_wait));
            }
        }
    }

    state_tx.send_replace(DispatcherState::Draining);

    if let Some(batch) = accumulator.take(&config.labels, BatchType::Shutdown) {
        info!("Flushing {} pending entries before exit", batch.size());
        flush_batch(&sink, &stats, batch).await;
    }

    state_tx.send_replace(DispatcherState::Stopped);
    info!("Dispatch loop stopped");
}

/// Deadline for the next time-based flush, clamped so that huge waits never
/// overflow `Instant`.
fn flush_deadline(batch_wait: Duration) -> Instant {
    Instant::now() + batch_wait.min(MAX_FLUSH_WAIT)
}

/// Hand a batch to the sink. Failures are logged and the batch is dropped.
async fn flush_batch<S: BatchSink>(sink: &S, stats: &TransmissionStats, batch: Batch) {
    let batch_id = batch.id().to_string();
    let batch_type = batch.batch_type();
    let entry_count = batch.size();

    debug!(
        "Flushing {:?} batch {} with {} entries",
        batch_type, batch_id, entry_count
    );

    match sink.send_batch(batch).await {
        Ok(result) => {
            stats.record_success(result.entries, result.bytes_sent);
            debug!(
                "Pushed batch {} ({} entries, {} bytes) in {:?}",
                batch_id, result.entries, result.bytes_sent, result.latency
            );
        }
        Err(e) => {
            stats.record_drop(entry_count);
            error!(
                "Dropping batch {} ({} entries): {}",
                batch_id, entry_count, e
            );
        }
    }
}
