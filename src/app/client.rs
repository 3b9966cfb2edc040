use super::config::ClientConfig;
use super::dispatcher::{DispatcherParams, DispatcherState, run_dispatch_loop};
use super::printer::{LinePrinter, StderrPrinter};
use super::shutdown::ShutdownSequencer;
use crate::domain::{LevelPolicy, LogLevel, LogRecord, QueuedRecord, ShipperError, Timestamp};
use crate::sender::{BatchSink, HttpClient, HttpTransmitter, StatsSnapshot, TransmissionStats};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

/// Open-ended record payload. The `level` key is always overwritten.
pub type Fields = Map<String, Value>;

/// Handle for emitting records. Cheap to clone; every clone feeds the same
/// dispatcher.
///
/// Intake calls wait when the queue is full instead of growing memory.
/// Records emitted concurrently with or after [`Client::shutdown`] may be lost.
#[derive(Debug, Clone)]
pub struct Client {
    intake: mpsc::Sender<QueuedRecord>,
    policy: LevelPolicy,
    sequencer: ShutdownSequencer,
    stats: Arc<TransmissionStats>,
    state: watch::Receiver<DispatcherState>,
}

impl Client {
    /// Starts a client that pushes over HTTP and prints to stderr.
    /// Must be called from within a Tokio runtime.
    pub fn new(config: ClientConfig) -> Result<Self, ShipperError> {
        config.validate()?;
        let client = HttpClient::new(config.http_client_config())?;
        let transmitter = HttpTransmitter::new(client, config.encoding);
        Self::with_parts(config, transmitter, StderrPrinter)
    }

    /// Starts a client with a caller-supplied sink and printer.
    pub fn with_parts<S, P>(config: ClientConfig, sink: S, printer: P) -> Result<Self, ShipperError>
    where
        S: BatchSink,
        P: LinePrinter,
    {
        config.validate()?;
        let runtime = Handle::try_current().map_err(|e| ShipperError::Runtime(e.to_string()))?;

        let (intake_tx, intake_rx) = mpsc::channel(config.queue_capacity);
        let (state_tx, state_rx) = watch::channel(DispatcherState::Running);
        let token = CancellationToken::new();
        let stats = Arc::new(TransmissionStats::new());
        let policy = config.level_policy();

        let dispatcher = runtime.spawn(run_dispatch_loop(DispatcherParams {
            config,
            intake_rx,
            shutdown: token.clone(),
            sink,
            printer,
            stats: stats.clone(),
            state_tx,
        }));

        Ok(Self {
            intake: intake_tx,
            policy,
            sequencer: ShutdownSequencer::new(token, dispatcher, state_rx.clone()),
            stats,
            state: state_rx,
        })
    }

    pub async fn debug(&self, fields: Fields) {
        self.log(LogLevel::Debug, fields).await;
    }

    pub async fn info(&self, fields: Fields) {
        self.log(LogLevel::Info, fields).await;
    }

    pub async fn warn(&self, fields: Fields) {
        self.log(LogLevel::Warn, fields).await;
    }

    pub async fn error(&self, fields: Fields) {
        self.log(LogLevel::Error, fields).await;
    }

    /// Stamps, renders and enqueues a record. Never fails from the caller's
    /// point of view: problems are logged and the record is dropped.
    pub async fn log(&self, level: LogLevel, mut fields: Fields) {
        if !self.policy.admits(level) {
            return;
        }

        fields.insert("level".to_string(), Value::String(level.as_str().to_string()));

        let line = match render_fields(&fields) {
            Ok(line) => line,
            Err(e) => {
                error!("Unable to render log fields: {}", e);
                return;
            }
        };

        let queued = QueuedRecord {
            record: LogRecord::new(Timestamp::now(), line),
            level,
        };

        if self.intake.send(queued).await.is_err() {
            debug!("Dispatcher has stopped, dropping {} record", level);
        }
    }

    /// Stops the dispatcher, flushing whatever it has accumulated, and waits
    /// for it to exit. Repeated calls are no-ops once it has stopped.
    pub async fn shutdown(&self) {
        self.sequencer.shutdown().await;
    }

    pub fn state(&self) -> DispatcherState {
        *self.state.borrow()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}

/// Renders fields as indented JSON with sorted keys.
pub fn render_fields(fields: &Fields) -> Result<String, ShipperError> {
    let mut buf = Vec::with_capacity(128);
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    fields.serialize(&mut serializer)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
