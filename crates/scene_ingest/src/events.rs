//! Event types and sinks for observing imports.
//!
//! Imports never abort on malformed content; instead they report what they
//! skipped or repaired as [`ImportEvent`]s. Sinks collect, forward or drop them
//! while running an [`crate::session::ImportScope`] or the readers directly.
use tracing::{debug, trace, warn};

use crate::binary::indexer::IndexAnomaly;
use crate::session::SourceFormat;

/// Describes events emitted while importing a scene.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub enum ImportEvent {
    /// Emitted when an import scope starts.
    ImportStarted {
        /// Label of the imported source (usually a path).
        source: String,
        /// Detected or requested input format.
        format: SourceFormat,
    },

    /// Emitted when an import scope ends.
    ImportFinished {
        /// Totals for the scope.
        summary: ImportSummary,
    },

    /// A structural problem the binary indexer recovered from.
    ChunkAnomaly { anomaly: IndexAnomaly },

    /// An ASCII statement that was not understood or could not be applied.
    StatementSkipped {
        /// First word of the statement.
        command: String,
        /// Human-readable reason.
        reason: String,
    },

    /// Non-fatal warning generated during import.
    Warning {
        /// Context string (e.g. node name, chunk offset).
        context: String,
        /// Human-readable message.
        message: String,
    },
}

impl ImportEvent {
    pub fn kind(&self) -> ImportEventKind {
        match self {
            ImportEvent::ImportStarted { .. } => ImportEventKind::ImportStarted,
            ImportEvent::ImportFinished { .. } => ImportEventKind::ImportFinished,
            ImportEvent::ChunkAnomaly { .. } => ImportEventKind::ChunkAnomaly,
            ImportEvent::StatementSkipped { .. } => ImportEventKind::StatementSkipped,
            ImportEvent::Warning { .. } => ImportEventKind::Warning,
        }
    }

    pub(crate) fn warning(context: impl Into<String>, message: impl Into<String>) -> Self {
        ImportEvent::Warning {
            context: context.into(),
            message: message.into(),
        }
    }
}

/// Discriminant of [`ImportEvent`], used by sinks to filter cheaply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImportEventKind {
    ImportStarted,
    ImportFinished,
    ChunkAnomaly,
    StatementSkipped,
    Warning,
}

/// Totals gathered over one import scope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Nodes in the scene after the import.
    pub nodes: usize,
    /// Attribute values written during the import.
    pub attributes: usize,
    /// Connections recorded during the import.
    pub connections: usize,
    /// ASCII statements applied.
    pub statements: usize,
    /// ASCII statements skipped.
    pub skipped_statements: usize,
    /// Binary chunks indexed.
    pub chunks: usize,
    /// Recovered binary anomalies.
    pub anomalies: usize,
}

impl ImportSummary {
    pub fn merge(&mut self, other: &ImportSummary) {
        self.attributes += other.attributes;
        self.connections += other.connections;
        self.statements += other.statements;
        self.skipped_statements += other.skipped_statements;
        self.chunks += other.chunks;
        self.anomalies += other.anomalies;
        self.nodes = other.nodes.max(self.nodes);
    }
}

/// Receives [`ImportEvent`]s from readers and import scopes.
pub trait EventSink {
    fn send(&mut self, event: ImportEvent);

    /// Whether events of `kind` should be built and sent at all.
    fn wants(&self, _kind: ImportEventKind) -> bool {
        true
    }
}

/// Drops everything.
impl EventSink for () {
    #[inline]
    fn send(&mut self, _event: ImportEvent) {}

    #[inline]
    fn wants(&self, _kind: ImportEventKind) -> bool {
        false
    }
}

/// Calls a closure for each event.
pub struct FnSink<F>
where
    F: FnMut(ImportEvent),
{
    callback: F,
}

impl<F> FnSink<F>
where
    F: FnMut(ImportEvent),
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> EventSink for FnSink<F>
where
    F: FnMut(ImportEvent),
{
    #[inline]
    fn send(&mut self, event: ImportEvent) {
        (self.callback)(event);
    }
}

/// Buffers events for later inspection.
#[derive(Debug, Default)]
pub struct VecSink {
    events: Vec<ImportEvent>,
}

impl VecSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_inner(self) -> Vec<ImportEvent> {
        self.events
    }

    pub fn as_slice(&self) -> &[ImportEvent] {
        &self.events
    }

    /// Number of collected events of `kind`.
    pub fn count(&self, kind: ImportEventKind) -> usize {
        self.events.iter().filter(|e| e.kind() == kind).count()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl EventSink for VecSink {
    #[inline]
    fn send(&mut self, event: ImportEvent) {
        self.events.push(event);
    }
}

/// Forwards events to `tracing`.
///
/// Anomalies and warnings log at `warn`, skipped statements at `debug`,
/// scope boundaries at `trace` (the scope itself already logs its summary).
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn send(&mut self, event: ImportEvent) {
        match event {
            ImportEvent::ImportStarted { source, format } => {
                trace!("Import of {} ({}) started.", source, format);
            }
            ImportEvent::ImportFinished { summary } => {
                trace!("Import finished with {} nodes.", summary.nodes);
            }
            ImportEvent::ChunkAnomaly { anomaly } => {
                warn!(
                    "Chunk anomaly at offset {} (depth {}): {:?}.",
                    anomaly.offset, anomaly.depth, anomaly.kind
                );
            }
            ImportEvent::StatementSkipped { command, reason } => {
                debug!("Skipped '{}': {}.", command, reason);
            }
            ImportEvent::Warning { context, message } => {
                warn!("{}: {}", context, message);
            }
        }
    }
}
