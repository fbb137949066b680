//! Import sessions: one owned scene, scoped imports into it.
//!
//! An [`ImportSession`] owns the [`SceneGraph`] and the options. Each import
//! runs inside an [`ImportScope`], which enters a tracing span for its
//! lifetime, forwards diagnostics to an [`EventSink`], and folds its totals
//! back into the session when dropped.
use std::fmt;
use std::path::Path;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::span::EnteredSpan;
use tracing::{info, info_span};

use crate::ascii::parser::parse_scene_text;
use crate::binary::chunk::FourCC;
use crate::binary::indexer::{index_chunks, ChunkLayout, IndexOptions};
use crate::binary::reader::read_scene_chunks;
use crate::error::{Error, Result};
use crate::events::{EventSink, ImportEvent, ImportEventKind, ImportSummary};
use crate::graph::SceneGraph;

/// Input format of a scene file.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SourceFormat {
    /// Statement-oriented text.
    Ascii,
    /// Nested four-character-code chunks.
    Binary,
}

impl SourceFormat {
    /// Bytes inspected when deciding whether unknown input is text.
    const SNIFF_WINDOW: usize = 512;

    /// Detects the format from the leading bytes.
    ///
    /// A leading container tag means binary; NUL-free text means ASCII.
    pub fn detect(bytes: &[u8]) -> Result<Self> {
        if FourCC::from_slice(bytes).is_some_and(ChunkLayout::is_container) {
            return Ok(SourceFormat::Binary);
        }
        let window = &bytes[..bytes.len().min(Self::SNIFF_WINDOW)];
        if !window.contains(&0) {
            return Ok(SourceFormat::Ascii);
        }
        Err(Error::UnknownFormat(format!(
            "no container tag and {} leading bytes are not text",
            window.len()
        )))
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceFormat::Ascii => f.write_str("ascii"),
            SourceFormat::Binary => f.write_str("binary"),
        }
    }
}

/// Options for an [`ImportSession`].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[non_exhaustive]
#[derive(Clone, Debug, Default)]
pub struct ImportOptions {
    /// Limits for the binary chunk walk.
    pub index: IndexOptions,
    /// Skip detection and always read this format.
    pub format: Option<SourceFormat>,
}

impl ImportOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_index(mut self, index: IndexOptions) -> Self {
        self.index = index;
        self
    }

    pub fn with_format(mut self, format: SourceFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// Validates the options, returning an error if invalid.
    pub fn validate(&self) -> Result<()> {
        self.index.validate()
    }
}

/// Owns a scene and the options used to import into it.
#[derive(Debug, Default)]
pub struct ImportSession {
    scene: SceneGraph,
    options: ImportOptions,
    summary: ImportSummary,
    imports: usize,
}

impl ImportSession {
    /// Creates a session with an empty scene.
    pub fn new(options: ImportOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            options,
            ..Default::default()
        })
    }

    pub fn options(&self) -> &ImportOptions {
        &self.options
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut SceneGraph {
        &mut self.scene
    }

    pub fn into_scene(self) -> SceneGraph {
        self.scene
    }

    /// Totals over every finished import.
    pub fn summary(&self) -> &ImportSummary {
        &self.summary
    }

    /// Number of finished imports.
    pub fn imports(&self) -> usize {
        self.imports
    }

    /// Opens an import scope; it ends when the returned guard is dropped.
    pub fn begin_import<'a>(
        &'a mut self,
        source: impl Into<String>,
        format: SourceFormat,
        sink: &'a mut dyn EventSink,
    ) -> ImportScope<'a> {
        let source = source.into();
        let span = info_span!("import", source = %source, format = %format).entered();
        if sink.wants(ImportEventKind::ImportStarted) {
            sink.send(ImportEvent::ImportStarted {
                source: source.clone(),
                format,
            });
        }
        ImportScope {
            session: self,
            sink,
            source,
            format,
            summary: ImportSummary::default(),
            _span: span,
        }
    }

    /// Imports an in-memory file, detecting its format unless one is forced.
    pub fn import_bytes(
        &mut self,
        source: impl Into<String>,
        bytes: &[u8],
        sink: &mut dyn EventSink,
    ) -> Result<ImportSummary> {
        let format = match self.options.format {
            Some(format) => format,
            None => SourceFormat::detect(bytes)?,
        };
        let mut scope = self.begin_import(source, format, sink);
        match format {
            SourceFormat::Ascii => scope.ingest_ascii(&String::from_utf8_lossy(bytes)),
            SourceFormat::Binary => scope.ingest_binary(bytes),
        }
        Ok(scope.finish())
    }

    /// Reads `path` fully and imports it.
    pub fn import_path(
        &mut self,
        path: impl AsRef<Path>,
        sink: &mut dyn EventSink,
    ) -> Result<ImportSummary> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        self.import_bytes(path.display().to_string(), &bytes, sink)
    }
}

/// Guard for one import into an [`ImportSession`].
pub struct ImportScope<'a> {
    session: &'a mut ImportSession,
    sink: &'a mut dyn EventSink,
    source: String,
    format: SourceFormat,
    summary: ImportSummary,
    _span: EnteredSpan,
}

impl ImportScope<'_> {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn format(&self) -> SourceFormat {
        self.format
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.session.scene
    }

    /// Totals so far in this scope.
    pub fn summary(&self) -> &ImportSummary {
        &self.summary
    }

    /// Parses scene text into the session's scene.
    pub fn ingest_ascii(&mut self, text: &str) {
        let summary = parse_scene_text(text, &mut self.session.scene, &mut *self.sink);
        self.summary.merge(&summary);
    }

    /// Indexes `buf` and reads scene data from it.
    pub fn ingest_binary(&mut self, buf: &[u8]) {
        let index = index_chunks(buf, &self.session.options.index);
        let summary = read_scene_chunks(buf, &index, &mut self.session.scene, &mut *self.sink);
        self.summary.merge(&summary);
    }

    /// Ends the scope and returns its totals.
    pub fn finish(self) -> ImportSummary {
        let mut summary = self.summary.clone();
        summary.nodes = self.session.scene.len();
        summary
    }
}

impl Drop for ImportScope<'_> {
    fn drop(&mut self) {
        self.summary.nodes = self.session.scene.len();
        info!(
            nodes = self.summary.nodes,
            attributes = self.summary.attributes,
            connections = self.summary.connections,
            skipped = self.summary.skipped_statements,
            anomalies = self.summary.anomalies,
            "Finished importing {}.",
            self.source
        );
        if self.sink.wants(ImportEventKind::ImportFinished) {
            self.sink.send(ImportEvent::ImportFinished {
                summary: self.summary.clone(),
            });
        }
        self.session.summary.merge(&self.summary);
        self.session.imports += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::VecSink;

    fn leaf(tag: &[u8; 4], payload: &[u8]) -> Vec<u8> {
        let mut out = tag.to_vec();
        out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        out.extend_from_slice(payload);
        while out.len() % 4 != 0 {
            out.push(0);
        }
        out
    }

    fn binary_scene() -> Vec<u8> {
        let mut payload = b"XFRM".to_vec();
        payload.extend(leaf(b"CREA", b"node1\0"));
        let mut out = b"FOR4".to_vec();
        out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        out.extend(payload);
        out
    }

    #[test]
    fn detects_formats() {
        assert_eq!(SourceFormat::detect(b"FOR4\0\0\0\0").unwrap(), SourceFormat::Binary);
        assert_eq!(SourceFormat::detect(b"createNode a;").unwrap(), SourceFormat::Ascii);
        assert_eq!(SourceFormat::detect(b"").unwrap(), SourceFormat::Ascii);
        assert!(matches!(
            SourceFormat::detect(&[0xde, 0xad, 0, 0xef]),
            Err(Error::UnknownFormat(_))
        ));
    }

    #[test]
    fn scope_reports_start_and_finish() {
        let mut session = ImportSession::new(ImportOptions::default()).unwrap();
        let mut sink = VecSink::new();
        {
            let mut scope = session.begin_import("inline", SourceFormat::Ascii, &mut sink);
            scope.ingest_ascii("createNode transform -n a; bogus 1 2;");
            assert_eq!(scope.summary().statements, 1);
        }
        assert_eq!(sink.count(ImportEventKind::ImportStarted), 1);
        assert_eq!(sink.count(ImportEventKind::ImportFinished), 1);
        assert_eq!(sink.count(ImportEventKind::StatementSkipped), 1);
        assert_eq!(session.imports(), 1);
        assert_eq!(session.summary().nodes, 1);
    }

    #[test]
    fn imports_accumulate_into_one_scene() {
        let mut session = ImportSession::new(ImportOptions::default()).unwrap();
        let mut sink = ();
        session
            .import_bytes("a.ma", b"createNode transform -n a;", &mut sink)
            .unwrap();
        let summary = session
            .import_bytes("b.mb", &binary_scene(), &mut sink)
            .unwrap();
        assert_eq!(summary.chunks, 2);
        assert!(session.scene().contains("a"));
        assert_eq!(session.scene().node("node1").unwrap().node_type(), "XFRM");
        assert_eq!(session.summary().nodes, 2);
        assert_eq!(session.imports(), 2);
    }

    #[test]
    fn forced_format_skips_detection() {
        let options = ImportOptions::new().with_format(SourceFormat::Ascii);
        let mut session = ImportSession::new(options).unwrap();
        let summary = session
            .import_bytes("x", b"select -ne :time1;", &mut ())
            .unwrap();
        assert_eq!(summary.statements, 1);
    }

    #[test]
    fn invalid_options_are_rejected() {
        let options = ImportOptions::new().with_index(IndexOptions::default().with_max_chunks(0));
        assert!(matches!(
            ImportSession::new(options),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let mut session = ImportSession::new(ImportOptions::default()).unwrap();
        let err = session
            .import_path("/definitely/not/here.ma", &mut ())
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
