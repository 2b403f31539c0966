//! Re-export the original points behind a displayed surface
//!
//! The displayed surface is cleaned once. Every registered element that was
//! loaded from a file then has its source cloud reloaded, matched against the
//! cleaned surface and written back out with only the matched points and all
//! of their original fields.

use crate::logger::ExportLogger;
use crate::source::{SourceFileRef, SourceRegistry};
use crate::surface::DisplaySurface;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use threecrate_algorithms::find_correspondences;
use threecrate_core::{Point3f, PointCloud};
use threecrate_io::{CloudWriteOptions, IoRegistry};

/// Export failures; any of them ends the export
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to load source cloud {}: {source}", .path.display())]
    LoadFailure {
        path: PathBuf,
        source: threecrate_core::Error,
    },

    #[error("failed to save filtered cloud {}: {source}", .path.display())]
    SaveFailure {
        path: PathBuf,
        source: threecrate_core::Error,
    },

    #[error("cannot match displayed points against {}: {source}", .path.display())]
    Correspondence {
        path: PathBuf,
        source: threecrate_core::Error,
    },
}

impl ExportError {
    /// File the failure refers to
    pub fn path(&self) -> &Path {
        match self {
            ExportError::LoadFailure { path, .. }
            | ExportError::SaveFailure { path, .. }
            | ExportError::Correspondence { path, .. } => path,
        }
    }
}

/// Where and how filtered clouds are written
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    /// Prepended to the sequence number; may include a directory
    pub output_prefix: String,
    /// File extension, also used as the writer's format hint
    pub extension: String,
    pub binary: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            output_prefix: String::new(),
            extension: "pcd".to_string(),
            binary: true,
        }
    }
}

impl ExportOptions {
    pub fn with_prefix(output_prefix: impl Into<String>) -> Self {
        Self {
            output_prefix: output_prefix.into(),
            ..Default::default()
        }
    }

    pub fn binary(mut self, binary: bool) -> Self {
        self.binary = binary;
        self
    }

    /// `<prefix><n>.<extension>`
    pub fn output_path(&self, n: usize) -> PathBuf {
        PathBuf::from(format!("{}{}.{}", self.output_prefix, n, self.extension))
    }

    /// Identity pose, body encoding from `binary`
    pub fn write_options(&self) -> CloudWriteOptions {
        CloudWriteOptions {
            binary: self.binary,
            ..Default::default()
        }
    }
}

/// Outcome of a successful export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    /// Displayed points removed by the cleaning pass
    pub pruned: usize,
    /// Displayed points left after cleaning
    pub displayed: usize,
    /// Files written, in registry order
    pub written: Vec<PathBuf>,
}

/// Exports filtered copies of source clouds
pub struct CloudExporter<'a, L: ExportLogger + ?Sized> {
    io: &'a IoRegistry,
    logger: &'a L,
    options: ExportOptions,
}

impl<'a, L: ExportLogger + ?Sized> CloudExporter<'a, L> {
    pub fn new(io: &'a IoRegistry, logger: &'a L) -> Self {
        Self {
            io,
            logger,
            options: ExportOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ExportOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    /// Write one filtered cloud per distinct source file in `sources`
    ///
    /// Entries without a source file are skipped, as are later entries that
    /// share an already exported file. Files are compared by
    /// [`SourceFileRef::file_key`], so `./a.pcd` and `a.pcd` are one file.
    /// Output files are numbered from 1 in registry order. The first load,
    /// match or save failure aborts the export; files written before it stay
    /// on disk.
    pub fn export_corresponding(
        &self,
        surface: &DisplaySurface,
        sources: &SourceRegistry,
    ) -> Result<ExportSummary, ExportError> {
        let (displayed, pruned) = surface.clean();
        if pruned > 0 {
            self.logger.info(&format!("Number of points pruned: {}", pruned));
        }

        let mut written = Vec::new();
        let mut exported: HashSet<PathBuf> = HashSet::new();

        for entry in sources {
            let Some(source) = entry.source.as_ref() else {
                self.logger.debug(&format!("Skipping {}: not loaded from a file", entry.id));
                continue;
            };
            if !exported.insert(source.file_key()) {
                self.logger.debug(&format!(
                    "Skipping {}: {} already exported",
                    entry.id,
                    source.path.display()
                ));
                continue;
            }

            let out_path = self.options.output_path(written.len() + 1);
            self.export_source(&displayed, source, &out_path)?;
            written.push(out_path);
        }

        self.logger.info(&format!(
            "Exported {} cloud(s) from {} displayed points",
            written.len(),
            displayed.len()
        ));

        Ok(ExportSummary {
            pruned,
            displayed: displayed.len(),
            written,
        })
    }

    fn export_source(
        &self,
        displayed: &PointCloud<Point3f>,
        source: &SourceFileRef,
        out_path: &Path,
    ) -> Result<(), ExportError> {
        let path = &source.path;

        self.logger.debug(&format!("Load: {} ...", path.display()));
        let cloud = self
            .io
            .read_cloud(path, &source.format_hint)
            .and_then(|cloud| cloud.to_point_cloud().map(|xyz| (cloud, xyz)));
        let (cloud, reference) = match cloud {
            Ok(loaded) => loaded,
            Err(source) => {
                self.logger.error(&format!("Load: {} [failed]: {}", path.display(), source));
                return Err(ExportError::LoadFailure {
                    path: path.clone(),
                    source,
                });
            }
        };
        self.logger.debug(&format!("Load: {} [success]", path.display()));

        let filtered = find_correspondences(displayed, &reference)
            .and_then(|indices| cloud.select(indices.as_slice()));
        let filtered = match filtered {
            Ok(filtered) => filtered,
            Err(source) => {
                self.logger.error(&format!("Match: {} [failed]: {}", path.display(), source));
                return Err(ExportError::Correspondence {
                    path: path.clone(),
                    source,
                });
            }
        };

        self.logger.debug(&format!("Save: {} ...", out_path.display()));
        if let Err(source) = self.io.write_cloud(
            &filtered,
            out_path,
            &self.options.extension,
            &self.options.write_options(),
        ) {
            self.logger.error(&format!("Save: {} [failed]: {}", out_path.display(), source));
            return Err(ExportError::SaveFailure {
                path: out_path.to_path_buf(),
                source,
            });
        }
        self.logger.debug(&format!(
            "Save: {} [success] ({} of {} points)",
            out_path.display(),
            filtered.len(),
            cloud.len()
        ));

        Ok(())
    }
}

/// Export with the built-in formats and default options
///
/// Filtered clouds are written as binary PCD files named
/// `<output_prefix><n>.pcd`.
pub fn export_corresponding<L: ExportLogger + ?Sized>(
    surface: &DisplaySurface,
    output_prefix: &str,
    sources: &SourceRegistry,
    logger: &L,
) -> Result<ExportSummary, ExportError> {
    let io = IoRegistry::with_defaults();
    CloudExporter::new(&io, logger)
        .with_options(ExportOptions::with_prefix(output_prefix))
        .export_corresponding(surface, sources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::RecordingLogger;
    use crate::source::SourceEntry;
    use std::sync::Mutex;
    use threecrate_core::{Error, Point3d, Result};
    use threecrate_io::{CloudReader, CloudWriter, FieldCloud};

    // Serves a fixed cloud for every path except "missing.mem"
    struct MemoryReader(PointCloud<Point3f>);

    impl CloudReader for MemoryReader {
        fn read_cloud(&self, path: &Path) -> Result<FieldCloud> {
            if path == Path::new("missing.mem") {
                return Err(Error::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "missing")));
            }
            Ok(FieldCloud::from_point_cloud(&self.0))
        }

        fn can_read(&self, _path: &Path) -> bool {
            true
        }

        fn format_name(&self) -> &'static str {
            "mem"
        }
    }

    #[derive(Default)]
    struct MemoryWriter {
        saved: Mutex<Vec<(PathBuf, usize)>>,
        fail: bool,
    }

    impl CloudWriter for MemoryWriter {
        fn write_cloud(&self, cloud: &FieldCloud, path: &Path, _options: &CloudWriteOptions) -> Result<()> {
            if self.fail {
                return Err(Error::Unsupported("read-only".to_string()));
            }
            if let Ok(mut saved) = self.saved.lock() {
                saved.push((path.to_path_buf(), cloud.len()));
            }
            Ok(())
        }

        fn format_name(&self) -> &'static str {
            "mem"
        }
    }

    fn reference() -> PointCloud<Point3f> {
        (0..10).map(|i| Point3f::new(i as f32, 0.0, 0.0)).collect()
    }

    fn io_registry(fail_writes: bool) -> IoRegistry {
        let mut io = IoRegistry::new();
        io.register_reader("mem", Box::new(MemoryReader(reference())));
        io.register_writer(
            "mem",
            Box::new(MemoryWriter {
                fail: fail_writes,
                ..Default::default()
            }),
        );
        io
    }

    fn options() -> ExportOptions {
        ExportOptions {
            output_prefix: "out".to_string(),
            extension: "mem".to_string(),
            binary: true,
        }
    }

    fn surface() -> DisplaySurface {
        DisplaySurface::new(vec![
            Point3d::new(2.1, 0.0, 0.0),
            Point3d::new(7.0, 0.2, 0.0),
            Point3d::new(2.1, 0.0, 0.0),
        ])
    }

    #[test]
    fn test_output_paths() {
        let options = ExportOptions::with_prefix("/tmp/scan_");
        assert_eq!(options.output_path(1), PathBuf::from("/tmp/scan_1.pcd"));
        assert_eq!(options.output_path(12), PathBuf::from("/tmp/scan_12.pcd"));
        assert!(options.write_options().binary);
        assert!(!options.binary(false).write_options().binary);
    }

    #[test]
    fn test_counter_skips_display_only_and_shared_entries() {
        let io = io_registry(false);
        let logger = RecordingLogger::new();

        let mut sources = SourceRegistry::new();
        sources.register_display_only("axes");
        sources.register_source("a-0", SourceFileRef::new("a.mem", "mem"));
        sources.register_source("a-1", SourceFileRef::new("a.mem", "mem"));
        sources.register_source("b", SourceFileRef::new("b.mem", "mem"));

        let summary = CloudExporter::new(&io, &logger)
            .with_options(options())
            .export_corresponding(&surface(), &sources)
            .unwrap();

        assert_eq!(summary.pruned, 1);
        assert_eq!(summary.displayed, 2);
        assert_eq!(summary.written, vec![PathBuf::from("out1.mem"), PathBuf::from("out2.mem")]);
        assert!(logger.contains("Number of points pruned: 1"));
        assert!(logger.contains("Skipping axes"));
        assert!(logger.contains("Skipping a-1"));
    }

    #[test]
    fn test_differently_spelled_paths_share_one_output() {
        let io = io_registry(false);
        let logger = RecordingLogger::new();

        let mut sources = SourceRegistry::new();
        sources.register_source("a-0", SourceFileRef::new("./a.mem", "mem"));
        sources.register_source("a-1", SourceFileRef::new("a.mem", "mem"));

        let summary = CloudExporter::new(&io, &logger)
            .with_options(options())
            .export_corresponding(&surface(), &sources)
            .unwrap();

        assert_eq!(summary.written, vec![PathBuf::from("out1.mem")]);
        assert!(logger.contains("Skipping a-1"));
    }

    #[test]
    fn test_load_failure_stops_export() {
        let io = io_registry(false);
        let logger = RecordingLogger::new();

        let sources: SourceRegistry = vec![
            SourceEntry::with_source("missing", SourceFileRef::new("missing.mem", "mem")),
            SourceEntry::with_source("b", SourceFileRef::new("b.mem", "mem")),
        ]
        .into_iter()
        .collect();

        let err = CloudExporter::new(&io, &logger)
            .with_options(options())
            .export_corresponding(&surface(), &sources)
            .unwrap_err();

        assert!(matches!(err, ExportError::LoadFailure { .. }));
        assert_eq!(err.path(), Path::new("missing.mem"));
        assert!(logger.contains("Load: missing.mem [failed]"));
        assert!(!logger.contains("b.mem"));
    }

    #[test]
    fn test_save_failure_stops_export() {
        let io = io_registry(true);
        let logger = RecordingLogger::new();

        let mut sources = SourceRegistry::new();
        sources.register_source("a", SourceFileRef::new("a.mem", "mem"));
        sources.register_source("b", SourceFileRef::new("b.mem", "mem"));

        let err = CloudExporter::new(&io, &logger)
            .with_options(options())
            .export_corresponding(&surface(), &sources)
            .unwrap_err();

        assert!(matches!(err, ExportError::SaveFailure { .. }));
        assert_eq!(err.path(), Path::new("out1.mem"));
        assert!(err.to_string().contains("out1.mem"));
        assert!(!logger.contains("b.mem"));
    }

    #[test]
    fn test_empty_source_cloud_is_terminal() {
        let mut io = IoRegistry::new();
        io.register_reader("mem", Box::new(MemoryReader(PointCloud::new())));
        io.register_writer("mem", Box::new(MemoryWriter::default()));
        let logger = RecordingLogger::new();

        let mut sources = SourceRegistry::new();
        sources.register_source("empty", SourceFileRef::new("empty.mem", "mem"));

        let err = CloudExporter::new(&io, &logger)
            .with_options(options())
            .export_corresponding(&surface(), &sources)
            .unwrap_err();
        assert!(matches!(
            err,
            ExportError::Correspondence {
                source: Error::InvalidArgument(_),
                ..
            }
        ));
    }

    #[test]
    fn test_empty_registry_writes_nothing() {
        let io = io_registry(false);
        let logger = RecordingLogger::new();
        let summary = CloudExporter::new(&io, &logger)
            .with_options(options())
            .export_corresponding(&surface(), &SourceRegistry::new())
            .unwrap();
        assert!(summary.written.is_empty());
        assert!(logger.contains("Exported 0 cloud(s)"));
    }
}
