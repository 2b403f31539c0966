//! Display-side provenance and export of displayed points
//!
//! A viewer shows a surface assembled from one or more point cloud files. This
//! crate tracks which displayed element came from which file and writes back
//! filtered copies of those files holding only the points that are on screen:
//! - [`SourceRegistry`] of displayed elements and their source files
//! - [`DisplaySurface`] with the zero tolerance cleaning pass
//! - [`CloudExporter`] and [`export_corresponding`]
//! - [`ExportLogger`] for progress reporting

pub mod export;
pub mod logger;
pub mod source;
pub mod surface;

pub use export::{export_corresponding, CloudExporter, ExportError, ExportOptions, ExportSummary};
pub use logger::{ExportLogger, LogLogger, RecordingLogger};
pub use source::{SourceEntry, SourceFileRef, SourceRegistry};
pub use surface::DisplaySurface;
