//! Unified IO registry for format-agnostic reading and writing
//!
//! Readers and writers are registered under a lower-case format hint such as
//! `"pcd"`. Callers that only know a file path and a hint can load or save a
//! [`FieldCloud`] without knowing which codec handles it.

use crate::fields::FieldCloud;
use crate::pcd::{PcdReader, PcdWriter};
use nalgebra::{UnitQuaternion, Vector3};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use threecrate_core::{Error, Result};

/// Trait for reading structured clouds from files
pub trait CloudReader: Send + Sync {
    /// Read a cloud from the given path
    fn read_cloud(&self, path: &Path) -> Result<FieldCloud>;

    /// Check if this reader can handle the given file
    fn can_read(&self, path: &Path) -> bool;

    /// Get the format name this reader handles
    fn format_name(&self) -> &'static str;
}

/// Trait for writing structured clouds to files
pub trait CloudWriter: Send + Sync {
    /// Write a cloud to the given path
    fn write_cloud(&self, cloud: &FieldCloud, path: &Path, options: &CloudWriteOptions) -> Result<()>;

    /// Get the format name this writer handles
    fn format_name(&self) -> &'static str;
}

/// Format-independent write options
///
/// The sensor pose is stored in formats that carry one (the PCD `VIEWPOINT`
/// line). `binary` selects the binary body where the format has both.
#[derive(Debug, Clone, PartialEq)]
pub struct CloudWriteOptions {
    pub origin: Vector3<f64>,
    pub orientation: UnitQuaternion<f64>,
    pub binary: bool,
}

impl Default for CloudWriteOptions {
    fn default() -> Self {
        Self {
            origin: Vector3::zeros(),
            orientation: UnitQuaternion::identity(),
            binary: true,
        }
    }
}

impl CloudWriteOptions {
    /// Identity pose, text body
    pub fn ascii() -> Self {
        Self {
            binary: false,
            ..Default::default()
        }
    }

    pub fn with_pose(mut self, origin: Vector3<f64>, orientation: UnitQuaternion<f64>) -> Self {
        self.origin = origin;
        self.orientation = orientation;
        self
    }

    /// Pose as `[tx, ty, tz, qw, qx, qy, qz]`
    pub fn viewpoint(&self) -> [f64; 7] {
        let q = self.orientation.quaternion();
        [
            self.origin.x,
            self.origin.y,
            self.origin.z,
            q.w,
            q.i,
            q.j,
            q.k,
        ]
    }
}

/// IO registry that manages format handlers and provides unified access
pub struct IoRegistry {
    readers: HashMap<String, Box<dyn CloudReader>>,
    writers: HashMap<String, Box<dyn CloudWriter>>,
}

impl IoRegistry {
    /// Create a new empty IO registry
    pub fn new() -> Self {
        Self {
            readers: HashMap::new(),
            writers: HashMap::new(),
        }
    }

    /// Create a registry with every built-in format registered
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register_reader("pcd", Box::new(PcdReader));
        registry.register_writer("pcd", Box::new(PcdWriter));
        registry
    }

    /// Register a reader for a specific format
    pub fn register_reader(&mut self, format: &str, reader: Box<dyn CloudReader>) {
        self.readers.insert(format.to_lowercase(), reader);
    }

    /// Register a writer for a specific format
    pub fn register_writer(&mut self, format: &str, writer: Box<dyn CloudWriter>) {
        self.writers.insert(format.to_lowercase(), writer);
    }

    /// Read a cloud using the reader registered for `format_hint`
    ///
    /// When no reader is registered for the hint the file header is examined
    /// instead.
    pub fn read_cloud(&self, path: &Path, format_hint: &str) -> Result<FieldCloud> {
        if let Some(reader) = self.readers.get(&format_hint.to_lowercase()) {
            return reader.read_cloud(path);
        }

        if let Some(detected_format) = Self::detect_format_by_header(path) {
            if let Some(reader) = self.readers.get(detected_format) {
                log::debug!(
                    "no reader for hint '{}', using detected format '{}' for {}",
                    format_hint,
                    detected_format,
                    path.display()
                );
                return reader.read_cloud(path);
            }
        }

        Err(Error::UnsupportedFormat(format!(
            "No cloud reader found for format: {}",
            format_hint
        )))
    }

    /// Write a cloud using the writer registered for `format_hint`
    pub fn write_cloud(
        &self,
        cloud: &FieldCloud,
        path: &Path,
        format_hint: &str,
        options: &CloudWriteOptions,
    ) -> Result<()> {
        if let Some(writer) = self.writers.get(&format_hint.to_lowercase()) {
            return writer.write_cloud(cloud, path, options);
        }

        Err(Error::UnsupportedFormat(format!(
            "No cloud writer found for format: {}",
            format_hint
        )))
    }

    /// Detect file format by examining the first bytes of the file
    pub fn detect_format_by_header(path: &Path) -> Option<&'static str> {
        let mut file = File::open(path).ok()?;
        let mut header = [0u8; 16];
        let bytes_read = file.read(&mut header).ok()?;
        let header = &header[..bytes_read];

        if header.starts_with(b"# .PCD") || header.starts_with(b"VERSION") {
            Some("pcd")
        } else {
            None
        }
    }

    /// Formats that can be read, sorted by name
    pub fn supported_formats(&self) -> Vec<String> {
        let mut formats: Vec<String> = self.readers.keys().cloned().collect();
        formats.sort();
        formats
    }

    /// Check if a format is supported for reading
    pub fn supports_reading(&self, format: &str) -> bool {
        self.readers.contains_key(&format.to_lowercase())
    }

    /// Check if a format is supported for writing
    pub fn supports_writing(&self, format: &str) -> bool {
        self.writers.contains_key(&format.to_lowercase())
    }
}

impl Default for IoRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
