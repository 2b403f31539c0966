//! I/O operations for structured point clouds
//!
//! This crate reads and writes point clouds with arbitrary per-point fields.
//! PCD v0.7 is supported out of the box; further formats plug into the
//! [`IoRegistry`].

pub mod fields;
pub mod pcd;
pub mod registry;

pub use fields::{Field, FieldCloud, FieldRecord, FieldType, FieldValue};
pub use pcd::{PcdDataFormat, PcdHeader, PcdReader, PcdWriteOptions, PcdWriter, RobustPcdReader, RobustPcdWriter};
pub use registry::{CloudReader, CloudWriteOptions, CloudWriter, IoRegistry};

use std::path::Path;
use threecrate_core::{Error, Point3f, PointCloud, Result};

fn extension_hint(path: &Path) -> Result<String> {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_lowercase())
        .ok_or_else(|| Error::UnsupportedFormat(format!("Cannot infer format of {}", path.display())))
}

/// Auto-detect format and read a structured cloud
pub fn read_cloud<P: AsRef<Path>>(path: P) -> Result<FieldCloud> {
    let path = path.as_ref();
    let hint = extension_hint(path).unwrap_or_default();
    IoRegistry::with_defaults().read_cloud(path, &hint)
}

/// Auto-detect format and read the point positions of a cloud
pub fn read_point_cloud<P: AsRef<Path>>(path: P) -> Result<PointCloud<Point3f>> {
    read_cloud(path)?.to_point_cloud()
}

/// Write a structured cloud, choosing the format from the file extension
pub fn write_cloud<P: AsRef<Path>>(cloud: &FieldCloud, path: P, options: &CloudWriteOptions) -> Result<()> {
    let path = path.as_ref();
    let hint = extension_hint(path)?;
    IoRegistry::with_defaults().write_cloud(cloud, path, &hint, options)
}

/// Write plain point positions as an `x y z` float cloud
pub fn write_point_cloud<P: AsRef<Path>>(
    cloud: &PointCloud<Point3f>,
    path: P,
    options: &CloudWriteOptions,
) -> Result<()> {
    write_cloud(&FieldCloud::from_point_cloud(cloud), path, options)
}
