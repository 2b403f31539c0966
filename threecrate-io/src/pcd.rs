//! PCD (Point Cloud Data) format support
//!
//! This module provides PCD v0.7 reading and writing for clouds with arbitrary
//! fields. ASCII and binary bodies are supported in both directions; the
//! LZF-compressed `binary_compressed` body is rejected.

use crate::fields::{Field, FieldCloud, FieldRecord, FieldType, FieldValue};
use crate::registry::{CloudReader, CloudWriteOptions, CloudWriter};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;
use threecrate_core::{Error, Result};

/// Identity viewpoint: zero translation, identity rotation (tx ty tz qw qx qy qz)
pub const IDENTITY_VIEWPOINT: [f64; 7] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0];

/// Upper bound on records reserved up front; larger bodies grow as they are read
const MAX_PREALLOCATED_POINTS: usize = 1 << 16;

/// PCD data format variants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PcdDataFormat {
    Ascii,
    Binary,
    BinaryCompressed,
}

impl PcdDataFormat {
    fn as_str(self) -> &'static str {
        match self {
            PcdDataFormat::Ascii => "ascii",
            PcdDataFormat::Binary => "binary",
            PcdDataFormat::BinaryCompressed => "binary_compressed",
        }
    }
}

/// PCD header information
#[derive(Debug, Clone, PartialEq)]
pub struct PcdHeader {
    pub version: String,
    pub fields: Vec<Field>,
    pub width: usize,
    pub height: usize,
    pub viewpoint: [f64; 7], // tx, ty, tz, qw, qx, qy, qz
    pub data_format: PcdDataFormat,
}

impl PcdHeader {
    /// `WIDTH * HEIGHT`, or [`Error::InvalidData`] when the product overflows
    pub fn points(&self) -> Result<usize> {
        self.width.checked_mul(self.height).ok_or_else(|| {
            Error::InvalidData(format!(
                "WIDTH * HEIGHT ({} * {}) overflows",
                self.width, self.height
            ))
        })
    }
}

/// PCD write options
#[derive(Debug, Clone, PartialEq)]
pub struct PcdWriteOptions {
    pub data_format: PcdDataFormat,
    pub version: String,
    pub viewpoint: [f64; 7],
}

impl Default for PcdWriteOptions {
    fn default() -> Self {
        Self {
            data_format: PcdDataFormat::Binary,
            version: "0.7".to_string(),
            viewpoint: IDENTITY_VIEWPOINT,
        }
    }
}

impl PcdWriteOptions {
    pub fn ascii() -> Self {
        Self {
            data_format: PcdDataFormat::Ascii,
            ..Default::default()
        }
    }

    pub fn binary() -> Self {
        Self::default()
    }
}

impl From<&CloudWriteOptions> for PcdWriteOptions {
    fn from(options: &CloudWriteOptions) -> Self {
        Self {
            data_format: if options.binary {
                PcdDataFormat::Binary
            } else {
                PcdDataFormat::Ascii
            },
            viewpoint: options.viewpoint(),
            ..Default::default()
        }
    }
}

/// PCD reader producing clouds with every declared field
pub struct RobustPcdReader;

impl RobustPcdReader {
    /// Read a PCD file
    pub fn read_pcd_file<P: AsRef<Path>>(path: P) -> Result<(PcdHeader, FieldCloud)> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_pcd_data(&mut reader)
    }

    /// Read PCD data from a reader
    ///
    /// `is_dense` of the returned cloud is `true` only when every x/y/z value
    /// is finite.
    pub fn read_pcd_data<R: BufRead>(reader: &mut R) -> Result<(PcdHeader, FieldCloud)> {
        let header = Self::read_header(reader)?;
        let records = match header.data_format {
            PcdDataFormat::Ascii => Self::read_ascii_records(reader, &header)?,
            PcdDataFormat::Binary => Self::read_binary_records(reader, &header)?,
            PcdDataFormat::BinaryCompressed => {
                return Err(Error::Unsupported(
                    "Binary compressed PCD format not yet supported".to_string(),
                ))
            }
        };

        let mut cloud = FieldCloud {
            fields: header.fields.clone(),
            records,
            width: header.width,
            height: header.height,
            is_dense: true,
        };
        cloud.is_dense = cloud.positions_finite();
        Ok((header, cloud))
    }

    /// Read PCD header
    pub fn read_header<R: BufRead>(reader: &mut R) -> Result<PcdHeader> {
        let mut version = None;
        let mut names: Vec<String> = Vec::new();
        let mut sizes: Vec<usize> = Vec::new();
        let mut types: Vec<String> = Vec::new();
        let mut counts: Vec<usize> = Vec::new();
        let mut width = None;
        let mut height = None;
        let mut viewpoint = IDENTITY_VIEWPOINT;
        let mut points = None;
        let data_format;

        let mut line = String::new();

        loop {
            line.clear();
            let bytes_read = reader.read_line(&mut line)?;
            if bytes_read == 0 {
                return Err(Error::InvalidData("Unexpected end of file in PCD header".to_string()));
            }

            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let parts: Vec<&str> = trimmed.split_whitespace().collect();
            let values = &parts[1..];

            match parts[0] {
                "VERSION" => version = values.first().map(|v| v.to_string()),
                "FIELDS" | "COLUMNS" => names = values.iter().map(|v| v.to_string()).collect(),
                "SIZE" => sizes = parse_list(values, "SIZE")?,
                "TYPE" => types = values.iter().map(|v| v.to_string()).collect(),
                "COUNT" => counts = parse_list(values, "COUNT")?,
                "WIDTH" => width = Some(parse_one(values, "WIDTH")?),
                "HEIGHT" => height = Some(parse_one(values, "HEIGHT")?),
                "POINTS" => points = Some(parse_one(values, "POINTS")?),
                "VIEWPOINT" => {
                    if values.len() != 7 {
                        return Err(Error::InvalidData(format!(
                            "VIEWPOINT expects 7 values, got {}",
                            values.len()
                        )));
                    }
                    for (slot, text) in viewpoint.iter_mut().zip(values) {
                        *slot = text.parse::<f64>().map_err(|_| {
                            Error::InvalidData(format!("Invalid VIEWPOINT value: {}", text))
                        })?;
                    }
                }
                "DATA" => {
                    data_format = match values.first().copied() {
                        Some("ascii") => PcdDataFormat::Ascii,
                        Some("binary") => PcdDataFormat::Binary,
                        Some("binary_compressed") => PcdDataFormat::BinaryCompressed,
                        other => {
                            return Err(Error::InvalidData(format!(
                                "Unknown PCD DATA format: {:?}",
                                other
                            )))
                        }
                    };
                    break;
                }
                _ => {
                    // Ignore unknown header fields
                }
            }
        }

        let version = version.ok_or_else(|| Error::InvalidData("Missing VERSION in PCD header".to_string()))?;
        let width = width.ok_or_else(|| Error::InvalidData("Missing WIDTH in PCD header".to_string()))?;
        let height = height.unwrap_or(1);

        if names.is_empty() {
            return Err(Error::InvalidData("Missing FIELDS in PCD header".to_string()));
        }
        if counts.is_empty() {
            counts = vec![1; names.len()];
        }
        if sizes.len() != names.len() || types.len() != names.len() || counts.len() != names.len() {
            return Err(Error::InvalidData(
                "Mismatch between FIELDS, SIZE, TYPE, and COUNT declarations".to_string(),
            ));
        }

        let mut fields = Vec::with_capacity(names.len());
        for (((name, size), type_str), count) in names.into_iter().zip(sizes).zip(&types).zip(counts) {
            fields.push(Field::new(name, FieldType::from_type_and_size(type_str, size)?, count));
        }

        let header = PcdHeader {
            version,
            fields,
            width,
            height,
            viewpoint,
            data_format,
        };

        // If POINTS is specified and different from WIDTH * HEIGHT, reject it
        let total = header.points()?;
        if let Some(points) = points {
            if points != total {
                return Err(Error::InvalidData(format!(
                    "POINTS ({}) doesn't match WIDTH * HEIGHT ({})",
                    points, total
                )));
            }
        }

        Ok(header)
    }

    /// Read ASCII format records
    fn read_ascii_records<R: BufRead>(reader: &mut R, header: &PcdHeader) -> Result<Vec<FieldRecord>> {
        let expected = header.points()?;
        let mut records = Vec::with_capacity(expected.min(MAX_PREALLOCATED_POINTS));
        let mut line = String::new();

        while records.len() < expected {
            line.clear();
            if reader.read_line(&mut line)? == 0 {
                return Err(Error::InvalidData(format!(
                    "PCD body ended after {} of {} points",
                    records.len(),
                    expected
                )));
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let mut tokens = trimmed.split_whitespace();
            let mut record = FieldRecord::new();
            for field in &header.fields {
                for _ in 0..field.count {
                    let token = tokens.next().ok_or_else(|| {
                        Error::InvalidData("Not enough values in ASCII PCD line".to_string())
                    })?;
                    record.push(FieldValue::parse(token, field.field_type)?);
                }
            }
            records.push(record);
        }

        Ok(records)
    }

    /// Read binary format records
    fn read_binary_records<R: Read>(reader: &mut R, header: &PcdHeader) -> Result<Vec<FieldRecord>> {
        let expected = header.points()?;
        let mut records = Vec::with_capacity(expected.min(MAX_PREALLOCATED_POINTS));

        // Values are pulled one at a time so a short body fails on EOF
        // instead of after sizing buffers from the header
        for _ in 0..expected {
            let mut record = FieldRecord::new();
            for field in &header.fields {
                for _ in 0..field.count {
                    record.push(FieldValue::read_le(reader, field.field_type)?);
                }
            }
            records.push(record);
        }

        Ok(records)
    }
}

/// PCD writer emitting every field of a cloud
pub struct RobustPcdWriter;

impl RobustPcdWriter {
    /// Write a cloud to a PCD file
    pub fn write_pcd_file<P: AsRef<Path>>(cloud: &FieldCloud, path: P, options: &PcdWriteOptions) -> Result<()> {
        // Validate before touching the filesystem so a bad cloud leaves no file behind
        cloud.validate()?;
        Self::check_format(options)?;

        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        Self::write_pcd_data(cloud, &mut writer, options)?;
        writer.flush()?;
        Ok(())
    }

    /// Write a cloud to a writer
    pub fn write_pcd_data<W: Write>(cloud: &FieldCloud, writer: &mut W, options: &PcdWriteOptions) -> Result<()> {
        cloud.validate()?;
        Self::check_format(options)?;

        let header = PcdHeader {
            version: options.version.clone(),
            fields: cloud.fields.clone(),
            width: cloud.width,
            height: cloud.height,
            viewpoint: options.viewpoint,
            data_format: options.data_format,
        };
        Self::write_header(writer, &header)?;

        match options.data_format {
            PcdDataFormat::Ascii => {
                for record in &cloud.records {
                    let line: Vec<String> = record.iter().map(|v| v.to_string()).collect();
                    writeln!(writer, "{}", line.join(" "))?;
                }
            }
            _ => {
                for record in &cloud.records {
                    for value in record {
                        value.write_le(writer)?;
                    }
                }
            }
        }

        Ok(())
    }

    fn check_format(options: &PcdWriteOptions) -> Result<()> {
        if options.data_format == PcdDataFormat::BinaryCompressed {
            return Err(Error::Unsupported(
                "Binary compressed PCD format not yet supported".to_string(),
            ));
        }
        Ok(())
    }

    /// Write PCD header
    fn write_header<W: Write>(writer: &mut W, header: &PcdHeader) -> Result<()> {
        writeln!(writer, "# .PCD v{} - Point Cloud Data file format", header.version)?;
        writeln!(writer, "VERSION {}", header.version)?;
        writeln!(writer, "FIELDS {}", join_fields(&header.fields, |f| f.name.clone()))?;
        writeln!(writer, "SIZE {}", join_fields(&header.fields, |f| f.field_type.size().to_string()))?;
        writeln!(writer, "TYPE {}", join_fields(&header.fields, |f| f.field_type.type_char().to_string()))?;
        writeln!(writer, "COUNT {}", join_fields(&header.fields, |f| f.count.to_string()))?;
        writeln!(writer, "WIDTH {}", header.width)?;
        writeln!(writer, "HEIGHT {}", header.height)?;
        let vp = header.viewpoint;
        writeln!(
            writer,
            "VIEWPOINT {} {} {} {} {} {} {}",
            vp[0], vp[1], vp[2], vp[3], vp[4], vp[5], vp[6]
        )?;
        writeln!(writer, "POINTS {}", header.points()?)?;
        writeln!(writer, "DATA {}", header.data_format.as_str())?;

        Ok(())
    }
}

fn join_fields<F: Fn(&Field) -> String>(fields: &[Field], describe: F) -> String {
    fields.iter().map(describe).collect::<Vec<_>>().join(" ")
}

fn parse_one(values: &[&str], key: &str) -> Result<usize> {
    let text = values
        .first()
        .ok_or_else(|| Error::InvalidData(format!("Missing {} value", key)))?;
    text.parse::<usize>()
        .map_err(|_| Error::InvalidData(format!("Invalid {} value: {}", key, text)))
}

fn parse_list(values: &[&str], key: &str) -> Result<Vec<usize>> {
    values
        .iter()
        .map(|text| {
            text.parse::<usize>()
                .map_err(|_| Error::InvalidData(format!("Invalid {} value: {}", key, text)))
        })
        .collect()
}

/// PCD reader implementing the registry trait
pub struct PcdReader;

impl CloudReader for PcdReader {
    fn read_cloud(&self, path: &Path) -> Result<FieldCloud> {
        let (_, cloud) = RobustPcdReader::read_pcd_file(path)?;
        Ok(cloud)
    }

    fn can_read(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("pcd"))
            .unwrap_or(false)
    }

    fn format_name(&self) -> &'static str {
        "pcd"
    }
}

/// PCD writer implementing the registry trait
pub struct PcdWriter;

impl CloudWriter for PcdWriter {
    fn write_cloud(&self, cloud: &FieldCloud, path: &Path, options: &CloudWriteOptions) -> Result<()> {
        RobustPcdWriter::write_pcd_file(cloud, path, &PcdWriteOptions::from(options))
    }

    fn format_name(&self) -> &'static str {
        "pcd"
    }
}
