//! Structured point clouds with arbitrary named fields
//!
//! Point cloud files carry more than positions: intensities, colors, normals,
//! timestamps and so on. [`FieldCloud`] keeps every field of every point in
//! its on-disk type so that a filtered copy can be written back without losing
//! any attribute.

use std::fmt;
use std::io::{Read, Write};
use threecrate_core::{is_finite_point, Error, Point3f, PointCloud, Result};

/// Field data types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    F32,
    F64,
}

impl FieldType {
    /// Size of a single value in bytes
    pub fn size(self) -> usize {
        match self {
            FieldType::I8 | FieldType::U8 => 1,
            FieldType::I16 | FieldType::U16 => 2,
            FieldType::I32 | FieldType::U32 | FieldType::F32 => 4,
            FieldType::F64 => 8,
        }
    }

    /// Type class character: `I` (signed), `U` (unsigned) or `F` (float)
    pub fn type_char(self) -> char {
        match self {
            FieldType::I8 | FieldType::I16 | FieldType::I32 => 'I',
            FieldType::U8 | FieldType::U16 | FieldType::U32 => 'U',
            FieldType::F32 | FieldType::F64 => 'F',
        }
    }

    /// Resolve a type class character and byte size
    pub fn from_type_and_size(type_str: &str, size: usize) -> Result<Self> {
        match (type_str, size) {
            ("I", 1) => Ok(FieldType::I8),
            ("I", 2) => Ok(FieldType::I16),
            ("I", 4) => Ok(FieldType::I32),
            ("U", 1) => Ok(FieldType::U8),
            ("U", 2) => Ok(FieldType::U16),
            ("U", 4) => Ok(FieldType::U32),
            ("F", 4) => Ok(FieldType::F32),
            ("F", 8) => Ok(FieldType::F64),
            _ => Err(Error::InvalidData(format!(
                "Unknown field type/size combination: {}/{}",
                type_str, size
            ))),
        }
    }
}

/// A single field value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    F32(f32),
    F64(f64),
}

impl FieldValue {
    pub fn field_type(&self) -> FieldType {
        match self {
            FieldValue::I8(_) => FieldType::I8,
            FieldValue::U8(_) => FieldType::U8,
            FieldValue::I16(_) => FieldType::I16,
            FieldValue::U16(_) => FieldType::U16,
            FieldValue::I32(_) => FieldType::I32,
            FieldValue::U32(_) => FieldType::U32,
            FieldValue::F32(_) => FieldType::F32,
            FieldValue::F64(_) => FieldType::F64,
        }
    }

    /// Widen the value to f64
    pub fn as_f64(&self) -> f64 {
        match *self {
            FieldValue::I8(v) => v as f64,
            FieldValue::U8(v) => v as f64,
            FieldValue::I16(v) => v as f64,
            FieldValue::U16(v) => v as f64,
            FieldValue::I32(v) => v as f64,
            FieldValue::U32(v) => v as f64,
            FieldValue::F32(v) => v as f64,
            FieldValue::F64(v) => v,
        }
    }

    /// Parse a textual value of the given type
    pub fn parse(text: &str, field_type: FieldType) -> Result<Self> {
        let invalid = || Error::InvalidData(format!("Invalid {:?} value: {}", field_type, text));
        let value = match field_type {
            FieldType::I8 => FieldValue::I8(text.parse().map_err(|_| invalid())?),
            FieldType::U8 => FieldValue::U8(text.parse().map_err(|_| invalid())?),
            FieldType::I16 => FieldValue::I16(text.parse().map_err(|_| invalid())?),
            FieldType::U16 => FieldValue::U16(text.parse().map_err(|_| invalid())?),
            FieldType::I32 => FieldValue::I32(text.parse().map_err(|_| invalid())?),
            FieldType::U32 => FieldValue::U32(text.parse().map_err(|_| invalid())?),
            FieldType::F32 => FieldValue::F32(text.parse().map_err(|_| invalid())?),
            FieldType::F64 => FieldValue::F64(text.parse().map_err(|_| invalid())?),
        };
        Ok(value)
    }

    /// Read a little endian value of the given type
    pub fn read_le<R: Read>(reader: &mut R, field_type: FieldType) -> Result<Self> {
        let mut buf = [0u8; 8];
        reader.read_exact(&mut buf[..field_type.size()])?;

        let value = match field_type {
            FieldType::I8 => FieldValue::I8(buf[0] as i8),
            FieldType::U8 => FieldValue::U8(buf[0]),
            FieldType::I16 => FieldValue::I16(i16::from_le_bytes([buf[0], buf[1]])),
            FieldType::U16 => FieldValue::U16(u16::from_le_bytes([buf[0], buf[1]])),
            FieldType::I32 => FieldValue::I32(i32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]])),
            FieldType::U32 => FieldValue::U32(u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]])),
            FieldType::F32 => FieldValue::F32(f32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]])),
            FieldType::F64 => FieldValue::F64(f64::from_le_bytes(buf)),
        };
        Ok(value)
    }

    /// Write the value in little endian byte order
    pub fn write_le<W: Write>(&self, writer: &mut W) -> Result<()> {
        match *self {
            FieldValue::I8(v) => writer.write_all(&v.to_le_bytes())?,
            FieldValue::U8(v) => writer.write_all(&[v])?,
            FieldValue::I16(v) => writer.write_all(&v.to_le_bytes())?,
            FieldValue::U16(v) => writer.write_all(&v.to_le_bytes())?,
            FieldValue::I32(v) => writer.write_all(&v.to_le_bytes())?,
            FieldValue::U32(v) => writer.write_all(&v.to_le_bytes())?,
            FieldValue::F32(v) => writer.write_all(&v.to_le_bytes())?,
            FieldValue::F64(v) => writer.write_all(&v.to_le_bytes())?,
        }
        Ok(())
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            FieldValue::I8(v) => write!(f, "{}", v),
            FieldValue::U8(v) => write!(f, "{}", v),
            FieldValue::I16(v) => write!(f, "{}", v),
            FieldValue::U16(v) => write!(f, "{}", v),
            FieldValue::I32(v) => write!(f, "{}", v),
            FieldValue::U32(v) => write!(f, "{}", v),
            FieldValue::F32(v) if v.is_nan() => write!(f, "nan"),
            FieldValue::F64(v) if v.is_nan() => write!(f, "nan"),
            FieldValue::F32(v) => write!(f, "{}", v),
            FieldValue::F64(v) => write!(f, "{}", v),
        }
    }
}

/// Field definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub field_type: FieldType,
    pub count: usize,
}

impl Field {
    pub fn new(name: impl Into<String>, field_type: FieldType, count: usize) -> Self {
        Self {
            name: name.into(),
            field_type,
            count,
        }
    }
}

/// All values of a single point, in field order, each field flattened by its count
pub type FieldRecord = Vec<FieldValue>;

/// A point cloud with arbitrary named and typed fields
///
/// `records[i]` holds the values of point `i`. Organised clouds keep their
/// `width` x `height` layout; `is_dense` is `false` when some positions may be
/// invalid.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldCloud {
    pub fields: Vec<Field>,
    pub records: Vec<FieldRecord>,
    pub width: usize,
    pub height: usize,
    pub is_dense: bool,
}

impl FieldCloud {
    /// Create an empty unorganised cloud with the given layout
    pub fn new(fields: Vec<Field>) -> Self {
        Self {
            fields,
            records: Vec::new(),
            width: 0,
            height: 1,
            is_dense: true,
        }
    }

    /// Build an `x y z` float cloud from plain points
    pub fn from_point_cloud(cloud: &PointCloud<Point3f>) -> Self {
        let fields = vec![
            Field::new("x", FieldType::F32, 1),
            Field::new("y", FieldType::F32, 1),
            Field::new("z", FieldType::F32, 1),
        ];
        let records: Vec<FieldRecord> = cloud
            .iter()
            .map(|p| vec![FieldValue::F32(p.x), FieldValue::F32(p.y), FieldValue::F32(p.z)])
            .collect();

        Self {
            fields,
            width: records.len(),
            height: 1,
            records,
            is_dense: cloud.is_dense,
        }
    }

    /// Number of points
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of values stored per point
    pub fn values_per_record(&self) -> usize {
        self.fields.iter().map(|f| f.count).sum()
    }

    /// Size of one point in bytes when stored in binary form
    pub fn record_size(&self) -> usize {
        self.fields.iter().map(|f| f.field_type.size() * f.count).sum()
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Offset of the first value of `name` within a record
    pub fn field_offset(&self, name: &str) -> Option<usize> {
        let mut offset = 0;
        for field in &self.fields {
            if field.name == name {
                return Some(offset);
            }
            offset += field.count;
        }
        None
    }

    /// Append a point to an unorganised cloud
    pub fn push(&mut self, record: FieldRecord) -> Result<()> {
        self.check_record(&record)?;
        self.records.push(record);
        self.width = self.records.len();
        self.height = 1;
        Ok(())
    }

    /// Check that every record matches the field layout and the dimensions
    pub fn validate(&self) -> Result<()> {
        if self.width.checked_mul(self.height) != Some(self.records.len()) {
            return Err(Error::InvalidData(format!(
                "cloud dimensions {}x{} do not match {} points",
                self.width,
                self.height,
                self.records.len()
            )));
        }
        self.records.iter().try_for_each(|r| self.check_record(r))
    }

    fn check_record(&self, record: &FieldRecord) -> Result<()> {
        if record.len() != self.values_per_record() {
            return Err(Error::InvalidData(format!(
                "record has {} values, layout expects {}",
                record.len(),
                self.values_per_record()
            )));
        }

        let mut values = record.iter();
        for field in &self.fields {
            for value in values.by_ref().take(field.count) {
                if value.field_type() != field.field_type {
                    return Err(Error::InvalidData(format!(
                        "field '{}' expects {:?}, got {:?}",
                        field.name,
                        field.field_type,
                        value.field_type()
                    )));
                }
            }
        }
        Ok(())
    }

    fn xyz_offsets(&self) -> Result<[usize; 3]> {
        let offset = |name: &str| {
            self.field_offset(name)
                .ok_or_else(|| Error::InvalidData(format!("Missing {} coordinate field", name)))
        };
        Ok([offset("x")?, offset("y")?, offset("z")?])
    }

    /// Whether every point has finite x/y/z values
    ///
    /// Clouds without position fields are reported as finite.
    pub fn positions_finite(&self) -> bool {
        match self.to_point_cloud() {
            Ok(cloud) => cloud.iter().all(is_finite_point),
            Err(_) => true,
        }
    }

    /// Extract the point positions as single precision points
    ///
    /// x/y/z may be stored with any numeric type; they are downcast to f32.
    /// The density flag is carried over.
    pub fn to_point_cloud(&self) -> Result<PointCloud<Point3f>> {
        let [x, y, z] = self.xyz_offsets()?;

        let mut points = Vec::with_capacity(self.records.len());
        for record in &self.records {
            let coord = |offset: usize| {
                record
                    .get(offset)
                    .map(|v| v.as_f64() as f32)
                    .ok_or_else(|| Error::InvalidData("Truncated point record".to_string()))
            };
            points.push(Point3f::new(coord(x)?, coord(y)?, coord(z)?));
        }

        Ok(PointCloud::from_points(points).with_dense(self.is_dense))
    }

    /// Copy the points at `indices`, in the given order, keeping every field
    ///
    /// The result is unorganised (`height == 1`) and inherits `is_dense`.
    ///
    /// # Errors
    /// [`Error::InvalidArgument`] if an index is out of range.
    pub fn select(&self, indices: &[usize]) -> Result<FieldCloud> {
        let mut records = Vec::with_capacity(indices.len());
        for &idx in indices {
            let record = self.records.get(idx).ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "point index {} out of range for cloud of {} points",
                    idx,
                    self.records.len()
                ))
            })?;
            records.push(record.clone());
        }

        Ok(FieldCloud {
            fields: self.fields.clone(),
            width: records.len(),
            height: 1,
            records,
            is_dense: self.is_dense,
        })
    }
}
