//! GDS-II binary format reader and writer.
//!
//! GDS-II (Graphic Data System II) is the binary stream format mask shops
//! accept. Only the subset tftgen produces is handled: BOUNDARY, PATH and
//! SREF elements. BOX elements are read as rectangles, TEXT/NODE/AREF are
//! skipped.
//!
//! ## GDS-II Record Structure
//! Each record: [2-byte length][2-byte record type][payload]
//! Record types define the hierarchy: BGNLIB → BGNSTR → BOUNDARY/PATH/SREF → ENDSTR → ENDLIB

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path as FsPath;
use std::sync::Arc;

use thiserror::Error;

use tftgen_core::cell::{Cell, CellInstance, Transform};
use tftgen_core::geometry::{BBox, GeomPrimitive, Path as LayoutPath, Point, Polygon, Rect};
use tftgen_core::layer::LayerStack;
use tftgen_core::{LayerId, LayoutError, Library};

// ── GDS-II Record Types ──────────────────────────────────────────────

#[allow(dead_code)]
mod record_type {
    pub const HEADER: u16     = 0x0002;
    pub const BGNLIB: u16     = 0x0102;
    pub const LIBNAME: u16    = 0x0206;
    pub const UNITS: u16      = 0x0305;
    pub const ENDLIB: u16     = 0x0400;
    pub const BGNSTR: u16     = 0x0502;
    pub const STRNAME: u16    = 0x0606;
    pub const ENDSTR: u16     = 0x0700;
    pub const BOUNDARY: u16   = 0x0800;
    pub const PATH: u16       = 0x0900;
    pub const SREF: u16       = 0x0A00;
    pub const AREF: u16       = 0x0B00;
    pub const TEXT: u16       = 0x0C00;
    pub const LAYER: u16      = 0x0D02;
    pub const DATATYPE: u16   = 0x0E02;
    pub const WIDTH: u16      = 0x0F03;
    pub const XY: u16         = 0x1003;
    pub const ENDEL: u16      = 0x1100;
    pub const SNAME: u16      = 0x1206;
    pub const NODE: u16       = 0x1500;
    pub const STRANS: u16     = 0x1A01;
    pub const MAG: u16        = 0x1B05;
    pub const ANGLE: u16      = 0x1C05;
    pub const PATHTYPE: u16   = 0x2102;
    pub const BOX: u16        = 0x2D00;
    pub const BOXTYPE: u16    = 0x2E02;
}

/// Database unit in micrometres: 1 nm.
pub const DB_UNIT_UM: f64 = 0.001;

/// BGNLIB/BGNSTR modification and access time. Fixed so that output is reproducible.
const TIMESTAMP: [i16; 12] = [2024, 1, 1, 0, 0, 0, 2024, 1, 1, 0, 0, 0];

const STRANS_REFLECT: i16 = i16::MIN; // 0x8000

// ── Errors ────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum GdsError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid GDS-II record at offset {offset}: {message}")]
    InvalidRecord { offset: u64, message: String },

    #[error("Unexpected record type 0x{record_type:04X}, expected 0x{expected:04X}")]
    UnexpectedRecord { record_type: u16, expected: u16 },

    #[error("Coordinate {0} um does not fit the database grid")]
    InvalidCoordinates(f64),

    #[error("Cell '{0}' referenced but not defined")]
    UndefinedCell(String),

    #[error("Library has no top cell")]
    NoTopCell,

    #[error(transparent)]
    Layout(#[from] LayoutError),
}

// ── GDS-II Record ─────────────────────────────────────────────────────

#[derive(Debug)]
struct GdsRecord {
    record_type: u16,
    data: Vec<u8>,
}

impl GdsRecord {
    /// Parse payload as 16-bit integers.
    fn as_i16_vec(&self) -> Vec<i16> {
        self.data
            .chunks_exact(2)
            .map(|c| i16::from_be_bytes([c[0], c[1]]))
            .collect()
    }

    /// Parse payload as 32-bit integers.
    fn as_i32_vec(&self) -> Vec<i32> {
        self.data
            .chunks_exact(4)
            .map(|c| i32::from_be_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    }

    /// Parse payload as ASCII string.
    fn as_string(&self) -> String {
        let s: String = self.data.iter().map(|&b| b as char).collect();
        s.trim_end_matches('\0').to_string()
    }

    /// Parse payload as GDS-II 8-byte reals (excess-64 floating point).
    fn as_f64_vec(&self) -> Vec<f64> {
        self.data
            .chunks_exact(8)
            .map(|c| {
                let mut bytes = [0u8; 8];
                bytes.copy_from_slice(c);
                gds_real8_to_f64(&bytes)
            })
            .collect()
    }

    fn first_i16(&self) -> Option<i16> {
        self.as_i16_vec().first().copied()
    }
}

/// Convert GDS-II excess-64 real format to IEEE 754 f64.
fn gds_real8_to_f64(bytes: &[u8; 8]) -> f64 {
    if bytes.iter().all(|&b| b == 0) {
        return 0.0;
    }

    let sign = if bytes[0] & 0x80 != 0 { -1.0 } else { 1.0 };
    let exponent = (bytes[0] & 0x7F) as i32 - 64;

    let mut mantissa: u64 = 0;
    for &b in &bytes[1..] {
        mantissa = (mantissa << 8) | (b as u64);
    }

    let mantissa_f = mantissa as f64 / (1u64 << 56) as f64;
    sign * mantissa_f * 16.0_f64.powi(exponent)
}

/// Convert IEEE 754 f64 to GDS-II excess-64 real format.
fn f64_to_gds_real8(value: f64) -> [u8; 8] {
    if value == 0.0 {
        return [0u8; 8];
    }

    let sign_bit: u8 = if value < 0.0 { 0x80 } else { 0x00 };
    let mut val = value.abs();

    // Find exponent such that 1/16 <= mantissa < 1
    let mut exponent: i32 = 0;
    while val >= 1.0 && exponent < 63 {
        val /= 16.0;
        exponent += 1;
    }
    while val < 1.0 / 16.0 && exponent > -64 {
        val *= 16.0;
        exponent -= 1;
    }

    let mantissa = (val * (1u64 << 56) as f64).round() as u64;
    let mut result = [0u8; 8];
    result[0] = sign_bit | ((exponent + 64) as u8 & 0x7F);
    result[1..].copy_from_slice(&mantissa.to_be_bytes()[1..]);
    result
}

// ── GDS-II Reader ─────────────────────────────────────────────────────

/// A structure as read from the stream, before references are resolved.
#[derive(Debug, Default)]
struct RawStructure {
    name: String,
    geometries: Vec<GeomPrimitive>,
    refs: Vec<(String, Transform)>,
}

pub struct GdsReader<R: Read> {
    reader: R,
    offset: u64,
    db_unit_in_um: f64,
}

impl<R: Read> GdsReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            offset: 0,
            db_unit_in_um: DB_UNIT_UM,
        }
    }

    /// Read the entire stream into a [`Library`]. The top cell is the last
    /// structure no other structure references.
    pub fn read(&mut self, layer_stack: LayerStack) -> Result<Library, GdsError> {
        self.read_header()?;
        let (name, structures) = self.read_lib()?;
        build_library(name, layer_stack, structures)
    }

    fn read_record(&mut self) -> Result<Option<GdsRecord>, GdsError> {
        let mut len_buf = [0u8; 2];
        match self.reader.read_exact(&mut len_buf) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(GdsError::Io(e)),
        }

        let total_len = u16::from_be_bytes(len_buf) as usize;
        if total_len < 4 {
            return Err(GdsError::InvalidRecord {
                offset: self.offset,
                message: format!("Record length {} is too small", total_len),
            });
        }

        let mut type_buf = [0u8; 2];
        self.reader.read_exact(&mut type_buf)?;
        let record_type = u16::from_be_bytes(type_buf);

        let mut data = vec![0u8; total_len - 4];
        self.reader.read_exact(&mut data)?;
        self.offset += total_len as u64;

        Ok(Some(GdsRecord { record_type, data }))
    }

    /// Next record, treating end of stream as an error.
    fn expect_record(&mut self) -> Result<GdsRecord, GdsError> {
        self.read_record()?.ok_or(GdsError::InvalidRecord {
            offset: self.offset,
            message: "Unexpected end of stream".into(),
        })
    }

    fn read_header(&mut self) -> Result<(), GdsError> {
        let rec = self.read_record()?.ok_or(GdsError::InvalidRecord {
            offset: 0,
            message: "Empty file".into(),
        })?;

        if rec.record_type != record_type::HEADER {
            return Err(GdsError::UnexpectedRecord {
                record_type: rec.record_type,
                expected: record_type::HEADER,
            });
        }

        if let Some(version) = rec.first_i16() {
            log::debug!("GDS-II version: {}", version);
        }
        Ok(())
    }

    fn read_lib(&mut self) -> Result<(String, Vec<RawStructure>), GdsError> {
        let mut name = String::from("imported");
        let mut structures = Vec::new();
        loop {
            let rec = self.expect_record()?;
            match rec.record_type {
                record_type::LIBNAME => {
                    name = rec.as_string();
                    log::debug!("Library name: {}", name);
                }
                record_type::UNITS => {
                    let units = rec.as_f64_vec();
                    if units.len() >= 2 {
                        // [database unit in user units, database unit in metres]
                        self.db_unit_in_um = units[1] * 1e6;
                        log::debug!("Database unit: {} um", self.db_unit_in_um);
                    }
                }
                record_type::BGNSTR => structures.push(self.read_structure()?),
                record_type::ENDLIB => break,
                _ => {}
            }
        }
        log::info!("Read library '{}': {} structures", name, structures.len());
        Ok((name, structures))
    }

    fn read_structure(&mut self) -> Result<RawStructure, GdsError> {
        let mut raw = RawStructure::default();
        loop {
            let rec = self.expect_record()?;
            match rec.record_type {
                record_type::STRNAME => raw.name = rec.as_string(),
                record_type::BOUNDARY | record_type::BOX => {
                    if let Some(geom) = self.read_boundary()? {
                        raw.geometries.push(geom);
                    }
                }
                record_type::PATH => {
                    if let Some(geom) = self.read_path()? {
                        raw.geometries.push(geom);
                    }
                }
                record_type::SREF => raw.refs.push(self.read_sref()?),
                record_type::TEXT | record_type::NODE | record_type::AREF => {
                    self.skip_to_endel()?;
                }
                record_type::ENDSTR => break,
                _ => {}
            }
        }
        log::debug!(
            "Read cell '{}': {} shapes, {} references",
            raw.name,
            raw.geometries.len(),
            raw.refs.len()
        );
        Ok(raw)
    }

    fn points(&self, rec: &GdsRecord) -> Vec<Point> {
        rec.as_i32_vec()
            .chunks_exact(2)
            .map(|pair| {
                Point::new(
                    pair[0] as f64 * self.db_unit_in_um,
                    pair[1] as f64 * self.db_unit_in_um,
                )
            })
            .collect()
    }

    /// BOUNDARY or BOX. Axis-aligned four-corner outlines become rectangles.
    fn read_boundary(&mut self) -> Result<Option<GeomPrimitive>, GdsError> {
        let mut layer = LayerId::new(0, 0);
        let mut points: Vec<Point> = Vec::new();

        loop {
            let rec = self.expect_record()?;
            match rec.record_type {
                record_type::LAYER => layer.layer = rec.first_i16().unwrap_or(0) as u16,
                record_type::DATATYPE | record_type::BOXTYPE => {
                    layer.datatype = rec.first_i16().unwrap_or(0) as u16
                }
                record_type::XY => points = self.points(&rec),
                record_type::ENDEL => break,
                _ => {}
            }
        }

        // GDS boundaries repeat the first point; remove it
        if points.len() > 1 && points.first() == points.last() {
            points.pop();
        }

        if points.is_empty() {
            return Ok(None);
        }

        if is_axis_aligned_rect(&points) {
            if let Some(bbox) = BBox::from_points(&points) {
                return Ok(Some(GeomPrimitive::Rect(Rect::from_bbox(layer, bbox))));
            }
        }

        Ok(Some(GeomPrimitive::Polygon(Polygon::new(layer, points))))
    }

    fn read_path(&mut self) -> Result<Option<GeomPrimitive>, GdsError> {
        let mut layer = LayerId::new(0, 0);
        let mut width: f64 = 0.0;
        let mut points: Vec<Point> = Vec::new();

        loop {
            let rec = self.expect_record()?;
            match rec.record_type {
                record_type::LAYER => layer.layer = rec.first_i16().unwrap_or(0) as u16,
                record_type::DATATYPE => layer.datatype = rec.first_i16().unwrap_or(0) as u16,
                record_type::WIDTH => {
                    if let Some(w) = rec.as_i32_vec().first() {
                        width = (*w as f64 * self.db_unit_in_um).abs();
                    }
                }
                record_type::XY => points = self.points(&rec),
                record_type::ENDEL => break,
                _ => {}
            }
        }

        if points.is_empty() {
            return Ok(None);
        }

        Ok(Some(GeomPrimitive::Path(LayoutPath::new(layer, points, width))))
    }

    fn read_sref(&mut self) -> Result<(String, Transform), GdsError> {
        let mut cell_name = String::new();
        let mut transform = Transform::default();

        loop {
            let rec = self.expect_record()?;
            match rec.record_type {
                record_type::SNAME => cell_name = rec.as_string(),
                record_type::STRANS => {
                    transform.mirror_x = rec.first_i16().is_some_and(|v| v & STRANS_REFLECT != 0);
                }
                record_type::MAG => {
                    if let Some(mag) = rec.as_f64_vec().first() {
                        if (mag - 1.0).abs() > 1e-9 {
                            return Err(GdsError::InvalidRecord {
                                offset: self.offset,
                                message: format!("Magnification {} is not supported", mag),
                            });
                        }
                    }
                }
                record_type::ANGLE => {
                    if let Some(angle) = rec.as_f64_vec().first() {
                        transform.rotation = Transform::rotation(*angle)?.rotation;
                    }
                }
                record_type::XY => {
                    if let Some(p) = self.points(&rec).first() {
                        transform.offset = *p;
                    }
                }
                record_type::ENDEL => break,
                _ => {}
            }
        }

        Ok((cell_name, transform))
    }

    fn skip_to_endel(&mut self) -> Result<(), GdsError> {
        while self.expect_record()?.record_type != record_type::ENDEL {}
        Ok(())
    }
}

/// Check if 4 points form an axis-aligned rectangle.
fn is_axis_aligned_rect(points: &[Point]) -> bool {
    if points.len() != 4 {
        return false;
    }
    let unique_x: HashSet<u64> = points.iter().map(|p| p.x.to_bits()).collect();
    let unique_y: HashSet<u64> = points.iter().map(|p| p.y.to_bits()).collect();
    let manhattan = (0..4).all(|i| {
        let (a, b) = (points[i], points[(i + 1) % 4]);
        a.x == b.x || a.y == b.y
    });

    unique_x.len() == 2 && unique_y.len() == 2 && manhattan
}

/// Resolve references by name, children before parents.
fn build_library(
    name: String,
    layer_stack: LayerStack,
    structures: Vec<RawStructure>,
) -> Result<Library, GdsError> {
    let referenced: HashSet<&str> = structures
        .iter()
        .flat_map(|s| s.refs.iter().map(|(n, _)| n.as_str()))
        .collect();
    let top = structures
        .iter()
        .rev()
        .find(|s| !referenced.contains(s.name.as_str()))
        .map(|s| s.name.clone());

    let by_name: HashMap<&str, &RawStructure> =
        structures.iter().map(|s| (s.name.as_str(), s)).collect();
    let mut built: HashMap<String, Arc<Cell>> = HashMap::new();
    let mut lib = Library::new(&name, layer_stack);
    for s in &structures {
        let cell = resolve(&s.name, &by_name, &mut built, &mut Vec::new())?;
        lib.add_cell(cell)?;
    }
    if let Some(top) = top {
        lib.set_top(&top);
    }
    Ok(lib)
}

fn resolve(
    name: &str,
    by_name: &HashMap<&str, &RawStructure>,
    built: &mut HashMap<String, Arc<Cell>>,
    stack: &mut Vec<String>,
) -> Result<Arc<Cell>, GdsError> {
    if let Some(cell) = built.get(name) {
        return Ok(cell.clone());
    }
    if stack.iter().any(|n| n == name) {
        return Err(LayoutError::RecursiveCell(name.to_string()).into());
    }
    let raw = by_name
        .get(name)
        .ok_or_else(|| GdsError::UndefinedCell(name.to_string()))?;

    stack.push(name.to_string());
    let mut cell = Cell::new(name);
    cell.geometries = raw.geometries.clone();
    for (child, transform) in &raw.refs {
        let child = resolve(child, by_name, built, stack)?;
        cell.add_instance(CellInstance::with_transform(child, *transform));
    }
    stack.pop();

    let cell = Arc::new(cell);
    built.insert(name.to_string(), cell.clone());
    Ok(cell)
}

// ── GDS-II Writer ─────────────────────────────────────────────────────

pub struct GdsWriter<W: Write> {
    writer: W,
    db_unit_in_um: f64,
}

impl<W: Write> GdsWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            db_unit_in_um: DB_UNIT_UM,
        }
    }

    /// Write a [`Library`] as a GDS-II stream, cells in dependency order.
    pub fn write(&mut self, lib: &Library) -> Result<(), GdsError> {
        self.write_header()?;
        self.write_i16_record(record_type::BGNLIB, &TIMESTAMP)?;
        self.write_string_record(record_type::LIBNAME, &lib.name)?;
        self.write_units()?;

        for cell in lib.all_cells() {
            self.write_cell(cell)?;
        }

        self.write_record(record_type::ENDLIB, &[])?;
        self.writer.flush()?;
        log::info!("Wrote library '{}': {} cells", lib.name, lib.cell_count());
        Ok(())
    }

    fn write_record(&mut self, record_type: u16, data: &[u8]) -> Result<(), GdsError> {
        let total_len = u16::try_from(data.len() + 4).map_err(|_| GdsError::InvalidRecord {
            offset: 0,
            message: format!("Record payload of {} bytes is too long", data.len()),
        })?;
        self.writer.write_all(&total_len.to_be_bytes())?;
        self.writer.write_all(&record_type.to_be_bytes())?;
        self.writer.write_all(data)?;
        Ok(())
    }

    fn write_i16_record(&mut self, record_type: u16, values: &[i16]) -> Result<(), GdsError> {
        let data: Vec<u8> = values.iter().flat_map(|v| v.to_be_bytes()).collect();
        self.write_record(record_type, &data)
    }

    fn write_i32_record(&mut self, record_type: u16, values: &[i32]) -> Result<(), GdsError> {
        let data: Vec<u8> = values.iter().flat_map(|v| v.to_be_bytes()).collect();
        self.write_record(record_type, &data)
    }

    fn write_string_record(&mut self, record_type: u16, s: &str) -> Result<(), GdsError> {
        let mut data: Vec<u8> = s.bytes().collect();
        // GDS strings must be even length
        if data.len() % 2 != 0 {
            data.push(0);
        }
        self.write_record(record_type, &data)
    }

    fn write_real8_record(&mut self, record_type: u16, values: &[f64]) -> Result<(), GdsError> {
        let data: Vec<u8> = values.iter().flat_map(|v| f64_to_gds_real8(*v)).collect();
        self.write_record(record_type, &data)
    }

    fn write_header(&mut self) -> Result<(), GdsError> {
        self.write_i16_record(record_type::HEADER, &[600]) // GDS version 6
    }

    fn write_units(&mut self) -> Result<(), GdsError> {
        // Database unit in user units (um), database unit in metres.
        self.write_real8_record(
            record_type::UNITS,
            &[self.db_unit_in_um, self.db_unit_in_um * 1e-6],
        )
    }

    fn to_db(&self, value: f64) -> Result<i32, GdsError> {
        let scaled = (value / self.db_unit_in_um).round();
        if !scaled.is_finite() || scaled < i32::MIN as f64 || scaled > i32::MAX as f64 {
            return Err(GdsError::InvalidCoordinates(value));
        }
        Ok(scaled as i32)
    }

    fn coords<'a, I>(&self, points: I) -> Result<Vec<i32>, GdsError>
    where
        I: IntoIterator<Item = &'a Point>,
    {
        let mut out = Vec::new();
        for p in points {
            out.push(self.to_db(p.x)?);
            out.push(self.to_db(p.y)?);
        }
        Ok(out)
    }

    fn write_layer(&mut self, datatype_record: u16, layer: LayerId) -> Result<(), GdsError> {
        self.write_i16_record(record_type::LAYER, &[layer.layer as i16])?;
        self.write_i16_record(datatype_record, &[layer.datatype as i16])
    }

    fn write_cell(&mut self, cell: &Cell) -> Result<(), GdsError> {
        self.write_i16_record(record_type::BGNSTR, &TIMESTAMP)?;
        self.write_string_record(record_type::STRNAME, &cell.name)?;

        for geom in &cell.geometries {
            match geom {
                GeomPrimitive::Rect(rect) => self.write_boundary(rect.layer_id, &rect.corners())?,
                GeomPrimitive::Polygon(poly) => self.write_boundary(poly.layer_id, &poly.vertices)?,
                GeomPrimitive::Path(path) => self.write_path(path)?,
            }
        }

        for inst in &cell.instances {
            self.write_sref(inst)?;
        }

        self.write_record(record_type::ENDSTR, &[])
    }

    fn write_boundary(&mut self, layer: LayerId, vertices: &[Point]) -> Result<(), GdsError> {
        let Some(first) = vertices.first() else {
            return Ok(());
        };
        // Closed outline: the first point is repeated at the end.
        let coords = self.coords(vertices.iter().chain(std::iter::once(first)))?;

        self.write_record(record_type::BOUNDARY, &[])?;
        self.write_layer(record_type::DATATYPE, layer)?;
        self.write_i32_record(record_type::XY, &coords)?;
        self.write_record(record_type::ENDEL, &[])
    }

    fn write_path(&mut self, path: &LayoutPath) -> Result<(), GdsError> {
        let coords = self.coords(&path.points)?;
        let width = self.to_db(path.width)?;

        self.write_record(record_type::PATH, &[])?;
        self.write_layer(record_type::DATATYPE, path.layer_id)?;
        self.write_i16_record(record_type::PATHTYPE, &[0])?;
        self.write_i32_record(record_type::WIDTH, &[width])?;
        self.write_i32_record(record_type::XY, &coords)?;
        self.write_record(record_type::ENDEL, &[])
    }

    fn write_sref(&mut self, inst: &CellInstance) -> Result<(), GdsError> {
        let t = &inst.transform;
        let xy = self.coords([&t.offset])?;

        self.write_record(record_type::SREF, &[])?;
        self.write_string_record(record_type::SNAME, inst.cell_name())?;

        if t.mirror_x || t.rotation != 0.0 {
            let strans = if t.mirror_x { STRANS_REFLECT } else { 0 };
            self.write_i16_record(record_type::STRANS, &[strans])?;
        }
        if t.rotation != 0.0 {
            self.write_real8_record(record_type::ANGLE, &[t.rotation])?;
        }

        self.write_i32_record(record_type::XY, &xy)?;
        self.write_record(record_type::ENDEL, &[])
    }
}

/// Write `lib` to a file.
pub fn write_gds<P: AsRef<FsPath>>(path: P, lib: &Library) -> Result<(), GdsError> {
    let file = File::create(path)?;
    GdsWriter::new(BufWriter::new(file)).write(lib)
}

/// Read a file written in the supported subset.
pub fn read_gds<P: AsRef<FsPath>>(path: P, layer_stack: LayerStack) -> Result<Library, GdsError> {
    let file = File::open(path)?;
    GdsReader::new(BufReader::new(file)).read(layer_stack)
}
