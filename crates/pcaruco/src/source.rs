//! Point-cloud input.
//!
//! PLY files written by multi-camera capture rigs carry a per-vertex `tile`
//! byte naming the cameras that saw the point. Capture tools that store
//! points as RGBA write that byte as `alpha` instead; it is read the same
//! way when `tile` is absent. Files with neither are treated as coming from
//! a single tile.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use pcaruco_core::{Point, PointCloud};

use crate::error::SourceError;

/// Anything that can load a tiled point cloud from a path.
pub trait PointCloudSource {
    fn read(&self, path: &Path) -> Result<PointCloud, SourceError>;
}

/// PLY reader for `ascii`, `binary_little_endian` and `binary_big_endian`.
#[derive(Clone, Copy, Debug)]
pub struct PlySource {
    /// Tile byte given to every point when the file has no `tile` property.
    pub untiled: u8,
}

impl Default for PlySource {
    fn default() -> Self {
        Self { untiled: 1 }
    }
}

impl PointCloudSource for PlySource {
    fn read(&self, path: &Path) -> Result<PointCloud, SourceError> {
        let file = File::open(path)?;
        let cloud = read_ply(BufReader::new(file), self.untiled)?;
        log::info!(
            "read {} points from {} (tiles {:#04x})",
            cloud.len(),
            path.display(),
            cloud.tile_union()
        );
        Ok(cloud)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Encoding {
    Ascii,
    BinaryLe,
    BinaryBe,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Scalar {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    F32,
    F64,
}

impl Scalar {
    fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "char" | "int8" => Self::I8,
            "uchar" | "uint8" => Self::U8,
            "short" | "int16" => Self::I16,
            "ushort" | "uint16" => Self::U16,
            "int" | "int32" => Self::I32,
            "uint" | "uint32" => Self::U32,
            "float" | "float32" => Self::F32,
            "double" | "float64" => Self::F64,
            _ => return None,
        })
    }

    fn size(self) -> usize {
        match self {
            Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::I32 | Self::U32 | Self::F32 => 4,
            Self::F64 => 8,
        }
    }
}

#[derive(Clone, Debug)]
enum PropertyKind {
    Scalar(Scalar),
    List { count: Scalar, item: Scalar },
}

#[derive(Clone, Debug)]
struct Property {
    name: String,
    kind: PropertyKind,
}

#[derive(Clone, Debug)]
struct Element {
    name: String,
    count: usize,
    properties: Vec<Property>,
}

#[derive(Clone, Debug)]
struct Header {
    encoding: Encoding,
    elements: Vec<Element>,
}

fn parse_header<R: BufRead>(reader: &mut R) -> Result<Header, SourceError> {
    let mut line = String::new();
    let mut next_line = |line: &mut String| -> Result<(), SourceError> {
        line.clear();
        if reader.read_line(line)? == 0 {
            return Err(SourceError::Header("unexpected end of file".into()));
        }
        Ok(())
    };

    next_line(&mut line)?;
    if line.trim() != "ply" {
        return Err(SourceError::Header("missing `ply` magic".into()));
    }

    let mut encoding = None;
    let mut elements: Vec<Element> = Vec::new();
    loop {
        next_line(&mut line)?;
        let mut tok = line.split_whitespace();
        match tok.next() {
            Some("format") => {
                let name = tok.next().unwrap_or_default();
                encoding = Some(match name {
                    "ascii" => Encoding::Ascii,
                    "binary_little_endian" => Encoding::BinaryLe,
                    "binary_big_endian" => Encoding::BinaryBe,
                    other => return Err(SourceError::UnsupportedFormat(other.to_string())),
                });
            }
            Some("element") => {
                let (Some(name), Some(count)) = (tok.next(), tok.next()) else {
                    return Err(SourceError::Header(format!("bad element line `{}`", line.trim())));
                };
                let count = count
                    .parse()
                    .map_err(|_| SourceError::Header(format!("bad element count `{count}`")))?;
                elements.push(Element {
                    name: name.to_string(),
                    count,
                    properties: Vec::new(),
                });
            }
            Some("property") => {
                let prop = parse_property(tok.collect())?;
                let Some(elem) = elements.last_mut() else {
                    return Err(SourceError::Header("property before any element".into()));
                };
                elem.properties.push(prop);
            }
            Some("end_header") => break,
            Some("comment") | Some("obj_info") | None => {}
            Some(other) => {
                return Err(SourceError::Header(format!("unknown keyword `{other}`")));
            }
        }
    }

    let encoding = encoding.ok_or_else(|| SourceError::Header("missing format line".into()))?;
    Ok(Header { encoding, elements })
}

fn parse_property(tok: Vec<&str>) -> Result<Property, SourceError> {
    let bad = || SourceError::Header(format!("bad property `{}`", tok.join(" ")));
    match tok.as_slice() {
        ["list", count, item, name] => Ok(Property {
            name: name.to_string(),
            kind: PropertyKind::List {
                count: Scalar::parse(count).ok_or_else(bad)?,
                item: Scalar::parse(item).ok_or_else(bad)?,
            },
        }),
        [ty, name] => Ok(Property {
            name: name.to_string(),
            kind: PropertyKind::Scalar(Scalar::parse(ty).ok_or_else(bad)?),
        }),
        _ => Err(bad()),
    }
}

/// Source of property values, one element record at a time.
trait Records {
    fn begin(&mut self) -> Result<(), String>;
    fn value(&mut self, ty: Scalar) -> Result<f64, String>;
}

struct AsciiRecords<R> {
    reader: R,
    line: String,
    tokens: Vec<String>,
    pos: usize,
}

impl<R: BufRead> Records for AsciiRecords<R> {
    fn begin(&mut self) -> Result<(), String> {
        loop {
            self.line.clear();
            let n = self
                .reader
                .read_line(&mut self.line)
                .map_err(|e| e.to_string())?;
            if n == 0 {
                return Err("unexpected end of file".into());
            }
            if !self.line.trim().is_empty() {
                break;
            }
        }
        self.tokens = self.line.split_whitespace().map(str::to_string).collect();
        self.pos = 0;
        Ok(())
    }

    fn value(&mut self, _ty: Scalar) -> Result<f64, String> {
        let tok = self
            .tokens
            .get(self.pos)
            .ok_or_else(|| "too few values".to_string())?;
        self.pos += 1;
        tok.parse::<f64>()
            .map_err(|_| format!("invalid number `{tok}`"))
    }
}

struct BinaryRecords<R> {
    reader: R,
    big_endian: bool,
}

impl<R: Read> Records for BinaryRecords<R> {
    fn begin(&mut self) -> Result<(), String> {
        Ok(())
    }

    fn value(&mut self, ty: Scalar) -> Result<f64, String> {
        let mut buf = [0u8; 8];
        let b = &mut buf[..ty.size()];
        self.reader.read_exact(b).map_err(|e| e.to_string())?;
        Ok(decode_scalar(ty, b, self.big_endian))
    }
}

fn decode_scalar(ty: Scalar, b: &[u8], big: bool) -> f64 {
    fn arr<const N: usize>(b: &[u8]) -> [u8; N] {
        let mut a = [0u8; N];
        a.copy_from_slice(&b[..N]);
        a
    }
    macro_rules! num {
        ($t:ty) => {
            if big {
                <$t>::from_be_bytes(arr(b)) as f64
            } else {
                <$t>::from_le_bytes(arr(b)) as f64
            }
        };
    }
    match ty {
        Scalar::I8 => b[0] as i8 as f64,
        Scalar::U8 => b[0] as f64,
        Scalar::I16 => num!(i16),
        Scalar::U16 => num!(u16),
        Scalar::I32 => num!(i32),
        Scalar::U32 => num!(u32),
        Scalar::F32 => num!(f32),
        Scalar::F64 => num!(f64),
    }
}

/// Read one element record; list properties are consumed and reported as NaN.
fn read_record<T: Records>(records: &mut T, elem: &Element, out: &mut Vec<f64>) -> Result<(), String> {
    out.clear();
    records.begin()?;
    for prop in &elem.properties {
        match prop.kind {
            PropertyKind::Scalar(ty) => out.push(records.value(ty)?),
            PropertyKind::List { count, item } => {
                let n = records.value(count)?;
                if !(n >= 0.0 && n.fract() == 0.0) {
                    return Err(format!("invalid list length {n}"));
                }
                for _ in 0..n as usize {
                    records.value(item)?;
                }
                out.push(f64::NAN);
            }
        }
    }
    Ok(())
}

/// Column indices of the vertex properties we use.
struct VertexLayout {
    xyz: [usize; 3],
    rgb: Option<[usize; 3]>,
    tile: Option<usize>,
}

impl VertexLayout {
    fn new(elem: &Element) -> Result<Self, SourceError> {
        let find = |name: &str| {
            elem.properties
                .iter()
                .position(|p| p.name == name && matches!(p.kind, PropertyKind::Scalar(_)))
        };
        let axis = |name: &str| {
            find(name).ok_or_else(|| SourceError::Header(format!("vertex has no `{name}` property")))
        };
        let xyz = [axis("x")?, axis("y")?, axis("z")?];
        let rgb = match (find("red"), find("green"), find("blue")) {
            (Some(r), Some(g), Some(b)) => Some([r, g, b]),
            _ => None,
        };
        Ok(Self {
            xyz,
            rgb,
            tile: find("tile").or_else(|| find("alpha")),
        })
    }
}

fn read_body<T: Records>(
    records: &mut T,
    header: &Header,
    untiled: u8,
) -> Result<PointCloud, SourceError> {
    let mut cloud = PointCloud::empty();
    let mut row = Vec::new();
    let mut seen_vertex = false;

    for elem in &header.elements {
        let is_vertex = elem.name == "vertex" && !seen_vertex;
        if !is_vertex && seen_vertex {
            // Nothing after the vertices is needed.
            break;
        }
        let layout = if is_vertex {
            seen_vertex = true;
            Some(VertexLayout::new(elem)?)
        } else {
            None
        };

        for record in 0..elem.count {
            read_record(records, elem, &mut row).map_err(|reason| SourceError::Data {
                element: elem.name.clone(),
                record,
                reason,
            })?;
            let Some(layout) = &layout else {
                continue;
            };
            let [xi, yi, zi] = layout.xyz;
            let rgb = layout
                .rgb
                .map(|[r, g, b]| [to_u8(row[r]), to_u8(row[g]), to_u8(row[b])])
                .unwrap_or([255, 255, 255]);
            let tile = layout.tile.map(|t| to_u8(row[t])).unwrap_or(untiled);
            cloud.push(
                Point::new(row[xi] as f32, row[yi] as f32, row[zi] as f32, rgb),
                tile,
            );
        }
    }

    if !seen_vertex {
        return Err(SourceError::Header("no vertex element".into()));
    }
    Ok(cloud)
}

fn to_u8(v: f64) -> u8 {
    v.clamp(0.0, 255.0) as u8
}

/// Parse a PLY stream into a tiled point cloud.
///
/// Vertices need `x`, `y` and `z`; `red`, `green`, `blue` default to white.
/// The tile byte comes from `tile`, else `alpha`, else `untiled`. Other
/// properties and elements are skipped.
pub fn read_ply<R: BufRead>(mut reader: R, untiled: u8) -> Result<PointCloud, SourceError> {
    let header = parse_header(&mut reader)?;
    match header.encoding {
        Encoding::Ascii => read_body(
            &mut AsciiRecords {
                reader,
                line: String::new(),
                tokens: Vec::new(),
                pos: 0,
            },
            &header,
            untiled,
        ),
        Encoding::BinaryLe | Encoding::BinaryBe => read_body(
            &mut BinaryRecords {
                reader,
                big_endian: header.encoding == Encoding::BinaryBe,
            },
            &header,
            untiled,
        ),
    }
}
