use nalgebra::Point3;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::{debug, warn};

use super::encoding::{bytes_to_array, parse_ascii, BinaryLayout, ByteOrder, HeaderType};
use crate::domain::model::{ArrayData, Cell, CellType, DataArray, ScalarType, UnstructuredGrid};
use crate::utils::error::{BcError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AppendedEncoding {
    Raw,
    Base64,
}

#[derive(Debug)]
enum Payload {
    Ascii(String),
    Binary(String),
    Appended(usize),
}

#[derive(Debug)]
struct RawArray {
    name: Option<String>,
    scalar: ScalarType,
    components: usize,
    payload: Payload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Other,
    Points,
    Cells,
    PointData,
    CellData,
}

#[derive(Debug, Default)]
struct RawPiece {
    n_points: usize,
    n_cells: usize,
    points: Option<RawArray>,
    cells: Vec<RawArray>,
    point_data: Vec<RawArray>,
    cell_data: Vec<RawArray>,
}

struct Appended<'a> {
    encoding: AppendedEncoding,
    data: &'a [u8],
    /// Sorted offsets of every appended array, used to find base64 segment ends.
    offsets: Vec<usize>,
}

struct Decoder<'a> {
    layout: BinaryLayout,
    appended: Option<Appended<'a>>,
}

/// Parses a `.vtu` file (ascii, inline binary or appended data, optionally
/// zlib compressed) into an [`UnstructuredGrid`].
///
/// Multiple pieces are merged into one grid. Arrays missing from some piece
/// are dropped.
pub fn read_vtu(bytes: &[u8]) -> Result<UnstructuredGrid> {
    let (xml_part, appended_part) = match find(bytes, b"<AppendedData") {
        Some(pos) => (&bytes[..pos], Some(&bytes[pos..])),
        None => (bytes, None),
    };
    let xml = std::str::from_utf8(xml_part)
        .map_err(|e| BcError::format(format!("VTK XML header is not UTF-8: {}", e)))?;

    let (layout, pieces) = parse_xml(xml)?;

    let appended = match appended_part {
        Some(part) => {
            let mut offsets: Vec<usize> = pieces
                .iter()
                .flat_map(|p| {
                    p.points
                        .iter()
                        .chain(&p.cells)
                        .chain(&p.point_data)
                        .chain(&p.cell_data)
                })
                .filter_map(|a| match a.payload {
                    Payload::Appended(offset) => Some(offset),
                    _ => None,
                })
                .collect();
            offsets.sort_unstable();
            offsets.dedup();
            Some(split_appended(part, offsets)?)
        }
        None => None,
    };

    let decoder = Decoder { layout, appended };
    let mut grid = UnstructuredGrid::default();
    for (index, piece) in pieces.into_iter().enumerate() {
        let part = decoder.build_piece(piece)?;
        if index == 0 {
            grid = part;
        } else {
            merge(&mut grid, part);
        }
    }

    debug!(
        "Parsed VTU: {} points, {} cells, {} point arrays, {} cell arrays",
        grid.point_count(),
        grid.cell_count(),
        grid.point_data.len(),
        grid.cell_data.len()
    );
    Ok(grid)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn attribute(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.local_name().as_ref() == key)
        .map(|attr| match attr.unescape_value() {
            Ok(value) => value.into_owned(),
            Err(_) => String::from_utf8_lossy(&attr.value).into_owned(),
        })
}

fn parse_count(e: &BytesStart, key: &str) -> Result<usize> {
    let value = attribute(e, key.as_bytes()).unwrap_or_else(|| "0".to_string());
    value
        .trim()
        .parse()
        .map_err(|_| BcError::format(format!("invalid {} '{}'", key, value)))
}

fn parse_file_attributes(e: &BytesStart) -> Result<BinaryLayout> {
    if let Some(kind) = attribute(e, b"type") {
        if kind != "UnstructuredGrid" {
            return Err(BcError::UnsupportedFormat {
                message: format!("VTK XML type '{}' is not an UnstructuredGrid", kind),
            });
        }
    }

    let byte_order = match attribute(e, b"byte_order").as_deref() {
        Some("BigEndian") => ByteOrder::BigEndian,
        _ => ByteOrder::LittleEndian,
    };
    let header_type = match attribute(e, b"header_type").as_deref() {
        Some("UInt64") => HeaderType::UInt64,
        None | Some("UInt32") => HeaderType::UInt32,
        Some(other) => {
            return Err(BcError::UnsupportedFormat {
                message: format!("header_type '{}'", other),
            })
        }
    };
    let compressed = match attribute(e, b"compressor").as_deref() {
        None | Some("") => false,
        Some("vtkZLibDataCompressor") => true,
        Some(other) => {
            return Err(BcError::UnsupportedFormat {
                message: format!("compressor '{}'", other),
            })
        }
    };

    Ok(BinaryLayout {
        byte_order,
        header_type,
        compressed,
    })
}

/// DataArray attributes with an empty text payload.
fn parse_array_start(e: &BytesStart) -> Result<RawArray> {
    let type_name = attribute(e, b"type").unwrap_or_default();
    let scalar = ScalarType::from_vtk_name(&type_name).ok_or_else(|| BcError::UnsupportedFormat {
        message: format!("DataArray type '{}'", type_name),
    })?;
    let components = match attribute(e, b"NumberOfComponents") {
        Some(n) => n
            .trim()
            .parse::<usize>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| BcError::format(format!("invalid NumberOfComponents '{}'", n)))?,
        None => 1,
    };
    let payload = match attribute(e, b"format").as_deref() {
        None | Some("ascii") => Payload::Ascii(String::new()),
        Some("binary") => Payload::Binary(String::new()),
        Some("appended") => {
            let offset = parse_count(e, "offset")?;
            Payload::Appended(offset)
        }
        Some(other) => {
            return Err(BcError::UnsupportedFormat {
                message: format!("DataArray format '{}'", other),
            })
        }
    };

    Ok(RawArray {
        name: attribute(e, b"Name"),
        scalar,
        components,
        payload,
    })
}

fn parse_xml(xml: &str) -> Result<(BinaryLayout, Vec<RawPiece>)> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut layout = BinaryLayout::default();
    let mut seen_grid = false;
    let mut pieces = Vec::new();
    let mut piece: Option<RawPiece> = None;
    let mut section = Section::Other;
    let mut pending: Option<RawArray> = None;

    loop {
        match reader.read_event()? {
            Event::Start(ref e) => match e.local_name().as_ref() {
                b"VTKFile" => layout = parse_file_attributes(e)?,
                b"UnstructuredGrid" => seen_grid = true,
                b"Piece" => {
                    piece = Some(RawPiece {
                        n_points: parse_count(e, "NumberOfPoints")?,
                        n_cells: parse_count(e, "NumberOfCells")?,
                        ..RawPiece::default()
                    })
                }
                b"Points" => section = Section::Points,
                b"Cells" => section = Section::Cells,
                b"PointData" => section = Section::PointData,
                b"CellData" => section = Section::CellData,
                b"DataArray" => pending = Some(parse_array_start(e)?),
                _ => {}
            },
            Event::Empty(ref e) => match e.local_name().as_ref() {
                b"Piece" => pieces.push(RawPiece {
                    n_points: parse_count(e, "NumberOfPoints")?,
                    n_cells: parse_count(e, "NumberOfCells")?,
                    ..RawPiece::default()
                }),
                b"DataArray" => {
                    let array = parse_array_start(e)?;
                    if let Some(p) = piece.as_mut() {
                        store(p, section, array);
                    }
                }
                _ => {}
            },
            Event::Text(ref t) => {
                if let Some(array) = pending.as_mut() {
                    let text = t
                        .unescape()
                        .map_err(|e| BcError::format(format!("invalid DataArray text: {}", e)))?;
                    match &mut array.payload {
                        Payload::Ascii(buf) | Payload::Binary(buf) => {
                            buf.push(' ');
                            buf.push_str(&text);
                        }
                        Payload::Appended(_) => {}
                    }
                }
            }
            Event::End(ref e) => match e.local_name().as_ref() {
                b"DataArray" => {
                    if let (Some(array), Some(p)) = (pending.take(), piece.as_mut()) {
                        store(p, section, array);
                    }
                }
                b"Points" | b"Cells" | b"PointData" | b"CellData" => section = Section::Other,
                b"Piece" => {
                    if let Some(p) = piece.take() {
                        pieces.push(p);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    if !seen_grid {
        return Err(BcError::format("no <UnstructuredGrid> element found"));
    }
    Ok((layout, pieces))
}

fn store(piece: &mut RawPiece, section: Section, array: RawArray) {
    match section {
        Section::Points => piece.points = Some(array),
        Section::Cells => piece.cells.push(array),
        Section::PointData => piece.point_data.push(array),
        Section::CellData => piece.cell_data.push(array),
        // FieldData and unknown sections
        Section::Other => {}
    }
}

/// Locates the payload of `<AppendedData>`, which starts after the `_` marker.
fn split_appended(part: &[u8], offsets: Vec<usize>) -> Result<Appended<'_>> {
    let tag_end = find(part, b">").ok_or_else(|| BcError::format("unterminated <AppendedData> tag"))?;
    let tag = std::str::from_utf8(&part[..=tag_end])
        .map_err(|_| BcError::format("<AppendedData> tag is not UTF-8"))?;

    let mut reader = Reader::from_str(tag);
    let encoding = match reader.read_event()? {
        Event::Start(ref e) | Event::Empty(ref e) => match attribute(e, b"encoding").as_deref() {
            Some("raw") => AppendedEncoding::Raw,
            Some("base64") | None => AppendedEncoding::Base64,
            Some(other) => {
                return Err(BcError::UnsupportedFormat {
                    message: format!("AppendedData encoding '{}'", other),
                })
            }
        },
        _ => return Err(BcError::format("malformed <AppendedData> tag")),
    };

    let rest = &part[tag_end + 1..];
    let marker = rest
        .iter()
        .position(|&b| b == b'_')
        .ok_or_else(|| BcError::format("<AppendedData> is missing its '_' marker"))?;
    let mut data = &rest[marker + 1..];
    if encoding == AppendedEncoding::Base64 {
        if let Some(end) = find(data, b"</AppendedData>") {
            data = &data[..end];
        }
    }

    Ok(Appended {
        encoding,
        data,
        offsets,
    })
}

impl Decoder<'_> {
    fn decode(&self, array: &RawArray) -> Result<ArrayData> {
        match &array.payload {
            Payload::Ascii(text) => parse_ascii(text, array.scalar),
            Payload::Binary(text) => {
                let bytes = self.layout.decode_base64(text)?;
                bytes_to_array(&bytes, array.scalar, self.layout.byte_order)
            }
            Payload::Appended(offset) => {
                let appended = self
                    .appended
                    .as_ref()
                    .ok_or_else(|| BcError::format("appended DataArray without <AppendedData>"))?;
                let segment = appended
                    .data
                    .get(*offset..)
                    .ok_or_else(|| BcError::format(format!("appended offset {} out of range", offset)))?;
                let bytes = match appended.encoding {
                    AppendedEncoding::Raw => self.layout.decode_raw(segment)?,
                    AppendedEncoding::Base64 => {
                        let end = appended
                            .offsets
                            .iter()
                            .find(|&&o| o > *offset)
                            .map(|o| o - offset)
                            .unwrap_or(segment.len())
                            .min(segment.len());
                        let text = std::str::from_utf8(&segment[..end])
                            .map_err(|_| BcError::format("appended base64 data is not ASCII"))?;
                        self.layout.decode_base64(text)?
                    }
                };
                bytes_to_array(&bytes, array.scalar, self.layout.byte_order)
            }
        }
    }

    fn decode_named(&self, array: RawArray, fallback: String, tuples: usize) -> Result<DataArray> {
        let data = self.decode(&array)?;
        let out = DataArray {
            name: array.name.unwrap_or(fallback),
            scalar_type: array.scalar,
            components: array.components,
            data,
        };
        if out.data.len() != tuples * out.components {
            return Err(BcError::ArrayLengthMismatch {
                name: out.name,
                expected: tuples * out.components,
                actual: out.data.len(),
            });
        }
        Ok(out)
    }

    fn build_piece(&self, piece: RawPiece) -> Result<UnstructuredGrid> {
        let points = match &piece.points {
            Some(array) => {
                if array.components != 3 {
                    return Err(BcError::format(format!(
                        "Points must have 3 components, found {}",
                        array.components
                    )));
                }
                let coords = self.decode(array)?;
                if coords.len() != 3 * piece.n_points {
                    return Err(BcError::ArrayLengthMismatch {
                        name: "Points".to_string(),
                        expected: 3 * piece.n_points,
                        actual: coords.len(),
                    });
                }
                (0..piece.n_points)
                    .map(|i| {
                        Point3::new(
                            coords.value_as_f64(3 * i),
                            coords.value_as_f64(3 * i + 1),
                            coords.value_as_f64(3 * i + 2),
                        )
                    })
                    .collect()
            }
            None if piece.n_points == 0 => Vec::new(),
            None => return Err(BcError::format("piece has points but no <Points> array")),
        };

        let cells = self.build_cells(&piece)?;

        let mut grid = UnstructuredGrid {
            points,
            cells,
            ..Default::default()
        };
        for (i, array) in piece.point_data.into_iter().enumerate() {
            let array = self.decode_named(array, format!("point_array_{}", i), piece.n_points)?;
            grid.set_point_array(array)?;
        }
        for (i, array) in piece.cell_data.into_iter().enumerate() {
            let array = self.decode_named(array, format!("cell_array_{}", i), piece.n_cells)?;
            grid.set_cell_array(array)?;
        }
        Ok(grid)
    }

    fn build_cells(&self, piece: &RawPiece) -> Result<Vec<Cell>> {
        if piece.n_cells == 0 {
            return Ok(Vec::new());
        }

        let named = |name: &str| {
            piece
                .cells
                .iter()
                .find(|a| a.name.as_deref() == Some(name))
                .ok_or_else(|| BcError::format(format!("<Cells> is missing '{}'", name)))
        };
        let to_indices = |data: ArrayData, what: &str| -> Result<Vec<usize>> {
            (0..data.len())
                .map(|i| match &data {
                    ArrayData::Signed(v) => usize::try_from(v[i]).ok(),
                    ArrayData::Unsigned(v) => usize::try_from(v[i]).ok(),
                    ArrayData::Float(_) => None,
                })
                .collect::<Option<Vec<usize>>>()
                .ok_or_else(|| BcError::format(format!("'{}' must hold non-negative integers", what)))
        };

        let connectivity = to_indices(self.decode(named("connectivity")?)?, "connectivity")?;
        let offsets = to_indices(self.decode(named("offsets")?)?, "offsets")?;
        let types = to_indices(self.decode(named("types")?)?, "types")?;

        if offsets.len() != piece.n_cells || types.len() != piece.n_cells {
            return Err(BcError::format(format!(
                "expected {} cells, found {} offsets and {} types",
                piece.n_cells,
                offsets.len(),
                types.len()
            )));
        }

        let mut cells = Vec::with_capacity(piece.n_cells);
        let mut start = 0;
        for (&end, &kind) in offsets.iter().zip(&types) {
            if end < start || end > connectivity.len() {
                return Err(BcError::format(format!("invalid cell offset {}", end)));
            }
            let vertices = connectivity[start..end].to_vec();
            if let Some(&v) = vertices.iter().find(|&&v| v >= piece.n_points) {
                return Err(BcError::format(format!(
                    "cell references point {} of {}",
                    v, piece.n_points
                )));
            }
            let kind = u8::try_from(kind)
                .map_err(|_| BcError::format(format!("invalid cell type {}", kind)))?;
            cells.push(Cell::new(CellType::from_vtk_id(kind), vertices));
            start = end;
        }
        Ok(cells)
    }
}

fn append_data(into: &mut ArrayData, from: ArrayData) -> bool {
    match (into, from) {
        (ArrayData::Float(a), ArrayData::Float(b)) => a.extend(b),
        (ArrayData::Signed(a), ArrayData::Signed(b)) => a.extend(b),
        (ArrayData::Unsigned(a), ArrayData::Unsigned(b)) => a.extend(b),
        _ => return false,
    }
    true
}

fn merge_arrays(into: &mut Vec<DataArray>, mut from: Vec<DataArray>) {
    into.retain_mut(|array| {
        let Some(pos) = from
            .iter()
            .position(|a| a.name == array.name && a.components == array.components)
        else {
            warn!("⚠️ Array '{}' is missing from some pieces, dropping it", array.name);
            return false;
        };
        let other = from.swap_remove(pos);
        append_data(&mut array.data, other.data)
    });
}

fn merge(grid: &mut UnstructuredGrid, part: UnstructuredGrid) {
    let base = grid.points.len();
    grid.points.extend(part.points);
    grid.cells.extend(part.cells.into_iter().map(|mut cell| {
        cell.vertices.iter_mut().for_each(|v| *v += base);
        cell
    }));
    merge_arrays(&mut grid.point_data, part.point_data);
    merge_arrays(&mut grid.cell_data, part.cell_data);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::vtu::encoding::encode_base64;
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

    const ASCII_VTU: &str = r#"<?xml version="1.0"?>
<VTKFile type="UnstructuredGrid" version="1.0" byte_order="LittleEndian">
  <UnstructuredGrid>
    <Piece NumberOfPoints="4" NumberOfCells="1">
      <PointData>
        <DataArray type="Float32" Name="p" format="ascii">0 1 2 3</DataArray>
      </PointData>
      <CellData>
        <DataArray type="Int32" Name="material" format="ascii">7</DataArray>
      </CellData>
      <Points>
        <DataArray type="Float64" NumberOfComponents="3" format="ascii">
          0 0 0  1 0 0  0 1 0  0 0 1
        </DataArray>
      </Points>
      <Cells>
        <DataArray type="Int64" Name="connectivity" format="ascii">0 1 2 3</DataArray>
        <DataArray type="Int64" Name="offsets" format="ascii">4</DataArray>
        <DataArray type="UInt8" Name="types" format="ascii">10</DataArray>
      </Cells>
    </Piece>
  </UnstructuredGrid>
</VTKFile>
"#;

    #[test]
    fn test_read_ascii() {
        let grid = read_vtu(ASCII_VTU.as_bytes()).unwrap();
        assert_eq!(grid.point_count(), 4);
        assert_eq!(grid.points[3], Point3::new(0.0, 0.0, 1.0));
        assert_eq!(grid.cells, vec![Cell::new(CellType::Tetra, vec![0, 1, 2, 3])]);
        assert_eq!(grid.point_array("p").unwrap().data, ArrayData::Float(vec![0.0, 1.0, 2.0, 3.0]));
        assert_eq!(grid.cell_array("material").unwrap().data, ArrayData::Signed(vec![7]));
    }

    #[test]
    fn test_read_inline_binary_with_vtk_header() {
        // UInt32 header encoded separately from the data, as VTK writes it.
        let block = |bytes: Vec<u8>| {
            format!(
                "{}{}",
                BASE64.encode((bytes.len() as u32).to_le_bytes()),
                BASE64.encode(&bytes)
            )
        };
        let points: Vec<u8> = [0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect();
        let conn: Vec<u8> = [0i32, 1].iter().flat_map(|v| v.to_le_bytes()).collect();
        let offsets: Vec<u8> = 2i32.to_le_bytes().to_vec();
        let types = vec![3u8];

        let xml = format!(
            r#"<VTKFile type="UnstructuredGrid" version="0.1" byte_order="LittleEndian">
<UnstructuredGrid><Piece NumberOfPoints="2" NumberOfCells="1">
<Points><DataArray type="Float32" NumberOfComponents="3" format="binary">{}</DataArray></Points>
<Cells>
<DataArray type="Int32" Name="connectivity" format="binary">{}</DataArray>
<DataArray type="Int32" Name="offsets" format="binary">{}</DataArray>
<DataArray type="UInt8" Name="types" format="binary">{}</DataArray>
</Cells></Piece></UnstructuredGrid></VTKFile>"#,
            block(points),
            block(conn),
            block(offsets),
            block(types)
        );

        let grid = read_vtu(xml.as_bytes()).unwrap();
        assert_eq!(grid.points[1], Point3::new(1.0, 0.0, 0.0));
        assert_eq!(grid.cells, vec![Cell::new(CellType::Line, vec![0, 1])]);
    }

    #[test]
    fn test_read_appended_raw() {
        let mut data = Vec::new();
        let mut offsets = Vec::new();
        let mut push = |bytes: Vec<u8>| {
            offsets.push(data.len());
            data.extend_from_slice(&(bytes.len() as u64).to_le_bytes());
            data.extend_from_slice(&bytes);
        };
        push([0.0f64, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 2.0, 0.0].iter().flat_map(|v| v.to_le_bytes()).collect());
        push([0i64, 1, 2].iter().flat_map(|v| v.to_le_bytes()).collect());
        push(3i64.to_le_bytes().to_vec());
        push(vec![5u8]);
        push([10u64, 11, 12].iter().flat_map(|v| v.to_le_bytes()).collect());

        let header = format!(
            r#"<VTKFile type="UnstructuredGrid" version="1.0" byte_order="LittleEndian" header_type="UInt64">
<UnstructuredGrid><Piece NumberOfPoints="3" NumberOfCells="1">
<PointData><DataArray type="UInt64" Name="ids" format="appended" offset="{}"/></PointData>
<Points><DataArray type="Float64" NumberOfComponents="3" format="appended" offset="{}"/></Points>
<Cells>
<DataArray type="Int64" Name="connectivity" format="appended" offset="{}"/>
<DataArray type="Int64" Name="offsets" format="appended" offset="{}"/>
<DataArray type="UInt8" Name="types" format="appended" offset="{}"/>
</Cells></Piece></UnstructuredGrid>
<AppendedData encoding="raw">
_"#,
            offsets[4], offsets[0], offsets[1], offsets[2], offsets[3]
        );
        let mut bytes = header.into_bytes();
        bytes.extend_from_slice(&data);
        bytes.extend_from_slice(b"\n</AppendedData>\n</VTKFile>\n");

        let grid = read_vtu(&bytes).unwrap();
        assert_eq!(grid.points[2], Point3::new(0.0, 2.0, 0.0));
        assert_eq!(grid.cells[0].kind, CellType::Triangle);
        assert_eq!(grid.point_array("ids").unwrap().data, ArrayData::Unsigned(vec![10, 11, 12]));
    }

    #[test]
    fn test_read_appended_base64_compressed() {
        // ParaView 寫法：每個陣列各自壓縮並以 base64 串接在 '_' 之後
        let mut data = String::new();
        let mut offsets = Vec::new();
        let mut push = |bytes: Vec<u8>| {
            offsets.push(data.len());
            data.push_str(&encode_base64(&bytes, Some(6)).unwrap());
        };
        push([1.0f32, 2.0, 3.0].iter().flat_map(|v| v.to_le_bytes()).collect());
        push([0.0f64, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0].iter().flat_map(|v| v.to_le_bytes()).collect());
        push([0i64, 1, 2].iter().flat_map(|v| v.to_le_bytes()).collect());
        push(3i64.to_le_bytes().to_vec());
        push(vec![5u8]);

        let xml = format!(
            r#"<VTKFile type="UnstructuredGrid" version="1.0" byte_order="LittleEndian" header_type="UInt64" compressor="vtkZLibDataCompressor">
<UnstructuredGrid><Piece NumberOfPoints="3" NumberOfCells="1">
<PointData><DataArray type="Float32" Name="p" format="appended" offset="{}"/></PointData>
<Points><DataArray type="Float64" NumberOfComponents="3" format="appended" offset="{}"/></Points>
<Cells>
<DataArray type="Int64" Name="connectivity" format="appended" offset="{}"/>
<DataArray type="Int64" Name="offsets" format="appended" offset="{}"/>
<DataArray type="UInt8" Name="types" format="appended" offset="{}"/>
</Cells></Piece></UnstructuredGrid>
<AppendedData encoding="base64">
   _{}
</AppendedData>
</VTKFile>
"#,
            offsets[0], offsets[1], offsets[2], offsets[3], offsets[4], data
        );

        let grid = read_vtu(xml.as_bytes()).unwrap();
        assert_eq!(grid.point_count(), 3);
        assert_eq!(grid.points[1], Point3::new(1.0, 0.0, 0.0));
        assert_eq!(grid.cells, vec![Cell::new(CellType::Triangle, vec![0, 1, 2])]);
        assert_eq!(grid.point_array("p").unwrap().data, ArrayData::Float(vec![1.0, 2.0, 3.0]));
    }

    #[test]
    fn test_multiple_pieces_are_merged() {
        let piece = r#"<Piece NumberOfPoints="2" NumberOfCells="1">
<PointData><DataArray type="Float64" Name="v" format="ascii">1 2</DataArray></PointData>
<Points><DataArray type="Float64" NumberOfComponents="3" format="ascii">0 0 0 1 0 0</DataArray></Points>
<Cells>
<DataArray type="Int32" Name="connectivity" format="ascii">0 1</DataArray>
<DataArray type="Int32" Name="offsets" format="ascii">2</DataArray>
<DataArray type="UInt8" Name="types" format="ascii">3</DataArray>
</Cells></Piece>"#;
        let xml = format!(
            r#"<VTKFile type="UnstructuredGrid"><UnstructuredGrid>{}{}</UnstructuredGrid></VTKFile>"#,
            piece, piece
        );
        let grid = read_vtu(xml.as_bytes()).unwrap();
        assert_eq!(grid.point_count(), 4);
        assert_eq!(grid.cells[1].vertices, vec![2, 3]);
        assert_eq!(grid.point_array("v").unwrap().data, ArrayData::Float(vec![1.0, 2.0, 1.0, 2.0]));
    }

    #[test]
    fn test_rejects_other_dataset_types() {
        let xml = r#"<VTKFile type="PolyData"><PolyData></PolyData></VTKFile>"#;
        let err = read_vtu(xml.as_bytes()).unwrap_err();
        assert!(matches!(err, BcError::UnsupportedFormat { .. }));
    }

    #[test]
    fn test_rejects_out_of_range_connectivity() {
        let xml = ASCII_VTU.replace(">0 1 2 3</DataArray>\n        <DataArray type=\"Int64\" Name=\"offsets\"", ">0 1 2 9</DataArray>\n        <DataArray type=\"Int64\" Name=\"offsets\"");
        assert!(read_vtu(xml.as_bytes()).is_err());
    }

    #[test]
    fn test_rejects_short_point_array() {
        let xml = ASCII_VTU.replace(">0 1 2 3</DataArray>\n      </PointData>", ">0 1 2</DataArray>\n      </PointData>");
        let err = read_vtu(xml.as_bytes()).unwrap_err();
        assert!(matches!(err, BcError::ArrayLengthMismatch { .. }));
    }
}
