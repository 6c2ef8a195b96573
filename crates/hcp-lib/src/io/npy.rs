//! NumPy `.npy` readers.
//!
//! Numeric arrays go through `ndarray-npy`. The region table is a string
//! array (`<U…` or `|S…` dtype), which `ndarray-npy` does not decode, so it
//! is parsed here from the raw header and payload.

use crate::error::{HcpError, Result};
use ndarray::Array2;
use ndarray_npy::{read_npy, ReadNpyError};
use std::path::Path;

const MAGIC: &[u8] = b"\x93NUMPY";

/// Read a 2-D float array, widening `f32` payloads to `f64`.
pub fn read_f64_matrix(path: &Path) -> Result<Array2<f64>> {
    match read_npy::<_, Array2<f64>>(path) {
        Ok(data) => Ok(data),
        Err(ReadNpyError::WrongDescriptor(_)) => read_npy::<_, Array2<f32>>(path)
            .map(|data| data.mapv(f64::from))
            .map_err(|source| HcpError::TimeSeries {
                path: path.to_path_buf(),
                source,
            }),
        Err(source) => Err(HcpError::TimeSeries {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Decoded string array in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct StringTable {
    pub shape: Vec<usize>,
    pub cells: Vec<String>,
}

impl StringTable {
    pub fn rows(&self) -> usize {
        self.shape.first().copied().unwrap_or(0)
    }

    pub fn cols(&self) -> usize {
        self.shape.get(1).copied().unwrap_or(1)
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&str> {
        if col >= self.cols() {
            return None;
        }
        self.cells.get(row * self.cols() + col).map(String::as_str)
    }

    pub fn transposed(&self) -> StringTable {
        let (rows, cols) = (self.rows(), self.cols());
        let mut cells = Vec::with_capacity(self.cells.len());
        for c in 0..cols {
            for r in 0..rows {
                cells.push(self.cells[r * cols + c].clone());
            }
        }
        StringTable {
            shape: vec![cols, rows],
            cells,
        }
    }
}

pub fn read_string_table(path: &Path) -> Result<StringTable> {
    let bytes = std::fs::read(path).map_err(|source| HcpError::io(path, source))?;
    parse_string_table(&bytes).map_err(|message| HcpError::Regions {
        path: path.to_path_buf(),
        message,
    })
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum StrKind {
    Unicode { little_endian: bool },
    Bytes,
}

pub fn parse_string_table(buf: &[u8]) -> std::result::Result<StringTable, String> {
    if buf.len() < 10 || &buf[..6] != MAGIC {
        return Err("missing .npy magic".into());
    }
    let (header_len, header_start) = match buf[6] {
        1 => (u16::from_le_bytes([buf[8], buf[9]]) as usize, 10),
        2 | 3 => {
            if buf.len() < 12 {
                return Err("truncated .npy header".into());
            }
            (
                u32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]) as usize,
                12,
            )
        }
        major => return Err(format!("unsupported .npy version {major}")),
    };
    let data_start = header_start + header_len;
    if buf.len() < data_start {
        return Err("truncated .npy header".into());
    }
    let header = std::str::from_utf8(&buf[header_start..data_start])
        .map_err(|_| "header is not valid text".to_string())?;

    let descr = dict_string(header, "descr").ok_or("header has no descr")?;
    let (kind, width) = parse_descr(&descr)?;
    let fortran = header
        .split("'fortran_order':")
        .nth(1)
        .map(|rest| rest.trim_start().starts_with("True"))
        .unwrap_or(false);
    let shape = parse_shape(header)?;

    let count: usize = shape.iter().product();
    let item_bytes = match kind {
        StrKind::Unicode { .. } => width * 4,
        StrKind::Bytes => width,
    };
    let payload = &buf[data_start..];
    if payload.len() < count * item_bytes {
        return Err(format!(
            "payload holds {} bytes, shape {:?} needs {}",
            payload.len(),
            shape,
            count * item_bytes
        ));
    }
    let mut cells: Vec<String> = (0..count)
        .map(|i| decode_item(&payload[i * item_bytes..(i + 1) * item_bytes], kind))
        .collect::<std::result::Result<_, _>>()?;

    if fortran && shape.len() == 2 {
        let (rows, cols) = (shape[0], shape[1]);
        let mut reordered = Vec::with_capacity(count);
        for r in 0..rows {
            for c in 0..cols {
                reordered.push(std::mem::take(&mut cells[c * rows + r]));
            }
        }
        cells = reordered;
    }
    Ok(StringTable { shape, cells })
}

fn dict_string(header: &str, key: &str) -> Option<String> {
    let rest = header.split(&format!("'{key}':")).nth(1)?.trim_start();
    let quote = rest.chars().next().filter(|c| *c == '\'' || *c == '"')?;
    let body = &rest[1..];
    body.find(quote).map(|end| body[..end].to_string())
}

fn parse_descr(descr: &str) -> std::result::Result<(StrKind, usize), String> {
    let mut chars = descr.chars();
    let order = chars.next().ok_or("empty descr")?;
    let code = chars.next().ok_or("short descr")?;
    let width: usize = chars
        .as_str()
        .parse()
        .map_err(|_| format!("unsupported descr '{descr}'"))?;
    match code {
        'U' => Ok((
            StrKind::Unicode {
                little_endian: order != '>',
            },
            width,
        )),
        'S' | 'a' => Ok((StrKind::Bytes, width)),
        _ => Err(format!("descr '{descr}' is not a string dtype")),
    }
}

fn parse_shape(header: &str) -> std::result::Result<Vec<usize>, String> {
    let rest = header
        .split("'shape':")
        .nth(1)
        .ok_or("header has no shape")?;
    let open = rest.find('(').ok_or("malformed shape")?;
    let close = rest.find(')').ok_or("malformed shape")?;
    rest[open + 1..close]
        .split(',')
        .map(str::trim)
        .filter(|dim| !dim.is_empty())
        .map(|dim| {
            dim.trim_end_matches('L')
                .parse::<usize>()
                .map_err(|_| format!("bad shape dimension '{dim}'"))
        })
        .collect()
}

fn decode_item(raw: &[u8], kind: StrKind) -> std::result::Result<String, String> {
    match kind {
        StrKind::Unicode { little_endian } => {
            let mut out = String::new();
            for chunk in raw.chunks_exact(4) {
                let bytes = [chunk[0], chunk[1], chunk[2], chunk[3]];
                let code = if little_endian {
                    u32::from_le_bytes(bytes)
                } else {
                    u32::from_be_bytes(bytes)
                };
                if code == 0 {
                    break;
                }
                out.push(char::from_u32(code).ok_or(format!("invalid code point {code:#x}"))?);
            }
            Ok(out)
        }
        StrKind::Bytes => {
            let end = raw.iter().position(|b| *b == 0).unwrap_or(raw.len());
            Ok(String::from_utf8_lossy(&raw[..end]).into_owned())
        }
    }
}
