use std::{fs, io, mem};

use super::{ColorBuffer, Model};
use crate::{Error, Result};

#[derive(Default)]
struct Offsets {
    position: [Option<usize>; 3],
    color: [Option<usize>; 4],
}

fn type_size(ty: &str) -> Option<usize> {
    Some(match ty {
        "char" | "uchar" | "int8" | "uint8" => 1,
        "short" | "ushort" | "int16" | "uint16" => 2,
        "int" | "uint" | "float" | "int32" | "uint32" | "float32" => 4,
        "double" | "float64" => 8,
        _ => return None,
    })
}

/// Upper bound on what a header alone can make us reserve.
const MAX_RESERVED_VERTICES: usize = 1 << 20;

fn read_f32(data: &[u8], offset: usize) -> f32 {
    let bits: u32 = bytemuck::pod_read_unaligned(&data[offset..offset + mem::size_of::<f32>()]);
    f32::from_bits(u32::from_le(bits))
}

pub fn load(file_path: &str) -> Result<Model> {
    let file = io::BufReader::new(fs::File::open(file_path)?);
    read(file)
}

/// Read the vertex element of a `binary_little_endian` PLY stream.
/// Positions must be `float`, colors `uchar`. Elements after the
/// vertices are left unread.
pub fn read(mut reader: impl io::BufRead) -> Result<Model> {
    use std::io::{BufRead as _, Read as _};

    let mut count = None;
    let mut in_vertex = false;
    let mut stride = 0;
    let mut offsets = Offsets::default();

    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            return Err(Error::Ply("missing end_header".to_string()));
        }
        let mut words = line.split_whitespace();
        match words.next() {
            Some("ply") | Some("comment") | Some("obj_info") | None => {}
            Some("format") => {
                let format = words.next();
                if format != Some("binary_little_endian") {
                    return Err(Error::Ply(format!("unsupported format {:?}", format)));
                }
            }
            Some("element") => {
                let name = words.next();
                in_vertex = name == Some("vertex");
                if in_vertex {
                    let n = words.next().and_then(|w| w.parse::<usize>().ok());
                    count = Some(n.ok_or_else(|| Error::Ply("bad vertex count".to_string()))?);
                } else if count.is_none() {
                    return Err(Error::Ply(format!("element {:?} before vertices", name)));
                }
            }
            Some("property") if in_vertex => {
                let ty = words.next().unwrap_or_default();
                let name = words.next().unwrap_or_default();
                let size = type_size(ty)
                    .ok_or_else(|| Error::Ply(format!("unsupported vertex property type {}", ty)))?;
                let slot = match name {
                    "x" | "y" | "z" => {
                        if ty != "float" && ty != "float32" {
                            return Err(Error::Ply(format!("{} must be float, got {}", name, ty)));
                        }
                        &mut offsets.position[(name.as_bytes()[0] - b'x') as usize]
                    }
                    "red" | "green" | "blue" | "alpha" if size == 1 => {
                        let channel = ["red", "green", "blue", "alpha"]
                            .iter()
                            .position(|&c| c == name)
                            .unwrap_or_default();
                        &mut offsets.color[channel]
                    }
                    other => {
                        log::info!("Skipping property: {}", other);
                        stride += size;
                        continue;
                    }
                };
                *slot = Some(stride);
                stride += size;
            }
            Some("property") => {}
            Some("end_header") => break,
            Some(other) => return Err(Error::Ply(format!("unexpected section {}", other))),
        }
    }

    let count = count.ok_or_else(|| Error::Ply("no vertex element".to_string()))?;
    let [Some(ox), Some(oy), Some(oz)] = offsets.position else {
        return Err(Error::Ply("vertex lacks x/y/z".to_string()));
    };
    let has_color = offsets.color[..3].iter().all(Option::is_some);
    let has_alpha = has_color && offsets.color[3].is_some();

    log::info!("Reading {} vertices with stride {} from PLY", count, stride);
    let mut scratch = vec![0u8; stride];
    let reserved = count.min(MAX_RESERVED_VERTICES);
    let mut positions = Vec::with_capacity(reserved);
    let mut colors = Vec::with_capacity(reserved);
    for _ in 0..count {
        reader.read_exact(&mut scratch)?;
        positions.push(glam::Vec3::new(
            read_f32(&scratch, ox),
            read_f32(&scratch, oy),
            read_f32(&scratch, oz),
        ));
        let mut color = glam::Vec4::ONE;
        if has_color {
            for (c, offset) in color.as_mut().iter_mut().zip(&offsets.color) {
                if let Some(offset) = *offset {
                    *c = scratch[offset] as f32 / 255.0;
                }
            }
        }
        colors.push(color);
    }

    let colors = if has_alpha {
        ColorBuffer::Rgba(colors)
    } else {
        ColorBuffer::Rgb(colors.into_iter().map(|c| c.truncate()).collect())
    };
    Ok(Model { positions, colors })
}
