use std::io::{BufRead, Read};
use std::path::Path;

use super::{
    properties::{PlyDataType, PlyPropertyDefinition, PlyType},
    PlyError, PlyPropertyTrait,
};
use crate::pointcloud::PointCloud;

struct PlyHeader {
    pub vertex_count: usize,
    pub properties: Vec<PlyPropertyDefinition>,
    pub format: PlyType,
}

fn parse_header<R: BufRead>(reader: &mut R) -> Result<PlyHeader, PlyError> {
    let mut line = String::new();
    let mut vertex_count = None;
    let mut is_binary_little_endian = false;
    let mut is_ply = false;
    let mut in_vertex_element = false;
    let mut element_seen = false;
    let mut properties = Vec::new();

    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            break;
        }
        let trimmed = line.trim();

        if trimmed == "ply" {
            is_ply = true;
            continue;
        }

        if trimmed == "end_header" {
            break;
        }

        if trimmed.starts_with("format") {
            is_binary_little_endian = trimmed.starts_with("format binary_little_endian");
        } else if trimmed.starts_with("element") {
            let parts: Vec<&str> = trimmed.split_whitespace().collect();
            in_vertex_element = parts.get(1) == Some(&"vertex");
            if in_vertex_element {
                // vertex data is read right after the header
                if element_seen {
                    return Err(PlyError::UnsupportedHeader(format!(
                        "vertex must be the first element: {trimmed}"
                    )));
                }
                vertex_count = parts.get(2).and_then(|s| s.parse().ok());
            }
            element_seen = true;
        } else if trimmed.starts_with("property") && in_vertex_element {
            let parts: Vec<&str> = trimmed.split_whitespace().collect();
            if parts.get(1) == Some(&"list") {
                return Err(PlyError::UnsupportedProperty);
            }
            if parts.len() >= 3 {
                let data_type = parse_data_type(parts[1])?;
                let name = parts[2].to_string();
                properties.push(PlyPropertyDefinition { name, data_type });
            }
        }
    }

    if !is_ply || !is_binary_little_endian {
        return Err(PlyError::UnsupportedHeader(
            "expected a binary_little_endian PLY file".to_string(),
        ));
    }

    let vertex_count = vertex_count.ok_or(PlyError::UnsupportedProperty)?;
    let format = PlyType::detect_format(&properties)?;

    Ok(PlyHeader {
        vertex_count,
        properties,
        format,
    })
}

fn parse_data_type(type_str: &str) -> Result<PlyDataType, PlyError> {
    match type_str {
        "float" | "float32" => Ok(PlyDataType::Float32),
        "double" | "float64" => Ok(PlyDataType::Float64),
        "char" | "int8" => Ok(PlyDataType::Int8),
        "uchar" | "uint8" => Ok(PlyDataType::UInt8),
        "short" | "int16" => Ok(PlyDataType::Int16),
        "ushort" | "uint16" => Ok(PlyDataType::UInt16),
        "int" | "int32" => Ok(PlyDataType::Int32),
        "uint" | "uint32" => Ok(PlyDataType::UInt32),
        _ => Err(PlyError::UnsupportedProperty),
    }
}

fn read_vertices<R: Read>(
    reader: &mut R,
    vertex_count: usize,
    format: &PlyType,
) -> Result<PointCloud, PlyError> {
    let mut buffer = vec![0u8; format.size_of()];

    let mut points = Vec::with_capacity(vertex_count);
    let mut colors = format
        .has_colors()
        .then(|| Vec::with_capacity(vertex_count));
    let mut normals = format
        .has_normals()
        .then(|| Vec::with_capacity(vertex_count));

    for _ in 0..vertex_count {
        reader.read_exact(&mut buffer)?;
        let property_entry = format.deserialize(&buffer)?;
        points.push(property_entry.to_point());
        if let Some(colors) = colors.as_mut() {
            colors.push(property_entry.to_color());
        }
        if let Some(normals) = normals.as_mut() {
            normals.push(property_entry.to_normal());
        }
    }

    Ok(PointCloud::new(points, colors, normals))
}

/// Read a PLY file in binary format with automatic format detection.
///
/// Only the `vertex` element is decoded. Colors and normals are present in
/// the returned cloud when the header declares them.
pub fn read_ply_binary(path: impl AsRef<Path>) -> Result<PointCloud, PlyError> {
    let file = std::fs::File::open(path)?;
    let mut reader = std::io::BufReader::new(file);
    let header = parse_header(&mut reader)?;
    log::debug!(
        "PLY header: {} vertices, {} properties",
        header.vertex_count,
        header.properties.len()
    );
    read_vertices(&mut reader, header.vertex_count, &header.format)
}

/// Read a PLY file in binary format with explicit format specification.
pub fn read_ply_binary_with_format(
    path: impl AsRef<Path>,
    property: PlyType,
) -> Result<PointCloud, PlyError> {
    let file = std::fs::File::open(path)?;
    let mut reader = std::io::BufReader::new(file);
    let header = parse_header(&mut reader)?;
    read_vertices(&mut reader, header.vertex_count, &property)
}
