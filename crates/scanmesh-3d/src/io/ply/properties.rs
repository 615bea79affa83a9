use super::PlyError;

/// The vertex layouts the reader knows about.
#[derive(Debug, PartialEq, Clone)]
pub enum PlyType {
    /// Single precision position, 8-bit color and single precision normal.
    XYZRgbNormals,
    /// Any other layout, decoded property by property.
    Dynamic(Vec<PlyPropertyDefinition>),
}

/// A scalar property declared in the PLY header.
#[derive(Debug, PartialEq, Clone)]
pub struct PlyPropertyDefinition {
    /// Name of the property, e.g. `x` or `red`.
    pub name: String,
    /// Storage type of the property.
    pub data_type: PlyDataType,
}

/// Scalar storage types of PLY properties.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum PlyDataType {
    /// `float` / `float32`
    Float32,
    /// `double` / `float64`
    Float64,
    /// `char` / `int8`
    Int8,
    /// `uchar` / `uint8`
    UInt8,
    /// `short` / `int16`
    Int16,
    /// `ushort` / `uint16`
    UInt16,
    /// `int` / `int32`
    Int32,
    /// `uint` / `uint32`
    UInt32,
}

impl PlyDataType {
    /// Size in bytes of one value.
    pub fn size(&self) -> usize {
        match self {
            PlyDataType::Float32 | PlyDataType::Int32 | PlyDataType::UInt32 => 4,
            PlyDataType::Float64 => 8,
            PlyDataType::Int16 | PlyDataType::UInt16 => 2,
            PlyDataType::Int8 | PlyDataType::UInt8 => 1,
        }
    }

    /// The type name used when writing headers.
    pub fn name(&self) -> &'static str {
        match self {
            PlyDataType::Float32 => "float",
            PlyDataType::Float64 => "double",
            PlyDataType::Int8 => "char",
            PlyDataType::UInt8 => "uchar",
            PlyDataType::Int16 => "short",
            PlyDataType::UInt16 => "ushort",
            PlyDataType::Int32 => "int",
            PlyDataType::UInt32 => "uint",
        }
    }
}

/// Access to the point attributes of a decoded vertex.
pub trait PlyPropertyTrait {
    /// The position of the vertex.
    fn to_point(&self) -> [f64; 3];
    /// The color of the vertex, black when absent.
    fn to_color(&self) -> [u8; 3];
    /// The normal of the vertex, zero when absent.
    fn to_normal(&self) -> [f64; 3];
}

/// Vertex record of the `XYZRgbNormals` layout.
#[repr(C, packed)]
#[derive(Debug, bincode::Decode)]
pub struct XYZRgbNormalsProperty {
    /// x coordinate
    pub x: f32,
    /// y coordinate
    pub y: f32,
    /// z coordinate
    pub z: f32,
    /// red channel
    pub red: u8,
    /// green channel
    pub green: u8,
    /// blue channel
    pub blue: u8,
    /// x component of the normal
    pub nx: f32,
    /// y component of the normal
    pub ny: f32,
    /// z component of the normal
    pub nz: f32,
}

const XYZ_RGB_NORMALS: [(&str, PlyDataType); 9] = [
    ("x", PlyDataType::Float32),
    ("y", PlyDataType::Float32),
    ("z", PlyDataType::Float32),
    ("red", PlyDataType::UInt8),
    ("green", PlyDataType::UInt8),
    ("blue", PlyDataType::UInt8),
    ("nx", PlyDataType::Float32),
    ("ny", PlyDataType::Float32),
    ("nz", PlyDataType::Float32),
];

impl PlyPropertyTrait for XYZRgbNormalsProperty {
    fn to_point(&self) -> [f64; 3] {
        [self.x as f64, self.y as f64, self.z as f64]
    }

    fn to_color(&self) -> [u8; 3] {
        [self.red, self.green, self.blue]
    }

    fn to_normal(&self) -> [f64; 3] {
        [self.nx as f64, self.ny as f64, self.nz as f64]
    }
}

/// Dynamic PLY property that can handle arbitrary schemas
#[derive(Debug)]
pub struct DynamicProperty {
    /// The decoded values, in header order.
    pub properties: Vec<(String, DynamicPropertyValue)>,
}

/// A single decoded scalar.
#[derive(Debug, Clone, Copy)]
#[allow(missing_docs)]
pub enum DynamicPropertyValue {
    Float32(f32),
    Float64(f64),
    Int8(i8),
    UInt8(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
}

fn le_bytes<const N: usize>(buffer: &[u8], offset: usize) -> Result<[u8; N], PlyError> {
    buffer
        .get(offset..offset + N)
        .and_then(|slice| slice.try_into().ok())
        .ok_or(PlyError::TruncatedRecord)
}

impl DynamicProperty {
    fn parse_from_buffer(buffer: &[u8], schema: &[PlyPropertyDefinition]) -> Result<Self, PlyError> {
        let mut properties = Vec::with_capacity(schema.len());
        let mut offset = 0;

        for prop_def in schema {
            let value = match prop_def.data_type {
                PlyDataType::Float32 => {
                    DynamicPropertyValue::Float32(f32::from_le_bytes(le_bytes(buffer, offset)?))
                }
                PlyDataType::Float64 => {
                    DynamicPropertyValue::Float64(f64::from_le_bytes(le_bytes(buffer, offset)?))
                }
                PlyDataType::Int8 => {
                    DynamicPropertyValue::Int8(i8::from_le_bytes(le_bytes(buffer, offset)?))
                }
                PlyDataType::UInt8 => {
                    DynamicPropertyValue::UInt8(u8::from_le_bytes(le_bytes(buffer, offset)?))
                }
                PlyDataType::Int16 => {
                    DynamicPropertyValue::Int16(i16::from_le_bytes(le_bytes(buffer, offset)?))
                }
                PlyDataType::UInt16 => {
                    DynamicPropertyValue::UInt16(u16::from_le_bytes(le_bytes(buffer, offset)?))
                }
                PlyDataType::Int32 => {
                    DynamicPropertyValue::Int32(i32::from_le_bytes(le_bytes(buffer, offset)?))
                }
                PlyDataType::UInt32 => {
                    DynamicPropertyValue::UInt32(u32::from_le_bytes(le_bytes(buffer, offset)?))
                }
            };

            properties.push((prop_def.name.clone(), value));
            offset += prop_def.data_type.size();
        }

        Ok(DynamicProperty { properties })
    }

    fn get_float(&self, name: &str) -> f64 {
        self.properties
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| match v {
                DynamicPropertyValue::Float32(v) => *v as f64,
                DynamicPropertyValue::Float64(v) => *v,
                DynamicPropertyValue::Int8(v) => *v as f64,
                DynamicPropertyValue::UInt8(v) => *v as f64,
                DynamicPropertyValue::Int16(v) => *v as f64,
                DynamicPropertyValue::UInt16(v) => *v as f64,
                DynamicPropertyValue::Int32(v) => *v as f64,
                DynamicPropertyValue::UInt32(v) => *v as f64,
            })
            .unwrap_or(0.0)
    }

    fn get_u8(&self, name: &str) -> u8 {
        self.properties
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| match v {
                DynamicPropertyValue::UInt8(v) => *v,
                DynamicPropertyValue::Int8(v) => *v as u8,
                DynamicPropertyValue::Float32(v) => (*v * 255.0) as u8,
                DynamicPropertyValue::Float64(v) => (*v * 255.0) as u8,
                _ => 0,
            })
            .unwrap_or(0)
    }
}

impl PlyPropertyTrait for DynamicProperty {
    fn to_point(&self) -> [f64; 3] {
        [self.get_float("x"), self.get_float("y"), self.get_float("z")]
    }

    fn to_color(&self) -> [u8; 3] {
        [self.get_u8("red"), self.get_u8("green"), self.get_u8("blue")]
    }

    fn to_normal(&self) -> [f64; 3] {
        [self.get_float("nx"), self.get_float("ny"), self.get_float("nz")]
    }
}

/// A decoded vertex record.
pub enum PlyProperty {
    /// Record of the `XYZRgbNormals` layout.
    XYZRgbNormals(XYZRgbNormalsProperty),
    /// Record of any other layout.
    Dynamic(DynamicProperty),
}

impl PlyType {
    /// Decode one vertex record.
    pub fn deserialize(&self, buffer: &[u8]) -> Result<PlyProperty, PlyError> {
        match self {
            PlyType::XYZRgbNormals => {
                let config = bincode::config::standard()
                    .with_little_endian()
                    .with_fixed_int_encoding();
                let (property, _): (XYZRgbNormalsProperty, usize) =
                    bincode::decode_from_slice(buffer, config)?;
                Ok(PlyProperty::XYZRgbNormals(property))
            }
            PlyType::Dynamic(ref schema) => {
                let dynamic_property = DynamicProperty::parse_from_buffer(buffer, schema)?;
                Ok(PlyProperty::Dynamic(dynamic_property))
            }
        }
    }

    /// Size in bytes of one vertex record.
    pub fn size_of(&self) -> usize {
        match self {
            PlyType::XYZRgbNormals => std::mem::size_of::<XYZRgbNormalsProperty>(),
            PlyType::Dynamic(ref props) => props.iter().map(|p| p.data_type.size()).sum(),
        }
    }

    /// Pick the fastest decoder for the declared vertex properties.
    pub fn detect_format(properties: &[PlyPropertyDefinition]) -> Result<Self, PlyError> {
        if properties.is_empty() {
            return Err(PlyError::UnsupportedProperty);
        }

        if properties.len() == XYZ_RGB_NORMALS.len()
            && properties
                .iter()
                .zip(XYZ_RGB_NORMALS.iter())
                .all(|(p, (name, data_type))| p.name == *name && p.data_type == *data_type)
        {
            return Ok(PlyType::XYZRgbNormals);
        }

        Ok(PlyType::Dynamic(properties.to_vec()))
    }

    /// Whether records of this layout carry a color.
    pub fn has_colors(&self) -> bool {
        self.has_property("red")
    }

    /// Whether records of this layout carry a normal.
    pub fn has_normals(&self) -> bool {
        self.has_property("nx")
    }

    fn has_property(&self, name: &str) -> bool {
        match self {
            PlyType::XYZRgbNormals => true,
            PlyType::Dynamic(props) => props.iter().any(|p| p.name == name),
        }
    }
}

impl PlyPropertyTrait for PlyProperty {
    fn to_point(&self) -> [f64; 3] {
        match self {
            PlyProperty::XYZRgbNormals(property) => property.to_point(),
            PlyProperty::Dynamic(property) => property.to_point(),
        }
    }

    fn to_color(&self) -> [u8; 3] {
        match self {
            PlyProperty::XYZRgbNormals(property) => property.to_color(),
            PlyProperty::Dynamic(property) => property.to_color(),
        }
    }

    fn to_normal(&self) -> [f64; 3] {
        match self {
            PlyProperty::XYZRgbNormals(property) => property.to_normal(),
            PlyProperty::Dynamic(property) => property.to_normal(),
        }
    }
}
