use crate::Platform;

/// Per-vertex data shared by both model kinds.
///
/// All five arrays are addressed by vertex index and always have the same
/// length. The alternate arrays hold the spectral state and start out as
/// copies of the base arrays.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Geometry {
    pub positions: Vec<[f32; 3]>,
    pub alt_positions: Vec<[f32; 3]>,
    pub colors: Vec<u32>,
    pub alt_colors: Vec<u32>,
    pub uvs: Vec<[f32; 2]>,
}

impl Geometry {
    pub fn with_capacity(vertex_count: usize) -> Self {
        Self {
            positions: Vec::with_capacity(vertex_count),
            alt_positions: Vec::with_capacity(vertex_count),
            colors: Vec::with_capacity(vertex_count),
            alt_colors: Vec::with_capacity(vertex_count),
            uvs: Vec::with_capacity(vertex_count),
        }
    }

    /// Appends a vertex, replicating position and color into the alternate arrays.
    pub fn push_vertex(&mut self, position: [f32; 3], color: u32, uv: [f32; 2]) {
        self.positions.push(position);
        self.alt_positions.push(position);
        self.colors.push(color);
        self.alt_colors.push(color);
        self.uvs.push(uv);
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn is_consistent(&self) -> bool {
        let n = self.positions.len();
        self.alt_positions.len() == n
            && self.colors.len() == n
            && self.alt_colors.len() == n
            && self.uvs.len() == n
    }
}

/// Converts one packed 16-bit texture coordinate into the 0..1 range.
///
/// PlayStation builds store an 8-bit texel coordinate in the low byte. PC and
/// Dreamcast builds store the upper half of an IEEE-754 single.
pub fn decode_uv(raw: u16, platform: Platform) -> f32 {
    match platform {
        Platform::Pc | Platform::Dreamcast => f32::from_bits(u32::from(raw) << 16),
        Platform::Psx | Platform::Unresolved => f32::from(raw & 0x00FF) / 255.0,
    }
}

/// Maps a normalized coordinate back onto the 256-texel page grid.
pub fn uv_to_texel(value: f32) -> u8 {
    if value.is_nan() {
        return 0;
    }
    // Clamped into 0..=255 before the cast.
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}
