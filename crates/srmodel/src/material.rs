pub const TEXTURE_ID_MASK: u32 = 0x0FFF;
pub const DEFAULT_COLOR: u32 = 0xFFFF_FFFF;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Material {
    pub texture_id: u16,
    pub color: u32,
    pub visible: bool,
    pub texture_used: bool,
}

impl Material {
    pub fn new(raw_texture_id: u32, color: u32, visible: bool) -> Self {
        // Masked to 12 bits, always fits.
        let texture_id = (raw_texture_id & TEXTURE_ID_MASK) as u16;
        Self {
            texture_id,
            color,
            visible,
            texture_used: texture_id > 0 && visible,
        }
    }

    fn same_key(&self, other: &Material) -> bool {
        self.color == other.color
            && self.texture_id == other.texture_id
            && self.texture_used == other.texture_used
    }
}

/// Model-local material table. Materials that agree on color, texture id and
/// texture usage share one slot.
#[derive(Clone, Debug, Default)]
pub struct MaterialList {
    materials: Vec<Material>,
}

impl MaterialList {
    /// Starts with the untextured white material in slot 0.
    pub fn with_default() -> Self {
        Self {
            materials: vec![Material::new(0, DEFAULT_COLOR, true)],
        }
    }

    pub fn intern(&mut self, material: Material) -> usize {
        if let Some(idx) = self.materials.iter().position(|m| m.same_key(&material)) {
            return idx;
        }
        self.materials.push(material);
        self.materials.len() - 1
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    pub fn into_vec(self) -> Vec<Material> {
        self.materials
    }
}
