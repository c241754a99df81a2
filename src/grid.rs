//! Host-side texel grids and the destination maps they are uploaded into.

use blade_graphics as gpu;
use half::f16;

/// Row-major RGBA32F texels, as written by a packer.
#[derive(Clone, Debug, PartialEq)]
pub struct Grid {
    width: u32,
    height: u32,
    texels: Vec<[f32; 4]>,
}

impl Grid {
    pub const FORMAT: TexelFormat = TexelFormat::Rgba32Float;

    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            texels: vec![[0.0; 4]; width as usize * height as usize],
        }
    }

    pub(crate) fn from_texels(width: u32, height: u32, texels: Vec<[f32; 4]>) -> Self {
        debug_assert_eq!(texels.len(), width as usize * height as usize);
        Self {
            width,
            height,
            texels,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn texel(&self, x: u32, y: u32) -> [f32; 4] {
        self.texels[(y * self.width + x) as usize]
    }

    pub fn texels(&self) -> &[[f32; 4]] {
        &self.texels
    }

    pub(crate) fn texels_mut(&mut self) -> &mut [[f32; 4]] {
        &mut self.texels
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.texels)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TexelFormat {
    Rgba32Float,
    Rgba16Float,
    Rgba8Unorm,
}

impl TexelFormat {
    pub fn block_size(self) -> usize {
        match self {
            Self::Rgba32Float => 16,
            Self::Rgba16Float => 8,
            Self::Rgba8Unorm => 4,
        }
    }

    pub fn to_gpu(self) -> gpu::TextureFormat {
        match self {
            Self::Rgba32Float => gpu::TextureFormat::Rgba32Float,
            Self::Rgba16Float => gpu::TextureFormat::Rgba16Float,
            Self::Rgba8Unorm => gpu::TextureFormat::Rgba8Unorm,
        }
    }

    fn encode(self, texel: [f32; 4], out: &mut [u8]) {
        match self {
            Self::Rgba32Float => out.copy_from_slice(bytemuck::bytes_of(&texel)),
            Self::Rgba16Float => {
                for (chunk, &v) in out.chunks_exact_mut(2).zip(&texel) {
                    chunk.copy_from_slice(&f16::from_f32(v).to_le_bytes());
                }
            }
            Self::Rgba8Unorm => {
                for (byte, &v) in out.iter_mut().zip(&texel) {
                    *byte = (v.clamp(0.0, 1.0) * 255.0).round() as u8;
                }
            }
        }
    }

    fn decode(self, bytes: &[u8]) -> [f32; 4] {
        let mut texel = [0.0; 4];
        match self {
            Self::Rgba32Float => texel = bytemuck::pod_read_unaligned(bytes),
            Self::Rgba16Float => {
                for (v, chunk) in texel.iter_mut().zip(bytes.chunks_exact(2)) {
                    *v = f16::from_le_bytes([chunk[0], chunk[1]]).to_f32();
                }
            }
            Self::Rgba8Unorm => {
                for (v, &byte) in texel.iter_mut().zip(bytes) {
                    *v = byte as f32 / 255.0;
                }
            }
        }
        texel
    }
}

/// How texels travel from a packed grid into a destination map.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transfer {
    /// Formats match, bytes are copied as-is.
    Copy,
    /// Formats differ. Texels go through full precision and the image is
    /// flipped vertically: destination row 0 is the source's last row.
    ConvertFlipped,
}

impl Transfer {
    pub fn select(src: TexelFormat, dst: TexelFormat) -> Self {
        if src == dst {
            Self::Copy
        } else {
            Self::ConvertFlipped
        }
    }
}

/// A destination texture owned by a point cloud.
#[derive(Clone, Debug)]
pub struct Map {
    name: &'static str,
    width: u32,
    height: u32,
    format: TexelFormat,
    data: Vec<u8>,
}

impl Map {
    pub fn new(name: &'static str, width: u32, height: u32, format: TexelFormat) -> Self {
        Self {
            name,
            width,
            height,
            format,
            data: vec![0; width as usize * height as usize * format.block_size()],
        }
    }

    pub fn name(&self) -> &str {
        self.name
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> TexelFormat {
        self.format
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn texel(&self, x: u32, y: u32) -> [f32; 4] {
        let bs = self.format.block_size();
        let offset = (y * self.width + x) as usize * bs;
        self.format.decode(&self.data[offset..offset + bs])
    }

    fn resize(&mut self, width: u32, height: u32) {
        log::debug!(
            "Resizing {} from {}x{} to {}x{}",
            self.name,
            self.width,
            self.height,
            width,
            height
        );
        self.width = width;
        self.height = height;
        self.data
            .resize(width as usize * height as usize * self.format.block_size(), 0);
    }

    /// Copy a packed grid into this map, resizing and converting as needed.
    pub fn upload(&mut self, src: &Grid) -> Transfer {
        if self.width != src.width() || self.height != src.height() {
            self.resize(src.width(), src.height());
        }

        let transfer = Transfer::select(Grid::FORMAT, self.format);
        log::debug!("Uploading into {} with {:?}", self.name, transfer);
        match transfer {
            Transfer::Copy => self.data.copy_from_slice(src.as_bytes()),
            Transfer::ConvertFlipped => {
                let bs = self.format.block_size();
                let row_texels = src.width() as usize;
                let src_rows = src.texels().chunks_exact(row_texels).rev();
                let dst_rows = self.data.chunks_exact_mut(row_texels * bs);
                for (dst_row, src_row) in dst_rows.zip(src_rows) {
                    for (out, &texel) in dst_row.chunks_exact_mut(bs).zip(src_row) {
                        self.format.encode(texel, out);
                    }
                }
            }
        }
        transfer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(width: u32, height: u32) -> Grid {
        let texels = (0..width * height)
            .map(|i| [i as f32 / 8.0, 0.25, 0.5, 1.0])
            .collect();
        Grid::from_texels(width, height, texels)
    }

    #[test]
    fn transfer_is_selected_by_format_equality() {
        use TexelFormat as Tf;
        assert_eq!(Transfer::select(Tf::Rgba32Float, Tf::Rgba32Float), Transfer::Copy);
        assert_eq!(
            Transfer::select(Tf::Rgba32Float, Tf::Rgba16Float),
            Transfer::ConvertFlipped
        );
        assert_eq!(
            Transfer::select(Tf::Rgba32Float, Tf::Rgba8Unorm),
            Transfer::ConvertFlipped
        );
    }

    #[test]
    fn same_format_copy_keeps_orientation() {
        let src = ramp(3, 2);
        let mut map = Map::new("test", 3, 2, TexelFormat::Rgba32Float);
        assert_eq!(map.upload(&src), Transfer::Copy);
        for y in 0..2 {
            for x in 0..3 {
                assert_eq!(map.texel(x, y), src.texel(x, y));
            }
        }
    }

    #[test]
    fn conversion_flips_rows() {
        let src = ramp(3, 2);
        let mut map = Map::new("test", 3, 2, TexelFormat::Rgba16Float);
        assert_eq!(map.upload(&src), Transfer::ConvertFlipped);
        for x in 0..3 {
            assert_eq!(map.texel(x, 0), src.texel(x, 1));
            assert_eq!(map.texel(x, 1), src.texel(x, 0));
        }
    }

    #[test]
    fn unorm_conversion_quantizes_and_clamps() {
        let src = Grid::from_texels(1, 1, vec![[0.5, 2.0, -1.0, 1.0]]);
        let mut map = Map::new("test", 1, 1, TexelFormat::Rgba8Unorm);
        map.upload(&src);
        assert_eq!(map.data(), &[128, 255, 0, 255]);
    }

    #[test]
    fn upload_resizes_to_the_source_extent() {
        let mut map = Map::new("test", 1, 1, TexelFormat::Rgba32Float);
        map.upload(&ramp(4, 3));
        assert_eq!((map.width(), map.height()), (4, 3));
        assert_eq!(map.data().len(), 4 * 3 * 16);
        assert_eq!(map.texel(3, 2)[0], 11.0 / 8.0);
    }
}
