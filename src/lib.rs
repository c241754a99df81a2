#![allow(irrefutable_let_patterns)]

pub mod grid;
pub mod io;
pub mod pack;
pub mod plan;
mod point_cloud;

pub use grid::{Grid, Map, TexelFormat, Transfer};
pub use pack::{
    cpu::CpuPacker, gpu::GpuPacker, pack_points, Colors, PackedGrids, Packer, PointData,
};
pub use plan::{plan, FitPolicy, Plan};
pub use point_cloud::PointCloud;

/// Edge length of the square texel tile handled by one work-group.
pub const TILE_SIZE: u32 = 8;
/// Byte colors are divided by this to land in float space.
/// Note: 255 never reaches 1.0 with this divisor.
pub const DEFAULT_COLOR_DIVISOR: f32 = 256.0;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("length mismatch for {what}: expected {expected}, got {actual}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("device error: {0}")]
    Device(String),
    #[error("malformed PLY: {0}")]
    Ply(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
