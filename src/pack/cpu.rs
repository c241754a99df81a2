use rayon::prelude::*;

use crate::{grid::Grid, PackedGrids, Packer, Plan, PointData, Result, TILE_SIZE};

/// Runs the dispatch on the rayon pool, one task per band of tiles.
pub struct CpuPacker {
    max_edge: u32,
}

impl CpuPacker {
    pub fn new(max_edge: u32) -> Self {
        Self { max_edge }
    }
}

impl Packer for CpuPacker {
    fn max_edge(&self) -> u32 {
        self.max_edge
    }

    fn pack(&mut self, points: &PointData, plan: Plan) -> Result<PackedGrids> {
        let count = points.validate()?;
        plan.check(self.max_edge)?;
        let width = plan.width as usize;
        let tile = TILE_SIZE as usize;
        let mut positions = Grid::new(plan.width, plan.height);
        let mut colors = Grid::new(plan.width, plan.height);

        positions
            .texels_mut()
            .par_chunks_mut(width * tile)
            .zip(colors.texels_mut().par_chunks_mut(width * tile))
            .enumerate()
            .for_each(|(band, (pos_band, col_band))| {
                let rows = pos_band.len() / width;
                for tile_x in (0..width).step_by(tile) {
                    for row in 0..rows {
                        let y = band * tile + row;
                        for x in tile_x..(tile_x + tile).min(width) {
                            let index = y * width + x;
                            if index < count {
                                let local = row * width + x;
                                pos_band[local] = points.position_texel(index);
                                col_band[local] = points.colors.texel(index);
                            }
                        }
                    }
                }
            });

        Ok(PackedGrids { positions, colors })
    }
}
