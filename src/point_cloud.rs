use crate::{
    grid::{Grid, Map, TexelFormat},
    io::{self, flat::DecodeParameters},
    pack_points, Colors, FitPolicy, Packer, PointData, Result,
};

fn upload<'a>(
    slot: &'a mut Option<Map>,
    name: &'static str,
    format: TexelFormat,
    src: &Grid,
) -> &'a Map {
    let map = slot.get_or_insert_with(|| Map::new(name, src.width(), src.height(), format));
    map.upload(src);
    map
}

/// A packed point cloud: one map of positions, one of colors.
///
/// Both maps are absent until the first pack and are overwritten by each
/// following one. `&mut self` keeps repacks of one cloud strictly sequential.
pub struct PointCloud {
    position_map: Option<Map>,
    color_map: Option<Map>,
    position_format: TexelFormat,
    color_format: TexelFormat,
}

impl Default for PointCloud {
    fn default() -> Self {
        Self::with_formats(TexelFormat::Rgba32Float, TexelFormat::Rgba32Float)
    }
}

impl PointCloud {
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps created by this cloud will use the given formats.
    pub fn with_formats(position_format: TexelFormat, color_format: TexelFormat) -> Self {
        Self {
            position_map: None,
            color_map: None,
            position_format,
            color_format,
        }
    }

    pub fn position_map(&self) -> Option<&Map> {
        self.position_map.as_ref()
    }

    pub fn color_map(&self) -> Option<&Map> {
        self.color_map.as_ref()
    }

    /// Texel count of the position map, including texels past the last point.
    pub fn point_count(&self) -> usize {
        self.position_map
            .as_ref()
            .map_or(0, |map| map.width() as usize * map.height() as usize)
    }

    /// Replace the positions: rgb holds xyz, alpha is free for an "alive" value.
    pub fn set_position_map(&mut self, src: &Grid) -> &Map {
        upload(&mut self.position_map, "PositionMap", self.position_format, src)
    }

    pub fn set_color_map(&mut self, src: &Grid) -> &Map {
        upload(&mut self.color_map, "ColorMap", self.color_format, src)
    }

    /// Plan, dispatch and upload. On error both maps keep their previous contents.
    pub fn set_points_fitted<P: Packer + ?Sized>(
        &mut self,
        packer: &mut P,
        points: &PointData,
        policy: FitPolicy,
    ) -> Result<(&Map, &Map)> {
        let (_, grids) = pack_points(packer, points, policy)?;
        let position_map = upload(
            &mut self.position_map,
            "PositionMap",
            self.position_format,
            &grids.positions,
        );
        let color_map = upload(
            &mut self.color_map,
            "ColorMap",
            self.color_format,
            &grids.colors,
        );
        Ok((position_map, color_map))
    }

    /// Set positions and colors, truncating points that do not fill a row.
    pub fn set_points<P: Packer + ?Sized>(
        &mut self,
        packer: &mut P,
        positions: &[glam::Vec3],
        colors: Colors,
    ) -> Result<(&Map, &Map)> {
        let points = PointData { positions, colors };
        self.set_points_fitted(packer, &points, FitPolicy::Truncate)
    }

    /// Set points from flat `x, y, z` floats and `r, g, b` bytes.
    pub fn set_points_flat<P: Packer + ?Sized>(
        &mut self,
        packer: &mut P,
        positions: &[f32],
        colors: &[u8],
        params: &DecodeParameters,
    ) -> Result<(&Map, &Map)> {
        let model = io::flat::decode(positions, colors, params)?;
        self.set_points_fitted(packer, &model.points(), FitPolicy::Truncate)
    }

    /// Set points from a raw frame of positions followed by colors.
    /// The grid always holds exactly `point_count` texels unless clamped.
    pub fn set_points_frame<P: Packer + ?Sized>(
        &mut self,
        packer: &mut P,
        frame: &[u8],
        point_count: usize,
    ) -> Result<(&Map, &Map)> {
        let model = io::frame::decode(frame, point_count)?;
        self.set_points_fitted(packer, &model.points(), FitPolicy::ExactFit)
    }
}
