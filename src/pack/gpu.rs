use blade_graphics as gpu;

use std::{mem, ptr, slice};

use crate::{grid::Grid, Error, PackedGrids, Packer, Plan, PointData, Result, TexelFormat};

/// Grid edge every blade backend supports (the WebGPU default limit).
/// blade has no texture size query, so this stands in for one.
pub const GPU_MAX_EDGE: u32 = 8192;

fn device_error(what: &str, cause: impl std::fmt::Debug) -> Error {
    Error::Device(format!("{}: {:?}", what, cause))
}

/// Open a headless context for packing.
pub fn create_context(validation: bool) -> Result<gpu::Context> {
    let context = unsafe {
        gpu::Context::init(gpu::ContextDesc {
            presentation: false,
            validation,
            timing: false,
            capture: false,
            overlay: false,
            device_id: 0,
        })
    };
    context.map_err(|e| device_error("context creation failed", e))
}

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Zeroable, bytemuck::Pod)]
struct Parameters {
    width: u32,
    height: u32,
    point_count: u32,
    color_channels: u32,
}

#[derive(blade_macros::ShaderData)]
struct SetPointsData {
    g_parameters: Parameters,
    g_positions: gpu::BufferPiece,
    g_colors: gpu::BufferPiece,
    g_position_map: gpu::TextureView,
    g_color_map: gpu::TextureView,
}

/// Position and color maps left on the device by [`GpuPacker::dispatch`].
pub struct DeviceGrids {
    pub positions: gpu::Texture,
    pub colors: gpu::Texture,
    pub plan: Plan,
}

impl DeviceGrids {
    pub fn deinit(self, context: &gpu::Context) {
        context.destroy_texture(self.positions);
        context.destroy_texture(self.colors);
    }
}

/// Owns the compiled set-points kernel. Created once, reused by every pack.
pub struct GpuPacker<'a> {
    context: &'a gpu::Context,
    pipeline: gpu::ComputePipeline,
    encoder: gpu::CommandEncoder,
}

impl<'a> GpuPacker<'a> {
    pub fn new(context: &'a gpu::Context) -> Self {
        let shader = context.create_shader(gpu::ShaderDesc {
            source: include_str!("set_points.wgsl"),
        });
        let layout = <SetPointsData as gpu::ShaderData>::layout();
        let pipeline = context.create_compute_pipeline(gpu::ComputePipelineDesc {
            name: "set-points",
            data_layouts: &[&layout],
            compute: shader.at("set_points"),
        });
        let encoder = context.create_command_encoder(gpu::CommandEncoderDesc {
            name: "set-points",
            buffer_count: 1,
        });
        Self {
            context,
            pipeline,
            encoder,
        }
    }

    fn create_map(&self, name: &str, plan: Plan) -> (gpu::Texture, gpu::TextureView) {
        let format = TexelFormat::Rgba32Float.to_gpu();
        let texture = self.context.create_texture(gpu::TextureDesc {
            name,
            format,
            size: gpu::Extent {
                width: plan.width,
                height: plan.height,
                depth: 1,
            },
            array_layer_count: 1,
            mip_level_count: 1,
            sample_count: 1,
            dimension: gpu::TextureDimension::D2,
            usage: gpu::TextureUsage::STORAGE | gpu::TextureUsage::COPY,
        });
        let view = self.context.create_texture_view(
            texture,
            gpu::TextureViewDesc {
                name,
                format,
                dimension: gpu::ViewDimension::D2,
                subresources: &Default::default(),
            },
        );
        (texture, view)
    }

    fn submit_and_wait(&mut self) -> Result<()> {
        let sync_point = self.context.submit(&mut self.encoder);
        if self.context.wait_for(&sync_point, !0) {
            Ok(())
        } else {
            Err(Error::Device("set-points dispatch never completed".to_string()))
        }
    }

    /// Run the kernel and keep the resulting maps on the device.
    /// Staging buffers are released before returning.
    pub fn dispatch(&mut self, points: &PointData, plan: Plan) -> Result<DeviceGrids> {
        let count = points.validate()?;
        plan.check(GPU_MAX_EDGE)?;
        let point_count = u32::try_from(count)
            .map_err(|_| Error::Device(format!("{} points exceed the dispatch range", count)))?;

        let position_bytes: &[u8] = bytemuck::cast_slice(points.positions);
        let color_bytes = points.colors.as_bytes();
        let positions_buf = self.context.create_buffer(gpu::BufferDesc {
            name: "point-positions",
            size: position_bytes.len() as u64,
            memory: gpu::Memory::Shared,
        });
        let colors_buf = self.context.create_buffer(gpu::BufferDesc {
            name: "point-colors",
            size: color_bytes.len() as u64,
            memory: gpu::Memory::Shared,
        });
        unsafe {
            ptr::copy_nonoverlapping(
                position_bytes.as_ptr(),
                positions_buf.data(),
                position_bytes.len(),
            );
            ptr::copy_nonoverlapping(color_bytes.as_ptr(), colors_buf.data(), color_bytes.len());
        }

        let (position_map, position_view) = self.create_map("position-map", plan);
        let (color_map, color_view) = self.create_map("color-map", plan);

        let wg_size = self.pipeline.get_workgroup_size();
        let groups = [
            plan.width.div_ceil(wg_size[0]),
            plan.height.div_ceil(wg_size[1]),
            1,
        ];
        log::info!(
            "Dispatching {:?} groups for {} points on {}x{}",
            groups,
            count,
            plan.width,
            plan.height
        );

        self.encoder.start();
        self.encoder.init_texture(position_map);
        self.encoder.init_texture(color_map);
        if let mut pass = self.encoder.compute("set-points") {
            let mut pc = pass.with(&self.pipeline);
            pc.bind(
                0,
                &SetPointsData {
                    g_parameters: Parameters {
                        width: plan.width,
                        height: plan.height,
                        point_count,
                        color_channels: points.colors.channels(),
                    },
                    g_positions: positions_buf.at(0),
                    g_colors: colors_buf.at(0),
                    g_position_map: position_view,
                    g_color_map: color_view,
                },
            );
            pc.dispatch(groups);
        }
        let result = self.submit_and_wait();

        self.context.destroy_texture_view(position_view);
        self.context.destroy_texture_view(color_view);
        self.context.destroy_buffer(positions_buf);
        self.context.destroy_buffer(colors_buf);

        let grids = DeviceGrids {
            positions: position_map,
            colors: color_map,
            plan,
        };
        match result {
            Ok(()) => Ok(grids),
            Err(e) => {
                grids.deinit(self.context);
                Err(e)
            }
        }
    }

    /// Copy device maps back into host grids.
    pub fn read_back(&mut self, grids: &DeviceGrids) -> Result<PackedGrids> {
        let plan = grids.plan;
        let texel_count = plan.texel_count();
        let map_size = (texel_count * mem::size_of::<[f32; 4]>()) as u64;
        let readback = self.context.create_buffer(gpu::BufferDesc {
            name: "point-maps-readback",
            size: 2 * map_size,
            memory: gpu::Memory::Shared,
        });
        let extent = gpu::Extent {
            width: plan.width,
            height: plan.height,
            depth: 1,
        };
        let bytes_per_row = plan.width * mem::size_of::<[f32; 4]>() as u32;

        self.encoder.start();
        if let mut pass = self.encoder.transfer("read-back") {
            pass.copy_texture_to_buffer(
                grids.positions.into(),
                readback.at(0),
                bytes_per_row,
                extent,
            );
            pass.copy_texture_to_buffer(
                grids.colors.into(),
                readback.at(map_size),
                bytes_per_row,
                extent,
            );
        }
        let result = self.submit_and_wait().map(|()| {
            let texels = unsafe {
                slice::from_raw_parts(readback.data() as *const [f32; 4], 2 * texel_count)
            };
            let (positions, colors) = texels.split_at(texel_count);
            PackedGrids {
                positions: Grid::from_texels(plan.width, plan.height, positions.to_vec()),
                colors: Grid::from_texels(plan.width, plan.height, colors.to_vec()),
            }
        });
        self.context.destroy_buffer(readback);
        result
    }
}

impl Packer for GpuPacker<'_> {
    fn max_edge(&self) -> u32 {
        GPU_MAX_EDGE
    }

    fn pack(&mut self, points: &PointData, plan: Plan) -> Result<PackedGrids> {
        let grids = self.dispatch(points, plan)?;
        let result = self.read_back(&grids);
        grids.deinit(self.context);
        result
    }
}

impl Drop for GpuPacker<'_> {
    fn drop(&mut self) {
        self.context.destroy_compute_pipeline(&mut self.pipeline);
        self.context.destroy_command_encoder(&mut self.encoder);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_errors_carry_their_cause() {
        let err = device_error("context creation failed", "NoAdapter");
        assert!(matches!(err, Error::Device(_)));
        assert_eq!(
            err.to_string(),
            "device error: context creation failed: \"NoAdapter\""
        );
    }
}
