use blade_pointmap as pm;

#[derive(argh::FromArgs)]
/// Pack a PLY point cloud into position and color maps.
struct Args {
    /// path to a binary little-endian .ply file
    #[argh(positional)]
    path: String,
    /// use the CPU packer instead of the GPU
    #[argh(switch)]
    cpu: bool,
    /// pack with the exact-fit policy instead of truncating
    #[argh(switch)]
    exact: bool,
}

fn report(cloud: &pm::PointCloud) {
    let (Some(positions), Some(colors)) = (cloud.position_map(), cloud.color_map()) else {
        return;
    };
    println!(
        "{}: {}x{} ({} texels)",
        positions.name(),
        positions.width(),
        positions.height(),
        cloud.point_count()
    );
    for x in 0..positions.width().min(4) {
        println!(
            "  texel ({}, 0): position {:?} color {:?}",
            x,
            positions.texel(x, 0),
            colors.texel(x, 0)
        );
    }
}

fn main() {
    env_logger::init();
    let args: Args = argh::from_env();

    let model = match pm::io::load(&args.path) {
        Ok(model) => model,
        Err(e) => {
            eprintln!("Failed to load {}: {}", args.path, e);
            std::process::exit(1);
        }
    };
    let policy = if args.exact {
        pm::FitPolicy::ExactFit
    } else {
        pm::FitPolicy::Truncate
    };

    let mut cloud = pm::PointCloud::new();
    let result = if args.cpu {
        let mut packer = pm::CpuPacker::new(pm::pack::gpu::GPU_MAX_EDGE);
        cloud
            .set_points_fitted(&mut packer, &model.points(), policy)
            .map(|_| ())
    } else {
        let context = match pm::pack::gpu::create_context(cfg!(debug_assertions)) {
            Ok(context) => context,
            Err(e) => {
                eprintln!("{}", e);
                std::process::exit(1);
            }
        };
        println!("{:?}", context.device_information());
        let mut packer = pm::GpuPacker::new(&context);
        cloud
            .set_points_fitted(&mut packer, &model.points(), policy)
            .map(|_| ())
    };

    match result {
        Ok(()) => report(&cloud),
        Err(e) => {
            eprintln!("Packing failed: {}", e);
            std::process::exit(1);
        }
    }
}
