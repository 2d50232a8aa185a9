use anyhow::Context;
use clap::Parser;
use lenscape::parallel::configure_pool;
use lenscape::physics::constants::{
    SOURCE_SIZE_RAW_DEFAULT, SOURCE_SIZE_RAW_MAX, WEIGHT_RAW_DEFAULT, WEIGHT_RAW_MAX,
};
use lenscape::physics::Lens;
use lenscape::rendering::Source;
use lenscape::simulation::loader::{load_convergence, load_source, save_rgb, screen_size};
use lenscape::simulation::{ControlEvent, Session};
use std::path::PathBuf;
use std::time::Instant;

/// Lens a background image through a convergence map and write the result.
#[derive(Parser, Debug)]
#[command(name = "lenscape", version)]
struct Args {
    /// convergence map (float images are physical units, others grey values)
    lens: PathBuf,

    /// background source image
    source: PathBuf,

    /// worker threads (default: all cores)
    #[arg(short, long)]
    threads: Option<usize>,

    /// 0 none, 1 convergence, 2 critical curves, 3 with radial curves, 4 convergence + curves
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(0..=4))]
    overlay: u8,

    /// lens weight control, weight = value / 20
    #[arg(long, default_value_t = WEIGHT_RAW_DEFAULT,
          value_parser = clap::value_parser!(u32).range(0..=WEIGHT_RAW_MAX as i64))]
    weight: u32,

    /// source size control, scale = value / 100
    #[arg(long, default_value_t = SOURCE_SIZE_RAW_DEFAULT,
          value_parser = clap::value_parser!(u32).range(0..=SOURCE_SIZE_RAW_MAX as i64))]
    source_size: u32,

    /// lens centre x (default: screen centre)
    #[arg(long, allow_hyphen_values = true)]
    lens_x: Option<i32>,

    /// lens centre y (default: screen centre)
    #[arg(long, allow_hyphen_values = true)]
    lens_y: Option<i32>,

    /// source centre x (default: screen centre)
    #[arg(long, allow_hyphen_values = true)]
    source_x: Option<i32>,

    /// source centre y (default: screen centre)
    #[arg(long, allow_hyphen_values = true)]
    source_y: Option<i32>,

    /// composited output image
    #[arg(short, long, default_value = "lensed.png")]
    output: PathBuf,

    /// also write the lensed image without overlays
    #[arg(long)]
    lensed_output: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let threads = configure_pool(args.threads).context("Failed to configure worker threads")?;
    log::info!("Using {} worker threads", threads);

    let inputs = load_convergence(&args.lens).and_then(|kappa| Ok((kappa, load_source(&args.source)?)));
    let (kappa, image) = match inputs {
        Ok(v) => v,
        Err(e) => {
            log::error!("Could not load input images: {}", e);
            return Err(e).context("Failed to load input images");
        }
    };

    let (width, height) = screen_size(&kappa, &image);
    let (cx, cy) = ((width / 2) as i32, (height / 2) as i32);
    log::info!("Screen: {}x{}", width, height);

    let start = Instant::now();
    let lens = Lens::new(
        kappa,
        args.lens_x.unwrap_or(cx),
        args.lens_y.unwrap_or(cy),
    )
    .context("Failed to build lens")?;
    log::info!("Lens ready in {:.2?}", start.elapsed());

    let source = Source::new(
        image,
        args.source_x.unwrap_or(cx),
        args.source_y.unwrap_or(cy),
    )
    .context("Failed to build source")?;

    let mut session = Session::new(lens, source, width, height);
    let mut events = vec![ControlEvent::SetOverlayMode(args.overlay)];
    if args.weight != WEIGHT_RAW_DEFAULT {
        events.push(ControlEvent::SetWeight(args.weight));
    }
    if args.source_size != SOURCE_SIZE_RAW_DEFAULT {
        events.push(ControlEvent::ResizeSource(args.source_size));
    }
    for event in events {
        session.handle(event).context("Invalid control value")?;
    }
    if !session.status_message().is_empty() {
        log::info!("{}", session.status_message());
    }

    save_rgb(session.composited(), &args.output).context("Failed to write output image")?;
    if let Some(path) = &args.lensed_output {
        save_rgb(session.lensed(), path).context("Failed to write lensed image")?;
    }

    Ok(())
}
