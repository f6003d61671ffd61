//! Ember headless runner
//!
//! Renders the demo scene offscreen for a number of frames, logs frame
//! statistics and writes the final frame as PNG.

mod demo;
mod output;

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Parser;
use ember_renderer::{
    CameraView, FrameStatsCollector, Ray, RenderContext, RenderSystem, RendererConfig, VisibilityCuller,
};

use output::{OUTPUT_FORMAT, OffscreenTarget};

const DEFAULT_CONFIG: &str = "config/renderer.ron";

/// Renders the demo scene offscreen and writes the final frame as PNG.
#[derive(Debug, Parser)]
#[command(name = "ember-headless", version)]
struct Options {
    /// Renderer configuration file (RON)
    #[arg(long, default_value = DEFAULT_CONFIG)]
    config: PathBuf,

    /// Number of frames to render
    #[arg(long, default_value_t = 120)]
    frames: u32,

    /// PNG file receiving the final frame
    #[arg(long, default_value = "frame.png")]
    output: PathBuf,

    /// Do not write the final frame
    #[arg(long, conflicts_with = "output")]
    no_output: bool,

    /// Rasterize geometry as lines when the device supports it
    #[arg(long)]
    wireframe: bool,

    /// Disable SSAO regardless of the configured settings
    #[arg(long)]
    no_ssao: bool,

    /// Threads used for frustum culling
    #[arg(long, default_value_t = 1)]
    workers: usize,
}

impl Options {
    fn output_path(&self) -> Option<&Path> {
        (!self.no_output).then_some(self.output.as_path())
    }
}

/// Viewport for `frame`: the middle third of the run renders at half size
/// so target reallocation is exercised in both directions.
fn viewport_at(frame: u32, frames: u32, full: (u32, u32)) -> (u32, u32) {
    let third = frames / 3;
    if third > 0 && (third..2 * third).contains(&frame) {
        ((full.0 / 2).max(1), (full.1 / 2).max(1))
    } else {
        full
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ember_headless=info,ember_renderer=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let options = Options::parse();
    tracing::info!(?options, "Starting Ember headless runner");

    let config = RendererConfig::load_or_default(&options.config);
    let (width, height) = (config.width, config.height);

    let context = RenderContext::headless(OUTPUT_FORMAT, width, height)?;
    let source = config.shader_source();
    let mut system = RenderSystem::new(context, &config, source.as_ref())?;
    let mut target = OffscreenTarget::new(system.context(), width, height);

    let mut scene = demo::build_scene(&mut system, 8);
    let mut settings = config.settings;
    if options.no_ssao {
        settings.ssao_enabled = false;
    }
    if options.wireframe && !system.supports_wireframe() {
        tracing::warn!("Wireframe requested but line rasterization is unsupported");
    }

    let culler = VisibilityCuller::new();
    let mut stats = FrameStatsCollector::default();
    stats.tick(Instant::now(), system.video_memory_usage_kb());

    for frame in 0..options.frames {
        let camera = demo::orbit_camera(frame, options.frames);
        let (width, height) = viewport_at(frame, options.frames, (config.width, config.height));
        if system.update(&camera, width, height) {
            tracing::info!(width, height, "Viewport resized");
        }
        target.resize(system.context(), width, height);

        // Select whatever sits under the center pixel halfway through.
        if frame == options.frames / 2 {
            let ray = Ray::through_pixel(
                width as f32 * 0.5,
                height as f32 * 0.5,
                width,
                height,
                camera.view_matrix(),
                system.projection(),
            );
            let picked = scene.pick(&ray);
            tracing::info!(?picked, "Picked object under center");
            scene.set_selected(picked);
        }

        let frustum = VisibilityCuller::frustum(camera.view_matrix(), system.projection());
        let render_list = culler.cull_parallel(scene.objects(), &frustum, options.workers);

        system.render(&camera, &render_list, &scene, settings, options.wireframe, target.view());

        if let Some(sample) = stats.tick(Instant::now(), system.video_memory_usage_kb()) {
            tracing::info!(
                fps = format_args!("{:.1}", sample.fps),
                frame_ms = format_args!("{:.2}", sample.frame_time_ms),
                vram_kb = sample.video_memory_kb,
                ram_kb = sample.ram_kb,
                visible = render_list.len(),
                culled = render_list.culled(),
                "Frame stats"
            );
        }
    }

    if let Some(path) = options.output_path() {
        target.save_png(system.context(), path)?;
    }

    system.shutdown();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Options, clap::Error> {
        Options::try_parse_from(std::iter::once("ember-headless").chain(args.iter().copied()))
    }

    #[test]
    fn test_parse_defaults() {
        let options = parse(&[]).unwrap();
        assert_eq!(options.config, PathBuf::from(DEFAULT_CONFIG));
        assert_eq!(options.frames, 120);
        assert_eq!(options.output_path(), Some(Path::new("frame.png")));
        assert!(!options.wireframe);
        assert!(!options.no_ssao);
        assert_eq!(options.workers, 1);
    }

    #[test]
    fn test_parse_flags() {
        let options = parse(&["--frames", "10", "--wireframe", "--no-ssao", "--no-output", "--workers", "4"]).unwrap();
        assert_eq!(options.frames, 10);
        assert!(options.wireframe);
        assert!(options.no_ssao);
        assert!(options.output_path().is_none());
        assert_eq!(options.workers, 4);
    }

    #[test]
    fn test_parse_output_path() {
        let options = parse(&["--output", "out/last.png", "--config", "custom.ron"]).unwrap();
        assert_eq!(options.output_path(), Some(Path::new("out/last.png")));
        assert_eq!(options.config, PathBuf::from("custom.ron"));
    }

    #[test]
    fn test_viewport_schedule() {
        let full = (800, 600);
        assert_eq!(viewport_at(0, 9, full), full);
        assert_eq!(viewport_at(3, 9, full), (400, 300));
        assert_eq!(viewport_at(5, 9, full), (400, 300));
        assert_eq!(viewport_at(6, 9, full), full);
        // Too few frames to split
        assert_eq!(viewport_at(1, 2, full), full);
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse(&["--frames"]).is_err());
        assert!(parse(&["--frames", "many"]).is_err());
        assert!(parse(&["--bogus"]).is_err());
        assert!(parse(&["--output", "a.png", "--no-output"]).is_err());
    }
}
