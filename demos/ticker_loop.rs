//! Drives a stage from a ticker for a few seconds without a window.
//!
//! Each frame the ticker rotates a shape and the stage renders into an
//! offscreen framebuffer; timing is logged once per second.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use stage2d::prelude::*;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let context = GpuContext::new()?;
    let config = StageConfig::new().size(256, 256);
    let mut renderer = Renderer::new(&context, config.renderer_options());
    let mut stage = Stage::new(config);

    let mut star = Graphics::new();
    let points: Vec<Point> = (0..10)
        .map(|i| {
            let angle = i as f32 * std::f32::consts::PI / 5.0;
            let radius = if i % 2 == 0 { 80.0 } else { 35.0 };
            Point::new(angle.cos() * radius, angle.sin() * radius)
        })
        .collect();
    star.begin_fill(Color::from_hex(0xffd030)).draw_polygon(&points);
    let star = stage.tree_mut().create_graphics(star);
    if let Some(object) = stage.tree_mut().get_mut(star) {
        object.transform.position.set(128.0, 128.0);
    }
    stage.add_child(star)?;

    // ticker listeners only see the delta, so share the angle with the loop
    let angle = Rc::new(Cell::new(0.0f32));
    let spin = angle.clone();
    stage
        .ticker_mut()
        .add(move |delta| spin.set(spin.get() + 0.02 * delta as f32), UpdatePriority::NORMAL);

    let frames = Rc::new(Cell::new(0u32));
    let counter = frames.clone();
    stage
        .ticker_mut()
        .add(move |_| counter.set(counter.get() + 1), UpdatePriority::UTILITY);
    stage.ticker_mut().start();

    let framebuffer = renderer.create_framebuffer(256, 256);
    let mut last_report = 0;
    while stage.ticker().needs_frame() {
        stage.ticker_mut().tick();
        if let Some(object) = stage.tree_mut().get_mut(star) {
            object.transform.set_rotation(angle.get());
        }
        stage.render(&mut renderer, RenderTarget::Framebuffer(&framebuffer))?;

        if frames.get() / 60 != last_report {
            last_report = frames.get() / 60;
            log::info!(
                "frame {} fps {:.1} delta {:.2}",
                frames.get(),
                stage.ticker().fps(),
                stage.ticker().delta_time()
            );
        }
        if frames.get() >= 180 {
            stage.ticker_mut().stop();
        }
        std::thread::sleep(Duration::from_millis(16));
    }

    log::info!("Stopped after {} frames", frames.get());
    Ok(())
}
