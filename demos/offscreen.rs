//! Renders a small scene into an offscreen framebuffer and writes it to a PNG.
//!
//! ```sh
//! cargo run --example offscreen -- [output.png] [sprite-image]
//! ```

use std::f32::consts::PI;

use stage2d::prelude::*;

const WIDTH: u32 = 320;
const HEIGHT: u32 = 240;

fn checkerboard(size: u32) -> Result<Texture> {
    let mut pixels = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let on = ((x / 8) + (y / 8)) % 2 == 0;
            let v = if on { 230 } else { 40 };
            pixels.extend_from_slice(&[v, v, 255 - v, 255]);
        }
    }
    Ok(Texture::from_base(BaseTexture::from_rgba(size, size, pixels)?))
}

fn main() -> Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let output = args.next().unwrap_or_else(|| "offscreen.png".to_string());
    let sprite_texture = match args.next() {
        Some(path) => {
            let resources = Loader::new()
                .add("sprite", path)
                .on_progress(|p| log::info!("Loading {} ({:.0}%)", p.name, p.percent()))
                .load();
            for error in resources.errors() {
                log::warn!("{}", error);
            }
            match resources.texture("sprite") {
                Some(texture) => texture.clone(),
                None => checkerboard(64)?,
            }
        }
        None => checkerboard(64)?,
    };

    let context = GpuContext::new()?;
    let config = StageConfig::new()
        .size(WIDTH, HEIGHT)
        .background_color(Color::rgb(0.08, 0.08, 0.12));
    let mut renderer = Renderer::new(&context, config.renderer_options());
    let mut stage = Stage::new(config);
    let tree = stage.tree_mut();

    let mut panel = Graphics::new();
    panel
        .line_style(3.0, Color::from_hex(0xf0f0f0))
        .begin_fill(Color::from_hex(0x3050a0))
        .draw_rounded_rect(10.0, 10.0, 140.0, 100.0, 16.0)
        .end_fill();
    let panel = tree.create_graphics(panel);

    let mut ring = Graphics::new();
    ring.begin_fill(Color::from_hex(0xff8800))
        .draw_circle(0.0, 0.0, 40.0)
        .draw_circle(0.0, 0.0, 20.0)
        .add_hole()
        .end_fill();
    let ring = tree.create_graphics(ring);
    if let Some(object) = tree.get_mut(ring) {
        object.transform.position.set(230.0, 60.0);
    }

    let sprite = tree.create_sprite(Sprite::new(sprite_texture.clone()).with_anchor(0.5, 0.5));
    if let Some(object) = tree.get_mut(sprite) {
        object.transform.position.set(80.0, 170.0);
        object.transform.set_rotation(PI / 8.0);
        object.blend_mode = BlendMode::Add;
    }

    let mut wave = Mesh::plane(sprite_texture, 8, 2);
    let bent: Vec<f32> = wave
        .vertices()
        .chunks_exact(2)
        .flat_map(|p| [p[0] * 1.5, p[1] + (p[0] / 10.0).sin() * 6.0])
        .collect();
    wave.set_vertices(bent);
    let wave = tree.create_mesh(wave);
    if let Some(object) = tree.get_mut(wave) {
        object.transform.position.set(170.0, 130.0);
        object.alpha = 0.8;
    }

    let mut clip = Graphics::new();
    clip.begin_fill(Color::WHITE).draw_circle(80.0, 170.0, 36.0);
    let clip = tree.create_graphics(clip);
    let masked = tree.create_container();
    tree.add_child(masked, sprite)?;
    tree.set_mask(masked, Some(clip))?;

    for node in [panel, ring, masked, wave] {
        stage.add_child(node)?;
    }

    let framebuffer = renderer.create_framebuffer(WIDTH, HEIGHT);
    let stats = stage.render(&mut renderer, RenderTarget::Framebuffer(&framebuffer))?;
    log::info!(
        "Rendered {} steps with {} draw calls",
        stats.steps,
        stats.draw_calls
    );

    let root = stage.root();
    let image = renderer.extract_image(stage.tree_mut(), root)?;
    image.save(&output)?;
    println!("Wrote {} ({}x{})", output, image.width(), image.height());
    Ok(())
}
