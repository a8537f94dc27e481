//! `thistle-viewer [OBJ paths...]`
//!
//! Loads each OBJ file into the scene, 3 units apart along x, and opens the
//! viewer. WASD/QE move, the mouse looks, the wheel zooms, ESC quits.

use std::path::Path;

use thistle::{gfx::Transform, App, AppConfig};

const SPACING: f32 = 3.0;

fn main() -> anyhow::Result<()> {
    let paths: Vec<String> = std::env::args().skip(1).collect();

    let config = AppConfig::default().with_window("Thistle Viewer", 1280, 720);
    let mut app = App::new(config)?;

    if paths.is_empty() {
        log::warn!("no OBJ files given; usage: thistle-viewer <model.obj>...");
    }

    for (i, path) in paths.iter().enumerate() {
        let stem = Path::new(path)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("model");
        let id = if app.scene().contains(stem) {
            format!("{}-{}", stem, i)
        } else {
            stem.to_string()
        };

        let transform = Transform::identity().with_position(i as f32 * SPACING, 0.0, 0.0);
        // Failures are already logged; the viewer runs with what loaded.
        let _ = app.add_model(&id, path, transform);
    }

    let stats = app.scene().statistics();
    log::info!(
        "scene ready: {} objects, {} vertices, {} triangles",
        stats.object_count,
        stats.total_vertices,
        stats.total_triangles
    );

    app.run()
}
