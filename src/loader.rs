use crate::config::TerrainSettings;
use crate::terrain::TerrainField;
use anyhow::Context;
use std::path::Path;

/// Builds the terrain described by `settings`: the configured image pair if
/// present, otherwise the procedural field.
pub fn load_terrain(settings: &TerrainSettings) -> anyhow::Result<TerrainField> {
    match (&settings.height_map, &settings.color_map) {
        (Some(height), Some(color)) => load_maps(height, color, settings.height_scale),
        _ => {
            log::info!(
                "no terrain maps configured, generating {0}x{0} procedural terrain",
                settings.procedural_size
            );
            TerrainField::procedural(settings.procedural_size, settings.height_scale)
        }
    }
}

pub fn load_maps(height: &Path, color: &Path, height_scale: f32) -> anyhow::Result<TerrainField> {
    let height_map = image::open(height)
        .with_context(|| format!("loading height map {}", height.display()))?
        .to_luma8();
    log::info!("loaded height map {}x{}", height_map.width(), height_map.height());

    let color_map = image::open(color)
        .with_context(|| format!("loading color map {}", color.display()))?
        .to_rgba8();
    log::info!("loaded color map {}x{}", color_map.width(), color_map.height());

    TerrainField::from_images(&height_map, &color_map, height_scale)
}
