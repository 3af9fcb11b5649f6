use image::{GrayImage, Rgba, RgbaImage};

pub type Color = Rgba<u8>;

/// Read-only height and color grids sampled by the column tracer.
///
/// Both grids are addressed by floored world coordinates. Coordinates that
/// fall outside a grid are clamped to its nearest edge cell, so every finite
/// or non-finite input yields a value.
pub struct TerrainField {
    height_width: usize,
    height_depth: usize,
    heights: Vec<f32>,
    color_width: usize,
    color_depth: usize,
    colors: Vec<Color>,
    height_scale: f32,
}

impl TerrainField {
    pub fn new(
        (height_width, height_depth): (usize, usize),
        heights: Vec<f32>,
        (color_width, color_depth): (usize, usize),
        colors: Vec<Color>,
        height_scale: f32,
    ) -> anyhow::Result<Self> {
        anyhow::ensure!(
            height_width > 0 && height_depth > 0,
            "height grid must not be empty"
        );
        anyhow::ensure!(
            color_width > 0 && color_depth > 0,
            "color grid must not be empty"
        );
        anyhow::ensure!(
            heights.len() == height_width * height_depth,
            "height grid holds {} cells, expected {}x{}",
            heights.len(),
            height_width,
            height_depth
        );
        anyhow::ensure!(
            colors.len() == color_width * color_depth,
            "color grid holds {} cells, expected {}x{}",
            colors.len(),
            color_width,
            color_depth
        );
        anyhow::ensure!(height_scale.is_finite(), "height scale must be finite");

        Ok(Self {
            height_width,
            height_depth,
            heights,
            color_width,
            color_depth,
            colors,
            height_scale,
        })
    }

    /// Builds both grids with the same dimensions from a per-cell function.
    pub fn from_fn(
        width: usize,
        depth: usize,
        height_scale: f32,
        mut cell: impl FnMut(usize, usize) -> (f32, Color),
    ) -> anyhow::Result<Self> {
        let mut heights = Vec::with_capacity(width * depth);
        let mut colors = Vec::with_capacity(width * depth);
        for y in 0..depth {
            for x in 0..width {
                let (h, c) = cell(x, y);
                heights.push(h);
                colors.push(c);
            }
        }
        Self::new((width, depth), heights, (width, depth), colors, height_scale)
    }

    /// Height from 8-bit luminance, color from RGBA8. The two images may differ in size.
    pub fn from_images(
        height_map: &GrayImage,
        color_map: &RgbaImage,
        height_scale: f32,
    ) -> anyhow::Result<Self> {
        let heights = height_map.pixels().map(|p| p.0[0] as f32).collect();
        let colors = color_map.pixels().copied().collect();
        Self::new(
            (height_map.width() as usize, height_map.height() as usize),
            heights,
            (color_map.width() as usize, color_map.height() as usize),
            colors,
            height_scale,
        )
    }

    /// Sine ridges running along y, used when no terrain images are configured.
    pub fn procedural(size: usize, height_scale: f32) -> anyhow::Result<Self> {
        Self::from_fn(size, size, height_scale, |x, _| {
            let wave = (x as f32 / 10.0).sin();
            let red = ((1.0 + wave) / 2.0 * 255.0) as u8;
            (wave * 10.0, Rgba([red, 0, 0, 255]))
        })
    }

    pub fn height_dimensions(&self) -> (usize, usize) {
        (self.height_width, self.height_depth)
    }

    pub fn color_dimensions(&self) -> (usize, usize) {
        (self.color_width, self.color_depth)
    }

    pub fn sample_height(&self, x: f32, y: f32) -> f32 {
        let i = clamp_index(x, self.height_width);
        let j = clamp_index(y, self.height_depth);
        self.heights[j * self.height_width + i] * self.height_scale
    }

    pub fn sample_color(&self, x: f32, y: f32) -> Color {
        let i = clamp_index(x, self.color_width);
        let j = clamp_index(y, self.color_depth);
        self.colors[j * self.color_width + i]
    }
}

/// Floors a world coordinate and clamps it into `[0, len)`. NaN maps to 0.
fn clamp_index(coord: f32, len: usize) -> usize {
    let cell = coord.floor() as i64;
    cell.clamp(0, len as i64 - 1) as usize
}
