use crate::camera::Camera;
use crate::terrain::{Color, TerrainField};
use image::Rgba;
use std::ops::{Range, RangeInclusive};

/// Row ranges may extend past either edge of the screen; sinks clip them.
pub trait ColumnSink {
    fn fill(&mut self, x: usize, rows: Range<i32>, color: Color);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenSize {
    pub width: usize,
    pub height: usize,
}

impl ScreenSize {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraceParams {
    pub focal_length: f32,
    pub depth_step_growth: f32,
    /// Fraction of sky mixed into terrain at the render distance.
    pub fog_amount: f32,
    pub sky_color: Color,
}

impl Default for TraceParams {
    fn default() -> Self {
        Self {
            focal_length: 240.0,
            depth_step_growth: 0.005,
            fog_amount: 0.0,
            sky_color: Rgba([255, 0, 255, 255]),
        }
    }
}

impl TraceParams {
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.focal_length.is_finite() && self.focal_length > 0.0,
            "focal length must be positive, got {}",
            self.focal_length
        );
        anyhow::ensure!(
            self.depth_step_growth.is_finite() && self.depth_step_growth >= 0.0,
            "depth step growth must not be negative, got {}",
            self.depth_step_growth
        );
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.fog_amount),
            "fog amount must lie in [0, 1], got {}",
            self.fog_amount
        );
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct OcclusionBuffer {
    rows: Vec<i32>,
}

impl OcclusionBuffer {
    pub fn new(columns: usize) -> Self {
        Self {
            rows: vec![0; columns],
        }
    }

    pub fn reset(&mut self, screen_height: usize) {
        self.rows.fill(screen_height as i32);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[i32] {
        &self.rows
    }
}

pub struct ColumnTracer<'a> {
    terrain: &'a TerrainField,
    params: &'a TraceParams,
}

impl<'a> ColumnTracer<'a> {
    pub fn new(terrain: &'a TerrainField, params: &'a TraceParams) -> Self {
        Self { terrain, params }
    }

    /// Every row of every column in `columns` is written exactly once.
    pub fn trace(
        &self,
        columns: RangeInclusive<usize>,
        camera: &Camera,
        screen: ScreenSize,
        occlusion: &mut OcclusionBuffer,
        sink: &mut impl ColumnSink,
    ) {
        let (start, end) = (*columns.start(), *columns.end());
        assert!(start <= end, "empty column range {start}..={end}");
        assert!(
            end < screen.width,
            "column {end} outside screen width {}",
            screen.width
        );
        assert_eq!(
            occlusion.len(),
            end - start + 1,
            "occlusion buffer does not match column range {start}..={end}"
        );
        assert!(
            camera.distance.is_finite(),
            "render distance must be finite, got {}",
            camera.distance
        );

        occlusion.reset(screen.height);
        let width = screen.width as f32;

        let mut step = 1.0f32;
        let mut z = 1.0f32;
        while z < camera.distance {
            let (left, right) = camera.frustum_edges(z);
            let delta = (right - left) / width;
            let scale = self.params.focal_length / z;
            let fog = self.fog_at(z, camera.distance);

            for (hidden, x) in occlusion.rows.iter_mut().zip(start..=end) {
                // not accumulated: independent of where the range starts
                let point = (left + delta * x as f32).floor();
                let ground = self.terrain.sample_height(point.x, point.y);
                let on_screen = ((camera.height - ground) * scale + camera.horizon) as i32;

                if on_screen < *hidden {
                    if *hidden > 0 {
                        let color = self.shade(self.terrain.sample_color(point.x, point.y), fog);
                        sink.fill(x, on_screen.max(0)..*hidden, color);
                    }
                    *hidden = on_screen;
                }
            }

            z += step;
            step += self.params.depth_step_growth;
        }

        for (&hidden, x) in occlusion.rows.iter().zip(start..=end) {
            if hidden > 0 {
                sink.fill(x, 0..hidden, self.params.sky_color);
            }
        }
    }

    fn fog_at(&self, z: f32, distance: f32) -> f32 {
        if self.params.fog_amount <= 0.0 {
            return 0.0;
        }
        (self.params.fog_amount * z / distance).clamp(0.0, 1.0)
    }

    fn shade(&self, color: Color, fog: f32) -> Color {
        if fog <= 0.0 {
            color
        } else {
            mix(color, self.params.sky_color, fog)
        }
    }
}

/// Linear blend from `a` (t = 0) to `b` (t = 1), truncating each channel.
pub fn mix(a: Color, b: Color, t: f32) -> Color {
    let channel = |i: usize| (a.0[i] as f32 * (1.0 - t) + b.0[i] as f32 * t) as u8;
    Rgba([channel(0), channel(1), channel(2), channel(3)])
}
