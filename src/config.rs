use crate::camera::Camera;
use crate::tracer::TraceParams;
use anyhow::{Context, ensure};
use glam::Vec2;
use image::Rgba;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub window: WindowSettings,
    pub terrain: TerrainSettings,
    pub render: RenderSettings,
    pub controls: ControlSettings,
    pub camera: CameraSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowSettings {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            title: "Voxel Space".to_string(),
            width: 800,
            height: 600,
        }
    }
}

/// Terrain sources. Without both maps a procedural field is generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainSettings {
    pub height_map: Option<PathBuf>,
    pub color_map: Option<PathBuf>,
    pub height_scale: f32,
    pub procedural_size: usize,
}

impl Default for TerrainSettings {
    fn default() -> Self {
        Self {
            height_map: None,
            color_map: None,
            height_scale: 1.0,
            procedural_size: 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// `None` uses one worker per available hardware thread.
    pub workers: Option<usize>,
    pub distance: f32,
    pub focal_length: f32,
    pub depth_step_growth: f32,
    pub fog_amount: f32,
    pub sky_color: [u8; 4],
    /// Join time after which a frame is reported as stalled.
    pub frame_budget_ms: u64,
}

impl Default for RenderSettings {
    fn default() -> Self {
        let trace = TraceParams::default();
        Self {
            workers: None,
            distance: 1000.0,
            focal_length: trace.focal_length,
            depth_step_growth: trace.depth_step_growth,
            fog_amount: trace.fog_amount,
            sky_color: trace.sky_color.0,
            frame_budget_ms: 250,
        }
    }
}

impl RenderSettings {
    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        })
    }

    pub fn trace_params(&self) -> TraceParams {
        TraceParams {
            focal_length: self.focal_length,
            depth_step_growth: self.depth_step_growth,
            fog_amount: self.fog_amount,
            sky_color: Rgba(self.sky_color),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlSettings {
    pub move_speed: f32,
    pub sprint_multiplier: f32,
    pub turn_speed: f32,
    pub climb_speed: f32,
    pub descend_speed: f32,
    pub horizon_step: f32,
    pub gravity: bool,
    pub gravity_force: f32,
    /// Minimum camera height above the terrain under it.
    pub player_height: f32,
    pub mouse_sensitivity: f32,
}

impl Default for ControlSettings {
    fn default() -> Self {
        Self {
            move_speed: 1.5,
            sprint_multiplier: 4.0,
            turn_speed: 0.02,
            climb_speed: 1.0,
            descend_speed: 9.0,
            horizon_step: 4.0,
            gravity: false,
            gravity_force: 1.0,
            player_height: 10.0,
            mouse_sensitivity: 0.005,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub position: [f32; 2],
    pub angle: f32,
    pub height: f32,
    pub horizon: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            position: [0.0, 260.0],
            angle: 0.0,
            height: 100.0,
            horizon: 50.0,
        }
    }
}

impl Config {
    pub fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            self.window.width > 0 && self.window.height > 0,
            "window must not be empty ({}x{})",
            self.window.width,
            self.window.height
        );
        ensure!(self.render.workers != Some(0), "worker count must be positive");
        ensure!(
            self.render.distance.is_finite() && self.render.distance > 1.0,
            "render distance must be greater than 1, got {}",
            self.render.distance
        );
        self.render.trace_params().validate()?;
        ensure!(
            self.terrain.height_scale.is_finite(),
            "terrain height scale must be finite"
        );
        ensure!(
            self.terrain.height_map.is_some() == self.terrain.color_map.is_some(),
            "height_map and color_map must be configured together"
        );
        ensure!(self.terrain.procedural_size > 0, "procedural terrain size must be positive");
        let camera = &self.camera;
        ensure!(
            camera.position.iter().all(|v| v.is_finite())
                && camera.angle.is_finite()
                && camera.height.is_finite()
                && camera.horizon.is_finite(),
            "camera pose must be finite"
        );
        Ok(())
    }

    pub fn initial_camera(&self) -> Camera {
        Camera {
            position: Vec2::from_array(self.camera.position),
            angle: self.camera.angle,
            distance: self.render.distance,
            height: self.camera.height,
            horizon: self.camera.horizon,
        }
    }
}
