pub mod camera;
pub mod camera_controller;
pub mod config;
pub mod dispatcher;
pub mod framebuffer;
pub mod loader;
pub mod terrain;
pub mod tracer;
pub mod worker;

pub use camera::Camera;
pub use camera_controller::CameraController;
pub use config::Config;
pub use dispatcher::{FrameDispatcher, FrameStats};
pub use framebuffer::FrameBuffer;
pub use terrain::{Color, TerrainField};
pub use tracer::{ColumnSink, ColumnTracer, OcclusionBuffer, ScreenSize, TraceParams};
pub use worker::{RenderWorkerPool, column_ranges};
