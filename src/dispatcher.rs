use crate::camera::Camera;
use crate::config::RenderSettings;
use crate::framebuffer::FrameBuffer;
use crate::terrain::TerrainField;
use crate::tracer::TraceParams;
use crate::worker::RenderWorkerPool;
use anyhow::{Context, bail};
use std::sync::Arc;
use std::sync::mpsc::RecvTimeoutError;
use std::time::{Duration, Instant};

const LONG_FRAME: Duration = Duration::from_millis(16);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameStats {
    pub frame: u64,
    pub elapsed: Duration,
}

/// Returns from a frame only after every worker that accepted it has reported back.
pub struct FrameDispatcher {
    camera: Camera,
    terrain: Arc<TerrainField>,
    params: TraceParams,
    workers: usize,
    budget: Duration,
    pool: Option<RenderWorkerPool>,
    frame: u64,
}

impl FrameDispatcher {
    pub fn new(camera: Camera, terrain: Arc<TerrainField>, settings: &RenderSettings) -> anyhow::Result<Self> {
        let workers = settings.worker_count();
        anyhow::ensure!(workers > 0, "worker count must be positive");
        let params = settings.trace_params();
        params.validate()?;
        Ok(Self {
            camera,
            terrain,
            params,
            workers,
            budget: Duration::from_millis(settings.frame_budget_ms.max(1)),
            pool: None,
            frame: 0,
        })
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn terrain(&self) -> &TerrainField {
        &self.terrain
    }

    pub fn worker_count(&self) -> usize {
        self.workers
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frame
    }

    /// Renders the owned camera's current pose into `buffer`.
    pub fn render_frame(&mut self, buffer: &mut FrameBuffer<'_>) -> anyhow::Result<FrameStats> {
        let snapshot = self.camera;
        self.render_with(snapshot, buffer)
    }

    /// Renders an explicit camera snapshot into `buffer`.
    pub fn render_with(&mut self, camera: Camera, buffer: &mut FrameBuffer<'_>) -> anyhow::Result<FrameStats> {
        let started = Instant::now();
        if ![camera.position.x, camera.position.y, camera.angle, camera.distance, camera.height, camera.horizon]
            .iter()
            .all(|v| v.is_finite())
        {
            bail!("camera is not finite: {camera}");
        }
        self.ensure_pool(buffer.width())?;
        self.frame += 1;
        let frame = self.frame;
        let pool = self.pool.as_ref().context("render pool missing")?;
        let accepted = pool.broadcast(frame, camera, buffer.target());

        let mut failures = Vec::new();
        let mut done = 0;
        while done < accepted {
            match pool.next_completion(self.budget) {
                Ok(completion) => {
                    done += 1;
                    if let Err(message) = completion.outcome {
                        log::error!("worker {} failed frame {}: {}", completion.worker, completion.frame, message);
                        failures.push(message);
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    log::warn!(
                        "frame {frame} stalled: {done}/{accepted} workers done after {:?}",
                        started.elapsed()
                    );
                }
                Err(RecvTimeoutError::Disconnected) => {
                    bail!("render workers disconnected during frame {frame}");
                }
            }
        }

        let missing = pool.worker_count() - accepted;
        if missing > 0 {
            self.pool = None;
            bail!("{missing} render workers were unavailable for frame {frame}");
        }
        if let Some(first) = failures.into_iter().next() {
            bail!("frame {frame} failed: {first}");
        }

        let elapsed = started.elapsed();
        if elapsed > LONG_FRAME {
            log::debug!("long frame {frame}: {elapsed:?}");
        }
        Ok(FrameStats { frame, elapsed })
    }

    /// The pool's column ranges are fixed, so a width change means a new pool.
    /// Screens narrower than the worker count get one worker per column.
    fn ensure_pool(&mut self, width: usize) -> anyhow::Result<()> {
        if self.pool.as_ref().is_some_and(|pool| pool.width() != width) {
            log::info!("framebuffer width changed to {width}, rebuilding render pool");
            self.pool = None;
        }
        if self.pool.is_none() {
            let workers = self.workers.min(width);
            let pool = RenderWorkerPool::new(width, workers, Arc::clone(&self.terrain), self.params)
                .with_context(|| format!("creating render pool for width {width}"))?;
            self.pool = Some(pool);
        }
        Ok(())
    }
}
