use crate::camera::Camera;
use crate::framebuffer::{ColumnWriter, FrameTarget};
use crate::terrain::TerrainField;
use crate::tracer::{ColumnTracer, OcclusionBuffer, ScreenSize, TraceParams};
use std::ops::RangeInclusive;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Splits `[0, width)` into `workers` contiguous ranges of `width / workers`
/// columns; the last range also takes the remainder.
pub fn column_ranges(width: usize, workers: usize) -> anyhow::Result<Vec<RangeInclusive<usize>>> {
    anyhow::ensure!(workers > 0, "worker count must be positive");
    anyhow::ensure!(width > 0, "screen width must be positive");
    anyhow::ensure!(
        workers <= width,
        "{workers} workers cannot share {width} columns"
    );

    let base = width / workers;
    Ok((0..workers)
        .map(|i| {
            let start = i * base;
            let end = if i + 1 == workers { width - 1 } else { start + base - 1 };
            start..=end
        })
        .collect())
}

pub(crate) struct RenderRequest {
    pub frame: u64,
    pub camera: Camera,
    pub target: FrameTarget,
}

/// Sent exactly once per request, after the worker has stopped touching the target.
#[derive(Debug)]
pub(crate) struct Completion {
    pub worker: usize,
    pub frame: u64,
    pub outcome: Result<(), String>,
}

struct Worker {
    columns: RangeInclusive<usize>,
    requests: Sender<RenderRequest>,
    handle: Option<JoinHandle<()>>,
}

pub struct RenderWorkerPool {
    width: usize,
    workers: Vec<Worker>,
    completions: Receiver<Completion>,
}

impl RenderWorkerPool {
    pub fn new(
        width: usize,
        worker_count: usize,
        terrain: Arc<TerrainField>,
        params: TraceParams,
    ) -> anyhow::Result<Self> {
        params.validate()?;
        let ranges = column_ranges(width, worker_count)?;
        let (done_tx, done_rx) = mpsc::channel();

        let mut workers = Vec::with_capacity(ranges.len());
        for (index, columns) in ranges.into_iter().enumerate() {
            let (request_tx, request_rx) = mpsc::channel();
            let terrain = Arc::clone(&terrain);
            let done = done_tx.clone();
            let bound = columns.clone();
            let handle = thread::Builder::new()
                .name(format!("render-{index}"))
                .spawn(move || run_worker(index, bound, terrain, params, request_rx, done))?;

            workers.push(Worker {
                columns,
                requests: request_tx,
                handle: Some(handle),
            });
        }

        log::info!(
            "render pool ready: {} workers over {} columns ({:?})",
            workers.len(),
            width,
            workers.iter().map(|w| w.columns.clone()).collect::<Vec<_>>()
        );

        Ok(Self {
            width,
            workers,
            completions: done_rx,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    pub fn column_ranges(&self) -> Vec<RangeInclusive<usize>> {
        self.workers.iter().map(|w| w.columns.clone()).collect()
    }

    /// Returns how many workers accepted the request.
    pub(crate) fn broadcast(&self, frame: u64, camera: Camera, target: FrameTarget) -> usize {
        self.workers
            .iter()
            .filter(|worker| {
                worker
                    .requests
                    .send(RenderRequest { frame, camera, target })
                    .is_ok()
            })
            .count()
    }

    pub(crate) fn next_completion(&self, budget: Duration) -> Result<Completion, RecvTimeoutError> {
        self.completions.recv_timeout(budget)
    }
}

impl Drop for RenderWorkerPool {
    fn drop(&mut self) {
        let handles: Vec<_> = self
            .workers
            .drain(..)
            .filter_map(|mut worker| worker.handle.take())
            .collect();
        // the request senders are gone now, so every worker loop ends
        for handle in handles {
            if handle.join().is_err() {
                log::error!("render worker exited abnormally");
            }
        }
    }
}

fn run_worker(
    index: usize,
    columns: RangeInclusive<usize>,
    terrain: Arc<TerrainField>,
    params: TraceParams,
    requests: Receiver<RenderRequest>,
    done: Sender<Completion>,
) {
    log::debug!("render worker {index} bound to columns {columns:?}");
    let mut occlusion = OcclusionBuffer::new(columns.end() - columns.start() + 1);
    let tracer = ColumnTracer::new(&terrain, &params);

    while let Ok(request) = requests.recv() {
        let RenderRequest { frame, camera, target } = request;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let screen = ScreenSize::new(target.width, target.height);
            // SAFETY: the dispatcher keeps the framebuffer borrowed until it
            // has received this worker's completion, and pool ranges are disjoint.
            let mut writer = unsafe { ColumnWriter::new(target, columns.clone()) };
            tracer.trace(columns.clone(), &camera, screen, &mut occlusion, &mut writer);
        }))
        .map_err(|payload| panic_message(payload.as_ref()));

        let completion = Completion {
            worker: index,
            frame,
            outcome,
        };
        if done.send(completion).is_err() {
            break;
        }
    }
    log::debug!("render worker {index} exiting");
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "render worker panicked".to_string()
    }
}
