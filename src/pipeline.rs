// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The parallel compute/draw pipeline.
//!
//! Pixels flow from the distributor (the calling thread) through a
//! bounded task queue to a pool of compute workers.  What happens next
//! depends on the [`Architecture`]:
//!
//! * `DirectWrite`: each compute worker colours its own result and
//!   paints it into the canvas.
//! * `Staged`: compute workers push their results into a second bounded
//!   queue, drained by a separate pool of draw workers.
//!
//! Every queue carries explicit `Stop` variants rather than overloading
//! a payload.  Each worker acknowledges termination on a per-stage
//! acknowledgement channel, tagged with its own identifier, and the
//! coordinator counts those acknowledgements before moving on.  For the
//! staged pipeline the draw workers are told to stop only after every
//! compute worker has acknowledged, so no result can be queued behind a
//! draw worker's stop signal.
//!
//! A worker also stops when its input queue disconnects.  That only
//! happens when a neighbouring stage has died, and keeps a panicking
//! worker from deadlocking the rest of the pipeline; the render is then
//! reported as failed.

use crossbeam;
use crossbeam::channel::{bounded, Receiver, Sender};
use crossbeam::thread::ScopedJoinHandle;
use image::Rgba;
use num_cpus;
use std::sync::Mutex;

use colour::Palette;
use errors::{ConfigError, RenderError};
use escape::remaining_iterations;
use planes::{Pixel, PlaneMapper};
use raster::Canvas;
use settings::Settings;

/// How the draw stage is attached to the compute stage.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Architecture {
    /// Compute workers paint their own results.
    DirectWrite,
    /// A separate pool of draw workers paints results from a second
    /// queue.
    Staged,
}

/// Worker counts and queue sizes for one render.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Which draw stage to use.
    pub architecture: Architecture,
    /// Number of compute workers.
    pub compute_workers: usize,
    /// Number of draw workers.  Ignored by `DirectWrite`.
    pub draw_workers: usize,
    /// Capacity of each queue.  Zero makes every hand-off a rendezvous.
    pub queue_depth: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let threads = num_cpus::get();
        PipelineConfig {
            architecture: Architecture::Staged,
            compute_workers: threads,
            draw_workers: threads,
            queue_depth: 256,
        }
    }
}

impl PipelineConfig {
    /// A staged pipeline with the given worker counts.
    pub fn staged(compute_workers: usize, draw_workers: usize) -> Self {
        PipelineConfig {
            architecture: Architecture::Staged,
            compute_workers,
            draw_workers,
            ..PipelineConfig::default()
        }
    }

    /// A direct-write pipeline with the given worker count.
    pub fn direct(compute_workers: usize) -> Self {
        PipelineConfig {
            architecture: Architecture::DirectWrite,
            compute_workers,
            ..PipelineConfig::default()
        }
    }

    /// Every stage in use needs at least one worker.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.compute_workers == 0 {
            return Err(ConfigError::NoWorkers("compute"));
        }
        if self.architecture == Architecture::Staged && self.draw_workers == 0 {
            return Err(ConfigError::NoWorkers("draw"));
        }
        Ok(())
    }
}

/// A message on the task queue.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Task {
    /// Compute this pixel.
    Work(Pixel),
    /// No more work; exit.
    Stop,
}

/// The kernel's verdict on one pixel.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct EscapeResult {
    /// Where the result belongs in the raster.
    pub pixel: Pixel,
    /// Iterations left when the orbit escaped; zero inside the set.
    pub remaining: u32,
}

/// A message on the result queue of the staged pipeline.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DrawTask {
    /// Colour and paint this result.
    Draw(EscapeResult),
    /// No more results; exit.
    Stop,
}

/// Identifies a worker within its stage; sent as its termination
/// acknowledgement.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct WorkerId(pub usize);

/// The viewport mapping and kernel parameters, bundled so that every
/// worker evaluates pixels identically.
#[derive(Clone, Debug)]
pub struct EscapeKernel {
    plane: PlaneMapper,
    limit: u32,
    bound: f64,
}

impl EscapeKernel {
    /// Validates the settings and captures what the kernel needs.
    pub fn new(settings: &Settings) -> Result<Self, ConfigError> {
        Ok(EscapeKernel {
            plane: PlaneMapper::new(settings)?,
            limit: settings.limit(),
            bound: settings.escape_bound,
        })
    }

    /// The plane this kernel maps pixels onto.
    pub fn plane(&self) -> &PlaneMapper {
        &self.plane
    }

    /// Map the pixel onto the plane and run the escape-time kernel on it.
    pub fn evaluate(&self, pixel: Pixel) -> EscapeResult {
        let point = self.plane.pixel_to_point(&pixel);
        EscapeResult {
            pixel,
            remaining: remaining_iterations(point, self.limit, self.bound),
        }
    }
}

/// Feed every pixel into the task queue, then one `Stop` per worker.
/// Blocks whenever the queue is full.  Returns the number of pixels
/// sent.
pub fn distribute<I>(
    pixels: I,
    tasks: &Sender<Task>,
    workers: usize,
) -> Result<usize, RenderError>
where
    I: IntoIterator<Item = Pixel>,
{
    let disconnected = |_| RenderError::QueueDisconnected("task");
    let mut sent = 0;
    for pixel in pixels {
        tasks.send(Task::Work(pixel)).map_err(disconnected)?;
        sent += 1;
    }
    for _ in 0..workers {
        tasks.send(Task::Stop).map_err(disconnected)?;
    }
    Ok(sent)
}

/// Wait for `expected` workers of one stage to acknowledge that they
/// have stopped.  Fails if the stage's acknowledgement channel
/// disconnects first, which means a worker died without acknowledging.
fn await_stopped(
    acks: &Receiver<WorkerId>,
    expected: usize,
    stage: &'static str,
) -> Result<(), RenderError> {
    let mut stopped = vec![false; expected];
    for _ in 0..expected {
        let WorkerId(id) = acks.recv().map_err(|_| RenderError::WorkerPanicked)?;
        if let Some(seen) = stopped.get_mut(id) {
            debug_assert!(!*seen, "{} worker {} stopped twice", stage, id);
            *seen = true;
        }
        trace!("{} worker {} stopped", stage, id);
    }
    debug!("all {} {} workers stopped", expected, stage);
    Ok(())
}

/// Join every handle, so that no worker outlives the render.
fn join_all<'scope>(handles: Vec<ScopedJoinHandle<'scope, ()>>) -> Result<(), RenderError> {
    handles.into_iter().fold(Ok(()), |joined, handle| match handle.join() {
        Ok(()) => joined,
        Err(_) => Err(RenderError::WorkerPanicked),
    })
}

/// Paint under the canvas lock.  Returns false if the lock is poisoned,
/// in which case another worker has panicked and the render is lost.
fn paint<C: Canvas>(canvas: &Mutex<C>, pixel: Pixel, colour: Rgba<u8>) -> bool {
    match canvas.lock() {
        Ok(mut canvas) => {
            canvas.paint(pixel, colour);
            true
        }
        Err(_) => false,
    }
}

fn direct_worker<C: Canvas>(
    id: WorkerId,
    kernel: &EscapeKernel,
    palette: Palette,
    tasks: Receiver<Task>,
    canvas: &Mutex<C>,
    acks: Sender<WorkerId>,
) {
    let mut drawn = 0usize;
    for task in tasks.iter() {
        match task {
            Task::Work(pixel) => {
                let result = kernel.evaluate(pixel);
                let colour = palette.colour(result.remaining);
                if !paint(canvas, result.pixel, colour) {
                    break;
                }
                drawn += 1;
            }
            Task::Stop => break,
        }
    }
    trace!("direct worker {} drew {} pixels", id.0, drawn);
    let _ = acks.send(id);
}

fn compute_worker(
    id: WorkerId,
    kernel: &EscapeKernel,
    tasks: Receiver<Task>,
    results: Sender<DrawTask>,
    acks: Sender<WorkerId>,
) {
    let mut computed = 0usize;
    for task in tasks.iter() {
        match task {
            Task::Work(pixel) => {
                if results.send(DrawTask::Draw(kernel.evaluate(pixel))).is_err() {
                    break;
                }
                computed += 1;
            }
            Task::Stop => break,
        }
    }
    trace!("compute worker {} computed {} pixels", id.0, computed);
    let _ = acks.send(id);
}

fn draw_worker<C: Canvas>(
    id: WorkerId,
    palette: Palette,
    results: Receiver<DrawTask>,
    canvas: &Mutex<C>,
    acks: Sender<WorkerId>,
) {
    let mut drawn = 0usize;
    for task in results.iter() {
        match task {
            DrawTask::Draw(result) => {
                let colour = palette.colour(result.remaining);
                if !paint(canvas, result.pixel, colour) {
                    break;
                }
                drawn += 1;
            }
            DrawTask::Stop => break,
        }
    }
    trace!("draw worker {} drew {} pixels", id.0, drawn);
    let _ = acks.send(id);
}

/// Run the direct-write pipeline to completion.  The only join point is
/// the compute stage: once every worker has stopped, every pixel has
/// been painted.
pub fn run_direct<C: Canvas>(
    kernel: &EscapeKernel,
    palette: Palette,
    config: &PipelineConfig,
    canvas: &Mutex<C>,
) -> Result<(), RenderError> {
    let workers = config.compute_workers;
    crossbeam::scope(|scope| {
        let (task_tx, task_rx) = bounded(config.queue_depth);
        let (ack_tx, ack_rx) = bounded(workers);

        let handles: Vec<ScopedJoinHandle<()>> = (0..workers)
            .map(|i| {
                let tasks = task_rx.clone();
                let acks = ack_tx.clone();
                scope.spawn(move |_| {
                    direct_worker(WorkerId(i), kernel, palette, tasks, canvas, acks)
                })
            })
            .collect();
        drop(task_rx);
        drop(ack_tx);

        let shutdown = distribute(kernel.plane().pixels(), &task_tx, workers)
            .and_then(|sent| {
                drop(task_tx);
                debug!("queued {} pixels and {} stop signals", sent, workers);
                await_stopped(&ack_rx, workers, "direct")
            });
        join_all(handles).and(shutdown)
    })
    .map_err(|_| RenderError::WorkerPanicked)?
}

/// Run the staged pipeline to completion.
///
/// Shutdown order:
/// 1. queue every pixel, then one stop signal per compute worker;
/// 2. wait for every compute worker to acknowledge;
/// 3. queue one stop signal per draw worker behind the last result;
/// 4. wait for every draw worker to acknowledge;
/// 5. join every thread.
pub fn run_staged<C: Canvas>(
    kernel: &EscapeKernel,
    palette: Palette,
    config: &PipelineConfig,
    canvas: &Mutex<C>,
) -> Result<(), RenderError> {
    let (computers, drawers) = (config.compute_workers, config.draw_workers);
    crossbeam::scope(|scope| {
        let (task_tx, task_rx) = bounded(config.queue_depth);
        let (result_tx, result_rx) = bounded(config.queue_depth);
        let (compute_ack_tx, compute_ack_rx) = bounded(computers);
        let (draw_ack_tx, draw_ack_rx) = bounded(drawers);

        let mut handles: Vec<ScopedJoinHandle<()>> = (0..computers)
            .map(|i| {
                let tasks = task_rx.clone();
                let results = result_tx.clone();
                let acks = compute_ack_tx.clone();
                scope.spawn(move |_| compute_worker(WorkerId(i), kernel, tasks, results, acks))
            })
            .collect();
        handles.extend((0..drawers).map(|i| {
            let results = result_rx.clone();
            let acks = draw_ack_tx.clone();
            scope.spawn(move |_| draw_worker(WorkerId(i), palette, results, canvas, acks))
        }));
        drop(task_rx);
        drop(result_rx);
        drop(compute_ack_tx);
        drop(draw_ack_tx);

        let shutdown = distribute(kernel.plane().pixels(), &task_tx, computers)
            .and_then(|sent| {
                drop(task_tx);
                debug!("queued {} pixels and {} stop signals", sent, computers);
                await_stopped(&compute_ack_rx, computers, "compute")
            })
            .and_then(|()| {
                for _ in 0..drawers {
                    result_tx
                        .send(DrawTask::Stop)
                        .map_err(|_| RenderError::QueueDisconnected("result"))?;
                }
                drop(result_tx);
                debug!("queued {} draw stop signals", drawers);
                await_stopped(&draw_ack_rx, drawers, "draw")
            });
        join_all(handles).and(shutdown)
    })
    .map_err(|_| RenderError::WorkerPanicked)?
}
