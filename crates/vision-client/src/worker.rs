//! The background annotation worker: queue discipline, the per-image cycle,
//! and latest-result publication.
//!
//! One named thread owns the whole pipeline. Producers hand images over a
//! bounded channel and never block; the consumer clones the latest published
//! result out of a mutex-guarded slot. A failed cycle is reported to the
//! observer and leaves the slot untouched, so readers keep seeing the
//! previous (stale) result rather than an error.

use std::{
    fs,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::Instant,
};

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded, select};
use tracing::{debug, error, info, warn};

use crate::{
    config::AnnotatorConfig,
    data::{AnnotationResult, ImageBuffer, SharedResult},
    encode,
    error::AnnotateError,
    parse, preprocess,
    transport::{HttpTransport, Transport},
};

const CONTENT_TYPE_JSON: &str = "application/json";

/// Hook notified after every cycle. Implementations run on the worker thread
/// and should return quickly.
pub trait CycleObserver: Send {
    fn cycle_completed(&self, _result: &AnnotationResult) {}
    fn cycle_failed(&self, _error: &AnnotateError) {}
}

/// Default observer: route cycle outcomes to tracing.
struct LogObserver;

impl CycleObserver for LogObserver {
    fn cycle_completed(&self, result: &AnnotationResult) {
        debug!(
            width = result.width,
            height = result.height,
            labels = result.label_annotations.len(),
            texts = result.text_annotations.len(),
            faces = result.face_annotations.len(),
            "annotation cycle completed"
        );
    }

    fn cycle_failed(&self, error: &AnnotateError) {
        warn!("annotation cycle failed: {error}");
    }
}

/// Handle to the background worker. Owns the thread by composition; dropping
/// the handle stops the loop and joins it.
pub struct AnnotationWorker {
    submit_tx: Sender<ImageBuffer>,
    stop_tx: Sender<()>,
    stopped: Arc<AtomicBool>,
    latest: SharedResult,
    handle: Mutex<Option<thread::JoinHandle<()>>>,
}

impl AnnotationWorker {
    /// Spawn the worker with the production HTTP transport and the default
    /// tracing observer.
    pub fn spawn(config: AnnotatorConfig) -> Result<Self, AnnotateError> {
        let transport = HttpTransport::new(config.request_timeout, config.accept_invalid_certs)?;
        Ok(Self::spawn_with(
            config,
            Box::new(transport),
            Box::new(LogObserver),
        ))
    }

    /// Spawn with an explicit transport and observer. This is the seam used
    /// by the integration tests and by embedders that want richer reporting.
    pub fn spawn_with(
        config: AnnotatorConfig,
        transport: Box<dyn Transport>,
        observer: Box<dyn CycleObserver>,
    ) -> Self {
        let (submit_tx, submit_rx) = bounded::<ImageBuffer>(config.queue_capacity.max(1));
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let stopped = Arc::new(AtomicBool::new(false));
        let latest: SharedResult = Arc::new(Mutex::new(None));

        let handle = thread::Builder::new()
            .name("annotation-worker".into())
            .spawn({
                let latest = latest.clone();
                let stopped = stopped.clone();
                move || run_loop(config, transport, observer, submit_rx, stop_rx, latest, stopped)
            })
            .expect("failed to spawn annotation worker thread");

        Self {
            submit_tx,
            stop_tx,
            stopped,
            latest,
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Enqueue an image for annotation. Never blocks: a stopped worker yields
    /// `Stopped`, a saturated queue yields `QueueFull`. Queued images are
    /// processed one at a time in submission order; nothing is coalesced, so
    /// callers that only ever want the newest frame annotated should pace
    /// their submissions.
    pub fn submit(&self, image: ImageBuffer) -> Result<(), AnnotateError> {
        if self.stopped.load(Ordering::SeqCst) {
            return Err(AnnotateError::Stopped);
        }
        match self.submit_tx.try_send(image) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(AnnotateError::QueueFull),
            Err(TrySendError::Disconnected(_)) => Err(AnnotateError::Stopped),
        }
    }

    /// Snapshot of the most recently published result, or `None` before the
    /// first successful cycle. Never observes a partially written value.
    pub fn latest(&self) -> Option<AnnotationResult> {
        self.latest.lock().ok().and_then(|guard| guard.clone())
    }

    /// Signal the loop to exit after its current cycle. Idempotent and safe
    /// from any thread, including while an HTTP call is in flight; pending
    /// queued images are discarded and the slot is never written again.
    pub fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.stop_tx.try_send(());
    }

    /// Block until the worker thread has exited.
    pub fn join(&self) {
        if let Ok(mut guard) = self.handle.lock() {
            if let Some(handle) = guard.take() {
                let _ = handle.join();
            }
        }
    }
}

impl Drop for AnnotationWorker {
    fn drop(&mut self) {
        self.stop();
        self.join();
    }
}

fn run_loop(
    config: AnnotatorConfig,
    transport: Box<dyn Transport>,
    observer: Box<dyn CycleObserver>,
    submit_rx: Receiver<ImageBuffer>,
    stop_rx: Receiver<()>,
    latest: SharedResult,
    stopped: Arc<AtomicBool>,
) {
    info!(
        endpoint = %config.base_url,
        key = %config.redacted_key(),
        features = config.features.len(),
        "annotation worker started"
    );

    loop {
        // Blocks until work or shutdown; no busy-polling on an empty queue.
        let image = select! {
            recv(submit_rx) -> msg => match msg {
                Ok(image) => image,
                Err(_) => break,
            },
            recv(stop_rx) -> _ => break,
        };
        if stopped.load(Ordering::SeqCst) {
            break;
        }
        metrics::gauge!("annotate_queue_depth").set(submit_rx.len() as f64);

        match run_cycle(&config, transport.as_ref(), image) {
            Ok(Some(result)) => {
                if stopped.load(Ordering::SeqCst) {
                    break;
                }
                observer.cycle_completed(&result);
                if let Ok(mut guard) = latest.lock() {
                    *guard = Some(result);
                }
                metrics::counter!("annotate_cycles_total", "outcome" => "ok").increment(1);
            }
            Ok(None) => {
                debug!("response carried no annotations; keeping previous result");
                metrics::counter!("annotate_cycles_total", "outcome" => "empty").increment(1);
            }
            Err(err) => {
                observer.cycle_failed(&err);
                metrics::counter!("annotate_cycles_total", "outcome" => "error").increment(1);
            }
        }
    }

    stopped.store(true, Ordering::SeqCst);
    debug!("annotation worker stopped");
}

/// One full pass over a dequeued image: preprocess, encode, POST, parse.
fn run_cycle(
    config: &AnnotatorConfig,
    transport: &dyn Transport,
    image: ImageBuffer,
) -> Result<Option<AnnotationResult>, AnnotateError> {
    let cycle_start = Instant::now();

    let image = preprocess::downsample(image, config.max_width, config.max_height)?;
    let (width, height) = (image.width, image.height);

    let png = encode::compress_png(&image)?;
    let body = encode::build_request(&png, &config.features);
    dump(config, "request.json", body.as_bytes());

    let reply = transport.post(&config.endpoint(), body.into_bytes(), CONTENT_TYPE_JSON)?;
    debug!(status = reply.status, reason = %reply.reason, "annotation response");
    dump(config, "result.json", &reply.body);

    if let Some(location) = &reply.location {
        warn!(location = %location, "annotation endpoint redirected");
    }
    if !reply.is_success() {
        return Err(AnnotateError::Status {
            code: reply.status,
            reason: reply.reason,
        });
    }

    let result = parse::parse_response(&reply.body, width, height)?;
    metrics::histogram!("annotate_cycle_seconds").record(cycle_start.elapsed().as_secs_f64());
    Ok(result)
}

/// Best-effort debug dump of wire payloads; failures only warn.
fn dump(config: &AnnotatorConfig, name: &str, bytes: &[u8]) {
    let Some(dir) = &config.dump_dir else {
        return;
    };
    let path = dir.join(name);
    if let Err(err) = fs::write(&path, bytes) {
        error!("failed to write {}: {err}", path.display());
    }
}
