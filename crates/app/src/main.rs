//! Reference front-end for the annotation worker: load image files, submit
//! them, print each published result as JSON, then shut the worker down.

mod cli;
mod telemetry;

use std::{path::Path, sync::mpsc, time::Duration};

use anyhow::{Context, Result};
use tracing::{error, info};
use vision_client::{
    AnnotateError, AnnotationResult, AnnotationWorker, CycleObserver, HttpTransport, ImageBuffer,
    PixelFormat,
};

fn main() {
    if let Err(err) = run() {
        eprintln!("{err:?}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let options = cli::AnnotateArgs::from_args(&args)?;
    telemetry::init(options.verbose);

    let transport = HttpTransport::new(
        options.config.request_timeout,
        options.config.accept_invalid_certs,
    )?;
    let (done_tx, done_rx) = mpsc::channel();
    let worker = AnnotationWorker::spawn_with(
        options.config.clone(),
        Box::new(transport),
        Box::new(PrintObserver { done: done_tx }),
    );

    for input in &options.inputs {
        let image =
            load_image(input).with_context(|| format!("failed to load {}", input.display()))?;
        info!(
            path = %input.display(),
            width = image.width,
            height = image.height,
            "submitting image"
        );
        worker.submit(image)?;
    }

    // Each submission produces exactly one cycle; wait them out, bounded by
    // the transport timeout plus slack.
    let wait = options.config.request_timeout + Duration::from_secs(10);
    for _ in 0..options.inputs.len() {
        done_rx
            .recv_timeout(wait)
            .context("timed out waiting for an annotation cycle")?;
    }

    worker.stop();
    worker.join();
    Ok(())
}

/// Prints completed results to stdout and failures to the log, then wakes the
/// main thread.
struct PrintObserver {
    done: mpsc::Sender<()>,
}

impl CycleObserver for PrintObserver {
    fn cycle_completed(&self, result: &AnnotationResult) {
        match serde_json::to_string_pretty(result) {
            Ok(text) => println!("{text}"),
            Err(err) => error!("failed to serialize result: {err}"),
        }
        let _ = self.done.send(());
    }

    fn cycle_failed(&self, error: &AnnotateError) {
        error!("annotation failed: {error}");
        let _ = self.done.send(());
    }
}

fn load_image(path: &Path) -> Result<ImageBuffer> {
    let decoded = image::open(path)?.to_rgb8();
    let (width, height) = decoded.dimensions();
    Ok(ImageBuffer::new(
        decoded.into_raw(),
        width,
        height,
        PixelFormat::Rgb8,
    ))
}
