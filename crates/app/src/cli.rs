//! Hand-rolled argument parsing for the annotate binary.

use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result, anyhow, bail};
use vision_client::{AnnotatorConfig, FeatureKind, FeatureSet};

const USAGE: &str = "Usage: annotate --key <api-key> [--url <base-url>] \
[--timeout <secs>] [--max-width <px>] [--max-height <px>] [--max-results <n>] \
[--insecure] [--dump <dir>] [--verbose] <image>...\n\nThe API key may also be \
supplied via the VISION_API_KEY environment variable.";

pub struct AnnotateArgs {
    pub config: AnnotatorConfig,
    pub inputs: Vec<PathBuf>,
    pub verbose: bool,
}

impl AnnotateArgs {
    pub fn from_args(args: &[String]) -> Result<Self> {
        let mut key = std::env::var("VISION_API_KEY").ok();
        let mut base_url: Option<String> = None;
        let mut timeout_secs: Option<u64> = None;
        let mut max_width: Option<u32> = None;
        let mut max_height: Option<u32> = None;
        let mut max_results: Option<u32> = None;
        let mut insecure = false;
        let mut dump_dir: Option<PathBuf> = None;
        let mut verbose = false;
        let mut inputs: Vec<PathBuf> = Vec::new();

        let mut idx = 1;
        while idx < args.len() {
            match args[idx].as_str() {
                "--key" => {
                    idx += 1;
                    let value = args
                        .get(idx)
                        .ok_or_else(|| anyhow!("--key requires a value"))?
                        .clone();
                    key = Some(value);
                    idx += 1;
                }
                "--url" => {
                    idx += 1;
                    let value = args
                        .get(idx)
                        .ok_or_else(|| anyhow!("--url requires a value"))?
                        .clone();
                    base_url = Some(value);
                    idx += 1;
                }
                "--timeout" => {
                    idx += 1;
                    let value = args
                        .get(idx)
                        .ok_or_else(|| anyhow!("--timeout requires a value"))?
                        .parse::<u64>()
                        .with_context(|| "--timeout must be a number of seconds".to_string())?;
                    if value == 0 {
                        bail!("--timeout must be at least 1 second");
                    }
                    timeout_secs = Some(value);
                    idx += 1;
                }
                "--max-width" => {
                    idx += 1;
                    let value = args
                        .get(idx)
                        .ok_or_else(|| anyhow!("--max-width requires a value"))?
                        .parse::<u32>()
                        .with_context(|| "--max-width must be a positive integer".to_string())?;
                    if value == 0 {
                        bail!("--max-width must be a positive integer");
                    }
                    max_width = Some(value);
                    idx += 1;
                }
                "--max-height" => {
                    idx += 1;
                    let value = args
                        .get(idx)
                        .ok_or_else(|| anyhow!("--max-height requires a value"))?
                        .parse::<u32>()
                        .with_context(|| "--max-height must be a positive integer".to_string())?;
                    if value == 0 {
                        bail!("--max-height must be a positive integer");
                    }
                    max_height = Some(value);
                    idx += 1;
                }
                "--max-results" => {
                    idx += 1;
                    let value = args
                        .get(idx)
                        .ok_or_else(|| anyhow!("--max-results requires a value"))?
                        .parse::<u32>()
                        .with_context(|| "--max-results must be a positive integer".to_string())?;
                    if value == 0 {
                        bail!("--max-results must be at least 1");
                    }
                    max_results = Some(value);
                    idx += 1;
                }
                "--insecure" => {
                    insecure = true;
                    idx += 1;
                }
                "--dump" => {
                    idx += 1;
                    let value = args
                        .get(idx)
                        .ok_or_else(|| anyhow!("--dump requires a directory"))?
                        .clone();
                    dump_dir = Some(PathBuf::from(value));
                    idx += 1;
                }
                "--verbose" => {
                    verbose = true;
                    idx += 1;
                }
                arg if arg.starts_with('-') => {
                    bail!("Unrecognised flag: {arg}\n\n{USAGE}");
                }
                other => {
                    inputs.push(PathBuf::from(other));
                    idx += 1;
                }
            }
        }

        let key = key.ok_or_else(|| {
            anyhow!("Missing API key. Provide --key <api-key> or set VISION_API_KEY.\n\n{USAGE}")
        })?;
        if inputs.is_empty() {
            bail!("No input images given.\n\n{USAGE}");
        }

        let mut config = AnnotatorConfig::new(key);
        if let Some(url) = base_url {
            // The annotate path is appended verbatim, so keep the slash.
            config.base_url = if url.ends_with('/') {
                url
            } else {
                format!("{url}/")
            };
        }
        if let Some(secs) = timeout_secs {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(width) = max_width {
            config.max_width = width;
        }
        if let Some(height) = max_height {
            config.max_height = height;
        }
        if let Some(n) = max_results {
            config.features = FeatureKind::ALL
                .into_iter()
                .fold(FeatureSet::empty(), |set, kind| set.with(kind, n));
        }
        config.accept_invalid_certs = insecure;
        config.dump_dir = dump_dir;

        Ok(Self {
            config,
            inputs,
            verbose,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<String> {
        std::iter::once("annotate")
            .chain(parts.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn parses_flags_and_positional_inputs() {
        let args = AnnotateArgs::from_args(&argv(&[
            "--key",
            "k",
            "--timeout",
            "5",
            "--max-results",
            "2",
            "photo.png",
            "other.jpg",
        ]))
        .unwrap();
        assert_eq!(args.config.request_timeout, Duration::from_secs(5));
        assert_eq!(
            args.config.features.max_results(FeatureKind::FaceDetection),
            Some(2)
        );
        assert_eq!(args.inputs.len(), 2);
    }

    #[test]
    fn base_url_is_normalised_with_a_trailing_slash() {
        let args = AnnotateArgs::from_args(&argv(&[
            "--key",
            "k",
            "--url",
            "http://localhost:8080",
            "a.png",
        ]))
        .unwrap();
        assert_eq!(args.config.base_url, "http://localhost:8080/");
    }

    #[test]
    fn rejects_unknown_flags_and_missing_inputs() {
        assert!(AnnotateArgs::from_args(&argv(&["--key", "k", "--bogus", "a.png"])).is_err());
        assert!(AnnotateArgs::from_args(&argv(&["--key", "k"])).is_err());
    }
}
