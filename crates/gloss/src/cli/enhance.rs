//! The `gloss enhance` command: upload local photos and save the enhanced results.

use clap::Args;
use futures_util::future::join_all;
use gloss_core::normalize::decode_data_uri;
use gloss_core::session::{LocalId, Severity, UploadedImage};
use gloss_core::{ApiClient, Config, FileDiscovery, ImageStatus, SessionDriver, SessionSignal};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Arguments for the `enhance` command.
#[derive(Args, Debug)]
pub struct EnhanceArgs {
    /// Image files or directories to enhance
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Server base URL (overrides client.server_url)
    #[arg(short, long, env = "GLOSS_SERVER")]
    pub server: Option<String>,

    /// Directory the enhanced images are written to
    #[arg(short, long, default_value = ".")]
    pub output: String,

    /// Only upload; skip beautification
    #[arg(long)]
    pub no_beautify: bool,
}

/// Execute the enhance command.
pub async fn execute(args: EnhanceArgs, config: Config) -> anyhow::Result<()> {
    let server_url = args
        .server
        .clone()
        .unwrap_or_else(|| config.client.server_url.clone());
    let output_dir = PathBuf::from(shellexpand::tilde(&args.output).as_ref());

    let files = FileDiscovery::new(&config.client).discover_all(&args.inputs);
    if files.is_empty() {
        anyhow::bail!("No supported images found in the given paths");
    }
    tracing::info!(
        "Found {} images ({:.1} MB)",
        files.len(),
        FileDiscovery::total_size(&files) as f64 / 1_000_000.0
    );
    std::fs::create_dir_all(&output_dir)?;

    let client = ApiClient::new(&server_url);
    match client.health().await {
        Ok(health) => tracing::debug!("Connected to Gloss server v{}", health.version),
        Err(e) => tracing::warn!("Server at {server_url} did not answer the health check: {e}"),
    }

    let (driver, signals) = SessionDriver::new(Arc::new(client), &config.client);
    let multi = MultiProgress::new();
    let mut bars = HashMap::new();
    let mut ids = Vec::new();
    for file in &files {
        match driver.add_file(&file.path).await {
            Ok(id) => {
                bars.insert(id, multi.add(create_progress_bar(&file.path)));
                ids.push(id);
            }
            Err(e) => tracing::error!("Skipping {}: {e}", file.path.display()),
        }
    }

    let renderer = tokio::spawn(render_signals(signals, multi, bars));

    let start = std::time::Instant::now();
    let beautify = !args.no_beautify;
    let results = join_all(ids.iter().map(|&id| {
        let driver = driver.clone();
        async move { (id, driver.process(id, beautify).await) }
    }))
    .await;
    let images = driver.images();
    // Closing every sender ends the renderer
    drop(driver);
    let _ = renderer.await;

    let mut succeeded = 0u64;
    let mut failed = 0u64;
    let mut written = 0u64;
    let mut taken = HashSet::new();
    for (id, result) in results {
        let name = images
            .iter()
            .find(|img| img.local_id == id)
            .map(|img| img.file.name.as_str())
            .unwrap_or("image");
        match result {
            Ok(image) => match save_enhanced(&image, &output_dir, &mut taken) {
                Ok(count) => {
                    succeeded += 1;
                    written += count as u64;
                }
                Err(e) => {
                    failed += 1;
                    tracing::error!("Failed to save results for {name}: {e}");
                }
            },
            Err(e) => {
                failed += 1;
                tracing::debug!("{name} failed: {e}");
            }
        }
    }

    print_summary(succeeded, failed, written, &output_dir, start.elapsed());
    Ok(())
}

/// Write every enhanced preview of `image` into `dir`, returning how many were written.
///
/// `taken` collects the paths written this run so images sharing a stem never
/// overwrite each other.
fn save_enhanced(
    image: &UploadedImage,
    dir: &Path,
    taken: &mut HashSet<PathBuf>,
) -> anyhow::Result<usize> {
    let Some(enhanced) = &image.enhanced else {
        return Ok(0);
    };
    let stem = image
        .file
        .path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());

    let mut written = 0;
    for (i, uri) in enhanced.iter().enumerate() {
        let Some((_, bytes)) = decode_data_uri(uri) else {
            tracing::warn!("Enhanced result {} for {} is not a data URI", i + 1, image.file.name);
            continue;
        };
        let path = output_path(dir, &stem, i, taken);
        std::fs::write(&path, bytes)?;
        tracing::info!("Saved {}", path.display());
        taken.insert(path);
        written += 1;
    }
    Ok(written)
}

/// `<stem>_enhanced_<n>.png`, numbered from 1. Falls back to
/// `<stem>_<copy>_enhanced_<n>.png` when the name is already on disk or
/// was written earlier in this run.
fn output_path(dir: &Path, stem: &str, index: usize, taken: &HashSet<PathBuf>) -> PathBuf {
    let n = index + 1;
    let mut path = dir.join(format!("{stem}_enhanced_{n}.png"));
    let mut copy = 2;
    while taken.contains(&path) || path.exists() {
        path = dir.join(format!("{stem}_{copy}_enhanced_{n}.png"));
        copy += 1;
    }
    path
}

/// Drive the progress bars from session signals until the session is dropped.
async fn render_signals(
    mut signals: mpsc::UnboundedReceiver<SessionSignal>,
    multi: MultiProgress,
    bars: HashMap<LocalId, ProgressBar>,
) {
    while let Some(signal) = signals.recv().await {
        match signal {
            SessionSignal::Status { local_id, status } => {
                if let Some(bar) = bars.get(&local_id) {
                    if status == ImageStatus::Completed {
                        bar.finish_with_message(status.label());
                    } else {
                        bar.set_message(status.label());
                    }
                }
            }
            SessionSignal::Progress { local_id, progress } => {
                if let Some(bar) = bars.get(&local_id) {
                    bar.set_position(progress.round() as u64);
                }
            }
            SessionSignal::Notice(notice) => {
                if notice.severity == Severity::Error {
                    let _ = multi.println(format!("{}: {}", notice.title, notice.description));
                    if let Some(bar) = bars.get(&notice.local_id) {
                        bar.abandon_with_message(notice.title);
                    }
                } else {
                    tracing::debug!("{}: {}", notice.title, notice.description);
                }
            }
            SessionSignal::Removed { local_id } => {
                if let Some(bar) = bars.get(&local_id) {
                    bar.finish_and_clear();
                }
            }
        }
    }
}

/// Create a per-image progress bar (0-100%).
fn create_progress_bar(path: &Path) -> ProgressBar {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} {prefix:<24} [{bar:30.cyan/blue}] {pos:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-"),
    );
    pb.set_prefix(name);
    pb.set_message(ImageStatus::Added.label());
    pb
}

/// Print a formatted summary table after the run.
fn print_summary(
    succeeded: u64,
    failed: u64,
    written: u64,
    output_dir: &Path,
    elapsed: std::time::Duration,
) {
    let total = succeeded + failed;

    eprintln!();
    eprintln!("  ====================================");
    eprintln!("               Summary");
    eprintln!("  ====================================");
    eprintln!("    Succeeded:    {:>8}", succeeded);
    if failed > 0 {
        eprintln!("    Failed:       {:>8}", failed);
    }
    eprintln!("    Saved:        {:>8}", written);
    eprintln!("  ------------------------------------");
    eprintln!("    Total:        {:>8}", total);
    eprintln!("    Duration:     {:>7.1}s", elapsed.as_secs_f64());
    eprintln!("    Output:       {}", output_dir.display());
    eprintln!("  ====================================");
}
