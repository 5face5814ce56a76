//! CLI binary for ocrstamp.
//!
//! A thin shim over the library crate that maps CLI flags to `OcrConfig`,
//! dispatches on the input path (file → single-image recognition, folder →
//! batch annotation), and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use ocrstamp::{
    default_output_dir, process_folder, recognize_file, BatchProgressCallback, OcrConfig,
    ProgressCallback,
};
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

/// Truncate to `max` characters on char boundaries (recognized text is often
/// CJK; byte slicing would panic mid-glyph).
fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{kept}\u{2026}")
    }
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: renders a live progress bar and per-file log
/// lines using [indicatif]. Files are processed strictly in order, so lines
/// always appear in batch order.
struct CliProgressCallback {
    /// The single progress bar anchored at the bottom of the terminal.
    bar: ProgressBar,
    /// Per-file wall-clock start times for elapsed reporting on errors.
    start_times: Mutex<HashMap<usize, Instant>>,
    /// Count of files that errored out.
    errors: AtomicUsize,
}

impl CliProgressCallback {
    /// Create a callback whose progress-bar length is set dynamically
    /// by `on_batch_start` (called once the folder has been listed).
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0); // length set in on_batch_start

        // Initial style: spinner only (no counter until we know the total).
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Listing folder…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    /// Switch to the full progress-bar style once we know `total`.
    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} files  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Annotating");
        self.bar.reset_eta();
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_files: usize) {
        // Switch from spinner-only style to full progress bar now that we
        // know the actual file count.
        self.activate_bar(total_files);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Starting OCR of {total_files} files…"))
        ));
    }

    fn on_file_start(&self, index: usize, _total: usize, file_name: &str) {
        self.start_times
            .lock()
            .unwrap()
            .insert(index, Instant::now());
        self.bar.set_message(file_name.to_string());
    }

    fn on_file_complete(
        &self,
        index: usize,
        total: usize,
        file_name: &str,
        text: &str,
        duration_ms: u64,
    ) {
        self.start_times.lock().unwrap().remove(&index);

        self.bar.println(format!(
            "  {} {:>3}/{:<3} {:<24} {}  {}",
            green("✓"),
            index,
            total,
            truncate_chars(file_name, 24),
            dim(&truncate_chars(&text.replace('\n', " "), 40)),
            dim(&format!("{:.1}s", duration_ms as f64 / 1000.0)),
        ));
        self.bar.inc(1);
    }

    fn on_file_error(&self, index: usize, total: usize, file_name: &str, error: &str) {
        let elapsed_ms = self
            .start_times
            .lock()
            .unwrap()
            .remove(&index)
            .map(|t| t.elapsed().as_millis())
            .unwrap_or(0);

        self.errors.fetch_add(1, Ordering::SeqCst);

        self.bar.println(format!(
            "  {} {:>3}/{:<3} {:<24} {}  {}",
            red("✗"),
            index,
            total,
            truncate_chars(file_name, 24),
            red(&truncate_chars(error, 80)),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total_files: usize, success_count: usize) {
        let failed = total_files.saturating_sub(success_count);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} files annotated successfully",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} files annotated  ({} failed)",
                if failed == total_files {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&success_count.to_string()),
                total_files,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Annotate every image in a folder (output: <folder>_output)
  ocrstamp latex_ocr_200

  # Choose the output folder
  ocrstamp latex_ocr_200 -o annotated

  # Point at a different endpoint and model
  ocrstamp --base-url http://localhost:8000/v1 --model Qwen2-VL-7B-Instruct scans

  # Single image: recognized text to stdout, no annotation
  ocrstamp page_042.jpg

  # Use a real font and wider lines for the header
  ocrstamp --font /usr/share/fonts/truetype/dejavu/DejaVuSans.ttf --wrap-width 80 scans

  # JSON summary of a batch run
  ocrstamp --json scans > run.json

ENDPOINT:
  Any OpenAI-compatible /chat/completions server with a vision model works
  (vLLM, LMDeploy, llama.cpp server, …). Point --base-url at it and name the
  model with --model. Self-hosted endpoints that skip auth accept the default
  placeholder API key.

ENVIRONMENT VARIABLES:
  OCRSTAMP_BASE_URL     Endpoint base URL (default http://10.10.7.3:37000/v1)
  API_PORT              Port override for the default base URL
  OCRSTAMP_API_KEY      Bearer API key (default "0", fine for no-auth servers)
  OCRSTAMP_MODEL        Vision model ID (default Qwen2-VL-7B-Instruct)
  OCRSTAMP_FONT         TrueType font for the text header (default arial.ttf;
                        missing font falls back to built-in bitmap glyphs)
  RUST_LOG              Tracing filter, overrides -v/-q

OUTPUT:
  Each processed image is written to the output folder under its original
  file name, with the recognized text rendered in a white band above the
  image. Files that fail (unreadable, endpoint error) are reported and
  skipped; the batch always runs to the end.
"#;

/// Stamp images with VLM-recognized text headers.
#[derive(Parser, Debug)]
#[command(
    name = "ocrstamp",
    version,
    about = "Stamp images with VLM-recognized text headers",
    long_about = "Run a folder of images through a vision-language model for OCR and write each \
image back out with its recognized text rendered above it. Point it at a single image instead \
to print the recognized text without annotating anything.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Image folder to annotate, or a single image file to recognize.
    input: PathBuf,

    /// Output folder for annotated images (default: <input>_output).
    #[arg(short, long, env = "OCRSTAMP_OUTPUT")]
    output: Option<PathBuf>,

    /// Chat-completions endpoint base URL, without /chat/completions.
    #[arg(long, env = "OCRSTAMP_BASE_URL")]
    base_url: Option<String>,

    /// Bearer API key ("0" works for endpoints without auth).
    #[arg(long, env = "OCRSTAMP_API_KEY")]
    api_key: Option<String>,

    /// Vision model identifier.
    #[arg(long, env = "OCRSTAMP_MODEL")]
    model: Option<String>,

    /// Max tokens the model may generate per image.
    #[arg(long, env = "OCRSTAMP_MAX_TOKENS", default_value_t = 300)]
    max_tokens: u32,

    /// Total OCR calls per image, counting the first.
    #[arg(long, env = "OCRSTAMP_MAX_ATTEMPTS", default_value_t = 3)]
    max_attempts: u32,

    /// Minimum image width in pixels; smaller images are upscaled first.
    #[arg(long, env = "OCRSTAMP_MIN_WIDTH", default_value_t = 28)]
    min_width: u32,

    /// Minimum image height in pixels; smaller images are upscaled first.
    #[arg(long, env = "OCRSTAMP_MIN_HEIGHT", default_value_t = 28)]
    min_height: u32,

    /// Max characters per wrapped header line.
    #[arg(long, env = "OCRSTAMP_WRAP_WIDTH", default_value_t = 60)]
    wrap_width: usize,

    /// Cap on wrapped header lines; longer text is cut off.
    #[arg(long, env = "OCRSTAMP_MAX_LINES", default_value_t = 120)]
    max_lines: usize,

    /// TrueType font for the header (falls back to bitmap glyphs if missing).
    #[arg(long, env = "OCRSTAMP_FONT", default_value = "arial.ttf")]
    font: PathBuf,

    /// Header font size in pixels.
    #[arg(long, env = "OCRSTAMP_FONT_SIZE", default_value_t = 20.0)]
    font_size: f32,

    /// Padding in pixels around the header text block.
    #[arg(long, env = "OCRSTAMP_PADDING", default_value_t = 10,
          value_parser = clap::value_parser!(u32).range(..=1024))]
    padding: u32,

    /// Override the system prompt sent to the model.
    #[arg(long, env = "OCRSTAMP_SYSTEM_PROMPT")]
    system_prompt: Option<String>,

    /// Override the user prompt sent alongside the image.
    #[arg(long, env = "OCRSTAMP_USER_PROMPT")]
    user_prompt: Option<String>,

    /// Per-request timeout in seconds (default: transport default).
    #[arg(long, env = "OCRSTAMP_TIMEOUT")]
    timeout: Option<u64>,

    /// Output the batch summary as structured JSON instead of a text report.
    #[arg(long, env = "OCRSTAMP_JSON")]
    json: bool,

    /// Disable the progress bar.
    #[arg(long, env = "OCRSTAMP_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "OCRSTAMP_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "OCRSTAMP_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Dispatch on the input path ───────────────────────────────────────
    let meta = std::fs::metadata(&cli.input)
        .with_context(|| format!("Cannot access input path {:?}", cli.input))?;

    if meta.is_file() {
        return run_single(&cli).await;
    }
    run_batch(&cli, show_progress).await
}

/// Single-image mode: one OCR call, recognized text to stdout.
async fn run_single(cli: &Cli) -> Result<()> {
    let config = build_config(cli, None)?;
    let text = recognize_file(&cli.input, &config)
        .await
        .context("Recognition failed")?;

    if cli.json {
        let value = serde_json::json!({
            "file": cli.input.display().to_string(),
            "text": text,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&value).context("Failed to serialise output")?
        );
    } else {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(text.as_bytes())
            .context("Failed to write to stdout")?;
        if !text.ends_with('\n') {
            handle.write_all(b"\n").ok();
        }
    }
    Ok(())
}

/// Batch mode: annotate the whole folder.
async fn run_batch(cli: &Cli, show_progress: bool) -> Result<()> {
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn BatchProgressCallback>)
    } else {
        None
    };

    let config = build_config(cli, progress_cb)?;
    let output_dir = cli
        .output
        .clone()
        .unwrap_or_else(|| default_output_dir(&cli.input));

    let output = process_folder(&cli.input, &output_dir, &config)
        .await
        .context("Batch failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else if !cli.quiet && !show_progress {
        // Only print inline stats when the progress callback is disabled
        // (the callback already printed the final green/red tick).
        eprintln!(
            "Annotated {}/{} files in {}ms  →  {}",
            output.stats.processed_files,
            output.stats.total_files,
            output.stats.total_duration_ms,
            output_dir.display()
        );
        for file in output.files.iter().filter(|f| !f.is_success()) {
            if let Some(ref e) = file.error {
                eprintln!("  failed: {e}");
            }
        }
    } else if !cli.quiet {
        eprintln!(
            "   {}  —  {}ms total",
            dim(&format!("→ {}", output_dir.display())),
            output.stats.total_duration_ms,
        );
    }

    // Non-zero exit when any file failed; per-file messages were already
    // reported above.
    output.into_result().context("Batch finished with failures")?;
    Ok(())
}

/// Map CLI args to `OcrConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<OcrConfig> {
    let mut builder = OcrConfig::builder()
        .max_tokens(cli.max_tokens)
        .max_attempts(cli.max_attempts)
        .min_width(cli.min_width)
        .min_height(cli.min_height)
        .wrap_width(cli.wrap_width)
        .max_text_lines(cli.max_lines)
        .font_path(cli.font.clone())
        .font_size(cli.font_size)
        .padding(cli.padding);

    if let Some(ref url) = cli.base_url {
        builder = builder.base_url(url);
    }
    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key);
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref prompt) = cli.system_prompt {
        builder = builder.system_prompt(prompt);
    }
    if let Some(ref prompt) = cli.user_prompt {
        builder = builder.user_prompt(prompt);
    }
    if let Some(secs) = cli.timeout {
        builder = builder.request_timeout_secs(secs);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
