//! CLI binary for edgequake-img2latex.
//!
//! A thin shim over the library crate: maps CLI flags to `ExtractorConfig`,
//! runs one extraction per image into a single `Session`, and prints the
//! session's result.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_img2latex::pipeline::encode::DEFAULT_JPEG_QUALITY;
use edgequake_img2latex::pipeline::input::load_image;
use edgequake_img2latex::{
    display, inspect, ExtractionError, ExtractionProgressCallback, Extractor, ExtractorConfig,
    Img2LatexError, ProgressCallback, Session,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
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
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}

// ── CLI busy indicator using indicatif ───────────────────────────────────────

/// Spinner shown while an extraction is in flight.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::hidden();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        Arc::new(Self { bar })
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_extraction_start(&self, image: &str) {
        self.bar.set_draw_target(indicatif::ProgressDrawTarget::stderr());
        self.bar.reset();
        self.bar.set_prefix("Processing image…");
        self.bar.set_message(image.to_string());
        self.bar.enable_steady_tick(Duration::from_millis(80));
    }

    fn on_request_sent(&self, _image: &str, payload_bytes: usize) {
        self.bar
            .set_prefix(format!("Waiting for model ({} KiB sent)", payload_bytes / 1024));
    }

    fn on_extraction_complete(&self, image: &str, latex_len: usize) {
        let elapsed = self.bar.elapsed();
        self.bar.finish_and_clear();
        eprintln!(
            "{} {}  {}  {}",
            green("✓"),
            image,
            dim(&format!("{latex_len} chars")),
            dim(&format!("{:.1}s", elapsed.as_secs_f64())),
        );
    }

    fn on_extraction_error(&self, _image: &str, _error: &str) {
        // The banner is printed by the caller from the session notice.
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract LaTeX from one image
  img2latex equation.png

  # Several images in one session: the last successful one is shown
  img2latex first.png second.jpg

  # Interactive: one image path per line on stdin
  img2latex --interactive

  # Write the raw LaTeX to a file and an HTML page with the typeset formula
  img2latex equation.png -o equation.tex --html equation.html

  # Reject output that is not bare LaTeX
  img2latex --strict equation.png

  # Inspect the image only (no API key needed)
  img2latex --inspect-only equation.png

  # Use another provider through edgequake-llm
  img2latex --provider anthropic equation.png

PROVIDERS & FIXED VISION MODELS:
  openai (default)  gpt-4o
  anthropic         claude-sonnet-4-20250514
  gemini            gemini-2.0-flash
  mistral           pixtral-12b-2409
  ollama, lmstudio  llava

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key (required for the default provider)
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  MISTRAL_API_KEY         Mistral API key
  IMG2LATEX_PROVIDER      Provider override
  IMG2LATEX_API_BASE      OpenAI-compatible base URL
"#;

/// Extract LaTeX from equation images using Vision LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "img2latex",
    version,
    about = "Extract LaTeX from equation images using Vision LLMs",
    long_about = "Send an image of a mathematical equation (PNG or JPEG) to a Vision Language \
Model and print the LaTeX it returns, both verbatim and ready for a math renderer.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Image files (PNG/JPEG). Each is one extraction in the same session.
    #[arg(required_unless_present = "interactive")]
    images: Vec<PathBuf>,

    /// Read one image path per line from stdin.
    #[arg(short, long)]
    interactive: bool,

    /// Write the stored LaTeX (verbatim) to this file.
    #[arg(short, long, env = "IMG2LATEX_OUTPUT")]
    output: Option<PathBuf>,

    /// Write an HTML page with the code and the typeset formula.
    #[arg(long, env = "IMG2LATEX_HTML")]
    html: Option<PathBuf>,

    /// Print the stored result as JSON instead of text.
    #[arg(long)]
    json: bool,

    /// Print image metadata only, no extraction.
    #[arg(long, conflicts_with = "interactive")]
    inspect_only: bool,

    /// Reject output that is not bare LaTeX (delimiters, prose, …).
    #[arg(long, env = "IMG2LATEX_STRICT")]
    strict: bool,

    /// Provider: openai (default), anthropic, gemini, mistral, ollama, …
    #[arg(long, env = "IMG2LATEX_PROVIDER")]
    provider: Option<String>,

    /// OpenAI API key.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// OpenAI-compatible API base URL [default: https://api.openai.com/v1].
    #[arg(long, env = "IMG2LATEX_API_BASE")]
    api_base: Option<String>,

    /// JPEG quality of the re-encoded image (1–100).
    #[arg(long, env = "IMG2LATEX_JPEG_QUALITY", default_value_t = DEFAULT_JPEG_QUALITY,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    jpeg_quality: u8,

    /// Cap on completion tokens.
    #[arg(long, env = "IMG2LATEX_MAX_TOKENS")]
    max_tokens: Option<usize>,

    /// Disable the busy spinner.
    #[arg(long, env = "IMG2LATEX_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "IMG2LATEX_VERBOSE")]
    verbose: bool,

    /// Suppress all output except the result and errors.
    #[arg(short, long, env = "IMG2LATEX_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner already says what is happening; keep INFO logs out of its way.
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

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        for path in &cli.images {
            let meta = inspect(path)
                .await
                .with_context(|| format!("Failed to inspect {}", path.display()))?;
            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&meta).context("Failed to serialise metadata")?
                );
            } else {
                println!("File:       {}", path.display());
                println!("Format:     {:?}", meta.format);
                println!("Size:       {}×{} px", meta.width, meta.height);
                println!("Colour:     {}", meta.color);
                println!("Alpha:      {}", meta.has_alpha);
                println!("Bytes:      {}", meta.byte_len);
            }
        }
        return Ok(());
    }

    // ── Build extractor ──────────────────────────────────────────────────
    // A missing credential fails here, before any image is read.
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ExtractionProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;
    let extractor = Extractor::new(config).context("Failed to set up the vision provider")?;

    let mut session = Session::new();

    // ── Run extractions ──────────────────────────────────────────────────
    for path in &cli.images {
        run_one(&extractor, &mut session, path).await?;
    }

    if cli.interactive {
        if !cli.quiet {
            eprintln!(
                "{}",
                dim("Enter an image path per line (Ctrl-D to finish).")
            );
        }
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if run_one(&extractor, &mut session, Path::new(line)).await? && !cli.json {
                print_session(&session, cli.quiet)?;
            }
        }
    }

    // ── Output ───────────────────────────────────────────────────────────
    let Some(latest) = session.latest() else {
        anyhow::bail!(
            "No LaTeX extracted ({} attempt(s) failed)",
            session.extractions()
        );
    };

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(latest).context("Failed to serialise output")?
        );
    } else if !cli.interactive {
        print_session(&session, cli.quiet)?;
    }

    if let Some(ref path) = cli.output {
        display::write_atomic(path, &latest.latex).context("Failed to write LaTeX")?;
        if !cli.quiet {
            eprintln!("{} LaTeX  →  {}", green("✔"), bold(&path.display().to_string()));
        }
    }

    if let Some(ref path) = cli.html {
        display::write_atomic(path, &display::render_html(&session))
            .context("Failed to write HTML report")?;
        if !cli.quiet {
            eprintln!("{} HTML   →  {}", green("✔"), bold(&path.display().to_string()));
        }
    }

    Ok(())
}

/// Run one extraction into `session`, printing an error banner on failure.
///
/// Returns `true` when the session now holds a new result. Only fatal
/// errors (unreadable file) propagate; a bad image or a failed request is
/// shown and the session carries on.
async fn run_one(extractor: &Extractor, session: &mut Session, path: &Path) -> Result<bool> {
    let outcome = match load_image(path).await {
        Ok(image) => extractor.extract(&image).await,
        Err(Img2LatexError::Extraction(e)) => Err(e),
        Err(e @ Img2LatexError::FileNotFound { .. })
        | Err(e @ Img2LatexError::PermissionDenied { .. }) => {
            eprintln!("{} {}", red("✗"), red(&e.to_string()));
            return Ok(false);
        }
        Err(e) => return Err(e).with_context(|| format!("Failed to read {}", path.display())),
    };

    match session.apply(outcome) {
        Some(err) => {
            print_error_banner(path, err);
            Ok(false)
        }
        None => Ok(true),
    }
}

fn print_error_banner(path: &Path, err: &ExtractionError) {
    eprintln!(
        "{} {}  {}",
        red("✗"),
        path.display(),
        red(&format!("Error processing image: {err}"))
    );
}

/// Print the stored result: code block, then the render-ready variant.
fn print_session(session: &Session, quiet: bool) -> Result<()> {
    let Some(view) = display::view(session) else {
        return Ok(());
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if quiet {
        writeln!(out, "{}", view.code).context("Failed to write to stdout")?;
        return Ok(());
    }

    writeln!(out, "{}", bold("LaTeX Code")).context("Failed to write to stdout")?;
    writeln!(out, "{}", display::code_block(&view.code))?;
    writeln!(out)?;
    writeln!(out, "{}", bold("LaTeX Rendered"))?;
    writeln!(out, "{}", view.render.trim())?;

    if let Some(latest) = session.latest() {
        if !latest.warnings.is_empty() {
            let labels: Vec<&str> = latest.warnings.iter().map(|w| w.describe()).collect();
            writeln!(out, "{}", yellow(&format!("⚠ model output has {}", labels.join(", "))))?;
        }
    }
    Ok(())
}

/// Map CLI args to `ExtractorConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExtractorConfig> {
    let mut builder = ExtractorConfig::builder()
        .jpeg_quality(cli.jpeg_quality)
        .strict_output(cli.strict);

    if let Some(ref base) = cli.api_base {
        builder = builder.api_base(base.clone());
    }
    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key.clone());
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(n) = cli.max_tokens {
        builder = builder.max_tokens(n);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
