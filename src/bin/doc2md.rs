//! CLI binary for edgequake-doc2md.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig`, prints results, and starts the web form.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use edgequake_doc2md::server::{serve, AppState};
use edgequake_doc2md::{
    convert, inline_images, ConversionConfig, ConversionProgressCallback, ProgressCallback,
    Strategy,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::net::SocketAddr;
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

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner while the document converts, then a bar over the images being
/// captioned, with one log line per image.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Start of the caption currently in flight.
    caption_started: Mutex<Option<Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Checking input…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            caption_started: Mutex::new(None),
            errors: AtomicUsize::new(0),
        })
    }

    /// Switch to the full progress-bar style once we know how many images
    /// will be captioned.
    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} images  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_position(0);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Captioning");
        self.bar.reset_eta();
    }

    fn caption_elapsed(&self) -> f64 {
        self.caption_started
            .lock()
            .ok()
            .and_then(|mut started| started.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, input: &str, strategy: Strategy) {
        self.bar.set_prefix("Converting");
        self.bar.set_message(format!("{input} via {strategy}"));
    }

    fn on_extraction_complete(&self, images: usize) {
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Markdown written, {images} images extracted"))
        ));
    }

    fn on_caption_start(&self, index: usize, total: usize, image: &str) {
        if index == 1 {
            self.activate_bar(total);
        }
        if let Ok(mut started) = self.caption_started.lock() {
            *started = Some(Instant::now());
        }
        self.bar.set_message(image.to_string());
    }

    fn on_caption_complete(&self, index: usize, total: usize, image: &str, caption_len: usize) {
        let elapsed = self.caption_elapsed();
        self.bar.println(format!(
            "  {} Image {:>3}/{:<3}  {:<28}  {:<10}  {}",
            green("✓"),
            index,
            total,
            image,
            dim(&format!("{caption_len:>5} chars")),
            dim(&format!("{elapsed:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_caption_error(&self, index: usize, total: usize, image: &str, error: &str) {
        let elapsed = self.caption_elapsed();
        self.errors.fetch_add(1, Ordering::SeqCst);

        // Truncate very long error messages to keep output tidy.
        let msg = match error.char_indices().nth(79) {
            Some((cut, _)) => format!("{}\u{2026}", &error[..cut]),
            None => error.to_string(),
        };

        self.bar.println(format!(
            "  {} Image {:>3}/{:<3}  {:<28}  {}  {}",
            red("✗"),
            index,
            total,
            image,
            red(&msg),
            dim(&format!("{elapsed:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_conversion_complete(&self, images: usize, captioned: usize) {
        self.bar.finish_and_clear();
        let failed = self.errors.load(Ordering::SeqCst);
        if failed > 0 {
            eprintln!(
                "{} {}/{} images captioned  ({} failed)",
                if captioned == 0 { red("✘") } else { cyan("⚠") },
                bold(&captioned.to_string()),
                images,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert a Word document; writes out/manual.md and out/manual_media/
  doc2md convert manual.docx out

  # PDF text and images via pdfium
  doc2md convert slides.pdf out

  # Caption every extracted image with a vision model
  doc2md convert --caption guide.docx out

  # Print the Markdown with images embedded as data URIs
  doc2md convert --print --inline-images guide.odt out > guide.md

  # JSON summary (paths, images, captions, stats)
  doc2md convert --json report.pdf out

  # Web form on http://127.0.0.1:7860
  doc2md serve

SUPPORTED INPUTS:
  .pdf              pdfium (text + embedded raster images)
  anything else     pandoc (docx, odt, epub, html, rtf, rst, latex, …)

ENVIRONMENT VARIABLES:
  DOC2MD_PANDOC           Pandoc executable (default: pandoc on PATH)
  PDFIUM_LIB_PATH         pdfium shared library or the directory holding it
  DOC2MD_BIND             Web form address (default: 127.0.0.1:7860)
  DOC2MD_OUTPUT_DIR       Web form default output directory
  OPENAI_API_KEY          OpenAI API key (captioning)
  ANTHROPIC_API_KEY       Anthropic API key (captioning)
  GEMINI_API_KEY          Google Gemini API key (captioning)
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  RUST_LOG                Log filter (overrides --verbose / --quiet)

SETUP:
  pandoc:  https://pandoc.org/installing.html
  pdfium:  https://github.com/bblanchon/pdfium-binaries/releases
"#;

/// Convert documents to Markdown with extracted media and optional image captions.
#[derive(Parser, Debug)]
#[command(
    name = "doc2md",
    version,
    about = "Convert documents to Markdown with extracted media and optional VLM captions",
    long_about = "Convert PDF, DOCX, ODT, EPUB, HTML and other documents to Markdown. Embedded \
images are written to a <name>_media folder next to the Markdown file and can be captioned \
with a Vision Language Model (OpenAI, Anthropic, Gemini, Ollama, …).",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "DOC2MD_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "DOC2MD_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert one document into <output_directory>/<name>.md.
    Convert(ConvertArgs),
    /// Serve the upload form.
    Serve(ServeArgs),
}

#[derive(Args, Debug)]
struct ConvertArgs {
    /// Document to convert.
    input: PathBuf,

    /// Directory receiving <name>.md and <name>_media/.
    output_dir: PathBuf,

    /// Caption every extracted PNG/JPEG with a vision model.
    #[arg(long, env = "DOC2MD_CAPTION")]
    caption: bool,

    /// Print the resulting Markdown to stdout.
    #[arg(long)]
    print: bool,

    /// With --print, embed images as base64 data URIs.
    #[arg(long, requires = "print")]
    inline_images: bool,

    /// Output structured JSON (ConversionOutput) instead of a summary.
    #[arg(long, conflicts_with = "print")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "DOC2MD_NO_PROGRESS")]
    no_progress: bool,

    #[command(flatten)]
    tools: ToolArgs,
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Address to listen on.
    #[arg(long, env = "DOC2MD_BIND", default_value = "127.0.0.1:7860")]
    bind: SocketAddr,

    /// Output directory used when the form leaves it blank.
    #[arg(long, env = "DOC2MD_OUTPUT_DIR", default_value = "converted_documents")]
    output_dir: PathBuf,

    #[command(flatten)]
    tools: ToolArgs,
}

/// Converter and captioning options shared by both subcommands.
#[derive(Args, Debug)]
struct ToolArgs {
    /// Pandoc executable.
    #[arg(long, env = "DOC2MD_PANDOC", default_value = "pandoc")]
    pandoc: String,

    /// Extra argument passed to pandoc (repeatable), e.g. --pandoc-arg=--wrap=none.
    #[arg(long = "pandoc-arg", allow_hyphen_values = true)]
    pandoc_args: Vec<String>,

    /// pdfium shared library, or the directory containing it.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "DOC2MD_PASSWORD")]
    password: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(
        long,
        env = "EDGEQUAKE_LLM_PROVIDER",
        long_help = "LLM provider for captions. Auto-detected from API key env vars if not set.\n\
          Supported: openai, anthropic, gemini, azure, ollama, lmstudio, openrouter."
    )]
    provider: Option<String>,

    /// Vision model ID (default: gpt-4.1-nano).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// Prompt sent with each image.
    #[arg(long, env = "DOC2MD_PROMPT")]
    prompt: Option<String>,

    /// Max tokens per caption.
    #[arg(long, env = "DOC2MD_MAX_TOKENS", default_value_t = 500)]
    max_tokens: usize,

    /// Caption temperature (0.0–2.0).
    #[arg(long, env = "DOC2MD_TEMPERATURE", default_value_t = 0.7)]
    temperature: f32,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = match &cli.command {
        Command::Convert(args) => !cli.quiet && !args.no_progress && !args.json,
        Command::Serve(_) => false,
    };
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

    match cli.command {
        Command::Convert(ref args) => run_convert(args, cli.quiet, show_progress).await,
        Command::Serve(args) => run_serve(args).await,
    }
}

async fn run_convert(args: &ConvertArgs, quiet: bool, show_progress: bool) -> Result<()> {
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new();
        Some(cb as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };

    let config = build_config(&args.tools, args.caption, progress_cb)?;

    let output = convert(&args.input, &args.output_dir, &config)
        .await
        .with_context(|| format!("Conversion of {} failed", args.input.display()))?;

    if args.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
        return Ok(());
    }

    if args.print {
        let markdown = if args.inline_images {
            let base_dir = output
                .markdown_path
                .parent()
                .unwrap_or(args.output_dir.as_path());
            inline_images(&output.markdown, base_dir)
        } else {
            output.markdown.clone()
        };
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(markdown.as_bytes())
            .context("Failed to write to stdout")?;
        // Ensure a trailing newline on stdout.
        if !markdown.ends_with('\n') {
            handle.write_all(b"\n").ok();
        }
    }

    if !quiet {
        let stats = &output.stats;
        eprintln!(
            "{}  {} images  {}ms  →  {}",
            if stats.caption_failures == 0 {
                green("✔")
            } else {
                cyan("⚠")
            },
            stats.images_extracted,
            stats.total_duration_ms,
            bold(&output.markdown_path.display().to_string()),
        );
        eprintln!(
            "   media: {}",
            dim(&output.media_dir.display().to_string())
        );
        if config.caption_images {
            eprintln!(
                "   {} captioned  /  {} tokens in  /  {} tokens out",
                stats.images_captioned,
                dim(&stats.total_input_tokens.to_string()),
                dim(&stats.total_output_tokens.to_string()),
            );
        }
    }

    Ok(())
}

async fn run_serve(args: ServeArgs) -> Result<()> {
    let config = build_config(&args.tools, false, None)?;
    let state = AppState::new(config, args.output_dir);
    serve(args.bind, state)
        .await
        .with_context(|| format!("Web form on {} stopped with an error", args.bind))
}

/// Map CLI args to `ConversionConfig`.
fn build_config(
    tools: &ToolArgs,
    caption: bool,
    progress: Option<ProgressCallback>,
) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .pandoc_path(tools.pandoc.clone())
        .caption_images(caption)
        .max_tokens(tools.max_tokens)
        .temperature(tools.temperature);

    for arg in &tools.pandoc_args {
        builder = builder.pandoc_arg(arg.clone());
    }
    if let Some(ref path) = tools.pdfium_lib {
        builder = builder.pdfium_lib_path(path.clone());
    }
    if let Some(ref pwd) = tools.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(ref prompt) = tools.prompt {
        builder = builder.caption_prompt(prompt.clone());
    }
    if let Some(ref model) = tools.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref provider) = tools.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
