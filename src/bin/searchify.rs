//! CLI binary for searchify.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ConversionConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use searchify::{
    convert, inspect, make_searchable, ConversionConfig, ConversionProgressCallback, EngineConfig,
    FailedPagePolicy, ProgressCallback, Settings, TesseractEngine,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
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

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one live progress bar plus per-page log lines.
/// Pages arrive strictly in order, so no out-of-order bookkeeping is needed.
struct CliProgressCallback {
    bar: ProgressBar,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    /// Create a callback whose progress-bar length is set dynamically
    /// by `on_conversion_start` (called before any pages are processed).
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0); // length set in on_conversion_start

        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            errors: AtomicUsize::new(0),
        })
    }

    /// Switch to the full progress-bar style once we know `total`.
    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Recognising");
        self.bar.reset_eta();
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Running OCR on {total_pages} page(s)…"))
        ));
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, page_num: usize, total: usize, filename: &str) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            green("✓"),
            page_num,
            total,
            dim(filename),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total: usize, error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);

        // Truncate very long error messages to keep output tidy.
        let msg = if error.len() > 80 {
            format!("{}\u{2026}", &error[..79])
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            red("✗"),
            page_num,
            total,
            red(&msg),
        ));
        self.bar.inc(1);
    }

    fn on_conversion_complete(&self, total_pages: usize, success_count: usize) {
        let failed = total_pages.saturating_sub(success_count);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} page(s) recognised",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} page(s) recognised  ({} failed)",
                if failed == total_pages {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&success_count.to_string()),
                total_pages,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Plain conversion to ./scan.docx
  searchify scan.pdf

  # OCR a scanned PDF in Portuguese, then convert
  searchify --ocr --lang por scan.pdf -o converted/

  # Only produce the searchable PDF, skip document conversion
  searchify --ocr --searchable-pdf scan-ocr.pdf scan.pdf

  # Keep unrecognised pages as image-only pages instead of dropping them
  searchify --ocr --keep-failed-pages scan.pdf

  # Convert from URL
  searchify --ocr https://example.com/scan.pdf -o out/

  # Inspect PDF metadata (no OCR engine needed)
  searchify --inspect-only scan.pdf

  # What languages does the local tesseract know?
  searchify --list-langs

ENVIRONMENT VARIABLES:
  TESSERACT_PATH           Path to the tesseract binary (overrides discovery)
  TESSDATA_PREFIX          Language-data directory, honoured when no bundled
                           tessdata/ directory is present
  SOFFICE_PATH             Path to the LibreOffice soffice binary
  PDFIUM_DYNAMIC_LIB_PATH  Path to an existing libpdfium

SETUP:
  1. Install tesseract:   apt install tesseract-ocr tesseract-ocr-por
  2. Install LibreOffice: apt install libreoffice
  3. Convert:             searchify --ocr scan.pdf -o out/
"#;

/// Make scanned PDFs searchable with Tesseract OCR and convert them to editable documents.
#[derive(Parser, Debug)]
#[command(
    name = "searchify",
    version,
    about = "Make scanned PDFs searchable with OCR and convert them to editable documents",
    long_about = "Rasterises each page of a scanned PDF, cleans the image for recognition, runs \
Tesseract OCR, merges the recognised pages into a searchable PDF, and hands the result to \
LibreOffice for conversion to an editable document.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    #[arg(required_unless_present_any = ["list_langs", "check_engine"])]
    input: Option<String>,

    /// Output folder for the converted document. Defaults to the persisted
    /// settings' output folder, then the current directory.
    #[arg(short, long, env = "SEARCHIFY_OUTPUT")]
    output: Option<PathBuf>,

    /// Run OCR pre-processing before conversion. Also enabled when the
    /// persisted settings say so.
    #[arg(long, env = "SEARCHIFY_OCR")]
    ocr: bool,

    /// Tesseract language code (e.g. eng, por, deu). Defaults to the
    /// persisted settings' OCR language, then "eng".
    #[arg(short, long, env = "SEARCHIFY_LANG")]
    lang: Option<String>,

    /// Persist output folder, OCR flag, and language for future runs.
    #[arg(long)]
    save_settings: bool,

    /// Page oversampling factor (1.0–4.0).
    #[arg(long, env = "SEARCHIFY_ZOOM", default_value_t = 2.0)]
    zoom: f32,

    /// Keep unrecognised pages as image-only pages instead of omitting them.
    #[arg(long, env = "SEARCHIFY_KEEP_FAILED_PAGES")]
    keep_failed_pages: bool,

    /// Path to the tesseract binary (skips discovery).
    #[arg(long, env = "TESSERACT_PATH")]
    tesseract: Option<PathBuf>,

    /// Language-data directory passed to tesseract via --tessdata-dir.
    #[arg(long)]
    tessdata: Option<PathBuf>,

    /// Write the searchable PDF to this path and stop (no document conversion).
    #[arg(long, value_name = "PATH", requires = "ocr")]
    searchable_pdf: Option<PathBuf>,

    /// Print PDF metadata only, no conversion.
    #[arg(long)]
    inspect_only: bool,

    /// List the languages the discovered tesseract install supports.
    #[arg(long)]
    list_langs: bool,

    /// Probe the OCR engine and exit 0 if it is usable.
    #[arg(long)]
    check_engine: bool,

    /// Output the conversion outcome as JSON.
    #[arg(long, env = "SEARCHIFY_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "SEARCHIFY_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "SEARCHIFY_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "SEARCHIFY_QUIET")]
    quiet: bool,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "SEARCHIFY_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,
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

    // ── Engine-only modes ────────────────────────────────────────────────
    if cli.list_langs || cli.check_engine {
        let engine = resolve_cli_engine(&cli)
            .context("No tesseract installation found (set TESSERACT_PATH or --tesseract)")?;

        if cli.check_engine {
            if engine.is_available() {
                println!("OCR engine OK: {}", engine.config().binary.display());
                return Ok(());
            }
            anyhow::bail!(
                "tesseract at '{}' did not answer --version",
                engine.config().binary.display()
            );
        }

        let langs = engine.list_languages();
        if langs.is_empty() {
            anyhow::bail!("no languages reported — is language data installed?");
        }
        for lang in langs {
            println!("{lang}");
        }
        return Ok(());
    }

    let input = cli.input.clone().expect("clap enforces input");

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let meta = inspect(&input).await.context("Failed to inspect PDF")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&meta).context("Failed to serialize metadata")?
            );
        } else {
            println!("File:         {}", input);
            if let Some(ref t) = meta.title {
                println!("Title:        {}", t);
            }
            if let Some(ref a) = meta.author {
                println!("Author:       {}", a);
            }
            println!("Pages:        {}", meta.page_count);
            println!("PDF Version:  {}", meta.pdf_version);
            if let Some(ref p) = meta.producer {
                println!("Producer:     {}", p);
            }
            if let Some(ref c) = meta.creator {
                println!("Creator:      {}", c);
            }
        }
        return Ok(());
    }

    // ── Persisted settings as defaults ───────────────────────────────────
    // Values saved by a previous --save-settings run fill in whatever the
    // flags leave unset; a machine without a settings file behaves as if
    // every default were built in.
    let persisted = Settings::config_file().exists().then(Settings::load);
    let use_ocr = cli.ocr || persisted.as_ref().is_some_and(|s| s.ocr_enabled);
    let lang = cli
        .lang
        .clone()
        .or_else(|| persisted.as_ref().map(|s| s.ocr_language.clone()))
        .unwrap_or_else(|| "eng".to_string());
    let output_dir = cli
        .output
        .clone()
        .or_else(|| {
            persisted
                .as_ref()
                .filter(|s| !s.output_folder.is_empty())
                .map(|s| PathBuf::from(&s.output_folder))
        })
        .unwrap_or_else(|| PathBuf::from("."));

    if cli.save_settings {
        let mut settings = persisted.unwrap_or_default();
        settings.ocr_enabled = use_ocr;
        settings.ocr_language = lang.clone();
        settings.output_folder = output_dir.display().to_string();
        if let Err(err) = settings.save() {
            eprintln!("{}  could not save settings: {err}", cyan("⚠"));
        }
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new_dynamic() as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };

    let mut builder = ConversionConfig::builder()
        .use_ocr(use_ocr)
        .language(lang)
        .zoom(cli.zoom)
        .failed_page_policy(if cli.keep_failed_pages {
            FailedPagePolicy::KeepOriginal
        } else {
            FailedPagePolicy::Omit
        })
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref binary) = cli.tesseract {
        builder = builder.engine(EngineConfig {
            binary: binary.clone(),
            tessdata_dir: cli.tessdata.clone(),
            dpi: (72.0 * cli.zoom).round() as u32,
        });
    }
    if let Some(cb) = progress_cb {
        builder = builder.progress_callback(cb);
    }

    let config = builder.build().context("Invalid configuration")?;

    // ── Searchable-PDF-only mode ─────────────────────────────────────────
    if let Some(ref searchable_path) = cli.searchable_pdf {
        let report = make_searchable(std::path::Path::new(&input), searchable_path, &config)
            .await
            .context("OCR pipeline failed")?;

        if !cli.quiet {
            eprintln!(
                "{}  {}/{} pages recognised  →  {}",
                if report.failed() == 0 {
                    green("✔")
                } else {
                    cyan("⚠")
                },
                report.recognized(),
                report.total_pages,
                bold(&searchable_path.display().to_string()),
            );
        }
        return Ok(());
    }

    // ── Run conversion ───────────────────────────────────────────────────
    let outcome = convert(&input, &output_dir, &config)
        .await
        .context("Conversion failed")?;

    if cli.json {
        let json =
            serde_json::to_string_pretty(&outcome).context("Failed to serialise outcome")?;
        println!("{json}");
        return Ok(());
    }

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{}", outcome.output_path.display()).ok();

    if !cli.quiet {
        if outcome.ocr_applied {
            eprintln!(
                "{}  OCR {}/{} pages  →  {}",
                if outcome.stats.failed_pages == 0 {
                    green("✔")
                } else {
                    cyan("⚠")
                },
                outcome.stats.recognized_pages,
                outcome.stats.total_pages,
                bold(&outcome.output_path.display().to_string()),
            );
        } else {
            if let Some(ref reason) = outcome.fallback_reason {
                eprintln!("{}  OCR skipped: {}", cyan("⚠"), reason);
            }
            eprintln!(
                "{}  →  {}",
                green("✔"),
                bold(&outcome.output_path.display().to_string())
            );
        }
        eprintln!(
            "   {}",
            dim(&format!("{}ms total", outcome.stats.total_duration_ms))
        );
    }

    Ok(())
}

/// Engine for `--list-langs` / `--check-engine`: explicit path first, then
/// discovery.
fn resolve_cli_engine(cli: &Cli) -> Option<TesseractEngine> {
    if let Some(ref binary) = cli.tesseract {
        return Some(TesseractEngine::new(EngineConfig {
            binary: binary.clone(),
            tessdata_dir: cli.tessdata.clone(),
            dpi: 144,
        }));
    }
    TesseractEngine::discover()
}
