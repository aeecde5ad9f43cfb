//! CLI entry point for `emlpdf`.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};
use humansize::{format_size, BINARY};
use indicatif::{ProgressBar, ProgressStyle};

use emlpdf::batch::{BatchEvent, BatchOptions, BatchRun};
use emlpdf::config::{self, Config};
use emlpdf::document::lay_out_message;
use emlpdf::i18n;
use emlpdf::layout::font::FontSource;
use emlpdf::model::item::BatchItem;
use emlpdf::parser::eml;

#[derive(Parser)]
#[command(name = "emlpdf", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Language (en, es). Defaults to system locale.
    #[arg(long, value_name = "LANG", global = true)]
    lang: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert messages to PDF
    Convert {
        /// `.eml` files, or directories containing them
        #[arg(required = true, value_name = "INPUT")]
        inputs: Vec<PathBuf>,
        /// Output directory
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,
        /// Sort documents into YYYY-MM folders by message date
        #[arg(short, long, conflicts_with = "no_categorize")]
        categorize: bool,
        /// Write every document to the output directory itself, even if the
        /// configuration enables categorizing
        #[arg(long)]
        no_categorize: bool,
        /// TrueType font to embed instead of the bundled DejaVu Sans
        #[arg(long, value_name = "PATH", conflicts_with = "helvetica")]
        font: Option<PathBuf>,
        /// Use the PDF standard Helvetica (Latin-1 only, nothing embedded)
        #[arg(long)]
        helvetica: bool,
        /// Descend into subdirectories of directory inputs
        #[arg(short, long)]
        recursive: bool,
        /// Print one JSON event per line instead of a progress bar
        #[arg(long)]
        json: bool,
    },
    /// Show the parsed fields of a message
    Inspect {
        path: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Show or initialize the configuration
    Config {
        /// Write the default configuration file
        #[arg(long)]
        init: bool,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

/// Detect language early from --lang arg or system env, before clap processes --help.
fn detect_lang_early() -> i18n::Lang {
    let args: Vec<String> = std::env::args().collect();
    for (i, arg) in args.iter().enumerate() {
        if arg == "--lang" {
            if let Some(lang) = args.get(i + 1).and_then(|c| i18n::Lang::from_code(c)) {
                return lang;
            }
        }
        if let Some(lang) = arg.strip_prefix("--lang=").and_then(i18n::Lang::from_code) {
            return lang;
        }
    }
    i18n::detect_system_lang()
}

/// Build a localized clap Command using i18n strings.
fn build_localized_command() -> clap::Command {
    let mut cmd = Cli::command()
        .about(i18n::app_about())
        .long_about(i18n::app_long_about())
        .after_help(i18n::app_after_help())
        .mut_arg("verbose", |a| a.help(i18n::help_verbose()))
        .mut_arg("lang", |a| a.help(i18n::help_lang()));

    let names: Vec<String> = cmd
        .get_subcommands()
        .map(|s| s.get_name().to_string())
        .collect();
    for name in names {
        let about = match name.as_str() {
            "convert" => i18n::help_cmd_convert(),
            "inspect" => i18n::help_cmd_inspect(),
            "config" => i18n::help_cmd_config(),
            "completions" => i18n::help_cmd_completions(),
            "manpage" => i18n::help_cmd_manpage(),
            _ => continue,
        };
        cmd = cmd.mut_subcommand(&name, |s| s.about(about));
    }
    cmd
}

fn main() -> anyhow::Result<()> {
    // Detect language BEFORE clap parsing so --help is localized
    i18n::set_lang(detect_lang_early());

    let matches = build_localized_command().get_matches();
    let cli = Cli::from_arg_matches(&matches)?;

    let config = config::load_config();

    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);
    tracing::debug!(lang = i18n::lang().code(), "emlpdf {}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Convert {
            inputs,
            output,
            categorize,
            no_categorize,
            font,
            helvetica,
            recursive,
            json,
        } => {
            let font = match (font, helvetica) {
                (Some(path), _) => FontSource::File(path),
                (None, true) => FontSource::Helvetica,
                (None, false) => configured_font(&config),
            };
            let options = BatchOptions {
                categorize: !no_categorize && (categorize || config.output.categorize),
                font,
                layout: config.layout,
            };
            let output = output.or_else(|| config.output.default_dir.clone());
            cmd_convert(&inputs, output, recursive, json, options)
        }
        Commands::Inspect { path, json } => cmd_inspect(&path, json, &config),
        Commands::Config { init } => cmd_config(init, &config),
        Commands::Completions { shell } => cmd_completions(shell),
        Commands::Manpage => cmd_manpage(),
    }
}

fn configured_font(config: &Config) -> FontSource {
    FontSource::from_options(config.font.path.as_deref(), config.font.helvetica)
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_dir = config::cache_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, config::LOG_FILE_NAME);
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Convert all inputs and print a summary (or JSON events).
fn cmd_convert(
    inputs: &[PathBuf],
    output: Option<PathBuf>,
    recursive: bool,
    json: bool,
    options: BatchOptions,
) -> anyhow::Result<()> {
    let files = collect_inputs(inputs, recursive)?;
    if files.is_empty() {
        anyhow::bail!("{}", i18n::err_no_eml_files());
    }
    let Some(output) = output else {
        anyhow::bail!("{}", i18n::err_no_output_dir());
    };
    std::fs::create_dir_all(&output)
        .with_context(|| format!("{}: {}", i18n::msg_output_dir(), output.display()))?;

    let items: Vec<BatchItem> = files.iter().map(BatchItem::from_path).collect();
    let total = items.len();
    let run = BatchRun::new(items, Some(output.clone()), options)?;

    let pb = if json {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(total as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(&format!(
                    "{{spinner:.green}} {} [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {{wide_msg}}",
                    i18n::msg_converting()
                ))?
                .progress_chars("#>-"),
        );
        pb
    };

    let start = Instant::now();
    let report = run.run_to_completion(|event| {
        if json {
            match serde_json::to_string(event) {
                Ok(line) => println!("{line}"),
                Err(e) => tracing::warn!(error = %e, "Could not serialize event"),
            }
            return;
        }
        match event {
            BatchEvent::Progress { filename, .. } => {
                pb.inc(1);
                pb.set_message(filename.clone());
            }
            BatchEvent::Error { item, message } => {
                pb.inc(1);
                pb.println(format!("  \u{2717} {}: {message}", item.source_path.display()));
            }
            BatchEvent::Complete { .. } => pb.finish_and_clear(),
        }
    });
    let elapsed = start.elapsed();

    if json {
        return Ok(());
    }

    let output_size: u64 = report
        .written_paths()
        .filter_map(|p| std::fs::metadata(p).ok())
        .map(|m| m.len())
        .sum();

    println!();
    if report.cancelled {
        println!("  {}", i18n::msg_cancelled());
    }
    println!("  {:<20} {}", i18n::msg_converted(), report.processed);
    println!("  {:<20} {}", i18n::msg_failed(), report.failed());
    println!("  {:<20} {}", i18n::msg_total(), report.total);
    println!("  {:<20} {}", i18n::msg_output_dir(), output.display());
    println!(
        "  {:<20} {}",
        i18n::msg_output_size(),
        format_size(output_size, BINARY)
    );
    println!("  {:<20} {:.2?}", i18n::msg_elapsed(), elapsed);
    println!();

    Ok(())
}

/// Expand the command-line inputs into the list of message files.
///
/// Files are taken as given (a missing one is reported by the batch as a
/// failed item). Directories contribute their `.eml` files sorted by path.
fn collect_inputs(inputs: &[PathBuf], recursive: bool) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found = Vec::new();
            scan_dir(input, recursive, &mut found)?;
            found.sort();
            files.extend(found);
        } else {
            files.push(input.clone());
        }
    }
    Ok(files)
}

fn scan_dir(dir: &Path, recursive: bool, found: &mut Vec<PathBuf>) -> anyhow::Result<()> {
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("cannot read {}", dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        if path.is_dir() {
            if recursive {
                scan_dir(&path, recursive, found)?;
            }
        } else if is_eml(&path) {
            found.push(path);
        }
    }
    Ok(())
}

fn is_eml(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("eml"))
}

/// Print the parsed fields of one message.
fn cmd_inspect(path: &Path, json: bool, config: &Config) -> anyhow::Result<()> {
    if !path.exists() {
        anyhow::bail!("{}: {}", i18n::err_file_not_found(), path.display());
    }

    let file_size = std::fs::metadata(path)?.len();
    let msg = eml::read_message(path)?;
    let font = configured_font(config).load()?;
    let pages = lay_out_message(&msg, &font, &config.layout).len();

    if json {
        let out = serde_json::json!({
            "file": path.to_string_lossy(),
            "file_size": file_size,
            "message": msg,
            "date_iso": msg.display_date(),
            "pages": pages,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    println!("  {:<20} {}", i18n::msg_file(), path.display());
    println!(
        "  {:<20} {}",
        i18n::msg_file_size(),
        format_size(file_size, BINARY)
    );
    println!("  {:<20} {}", i18n::msg_subject(), msg.display_subject());
    println!("  {:<20} {}", i18n::msg_from(), msg.display_from());
    println!("  {:<20} {}", i18n::msg_to(), msg.display_to());
    println!("  {:<20} {}", i18n::msg_date(), msg.display_date());
    println!(
        "  {:<20} {}",
        i18n::msg_body_chars(),
        msg.body().chars().count()
    );
    println!("  {:<20} {pages}", i18n::msg_pages());
    println!(
        "  {:<20} {}",
        i18n::msg_degraded(),
        if msg.degraded {
            i18n::msg_yes()
        } else {
            i18n::msg_no()
        }
    );
    println!();
    Ok(())
}

/// Print the effective configuration, or write the defaults with `--init`.
fn cmd_config(init: bool, config: &Config) -> anyhow::Result<()> {
    let path = config::config_file_path();

    if init {
        if let Some(path) = path.as_ref().filter(|p| p.exists()) {
            anyhow::bail!("{}: {}", i18n::err_config_exists(), path.display());
        }
        let written = config::save_config(&Config::default())?;
        println!("{} {}", i18n::msg_config_written(), written.display());
        return Ok(());
    }

    if let Some(path) = path {
        println!("# {}: {}", i18n::msg_config_file(), path.display());
    }
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "emlpdf", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}
