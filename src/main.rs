//! CLI entry point for `mimetree`.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};

use mimetree::config::{self, Config};
use mimetree::export::attachment::{export_attachments, ExportOptions};
use mimetree::export::{text, tree};
use mimetree::model::message::Message;
use mimetree::parser::date::parse_date_time;
use mimetree::parser::eml::parse_eml_with;
use mimetree::parser::MessageParser;

/// Decode RFC 2822 / MIME messages into a part tree.
#[derive(Parser)]
#[command(name = "mimetree", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the MIME part tree of a message file
    Tree {
        path: PathBuf,
        /// Print the tree and decoded headers as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the decoded summary headers
    Headers {
        path: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Print the message text (first text/plain part, or HTML converted)
    Text {
        path: PathBuf,
        /// Print the HTML source of the first text/html part instead
        #[arg(long)]
        html: bool,
    },
    /// Extract all attachments into a directory
    Attachments {
        path: PathBuf,
        /// Output directory (defaults to the configured one, then ".")
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Write identical attachments more than once
        #[arg(long)]
        no_dedup: bool,
    },
    /// Parse an RFC 2822 date-time and print it as RFC 3339
    Date {
        #[arg(value_name = "DATE")]
        input: String,
    },
    /// Show the config file location and effective settings
    Config {
        /// Write the effective settings to the config file
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

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = config::load_config();

    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match cli.command {
        Commands::Tree { path, json } => cmd_tree(&path, json, &config),
        Commands::Headers { path, json } => cmd_headers(&path, json, &config),
        Commands::Text { path, html } => cmd_text(&path, html, &config),
        Commands::Attachments {
            path,
            output,
            no_dedup,
        } => cmd_attachments(&path, output, no_dedup, &config),
        Commands::Date { input } => cmd_date(&input),
        Commands::Config { init } => cmd_config(init, &config),
        Commands::Completions { shell } => cmd_completions(shell),
        Commands::Manpage => cmd_manpage(),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_path = config::log_file_path(config);
    let log_dir = config::cache_dir(config);
    let log_name = log_path
        .file_name()
        .map_or_else(|| "mimetree.log".into(), |n| n.to_os_string());

    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, log_name);
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

fn load(path: &Path, config: &Config) -> anyhow::Result<Message> {
    let parser = MessageParser::from_config(&config.parser);
    parse_eml_with(path, &parser).with_context(|| format!("cannot decode {}", path.display()))
}

fn cmd_tree(path: &Path, json: bool, config: &Config) -> anyhow::Result<()> {
    let message = load(path, config)?;
    if json {
        let summary = tree::MessageSummary::new(&message);
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("{}", tree::render_tree(&message));
    }
    Ok(())
}

fn cmd_headers(path: &Path, json: bool, config: &Config) -> anyhow::Result<()> {
    let message = load(path, config)?;
    let header = message.header();

    if json {
        println!("{}", serde_json::to_string_pretty(header)?);
        return Ok(());
    }

    let list = |addrs: &[mimetree::model::address::EmailAddress]| {
        addrs
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    };

    println!("  Subject:    {}", header.subject.as_deref().unwrap_or(""));
    if let Some(from) = &header.from {
        println!("  From:       {from}");
    }
    if !header.to.is_empty() {
        println!("  To:         {}", list(&header.to));
    }
    if !header.cc.is_empty() {
        println!("  Cc:         {}", list(&header.cc));
    }
    match message.date() {
        Some(Ok(date)) => println!("  Date:       {}", date.local().to_rfc2822()),
        Some(Err(e)) => println!("  Date:       {} ({e})", header.date.as_deref().unwrap_or("")),
        None => {}
    }
    if let Some(id) = &header.message_id {
        println!("  Message-ID: <{id}>");
    }
    if !header.references.is_empty() {
        println!("  References: {}", header.references.len());
    }
    println!(
        "  Size:       {}",
        humansize::format_size(message.raw_size(), humansize::BINARY)
    );
    Ok(())
}

fn cmd_text(path: &Path, html: bool, config: &Config) -> anyhow::Result<()> {
    let message = load(path, config)?;
    let body = if html {
        text::body_html(&message)
    } else {
        Some(text::render_message(&message))
    };

    match body {
        Some(body) => {
            println!("{body}");
            Ok(())
        }
        None => anyhow::bail!("{}: no text/html part", path.display()),
    }
}

fn cmd_attachments(
    path: &Path,
    output: Option<PathBuf>,
    no_dedup: bool,
    config: &Config,
) -> anyhow::Result<()> {
    let message = load(path, config)?;
    let output = output
        .or_else(|| config.export.default_output_dir.clone())
        .unwrap_or_else(|| PathBuf::from("."));

    let mut options = ExportOptions::from_config(&config.export, &config.attachments);
    if no_dedup {
        options.dedup = false;
    }

    let paths = export_attachments(&message, &output, &options)?;
    for path in &paths {
        let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        println!(
            "  {} ({})",
            path.display(),
            humansize::format_size(size, humansize::BINARY)
        );
    }
    println!("  {} attachment(s) written to {}", paths.len(), output.display());
    Ok(())
}

fn cmd_date(input: &str) -> anyhow::Result<()> {
    let parsed = parse_date_time(input)?;
    println!("{}", parsed.utc.to_rfc3339());
    Ok(())
}

fn cmd_config(init: bool, config: &Config) -> anyhow::Result<()> {
    let path = config::config_file_path();
    if init {
        config::save_config(config)?;
    }
    match path {
        Some(path) => println!("# {}", path.display()),
        None => println!("# no config location available"),
    }
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "mimetree", &mut std::io::stdout());
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
