//! Command-line front end.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::mpsc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use serde::Serialize;

use crate::app::extract::extract_text;
use crate::app::format::render;
use crate::app::options::{ButtonOptions, CopyContext};
use crate::app::order::{marker_of, order};
use crate::app::scan::{Scanner, ScannerConfig};
use crate::app::watch::ChangeWatcher;
use crate::domain::model::Format;
use crate::domain::tree::ContentTree;
use crate::infra::clipboard::{Clipboard, MemoryClipboard};
use crate::infra::config::{Config, unescape_separator};
use crate::infra::fs_watch::FileSource;
use crate::infra::html::parse_document;
use crate::ui::button::CopyButton;

#[derive(Debug, Parser)]
#[command(name = "copymark", author, version, about = "Copy content marked with the `copy` attribute", long_about = None)]
pub struct Cli {
    /// Extra config file layered above user and workspace config
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Copy the tagged content of an HTML file
    Copy(CopyArgs),
    /// List tagged elements in copy order
    Scan(ScanArgs),
    /// Re-render the payload whenever the file changes
    Watch(WatchArgs),
    /// Print a shell completion script
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Debug, Args)]
pub struct CopyArgs {
    pub file: PathBuf,
    #[arg(long, value_enum)]
    pub format: Option<Format>,
    /// Separator between elements; `\n` and `\t` escapes are expanded
    #[arg(long)]
    pub separator: Option<String>,
    #[arg(long)]
    pub include_hidden: bool,
    /// Fail instead of trying clipboard helper commands
    #[arg(long)]
    pub no_fallback: bool,
    /// Echo the copied payload to stdout
    #[arg(long)]
    pub print: bool,
    /// Render the payload to stdout without touching the clipboard
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Args)]
pub struct ScanArgs {
    pub file: PathBuf,
    #[arg(long)]
    pub include_hidden: bool,
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    pub file: PathBuf,
    #[arg(long, value_name = "MS")]
    pub debounce_ms: Option<u64>,
    #[arg(long, value_enum)]
    pub format: Option<Format>,
    #[arg(long)]
    pub separator: Option<String>,
}

/// One row of `copymark scan`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanEntry {
    pub position: usize,
    pub marker: Option<i64>,
    pub tag: String,
    pub text: String,
}

pub fn run(cli: Cli) -> Result<ExitCode> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Copy(args) => run_copy(&load_config(config_path)?, args),
        Command::Scan(args) => run_scan(&load_config(config_path)?, args),
        Command::Watch(args) => run_watch(&load_config(config_path)?, args),
        Command::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "copymark", &mut io::stdout());
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    Config::load_with_explicit(path).context("failed to load configuration")
}

fn read_source(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn button_options(
    config: &Config,
    format: Option<Format>,
    separator: Option<&str>,
) -> ButtonOptions {
    let mut options = ButtonOptions::from_config(config);
    if let Some(format) = format {
        options = options.with_format(format);
    }
    if let Some(separator) = separator {
        options = options.with_separator(unescape_separator(separator));
    }
    options
}

fn run_copy(config: &Config, args: CopyArgs) -> Result<ExitCode> {
    let mut options = button_options(config, args.format, args.separator.as_deref());
    if args.include_hidden {
        options = options.with_include_hidden(true);
    }
    if args.no_fallback {
        options.fallback_enabled = false;
    }

    let document = parse_document(&read_source(&args.file)?);
    let mut clipboard = if args.dry_run {
        Clipboard::with_backends(Some(Box::new(MemoryClipboard::new())), None)
    } else {
        Clipboard::with_fallback_commands(config.clipboard.fallback_commands())
    };

    let mut button = CopyButton::new(options, CopyContext::from_config(config));
    let Some(result) = button.trigger(&document, &mut clipboard) else {
        bail!("copy button is busy");
    };
    let view = button.view();

    match result {
        Ok(payload) => {
            if args.dry_run || args.print {
                let mut stdout = io::stdout().lock();
                writeln!(stdout, "{payload}")?;
            }
            if !args.dry_run {
                eprintln!("{}", view.label);
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            eprintln!("{}: {err}", view.label);
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Tagged elements of `tree` in copy order.
pub fn describe<T: ContentTree>(tree: &T, include_hidden: bool) -> Vec<ScanEntry> {
    let cfg = ScannerConfig::default().with_include_hidden(include_hidden);
    let found = Scanner::new().scan(tree, &cfg);
    order(tree, &found)
        .into_iter()
        .enumerate()
        .map(|(index, element)| ScanEntry {
            position: index + 1,
            marker: marker_of(tree, element).key(),
            tag: tree.tag_name(element).unwrap_or_default().to_owned(),
            text: extract_text(tree, element),
        })
        .collect()
}

fn run_scan(config: &Config, args: ScanArgs) -> Result<ExitCode> {
    let include_hidden = args.include_hidden || config.defaults.include_hidden();
    let document = parse_document(&read_source(&args.file)?);
    let entries = describe(&document, include_hidden);

    let mut stdout = io::stdout().lock();
    if args.json {
        serde_json::to_writer_pretty(&mut stdout, &entries)?;
        writeln!(stdout)?;
    } else if entries.is_empty() {
        writeln!(stdout, "no tagged elements")?;
    } else {
        for entry in &entries {
            let marker = entry
                .marker
                .map_or_else(|| "-".to_string(), |key| key.to_string());
            writeln!(
                stdout,
                "{:>3}  {:<6} <{}> {}",
                entry.position,
                marker,
                entry.tag,
                entry.text.replace('\n', " ")
            )?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn run_watch(config: &Config, args: WatchArgs) -> Result<ExitCode> {
    let options = button_options(config, args.format, args.separator.as_deref());
    let context = CopyContext::from_config(config);
    let format = options.resolved_format(&context);
    let separator = options.resolved_separator(&context);
    let include_hidden = options.include_hidden;
    let debounce = args
        .debounce_ms
        .map_or(options.debounce, Duration::from_millis);

    let path = args.file.clone();
    let refresh = move || -> Vec<String> {
        match fs::read_to_string(&path) {
            Ok(source) => {
                let document = parse_document(&source);
                let cfg = ScannerConfig::default().with_include_hidden(include_hidden);
                let found = Scanner::new().scan(&document, &cfg);
                let ordered = order(&document, &found);
                render(&document, &ordered, format).parts().to_vec()
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "failed to read watched file");
                Vec::new()
            }
        }
    };

    let (tx, rx) = mpsc::channel::<Vec<String>>();
    let watcher = ChangeWatcher::start(
        FileSource::new(&args.file),
        debounce,
        refresh,
        Some(Box::new(move |parts: &[String]| {
            let _ = tx.send(parts.to_vec());
        })),
    )?;

    print_parts(&watcher.elements(), &separator)?;
    for parts in rx {
        print_parts(&parts, &separator)?;
    }
    Ok(ExitCode::SUCCESS)
}

fn print_parts(parts: &[String], separator: &str) -> Result<()> {
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "-- {} element(s)", parts.len())?;
    writeln!(stdout, "{}", parts.join(separator))?;
    stdout.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_copy_flags() {
        let cli = Cli::try_parse_from([
            "copymark",
            "copy",
            "page.html",
            "--format",
            "md",
            "--separator",
            "\\n---\\n",
            "--dry-run",
        ])
        .unwrap();
        let Command::Copy(args) = cli.command else {
            panic!("expected copy command");
        };
        assert_eq!(args.format, Some(Format::Markdown));
        assert!(args.dry_run);
        assert_eq!(unescape_separator(args.separator.as_deref().unwrap()), "\n---\n");
    }

    #[test]
    fn describe_lists_elements_in_copy_order() {
        let document = parse_document(
            r#"<p copy="2">second</p><p copy>loose</p><h2 copy="1">first <b no-copy>x</b></h2>"#,
        );
        let entries = describe(&document, false);
        let summary: Vec<_> = entries
            .iter()
            .map(|entry| (entry.marker, entry.tag.as_str(), entry.text.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (Some(2), "p", "second"),
                (None, "p", "loose"),
                (Some(1), "h2", "first"),
            ]
        );
    }
}
