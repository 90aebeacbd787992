//! ruledoc - in-place section editor
//!
//! A CLI tool for editing sectioned Markdown documents with undo/redo,
//! per-section change tracking and changelog generation on save.

#![deny(unsafe_code)]
#![cfg_attr(all(not(debug_assertions), not(test)), deny(clippy::all))]
#![cfg_attr(all(not(debug_assertions), not(test)), deny(clippy::pedantic))]
#![cfg_attr(all(not(debug_assertions), not(test)), deny(missing_docs))]
// Allow some pedantic lints that are too strict for this project
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::enum_variant_names)]

mod cli;
mod repl;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use ruledoc::config::{EditorConfig, CONFIG_FILE_NAME};
use ruledoc::templates;
use ruledoc::{Document, EditSession, FileChangelog, FileSink, Section, SectionIdGenerator};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Main entry point for the ruledoc CLI application
fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:?}", e);
        std::process::exit(1);
    }
}

/// Run the CLI application
fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Edit {
            file,
            config,
            edit,
            verbose,
        } => {
            handle_edit_command(file, config, edit, verbose)?;
        }

        Commands::Toc { file } => {
            handle_toc_command(&file)?;
        }

        Commands::Init { file, force, title } => {
            handle_init_command(file, force, title)?;
        }

        Commands::ListTemplates => {
            handle_list_templates_command()?;
        }
    }

    Ok(())
}

/// Handle the edit command
fn handle_edit_command(
    file: PathBuf,
    config_path: Option<PathBuf>,
    start_editing: bool,
    verbose: bool,
) -> Result<()> {
    let mut logger =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if verbose {
        logger.filter_level(log::LevelFilter::Info);
    }
    logger.init();

    let document = load_document(&file)?;

    let config_path = config_path.unwrap_or_else(|| sibling_path(&file, CONFIG_FILE_NAME));
    let config = EditorConfig::load_or_default(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    let sink = FileSink::new(&file);
    let changelog = FileChangelog::new(config.changelog_file(&file));

    println!("Editing: {}", sink.path().display());
    println!("Changelog: {}", changelog.path().display());
    println!("Sections: {}", document.sections().len());

    let mut session = EditSession::start(document, &config, sink, changelog, Instant::now());
    if start_editing {
        session.enter_edit()?;
        println!("Edit mode on");
    }

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    repl::run(&mut session, stdin.lock(), stdout.lock())
}

/// Handle the toc command
fn handle_toc_command(file: &Path) -> Result<()> {
    let document = load_document(file)?;
    let mut stdout = std::io::stdout().lock();
    repl::print_navigation(&mut stdout, &document.navigation())?;
    Ok(())
}

/// Handle the init command
fn handle_init_command(file: PathBuf, force: bool, title: Option<String>) -> Result<()> {
    if file.exists() && !force {
        anyhow::bail!(
            "{} already exists. Use --force to overwrite it",
            file.display()
        );
    }

    let title = title.unwrap_or_else(|| {
        file.file_stem()
            .map_or_else(|| "Rules".to_string(), |s| s.to_string_lossy().into_owned())
    });

    let template = templates::get_template("heading-body")
        .context("Failed to load section templates")?
        .context("Built-in template 'heading-body' is missing")?;

    let mut document = Document::parse(&format!("# {}\n\n", title))?;
    let id = SectionIdGenerator::new().generate();
    document.push_section(Section::new(id.clone(), template.body))?;

    if let Some(parent) = file.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    std::fs::write(&file, document.serialize().as_str())
        .with_context(|| format!("Failed to write {}", file.display()))?;
    println!("Created: {}", file.display());
    println!("First section: {}", id);

    let config_path = sibling_path(&file, CONFIG_FILE_NAME);
    if config_path.exists() {
        println!("Keeping existing config: {}", config_path.display());
    } else {
        EditorConfig::default()
            .save(&config_path)
            .with_context(|| format!("Failed to write {}", config_path.display()))?;
        println!("Created: {}", config_path.display());
    }

    println!("\nNext: ruledoc edit {}", file.display());
    Ok(())
}

/// Handle the list-templates command
fn handle_list_templates_command() -> Result<()> {
    println!("Available section templates:\n");

    for template in templates::get_all_templates()? {
        println!("  {} - {}", template.id, template.description);
        if !template.aliases.is_empty() {
            println!("    Aliases: {}", template.aliases.join(", "));
        }
        println!();
    }

    println!("Usage: insert <template> (inside 'ruledoc edit')");
    Ok(())
}

/// Read and parse a sectioned document
fn load_document(file: &Path) -> Result<Document> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    Document::parse(&text).with_context(|| format!("Failed to parse {}", file.display()))
}

/// Path of a file next to `file`
fn sibling_path(file: &Path, name: &str) -> PathBuf {
    file.parent()
        .map_or_else(|| PathBuf::from(name), |dir| dir.join(name))
}
