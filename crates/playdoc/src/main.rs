//! playdoc - interactive code playgrounds for markdown documentation

use std::env;
use std::process::ExitCode;

use camino::Utf8Path;
use eyre::{Result, eyre};
use facet::Facet;
use facet_args as args;
use fs_err as fs;
use owo_colors::OwoColorize;
use playdoc::{HydrationContext, Page, ResolvedConfig, load_config, set_global_config};
use playdoc_editor::FixedTheme;
use playdoc_runtime::{Executor, ScriptLanguage, python_loader};
use playmark::{RenderOptions, render};

/// Render command - markdown page to HTML with placeholders
#[derive(Facet, Debug)]
struct RenderArgs {
    /// Markdown file to render
    #[facet(args::positional)]
    file: String,

    /// Configuration file (default: discover .config/playdoc.yaml)
    #[facet(args::named, args::short = 'c', default)]
    config: Option<String>,
}

/// Blocks command - list the code blocks of a page
#[derive(Facet, Debug)]
struct BlocksArgs {
    /// Markdown file to inspect
    #[facet(args::positional)]
    file: String,

    /// Configuration file (default: discover .config/playdoc.yaml)
    #[facet(args::named, args::short = 'c', default)]
    config: Option<String>,
}

/// Run command - hydrate a page and execute every runnable snippet
#[derive(Facet, Debug)]
struct RunArgs {
    /// Markdown file to run
    #[facet(args::positional)]
    file: String,

    /// Mount editors in dark mode
    #[facet(args::named, args::short = 'd')]
    dark: bool,

    /// Print hydrated snippets as HTML
    #[facet(args::named)]
    html: bool,

    /// Configuration file (default: discover .config/playdoc.yaml)
    #[facet(args::named, args::short = 'c', default)]
    config: Option<String>,
}

/// Exec command - execute one source file
#[derive(Facet, Debug)]
struct ExecArgs {
    /// Language tag: js or py
    #[facet(args::positional)]
    language: String,

    /// Source file to execute
    #[facet(args::positional)]
    file: String,

    /// Configuration file (default: discover .config/playdoc.yaml)
    #[facet(args::named, args::short = 'c', default)]
    config: Option<String>,
}

#[derive(Facet, Debug)]
#[repr(u8)]
enum PlaydocCommand {
    /// Render a markdown page to HTML
    Render(RenderArgs),
    /// List the code blocks of a page
    Blocks(BlocksArgs),
    /// Hydrate a page and run its snippets
    Run(RunArgs),
    /// Execute a single source file
    Exec(ExecArgs),
}

#[derive(Facet, Debug)]
struct PlaydocArgs {
    #[facet(args::subcommand)]
    command: PlaydocCommand,
}

fn parse_args() -> Result<PlaydocCommand, String> {
    let args: Vec<String> = env::args().skip(1).collect();
    let args_refs: Vec<&str> = args.iter().map(|s| s.as_str()).collect();

    let parsed: PlaydocArgs = facet_args::from_slice(&args_refs).map_err(|e| {
        eprintln!("{:?}", miette::Report::new(e));
        "Failed to parse arguments".to_string()
    })?;

    Ok(parsed.command)
}

fn main() -> ExitCode {
    // Set up miette for nice error formatting
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .build(),
        )
    }))
    .ok();

    let cmd = match parse_args() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_tracing() {
        eprintln!("{}: {}", "error".red().bold(), e);
        return ExitCode::FAILURE;
    }

    // Executors hold an embedded JS engine and stay on this thread
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("{}: failed to start async runtime: {}", "error".red().bold(), e);
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(async {
        match cmd {
            PlaydocCommand::Render(args) => cmd_render(args).await,
            PlaydocCommand::Blocks(args) => cmd_blocks(args).await,
            PlaydocCommand::Run(args) => cmd_run(args).await,
            PlaydocCommand::Exec(args) => cmd_exec(args).await,
        }
    });

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", "error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("playdoc=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn resolve_config(path: Option<&str>) -> Result<&'static ResolvedConfig> {
    let config = match path {
        Some(path) => load_config(Utf8Path::new(path))?,
        None => ResolvedConfig::discover_or_default()?,
    };
    set_global_config(config)?;
    playdoc::global_config().ok_or_else(|| eyre!("configuration was not initialized"))
}

async fn render_page(file: &str) -> Result<playmark::Document> {
    let markdown = fs::read_to_string(file)?;
    render(&markdown, &RenderOptions::interactive())
        .await
        .map_err(|e| eyre!("Failed to render {}: {}", file, e))
}

async fn cmd_render(args: RenderArgs) -> Result<ExitCode> {
    resolve_config(args.config.as_deref())?;
    let doc = render_page(&args.file).await?;
    println!("{}", doc.html);
    Ok(ExitCode::SUCCESS)
}

async fn cmd_blocks(args: BlocksArgs) -> Result<ExitCode> {
    resolve_config(args.config.as_deref())?;
    let doc = render_page(&args.file).await?;

    if doc.blocks.is_empty() {
        println!("{}", "no code blocks".dimmed());
        return Ok(ExitCode::SUCCESS);
    }

    for (i, block) in doc.blocks.iter().enumerate() {
        let mode = if block.runnable { "runner" } else { "static" };
        println!(
            "{} {} {} {}",
            format!("[{i}]").dimmed(),
            block.language.cyan().bold(),
            mode.yellow(),
            block.title.as_deref().unwrap_or("")
        );
        for line in block.source.lines() {
            println!("    {line}");
        }
    }
    Ok(ExitCode::SUCCESS)
}

async fn cmd_run(args: RunArgs) -> Result<ExitCode> {
    let config = resolve_config(args.config.as_deref())?;
    let doc = render_page(&args.file).await?;

    let ctx = HydrationContext::new(config).with_probe(FixedTheme(args.dark));
    let page = Page::hydrate(&doc.html, &ctx)?;

    let mut failures = 0;
    for snippet in page.snippets() {
        // A failed runtime load leaves error output too, without a dispatched run
        snippet.run().await;
        if snippet.is_runnable() && snippet.has_error() {
            failures += 1;
        }

        if args.html {
            println!("{}", snippet.render_html());
            continue;
        }

        let anchor = snippet.session().anchor().to_string();
        let title = snippet.title().unwrap_or("");
        println!(
            "{} {} {}",
            anchor.dimmed(),
            snippet.descriptor().language.cyan().bold(),
            title.bold()
        );
        if !snippet.is_runnable() {
            println!("    {}", "(read-only)".dimmed());
            continue;
        }
        for line in snippet.output().lines() {
            if snippet.has_error() {
                println!("    {}", line.red());
            } else {
                println!("    {line}");
            }
        }
    }

    let anchors = page.unmount();
    tracing::info!(snippets = anchors.len(), failures, "page run complete");

    Ok(if failures == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn cmd_exec(args: ExecArgs) -> Result<ExitCode> {
    let config = resolve_config(args.config.as_deref())?;
    let language = ScriptLanguage::from_tag(&args.language)
        .ok_or_else(|| eyre!("Unsupported language '{}' (expected js or py)", args.language))?;
    if !config.runtime.is_enabled(language.tag()) {
        return Err(eyre!("Execution of '{}' is disabled by configuration", language.tag()));
    }

    let source = fs::read_to_string(&args.file)?;
    let executor = Executor::new(python_loader(&config.runtime));
    if executor.prepare(language).await {
        executor.run(language, &source).await;
    }

    if executor.has_error() {
        eprintln!("{}", executor.output().red());
        Ok(ExitCode::FAILURE)
    } else {
        println!("{}", executor.output());
        Ok(ExitCode::SUCCESS)
    }
}
