mod app;
mod components;
mod config;
mod error;
mod event;
mod explorer;
mod handler;
mod logging;
mod preview_content;
mod remote;
mod session;
mod theme;
mod tui;
mod ui;

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use crate::app::{App, AppOptions};
use crate::config::{AccumulatorConfig, AppConfig, LoggingConfig, ServerConfig, ThemeConfig, TreeConfig};
use crate::event::{Event, EventHandler};
use crate::explorer::{build_tree, derive_hidden_key, FileAccumulator};
use crate::explorer::tree::TreeNode;
use crate::logging::LogTarget;
use crate::remote::{HttpFileService, RemoteFileService};
use crate::tui::{install_panic_hook, Tui};

/// Browse a remote file collection from the terminal.
#[derive(Parser, Debug)]
#[command(name = "rfx", version, about)]
struct Cli {
    /// Backend origin serving /api/file and /api/cdn
    #[arg(long)]
    base_url: Option<String>,

    /// API key sent as X-API-Key (also read from $RFX_API_KEY)
    #[arg(long)]
    api_key: Option<String>,

    /// Path to a TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of files to collect before showing the tree
    #[arg(long)]
    max_files: Option<usize>,

    /// Color scheme: dark, light, or custom
    #[arg(long)]
    theme: Option<String>,

    /// Use ASCII indicators instead of nerd font icons
    #[arg(long)]
    no_icons: bool,

    /// Log filter directive, e.g. "debug" (overridden by $RFX_LOG)
    #[arg(long)]
    log_level: Option<String>,

    /// Log file used while the terminal UI is running
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Collect files, print the tree and hidden key, and exit
    #[arg(long)]
    print: bool,
}

impl Cli {
    /// Flags that were given, as a partial config layered over everything else.
    fn overrides(&self) -> AppConfig {
        AppConfig {
            server: ServerConfig {
                base_url: self.base_url.clone(),
                api_key: self.api_key.clone(),
            },
            accumulator: AccumulatorConfig {
                max_files: self.max_files,
                max_stalled_fetches: None,
            },
            tree: TreeConfig {
                use_icons: self.no_icons.then_some(false),
                expand_all: None,
            },
            logging: LoggingConfig {
                level: self.log_level.clone(),
                file: self.log_file.clone(),
            },
            theme: ThemeConfig {
                scheme: self.theme.clone(),
                custom: None,
            },
            ..AppConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> error::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref(), Some(&cli.overrides()));

    let log_target = if cli.print {
        LogTarget::Stderr
    } else {
        match &config.logging.file {
            Some(path) => LogTarget::File(path.clone()),
            None => LogTarget::File(logging::default_log_file()?),
        }
    };
    logging::init_logging(config.log_level(), &log_target)?;
    tracing::info!(
        base_url = config.base_url(),
        max_files = config.max_files(),
        theme = config.theme_scheme(),
        "rfx starting"
    );

    let service: Arc<dyn RemoteFileService> =
        Arc::new(HttpFileService::new(config.service_config())?);

    if cli.print {
        return print_collection(&config, service.as_ref()).await;
    }

    install_panic_hook();

    let mut tui = Tui::new()?;
    let mut events = EventHandler::new(Duration::from_millis(16));
    let mut app = App::new(service, events.sender(), AppOptions::from_config(&config));
    app.start_loading();

    loop {
        tui.draw(|frame| ui::render(&mut app, frame))?;

        match events.next().await? {
            Event::Key(key) => handler::handle_key_event(&mut app, key),
            Event::Tick => app.clear_expired_status(),
            Event::Resize => {}
            Event::LoadProgress {
                generation,
                collected,
                target,
            } => app.handle_load_progress(generation, collected, target),
            Event::FilesLoaded { generation, result } => app.handle_files_loaded(generation, result),
            Event::PreviewLoaded { token, result } => app.handle_preview_loaded(token, result),
        }

        if app.should_quit {
            break;
        }
    }

    tui.restore()?;
    tracing::info!("rfx exiting");
    Ok(())
}

/// Headless mode: accumulate once and write the tree to stdout.
async fn print_collection(config: &AppConfig, service: &dyn RemoteFileService) -> error::Result<()> {
    let accumulator = FileAccumulator::new(config.max_files(), config.max_stalled_fetches());
    let cancel = AtomicBool::new(false);
    let collection = accumulator
        .run(
            service,
            |collected, target| tracing::debug!(collected, target, "accumulating"),
            &cancel,
        )
        .await?;

    let forest = build_tree(collection.visible());
    let mut out = String::new();
    write_forest(&forest, "", &mut out);
    print!("{}", out);
    println!("hidden key: {}", derive_hidden_key(&collection));
    Ok(())
}

fn write_forest(nodes: &[TreeNode], indent: &str, out: &mut String) {
    for (i, node) in nodes.iter().enumerate() {
        let last = i + 1 == nodes.len();
        let branch = if last { "└── " } else { "├── " };
        let suffix = if node.is_folder() { "/" } else { "" };
        out.push_str(&format!("{}{}{}{}\n", indent, branch, node.name, suffix));
        if node.is_folder() {
            let child_indent = format!("{}{}", indent, if last { "    " } else { "│   " });
            write_forest(node.children(), &child_indent, out);
        }
    }
}
