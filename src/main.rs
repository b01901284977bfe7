use std::io;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use log::LevelFilter;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

use crunsuck::app::{self, App, Services};
use crunsuck::catalog::HttpCatalog;
use crunsuck::config::Config;
use crunsuck::event::TerminalKeys;
use crunsuck::logging::{self, LogSink};
use crunsuck::player::Streamlink;
use crunsuck::store::history::HistoryStore;
use crunsuck::ui::shell::{Shell, TerminalSurface};
use crunsuck::ui::theme::Theme;

#[derive(Parser)]
#[command(name = "crunsuck", version, about = "Browse an anime catalog and resume episodes in mpv")]
struct Cli {
    #[arg(short, long, help = "Theme name")]
    theme: Option<String>,

    #[arg(long, help = "Watch-history file")]
    history_file: Option<PathBuf>,

    #[arg(long, help = "Also append log lines to this file")]
    log_file: Option<PathBuf>,

    #[arg(short, long, help = "Add a search directory for this term")]
    search: Option<String>,

    #[arg(short, long, help = "Log debug messages")]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load()?;
    if let Some(theme) = cli.theme {
        config.theme = theme;
    }
    if let Some(path) = cli.history_file {
        config.history_file = Some(path);
    }

    let sink = LogSink::new();
    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    logging::install(sink.clone(), cli.log_file.as_deref(), level)?;

    let theme = Theme::load(&config.theme).unwrap_or_else(|| {
        log::warn!(
            "Unknown theme {:?}, available: {}",
            config.theme,
            Theme::available_themes().join(", ")
        );
        Theme::default()
    });
    let history_path = config
        .history_file
        .clone()
        .unwrap_or_else(HistoryStore::default_path);
    let history = HistoryStore::open(&history_path);
    let catalog = HttpCatalog::new(
        &config.api_base_url,
        &config.search_url,
        config.session_id.clone(),
        Some(config.locale.clone()),
    )?;
    let player = Streamlink::new(config.player.clone());

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.hide_cursor()?;

    let result = run(terminal, theme, &config, cli.search.as_deref(), sink, Services {
        catalog,
        player,
        history,
    });

    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen)?;

    if let Err(err) = result {
        eprintln!("Error: {err:?}");
    }

    Ok(())
}

fn run(
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
    theme: Theme,
    config: &Config,
    search: Option<&str>,
    sink: LogSink,
    services: Services<HttpCatalog, Streamlink>,
) -> Result<()> {
    let (width, height) = crossterm::terminal::size()?;
    let (screen, panes) = app::build_screen(width, height, theme, config)?;
    let mut surface = TerminalSurface::new(terminal);
    surface.terminal_mut().clear()?;
    let mut shell = Shell::new(screen, Box::new(surface), sink);
    let mut app = App::new(&mut shell, panes, services, config, search)?;

    let result = shell.run(&mut app, &mut TerminalKeys);
    app.save_history();
    result
}
