use anyhow::Result;
use log::Level;
use ratatui::style::Modifier;

use crate::catalog::{Catalog, Page, Series, SortOption};
use crate::config::Config;
use crate::error::LayoutResult;
use crate::event::Key;
use crate::library::{self, DirId, Entry, EpisodeRow, Library};
use crate::logging;
use crate::player::{Player, STATUS_MARKER};
use crate::store::history::HistoryStore;
use crate::ui::browser::Browser;
use crate::ui::control_switch::ControlSwitch;
use crate::ui::event_map::Handler;
use crate::ui::screen::{NodeId, Screen};
use crate::ui::shell::{Controller, Dispatch, Flow, Shell};
use crate::ui::theme::Theme;
use crate::ui::value::Value;
use crate::ui::widget::{Container, Item, LogView, ShortcutBar, Widget};

pub const APP_NAME: &str = "CR-unsuck";
pub const APP_VERSION: &str = "0.1";

const COLLECTION_PAGE_SIZE: u32 = 50;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Msg {
    Quit,
    NextPane,
    PrevPane,
    OpenEntry,
    PlayEpisode,
    RemoveFromQueue,
    ToggleSort,
    ClearLog,
}

pub type AppScreen = Screen<Msg, Entry>;
pub type AppShell = Shell<Msg, Entry>;

/// Nodes the application talks to after assembly.
#[derive(Clone, Copy, Debug)]
pub struct Panes {
    pub panes_row: NodeId,
    pub anime: NodeId,
    pub episodes: NodeId,
    pub log: NodeId,
    pub shortcuts: NodeId,
}

/// Assemble the main window: a titled frame holding the anime and episode lists side by
/// side, the log under them and the shortcut bar at the bottom.
pub fn build_screen(width: u16, height: u16, theme: Theme, config: &Config) -> LayoutResult<(AppScreen, Panes)> {
    let mut screen = Screen::new(width, height, theme);
    let root = screen.root();

    let title = format!("{APP_NAME} v{APP_VERSION}");
    let main = screen.add_widget(
        root,
        Widget::Container(
            Container::new(false, Some(&title))
                .centered()
                .emphasis(Modifier::BOLD | Modifier::UNDERLINED),
        ),
    )?;
    let column = screen.vertical(main, Value::fill(), Value::fill())?;

    let panes_row = screen.horizontal(column, Value::fill(), config.layout.browser_pane_height)?;
    let anime_pane = screen.base(panes_row, config.layout.anime_pane_width, Value::fill())?;
    let anime_frame = screen.add_widget(anime_pane, Widget::Container(Container::new(true, Some("Anime"))))?;
    let anime = screen.add_widget(anime_frame, Widget::Browser(Browser::new()))?;
    let episode_frame = screen.add_widget(panes_row, Widget::Container(Container::new(true, Some("Episodes"))))?;
    let episodes = screen.add_widget(episode_frame, Widget::Browser(Browser::new()))?;

    let log_pane = screen.base(column, Value::fill(), Value::absolute(-1))?;
    let log_frame = screen.add_widget(log_pane, Widget::Container(Container::new(true, Some("Log"))))?;
    let log = screen.add_widget(log_frame, Widget::Log(LogView::new(config.log_buffer_size)))?;

    let shortcuts = screen.add_widget(column, Widget::Shortcut(ShortcutBar::new()))?;

    Ok((
        screen,
        Panes {
            panes_row,
            anime,
            episodes,
            log,
            shortcuts,
        },
    ))
}

/// External collaborators of the application.
pub struct Services<C, P> {
    pub catalog: C,
    pub player: P,
    pub history: HistoryStore,
}

pub struct App<C, P> {
    catalog: C,
    player: P,
    history: HistoryStore,
    library: Library,
    switch: ControlSwitch,
    panes: Panes,
    current_dir: DirId,
    current_series: Option<Series>,
    locale: String,
    episode_page_size: u32,
    rewind_secs: f64,
}

impl<C: Catalog, P: Player> App<C, P> {
    pub fn new(
        shell: &mut AppShell,
        panes: Panes,
        services: Services<C, P>,
        config: &Config,
        search: Option<&str>,
    ) -> Result<Self> {
        shell.attach_log(panes.log);
        let root = shell.screen().root();
        shell.register_shortcuts(
            panes.shortcuts,
            panes.anime,
            vec![
                (Key::Char('s'), "sort", Msg::ToggleSort),
                (Key::Char('d'), "delete", Msg::RemoveFromQueue),
            ],
        )?;
        shell.register_shortcuts(
            panes.shortcuts,
            root,
            vec![
                (Key::Char('c'), "clear log", Msg::ClearLog),
                (Key::Char('q'), "exit", Msg::Quit),
            ],
        )?;

        let screen = shell.screen_mut();
        for (key, message) in [
            (Key::Char('l'), Msg::NextPane),
            (Key::Right, Msg::NextPane),
            (Key::Char('h'), Msg::PrevPane),
            (Key::Left, Msg::PrevPane),
        ] {
            screen.register_event(panes.panes_row, key, Handler::Emit(message))?;
        }
        screen.set_selection_callback(panes.anime, Msg::OpenEntry)?;
        screen.set_selection_callback(panes.episodes, Msg::PlayEpisode)?;

        let switch = ControlSwitch::new(
            shell,
            vec![("anime", panes.anime), ("episodes", panes.episodes)],
            0,
        )?;

        let mut app = Self {
            catalog: services.catalog,
            player: services.player,
            history: services.history,
            library: Library::new(search, config.episode_page_size),
            switch,
            panes,
            current_dir: Library::ROOT,
            current_series: None,
            locale: config.locale.clone(),
            episode_page_size: config.episode_page_size,
            rewind_secs: config.resume_rewind_secs,
        };
        app.list_directory(shell, Library::ROOT)?;
        Ok(app)
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn player(&self) -> &P {
        &self.player
    }

    pub fn current_directory(&self) -> DirId {
        self.current_dir
    }

    pub fn current_series(&self) -> Option<&Series> {
        self.current_series.as_ref()
    }

    pub fn control_name(&self) -> &str {
        self.switch.current_name()
    }

    /// Persist the watch history. A failed write is logged once.
    pub fn save_history(&mut self) {
        self.history.persist();
    }

    fn list_directory(&mut self, shell: &mut AppShell, dir: DirId) -> Result<()> {
        if let Some(d) = self.library.directory(dir).filter(|_| dir != Library::ROOT) {
            log::info!("Loading {}", d.name);
        }
        let rows = match self.library.entries(dir, &mut self.catalog, &self.history) {
            Ok(rows) => rows,
            Err(err) => {
                log::error!("Couldn't list directory: {err}");
                return Ok(());
            }
        };
        let screen = shell.screen_mut();
        let list = self.panes.anime;
        screen.clear_browser(list)?;
        for (text, entry) in rows {
            screen.add_item(list, Item::new(text, entry))?;
        }
        screen.redraw(list)?;
        self.current_dir = dir;
        Ok(())
    }

    fn list_episodes(&mut self, shell: &mut AppShell, series: Series) -> Result<()> {
        log::info!("Fetching episodes...");
        let episodes = match self.catalog.list_media(
            &series.series_id,
            Some(SortOption::Desc),
            Page::limit(self.episode_page_size),
            Some(&self.locale),
        ) {
            Ok(episodes) => episodes,
            Err(err) => {
                log::error!("Couldn't fetch episodes: {err}");
                return Ok(());
            }
        };
        log::info!("Fetched {} episodes", episodes.len());
        log::info!("Fetching collections...");
        let collections = self
            .catalog
            .list_collections(&series.series_id, None, Page::limit(COLLECTION_PAGE_SIZE))
            .unwrap_or_else(|err| {
                log::warn!("Couldn't fetch collections: {err}");
                Vec::new()
            });
        log::info!("Fetched {} collections", collections.len());

        let series_key = series.history_key();
        let screen = shell.screen_mut();
        let list = self.panes.episodes;
        screen.clear_browser(list)?;
        for row in library::episode_rows(&episodes, &collections, &self.history) {
            match row {
                EpisodeRow::Heading(name) => {
                    screen.add_heading(list, &name)?;
                }
                EpisodeRow::Episode {
                    text,
                    episode,
                    default,
                } => {
                    let entry = Entry::Episode {
                        episode,
                        series_key: series_key.clone(),
                    };
                    screen.add_item(list, Item::new(text, entry).default_selection(default))?;
                }
            }
        }
        self.current_series = Some(series);
        self.switch.switch_to(shell, "episodes")
    }

    fn open_entry(&mut self, shell: &mut AppShell, entry: Entry) -> Result<()> {
        match entry {
            Entry::Back(dir) | Entry::Directory(dir) => self.list_directory(shell, dir),
            Entry::Series(series) => self.list_episodes(shell, series),
            Entry::Episode { .. } => Ok(()),
        }
    }

    /// Hand the episode to the player and block until it exits. Keys are not read while
    /// the player runs; progress lines go to the history and the log panel as they arrive.
    fn play(&mut self, shell: &mut AppShell, entry: Entry) -> Result<()> {
        let Entry::Episode { episode, series_key } = entry else {
            return Ok(());
        };
        let key = episode.history_key();
        self.history.touch_item(&series_key);
        let start = (self.history.playhead(&key) - self.rewind_secs).max(0.0);
        log::info!("{}", self.player.describe(&episode.url, start));
        shell.present()?;

        let history = &mut self.history;
        let outcome = self.player.play(&episode.url, start, &mut |progress| {
            history.record_history(&key, progress.position, None);
            let line = logging::format_line(
                Level::Info,
                format_args!("{STATUS_MARKER} {} {}", progress.position, progress.duration),
            );
            if let Err(err) = shell.log(&line) {
                log::warn!("Couldn't show player progress: {err:#}");
            }
        });
        match outcome {
            Ok(Some(last)) => {
                self.history
                    .record_history(&key, last.position, Some(last.duration));
                log::info!(
                    "Stopped {} at {:.0}s of {:.0}s",
                    episode.name,
                    last.position,
                    last.duration
                );
            }
            Ok(None) => self.history.record_history(&key, 0.0, None),
            Err(err) => log::error!("Playback failed: {err:#}"),
        }
        self.save_history();
        shell.redraw_all()
    }

    fn remove_from_queue(&mut self, shell: &mut AppShell, entry: Entry) -> Result<()> {
        if !self.library.is_queue(self.current_dir) {
            return Ok(());
        }
        let Entry::Series(series) = entry else {
            return Ok(());
        };
        match self.catalog.remove_from_queue(&series.series_id) {
            Ok(()) => {
                log::info!("Successfully removed {} from the queue", series.name);
                let screen = shell.screen_mut();
                screen.remove_selected(self.panes.anime)?;
                screen.redraw(self.panes.anime)?;
            }
            Err(err) => log::error!("Error removing the item: {err}"),
        }
        Ok(())
    }

    fn toggle_sort(&mut self, shell: &mut AppShell) -> Result<()> {
        if !self.library.is_queue(self.current_dir) {
            return Ok(());
        }
        let order = self.library.toggle_queue_order();
        log::info!("Sorting queue by {}", order.describe());
        self.list_directory(shell, self.current_dir)
    }
}

fn selected_entry(shell: &AppShell, dispatch: &Dispatch<Msg>) -> Result<Option<Entry>> {
    match dispatch.selected {
        Some(id) => Ok(Some(shell.screen().item(id)?.payload.clone())),
        None => Ok(None),
    }
}

impl<C: Catalog, P: Player> Controller<Msg, Entry> for App<C, P> {
    fn update(&mut self, shell: &mut AppShell, dispatch: Dispatch<Msg>) -> Result<Flow> {
        match dispatch.message {
            Msg::Quit => shell.quit(),
            Msg::NextPane => self.switch.next(shell)?,
            Msg::PrevPane => self.switch.previous(shell)?,
            Msg::OpenEntry => {
                if let Some(entry) = selected_entry(shell, &dispatch)? {
                    self.open_entry(shell, entry)?;
                }
            }
            Msg::PlayEpisode => {
                if let Some(entry) = selected_entry(shell, &dispatch)? {
                    self.play(shell, entry)?;
                }
            }
            Msg::RemoveFromQueue => {
                if let Some(entry) = selected_entry(shell, &dispatch)? {
                    self.remove_from_queue(shell, entry)?;
                }
            }
            Msg::ToggleSort => self.toggle_sort(shell)?,
            Msg::ClearLog => shell.clear_log()?,
        }
        Ok(Flow::Stop)
    }
}
