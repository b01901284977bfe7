use std::collections::HashMap;

use crate::catalog::{
    Catalog, CatalogError, Collection, Episode, MediaType, Page, QueueEntry, Series, SeriesFilter,
};
use crate::store::history::HistoryStore;

pub type DirId = usize;

pub const BACK_LABEL: &str = "<- (Back)";
pub const COMPLETED_MARK: &str = "\u{2713}";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DirectoryKind {
    Root,
    Queue,
    Popular,
    Simulcasts,
    Search(String),
}

#[derive(Clone, Debug)]
pub struct Directory {
    pub name: String,
    pub parent: Option<DirId>,
    pub kind: DirectoryKind,
}

/// Payload attached to every row of the two browsers.
#[derive(Clone, Debug, PartialEq)]
pub enum Entry {
    Back(DirId),
    Directory(DirId),
    Series(Series),
    Episode { episode: Episode, series_key: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueueOrder {
    /// Most recently opened series first, then by name.
    RecentlyWatched,
    Name,
}

impl QueueOrder {
    pub fn toggled(self) -> Self {
        match self {
            QueueOrder::RecentlyWatched => QueueOrder::Name,
            QueueOrder::Name => QueueOrder::RecentlyWatched,
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            QueueOrder::RecentlyWatched => "recently watched",
            QueueOrder::Name => "name",
        }
    }
}

pub fn sort_queue(series: &mut [Series], history: &HistoryStore, order: QueueOrder) {
    match order {
        QueueOrder::RecentlyWatched => series.sort_by(|a, b| {
            let accessed = |s: &Series| history.item_last_accessed(&s.history_key());
            accessed(b)
                .cmp(&accessed(a))
                .then_with(|| a.name.cmp(&b.name))
        }),
        QueueOrder::Name => series.sort_by(|a, b| a.name.cmp(&b.name)),
    }
}

/// The directory tree shown in the anime pane.
#[derive(Clone, Debug)]
pub struct Library {
    dirs: Vec<Directory>,
    queue_order: QueueOrder,
    page_size: u32,
}

impl Library {
    pub const ROOT: DirId = 0;

    pub fn new(search: Option<&str>, page_size: u32) -> Self {
        let mut library = Self {
            dirs: vec![Directory {
                name: String::new(),
                parent: None,
                kind: DirectoryKind::Root,
            }],
            queue_order: QueueOrder::RecentlyWatched,
            page_size,
        };
        library.add(Self::ROOT, "CR Queue", DirectoryKind::Queue);
        library.add(Self::ROOT, "Popular", DirectoryKind::Popular);
        library.add(Self::ROOT, "Simulcasts", DirectoryKind::Simulcasts);
        if let Some(term) = search.filter(|t| !t.trim().is_empty()) {
            library.add(
                Self::ROOT,
                &format!("Search: {term}"),
                DirectoryKind::Search(term.to_string()),
            );
        }
        library
    }

    fn add(&mut self, parent: DirId, name: &str, kind: DirectoryKind) -> DirId {
        self.dirs.push(Directory {
            name: name.to_string(),
            parent: Some(parent),
            kind,
        });
        self.dirs.len() - 1
    }

    pub fn directory(&self, id: DirId) -> Option<&Directory> {
        self.dirs.get(id)
    }

    pub fn subdirectories(&self, id: DirId) -> Vec<DirId> {
        (0..self.dirs.len())
            .filter(|&d| self.dirs[d].parent == Some(id))
            .collect()
    }

    pub fn queue_order(&self) -> QueueOrder {
        self.queue_order
    }

    pub fn toggle_queue_order(&mut self) -> QueueOrder {
        self.queue_order = self.queue_order.toggled();
        self.queue_order
    }

    pub fn is_queue(&self, id: DirId) -> bool {
        self.directory(id)
            .is_some_and(|d| d.kind == DirectoryKind::Queue)
    }

    /// Rows for directory `id`: a back link to the parent (except at the root), then the
    /// subdirectories and series it holds.
    pub fn entries(
        &self,
        id: DirId,
        catalog: &mut dyn Catalog,
        history: &HistoryStore,
    ) -> Result<Vec<(String, Entry)>, CatalogError> {
        let Some(dir) = self.directory(id) else {
            return Ok(Vec::new());
        };
        let mut rows = Vec::new();
        if let Some(parent) = dir.parent {
            rows.push((BACK_LABEL.to_string(), Entry::Back(parent)));
        }
        for sub in self.subdirectories(id) {
            rows.push((self.dirs[sub].name.clone(), Entry::Directory(sub)));
        }

        let series = match &dir.kind {
            DirectoryKind::Root => Vec::new(),
            DirectoryKind::Queue => {
                let mut series: Vec<Series> = catalog
                    .get_queue(MediaType::Anime)?
                    .into_iter()
                    .map(|QueueEntry { series }| series)
                    .collect();
                sort_queue(&mut series, history, self.queue_order);
                series
            }
            DirectoryKind::Popular => catalog.list_series(
                MediaType::Anime,
                &SeriesFilter::Popular,
                Page::limit(self.page_size),
            )?,
            DirectoryKind::Simulcasts => catalog.list_series(
                MediaType::Anime,
                &SeriesFilter::Simulcast,
                Page::limit(self.page_size),
            )?,
            DirectoryKind::Search(term) => catalog.search(term)?,
        };
        rows.extend(series.into_iter().map(|s| (s.name.clone(), Entry::Series(s))));
        Ok(rows)
    }
}

/// Align the cells of `rows` into columns separated by at least `padding` spaces.
///
/// Each column starts where the widest entry of the previous one (plus padding) ends;
/// the last column is not padded.
pub fn tablize(rows: &[Vec<String>], padding: usize) -> Vec<String> {
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    let mut stops = Vec::with_capacity(columns);
    let mut previous = 0;
    for col in 0..columns {
        let widest = rows
            .iter()
            .map(|r| r.get(col).map_or(0, |c| c.chars().count()))
            .max()
            .unwrap_or(0);
        previous += widest + padding;
        stops.push(previous);
    }

    rows.iter()
        .map(|row| {
            let mut line = String::new();
            for col in 0..columns {
                line.push_str(row.get(col).map_or("", String::as_str));
                if col + 1 < columns {
                    let len = line.chars().count();
                    line.push_str(&" ".repeat(stops[col].saturating_sub(len)));
                }
            }
            line
        })
        .collect()
}

#[derive(Clone, Debug, PartialEq)]
pub enum EpisodeRow {
    Heading(String),
    Episode {
        text: String,
        episode: Episode,
        default: bool,
    },
}

/// Lay out an episode list: one aligned `number | mark | name` row per episode, a heading
/// whenever the collection changes, and the most recently watched episode as default.
pub fn episode_rows(
    episodes: &[Episode],
    collections: &[Collection],
    history: &HistoryStore,
) -> Vec<EpisodeRow> {
    let names: HashMap<&str, &str> = collections
        .iter()
        .map(|c| (c.collection_id.as_str(), c.name.as_str()))
        .collect();

    let mut latest: Option<(usize, i64)> = None;
    let cells: Vec<Vec<String>> = episodes
        .iter()
        .enumerate()
        .map(|(i, episode)| {
            let key = episode.history_key();
            let accessed = history.last_accessed(&key);
            if accessed > latest.map_or(0, |(_, t)| t) {
                latest = Some((i, accessed));
            }
            let mark = if history.completed(&key) { COMPLETED_MARK } else { "" };
            vec![
                episode.episode_number.clone(),
                mark.to_string(),
                episode.name.clone(),
            ]
        })
        .collect();
    let texts = tablize(&cells, 3);

    let mut rows = Vec::new();
    let mut current: Option<&str> = None;
    for (i, (episode, text)) in episodes.iter().zip(texts).enumerate() {
        let collection = episode.collection_id.as_deref();
        if i == 0 || collection != current {
            current = collection;
            if let Some(name) = collection.and_then(|c| names.get(c)) {
                rows.push(EpisodeRow::Heading(name.to_string()));
            }
        }
        rows.push(EpisodeRow::Episode {
            text,
            episode: episode.clone(),
            default: latest.is_some_and(|(l, _)| l == i),
        });
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(id: &str, name: &str) -> Series {
        Series {
            series_id: id.to_string(),
            name: name.to_string(),
            url: String::new(),
            description: String::new(),
        }
    }

    fn episode(id: &str, number: &str, name: &str, collection: &str) -> Episode {
        Episode {
            media_id: id.to_string(),
            episode_number: number.to_string(),
            name: name.to_string(),
            url: format!("https://example.org/{id}"),
            collection_id: Some(collection.to_string()),
        }
    }

    #[test]
    fn test_tablize_aligns_columns() {
        let rows = vec![
            vec!["1".to_string(), "\u{2713}".to_string(), "Pilot".to_string()],
            vec!["12".to_string(), String::new(), "Finale".to_string()],
        ];
        assert_eq!(
            tablize(&rows, 3),
            vec!["1    \u{2713}   Pilot".to_string(), "12       Finale".to_string()]
        );
        assert!(tablize(&[], 3).is_empty());
    }

    #[test]
    fn test_queue_sorted_by_recent_access_then_name() {
        let mut history = HistoryStore::in_memory();
        history.touch_item_at("CR-2", 100);
        history.touch_item_at("CR-3", 200);
        let mut queue = vec![series("1", "Zeta"), series("2", "Beta"), series("3", "Gamma"), series("4", "Alpha")];
        sort_queue(&mut queue, &history, QueueOrder::RecentlyWatched);
        let names: Vec<&str> = queue.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Gamma", "Beta", "Alpha", "Zeta"]);

        sort_queue(&mut queue, &history, QueueOrder::Name);
        let names: Vec<&str> = queue.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Beta", "Gamma", "Zeta"]);
    }

    #[test]
    fn test_library_root_lists_directories() {
        let library = Library::new(Some("psycho"), 50);
        let names: Vec<&str> = library
            .subdirectories(Library::ROOT)
            .into_iter()
            .filter_map(|d| library.directory(d).map(|d| d.name.as_str()))
            .collect();
        assert_eq!(names, vec!["CR Queue", "Popular", "Simulcasts", "Search: psycho"]);
        assert!(library.is_queue(1));
        assert!(!Library::new(None, 50).directory(4).is_some());
    }

    #[test]
    fn test_episode_rows_headings_and_default() {
        let mut history = HistoryStore::in_memory();
        history.record_history_at("CR-e2", 1400.0, Some(1440.0), 500);
        history.record_history_at("CR-e3", 100.0, Some(1440.0), 900);
        let episodes = vec![
            episode("e3", "3", "Third", "s2"),
            episode("e2", "2", "Second", "s1"),
            episode("e1", "1", "First", "s1"),
        ];
        let collections = vec![
            Collection { collection_id: "s1".into(), name: "Season 1".into() },
            Collection { collection_id: "s2".into(), name: "Season 2".into() },
        ];
        let rows = episode_rows(&episodes, &collections, &history);
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0], EpisodeRow::Heading("Season 2".into()));
        assert!(matches!(&rows[1], EpisodeRow::Episode { default: true, episode, .. } if episode.media_id == "e3"));
        assert_eq!(rows[2], EpisodeRow::Heading("Season 1".into()));
        match &rows[3] {
            EpisodeRow::Episode { text, default, .. } => {
                assert_eq!(text, "2   \u{2713}   Second");
                assert!(!default);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_episode_rows_without_history_have_no_default() {
        let history = HistoryStore::in_memory();
        let episodes = vec![episode("e1", "1", "First", "unknown")];
        let rows = episode_rows(&episodes, &[], &history);
        assert_eq!(rows.len(), 1);
        assert!(matches!(rows[0], EpisodeRow::Episode { default: false, .. }));
    }
}
