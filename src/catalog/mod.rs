pub mod http;

use serde::Deserialize;
use thiserror::Error;

pub use http::HttpCatalog;

/// Prefix of every id written to the watch history.
pub const HISTORY_PREFIX: &str = "CR-";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("request for {method} failed: {message}")]
    Transport { method: String, message: String },
    #[error("{method} returned {code}: {message}")]
    Api {
        method: String,
        code: String,
        message: String,
    },
    #[error("unexpected response from {method}: {message}")]
    Decode { method: String, message: String },
    #[error("network support is not compiled in")]
    Offline,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Series {
    pub series_id: String,
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub description: String,
}

impl Series {
    pub fn history_key(&self) -> String {
        format!("{HISTORY_PREFIX}{}", self.series_id)
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Collection {
    pub collection_id: String,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Episode {
    pub media_id: String,
    #[serde(default)]
    pub episode_number: String,
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub collection_id: Option<String>,
}

impl Episode {
    pub fn history_key(&self) -> String {
        format!("{HISTORY_PREFIX}{}", self.media_id)
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct QueueEntry {
    pub series: Series,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaType {
    Anime,
    Drama,
}

impl MediaType {
    pub fn as_str(self) -> &'static str {
        match self {
            MediaType::Anime => "anime",
            MediaType::Drama => "drama",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SeriesFilter {
    Popular,
    Simulcast,
    Updated,
    Alpha,
    Prefix(String),
    Tag(String),
}

impl SeriesFilter {
    pub fn as_param(&self) -> String {
        match self {
            SeriesFilter::Popular => "popular".to_string(),
            SeriesFilter::Simulcast => "simulcast".to_string(),
            SeriesFilter::Updated => "updated".to_string(),
            SeriesFilter::Alpha => "alpha".to_string(),
            SeriesFilter::Prefix(p) => format!("prefix:{p}"),
            SeriesFilter::Tag(t) => format!("tag:{t}"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortOption {
    Asc,
    Desc,
}

impl SortOption {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOption::Asc => "asc",
            SortOption::Desc => "desc",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Page {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl Page {
    pub fn limit(limit: u32) -> Self {
        Self {
            limit: Some(limit),
            offset: None,
        }
    }
}

/// Case-insensitive substring match on series names.
pub fn filter_candidates(candidates: &[Series], term: &str) -> Vec<Series> {
    let term = term.to_lowercase();
    candidates
        .iter()
        .filter(|s| s.name.to_lowercase().contains(&term))
        .cloned()
        .collect()
}

/// The remote catalog and the user's queue.
pub trait Catalog {
    fn list_series(
        &mut self,
        media_type: MediaType,
        filter: &SeriesFilter,
        page: Page,
    ) -> Result<Vec<Series>, CatalogError>;

    fn list_collections(
        &mut self,
        series_id: &str,
        sort: Option<SortOption>,
        page: Page,
    ) -> Result<Vec<Collection>, CatalogError>;

    fn list_media(
        &mut self,
        series_id: &str,
        sort: Option<SortOption>,
        page: Page,
        locale: Option<&str>,
    ) -> Result<Vec<Episode>, CatalogError>;

    /// Every series name the site can search, fetched once per process.
    fn list_search_candidates(&mut self) -> Result<Vec<Series>, CatalogError>;

    fn get_queue(&mut self, media_type: MediaType) -> Result<Vec<QueueEntry>, CatalogError>;

    fn remove_from_queue(&mut self, series_id: &str) -> Result<(), CatalogError>;

    fn search(&mut self, term: &str) -> Result<Vec<Series>, CatalogError> {
        Ok(filter_candidates(&self.list_search_candidates()?, term))
    }
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

    #[test]
    fn test_filter_candidates_case_insensitive() {
        let all = vec![
            series("1", "Mob Psycho 100"),
            series("2", "One Punch Man"),
            series("3", "Psycho-Pass"),
        ];
        let found: Vec<String> = filter_candidates(&all, "PSYCHO")
            .into_iter()
            .map(|s| s.series_id)
            .collect();
        assert_eq!(found, vec!["1", "3"]);
        assert!(filter_candidates(&all, "bebop").is_empty());
    }

    #[test]
    fn test_history_keys_are_prefixed() {
        assert_eq!(series("42", "x").history_key(), "CR-42");
        let ep: Episode = serde_json::from_str(
            r#"{"media_id": "9", "name": "Pilot", "url": "https://example.org/9"}"#,
        )
        .unwrap();
        assert_eq!(ep.history_key(), "CR-9");
        assert_eq!(ep.episode_number, "");
        assert_eq!(ep.collection_id, None);
    }

    #[test]
    fn test_filter_params() {
        assert_eq!(SeriesFilter::Prefix("a".into()).as_param(), "prefix:a");
        assert_eq!(SeriesFilter::Tag("drama".into()).as_param(), "tag:drama");
        assert_eq!(SeriesFilter::Simulcast.as_param(), "simulcast");
    }
}
