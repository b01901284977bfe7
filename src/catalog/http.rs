use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::catalog::{
    Catalog, CatalogError, Collection, Episode, MediaType, Page, QueueEntry, Series, SeriesFilter,
    SortOption,
};

const SECURE_PREFIX: &str = "/*-secure-";
const SECURE_SUFFIX: &str = "*/";

#[derive(Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    error: bool,
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
    data: Option<T>,
}

/// Unwrap the `{error, code, message, data}` document every API method returns.
pub fn parse_envelope<T: DeserializeOwned>(method: &str, body: &str) -> Result<Option<T>, CatalogError> {
    let envelope: Envelope<T> = serde_json::from_str(body).map_err(|e| CatalogError::Decode {
        method: method.to_string(),
        message: e.to_string(),
    })?;
    if envelope.error {
        return Err(CatalogError::Api {
            method: method.to_string(),
            code: envelope.code,
            message: envelope.message,
        });
    }
    Ok(envelope.data)
}

#[derive(Deserialize)]
struct SearchCandidate {
    #[serde(rename = "type")]
    kind: String,
    id: String,
    name: String,
    #[serde(default)]
    link: String,
}

/// Series entries of the search-candidates document, which is wrapped in a
/// `/*-secure- ... */` comment.
pub fn parse_search_candidates(body: &str) -> Result<Vec<Series>, CatalogError> {
    let decode = |message: String| CatalogError::Decode {
        method: "search candidates".to_string(),
        message,
    };
    let trimmed = body.trim();
    let json = trimmed
        .strip_prefix(SECURE_PREFIX)
        .and_then(|rest| rest.strip_suffix(SECURE_SUFFIX))
        .unwrap_or(trimmed);
    let envelope: Envelope<Vec<SearchCandidate>> =
        serde_json::from_str(json).map_err(|e| decode(e.to_string()))?;
    let candidates = envelope
        .data
        .ok_or_else(|| decode("missing data".to_string()))?;
    Ok(candidates
        .into_iter()
        .filter(|c| c.kind == "Series")
        .map(|c| Series {
            series_id: c.id,
            name: c.name,
            url: c.link,
            description: String::new(),
        })
        .collect())
}

/// Catalog backed by the site's JSON API.
pub struct HttpCatalog {
    base_url: String,
    search_url: String,
    session_id: Option<String>,
    locale: Option<String>,
    search_candidates: Option<Vec<Series>>,
    #[cfg(feature = "network")]
    client: reqwest::blocking::Client,
}

impl HttpCatalog {
    pub fn new(
        base_url: &str,
        search_url: &str,
        session_id: Option<String>,
        locale: Option<String>,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            search_url: search_url.to_string(),
            session_id,
            locale,
            search_candidates: None,
            #[cfg(feature = "network")]
            client: reqwest::blocking::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()?,
        })
    }

    pub fn method_url(&self, method: &str) -> String {
        format!("{}/{method}.0.json", self.base_url)
    }

    fn call<T: DeserializeOwned>(&self, method: &str, mut params: Vec<(&str, String)>) -> Result<Option<T>, CatalogError> {
        if let Some(session) = &self.session_id {
            params.push(("session_id", session.clone()));
        }
        if let Some(locale) = &self.locale {
            if !params.iter().any(|(k, _)| *k == "locale") {
                params.push(("locale", locale.clone()));
            }
        }
        log::debug!("api call {method}");
        let body = self.fetch(method, &self.method_url(method), &params)?;
        parse_envelope(method, &body)
    }

    fn call_data<T: DeserializeOwned>(&self, method: &str, params: Vec<(&str, String)>) -> Result<T, CatalogError> {
        self.call(method, params)?.ok_or_else(|| CatalogError::Decode {
            method: method.to_string(),
            message: "missing data".to_string(),
        })
    }

    #[cfg(feature = "network")]
    fn fetch(&self, method: &str, url: &str, params: &[(&str, String)]) -> Result<String, CatalogError> {
        let transport = |e: reqwest::Error| CatalogError::Transport {
            method: method.to_string(),
            message: e.to_string(),
        };
        let response = self
            .client
            .get(url)
            .query(params)
            .send()
            .map_err(transport)?
            .error_for_status()
            .map_err(transport)?;
        response.text().map_err(transport)
    }

    #[cfg(not(feature = "network"))]
    fn fetch(&self, _method: &str, _url: &str, _params: &[(&str, String)]) -> Result<String, CatalogError> {
        Err(CatalogError::Offline)
    }
}

fn page_params(params: &mut Vec<(&str, String)>, page: Page) {
    if let Some(limit) = page.limit {
        params.push(("limit", limit.to_string()));
    }
    if let Some(offset) = page.offset {
        params.push(("offset", offset.to_string()));
    }
}

impl Catalog for HttpCatalog {
    fn list_series(
        &mut self,
        media_type: MediaType,
        filter: &SeriesFilter,
        page: Page,
    ) -> Result<Vec<Series>, CatalogError> {
        let mut params = vec![
            ("media_type", media_type.as_str().to_string()),
            ("filter", filter.as_param()),
        ];
        page_params(&mut params, page);
        self.call_data("list_series", params)
    }

    fn list_collections(
        &mut self,
        series_id: &str,
        sort: Option<SortOption>,
        page: Page,
    ) -> Result<Vec<Collection>, CatalogError> {
        let mut params = vec![("series_id", series_id.to_string())];
        if let Some(sort) = sort {
            params.push(("sort", sort.as_str().to_string()));
        }
        page_params(&mut params, page);
        self.call_data("list_collections", params)
    }

    fn list_media(
        &mut self,
        series_id: &str,
        sort: Option<SortOption>,
        page: Page,
        locale: Option<&str>,
    ) -> Result<Vec<Episode>, CatalogError> {
        let mut params = vec![("series_id", series_id.to_string())];
        if let Some(sort) = sort {
            params.push(("sort", sort.as_str().to_string()));
        }
        page_params(&mut params, page);
        if let Some(locale) = locale {
            params.push(("locale", locale.to_string()));
        }
        self.call_data("list_media", params)
    }

    fn list_search_candidates(&mut self) -> Result<Vec<Series>, CatalogError> {
        if let Some(cached) = &self.search_candidates {
            return Ok(cached.clone());
        }
        let body = self.fetch("search candidates", &self.search_url, &[])?;
        let candidates = parse_search_candidates(&body)?;
        log::info!("Fetched {} search candidates", candidates.len());
        self.search_candidates = Some(candidates.clone());
        Ok(candidates)
    }

    fn get_queue(&mut self, media_type: MediaType) -> Result<Vec<QueueEntry>, CatalogError> {
        let params = vec![
            ("media_types", media_type.as_str().to_string()),
            ("fields", "series.series_id,series.name,series.url".to_string()),
        ];
        self.call_data("queue", params)
    }

    fn remove_from_queue(&mut self, series_id: &str) -> Result<(), CatalogError> {
        self.call::<serde_json::Value>("remove_from_queue", vec![("series_id", series_id.to_string())])?;
        Ok(())
    }
}
