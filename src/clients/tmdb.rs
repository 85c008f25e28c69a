//! TMDB API client.
//!
//! Token, proxy, timeout and language are read from the shared config on
//! every call, so settings changed at runtime apply to the next request
//! without any client rebuild. Authentication follows the token flavor:
//! v4 Bearer tokens (they start with `eyJ`) go into the `Authorization`
//! header, v3 keys into the `api_key` query parameter.

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::warn;

use crate::config::Config;
use crate::constants::tmdb::{API_BASE_URL, MAX_SEARCH_RESULTS, SITE_URL};
use crate::models::tmdb::{Episode, SearchResponse, SearchResult, Season, Series};

#[derive(Debug, Error)]
pub enum TmdbError {
    #[error("TMDB API token is not configured")]
    NotConfigured,

    #[error("TMDB request timed out: {0}")]
    Timeout(String),

    #[error("TMDB connection failed: {0}")]
    Connection(String),

    #[error("Invalid proxy URL: {0}")]
    InvalidProxy(String),
}

pub type TmdbResult<T> = Result<T, TmdbError>;

#[derive(Debug, Clone, Serialize)]
pub struct TokenStatus {
    pub is_configured: bool,
    pub is_valid: bool,
    pub error_message: Option<String>,
}

#[derive(Clone)]
pub struct TmdbClient {
    config: Arc<RwLock<Config>>,
    base_url: String,
}

impl TmdbClient {
    #[must_use]
    pub fn new(config: Arc<RwLock<Config>>) -> Self {
        Self::with_base_url(config, API_BASE_URL.to_string())
    }

    /// Point the client at a different API root. Used by tests to talk to a
    /// local mock server.
    #[must_use]
    pub const fn with_base_url(config: Arc<RwLock<Config>>, base_url: String) -> Self {
        Self { config, base_url }
    }

    fn is_bearer_token(token: &str) -> bool {
        token.starts_with("eyJ")
    }

    async fn connection_settings(&self) -> (String, Option<String>, Duration, String) {
        let config = self.config.read().await;
        (
            config.tmdb.api_token.clone(),
            config.tmdb.proxy_url.clone(),
            Duration::from_secs(config.tmdb.task_timeout),
            config.tmdb.language.clone(),
        )
    }

    fn build_http_client(
        proxy_url: Option<&str>,
        timeout: Duration,
    ) -> TmdbResult<reqwest::Client> {
        let mut builder = reqwest::Client::builder().timeout(timeout);

        if let Some(proxy_url) = proxy_url {
            let proxy = reqwest::Proxy::all(proxy_url)
                .map_err(|e| TmdbError::InvalidProxy(e.to_string()))?;
            builder = builder.proxy(proxy);
        }

        builder
            .build()
            .map_err(|e| TmdbError::Connection(e.to_string()))
    }

    fn map_transport_error(endpoint: &str, error: &reqwest::Error) -> TmdbError {
        if error.is_timeout() {
            TmdbError::Timeout(endpoint.to_string())
        } else {
            TmdbError::Connection(error.to_string())
        }
    }

    async fn request(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> TmdbResult<reqwest::Response> {
        let (token, proxy_url, timeout, _) = self.connection_settings().await;
        if token.is_empty() {
            return Err(TmdbError::NotConfigured);
        }

        let client = Self::build_http_client(proxy_url.as_deref(), timeout)?;
        let url = format!("{}{endpoint}", self.base_url);

        let mut request = client.get(&url).header("Accept", "application/json");
        if Self::is_bearer_token(&token) {
            request = request.bearer_auth(&token).query(params);
        } else {
            request = request.query(&[("api_key", token.as_str())]).query(params);
        }

        request
            .send()
            .await
            .map_err(|e| Self::map_transport_error(endpoint, &e))
    }

    // ========== Search ==========

    pub async fn search(&self, query: &str, language: Option<&str>) -> TmdbResult<SearchResponse> {
        let language = match language {
            Some(language) => language.to_string(),
            None => self.connection_settings().await.3,
        };

        let response = self
            .request(
                "/search/tv",
                &[
                    ("query", query),
                    ("language", language.as_str()),
                    ("include_adult", "true"),
                ],
            )
            .await?;

        if response.status() != reqwest::StatusCode::OK {
            return Ok(SearchResponse::empty(query.to_string()));
        }

        let raw: RawSearchResponse = response
            .json()
            .await
            .map_err(|e| TmdbError::Connection(e.to_string()))?;

        let results: Vec<SearchResult> = raw
            .results
            .into_iter()
            .take(MAX_SEARCH_RESULTS)
            .map(RawSearchResult::into_model)
            .collect();

        Ok(SearchResponse {
            query: query.to_string(),
            total_results: raw.total_results,
            results,
            effective_query: None,
        })
    }

    /// Fallback candidates for queries that found nothing: censoring glyphs,
    /// bracket groups, volume markers, OVA prefixes and trailing episode
    /// numbers are stripped in several combinations. Candidates are deduped
    /// and must keep at least two characters.
    #[must_use]
    pub fn fallback_queries(query: &str) -> Vec<String> {
        static CENSOR_RE: OnceLock<Regex> = OnceLock::new();
        static BRACKETS_RE: OnceLock<Regex> = OnceLock::new();
        static CENSOR_PREFIX_RE: OnceLock<Regex> = OnceLock::new();
        static VOLUME_RE: OnceLock<Regex> = OnceLock::new();
        static OVA_RE: OnceLock<Regex> = OnceLock::new();
        static TRAILING_NUM_RE: OnceLock<Regex> = OnceLock::new();
        static WHITESPACE_RE: OnceLock<Regex> = OnceLock::new();

        let censor = CENSOR_RE.get_or_init(|| Regex::new(r"[〇○]+").expect("valid regex"));
        let brackets = BRACKETS_RE.get_or_init(|| {
            Regex::new(r"[\[【（(][^\]】）)]*[\]】）)]").expect("valid regex")
        });
        let censor_prefix = CENSOR_PREFIX_RE
            .get_or_init(|| Regex::new(r"^[〇○]+[ぁ-ん]*").expect("valid regex"));
        let volume = VOLUME_RE.get_or_init(|| {
            Regex::new(
                r"(下[巻卷]|上[巻卷]|前[編篇]|後[編篇]|完結[編篇]|第[一二三四五六七八九十百千\d]+[巻話編章]|[Vv]ol\.?\s*\d+)",
            )
            .expect("valid regex")
        });
        let ova =
            OVA_RE.get_or_init(|| Regex::new(r"(?i)^(?:OVA|OAD|ONA)\s+").expect("valid regex"));
        let trailing_num =
            TRAILING_NUM_RE.get_or_init(|| Regex::new(r"\s+\d+\s*$").expect("valid regex"));
        let whitespace = WHITESPACE_RE.get_or_init(|| Regex::new(r"\s+").expect("valid regex"));

        let mut candidates = Vec::new();
        let mut seen = vec![query.to_string()];

        let mut add = |candidate: String| {
            let normalized = whitespace.replace_all(&candidate, " ").trim().to_string();
            if normalized.chars().count() >= 2 && !seen.contains(&normalized) {
                seen.push(normalized.clone());
                candidates.push(normalized);
            }
        };

        // 1. Censoring glyphs removed.
        let no_censor = censor.replace_all(query, "").into_owned();
        add(no_censor);

        // 2. Bracket/paren contents removed.
        let no_brackets = brackets.replace_all(query, " ").into_owned();
        add(no_brackets.clone());

        // 3. Both.
        add(censor.replace_all(&no_brackets, "").into_owned());

        // 4. Leading censor run plus the hiragana verb after it removed:
        //    "〇〇〇する七人の孕女" → "七人の孕女".
        add(censor_prefix.replace(query, "").into_owned());

        // 5. Volume markers removed.
        let no_volume = volume.replace_all(query, "").trim().to_string();
        add(no_volume.clone());

        // 6. Censor + volume + brackets combined.
        let combined = censor.replace_all(&no_volume, "").into_owned();
        add(brackets.replace_all(&combined, " ").into_owned());

        // 7. OVA/OAD/ONA prefix removed.
        add(ova.replace(query, "").into_owned());

        // 8. Trailing episode number removed.
        let no_trailing = trailing_num.replace(query, "").trim().to_string();
        add(no_trailing.clone());

        // 9. Both 7 and 8.
        add(ova.replace(&no_trailing, "").into_owned());

        candidates
    }

    /// Searches with the original query first; when that comes back empty,
    /// tries the fallback candidates in order and reports the one that
    /// matched in `effective_query`.
    pub async fn search_with_fallback(
        &self,
        query: &str,
        language: Option<&str>,
    ) -> TmdbResult<SearchResponse> {
        let primary = self.search(query, language).await?;
        if !primary.results.is_empty() {
            return Ok(primary);
        }

        for candidate in Self::fallback_queries(query) {
            let fallback = self.search(&candidate, language).await?;
            if !fallback.results.is_empty() {
                return Ok(SearchResponse {
                    query: query.to_string(),
                    total_results: fallback.total_results,
                    results: fallback.results,
                    effective_query: Some(candidate),
                });
            }
        }

        Ok(SearchResponse::empty(query.to_string()))
    }

    // ========== Details ==========

    pub async fn get_series(
        &self,
        tmdb_id: i64,
        language: Option<&str>,
    ) -> TmdbResult<Option<Series>> {
        let language = match language {
            Some(language) => language.to_string(),
            None => self.connection_settings().await.3,
        };

        let response = self
            .request(
                &format!("/tv/{tmdb_id}"),
                &[("language", language.as_str())],
            )
            .await?;

        if response.status() != reqwest::StatusCode::OK {
            return Ok(None);
        }

        let raw: RawSeries = response
            .json()
            .await
            .map_err(|e| TmdbError::Connection(e.to_string()))?;
        Ok(Some(raw.into_model()))
    }

    pub async fn get_season(
        &self,
        tmdb_id: i64,
        season_number: i32,
        language: Option<&str>,
    ) -> TmdbResult<Option<Season>> {
        let language = match language {
            Some(language) => language.to_string(),
            None => self.connection_settings().await.3,
        };

        let response = self
            .request(
                &format!("/tv/{tmdb_id}/season/{season_number}"),
                &[("language", language.as_str())],
            )
            .await?;

        if response.status() != reqwest::StatusCode::OK {
            return Ok(None);
        }

        let raw: RawSeason = response
            .json()
            .await
            .map_err(|e| TmdbError::Connection(e.to_string()))?;
        Ok(Some(raw.into_model()))
    }

    /// Series details plus per-season episode lists, fetched sequentially.
    /// Season 0 (specials) is never expanded; a failed season fetch keeps
    /// the stub from the series payload.
    pub async fn get_series_with_episodes(
        &self,
        tmdb_id: i64,
        language: Option<&str>,
        include_episodes: bool,
    ) -> TmdbResult<Option<Series>> {
        let Some(mut series) = self.get_series(tmdb_id, language).await? else {
            return Ok(None);
        };

        if !include_episodes || series.seasons.is_empty() {
            return Ok(Some(series));
        }

        let mut updated = Vec::with_capacity(series.seasons.len());
        for season in series.seasons {
            if season.season_number == 0 {
                updated.push(season);
                continue;
            }

            match self.get_season(tmdb_id, season.season_number, language).await {
                Ok(Some(detail)) if detail.episodes.is_some() => updated.push(detail),
                Ok(_) => updated.push(season),
                Err(e) => {
                    warn!(
                        "Season {} fetch failed for series {tmdb_id}: {e}",
                        season.season_number
                    );
                    updated.push(season);
                }
            }
        }

        series.seasons = updated;
        Ok(Some(series))
    }

    // ========== Token handling ==========

    /// Verifies a token against `/configuration` without persisting it.
    pub async fn verify_token(&self, token: &str) -> TokenStatus {
        let invalid = |message: String| TokenStatus {
            is_configured: false,
            is_valid: false,
            error_message: Some(message),
        };

        let (_, proxy_url, timeout, _) = self.connection_settings().await;
        let client = match Self::build_http_client(proxy_url.as_deref(), timeout) {
            Ok(client) => client,
            Err(e) => return invalid(e.to_string()),
        };

        let url = format!("{}/configuration", self.base_url);
        let mut request = client.get(&url).header("Accept", "application/json");
        if Self::is_bearer_token(token) {
            request = request.bearer_auth(token);
        } else {
            request = request.query(&[("api_key", token)]);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                return invalid("Connection timed out - check network or proxy".to_string());
            }
            Err(e) => return invalid(format!("Connection error: {e}")),
        };

        match response.status() {
            reqwest::StatusCode::OK => TokenStatus {
                is_configured: true,
                is_valid: true,
                error_message: None,
            },
            reqwest::StatusCode::UNAUTHORIZED => {
                let message = Self::status_message(response).await;
                invalid(message.unwrap_or_else(|| "API token invalid or expired".to_string()))
            }
            status => {
                let message = Self::status_message(response).await;
                invalid(message.unwrap_or_else(|| format!("Verification failed: HTTP {status}")))
            }
        }
    }

    async fn status_message(response: reqwest::Response) -> Option<String> {
        #[derive(Deserialize)]
        struct StatusBody {
            status_message: Option<String>,
        }

        response
            .json::<StatusBody>()
            .await
            .ok()
            .and_then(|body| body.status_message)
            .filter(|message| !message.is_empty())
    }

    /// Verifies first; only a valid token is written to the config file.
    pub async fn save_and_verify_token(&self, token: &str) -> anyhow::Result<TokenStatus> {
        let token = token.trim();
        if token.is_empty() {
            return Ok(TokenStatus {
                is_configured: false,
                is_valid: false,
                error_message: Some("API token cannot be empty".to_string()),
            });
        }

        let status = self.verify_token(token).await;
        if !status.is_valid {
            return Ok(status);
        }

        let mut config = self.config.write().await;
        config.tmdb.api_token = token.to_string();
        config.save()?;

        Ok(status)
    }

    /// Connectivity probe against the TMDB site, optionally through an
    /// explicit proxy. Returns success, a message and the latency.
    pub async fn test_proxy(&self, proxy_url: Option<&str>) -> (bool, String, Option<u128>) {
        let (_, configured_proxy, timeout, _) = self.connection_settings().await;
        let proxy = proxy_url
            .map(std::string::ToString::to_string)
            .or(configured_proxy);

        let client = match Self::build_http_client(proxy.as_deref(), timeout) {
            Ok(client) => client,
            Err(e) => return (false, e.to_string(), None),
        };

        let start = std::time::Instant::now();
        let result = client
            .get(SITE_URL)
            .header("User-Agent", "Mozilla/5.0")
            .send()
            .await;
        let latency = start.elapsed().as_millis();

        match result {
            Ok(response) if response.status().is_success() => {
                (true, "Connection OK".to_string(), Some(latency))
            }
            Ok(response) => (
                false,
                format!("HTTP error: {}", response.status()),
                Some(latency),
            ),
            Err(e) if e.is_timeout() => (false, "Connection timed out".to_string(), None),
            Err(e) => (false, format!("Connection error: {e}"), None),
        }
    }
}

// ========== Raw API payloads ==========

fn parse_date(value: Option<String>) -> Option<NaiveDate> {
    value
        .filter(|s| !s.is_empty())
        .and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok())
}

#[derive(Deserialize)]
struct RawSearchResponse {
    #[serde(default)]
    total_results: i64,
    #[serde(default)]
    results: Vec<RawSearchResult>,
}

#[derive(Deserialize)]
struct RawSearchResult {
    id: i64,
    #[serde(default)]
    name: String,
    original_name: Option<String>,
    first_air_date: Option<String>,
    poster_path: Option<String>,
    overview: Option<String>,
    vote_average: Option<f64>,
    #[serde(default)]
    adult: bool,
}

impl RawSearchResult {
    fn into_model(self) -> SearchResult {
        SearchResult {
            id: self.id,
            name: self.name,
            original_name: self.original_name,
            first_air_date: parse_date(self.first_air_date),
            poster_path: self.poster_path,
            overview: self.overview,
            vote_average: self.vote_average,
            adult: self.adult,
            number_of_seasons: None,
            number_of_episodes: None,
        }
    }
}

#[derive(Deserialize)]
struct RawGenre {
    name: String,
}

#[derive(Deserialize)]
struct RawSeasonStub {
    #[serde(default)]
    season_number: i32,
    #[serde(default)]
    name: String,
    overview: Option<String>,
    air_date: Option<String>,
    poster_path: Option<String>,
    episode_count: Option<i32>,
}

impl RawSeasonStub {
    fn into_model(self) -> Season {
        Season {
            season_number: self.season_number,
            name: self.name,
            overview: self.overview,
            air_date: parse_date(self.air_date),
            poster_path: self.poster_path,
            episode_count: self.episode_count,
            episodes: None,
        }
    }
}

#[derive(Deserialize)]
struct RawSeries {
    id: i64,
    #[serde(default)]
    name: String,
    original_name: Option<String>,
    overview: Option<String>,
    first_air_date: Option<String>,
    vote_average: Option<f64>,
    poster_path: Option<String>,
    backdrop_path: Option<String>,
    #[serde(default)]
    genres: Vec<RawGenre>,
    status: Option<String>,
    number_of_seasons: Option<i32>,
    number_of_episodes: Option<i32>,
    #[serde(default)]
    seasons: Vec<RawSeasonStub>,
}

impl RawSeries {
    fn into_model(self) -> Series {
        Series {
            id: self.id,
            name: self.name,
            original_name: self.original_name,
            overview: self.overview,
            first_air_date: parse_date(self.first_air_date),
            vote_average: self.vote_average,
            poster_path: self.poster_path,
            backdrop_path: self.backdrop_path,
            genres: self.genres.into_iter().map(|g| g.name).collect(),
            status: self.status,
            number_of_seasons: self.number_of_seasons,
            number_of_episodes: self.number_of_episodes,
            seasons: self
                .seasons
                .into_iter()
                .map(RawSeasonStub::into_model)
                .collect(),
        }
    }
}

#[derive(Deserialize)]
struct RawEpisode {
    #[serde(default)]
    episode_number: i32,
    #[serde(default)]
    name: String,
    overview: Option<String>,
    air_date: Option<String>,
    vote_average: Option<f64>,
    still_path: Option<String>,
}

#[derive(Deserialize)]
struct RawSeason {
    #[serde(default)]
    season_number: i32,
    #[serde(default)]
    name: String,
    overview: Option<String>,
    air_date: Option<String>,
    poster_path: Option<String>,
    #[serde(default)]
    episodes: Vec<RawEpisode>,
}

impl RawSeason {
    fn into_model(self) -> Season {
        let episodes: Vec<Episode> = self
            .episodes
            .into_iter()
            .map(|e| Episode {
                episode_number: e.episode_number,
                name: e.name,
                overview: e.overview,
                air_date: parse_date(e.air_date),
                vote_average: e.vote_average,
                still_path: e.still_path,
            })
            .collect();

        Season {
            season_number: self.season_number,
            name: self.name,
            overview: self.overview,
            air_date: parse_date(self.air_date),
            poster_path: self.poster_path,
            episode_count: Some(i32::try_from(episodes.len()).unwrap_or(i32::MAX)),
            episodes: Some(episodes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_with(server: &MockServer, token: &str) -> TmdbClient {
        let mut config = Config::default();
        config.tmdb.api_token = token.to_string();
        config.tmdb.task_timeout = 5;
        TmdbClient::with_base_url(Arc::new(RwLock::new(config)), server.uri())
    }

    fn search_body(results: serde_json::Value) -> serde_json::Value {
        json!({
            "page": 1,
            "total_results": results.as_array().map_or(0, Vec::len),
            "results": results
        })
    }

    #[test]
    fn test_bearer_detection() {
        assert!(TmdbClient::is_bearer_token("eyJhbGciOi"));
        assert!(!TmdbClient::is_bearer_token("plain-v3-key"));
    }

    #[test]
    fn test_fallback_queries_censored_title() {
        let candidates = TmdbClient::fallback_queries("〇〇〇する七人の孕女");
        assert!(
            candidates.contains(&"七人の孕女".to_string()),
            "candidates were: {candidates:?}"
        );
    }

    #[test]
    fn test_fallback_queries_ova_and_trailing_number() {
        let candidates = TmdbClient::fallback_queries("OVA ピスはめ！ 1");
        assert!(candidates.contains(&"ピスはめ！ 1".to_string()));
        assert!(candidates.contains(&"OVA ピスはめ！".to_string()));
        assert!(candidates.contains(&"ピスはめ！".to_string()));
    }

    #[test]
    fn test_fallback_queries_dedup_and_min_length() {
        let candidates = TmdbClient::fallback_queries("ab");
        // No transform applies, so no candidate equals the original.
        assert!(candidates.is_empty());

        let candidates = TmdbClient::fallback_queries("〇x");
        // Stripping the censor glyph leaves a single char, which is dropped.
        assert!(!candidates.contains(&"x".to_string()));
    }

    #[tokio::test]
    async fn test_search_uses_bearer_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search/tv"))
            .and(header("Authorization", "Bearer eyJtest"))
            .and(query_param("query", "Catgirls"))
            .and(query_param("include_adult", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(search_body(json!([
                {"id": 7, "name": "Catgirls", "adult": true, "first_air_date": "2020-01-05"}
            ]))))
            .mount(&server)
            .await;

        let response = client_with(&server, "eyJtest")
            .search("Catgirls", None)
            .await
            .unwrap();

        assert_eq!(response.results.len(), 1);
        assert_eq!(response.results[0].id, 7);
        assert!(response.results[0].adult);
        assert_eq!(
            response.results[0].first_air_date,
            NaiveDate::from_ymd_opt(2020, 1, 5)
        );
    }

    #[tokio::test]
    async fn test_search_uses_api_key_param() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search/tv"))
            .and(query_param("api_key", "v3key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(search_body(json!([]))))
            .mount(&server)
            .await;

        let response = client_with(&server, "v3key").search("x y", None).await.unwrap();
        assert!(response.results.is_empty());
    }

    #[tokio::test]
    async fn test_search_without_token() {
        let server = MockServer::start().await;
        let err = client_with(&server, "").search("q", None).await.unwrap_err();
        assert!(matches!(err, TmdbError::NotConfigured));
    }

    #[tokio::test]
    async fn test_fallback_equivalent_when_primary_matches() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search/tv"))
            .and(query_param("query", "Known Show"))
            .respond_with(ResponseTemplate::new(200).set_body_json(search_body(json!([
                {"id": 1, "name": "Known Show", "adult": true}
            ]))))
            .mount(&server)
            .await;

        let client = client_with(&server, "v3key");
        let direct = client.search("Known Show", None).await.unwrap();
        let fallback = client.search_with_fallback("Known Show", None).await.unwrap();

        assert_eq!(fallback.effective_query, None);
        assert_eq!(
            direct.results.iter().map(|r| r.id).collect::<Vec<_>>(),
            fallback.results.iter().map(|r| r.id).collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn test_fallback_reports_effective_query() {
        let server = MockServer::start().await;
        // Everything comes back empty except the de-censored candidate.
        Mock::given(method("GET"))
            .and(path("/search/tv"))
            .and(query_param("query", "七人の孕女"))
            .respond_with(ResponseTemplate::new(200).set_body_json(search_body(json!([
                {"id": 77, "name": "七人の孕女", "adult": true}
            ]))))
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/search/tv"))
            .respond_with(ResponseTemplate::new(200).set_body_json(search_body(json!([]))))
            .with_priority(10)
            .mount(&server)
            .await;

        let response = client_with(&server, "v3key")
            .search_with_fallback("〇〇〇する七人の孕女", None)
            .await
            .unwrap();

        assert_eq!(response.results.len(), 1);
        assert_eq!(response.results[0].id, 77);
        assert_eq!(response.effective_query.as_deref(), Some("七人の孕女"));
        assert_eq!(response.query, "〇〇〇する七人の孕女");
    }

    #[tokio::test]
    async fn test_get_series_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tv/404404"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "status_message": "The resource you requested could not be found."
            })))
            .mount(&server)
            .await;

        let series = client_with(&server, "v3key")
            .get_series(404_404, None)
            .await
            .unwrap();
        assert!(series.is_none());
    }

    #[tokio::test]
    async fn test_get_series_with_episodes_expands_seasons() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tv/5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 5,
                "name": "Show",
                "number_of_seasons": 1,
                "number_of_episodes": 2,
                "genres": [{"id": 1, "name": "Animation"}],
                "seasons": [
                    {"season_number": 0, "name": "Specials", "episode_count": 1},
                    {"season_number": 1, "name": "Season 1", "episode_count": 2}
                ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/tv/5/season/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "season_number": 1,
                "name": "Season 1",
                "episodes": [
                    {"episode_number": 1, "name": "One"},
                    {"episode_number": 2, "name": "Two", "still_path": "/s2.jpg"}
                ]
            })))
            .mount(&server)
            .await;

        let series = client_with(&server, "v3key")
            .get_series_with_episodes(5, None, true)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(series.genres, vec!["Animation".to_string()]);
        // Season 0 keeps its stub, season 1 carries full episodes.
        assert!(series.season(0).unwrap().episodes.is_none());
        let season_one = series.season(1).unwrap();
        let episodes = season_one.episodes.as_ref().unwrap();
        assert_eq!(episodes.len(), 2);
        assert_eq!(episodes[1].still_path.as_deref(), Some("/s2.jpg"));
    }

    #[tokio::test]
    async fn test_verify_token_valid_and_invalid() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/configuration"))
            .and(query_param("api_key", "good"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"images": {}})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/configuration"))
            .and(query_param("api_key", "bad"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "status_message": "Invalid API key"
            })))
            .mount(&server)
            .await;

        let client = client_with(&server, "whatever");

        let status = client.verify_token("good").await;
        assert!(status.is_valid);

        let status = client.verify_token("bad").await;
        assert!(!status.is_valid);
        assert_eq!(status.error_message.as_deref(), Some("Invalid API key"));
    }
}
