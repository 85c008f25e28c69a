use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Single `/search/tv` result item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: i64,
    pub name: String,
    pub original_name: Option<String>,
    pub first_air_date: Option<NaiveDate>,
    pub poster_path: Option<String>,
    pub overview: Option<String>,
    pub vote_average: Option<f64>,
    pub adult: bool,
    /// Filled by an extra detail call when candidates are enriched.
    pub number_of_seasons: Option<i32>,
    pub number_of_episodes: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    pub total_results: i64,
    pub results: Vec<SearchResult>,
    /// Query that actually produced the results when a fallback candidate
    /// matched instead of the original one.
    pub effective_query: Option<String>,
}

impl SearchResponse {
    #[must_use]
    pub const fn empty(query: String) -> Self {
        Self {
            query,
            total_results: 0,
            results: Vec::new(),
            effective_query: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Episode {
    pub episode_number: i32,
    pub name: String,
    pub overview: Option<String>,
    pub air_date: Option<NaiveDate>,
    pub vote_average: Option<f64>,
    pub still_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Season {
    pub season_number: i32,
    pub name: String,
    pub overview: Option<String>,
    pub air_date: Option<NaiveDate>,
    pub poster_path: Option<String>,
    pub episode_count: Option<i32>,
    pub episodes: Option<Vec<Episode>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Series {
    pub id: i64,
    pub name: String,
    pub original_name: Option<String>,
    pub overview: Option<String>,
    pub first_air_date: Option<NaiveDate>,
    pub vote_average: Option<f64>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub genres: Vec<String>,
    pub status: Option<String>,
    pub number_of_seasons: Option<i32>,
    pub number_of_episodes: Option<i32>,
    pub seasons: Vec<Season>,
}

impl Series {
    #[must_use]
    pub fn year(&self) -> Option<i32> {
        use chrono::Datelike;
        self.first_air_date.map(|d| d.year())
    }

    #[must_use]
    pub fn season(&self, number: i32) -> Option<&Season> {
        self.seasons.iter().find(|s| s.season_number == number)
    }
}
