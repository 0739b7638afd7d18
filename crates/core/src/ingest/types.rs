use crate::domain::movie::{CandidateRecord, CollectionType, MovieDetail};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct DiscoverResponse {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub results: Vec<DiscoverMovie>,
    #[serde(default)]
    pub total_pages: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscoverMovie {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default)]
    pub vote_count: i64,
    #[serde(default)]
    pub popularity: f64,
}

impl DiscoverMovie {
    pub fn into_candidate(self, collection_type: CollectionType) -> CandidateRecord {
        CandidateRecord {
            id: self.id,
            title: self.title,
            release_date: self.release_date.unwrap_or_default(),
            vote_average: self.vote_average,
            vote_count: self.vote_count,
            popularity: self.popularity,
            collection_type,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MovieDetailResponse {
    pub id: i64,
    #[serde(default)]
    pub budget: Option<i64>,
    #[serde(default)]
    pub revenue: Option<i64>,
    #[serde(default)]
    pub runtime: Option<i64>,
    #[serde(default)]
    pub genres: Vec<NamedGenre>,
    #[serde(default)]
    pub production_countries: Vec<ProductionCountry>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamedGenre {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductionCountry {
    #[serde(default)]
    pub iso_3166_1: String,
}

impl From<MovieDetailResponse> for MovieDetail {
    fn from(resp: MovieDetailResponse) -> Self {
        Self {
            budget: resp.budget.unwrap_or(0),
            revenue: resp.revenue.unwrap_or(0),
            runtime: resp.runtime,
            genres: resp
                .genres
                .into_iter()
                .map(|g| g.name)
                .filter(|s| !s.trim().is_empty())
                .collect(),
            countries: resp
                .production_countries
                .into_iter()
                .map(|c| c.iso_3166_1)
                .filter(|s| !s.trim().is_empty())
                .collect(),
            status: resp.status.unwrap_or_default(),
        }
    }
}
