use serde::{Deserialize, Serialize};

/// Which sampling strategy first discovered a movie.
///
/// Variants are declared in collection priority order; a movie found by several
/// strategies keeps the tag of the earliest one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CollectionType {
    #[serde(rename = "Top_Revenue")]
    TopRevenue,
    #[serde(rename = "Top_Rated")]
    TopRated,
    #[serde(rename = "Low_Rated")]
    LowRated,
    #[serde(rename = "Random_Pick")]
    RandomPick,
}

impl CollectionType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TopRevenue => "Top_Revenue",
            Self::TopRated => "Top_Rated",
            Self::LowRated => "Low_Rated",
            Self::RandomPick => "Random_Pick",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub id: i64,
    pub title: String,
    pub release_date: String,
    pub vote_average: f64,
    pub vote_count: i64,
    pub popularity: f64,
    pub collection_type: CollectionType,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MovieDetail {
    pub budget: i64,
    pub revenue: i64,
    pub runtime: Option<i64>,
    pub genres: Vec<String>,
    pub countries: Vec<String>,
    pub status: String,
}

/// One row of the raw dataset: a candidate merged with its detail fetch.
///
/// Field order is the raw CSV column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRecord {
    pub id: i64,
    pub title: String,
    pub release_date: String,
    pub vote_average: f64,
    pub vote_count: i64,
    pub popularity: f64,
    pub collection_type: CollectionType,
    pub budget: i64,
    pub revenue: i64,
    pub runtime: Option<i64>,
    #[serde(with = "crate::dataset::joined")]
    pub genres: Vec<String>,
    #[serde(rename = "country", with = "crate::dataset::joined")]
    pub countries: Vec<String>,
    pub status: String,
}

impl EnrichedRecord {
    pub fn merge(candidate: CandidateRecord, detail: MovieDetail) -> Self {
        Self {
            id: candidate.id,
            title: candidate.title,
            release_date: candidate.release_date,
            vote_average: candidate.vote_average,
            vote_count: candidate.vote_count,
            popularity: candidate.popularity,
            collection_type: candidate.collection_type,
            budget: detail.budget,
            revenue: detail.revenue,
            runtime: detail.runtime,
            genres: detail.genres,
            countries: detail.countries,
            status: detail.status,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SuccessStatus {
    #[serde(rename = "Flop")]
    Flop,
    #[serde(rename = "Mega-Hit")]
    MegaHit,
    #[serde(rename = "Hit")]
    Hit,
    #[serde(rename = "Break-even")]
    BreakEven,
}

impl SuccessStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Flop => "Flop",
            Self::MegaHit => "Mega-Hit",
            Self::Hit => "Hit",
            Self::BreakEven => "Break-even",
        }
    }
}

impl std::fmt::Display for SuccessStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the cleaned dataset. Field order is the cleaned CSV column order.
///
/// Only constructed by the preprocessor, which guarantees `budget > 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanedRecord {
    pub id: i64,
    pub title: String,
    pub release_date: String,
    #[serde(with = "crate::dataset::joined")]
    pub genres: Vec<String>,
    #[serde(rename = "country", with = "crate::dataset::joined")]
    pub countries: Vec<String>,
    pub budget: i64,
    pub revenue: i64,
    pub roi_ratio: f64,
    pub vote_average: f64,
    pub vote_count: i64,
    pub popularity: f64,
    pub success_status: SuccessStatus,
}
