use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artist {
    pub spotify_id: String,
    pub name: String,
    pub popularity: Option<i32>,
    pub followers_total: Option<i64>,
    pub genres: Vec<String>,
}

/// One entry of a user's top-tracks list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopTrack {
    pub spotify_id: String,
    pub name: String,
    pub popularity: Option<i32>,
    pub duration_ms: Option<i64>,
    pub release_year: Option<i32>,
    /// First genre of the main artist, empty when the artist has none.
    pub genre: String,
    pub artist_id: String,
    /// 1-based position in the full top-tracks list.
    pub ranking: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopularityBucket {
    pub bucket: String,
    pub count: usize,
}

/// Stored top track joined with its artist's name, as listed back to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedTrack {
    pub ranking: i32,
    pub name: String,
    pub genre: String,
    pub popularity: Option<i32>,
    pub release_year: Option<i32>,
    pub artist_name: String,
}
