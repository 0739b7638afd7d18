pub mod account;
pub mod client;
pub mod popularity;
pub mod summary;
pub mod sync;

use anyhow::Result;
use client::{AlbumObject, ArtistObject, Page, TrackObject, UserProfile};

/// Spotify Web API surface used by the top-tracks sync.
#[async_trait::async_trait]
pub trait MusicApi: Send + Sync {
    async fn me(&self) -> Result<UserProfile>;

    async fn top_tracks(&self, limit: u32, offset: u32, time_range: &str) -> Result<Page<TrackObject>>;

    /// Unknown ids are dropped from the result.
    async fn artists(&self, ids: &[String]) -> Result<Vec<ArtistObject>>;

    async fn albums(&self, ids: &[String]) -> Result<Vec<AlbumObject>>;
}
