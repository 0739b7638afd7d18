use crate::domain::track::{Artist, TopTrack};
use crate::env_or;
use crate::spotify::client::TrackObject;
use crate::spotify::MusicApi;
use anyhow::Result;
use std::collections::{HashMap, HashSet};

const MAX_LOGGED_FAILURES: usize = 10;

#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub page_size: u32,
    pub max_tracks: u32,
    pub time_range: String,
    pub artist_batch: usize,
    /// The albums endpoint accepts at most 20 ids.
    pub album_batch: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            page_size: 50,
            max_tracks: 500,
            time_range: "long_term".to_string(),
            artist_batch: 50,
            album_batch: 20,
        }
    }
}

impl SyncOptions {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            page_size: env_or("SPOTIFY_PAGE_SIZE", defaults.page_size).clamp(1, 50),
            max_tracks: env_or("SPOTIFY_MAX_TRACKS", defaults.max_tracks),
            time_range: env_or("SPOTIFY_TIME_RANGE", defaults.time_range),
            artist_batch: env_or("SPOTIFY_ARTIST_BATCH", defaults.artist_batch).clamp(1, 50),
            album_batch: env_or("SPOTIFY_ALBUM_BATCH", defaults.album_batch).clamp(1, 20),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TopTracksSync {
    pub fetched: usize,
    pub skipped: usize,
    pub failed_batches: usize,
    pub artists: Vec<Artist>,
    pub tracks: Vec<TopTrack>,
}

/// Pull the user's top tracks and attach artist and album detail.
///
/// Rankings follow the position in the fetched list, so tracks skipped for missing
/// detail leave gaps rather than shifting later ranks.
pub async fn sync_top_tracks(api: &dyn MusicApi, opts: &SyncOptions) -> Result<TopTracksSync> {
    let fetched = fetch_top_tracks(api, opts).await?;

    let mut artist_ids = Vec::new();
    let mut album_ids = Vec::new();
    let mut seen = HashSet::new();
    for track in &fetched {
        if let Some(id) = main_artist_id(track) {
            if seen.insert(("artist", id)) {
                artist_ids.push(id.to_string());
            }
        }
        if let Some(id) = track.album.as_ref().and_then(|a| a.id.as_deref()) {
            if seen.insert(("album", id)) {
                album_ids.push(id.to_string());
            }
        }
    }

    let mut failed_batches = 0usize;

    let mut artists = HashMap::new();
    for chunk in artist_ids.chunks(opts.artist_batch.max(1)) {
        match api.artists(chunk).await {
            Ok(found) => artists.extend(found.into_iter().map(|a| (a.id.clone(), a))),
            Err(err) => {
                failed_batches += 1;
                if failed_batches <= MAX_LOGGED_FAILURES {
                    tracing::warn!(ids = chunk.len(), error = %err, "artist batch failed; skipping");
                }
            }
        }
    }

    let mut release_dates: HashMap<String, String> = HashMap::new();
    for chunk in album_ids.chunks(opts.album_batch.max(1)) {
        match api.albums(chunk).await {
            Ok(found) => release_dates.extend(
                found
                    .into_iter()
                    .filter_map(|a| a.release_date.map(|d| (a.id, d))),
            ),
            Err(err) => {
                failed_batches += 1;
                if failed_batches <= MAX_LOGGED_FAILURES {
                    tracing::warn!(ids = chunk.len(), error = %err, "album batch failed; skipping");
                }
            }
        }
    }

    let mut out = TopTracksSync {
        fetched: fetched.len(),
        failed_batches,
        artists: artist_ids
            .iter()
            .filter_map(|id| artists.get(id))
            .map(|a| Artist {
                spotify_id: a.id.clone(),
                name: a.name.clone(),
                popularity: a.popularity,
                followers_total: a.followers.as_ref().and_then(|f| f.total),
                genres: a.genres.clone(),
            })
            .collect(),
        ..TopTracksSync::default()
    };

    for (idx, track) in fetched.iter().enumerate() {
        let (Some(track_id), Some(artist)) = (
            track.id.as_deref(),
            main_artist_id(track).and_then(|id| artists.get(id)),
        ) else {
            out.skipped += 1;
            continue;
        };

        let album = track.album.as_ref();
        let release_date = album
            .and_then(|a| a.id.as_ref())
            .and_then(|id| release_dates.get(id))
            .map(String::as_str)
            .or_else(|| album.and_then(|a| a.release_date.as_deref()));

        out.tracks.push(TopTrack {
            spotify_id: track_id.to_string(),
            name: track.name.clone(),
            popularity: track.popularity,
            duration_ms: track.duration_ms,
            release_year: release_date.and_then(parse_release_year),
            genre: artist.genres.first().cloned().unwrap_or_default(),
            artist_id: artist.id.clone(),
            ranking: idx as i32 + 1,
        });
    }

    tracing::info!(
        fetched = out.fetched,
        stored = out.tracks.len(),
        skipped = out.skipped,
        artists = out.artists.len(),
        failed_batches = out.failed_batches,
        "top tracks sync finished"
    );
    Ok(out)
}

async fn fetch_top_tracks(api: &dyn MusicApi, opts: &SyncOptions) -> Result<Vec<TrackObject>> {
    let page_size = opts.page_size.max(1);
    let mut tracks = Vec::new();
    let mut offset = 0u32;

    while offset < opts.max_tracks {
        let limit = page_size.min(opts.max_tracks - offset);
        let page = match api.top_tracks(limit, offset, &opts.time_range).await {
            Ok(page) => page,
            // Nothing fetched yet usually means the token or scope is wrong; surface it.
            Err(err) if tracks.is_empty() => return Err(err.context("top tracks fetch failed")),
            Err(err) => {
                tracing::warn!(offset, error = %err, "top tracks page failed; keeping what was fetched");
                break;
            }
        };

        if page.items.is_empty() {
            break;
        }
        tracks.extend(page.items);
        offset += limit;

        if page.total.is_some_and(|total| offset >= total) {
            break;
        }
    }

    tracing::info!(count = tracks.len(), time_range = %opts.time_range, "fetched top tracks");
    Ok(tracks)
}

fn main_artist_id(track: &TrackObject) -> Option<&str> {
    track.artists.first().and_then(|a| a.id.as_deref())
}

/// Year prefix of a Spotify release date (`YYYY`, `YYYY-MM` or `YYYY-MM-DD`).
pub fn parse_release_year(release_date: &str) -> Option<i32> {
    let year = release_date.split('-').next()?.trim().parse::<i32>().ok()?;
    (year > 0).then_some(year)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spotify::client::{AlbumObject, AlbumRef, ArtistObject, ArtistRef, Page, UserProfile};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeSpotify {
        tracks: Vec<TrackObject>,
        artists: Vec<ArtistObject>,
        albums: Vec<AlbumObject>,
        fail_artist_batch_containing: Option<String>,
        artist_calls: AtomicUsize,
        album_calls: AtomicUsize,
    }

    impl FakeSpotify {
        fn new(tracks: Vec<TrackObject>, artists: Vec<ArtistObject>, albums: Vec<AlbumObject>) -> Self {
            Self {
                tracks,
                artists,
                albums,
                fail_artist_batch_containing: None,
                artist_calls: AtomicUsize::new(0),
                album_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait::async_trait]
    impl MusicApi for FakeSpotify {
        async fn me(&self) -> Result<UserProfile> {
            Ok(UserProfile {
                id: "user".to_string(),
                display_name: None,
            })
        }

        async fn top_tracks(&self, limit: u32, offset: u32, _time_range: &str) -> Result<Page<TrackObject>> {
            let items = self
                .tracks
                .iter()
                .skip(offset as usize)
                .take(limit as usize)
                .cloned()
                .collect();
            Ok(Page {
                items,
                total: Some(self.tracks.len() as u32),
                next: None,
            })
        }

        async fn artists(&self, ids: &[String]) -> Result<Vec<ArtistObject>> {
            self.artist_calls.fetch_add(1, Ordering::SeqCst);
            assert!(ids.len() <= 50);
            if let Some(bad) = &self.fail_artist_batch_containing {
                if ids.contains(bad) {
                    anyhow::bail!("HTTP 502");
                }
            }
            Ok(self
                .artists
                .iter()
                .filter(|a| ids.contains(&a.id))
                .cloned()
                .collect())
        }

        async fn albums(&self, ids: &[String]) -> Result<Vec<AlbumObject>> {
            self.album_calls.fetch_add(1, Ordering::SeqCst);
            assert!(ids.len() <= 20);
            Ok(self
                .albums
                .iter()
                .filter(|a| ids.contains(&a.id))
                .cloned()
                .collect())
        }
    }

    fn track(id: &str, artist: Option<&str>, album: &str) -> TrackObject {
        TrackObject {
            id: Some(id.to_string()),
            name: format!("Song {id}"),
            popularity: Some(50),
            duration_ms: Some(180_000),
            artists: artist
                .map(|a| ArtistRef {
                    id: Some(a.to_string()),
                    name: a.to_uppercase(),
                })
                .into_iter()
                .collect(),
            album: Some(AlbumRef {
                id: Some(album.to_string()),
                release_date: None,
            }),
        }
    }

    fn artist(id: &str, genres: &[&str]) -> ArtistObject {
        ArtistObject {
            id: id.to_string(),
            name: id.to_uppercase(),
            popularity: Some(60),
            followers: None,
            genres: genres.iter().map(|g| g.to_string()).collect(),
        }
    }

    fn album(id: &str, release_date: &str) -> AlbumObject {
        AlbumObject {
            id: id.to_string(),
            release_date: Some(release_date.to_string()),
        }
    }

    #[tokio::test]
    async fn builds_ranked_tracks_with_artist_genre_and_year() {
        let api = FakeSpotify::new(
            vec![
                track("t1", Some("a1"), "al1"),
                track("t2", None, "al2"),
                track("t3", Some("a2"), "al2"),
                track("t4", Some("ghost"), "al1"),
            ],
            vec![artist("a1", &["k-pop", "dance"]), artist("a2", &[])],
            vec![album("al1", "2019-05-03"), album("al2", "0000")],
        );

        let out = sync_top_tracks(&api, &SyncOptions::default()).await.unwrap();

        assert_eq!(out.fetched, 4);
        assert_eq!(out.skipped, 2);
        assert_eq!(out.artists.len(), 2);
        let ranks: Vec<(&str, i32)> = out
            .tracks
            .iter()
            .map(|t| (t.spotify_id.as_str(), t.ranking))
            .collect();
        assert_eq!(ranks, vec![("t1", 1), ("t3", 3)]);
        assert_eq!(out.tracks[0].genre, "k-pop");
        assert_eq!(out.tracks[0].release_year, Some(2019));
        assert_eq!(out.tracks[1].genre, "");
        assert_eq!(out.tracks[1].release_year, None);
    }

    #[tokio::test]
    async fn pages_and_batches_respect_limits() {
        let tracks: Vec<TrackObject> = (0..120)
            .map(|i| track(&format!("t{i}"), Some(&format!("a{i}")), &format!("al{i}")))
            .collect();
        let artists = (0..120).map(|i| artist(&format!("a{i}"), &["indie"])).collect();
        let albums = (0..120).map(|i| album(&format!("al{i}"), "2001")).collect();
        let api = FakeSpotify::new(tracks, artists, albums);

        let opts = SyncOptions {
            max_tracks: 100,
            ..SyncOptions::default()
        };
        let out = sync_top_tracks(&api, &opts).await.unwrap();

        assert_eq!(out.fetched, 100);
        assert_eq!(out.tracks.len(), 100);
        assert_eq!(out.tracks[99].ranking, 100);
        assert_eq!(api.artist_calls.load(Ordering::SeqCst), 2);
        assert_eq!(api.album_calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn failed_artist_batch_does_not_abort() {
        let tracks: Vec<TrackObject> = (0..60)
            .map(|i| track(&format!("t{i}"), Some(&format!("a{i}")), "al"))
            .collect();
        let artists = (0..60).map(|i| artist(&format!("a{i}"), &["rock"])).collect();
        let mut api = FakeSpotify::new(tracks, artists, vec![album("al", "1999-01-01")]);
        api.fail_artist_batch_containing = Some("a0".to_string());

        let out = sync_top_tracks(&api, &SyncOptions::default()).await.unwrap();

        assert_eq!(out.failed_batches, 1);
        assert_eq!(out.skipped, 50);
        assert_eq!(out.tracks.len(), 10);
        assert_eq!(out.tracks[0].ranking, 51);
        assert_eq!(out.tracks[0].release_year, Some(1999));
    }

    #[test]
    fn release_year_parsing() {
        assert_eq!(parse_release_year("2019-05-03"), Some(2019));
        assert_eq!(parse_release_year("1987"), Some(1987));
        assert_eq!(parse_release_year("0000"), None);
        assert_eq!(parse_release_year(""), None);
        assert_eq!(parse_release_year("unknown"), None);
    }
}
