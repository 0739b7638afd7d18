use crate::domain::track::{Artist, RankedTrack, TopTrack};
use anyhow::Context;

/// Replace an account's top tracks with a fresh sync, upserting the artists they point at.
pub async fn replace_top_tracks(
    pool: &sqlx::PgPool,
    account_id: &str,
    artists: &[Artist],
    tracks: &[TopTrack],
) -> anyhow::Result<u64> {
    let mut tx = pool.begin().await.context("begin transaction failed")?;

    if !artists.is_empty() {
        let mut qb = sqlx::QueryBuilder::new(
            "INSERT INTO spotify_artists (spotify_id, name, popularity, followers_total, genres) ",
        );
        qb.push_values(artists, |mut b, a| {
            b.push_bind(&a.spotify_id)
                .push_bind(&a.name)
                .push_bind(a.popularity)
                .push_bind(a.followers_total)
                .push_bind(&a.genres);
        });
        qb.push(
            " ON CONFLICT (spotify_id) DO UPDATE \
               SET name = EXCLUDED.name, popularity = EXCLUDED.popularity, \
                   followers_total = EXCLUDED.followers_total, genres = EXCLUDED.genres",
        );
        qb.build()
            .persistent(false)
            .execute(&mut *tx)
            .await
            .context("upsert spotify_artists failed")?;
    }

    sqlx::query("DELETE FROM spotify_top_tracks WHERE account_id = $1")
        .persistent(false)
        .bind(account_id)
        .execute(&mut *tx)
        .await
        .context("delete spotify_top_tracks failed")?;

    let mut inserted = 0u64;
    if !tracks.is_empty() {
        let mut qb = sqlx::QueryBuilder::new(
            "INSERT INTO spotify_top_tracks \
             (account_id, ranking, spotify_id, name, popularity, duration_ms, release_year, genre, artist_id) ",
        );
        qb.push_values(tracks, |mut b, t| {
            b.push_bind(account_id)
                .push_bind(t.ranking)
                .push_bind(&t.spotify_id)
                .push_bind(&t.name)
                .push_bind(t.popularity)
                .push_bind(t.duration_ms)
                .push_bind(t.release_year)
                .push_bind(&t.genre)
                .push_bind(&t.artist_id);
        });
        inserted = qb
            .build()
            .persistent(false)
            .execute(&mut *tx)
            .await
            .context("insert spotify_top_tracks failed")?
            .rows_affected();
    }

    tx.commit().await.context("commit transaction failed")?;
    Ok(inserted)
}

pub async fn load_ranked_tracks(
    pool: &sqlx::PgPool,
    account_id: &str,
    ranking_limit: Option<i32>,
) -> anyhow::Result<Vec<RankedTrack>> {
    let rows = sqlx::query_as::<_, (i32, String, String, Option<i32>, Option<i32>, String)>(
        "SELECT t.ranking, t.name, t.genre, t.popularity, t.release_year, a.name \
         FROM spotify_top_tracks t \
         JOIN spotify_artists a ON a.spotify_id = t.artist_id \
         WHERE t.account_id = $1 AND ($2::int IS NULL OR t.ranking <= $2) \
         ORDER BY t.ranking",
    )
    .persistent(false)
    .bind(account_id)
    .bind(ranking_limit)
    .fetch_all(pool)
    .await
    .context("select spotify_top_tracks failed")?;

    Ok(rows
        .into_iter()
        .map(
            |(ranking, name, genre, popularity, release_year, artist_name)| RankedTrack {
                ranking,
                name,
                genre,
                popularity,
                release_year,
                artist_name,
            },
        )
        .collect())
}
