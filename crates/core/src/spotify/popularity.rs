use crate::domain::track::PopularityBucket;

const BUCKET_WIDTH: i32 = 10;
const BUCKET_COUNT: i32 = 10;

/// Count popularity scores into the ten inclusive buckets `1-10` .. `91-100`.
/// Scores outside `1..=100` fall in no bucket.
pub fn popularity_distribution(popularities: &[i32]) -> Vec<PopularityBucket> {
    let mut counts = [0usize; BUCKET_COUNT as usize];
    for &p in popularities {
        if (1..=BUCKET_WIDTH * BUCKET_COUNT).contains(&p) {
            counts[((p - 1) / BUCKET_WIDTH) as usize] += 1;
        }
    }

    counts
        .iter()
        .enumerate()
        .map(|(i, &count)| {
            let low = i as i32 * BUCKET_WIDTH + 1;
            PopularityBucket {
                bucket: format!("{}-{}", low, low + BUCKET_WIDTH - 1),
                count,
            }
        })
        .collect()
}
