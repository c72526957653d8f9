//! Derived engagement scores.

/// Likes per follower, rounded to four decimals; `0` without followers.
pub fn like_follow_ratio(likes: u64, follower_count: u64) -> f64 {
    if follower_count == 0 {
        return 0.0;
    }
    let ratio = likes as f64 / follower_count as f64;
    (ratio * 10_000.0).round() / 10_000.0
}

/// Composite 0–100 note score.
///
/// Three capped components are summed:
/// - volume: `(likes + 2·comments + 3·shares) / 100`, at most 40
/// - rate: `1000 · (likes + comments + shares) / followers`, at most 30
/// - discussion: `100 · comments / likes`, at most 30
pub fn note_score(likes: u64, comments: u64, shares: u64, follower_count: u64) -> u32 {
    let (likes, comments, shares) = (likes as f64, comments as f64, shares as f64);

    let volume = ((likes + 2.0 * comments + 3.0 * shares) / 100.0).min(40.0);

    let rate = if follower_count > 0 {
        (1000.0 * (likes + comments + shares) / follower_count as f64).min(30.0)
    } else {
        0.0
    };

    let discussion = if likes > 0.0 {
        (100.0 * comments / likes).min(30.0)
    } else {
        0.0
    };

    (volume + rate + discussion).clamp(0.0, 100.0).round() as u32
}
