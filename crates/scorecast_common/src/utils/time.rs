// SPDX-License-Identifier: AGPL-3.0-only
// Copyright Authors of scorecast

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Time elapsed from `start` until `now`. Saturates at zero when `start` lies in the future.
pub fn elapsed_since(start: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (now - start).to_std().unwrap_or(Duration::ZERO)
}

/// Wall-clock instant at which the contest time `offset` is reached.
pub fn instant_at(start: DateTime<Utc>, offset: Duration) -> DateTime<Utc> {
    match chrono::Duration::from_std(offset) {
        Ok(offset) => start + offset,
        // Out of range offsets are far beyond any contest length
        Err(_) => DateTime::<Utc>::MAX_UTC,
    }
}

pub fn floor_minutes(duration: Duration) -> Duration {
    Duration::from_secs(duration.as_secs() / 60 * 60)
}

pub fn ceil_minutes(duration: Duration) -> Duration {
    let floor = floor_minutes(duration);
    if floor == duration {
        floor
    } else {
        floor + Duration::from_secs(60)
    }
}
