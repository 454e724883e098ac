//! Records persisted locally and mirrored remotely.
//!
//! Field names match the remote table columns, so the same struct serializes
//! to a JSON file, binds to an SQLite row and binds to a PostgreSQL row.

use chrono::{DateTime, Duration, SubsecRound, Utc};
use uuid::Uuid;

pub mod folder;
pub mod prompt;
pub mod revision;
pub mod tag;

pub use folder::Folder;
pub use prompt::{Prompt, PromptPatch};
pub use revision::Revision;
pub use tag::{PromptTag, Tag};

/// Generates an opaque record id: 128 random bits as 32 lowercase hex chars.
pub fn new_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Current time at microsecond precision, the finest PostgreSQL keeps.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// A timestamp strictly after `previous`, normally just [`now`].
///
/// Two mutations in the same microsecond (or a clock step backwards) still
/// get ordered `updated_at` values.
pub fn next_timestamp(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = now();
    if now > previous {
        now
    } else {
        previous + Duration::microseconds(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_32_hex_chars_and_distinct() {
        let a = new_id();
        let b = new_id();
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(a, b);
    }

    #[test]
    fn next_timestamp_is_strictly_later() {
        let future = now() + Duration::seconds(60);
        let next = next_timestamp(future);
        assert_eq!(next, future + Duration::microseconds(1));

        let past = now() - Duration::seconds(60);
        assert!(next_timestamp(past) > past);
    }
}
