use chrono::{Local, NaiveTime};

use crate::error::PlaygroundError;

/// Daily windows (hour, minute) during which the story replica is being
/// refreshed. Bounds are inclusive.
const REPLICATION_WINDOWS: [((u32, u32), (u32, u32)); 4] = [
    ((0, 0), (0, 30)),
    ((6, 0), (6, 30)),
    ((12, 0), (12, 30)),
    ((18, 0), (18, 30)),
];

fn at(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}

pub fn is_replicating(now: NaiveTime) -> bool {
    REPLICATION_WINDOWS
        .iter()
        .any(|&((sh, sm), (eh, em))| at(sh, sm) <= now && now <= at(eh, em))
}

/// Refuse replica reads while a replication window is open (local time).
pub fn ensure_not_replicating() -> Result<(), PlaygroundError> {
    ensure_not_replicating_at(Local::now().time())
}

pub fn ensure_not_replicating_at(now: NaiveTime) -> Result<(), PlaygroundError> {
    if is_replicating(now) {
        Err(PlaygroundError::Replicating)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hms(h: u32, m: u32, s: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, s).unwrap()
    }

    #[test]
    fn test_window_bounds_are_inclusive() {
        assert!(is_replicating(hms(0, 0, 0)));
        assert!(is_replicating(hms(6, 30, 0)));
        assert!(is_replicating(hms(12, 15, 42)));
        assert!(!is_replicating(hms(18, 30, 1)));
        assert!(!is_replicating(hms(5, 59, 59)));
        assert!(!is_replicating(hms(23, 0, 0)));
    }

    #[test]
    fn test_guard_error() {
        assert!(matches!(
            ensure_not_replicating_at(hms(18, 10, 0)),
            Err(PlaygroundError::Replicating)
        ));
        assert!(ensure_not_replicating_at(hms(9, 0, 0)).is_ok());
    }
}
