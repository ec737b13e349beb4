use std::{
    collections::{HashMap, HashSet},
    time::{Duration, Instant},
};

use chrono::{DateTime, Local};
use tracing::info;

use crate::{codes::Notifier, decoder::DecodeResult, vision::geometry::Polygon};

pub const TRACK_TIMEOUT: Duration = Duration::from_millis(500);
pub const MILESTONE: usize = 10;

/// First sighting of a payload in the current session.
#[derive(Clone, Debug, PartialEq)]
pub struct ScanRecord {
    pub ordinal: usize,
    pub text: String,
    pub seen_at: DateTime<Local>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TrackedCode {
    pub polygon: Polygon,
    pub last_seen: Instant,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScanSession {
    /// Set by the first new code after a reset.
    pub started_at: Option<Instant>,
    /// Time from the first to the milestone-th distinct code.
    pub milestone: Option<Duration>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Observation {
    pub is_new: bool,
    pub text: String,
}

pub struct Registry {
    seen: HashSet<String>,
    records: Vec<ScanRecord>,
    tracked: HashMap<String, TrackedCode>,
    session: ScanSession,
    track_timeout: Duration,
    milestone_at: usize,
    notifier: Box<dyn Notifier>,
}

impl Registry {
    pub fn new(notifier: Box<dyn Notifier>) -> Self {
        Self::with_limits(notifier, TRACK_TIMEOUT, MILESTONE)
    }

    pub fn with_limits(
        notifier: Box<dyn Notifier>,
        track_timeout: Duration,
        milestone_at: usize,
    ) -> Self {
        Self {
            seen: HashSet::new(),
            records: Vec::new(),
            tracked: HashMap::new(),
            session: ScanSession::default(),
            track_timeout,
            milestone_at,
            notifier,
        }
    }

    pub fn observe(&mut self, result: &DecodeResult, now: Instant) -> Observation {
        let text = result.text();
        let is_new = self.seen.insert(text.clone());

        if is_new {
            let record = ScanRecord {
                ordinal: self.records.len() + 1,
                text: text.clone(),
                seen_at: Local::now(),
            };
            info!("{}. {}", record.ordinal, record.text);
            self.notifier.alert(&record);
            self.records.push(record);

            let started_at = *self.session.started_at.get_or_insert(now);
            if self.seen.len() == self.milestone_at && self.session.milestone.is_none() {
                let elapsed = now.saturating_duration_since(started_at);
                info!(
                    "Reached {} codes in {:.2}s",
                    self.milestone_at,
                    elapsed.as_secs_f64()
                );
                self.session.milestone = Some(elapsed);
            }
        }

        self.tracked.insert(
            text.clone(),
            TrackedCode {
                polygon: result.absolute_polygon(),
                last_seen: now,
            },
        );

        Observation { is_new, text }
    }

    pub fn expire(&mut self, now: Instant) {
        let timeout = self.track_timeout;
        self.tracked
            .retain(|_, code| now.saturating_duration_since(code.last_seen) <= timeout);
    }

    pub fn reset(&mut self) {
        self.seen.clear();
        self.records.clear();
        self.tracked.clear();
        self.session = ScanSession::default();
    }

    pub fn unique_count(&self) -> usize {
        self.seen.len()
    }

    pub fn records(&self) -> &[ScanRecord] {
        &self.records
    }

    pub fn last_record(&self) -> Option<&ScanRecord> {
        self.records.last()
    }

    pub fn tracked(&self) -> &HashMap<String, TrackedCode> {
        &self.tracked
    }

    pub fn session(&self) -> &ScanSession {
        &self.session
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use imageproc::{point::Point, rect::Rect};

    use crate::decoder::{Geometry, Symbol};

    #[derive(Clone, Default)]
    struct Recorded(Arc<Mutex<Vec<String>>>);

    impl Notifier for Recorded {
        fn alert(&mut self, record: &ScanRecord) {
            self.0.lock().unwrap().push(record.text.clone());
        }
    }

    impl Recorded {
        fn alerts(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    fn result(text: &str, x: i32) -> DecodeResult {
        DecodeResult::new(
            Symbol {
                payload: text.as_bytes().to_vec(),
                geometry: Geometry::Rect(Rect::at(x, 0).of_size(10, 10)),
            },
            Point::new(0, 0),
        )
    }

    fn registry() -> (Registry, Recorded) {
        let alerts = Recorded::default();
        (Registry::new(Box::new(alerts.clone())), alerts)
    }

    #[test]
    fn repeat_sighting_updates_geometry_without_recounting() {
        let (mut registry, alerts) = registry();
        let t0 = Instant::now();

        let first = registry.observe(&result("ABC123", 0), t0);
        assert!(first.is_new);
        assert_eq!(first.text, "ABC123");
        assert_eq!(registry.unique_count(), 1);
        assert_eq!(registry.session().started_at, Some(t0));

        let t1 = t0 + Duration::from_millis(200);
        let second = registry.observe(&result("ABC123", 50), t1);
        assert!(!second.is_new);
        assert_eq!(registry.unique_count(), 1);
        assert_eq!(registry.records().len(), 1);
        assert_eq!(alerts.alerts(), vec!["ABC123".to_string()]);

        let tracked = &registry.tracked()["ABC123"];
        assert_eq!(tracked.last_seen, t1);
        assert_eq!(tracked.polygon[0], Point::new(50, 0));
        assert_eq!(registry.tracked().len(), 1);
    }

    #[test]
    fn ordinals_follow_first_sighting_order() {
        let (mut registry, _alerts) = registry();
        let t0 = Instant::now();
        for (i, text) in ["A", "B", "A", "C"].iter().enumerate() {
            registry.observe(&result(text, 0), t0 + Duration::from_millis(i as u64));
        }

        let ordinals: Vec<_> = registry
            .records()
            .iter()
            .map(|r| (r.ordinal, r.text.as_str()))
            .collect();
        assert_eq!(ordinals, vec![(1, "A"), (2, "B"), (3, "C")]);
        assert_eq!(registry.last_record().unwrap().text, "C");
    }

    #[test]
    fn milestone_recorded_once_on_tenth_code() {
        let (mut registry, _alerts) = registry();
        let t0 = Instant::now();

        for i in 0..9u64 {
            registry.observe(&result(&format!("code-{i}"), 0), t0 + Duration::from_secs(i));
            assert!(registry.session().milestone.is_none());
        }

        let t9 = t0 + Duration::from_secs(9);
        registry.observe(&result("code-9", 0), t9);
        assert_eq!(registry.session().milestone, Some(t9 - t0));

        registry.observe(&result("code-10", 0), t0 + Duration::from_secs(20));
        assert_eq!(registry.session().milestone, Some(t9 - t0));
    }

    #[test]
    fn reset_is_idempotent_and_forgets_everything() {
        let (mut registry, alerts) = registry();
        let t0 = Instant::now();
        registry.observe(&result("ABC123", 0), t0);

        registry.reset();
        registry.reset();
        assert_eq!(registry.unique_count(), 0);
        assert!(registry.records().is_empty());
        assert!(registry.tracked().is_empty());
        assert_eq!(registry.session(), &ScanSession::default());

        let again = registry.observe(&result("ABC123", 0), t0 + Duration::from_secs(1));
        assert!(again.is_new);
        assert_eq!(registry.last_record().unwrap().ordinal, 1);
        assert_eq!(alerts.alerts().len(), 2);
    }

    #[test]
    fn tracked_codes_expire_after_timeout() {
        let (mut registry, _alerts) = registry();
        let t0 = Instant::now();
        registry.observe(&result("stale", 0), t0);
        registry.observe(&result("fresh", 0), t0 + Duration::from_millis(400));

        registry.expire(t0 + Duration::from_millis(500));
        assert_eq!(registry.tracked().len(), 2);

        registry.expire(t0 + Duration::from_millis(501));
        assert!(!registry.tracked().contains_key("stale"));
        assert!(registry.tracked().contains_key("fresh"));

        registry.expire(t0 + Duration::from_millis(901));
        assert!(registry.tracked().is_empty());
        assert_eq!(registry.unique_count(), 2);
    }

    #[test]
    fn code_seen_again_after_expiry_is_not_recounted() {
        let (mut registry, alerts) = registry();
        let t0 = Instant::now();
        registry.observe(&result("A", 0), t0);
        registry.observe(&result("B", 0), t0 + Duration::from_millis(100));
        registry.observe(&result("A", 10), t0 + Duration::from_millis(200));

        registry.expire(t0 + Duration::from_millis(800));
        assert!(registry.tracked().is_empty());

        let t1 = t0 + Duration::from_millis(900);
        let again = registry.observe(&result("A", 70), t1);
        assert!(!again.is_new);

        assert_eq!(alerts.alerts(), vec!["A".to_string(), "B".to_string()]);
        assert_eq!(registry.records().len(), 2);
        assert_eq!(registry.unique_count(), 2);

        let tracked = &registry.tracked()["A"];
        assert_eq!(tracked.last_seen, t1);
        assert_eq!(tracked.polygon[0], Point::new(70, 0));
        assert!(!registry.tracked().contains_key("B"));
    }

    #[test]
    fn invalid_utf8_payloads_share_identity_after_lossy_decoding() {
        let (mut registry, alerts) = registry();
        let t0 = Instant::now();
        let bad = |byte: u8| DecodeResult {
            payload: vec![b'X', byte],
            origin: Point::new(0, 0),
            geometry: Geometry::Rect(Rect::at(0, 0).of_size(4, 4)),
        };

        assert!(registry.observe(&bad(0xFE), t0).is_new);
        assert!(!registry.observe(&bad(0xFF), t0).is_new);
        assert_eq!(alerts.alerts(), vec!["X\u{FFFD}".to_string()]);
    }
}
