use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::challenge::{Challenge, ChallengeId, ProgressRecord};
use crate::store::{Observers, SubscriptionId};

/// Source of truth for challenge metadata and per-challenge progress.
///
/// Challenges live in catalog order in `challenges`; `index` maps ids to
/// slots so lookups never scan.
#[derive(Debug, Default)]
pub struct ChallengeStore {
    challenges: Vec<Challenge>,
    index: HashMap<ChallengeId, usize>,
    observers: Observers<[Challenge]>,
}

impl ChallengeStore {
    pub fn new(catalog: Vec<Challenge>) -> Self {
        let mut store = Self::default();
        store.replace(catalog);
        store
    }

    fn replace(&mut self, catalog: Vec<Challenge>) {
        self.challenges.clear();
        self.index.clear();
        for mut challenge in catalog {
            // First occurrence wins when a catalog repeats an id
            if self.index.contains_key(&challenge.id) {
                continue;
            }
            normalize(&mut challenge);
            self.index.insert(challenge.id.clone(), self.challenges.len());
            self.challenges.push(challenge);
        }
    }

    pub fn list(&self) -> &[Challenge] {
        &self.challenges
    }

    pub fn get(&self, id: &ChallengeId) -> Option<&Challenge> {
        self.index.get(id).map(|&i| &self.challenges[i])
    }

    pub fn contains(&self, id: &ChallengeId) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.challenges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.challenges.is_empty()
    }

    /// Store a progress percentage, clamped to [0, 100].
    ///
    /// Returns false (and changes nothing) for unknown ids, non-finite values
    /// and challenges that are already completed.
    pub fn set_progress(&mut self, id: &ChallengeId, value: f64) -> bool {
        if !value.is_finite() {
            return false;
        }
        let Some(&i) = self.index.get(id) else {
            return false;
        };
        let challenge = &mut self.challenges[i];
        if challenge.completed {
            return false;
        }
        let clamped = value.clamp(0.0, 100.0);
        if challenge.progress == clamped {
            return false;
        }
        challenge.progress = clamped;
        self.observers.notify(&self.challenges);
        true
    }

    pub fn set_completed(&mut self, id: &ChallengeId) -> bool {
        self.set_completed_at(id, Utc::now())
    }

    /// Mark a challenge completed. Idempotent: a second call keeps the first
    /// timestamp and returns false.
    pub fn set_completed_at(&mut self, id: &ChallengeId, at: DateTime<Utc>) -> bool {
        let Some(&i) = self.index.get(id) else {
            return false;
        };
        let challenge = &mut self.challenges[i];
        if challenge.completed {
            return false;
        }
        challenge.completed = true;
        challenge.progress = 100.0;
        challenge.completed_at = Some(at);
        self.observers.notify(&self.challenges);
        true
    }

    /// Swap in fresh catalog metadata, keeping progress for ids present in
    /// both the old and the new catalog.
    pub fn reseed(&mut self, catalog: Vec<Challenge>) {
        let records = self.progress_records();
        self.replace(catalog);
        self.merge_records(&records);
        self.observers.notify(&self.challenges);
    }

    pub fn progress_records(&self) -> Vec<ProgressRecord> {
        self.challenges.iter().map(ProgressRecord::from).collect()
    }

    /// Restore persisted progress. Records for ids not in the catalog are
    /// dropped; completion is never reverted.
    pub fn apply_progress(&mut self, records: &[ProgressRecord]) {
        self.merge_records(records);
        self.observers.notify(&self.challenges);
    }

    fn merge_records(&mut self, records: &[ProgressRecord]) {
        for record in records {
            let Some(&i) = self.index.get(&record.id) else {
                continue;
            };
            let challenge = &mut self.challenges[i];
            if challenge.completed {
                continue;
            }
            if record.completed {
                challenge.completed = true;
                challenge.progress = 100.0;
                challenge.completed_at = record.completed_at;
            } else if record.progress.is_finite() {
                challenge.progress = record.progress.clamp(0.0, 100.0);
            }
        }
    }

    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&[Challenge]) + 'static,
    {
        self.observers.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }
}

fn normalize(challenge: &mut Challenge) {
    if challenge.completed {
        challenge.progress = 100.0;
    } else if challenge.progress.is_finite() {
        challenge.progress = challenge.progress.clamp(0.0, 100.0);
    } else {
        challenge.progress = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::challenge::Difficulty;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn store() -> ChallengeStore {
        ChallengeStore::new(vec![
            Challenge::new("a", "Alpha", Difficulty::Easy, 120.0, 25),
            Challenge::new("b", "Beta", Difficulty::Medium, 180.0, 50),
            Challenge::new("c", "Gamma", Difficulty::Hard, 240.0, 100),
        ])
    }

    #[test]
    fn list_keeps_catalog_order() {
        let s = store();
        let ids: Vec<&str> = s.list().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn duplicate_ids_keep_first_entry() {
        let s = ChallengeStore::new(vec![
            Challenge::new("a", "First", Difficulty::Easy, 10.0, 1),
            Challenge::new("a", "Second", Difficulty::Hard, 20.0, 2),
        ]);
        assert_eq!(s.len(), 1);
        assert_eq!(s.get(&"a".into()).unwrap().title, "First");
    }

    #[test]
    fn set_progress_clamps() {
        let mut s = store();
        assert!(s.set_progress(&"a".into(), 140.0));
        assert_eq!(s.get(&"a".into()).unwrap().progress, 100.0);
        assert!(s.set_progress(&"a".into(), -3.0));
        assert_eq!(s.get(&"a".into()).unwrap().progress, 0.0);
    }

    #[test]
    fn set_progress_ignores_unknown_and_nan() {
        let mut s = store();
        assert!(!s.set_progress(&"zzz".into(), 50.0));
        assert!(!s.set_progress(&"a".into(), f64::NAN));
        assert_eq!(s.get(&"a".into()).unwrap().progress, 0.0);
    }

    #[test]
    fn completion_pins_progress_at_100() {
        let mut s = store();
        s.set_progress(&"b".into(), 40.0);
        assert!(s.set_completed(&"b".into()));
        assert!(!s.set_progress(&"b".into(), 10.0));

        let b = s.get(&"b".into()).unwrap();
        assert!(b.completed);
        assert_eq!(b.progress, 100.0);
        assert!(b.completed_at.is_some());
    }

    #[test]
    fn set_completed_is_idempotent() {
        let mut s = store();
        let first = Utc::now() - chrono::Duration::hours(1);
        assert!(s.set_completed_at(&"c".into(), first));
        assert!(!s.set_completed(&"c".into()));
        assert_eq!(s.get(&"c".into()).unwrap().completed_at, Some(first));
        assert!(!s.set_completed(&"nope".into()));
    }

    #[test]
    fn reseed_keeps_progress_for_known_ids() {
        let mut s = store();
        s.set_progress(&"a".into(), 33.0);
        s.set_completed(&"b".into());

        s.reseed(vec![
            Challenge::new("b", "Beta (remaster)", Difficulty::Medium, 181.0, 50),
            Challenge::new("d", "Delta", Difficulty::Easy, 90.0, 10),
        ]);

        assert_eq!(s.len(), 2);
        assert!(s.get(&"a".into()).is_none());
        let b = s.get(&"b".into()).unwrap();
        assert_eq!(b.title, "Beta (remaster)");
        assert!(b.completed);
        assert_eq!(s.get(&"d".into()).unwrap().progress, 0.0);
    }

    #[test]
    fn apply_progress_never_uncompletes() {
        let mut s = store();
        s.set_completed(&"a".into());
        s.apply_progress(&[
            ProgressRecord {
                id: "a".into(),
                progress: 12.0,
                completed: false,
                completed_at: None,
            },
            ProgressRecord {
                id: "c".into(),
                progress: 250.0,
                completed: false,
                completed_at: None,
            },
        ]);
        assert!(s.get(&"a".into()).unwrap().completed);
        assert_eq!(s.get(&"c".into()).unwrap().progress, 100.0);
        assert!(!s.get(&"c".into()).unwrap().completed);
    }

    #[test]
    fn subscribers_see_changes_only() {
        let hits = Rc::new(RefCell::new(0));
        let mut s = store();
        let h = Rc::clone(&hits);
        let sub = s.subscribe(move |_| *h.borrow_mut() += 1);

        s.set_progress(&"a".into(), 10.0);
        s.set_progress(&"a".into(), 10.0); // unchanged
        s.set_progress(&"zzz".into(), 10.0); // unknown
        assert_eq!(*hits.borrow(), 1);

        assert!(s.unsubscribe(sub));
        s.set_progress(&"a".into(), 20.0);
        assert_eq!(*hits.borrow(), 1);
    }
}
