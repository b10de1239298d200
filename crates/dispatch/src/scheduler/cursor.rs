use serde::Serialize;

/// Claimed/finished counters over a fixed task list.
///
/// Invariant: `finished + cancelled <= scheduled <= total`, all counters
/// only grow. `cancelled` stays 0 unless a run is aborted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Cursor {
    total: usize,
    scheduled: usize,
    finished: usize,
    cancelled: usize,
}

impl Cursor {
    pub fn new(total: usize) -> Self {
        Self { total, scheduled: 0, finished: 0, cancelled: 0 }
    }

    /// Claim the next unscheduled index, if any.
    pub fn claim(&mut self) -> Option<usize> {
        if self.scheduled < self.total {
            let index = self.scheduled;
            self.scheduled += 1;
            Some(index)
        } else {
            None
        }
    }

    /// Record one claimed task as finished.
    ///
    /// Returns `false` and leaves the counters untouched when nothing is in
    /// flight.
    #[must_use]
    pub fn finish(&mut self) -> bool {
        if self.in_flight() == 0 {
            return false;
        }
        self.finished += 1;
        true
    }

    /// Release a claimed task that will never run.
    #[must_use]
    pub fn cancel(&mut self) -> bool {
        if self.in_flight() == 0 {
            return false;
        }
        self.cancelled += 1;
        true
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn scheduled(&self) -> usize {
        self.scheduled
    }

    pub fn finished(&self) -> usize {
        self.finished
    }

    pub fn cancelled(&self) -> usize {
        self.cancelled
    }

    /// Claimed but neither finished nor cancelled.
    pub fn in_flight(&self) -> usize {
        self.scheduled - self.finished - self.cancelled
    }

    pub fn is_drained(&self) -> bool {
        self.scheduled == self.total && self.finished == self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_list_is_drained_from_the_start() {
        let mut cursor = Cursor::new(0);
        assert!(cursor.is_drained());
        assert_eq!(cursor.claim(), None);
    }

    #[test]
    fn claims_are_sequential_and_unique() {
        let mut cursor = Cursor::new(3);
        assert_eq!(cursor.claim(), Some(0));
        assert_eq!(cursor.claim(), Some(1));
        assert_eq!(cursor.claim(), Some(2));
        assert_eq!(cursor.claim(), None);
        assert_eq!(cursor.scheduled(), 3);
    }

    #[test]
    fn drains_only_after_every_claim_finishes() {
        let mut cursor = Cursor::new(2);
        cursor.claim();
        cursor.claim();
        assert!(cursor.finish());
        assert!(!cursor.is_drained());
        assert_eq!(cursor.in_flight(), 1);
        assert!(cursor.finish());
        assert!(cursor.is_drained());
        assert_eq!(cursor.finished(), cursor.scheduled());
    }

    #[test]
    fn finish_without_a_claim_is_refused() {
        let mut cursor = Cursor::new(2);
        assert!(!cursor.finish());
        assert_eq!(cursor.finished(), 0);

        cursor.claim();
        assert!(cursor.finish());
        assert!(!cursor.finish());
        assert_eq!(cursor.finished(), 1);
        assert_eq!(cursor.in_flight(), 0);
    }

    #[test]
    fn cancelled_claims_leave_flight_without_finishing() {
        let mut cursor = Cursor::new(5);
        cursor.claim();
        cursor.claim();
        assert!(cursor.finish());
        assert!(cursor.cancel());
        assert_eq!(cursor.in_flight(), 0);
        assert_eq!(cursor.finished(), 1);
        assert_eq!(cursor.cancelled(), 1);
        assert!(!cursor.cancel());
        assert!(!cursor.is_drained());
    }
}
