//! Alert log
//!
//! Bounded ring of the most recent alerts; the oldest entry is evicted
//! when full.

use std::fmt;

use contracts::Alert;
use ringbuf::{traits::*, HeapRb};

pub struct AlertLog {
    ring: HeapRb<Alert>,
    /// Alerts ever pushed, including evicted ones
    total: u64,
}

impl fmt::Debug for AlertLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlertLog")
            .field("len", &self.ring.occupied_len())
            .field("capacity", &self.ring.capacity())
            .field("total", &self.total)
            .finish()
    }
}

impl AlertLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            ring: HeapRb::new(capacity.max(1)),
            total: 0,
        }
    }

    /// Append, evicting the oldest alert when full
    pub fn push(&mut self, alert: Alert) {
        self.ring.push_overwrite(alert);
        self.total += 1;
    }

    /// Oldest first
    pub fn iter(&self) -> impl Iterator<Item = &Alert> {
        self.ring.iter()
    }

    pub fn latest(&self) -> Option<&Alert> {
        self.ring.iter().last()
    }

    pub fn len(&self) -> usize {
        self.ring.occupied_len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    pub fn total(&self) -> u64 {
        self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alert(message: &str) -> Alert {
        Alert {
            category: "delay".into(),
            message: message.into(),
            entity_id: None,
        }
    }

    #[test]
    fn evicts_oldest_when_full() {
        let mut log = AlertLog::new(2);
        log.push(alert("a"));
        log.push(alert("b"));
        log.push(alert("c"));

        let messages: Vec<_> = log.iter().map(|a| a.message.as_str()).collect();
        assert_eq!(messages, vec!["b", "c"]);
        assert_eq!(log.latest().map(|a| a.message.as_str()), Some("c"));
        assert_eq!(log.total(), 3);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn zero_capacity_keeps_one() {
        let mut log = AlertLog::new(0);
        assert!(log.is_empty());
        log.push(alert("a"));
        assert_eq!(log.len(), 1);
    }
}
