//! Propagation waves
//!
//! One user action starts one wave. The wave remembers which records it has
//! already reached so every record is acted on at most once, which is what
//! makes propagation through cycles terminate. Marks live in the wave, not
//! in the records, so there is nothing to reset afterwards: a new action
//! simply starts a new wave.

use crate::models::RecordId;
use serde::Serialize;
use std::collections::HashSet;

#[derive(Debug, Default)]
pub struct PropagationWave {
    visited: HashSet<RecordId>,
    trail: Vec<RecordId>,
}

impl PropagationWave {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `id` as reached; returns `false` if it already was
    pub fn visit(&mut self, id: &RecordId) -> bool {
        let first = self.visited.insert(id.clone());
        if first {
            self.trail.push(id.clone());
        }
        first
    }

    pub fn is_visited(&self, id: &RecordId) -> bool {
        self.visited.contains(id)
    }

    pub fn visit_count(&self) -> usize {
        self.visited.len()
    }

    /// Records in the order the wave first reached them
    pub fn trail(&self) -> &[RecordId] {
        &self.trail
    }

    pub fn finish(self) -> WaveReport {
        WaveReport {
            visited: self.trail,
        }
    }
}

/// What one finished wave touched
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WaveReport {
    pub visited: Vec<RecordId>,
}

impl WaveReport {
    pub fn touched(&self, id: &RecordId) -> bool {
        self.visited.contains(id)
    }

    /// Fold a later wave of the same batch into this report
    pub fn merge(&mut self, other: WaveReport) {
        for id in other.visited {
            if !self.visited.contains(&id) {
                self.visited.push(id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visit_is_idempotent() {
        let mut wave = PropagationWave::new();
        let id = RecordId::ordinary(4);
        assert!(wave.visit(&id));
        assert!(!wave.visit(&id));
        assert!(wave.is_visited(&id));
        assert_eq!(wave.visit_count(), 1);
        assert_eq!(wave.trail(), &[id.clone()]);
    }

    #[test]
    fn test_report_keeps_first_reach_order() {
        let mut wave = PropagationWave::new();
        for n in [3, 1, 3, 2] {
            wave.visit(&RecordId::ordinary(n));
        }
        let mut report = wave.finish();
        assert_eq!(
            report.visited,
            vec![RecordId::ordinary(3), RecordId::ordinary(1), RecordId::ordinary(2)]
        );

        report.merge(WaveReport {
            visited: vec![RecordId::ordinary(1), RecordId::ordinary(9)],
        });
        assert_eq!(report.visited.len(), 4);
        assert!(report.touched(&RecordId::ordinary(9)));
    }
}
