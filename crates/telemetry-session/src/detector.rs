//! Best-effort venue inference from lap-boundary positions.
//!
//! Each lap boundary contributes one `(last, current)` position pair. A venue
//! scores `exp(-d / SCALE_M)` per boundary, where `d` is the mean distance of
//! the pair to the venue's reference start/end points; boundary scores are
//! averaged and then discounted by the share of mid-lap samples that fell
//! outside the venue's bounds.

use std::sync::Arc;

use crate::venues::VenueTable;

/// Distance at which a boundary's score falls to `1/e`.
pub const SCALE_M: f64 = 25.0;

/// Probability above which the inferred venue is considered settled.
pub const CONFIDENT_PROBABILITY: f64 = 0.9;

/// Matches below this probability are not reported.
pub const MIN_PROBABILITY: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Boundary {
    last: (f64, f64),
    current: (f64, f64),
}

/// Per-session venue detector.
#[derive(Debug, Clone)]
pub struct TrackDetector {
    table: Arc<VenueTable>,
    boundaries: Vec<Boundary>,
    samples: u64,
    /// Mid-lap samples outside each venue's bounds, indexed like the table
    out_of_bounds: Vec<u64>,
    track_name: Option<String>,
    probability: f64,
}

impl TrackDetector {
    pub fn new(table: Arc<VenueTable>) -> Self {
        let out_of_bounds = vec![0; table.len()];
        Self {
            table,
            boundaries: Vec::new(),
            samples: 0,
            out_of_bounds,
            track_name: None,
            probability: 0.0,
        }
    }

    /// Forget everything observed so far.
    pub fn reset(&mut self) {
        self.boundaries.clear();
        self.samples = 0;
        self.out_of_bounds.iter_mut().for_each(|n| *n = 0);
        self.track_name = None;
        self.probability = 0.0;
    }

    pub fn track_name(&self) -> Option<&str> {
        self.track_name.as_deref()
    }

    /// Confidence of the current match in `[0, 1]`.
    pub fn probability(&self) -> f64 {
        self.probability
    }

    pub fn boundaries(&self) -> usize {
        self.boundaries.len()
    }

    /// Record a mid-lap position.
    pub fn update(&mut self, x: f64, z: f64) {
        self.samples += 1;
        for (venue, out) in self.table.venues.iter().zip(self.out_of_bounds.iter_mut()) {
            if venue.bounds.is_some_and(|b| !b.contains(x, z)) {
                *out += 1;
            }
        }
    }

    /// Record a lap boundary and re-score every venue.
    ///
    /// Returns the accepted venue name, if any, and its probability. A
    /// previously accepted venue is only replaced by a different one with a
    /// higher probability.
    pub fn guess(&mut self, last_x: f64, last_z: f64, curr_x: f64, curr_z: f64) -> (Option<String>, f64) {
        self.boundaries.push(Boundary {
            last: (last_x, last_z),
            current: (curr_x, curr_z),
        });

        let best = self
            .table
            .venues
            .iter()
            .enumerate()
            .map(|(i, _)| (i, self.score(i)))
            .max_by(|a, b| a.1.total_cmp(&b.1));

        if let Some((index, probability)) = best {
            let name = &self.table.venues[index].name;
            let same = self.track_name.as_deref() == Some(name.as_str());
            if same {
                self.probability = probability;
            } else if probability >= MIN_PROBABILITY && probability > self.probability {
                self.track_name = Some(name.clone());
                self.probability = probability;
            }
        }

        (self.track_name.clone(), self.probability)
    }

    fn score(&self, index: usize) -> f64 {
        let venue = &self.table.venues[index];
        if self.boundaries.is_empty() {
            return 0.0;
        }
        let sum: f64 = self
            .boundaries
            .iter()
            .map(|b| {
                let d_start = distance(b.last, (venue.start[0], venue.start[1]));
                let d_end = distance(b.current, (venue.end[0], venue.end[1]));
                (-(d_start + d_end) / 2.0 / SCALE_M).exp()
            })
            .sum();
        let mean = sum / self.boundaries.len() as f64;

        let penalty = if self.samples == 0 {
            0.0
        } else {
            self.out_of_bounds[index] as f64 / self.samples as f64
        };
        mean * (1.0 - penalty)
    }
}

fn distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    (a.0 - b.0).hypot(a.1 - b.1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::venues::{Bounds, Venue};

    fn table() -> Arc<VenueTable> {
        Arc::new(VenueTable {
            venues: vec![
                Venue {
                    name: "Alpha Ring".to_string(),
                    start: [0.0, 0.0],
                    end: [0.0, 10.0],
                    bounds: Some(Bounds {
                        min_x: -100.0,
                        max_x: 100.0,
                        min_z: -100.0,
                        max_z: 100.0,
                    }),
                },
                Venue {
                    name: "Alpha Ring - Short".to_string(),
                    start: [0.0, 0.0],
                    end: [0.0, 10.0],
                    bounds: Some(Bounds {
                        min_x: -100.0,
                        max_x: 0.0,
                        min_z: -100.0,
                        max_z: 100.0,
                    }),
                },
                Venue {
                    name: "Beta Park".to_string(),
                    start: [1000.0, 1000.0],
                    end: [1000.0, 1010.0],
                    bounds: None,
                },
            ],
        })
    }

    #[test]
    fn test_exact_boundary_matches() {
        let mut d = TrackDetector::new(table());
        let (name, p) = d.guess(1000.0, 1000.0, 1000.0, 1010.0);
        assert_eq!(name.as_deref(), Some("Beta Park"));
        assert!((p - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_far_boundary_reports_nothing() {
        let mut d = TrackDetector::new(table());
        let (name, p) = d.guess(5000.0, 5000.0, 5000.0, 5010.0);
        assert!(name.is_none());
        assert!(p < MIN_PROBABILITY);
    }

    #[test]
    fn test_bounds_disambiguate_layouts() {
        let mut d = TrackDetector::new(table());
        for x in [-50.0, 20.0, 60.0, 80.0] {
            d.update(x, 0.0);
        }
        let (name, p) = d.guess(0.0, 0.0, 0.0, 10.0);
        assert_eq!(name.as_deref(), Some("Alpha Ring"));
        assert!(p > CONFIDENT_PROBABILITY);
    }

    #[test]
    fn test_lower_probability_does_not_override() {
        let mut d = TrackDetector::new(table());
        let (first, p1) = d.guess(1000.0, 1000.0, 1000.0, 1010.0);
        // A boundary near Alpha averages Beta down but cannot beat it.
        let (second, p2) = d.guess(0.0, 0.0, 0.0, 15.0);
        assert_eq!(first, second);
        assert!(p2 < p1);
    }

    #[test]
    fn test_reset_clears_state() {
        let mut d = TrackDetector::new(table());
        d.update(1.0, 1.0);
        d.guess(1000.0, 1000.0, 1000.0, 1010.0);
        d.reset();
        assert!(d.track_name().is_none());
        assert_eq!(d.probability(), 0.0);
        assert_eq!(d.boundaries(), 0);
    }

    #[test]
    fn test_empty_table_never_guesses() {
        let mut d = TrackDetector::new(Arc::new(VenueTable::default()));
        assert_eq!(d.guess(0.0, 0.0, 0.0, 0.0), (None, 0.0));
    }
}
