use std::{collections::HashMap, fmt};

use chrono::{DateTime, Duration, Utc};

use super::FacilityReport;
use crate::geo::Coordinate;

/// A coordinate snapped to two decimal places (roughly 1 km).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    lat_centi: i32,
    lon_centi: i32,
}

impl From<Coordinate> for CacheKey {
    fn from(coordinate: Coordinate) -> Self {
        Self {
            lat_centi: (coordinate.lat * 100.0).round() as i32,
            lon_centi: (coordinate.lon * 100.0).round() as i32,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "osm_{:.2}_{:.2}",
            self.lat_centi as f64 / 100.0,
            self.lon_centi as f64 / 100.0
        )
    }
}

#[derive(Debug, Clone)]
struct CachedReport {
    report: FacilityReport,
    stored_at: DateTime<Utc>,
}

/// Size-bounded TTL cache. When full, the oldest entry goes first.
#[derive(Debug)]
pub struct FacilityCache {
    entries: HashMap<CacheKey, CachedReport>,
    ttl: Duration,
    max_entries: usize,
}

impl FacilityCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    /// Returns a live entry. Expired entries are dropped on the way.
    pub fn get(&mut self, key: CacheKey, now: DateTime<Utc>) -> Option<FacilityReport> {
        let expired = match self.entries.get(&key) {
            Some(entry) if now - entry.stored_at < self.ttl => return Some(entry.report.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.entries.remove(&key);
        }
        None
    }

    pub fn insert(&mut self, key: CacheKey, report: FacilityReport, now: DateTime<Utc>) {
        self.entries.insert(
            key,
            CachedReport {
                report,
                stored_at: now,
            },
        );
        while self.entries.len() > self.max_entries {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.stored_at)
                .map(|(key, _)| *key);
            match oldest {
                Some(key) => {
                    self.entries.remove(&key);
                }
                None => break,
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
