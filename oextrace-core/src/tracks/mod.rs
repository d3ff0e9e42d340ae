// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Track Store Module
//!
//! The device's own route history and the routes downloaded from diagnosed
//! users, segmented into renderable polylines. Geometric intersection with
//! those polylines is left to the consumer.

mod polyline;
mod store;

pub use polyline::{segment, Polyline};
pub use store::TrackStore;

use serde::{Deserialize, Serialize};

use crate::crypto::{day_number, Coordinate, DaySecret};

/// Default nominal sampling interval.
pub const DEFAULT_TRACKING_INTERVAL_MS: i64 = 60_000;

/// Default horizontal accuracy cutoff in meters.
pub const DEFAULT_ACCURACY_THRESHOLD: i32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    pub lat: f64,
    pub lng: f64,
    /// Epoch milliseconds.
    pub tst: i64,
}

impl TrackPoint {
    pub fn new(lat: f64, lng: f64, tst: i64) -> Self {
        TrackPoint { lat, lng, tst }
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lng)
    }

    pub fn day(&self) -> i64 {
        day_number(self.tst)
    }
}

/// A location sample as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawTrackPoint {
    pub point: TrackPoint,
    /// Horizontal accuracy in meters.
    pub accuracy: i32,
}

impl RawTrackPoint {
    pub fn new(point: TrackPoint, accuracy: i32) -> Self {
        RawTrackPoint { point, accuracy }
    }
}

/// A route signed by the day secret of the device that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub key: DaySecret,
    pub points: Vec<TrackPoint>,
}

impl Track {
    pub fn new(key: DaySecret, points: Vec<TrackPoint>) -> Self {
        Track { key, points }
    }

    /// Latest point timestamp, if the track has points.
    pub fn max_tst(&self) -> Option<i64> {
        self.points.iter().map(|p| p.tst).max()
    }
}
