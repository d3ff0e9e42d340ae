// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

use super::TrackPoint;

/// An ordered run of at least two points rendered as one path.
#[derive(Debug, Clone, PartialEq)]
pub struct Polyline {
    pub points: Vec<TrackPoint>,
}

/// Splits time-ordered points into polylines wherever the gap between two
/// consecutive points exceeds twice `interval_ms`.
///
/// Points are sorted by timestamp first. A lone point becomes a degenerate
/// two-point polyline.
pub fn segment(points: &[TrackPoint], interval_ms: i64) -> Vec<Polyline> {
    let mut sorted = points.to_vec();
    sorted.sort_by_key(|p| p.tst);

    let max_gap = interval_ms.saturating_mul(2);
    let mut out = Vec::new();
    let mut current: Vec<TrackPoint> = Vec::new();

    for point in sorted {
        if let Some(last) = current.last() {
            if point.tst - last.tst > max_gap {
                out.push(finish(std::mem::take(&mut current)));
            }
        }
        current.push(point);
    }
    if !current.is_empty() {
        out.push(finish(current));
    }

    out
}

fn finish(mut points: Vec<TrackPoint>) -> Polyline {
    if points.len() == 1 {
        points.push(points[0]);
    }
    Polyline { points }
}
