// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Proptest Strategies
//!
//! Reusable proptest strategies for property-based testing.

use proptest::prelude::*;

use oextrace_core::{ContactMetadata, Coordinate, DaySecret};

/// Strategy for day secrets built from arbitrary bytes.
pub fn day_secret_strategy() -> impl Strategy<Value = DaySecret> {
    any::<[u8; 32]>().prop_map(DaySecret::from_bytes)
}

/// Strategy for day numbers between 2020 and 2100.
pub fn day_strategy() -> impl Strategy<Value = i64> {
    18_262i64..47_482
}

/// Strategy for coordinates on the 1e-7 degree grid the metadata encodes.
pub fn coordinate_strategy() -> impl Strategy<Value = Coordinate> {
    (-900_000_000i32..=900_000_000, -1_800_000_000i32..=1_800_000_000).prop_map(|(lat, lng)| {
        Coordinate::new(f64::from(lat) / 10_000_000.0, f64::from(lng) / 10_000_000.0)
    })
}

/// Strategy for encounter metadata, with or without a location.
pub fn metadata_strategy() -> impl Strategy<Value = ContactMetadata> {
    (0i64..4_102_444_800_000, proptest::option::of(coordinate_strategy()))
        .prop_map(|(timestamp, coordinate)| ContactMetadata::new(timestamp, coordinate))
}
