// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! End-to-End Tests for OExTrace Core
//!
//! Multi-device scenarios from the radio exchange through diagnosis key
//! matching, direct contacts and shard sync.
//!
//! Run with: cargo test --test e2e

#[path = "../common/mod.rs"]
mod common;

mod direct_contact_e2e_test;
mod exposure_e2e_test;
mod shard_sync_e2e_test;
