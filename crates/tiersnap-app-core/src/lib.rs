// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared application services for tiersnap tools (config, retention prefs).
//! Keeps CLI and storage adapters thin.

pub mod config;
pub mod prefs;
