// SPDX-License-Identifier: MIT

//! The catch-all error used at the node binary's top level and in test
//! harnesses, where a typed error enum would be more ceremony than value
//! (spec §9: most of the crate-internal errors below this are typed).

use snafu::Snafu;

pub mod fmt;

pub type WhateverResult<T> = std::result::Result<T, Whatever>;

/// Snafu's `Whatever`, but `Send + Sync` so it can cross an `await` point
/// inside `node`/`consensus-tests`'s async harnesses.
#[derive(Debug, Snafu)]
#[snafu(whatever, display("{message}"))]
pub struct Whatever {
    #[snafu(source(from(Box<dyn std::error::Error + Send + Sync>, Some)))]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,

    message: String,
}
