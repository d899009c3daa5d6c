#![doc = include_str!("../README.md")]

mod common;
pub use common::*;
// Public re-export so downstream crates can name the same `bson` version used
// by `CountryRecord` via `country_tonic_core::bson`
pub use mongodb::bson;
