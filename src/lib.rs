//! e621 feed library.
//!
//! An infinite-scrolling timeline over the e621 posts API: a pagination
//! controller that wraps around on empty pages, a normalizer for the API's
//! loosely-shaped records, and a small credential store gating the
//! favorites endpoints.

pub mod app;
pub mod auth;
pub mod config;
pub mod constants;
pub mod display;
pub mod favorites;
pub mod feed;
pub mod models;
pub mod normalize;
pub mod render;
pub mod source;
