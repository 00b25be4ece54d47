//! meilimap turns MeiliSearch index documents into sitemap files.
//!
//! Each configured source maps one search index to one url-set file through
//! a declarative field map; a top-level sitemap-index enumerates every
//! generated file. Sources run once or on a live-update interval, and the
//! store directory can be served over HTTP.

pub mod config;
pub mod document;
pub mod fetch;
pub mod generator;
pub mod server;
pub mod sitemap;
