//! mdq-core: download queue manager for a desktop music library.
//!
//! Admits requests to fetch remote media via an external fetch-and-
//! transcode tool, bounds concurrency, tracks per-job lifecycle and
//! progress, supports cancellation, and runs a best-effort silence trim
//! whose failure never voids an otherwise-successful download.

pub mod config;
pub mod logging;

pub mod executor;
pub mod fetcher;
pub mod job;
pub mod postprocess;
pub mod progress;
pub mod queue;
pub mod resolver;
