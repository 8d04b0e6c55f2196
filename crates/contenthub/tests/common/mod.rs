//! Shared test utilities for contenthub integration tests.
//!
//! This module provides:
//! - `TestHarness` with a temp data root and an in-memory database
//! - `FakeToolchain`, a scriptable stand-in for yt-dlp and ffmpeg
//! - `RecordingHook` for observing hook invocations

pub mod fakes;
pub mod harness;

pub use fakes::{FakeToolchain, RecordingHook};
pub use harness::TestHarness;
