//! Afterglow engine crate.
//!
//! This crate owns the post-processing pipeline core (render targets, blur
//! kernel, pass programs, per-frame orchestration), the graphics backends it
//! draws through, and the platform + GPU runtime used by the studio binary.

pub mod backend;
pub mod pipeline;

pub mod core;
pub mod device;
pub mod input;
pub mod time;
pub mod window;

pub mod logging;
