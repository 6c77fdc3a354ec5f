//! Core engine-facing contracts.
//!
//! This module defines the stable interface between the runtime (platform loop)
//! and higher layers (studio, tools): the application trait, the per-frame
//! context and the tick driver.

mod app;
mod ctx;
mod frame_loop;

pub use app::{App, AppControl};
pub use ctx::{FrameCtx, WindowCtx};
pub use frame_loop::{CancelToken, FrameLoop};
