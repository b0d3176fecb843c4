//! Time subsystem.
//!
//! Frame timing without coupling to the runtime:
//! - one `FrameClock` per render loop, `tick()` once per presented frame
//! - `FpsCounter` for the periodic frame-rate readout

mod frame_clock;

pub use frame_clock::{FpsCounter, FrameClock, FrameTime};
