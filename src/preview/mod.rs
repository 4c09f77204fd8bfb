// SPDX-License-Identifier: GPL-3.0-only

//! Producer/consumer core of the live preview
//!
//! ```text
//! capture thread                         render thread
//! ─────────────                          ─────────────
//! raw frame → transform → publish ─┐
//!                                  ├─► FrameSlot ─► consume → upload → draw
//!             request_render ──────┴─► RedrawSignal ─► wake        │
//!                                                                  ▼
//!                           SnapshotMailbox ◄── request ── any thread
//! ```

pub mod fps;
pub mod frame;
pub mod orientation;
pub mod session;
pub mod signal;
pub mod slot;
pub mod snapshot;

pub use fps::FpsCounter;
pub use frame::Frame;
pub use orientation::{Orientation, OrientationControl, QUAD_POSITIONS, UvTable, uv_table};
pub use session::{PreviewSession, SessionHandle};
pub use signal::{RedrawSignal, WaitOutcome};
pub use slot::FrameSlot;
pub use snapshot::{PendingSnapshot, SnapshotCallback, SnapshotMailbox, SnapshotReceiver};
