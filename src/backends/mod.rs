// SPDX-License-Identifier: GPL-3.0-only

//! Backend abstraction layer for frame capture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │            PreviewSession                │
//! └───────────────────┬──────────────────────┘
//!                     │
//! ┌───────────────────┴──────────────────────┐
//! │             Camera backend               │
//! │  ┌──────────────┐   ┌─────────────────┐  │
//! │  │ Test pattern │   │   Image file    │  │
//! │  └──────────────┘   └─────────────────┘  │
//! │         CaptureController (producer)     │
//! └──────────────────────────────────────────┘
//! ```

pub mod camera;
