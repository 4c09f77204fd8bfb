// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for the producer/renderer hand-off: frame slot, FPS
//! counter, orientation mapping and snapshot requests

use edgecam::backends::camera::SensorRotation;
use edgecam::errors::SnapshotError;
use edgecam::preview::{
    FpsCounter, Frame, FrameSlot, Orientation, QUAD_POSITIONS, SessionHandle, WaitOutcome,
    uv_table,
};
use image::RgbaImage;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

#[test]
fn test_consume_returns_last_published() {
    for count in 1..=5u8 {
        let slot = FrameSlot::new();
        for value in 1..=count {
            slot.publish(Frame::filled(2, 2, value));
        }
        assert_eq!(
            slot.consume(),
            Some(Frame::filled(2, 2, count)),
            "After {} publishes only the last should be seen",
            count
        );
    }
}

#[test]
fn test_second_consume_is_empty() {
    let slot = FrameSlot::new();
    slot.publish(Frame::filled(4, 4, 0xFF));

    let frame = slot.consume().expect("first consume should return the frame");
    assert_eq!(frame, Frame::filled(4, 4, 0xFF));
    assert_eq!(frame.pixels().len(), 64);
    assert!(slot.consume().is_none(), "No new frame since last consume");
}

#[test]
fn test_overwritten_frames_are_counted() {
    let slot = FrameSlot::new();
    slot.publish(Frame::filled(1, 1, 1));
    slot.publish(Frame::filled(1, 1, 2));
    slot.publish(Frame::filled(1, 1, 3));
    assert_eq!(slot.dropped_count(), 2);
}

#[test]
fn test_session_reports_unseen_frames() {
    let handle = SessionHandle::new(Orientation::Back);
    handle.publish(Frame::filled(1, 1, 1));
    handle.publish(Frame::filled(1, 1, 2));
    assert!(handle.consume().is_some());
    handle.publish(Frame::filled(1, 1, 3));

    assert_eq!(handle.frames_published(), 3);
    assert_eq!(handle.frames_dropped(), 1);
}

#[test]
fn test_fps_ten_frames_in_one_second() {
    let start = Instant::now();
    let mut counter = FpsCounter::starting_at(start);

    let mut reported = None;
    for i in 1..=10u64 {
        reported = counter.tick_at(start + Duration::from_millis(100 * i));
        if i < 10 {
            assert!(reported.is_none(), "Window should still be open at tick {}", i);
        }
    }

    let rate = reported.expect("tenth tick closes the window");
    assert!((rate - 10.0).abs() < 1e-9, "Expected 10 fps, got {}", rate);
    assert_eq!(counter.count(), 0, "Count resets when the window closes");
}

#[test]
fn test_fps_window_opens_lazily() {
    let start = Instant::now();
    let mut counter = FpsCounter::new();
    assert!(counter.tick_at(start).is_none());
    assert!(counter.tick_at(start + Duration::from_millis(999)).is_none());
    let rate = counter
        .tick_at(start + Duration::from_millis(1000))
        .expect("window closes after one second");
    assert!((rate - 3.0).abs() < 1e-9);
}

#[test]
fn test_front_uvs_mirror_back_uvs() {
    for rotation in [
        SensorRotation::None,
        SensorRotation::Rotate90,
        SensorRotation::Rotate180,
        SensorRotation::Rotate270,
    ] {
        let back = uv_table(Orientation::Back, rotation);
        let front = uv_table(Orientation::Front, rotation);

        // Vertices at mirrored screen positions swap texture coordinates
        for (i, position) in QUAD_POSITIONS.iter().enumerate() {
            let mirrored = QUAD_POSITIONS
                .iter()
                .position(|p| p[0] == -position[0] && p[1] == position[1])
                .unwrap();
            assert_eq!(
                front[i], back[mirrored],
                "Front vertex {} should sample what back vertex {} samples ({})",
                i, mirrored, rotation
            );
        }
    }
}

#[test]
fn test_orientation_switch_leaves_frame_alone() {
    let handle = SessionHandle::new(Orientation::Back);
    handle.publish(Frame::filled(2, 2, 9));
    let first = handle.consume().unwrap();

    handle.set_orientation(Orientation::Front);
    handle.publish(Frame::filled(2, 2, 9));
    let second = handle.consume().unwrap();

    assert_eq!(first, second);
    assert_eq!(handle.orientation(), Orientation::Front);
}

fn counting(counter: &Arc<AtomicUsize>) -> impl FnOnce(RgbaImage) + Send + 'static {
    let counter = Arc::clone(counter);
    move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn test_later_snapshot_request_wins() {
    let handle = SessionHandle::default();
    let first = Arc::new(AtomicUsize::new(0));
    let second = Arc::new(AtomicUsize::new(0));

    handle.request_snapshot(counting(&first));
    handle.request_snapshot(counting(&second));

    handle
        .take_snapshot_request()
        .expect("one request is live")
        .fulfil(RgbaImage::new(1, 1));
    assert_eq!(first.load(Ordering::SeqCst), 0, "Replaced callback is dropped");
    assert_eq!(second.load(Ordering::SeqCst), 1);
    assert!(!handle.snapshot_pending());
}

#[test]
fn test_replaced_async_snapshot_is_cancelled() {
    let handle = SessionHandle::default();
    let first = handle.request_snapshot_async();
    let second = handle.request_snapshot_async();

    assert!(matches!(first.wait(), Err(SnapshotError::Cancelled)));

    handle
        .take_snapshot_request()
        .unwrap()
        .fulfil(RgbaImage::new(3, 2));
    let image = second.wait().unwrap();
    assert_eq!(image.dimensions(), (3, 2));
}

#[test]
fn test_snapshot_request_wakes_renderer() {
    let handle = SessionHandle::default();
    handle.request_snapshot(|_| {});
    assert_eq!(
        handle.signal().wait_timeout(Duration::from_millis(10)),
        WaitOutcome::Redraw
    );
    assert_eq!(
        handle.signal().wait_timeout(Duration::from_millis(10)),
        WaitOutcome::TimedOut,
        "One request wakes one draw"
    );
}

#[test]
fn test_closed_session_wakes_with_closed() {
    let handle = SessionHandle::default();
    let waiter = {
        let handle = handle.clone();
        std::thread::spawn(move || handle.signal().wait())
    };
    handle.close();
    assert_eq!(waiter.join().unwrap(), WaitOutcome::Closed);
}
