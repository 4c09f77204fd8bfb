// SPDX-License-Identifier: GPL-3.0-only

//! Render thread
//!
//! Owns the GPU device, the offscreen surface and the renderer. Sleeps on
//! the session's redraw signal and draws once per wake-up.

use super::renderer::PreviewRenderer;
use crate::backends::camera::SensorRotation;
use crate::config::Config;
use crate::constants::timing::RENDER_WAIT_TIMEOUT;
use crate::errors::RenderError;
use crate::gpu::{self, GpuDeviceInfo, PreviewSurface};
use crate::preview::{FpsCounter, SessionHandle, WaitOutcome};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use std::thread::JoinHandle;
use tracing::{debug, error, info, warn};

const RENDER_THREAD_NAME: &str = "edgecam-render";

/// Settings the render thread starts with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub back_rotation: SensorRotation,
    pub front_rotation: SensorRotation,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl RenderOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            viewport_width: config.viewport_width,
            viewport_height: config.viewport_height,
            back_rotation: config.back_rotation,
            front_rotation: config.front_rotation,
        }
    }
}

/// State shared between the host and its thread
#[derive(Debug, Default)]
struct HostControl {
    shutdown: AtomicBool,
    pending_resize: Mutex<Option<(u32, u32)>>,
}

impl HostControl {
    fn take_resize(&self) -> Option<(u32, u32)> {
        self.pending_resize
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }
}

/// Handle to a running render thread
#[derive(Debug)]
pub struct RenderHost {
    session: SessionHandle,
    control: Arc<HostControl>,
    info: GpuDeviceInfo,
    thread: Option<JoinHandle<()>>,
}

impl RenderHost {
    /// Start the render thread and wait until it can draw
    ///
    /// Device or program creation failures are returned here and the
    /// thread is gone by the time this returns.
    pub fn spawn(session: SessionHandle, options: RenderOptions) -> Result<Self, RenderError> {
        let control = Arc::new(HostControl::default());
        let (ready_tx, ready_rx) = mpsc::channel();

        let thread = {
            let session = session.clone();
            let control = Arc::clone(&control);
            std::thread::Builder::new()
                .name(RENDER_THREAD_NAME.into())
                .spawn(move || render_thread(session, control, options, ready_tx))
                .map_err(|e| RenderError::HostFailed(format!("Failed to spawn render thread: {}", e)))?
        };

        let startup = ready_rx
            .recv()
            .unwrap_or_else(|_| Err(RenderError::HostFailed("Render thread exited during startup".into())));

        match startup {
            Ok(info) => {
                info!(adapter = %info.adapter_name, backend = ?info.backend, "Render thread running");
                Ok(Self {
                    session,
                    control,
                    info,
                    thread: Some(thread),
                })
            }
            Err(e) => {
                let _ = thread.join();
                Err(e)
            }
        }
    }

    pub fn device_info(&self) -> &GpuDeviceInfo {
        &self.info
    }

    /// Resize the drawable; applied before the next draw
    pub fn resize(&self, width: u32, height: u32) {
        *self
            .control
            .pending_resize
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some((width, height));
        self.session.request_render();
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|thread| !thread.is_finished())
    }

    /// Stop the render thread and wait for it to release the GPU
    pub fn shutdown(mut self) {
        self.stop_thread();
    }

    fn stop_thread(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        self.control.shutdown.store(true, Ordering::Release);
        // Wake the thread if it is sleeping on the signal
        self.session.request_render();
        if thread.join().is_err() {
            error!("Render thread panicked");
        }
    }
}

impl Drop for RenderHost {
    fn drop(&mut self) {
        self.stop_thread();
    }
}

fn render_thread(
    session: SessionHandle,
    control: Arc<HostControl>,
    options: RenderOptions,
    ready: mpsc::Sender<Result<GpuDeviceInfo, RenderError>>,
) {
    let context = match gpu::create_headless_device_blocking("edgecam preview device") {
        Ok(context) => context,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };

    let mut surface = PreviewSurface::new(
        &context.device,
        options.viewport_width,
        options.viewport_height,
    );
    let mut renderer = PreviewRenderer::new(session.clone(), options.back_rotation, options.front_rotation);

    if let Err(e) = renderer.on_surface_created(&context.device, &context.queue, surface.format()) {
        let _ = ready.send(Err(e));
        return;
    }
    renderer.on_surface_changed(options.viewport_width, options.viewport_height);

    if ready.send(Ok(context.info.clone())).is_err() {
        return;
    }

    let mut fps = FpsCounter::new();
    loop {
        match session.signal().wait_timeout(RENDER_WAIT_TIMEOUT) {
            WaitOutcome::Closed => break,
            WaitOutcome::TimedOut => {
                if control.shutdown.load(Ordering::Acquire) {
                    break;
                }
                continue;
            }
            WaitOutcome::Redraw => {}
        }
        if control.shutdown.load(Ordering::Acquire) {
            break;
        }

        if let Some((width, height)) = control.take_resize() {
            surface.resize(&context.device, width, height);
            renderer.on_surface_changed(width, height);
        }

        match renderer.on_draw_frame(&context.device, &context.queue, &surface) {
            Ok(outcome) => {
                if outcome.uploaded
                    && let Some(rate) = fps.tick()
                {
                    debug!(fps = rate, "Preview draw rate");
                }
            }
            Err(e) => {
                warn!(error = %e, "Draw failed");
            }
        }
    }

    renderer.on_surface_destroyed();
    info!("Render thread stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_follow_config() {
        let config = Config {
            viewport_width: 320,
            viewport_height: 240,
            front_rotation: SensorRotation::Rotate270,
            ..Config::default()
        };
        let options = RenderOptions::from_config(&config);
        assert_eq!((options.viewport_width, options.viewport_height), (320, 240));
        assert_eq!(options.back_rotation, SensorRotation::None);
        assert_eq!(options.front_rotation, SensorRotation::Rotate270);
    }

    #[test]
    fn test_spawn_and_shutdown() {
        let session = SessionHandle::default();
        match RenderHost::spawn(session.clone(), RenderOptions::default()) {
            Ok(host) => {
                assert!(host.is_running());
                host.resize(32, 16);
                host.shutdown();
            }
            Err(e) => println!("Skipping test (no GPU): {}", e),
        }
    }
}
