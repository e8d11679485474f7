//! Shared access to a display plus the animation worker
//!
//! The panel sits behind one lock. An animation owns it between frames only,
//! every foreground call stops and joins the worker before touching the bus.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::error::Result;
use crate::frame::GreyscaleFrame;
use crate::traits::{DisplayMode, RefreshController};

/// Mode the animation frames are shown in
const ANIMATION_MODE: DisplayMode = DisplayMode::OneBit { dither: false };

struct Animation {
    stop: Arc<AtomicBool>,
    worker: JoinHandle<()>,
}

impl Animation {
    /// Raises the stop flag, wakes the worker and joins it
    fn stop(self) {
        self.stop.store(true, Ordering::Release);
        self.worker.thread().unpark();
        if self.worker.join().is_err() {
            log::error!("animation worker panicked");
        }
    }
}

/// A [`RefreshController`] that can run an animation in the background
pub struct SharedDisplay<D> {
    display: Arc<Mutex<D>>,
    frame_interval: Duration,
    animation: Option<Animation>,
}

fn lock<D>(display: &Mutex<D>) -> MutexGuard<'_, D> {
    // a worker that panicked mid-frame left the panel in a settled state, the
    // next cycle starts with an init anyway
    display.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<D> SharedDisplay<D>
where
    D: RefreshController + Send + 'static,
{
    pub fn new(display: D, config: &Config) -> Self {
        SharedDisplay {
            display: Arc::new(Mutex::new(display)),
            frame_interval: config.frame_interval,
            animation: None,
        }
    }

    /// See [`RefreshController::update`]
    pub fn update(&mut self, frame: &GreyscaleFrame, mode: DisplayMode) -> Result<()> {
        self.with_display(|display| display.update(frame, mode))
    }

    /// See [`RefreshController::clear`]
    pub fn clear(&mut self, power_off: bool) -> Result<()> {
        self.with_display(|display| display.clear(power_off))
    }

    /// See [`RefreshController::reflush`]
    pub fn reflush(&mut self) -> Result<()> {
        self.with_display(|display| display.reflush())
    }

    /// Copy of the last shown frame
    pub fn last_frame(&self) -> Option<(GreyscaleFrame, DisplayMode)> {
        lock(&self.display)
            .last_frame()
            .map(|(frame, mode)| (frame.clone(), mode))
    }

    /// Runs `f` on the display once no animation is running
    pub fn with_display<R>(&mut self, f: impl FnOnce(&mut D) -> R) -> R {
        self.stop_animation();
        f(&mut lock(&self.display))
    }

    /// Loops over `frames`, each pasted centred onto `background`
    ///
    /// Frames are shown in 1-bit mode without dithering, one per frame
    /// interval, until [`stop_animation`](SharedDisplay::stop_animation) or
    /// any foreground call. A running animation is replaced.
    pub fn start_animation(&mut self, background: GreyscaleFrame, frames: Vec<GreyscaleFrame>) {
        self.stop_animation();
        if frames.is_empty() {
            log::warn!("animation without frames, not starting");
            return;
        }

        log::info!(
            "starting animation, {} frames every {:?}",
            frames.len(),
            self.frame_interval
        );
        let stop = Arc::new(AtomicBool::new(false));
        let worker = {
            let display = Arc::clone(&self.display);
            let stop = Arc::clone(&stop);
            let interval = self.frame_interval;
            thread::spawn(move || animate(&display, &stop, &background, &frames, interval))
        };
        self.animation = Some(Animation { stop, worker });
    }

    /// Loads the frames from `dir` and starts the animation
    #[cfg(feature = "image")]
    pub fn start_animation_from_dir(
        &mut self,
        background: GreyscaleFrame,
        dir: impl AsRef<std::path::Path>,
    ) -> Result<()> {
        let frames = crate::frame::load_frame_dir(dir)?;
        self.start_animation(background, frames);
        Ok(())
    }

    /// Signals the worker and waits for the frame in flight to finish
    ///
    /// Returns whether an animation was running.
    pub fn stop_animation(&mut self) -> bool {
        let Some(animation) = self.animation.take() else {
            return false;
        };
        animation.stop();
        log::debug!("animation stopped");
        true
    }

    /// Whether the worker is still showing frames
    pub fn is_animating(&self) -> bool {
        self.animation
            .as_ref()
            .is_some_and(|animation| !animation.worker.is_finished())
    }
}

impl<D> Drop for SharedDisplay<D> {
    fn drop(&mut self) {
        if let Some(animation) = self.animation.take() {
            animation.stop();
        }
    }
}

fn animate<D: RefreshController>(
    display: &Mutex<D>,
    stop: &AtomicBool,
    background: &GreyscaleFrame,
    frames: &[GreyscaleFrame],
    interval: Duration,
) {
    for overlay in frames.iter().cycle() {
        if stop.load(Ordering::Acquire) {
            return;
        }
        let frame = background.composed_with(overlay);
        if let Err(error) = lock(display).update(&frame, ANIMATION_MODE) {
            log::error!("animation stopped: {}", error);
            return;
        }

        let deadline = Instant::now() + interval;
        loop {
            let now = Instant::now();
            if now >= deadline || stop.load(Ordering::Acquire) {
                break;
            }
            thread::park_timeout(deadline - now);
        }
    }
}
