use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::app::AppControl;

/// Shared cancellation flag for a [`FrameLoop`].
///
/// Clones observe the same flag; cancelling is permanent.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Tick driver: decides whether another frame runs.
///
/// The loop stops once its token is cancelled, the frame callback returns
/// [`AppControl::Exit`] or the optional frame budget is spent.
#[derive(Debug, Clone)]
pub struct FrameLoop {
    cancel: CancelToken,
    max_frames: Option<u64>,
    frames: u64,
}

impl FrameLoop {
    pub fn new(cancel: CancelToken, max_frames: Option<u64>) -> Self {
        Self {
            cancel,
            max_frames,
            frames: 0,
        }
    }

    pub fn token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Frames run so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn is_running(&self) -> bool {
        !self.cancel.is_cancelled() && self.max_frames.is_none_or(|max| self.frames < max)
    }

    /// Runs one frame if the loop is still running.
    ///
    /// `frame` receives the frame number. Returns `Exit` once no further
    /// frame will run.
    pub fn step(&mut self, frame: impl FnOnce(u64) -> AppControl) -> AppControl {
        if !self.is_running() {
            return AppControl::Exit;
        }

        let control = frame(self.frames);
        self.frames += 1;
        if control == AppControl::Exit {
            self.cancel.cancel();
        }

        if self.is_running() {
            AppControl::Continue
        } else {
            log::debug!("frame loop finished after {} frames", self.frames);
            AppControl::Exit
        }
    }

    /// Steps until the loop stops. Used by headless drivers.
    pub fn run(&mut self, mut frame: impl FnMut(u64) -> AppControl) -> u64 {
        while self.step(&mut frame) == AppControl::Continue {}
        self.frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_budget_limits_the_loop() {
        let mut frame_loop = FrameLoop::new(CancelToken::new(), Some(3));
        let mut seen = Vec::new();
        let frames = frame_loop.run(|i| {
            seen.push(i);
            AppControl::Continue
        });
        assert_eq!(frames, 3);
        assert_eq!(seen, [0, 1, 2]);
        assert!(!frame_loop.is_running());
    }

    #[test]
    fn exit_stops_and_cancels() {
        let mut frame_loop = FrameLoop::new(CancelToken::new(), None);
        let token = frame_loop.token();
        let frames = frame_loop.run(|i| {
            if i == 4 {
                AppControl::Exit
            } else {
                AppControl::Continue
            }
        });
        assert_eq!(frames, 5);
        assert!(token.is_cancelled());
    }

    #[test]
    fn cancelling_a_clone_stops_the_loop() {
        let token = CancelToken::new();
        let mut frame_loop = FrameLoop::new(token.clone(), None);
        let frames = frame_loop.run(|i| {
            if i == 2 {
                token.cancel();
            }
            AppControl::Continue
        });
        assert_eq!(frames, 3);
    }

    #[test]
    fn cancelled_loop_runs_nothing() {
        let token = CancelToken::new();
        token.cancel();
        let mut frame_loop = FrameLoop::new(token, Some(10));
        assert_eq!(frame_loop.step(|_| panic!("must not run")), AppControl::Exit);
        assert_eq!(frame_loop.frames(), 0);
    }
}
