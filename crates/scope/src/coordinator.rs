use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use bitflags::bitflags;
use graphics::{Frame, Provider, StackError, SurfaceStack};
use parking_lot::Mutex;
use shell::{Event, EventSource, Key};
use structures::AtomicFlags;
use tracing::{debug, error};

use crate::Config;

bitflags! {
    /// Lifecycle bits of the harness. The bits are mutually exclusive in
    /// intent; every transition is a single atomic update, so no reader
    /// ever observes two of them set.
    pub struct Status: u64 {
        /// The coordinator is building its presentation stack.
        const STARTUP = 1 << 0;
        /// Both loops should keep going.
        const RUNNING = 1 << 1;
        /// A terminate event was seen; both loops wind down.
        const STOPPED = 1 << 2;
    }
}

bitflags! {
    /// Screen bits.
    pub struct Screen: u64 {
        /// The frame holds pixels that have not been presented yet. Set by
        /// producers after a write, cleared by the render loop before it
        /// uploads.
        const BUFFER_FLUSH = 1 << 0;
    }
}

/// How long the input thread sleeps when its source runs dry.
const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// State shared between the render loop, the input thread, and every
/// producer: the flag words and the frame behind its lock.
///
/// The frame mutex covers producer writes *and* the render loop's
/// upload-and-present, so a frame can neither tear mid-write nor change
/// under an upload.
struct Shared {
    status: AtomicFlags,
    screen: AtomicFlags,
    frame: Mutex<Frame>,
}

impl Shared {
    fn is_running(&self) -> bool {
        self.status.contains(Status::RUNNING.bits())
    }

    /// Clears RUNNING and sets STOPPED as one atomic update. Called from
    /// whichever thread observes a terminate condition first; racing
    /// callers collapse to the same result.
    fn request_stop(&self) {
        self.status
            .replace(Status::RUNNING.bits(), Status::STOPPED.bits());
    }
}

/// Handle for producer threads.
///
/// Cloneable and sendable; each clone writes pixels under the frame lock
/// and marks the screen dirty so the render loop picks the write up on its
/// next cycle.
#[derive(Clone)]
pub struct FrameWriter {
    shared: Arc<Shared>,
}

impl FrameWriter {
    /// Runs `draw` with exclusive access to the frame, then sets the
    /// dirty bit. Keep the closure short; the render loop shares this
    /// lock.
    pub fn draw<R>(&self, draw: impl FnOnce(&mut Frame) -> R) -> R {
        let result = {
            let mut frame = self.shared.frame.lock();
            draw(&mut frame)
        };
        self.shared.screen.set(Screen::BUFFER_FLUSH.bits());
        result
    }

    /// True while the harness runs. Producers should stop writing once
    /// this turns false.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shared.is_running()
    }

    /// Snapshot of the lifecycle bits.
    #[must_use]
    pub fn status(&self) -> Status {
        Status::from_bits_truncate(self.shared.status.load())
    }

    /// Asks both loops to wind down, as if a quit event had arrived.
    pub fn request_stop(&self) {
        self.shared.request_stop();
    }
}

/// Owns the presentation stack and runs the consumer side of the harness.
///
/// Lifecycle: [`new`](Coordinator::new) builds the stack (STARTUP, then
/// RUNNING), [`spawn_input`](Coordinator::spawn_input) starts the producer
/// thread, [`run`](Coordinator::run) loops on the calling thread until a
/// terminate event clears RUNNING, and [`shutdown`](Coordinator::shutdown)
/// joins the input thread and then tears the stack down, so the stack is
/// never destroyed while either loop could still touch it.
pub struct Coordinator<P: Provider> {
    provider: P,
    stack: SurfaceStack<P>,
    shared: Arc<Shared>,
    cadence: Duration,
    quit_key: Key,
    input: Option<JoinHandle<()>>,
}

impl<P: Provider> Coordinator<P> {
    /// Builds the presentation stack and seeds the first frame.
    ///
    /// On failure the stack's rollback has already run; the provider comes
    /// back out through the error path untouched by leaks.
    pub fn new(mut provider: P, config: Config) -> Result<Self, StackError> {
        let shared = Arc::new(Shared {
            status: AtomicFlags::new(Status::STARTUP.bits()),
            screen: AtomicFlags::new(0),
            frame: Mutex::new(Frame::new(config.extent)),
        });

        debug!(title = %config.title, "coordinator starting");
        let stack = SurfaceStack::create(&mut provider, &config.surface_desc())?;

        // Present the freshly cleared frame on the first cycle, before any
        // producer has written.
        shared.screen.set(Screen::BUFFER_FLUSH.bits());
        shared
            .status
            .replace(Status::STARTUP.bits(), Status::RUNNING.bits());

        Ok(Self {
            provider,
            stack,
            shared,
            cadence: config.cadence(),
            quit_key: config.quit_key,
            input: None,
        })
    }

    /// Snapshot of the lifecycle bits.
    #[must_use]
    pub fn status(&self) -> Status {
        Status::from_bits_truncate(self.shared.status.load())
    }

    /// A new producer handle.
    #[must_use]
    pub fn frame_writer(&self) -> FrameWriter {
        FrameWriter {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Starts the input thread over the given event source.
    pub fn spawn_input<E>(&mut self, source: E)
    where
        E: EventSource + Send + 'static,
    {
        self.spawn_input_with(source, |_| {});
    }

    /// Starts the input thread with a handler for the key events the
    /// harness itself does not consume. The handler runs on the input
    /// thread; dispatch only, no semantics.
    pub fn spawn_input_with<E, F>(&mut self, source: E, handler: F)
    where
        E: EventSource + Send + 'static,
        F: FnMut(&Event) + Send + 'static,
    {
        let shared = Arc::clone(&self.shared);
        let quit_key = self.quit_key;
        self.input = Some(thread::spawn(move || {
            input_loop(&shared, source, quit_key, handler);
        }));
    }

    /// Runs the render loop on the calling thread until RUNNING clears.
    ///
    /// Each cycle takes the dirty bit; if it was set, the frame is
    /// uploaded and presented under the frame lock. Then the loop sleeps
    /// its cadence, so it exits within one interval of a stop request.
    pub fn run(&mut self) {
        debug!("render loop running");
        while self.shared.is_running() {
            if self.shared.screen.take(Screen::BUFFER_FLUSH.bits()) {
                self.present_frame();
            }
            thread::sleep(self.cadence);
        }
        debug!("render loop exiting");
    }

    fn present_frame(&mut self) {
        let (Some(renderer), Some(texture)) = (self.stack.renderer(), self.stack.texture())
        else {
            debug!("presentation stack incomplete; skipping frame");
            return;
        };

        // One lock across upload and present: producers cannot slip a
        // half-written frame underneath the upload.
        let frame = self.shared.frame.lock();
        let presented = self
            .provider
            .upload_pixels(texture, frame.pixels(), frame.stride_bytes())
            .and_then(|()| self.provider.present(renderer));

        if let Err(refusal) = presented {
            error!(diagnostic = %refusal, "presentation failed; frame skipped");
        }
    }

    /// Joins the input thread, tears down the presentation stack, and
    /// returns the provider so the caller can reclaim or inspect it.
    ///
    /// Also usable without [`run`](Coordinator::run) ever having looped:
    /// the stop request makes the input thread exit on its next poll.
    pub fn shutdown(mut self) -> P {
        self.shared.request_stop();

        if let Some(input) = self.input.take() {
            if input.join().is_err() {
                error!("input thread panicked");
            }
        }

        self.stack.destroy(&mut self.provider);
        debug!("coordinator stopped");
        self.provider
    }
}

/// The producer loop: drain the source, dispatch, sleep briefly, repeat
/// while RUNNING. A terminate condition (a quit event or the configured
/// key) flips the status word in one atomic update; the render loop
/// observes it on its next cycle, this loop on its next outer iteration.
fn input_loop<E, F>(shared: &Shared, mut source: E, quit_key: Key, mut handler: F)
where
    E: EventSource,
    F: FnMut(&Event),
{
    debug!("input thread running");
    while shared.is_running() {
        while let Some(event) = source.poll_event() {
            match event {
                Event::Quit => {
                    debug!("quit event");
                    shared.request_stop();
                }
                Event::KeyDown(key) if key == quit_key => {
                    debug!(?key, "terminate key pressed");
                    shared.request_stop();
                }
                other => handler(&other),
            }
        }
        thread::sleep(POLL_INTERVAL);
    }
    debug!("input thread exiting");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare_shared() -> Shared {
        Shared {
            status: AtomicFlags::new(Status::RUNNING.bits()),
            screen: AtomicFlags::new(0),
            frame: Mutex::new(Frame::new(geometry::Extent::new(2, 2))),
        }
    }

    #[test]
    fn stop_request_swaps_running_for_stopped() {
        let shared = bare_shared();
        assert!(shared.is_running());

        shared.request_stop();
        let status = Status::from_bits_truncate(shared.status.load());
        assert_eq!(status, Status::STOPPED);

        // A second request changes nothing.
        shared.request_stop();
        assert_eq!(Status::from_bits_truncate(shared.status.load()), Status::STOPPED);
    }

    #[test]
    fn writer_marks_the_screen_dirty() {
        let writer = FrameWriter {
            shared: Arc::new(bare_shared()),
        };

        assert!(!writer.shared.screen.contains(Screen::BUFFER_FLUSH.bits()));
        writer.draw(|frame| frame.fill(graphics::Color::BLUE));
        assert!(writer.shared.screen.contains(Screen::BUFFER_FLUSH.bits()));
    }
}
