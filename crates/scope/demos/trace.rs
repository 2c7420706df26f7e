//! Oscilloscope-style demo on the headless backend.
//!
//! A producer thread streams a sine wave through a ring buffer and plots
//! the current window into the shared frame; the render loop presents each
//! dirty frame at 60 fps. After a few seconds the producer injects a quit
//! event and the harness winds down.
//!
//! Run with `cargo run --example trace`.

use std::num::NonZeroU32;
use std::thread;
use std::time::Duration;

use graphics::headless::HeadlessProvider;
use graphics::Color;
use scope::{Config, Coordinator};
use shell::{channel, Event};
use structures::{OverwritePolicy, RingBuffer};

fn main() {
    tracing_subscriber::fmt().init();

    let config = Config {
        title: "trace demo".to_string(),
        target_fps: NonZeroU32::new(60),
        ..Config::default()
    };
    let extent = config.extent;

    let mut coordinator =
        Coordinator::new(HeadlessProvider::new(), config).expect("headless startup");

    let (injector, events) = channel();
    coordinator.spawn_input(events);

    let writer = coordinator.frame_writer();
    let producer = thread::spawn(move || {
        let mut trace = RingBuffer::new(extent.width as usize);
        trace.set_policy(OverwritePolicy::OVERWRITE_OLDEST);

        for step in 0..240 {
            let phase = step as f32 * 0.05;
            let _ = trace.push_back(phase.sin());

            writer.draw(|frame| {
                frame.fill(Color::BLACK);
                let mid = frame.height() as f32 / 2.0;
                for x in 0..trace.len() {
                    if let Some(sample) = trace.get(x) {
                        let y = (mid - *sample * mid * 0.8) as u32;
                        frame.set(x as u32, y.min(frame.height() - 1), Color::GREEN);
                    }
                }
            });

            thread::sleep(Duration::from_millis(5));
        }

        injector.push(Event::Quit);
    });

    coordinator.run();
    producer.join().expect("producer thread");

    let provider = coordinator.shutdown();
    println!(
        "presented {} frames; {} backend handles left live",
        provider.presents(),
        provider.live_handles()
    );
}
