//! Window events and the sources that produce them.

mod queue;

pub use queue::{channel, EventInjector, EventQueue};

/// Symbolic name for a key on the keyboard.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    Key0,
    Key1,
    Key2,
    Key3,
    Key4,
    Key5,
    Key6,
    Key7,
    Key8,
    Key9,

    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    I,
    J,
    K,
    L,
    M,
    N,
    O,
    P,
    Q,
    R,
    S,
    T,
    U,
    V,
    W,
    X,
    Y,
    Z,

    Escape,
    Space,
    Enter,
    Backspace,
    Tab,
}

/// A window event.
///
/// Sources report "nothing pending" as `Option::None` rather than a
/// variant, so consumers match on exactly the events that exist.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    /// The user asked the window to close.
    Quit,
    KeyDown(Key),
    KeyUp(Key),
}

/// A non-blocking stream of window events.
///
/// The harness's input thread drains a source in a polling loop; an
/// implementation must return immediately whether or not an event is
/// pending.
pub trait EventSource {
    /// Returns the next pending event, or `None` when there is nothing to
    /// report right now. Must not block.
    fn poll_event(&mut self) -> Option<Event>;
}
