use std::sync::atomic::{AtomicU64, Ordering};

/// A 64-bit set of single-bit flags shared between threads.
///
/// Every mutation is a single atomic read-modify-write, so independent bits
/// can be set, cleared, and tested from any thread without losing updates.
/// There is no blocking wait; readers poll.
///
/// The meaning of each bit belongs to the owner of the value. Typed masks
/// (e.g. a `bitflags` struct) layer on top by passing their raw bits.
pub struct AtomicFlags {
    bits: AtomicU64,
}

impl AtomicFlags {
    #[must_use]
    pub const fn new(bits: u64) -> Self {
        Self {
            bits: AtomicU64::new(bits),
        }
    }

    /// Sets every bit in `mask`.
    pub fn set(&self, mask: u64) {
        self.bits.fetch_or(mask, Ordering::AcqRel);
    }

    /// Clears every bit in `mask`.
    pub fn clear(&self, mask: u64) {
        self.bits.fetch_and(!mask, Ordering::AcqRel);
    }

    /// Returns true if any bit in `mask` is set.
    #[must_use]
    pub fn contains(&self, mask: u64) -> bool {
        self.bits.load(Ordering::Acquire) & mask != 0
    }

    /// Clears every bit in `mask` and reports whether any of them was set,
    /// as one atomic operation.
    pub fn take(&self, mask: u64) -> bool {
        self.bits.fetch_and(!mask, Ordering::AcqRel) & mask != 0
    }

    /// Clears every bit in `clear` and sets every bit in `set` as one
    /// atomic update. Use this where two plain writes would leave a window
    /// for another thread to observe (or clobber) the intermediate state.
    pub fn replace(&self, clear: u64, set: u64) {
        let _ = self
            .bits
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |bits| {
                Some(bits & !clear | set)
            });
    }

    /// Returns a snapshot of the whole word.
    #[must_use]
    pub fn load(&self) -> u64 {
        self.bits.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{Arc, Barrier};
    use std::thread;

    use super::*;

    #[test]
    fn set_clear_test() {
        let flags = AtomicFlags::new(0);

        flags.set(0b0101);
        assert!(flags.contains(0b0001));
        assert!(flags.contains(0b0100));
        assert!(!flags.contains(0b0010));

        flags.clear(0b0001);
        assert!(!flags.contains(0b0001));
        assert_eq!(flags.load(), 0b0100);
    }

    #[test]
    fn take_clears_and_reports() {
        let flags = AtomicFlags::new(0b10);

        assert!(flags.take(0b10));
        assert!(!flags.take(0b10));
        assert_eq!(flags.load(), 0);
    }

    #[test]
    fn replace_is_one_update() {
        let flags = AtomicFlags::new(0b001);

        flags.replace(0b001, 0b100);
        assert_eq!(flags.load(), 0b100);
    }

    /// Emulates the broken protocol: a shared word updated with a separate
    /// load and store per bit write. Two threads racing on disjoint bits
    /// must eventually clobber each other's updates.
    ///
    /// A genuinely non-atomic word would be undefined behavior in Rust, so
    /// the test models "plain word" as unsynchronized load/store pairs; the
    /// lost-update window is the same.
    #[test]
    fn split_load_store_writes_lose_updates() {
        let mut observed_loss = false;

        for _ in 0..2000 {
            let word = Arc::new(AtomicU64::new(0));
            let barrier = Arc::new(Barrier::new(2));

            let threads: Vec<_> = [0u64, 32]
                .into_iter()
                .map(|base| {
                    let word = Arc::clone(&word);
                    let barrier = Arc::clone(&barrier);
                    thread::spawn(move || {
                        barrier.wait();
                        for bit in base..base + 32 {
                            let bits = word.load(Ordering::Relaxed);
                            word.store(bits | 1 << bit, Ordering::Relaxed);
                        }
                    })
                })
                .collect();

            for thread in threads {
                thread.join().expect("writer thread");
            }

            if word.load(Ordering::Relaxed) != u64::MAX {
                observed_loss = true;
                break;
            }
        }

        assert!(
            observed_loss,
            "split load/store bit writes never lost an update under stress"
        );
    }

    /// The same stress as above against `AtomicFlags`: every round must end
    /// with all 64 bits set.
    #[test]
    fn atomic_writes_lose_nothing() {
        for _ in 0..200 {
            let flags = Arc::new(AtomicFlags::new(0));
            let barrier = Arc::new(Barrier::new(2));

            let threads: Vec<_> = [0u64, 32]
                .into_iter()
                .map(|base| {
                    let flags = Arc::clone(&flags);
                    let barrier = Arc::clone(&barrier);
                    thread::spawn(move || {
                        barrier.wait();
                        for bit in base..base + 32 {
                            flags.set(1 << bit);
                        }
                    })
                })
                .collect();

            for thread in threads {
                thread.join().expect("writer thread");
            }

            assert_eq!(flags.load(), u64::MAX);
        }
    }
}
