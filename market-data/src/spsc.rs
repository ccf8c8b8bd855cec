//! Wait-free bounded single-producer/single-consumer queue.
//!
//! A fixed-capacity ring buffer split into a [`Producer`] and a [`Consumer`]
//! handle, each usable from exactly one thread. `push` and `pop` never block
//! and never allocate; a full queue hands the item back to the producer,
//! which owns the drop-vs-retry policy. Additional threads may observe the
//! approximate occupancy through a [`QueueObserver`].
//!
//! One slot is reserved to distinguish full from empty, so a queue built
//! with size `N` holds at most `N - 1` elements.

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam_utils::CachePadded;

/// Shared ring buffer state.
///
/// `head` is written by the producer, `tail` by the consumer; both are
/// monotonically increasing and masked into the buffer on access. The
/// indices live on separate cache lines so the two sides do not false-share.
pub struct SpscQueue<T> {
    head: CachePadded<AtomicUsize>,
    tail: CachePadded<AtomicUsize>,
    buffer: Box<[UnsafeCell<MaybeUninit<T>>]>,
    mask: usize,
}

// The queue hands `T` across threads by value; slots are only touched by
// the side that owns them under the head/tail protocol.
unsafe impl<T: Send> Send for SpscQueue<T> {}
unsafe impl<T: Send> Sync for SpscQueue<T> {}

impl<T> SpscQueue<T> {
    /// Creates a queue with the given power-of-two size (`>= 2`) and splits
    /// it into its producer and consumer handles.
    ///
    /// # Panics
    ///
    /// Panics if `size` is not a power of two or is smaller than 2.
    pub fn with_capacity(size: usize) -> (Producer<T>, Consumer<T>) {
        assert!(size >= 2, "queue size must be at least 2");
        assert!(size.is_power_of_two(), "queue size must be a power of two");

        let buffer = (0..size)
            .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        let queue = Arc::new(SpscQueue {
            head: CachePadded::new(AtomicUsize::new(0)),
            tail: CachePadded::new(AtomicUsize::new(0)),
            buffer,
            mask: size - 1,
        });

        (
            Producer {
                queue: Arc::clone(&queue),
            },
            Consumer { queue },
        )
    }

    /// Usable capacity: one slot is reserved.
    #[inline]
    fn capacity(&self) -> usize {
        self.mask
    }

    /// Approximate number of buffered elements.
    #[inline]
    fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        head.wrapping_sub(tail) & self.mask
    }

    #[inline]
    fn is_empty(&self) -> bool {
        self.head.load(Ordering::Acquire) == self.tail.load(Ordering::Acquire)
    }

    #[inline]
    fn fill_ratio(&self) -> f64 {
        self.len() as f64 / self.capacity() as f64
    }
}

impl<T> Drop for SpscQueue<T> {
    fn drop(&mut self) {
        // Both handles are gone; drop whatever is still buffered.
        let head = self.head.load(Ordering::Relaxed);
        let mut tail = self.tail.load(Ordering::Relaxed);
        while tail & self.mask != head & self.mask {
            unsafe {
                (*self.buffer[tail & self.mask].get()).assume_init_drop();
            }
            tail = tail.wrapping_add(1);
        }
    }
}

/// Producer side of the queue. Owned by exactly one thread.
pub struct Producer<T> {
    queue: Arc<SpscQueue<T>>,
}

impl<T> Producer<T> {
    /// Appends an item if the queue is not full.
    ///
    /// Returns the item back via `Err` when full; the caller decides whether
    /// to drop it or retry. Wait-free: a single load/store pair per side.
    #[inline]
    pub fn push(&mut self, item: T) -> Result<(), T> {
        let queue = &*self.queue;
        let head = queue.head.load(Ordering::Relaxed);
        let tail = queue.tail.load(Ordering::Acquire);
        let next = head.wrapping_add(1);

        if next & queue.mask == tail & queue.mask {
            return Err(item);
        }

        unsafe {
            (*queue.buffer[head & queue.mask].get()).write(item);
        }
        // Publish the slot write before the new head becomes visible.
        queue.head.store(next, Ordering::Release);
        Ok(())
    }

    /// Approximate number of buffered elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }

    /// Approximate occupancy in `[0, 1]`.
    #[inline]
    pub fn fill_ratio(&self) -> f64 {
        self.queue.fill_ratio()
    }

    /// Creates a shareable observer over the queue's occupancy.
    pub fn observer(&self) -> QueueObserver<T> {
        QueueObserver {
            queue: Arc::clone(&self.queue),
        }
    }
}

/// Consumer side of the queue. Owned by exactly one thread.
pub struct Consumer<T> {
    queue: Arc<SpscQueue<T>>,
}

impl<T> Consumer<T> {
    /// Removes and returns the oldest element, or `None` when empty.
    #[inline]
    pub fn pop(&mut self) -> Option<T> {
        let queue = &*self.queue;
        let tail = queue.tail.load(Ordering::Relaxed);
        let head = queue.head.load(Ordering::Acquire);

        if tail & queue.mask == head & queue.mask {
            return None;
        }

        let item = unsafe { (*queue.buffer[tail & queue.mask].get()).assume_init_read() };
        // Release the slot for reuse by the producer.
        queue.tail.store(tail.wrapping_add(1), Ordering::Release);
        Some(item)
    }

    /// Approximate number of buffered elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }

    #[inline]
    pub fn fill_ratio(&self) -> f64 {
        self.queue.fill_ratio()
    }

    /// Creates a shareable observer over the queue's occupancy.
    pub fn observer(&self) -> QueueObserver<T> {
        QueueObserver {
            queue: Arc::clone(&self.queue),
        }
    }
}

/// Read-only occupancy view, safe to clone into observer threads.
///
/// All readings are approximate snapshots; the producer and consumer may be
/// concurrently moving the indices.
pub struct QueueObserver<T> {
    queue: Arc<SpscQueue<T>>,
}

impl<T> Clone for QueueObserver<T> {
    fn clone(&self) -> Self {
        Self {
            queue: Arc::clone(&self.queue),
        }
    }
}

impl<T> QueueObserver<T> {
    #[inline]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }

    #[inline]
    pub fn fill_ratio(&self) -> f64 {
        self.queue.fill_ratio()
    }
}
