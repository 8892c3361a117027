use std::{
    sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError},
    time::{Duration, Instant},
};

use crossbeam_queue::ArrayQueue;

/// A bounded byte FIFO whose ends may block for a limited time.
pub struct ByteQueue {
    bytes: ArrayQueue<u8>,
    lock: Mutex<()>,
    changed: Condvar,
}

impl ByteQueue {
    /// Creates a queue holding up to `capacity` bytes.
    /// Returns `None` when `capacity` is zero.
    pub fn new(capacity: usize) -> Option<Self> {
        if capacity == 0 {
            return None;
        }
        Some(Self {
            bytes: ArrayQueue::new(capacity),
            lock: Mutex::new(()),
            changed: Condvar::new(),
        })
    }

    pub fn capacity(&self) -> usize {
        self.bytes.capacity()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Appends `byte`, waiting up to `timeout` for room.
    /// Returns `false` if the queue stayed full.
    pub fn send(&self, byte: u8, timeout: Duration) -> bool {
        let sent = self.wait_for(timeout, || self.bytes.push(byte).is_ok());
        if sent {
            self.notify();
        }
        sent
    }

    /// Removes the oldest byte, waiting up to `timeout` for one to arrive.
    pub fn receive(&self, timeout: Duration) -> Option<u8> {
        let mut byte = None;
        if self.wait_for(timeout, || {
            byte = self.bytes.pop();
            byte.is_some()
        }) {
            self.notify();
        }
        byte
    }

    /// Discards every queued byte.
    pub fn reset(&self) {
        while self.bytes.pop().is_some() {}
        self.notify();
    }

    /// Retries `attempt` until it succeeds or `timeout` elapses.
    fn wait_for(&self, timeout: Duration, mut attempt: impl FnMut() -> bool) -> bool {
        if attempt() {
            return true;
        }
        if timeout.is_zero() {
            return false;
        }

        let deadline = Instant::now() + timeout;
        let mut guard = self.guard();
        loop {
            if attempt() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            guard = self
                .changed
                .wait_timeout(guard, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    fn notify(&self) {
        let _guard = self.guard();
        self.changed.notify_all();
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The queue pair connecting a device-pipe descriptor to its driver.
#[derive(Default)]
pub struct Pipe {
    write: Option<Arc<ByteQueue>>,
    read: Option<Arc<ByteQueue>>,
}

impl Pipe {
    /// Creates the queues an opener asked for, each holding `capacity` bytes.
    /// Returns `None` if a requested queue cannot be created.
    pub(crate) fn create(write: bool, read: bool, capacity: usize) -> Option<Self> {
        let queue = |wanted: bool| -> Option<Option<Arc<ByteQueue>>> {
            if wanted {
                ByteQueue::new(capacity).map(|q| Some(Arc::new(q)))
            } else {
                Some(None)
            }
        };
        Some(Self {
            write: queue(write)?,
            read: queue(read)?,
        })
    }

    /// Queue carrying bytes written by the application towards the device.
    pub fn write(&self) -> Option<&Arc<ByteQueue>> {
        self.write.as_ref()
    }

    /// Queue carrying bytes produced by the device towards the application.
    pub fn read(&self) -> Option<&Arc<ByteQueue>> {
        self.read.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.write.is_none() && self.read.is_none()
    }

    /// Drops both queues. Drivers still holding a queue see it drained.
    pub(crate) fn destroy(&mut self) {
        for queue in [self.write.take(), self.read.take()].into_iter().flatten() {
            queue.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn zero_capacity_fails() {
        assert!(ByteQueue::new(0).is_none());
    }

    #[test]
    fn fifo_order() {
        let queue = ByteQueue::new(4).unwrap();
        for b in b"abc" {
            assert!(queue.send(*b, Duration::ZERO));
        }
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.receive(Duration::ZERO), Some(b'a'));
        assert_eq!(queue.receive(Duration::ZERO), Some(b'b'));
        assert_eq!(queue.receive(Duration::ZERO), Some(b'c'));
        assert_eq!(queue.receive(Duration::ZERO), None);
    }

    #[test]
    fn full_queue_times_out() {
        let queue = ByteQueue::new(1).unwrap();
        assert!(queue.send(1, Duration::ZERO));
        let start = Instant::now();
        assert!(!queue.send(2, Duration::from_millis(20)));
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn receive_wakes_on_send() {
        let queue = Arc::new(ByteQueue::new(1).unwrap());
        let sender = {
            let queue = queue.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                queue.send(7, Duration::ZERO)
            })
        };
        assert_eq!(queue.receive(Duration::from_secs(5)), Some(7));
        assert!(sender.join().unwrap());
    }

    #[test]
    fn reset_discards() {
        let queue = ByteQueue::new(2).unwrap();
        queue.send(1, Duration::ZERO);
        queue.send(2, Duration::ZERO);
        queue.reset();
        assert!(queue.is_empty());
    }

    #[test]
    fn pipe_creates_requested_queues() {
        let pipe = Pipe::create(true, false, 4).unwrap();
        assert!(pipe.write().is_some());
        assert!(pipe.read().is_none());
        assert_eq!(pipe.write().unwrap().capacity(), 4);
    }

    #[test]
    fn pipe_fails_on_zero_capacity() {
        assert!(Pipe::create(false, true, 0).is_none());
        assert!(Pipe::create(false, false, 0).unwrap().is_empty());
    }
}
