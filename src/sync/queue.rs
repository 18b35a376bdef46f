//! Fixed-capacity message queue
//!
//! A ring buffer of `*mut ()` message pointers (the kernel never owns
//! message storage; callers pass pointers to `'static` buffers or pool
//! blocks). `send` never blocks — a full queue returns
//! [`KernelError::QFull`] immediately, matching the non-blocking producer
//! contract real-time producers usually want. `receive` blocks while the
//! queue is empty.

use core::cell::UnsafeCell;

use crate::critical::{critical_section, is_isr_context};
use crate::error::{KernelError, KernelResult};
use crate::kernel;
use crate::list::TcbList;
use crate::types::TaskState;

struct QueueInner<const N: usize> {
    buf: [*mut (); N],
    head: usize,
    count: usize,
    waiters: TcbList,
}

/// A fixed-capacity FIFO queue of message pointers, usable as a `'static`.
pub struct Queue<const N: usize> {
    inner: UnsafeCell<QueueInner<N>>,
}

unsafe impl<const N: usize> Sync for Queue<N> {}
unsafe impl<const N: usize> Send for Queue<N> {}

impl<const N: usize> Queue<N> {
    pub const fn new() -> Self {
        Queue {
            inner: UnsafeCell::new(QueueInner {
                buf: [core::ptr::null_mut(); N],
                head: 0,
                count: 0,
                waiters: TcbList::new(),
            }),
        }
    }

    /// (Re)initialize to empty, clearing any waiters. Not safe to call
    /// while tasks are already blocked on this queue.
    pub fn init(&self) -> KernelResult<()> {
        if is_isr_context() {
            return Err(KernelError::Isr);
        }
        critical_section(|_cs| {
            let inner = unsafe { &mut *self.inner.get() };
            inner.head = 0;
            inner.count = 0;
            inner.waiters.init();
            Ok(())
        })
    }

    /// Enqueue `msg`. Never blocks; returns `QFull` if the ring buffer has
    /// no free slot.
    pub fn send(&self, msg: *mut ()) -> KernelResult<()> {
        critical_section(|_cs| {
            let inner = unsafe { &mut *self.inner.get() };
            if inner.count == N {
                return Err(KernelError::QFull);
            }

            let tail = (inner.head + inner.count) % N;
            inner.buf[tail] = msg;
            inner.count += 1;

            if let Some(waiter) = inner.waiters.pop_head() {
                unsafe {
                    (*waiter.as_ptr()).state = TaskState::Ready;
                    kernel::ready_set_insert(waiter);
                }
                if !is_isr_context() {
                    crate::sched::request_switch();
                }
            }

            Ok(())
        })
    }

    /// ISR-safe send. Identical to [`Queue::send`] but never requests a
    /// switch itself; returns whether a task was woken.
    pub fn send_from_isr(&self, msg: *mut ()) -> KernelResult<bool> {
        critical_section(|_cs| {
            let inner = unsafe { &mut *self.inner.get() };
            if inner.count == N {
                return Err(KernelError::QFull);
            }

            let tail = (inner.head + inner.count) % N;
            inner.buf[tail] = msg;
            inner.count += 1;

            if let Some(waiter) = inner.waiters.pop_head() {
                unsafe {
                    (*waiter.as_ptr()).state = TaskState::Ready;
                    kernel::ready_set_insert(waiter);
                }
                return Ok(true);
            }

            Ok(false)
        })
    }

    /// Dequeue a message, blocking the caller while the queue is empty.
    pub fn receive(&self) -> KernelResult<*mut ()> {
        if is_isr_context() {
            return Err(KernelError::Isr);
        }

        critical_section(|_cs| {
            let inner = unsafe { &mut *self.inner.get() };

            while inner.count == 0 {
                let cur = unsafe { kernel::tcb_cur() }.ok_or(KernelError::Param)?;
                unsafe {
                    kernel::ready_set_remove(cur);
                    (*cur.as_ptr()).state = TaskState::Blocked;
                    inner.waiters.insert_tail(cur);
                }
                crate::sched::request_switch();
            }

            let msg = inner.buf[inner.head];
            inner.head = (inner.head + 1) % N;
            inner.count -= 1;
            Ok(msg)
        })
    }

    /// Non-blocking dequeue, for use from ISR context (or anywhere a
    /// caller wants to poll rather than block). Returns
    /// [`KernelError::Resource`] if the queue is empty.
    pub fn receive_from_isr(&self) -> KernelResult<*mut ()> {
        critical_section(|_cs| {
            let inner = unsafe { &mut *self.inner.get() };
            if inner.count == 0 {
                return Err(KernelError::Resource);
            }
            let msg = inner.buf[inner.head];
            inner.head = (inner.head + 1) % N;
            inner.count -= 1;
            Ok(msg)
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        unsafe { (*self.inner.get()).count }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<const N: usize> Default for Queue<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_then_receive_from_isr_preserves_fifo_order() {
        let q: Queue<4> = Queue::new();
        let a = 1usize as *mut ();
        let b = 2usize as *mut ();
        q.send(a).unwrap();
        q.send(b).unwrap();
        assert_eq!(q.receive_from_isr().unwrap(), a);
        assert_eq!(q.receive_from_isr().unwrap(), b);
    }

    #[test]
    fn send_to_full_queue_is_rejected() {
        let q: Queue<2> = Queue::new();
        q.send(1usize as *mut ()).unwrap();
        q.send(2usize as *mut ()).unwrap();
        assert_eq!(q.send(3usize as *mut ()), Err(KernelError::QFull));
    }

    #[test]
    fn receive_from_isr_on_empty_queue_is_resource_error() {
        let q: Queue<2> = Queue::new();
        assert_eq!(q.receive_from_isr(), Err(KernelError::Resource));
    }
}
