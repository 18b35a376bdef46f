//! Fixed-block memory pool
//!
//! A pool of same-sized blocks carved out of a caller-supplied `'static`
//! region. Free blocks are threaded into an intrusive singly-linked free
//! list: the first word of a free block stores the pointer to the next
//! free block, so the free list costs no extra storage beyond the pool
//! itself.

use core::cell::UnsafeCell;

use crate::critical::{critical_section, is_isr_context};
use crate::error::{KernelError, KernelResult};
use crate::kernel;
use crate::list::TcbList;
use crate::types::TaskState;

struct PoolInner {
    base: usize,
    block_size: usize,
    num_blocks: usize,
    free_head: *mut u8,
    free_count: usize,
    waiters: TcbList,
}

/// A fixed-block memory pool, usable as a `'static`.
pub struct MemPool {
    inner: UnsafeCell<PoolInner>,
}

unsafe impl Sync for MemPool {}
unsafe impl Send for MemPool {}

impl MemPool {
    pub const fn new() -> Self {
        MemPool {
            inner: UnsafeCell::new(PoolInner {
                base: 0,
                block_size: 0,
                num_blocks: 0,
                free_head: core::ptr::null_mut(),
                free_count: 0,
                waiters: TcbList::new(),
            }),
        }
    }

    /// Carve `storage` into `num_blocks` blocks of `block_size` bytes and
    /// thread them onto the free list.
    pub fn init(&self, storage: &'static mut [u8], block_size: usize, num_blocks: usize) -> KernelResult<()> {
        if is_isr_context() {
            return Err(KernelError::Isr);
        }
        if block_size < core::mem::size_of::<usize>() || num_blocks == 0 {
            return Err(KernelError::Param);
        }
        if storage.len() < block_size * num_blocks {
            return Err(KernelError::Param);
        }

        critical_section(|_cs| {
            let inner = unsafe { &mut *self.inner.get() };
            let base_ptr = storage.as_mut_ptr();

            inner.base = base_ptr as usize;
            inner.block_size = block_size;
            inner.num_blocks = num_blocks;
            inner.waiters.init();
            inner.free_head = core::ptr::null_mut();
            inner.free_count = 0;

            for i in (0..num_blocks).rev() {
                let block = unsafe { base_ptr.add(i * block_size) };
                unsafe { (block as *mut *mut u8).write(inner.free_head) };
                inner.free_head = block;
                inner.free_count += 1;
            }

            Ok(())
        })
    }

    /// Take a block, blocking the caller while the pool is exhausted.
    pub fn get(&self) -> KernelResult<*mut ()> {
        if is_isr_context() {
            return Err(KernelError::Isr);
        }

        critical_section(|_cs| {
            let inner = unsafe { &mut *self.inner.get() };

            while inner.free_count == 0 {
                let cur = unsafe { kernel::tcb_cur() }.ok_or(KernelError::Param)?;
                unsafe {
                    kernel::ready_set_remove(cur);
                    (*cur.as_ptr()).state = TaskState::Blocked;
                    inner.waiters.insert_tail(cur);
                }
                crate::sched::request_switch();
            }

            let block = inner.free_head;
            inner.free_head = unsafe { *(block as *const *mut u8) };
            inner.free_count -= 1;
            Ok(block as *mut ())
        })
    }

    /// Return a block to the pool.
    ///
    /// Validated in order: the address must fall within the pool's range
    /// ([`KernelError::InvalidAddr`]) before its block alignment is checked
    /// ([`KernelError::NotAlign`]).
    pub fn put(&self, block: *mut ()) -> KernelResult<()> {
        critical_section(|_cs| {
            let inner = unsafe { &mut *self.inner.get() };

            let addr = block as usize;
            let span = inner.block_size * inner.num_blocks;
            if addr < inner.base || addr >= inner.base + span {
                return Err(KernelError::InvalidAddr);
            }
            if (addr - inner.base) % inner.block_size != 0 {
                return Err(KernelError::NotAlign);
            }

            let block = block as *mut u8;
            unsafe { (block as *mut *mut u8).write(inner.free_head) };
            inner.free_head = block;
            inner.free_count += 1;

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

    #[inline]
    pub fn free_count(&self) -> usize {
        unsafe { (*self.inner.get()).free_count }
    }
}

impl Default for MemPool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static mut POOL_STORAGE: [u8; 128] = [0; 128];

    #[test]
    #[allow(static_mut_refs)]
    fn put_validates_address_before_alignment() {
        let pool = MemPool::new();
        let storage = unsafe { &mut POOL_STORAGE };
        let base = storage.as_ptr() as usize;
        pool.init(storage, 32, 4).unwrap();

        assert_eq!(pool.free_count(), 4);

        let block = pool.get().unwrap();
        assert_eq!(pool.free_count(), 3);
        pool.put(block).unwrap();
        assert_eq!(pool.free_count(), 4);

        assert_eq!(pool.put((base + 16) as *mut ()), Err(KernelError::NotAlign));
        assert_eq!(pool.put((base + 128) as *mut ()), Err(KernelError::InvalidAddr));
    }
}
