//! Bounded numeric resource allocator.
//!
//! A [`NumSet`] hands out the numbers `base, base + width, base + 2 * width, ...` that fall inside a fixed
//! range, each at most once until it is freed again. Every number owns one slot in a flat table; the free
//! slots are threaded into a singly linked chain through the table itself, so both allocation and release are
//! O(1). Each set carries its own lock, so unrelated sets never contend.

use alloc::{sync::Arc, vec::Vec};
use core::{fmt, ops::Range};

use crate::{
    error::{Errno, KResult},
    kerror,
    sync::mutex::SpinLock as Mutex,
};

/// State of a single number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumState {
    Free,
    Used,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    /// On the free chain; `next` is the following free slot.
    Free { next: Option<usize> },
    Used,
}

struct NumTable {
    slots: Vec<Slot>,
    free_head: Option<usize>,
    used: usize,
}

impl NumTable {
    fn new(len: usize) -> KResult<Self> {
        let mut slots = Vec::new();
        slots.try_reserve_exact(len).map_err(|_| Errno::ENOMEM)?;
        slots.extend((0..len).map(|i| Slot::Free {
            next: (i + 1 < len).then_some(i + 1),
        }));

        Ok(Self {
            slots,
            free_head: Some(0),
            used: 0,
        })
    }

    fn pop(&mut self) -> Option<usize> {
        let index = self.free_head?;
        match self.slots[index] {
            Slot::Free { next } => {
                self.free_head = next;
                self.slots[index] = Slot::Used;
                self.used += 1;
                Some(index)
            }
            // The chain only ever links free slots.
            Slot::Used => panic!("numset: free chain reaches used slot {}", index),
        }
    }

    fn push(&mut self, index: usize) -> KResult<()> {
        if self.slots[index] != Slot::Used {
            return Err(Errno::EUCLEAN);
        }

        self.slots[index] = Slot::Free {
            next: self.free_head,
        };
        self.free_head = Some(index);
        self.used -= 1;
        Ok(())
    }
}

/// A set of unique integers in `[range_start, range_end)` spaced `width` apart.
pub struct NumSet {
    range_start: i32,
    range_end: i32,
    width: i32,
    capacity: usize,
    /// `None` once the set has been destroyed.
    table: Mutex<Option<NumTable>>,
}

impl NumSet {
    /// Creates a set covering `length` integers starting at `base`, handing out every `width`-th of them.
    ///
    /// Fails with `EINVAL` if `base` is negative, `length` or `width` is not positive, the range holds no
    /// number at all, or `base + length` does not fit into an `i32`.
    pub fn new(base: i32, length: i32, width: i32) -> KResult<Self> {
        if base < 0 || length <= 0 || width <= 0 {
            return Err(Errno::EINVAL);
        }
        base.checked_add(length).ok_or(Errno::EINVAL)?;

        let capacity = (length / width) as usize;
        if capacity == 0 {
            return Err(Errno::EINVAL);
        }

        Ok(Self {
            range_start: base,
            range_end: base + capacity as i32 * width,
            width,
            capacity,
            table: Mutex::new(Some(NumTable::new(capacity)?)),
        })
    }

    /// Takes a free number. Fails with `ENOSPC` if every number is in use.
    pub fn allocate(&self) -> KResult<i32> {
        let index = self
            .table
            .lock()
            .as_mut()
            .ok_or(Errno::EFAULT)?
            .pop()
            .ok_or(Errno::ENOSPC)?;

        Ok(self.range_start + index as i32 * self.width)
    }

    /// Takes a free number that is given back when the returned [`Number`] is dropped.
    pub fn allocate_owned(self: &Arc<Self>) -> KResult<Number> {
        Ok(Number {
            value: self.allocate()?,
            set: self.clone(),
        })
    }

    /// Gives `number` back.
    ///
    /// Fails with `EUCLEAN` if the number does not belong to this set or is not currently allocated; in
    /// particular, freeing a number twice is always rejected.
    pub fn free(&self, number: i32) -> KResult<()> {
        let index = self.index_of(number)?;
        self.table
            .lock()
            .as_mut()
            .ok_or(Errno::EFAULT)?
            .push(index)
    }

    /// Tells whether `number` is currently allocated. Validates `number` the same way [`NumSet::free`] does.
    pub fn check_free(&self, number: i32) -> KResult<NumState> {
        let index = self.index_of(number)?;
        let table = self.table.lock();
        match table.as_ref().ok_or(Errno::EFAULT)?.slots[index] {
            Slot::Free { .. } => Ok(NumState::Free),
            Slot::Used => Ok(NumState::Used),
        }
    }

    /// Releases the backing table. Every later operation fails with `EFAULT`.
    ///
    /// The caller must make sure no other thread is still using the set.
    pub fn destroy(&self) -> KResult<()> {
        self.table.lock().take().map(drop).ok_or(Errno::EFAULT)
    }

    /// The numbers this set can hand out, before applying the width.
    pub fn range(&self) -> Range<i32> {
        self.range_start..self.range_end
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    /// How many numbers the set holds in total.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// How many numbers can still be allocated.
    pub fn available(&self) -> usize {
        self.table
            .lock()
            .as_ref()
            .map_or(0, |table| self.capacity - table.used)
    }

    fn index_of(&self, number: i32) -> KResult<usize> {
        if !self.range().contains(&number) || (number - self.range_start) % self.width != 0 {
            return Err(Errno::EUCLEAN);
        }

        Ok(((number - self.range_start) / self.width) as usize)
    }
}

impl fmt::Debug for NumSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NumSet")
            .field("range", &self.range())
            .field("width", &self.width)
            .field("available", &self.available())
            .finish()
    }
}

/// A number taken from a [`NumSet`] that is returned to it on drop.
#[derive(Debug)]
pub struct Number {
    value: i32,
    set: Arc<NumSet>,
}

impl Number {
    pub fn value(&self) -> i32 {
        self.value
    }
}

impl Drop for Number {
    fn drop(&mut self) {
        if let Err(errno) = self.set.free(self.value) {
            kerror!("cannot return number {}: {:?}", self.value, errno);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{collections::BTreeSet, thread};

    #[test]
    fn test_invalid_parameters() {
        assert_eq!(NumSet::new(-1, 4, 1).err(), Some(Errno::EINVAL));
        assert_eq!(NumSet::new(0, 0, 1).err(), Some(Errno::EINVAL));
        assert_eq!(NumSet::new(0, 4, 0).err(), Some(Errno::EINVAL));
        assert_eq!(NumSet::new(0, 4, -2).err(), Some(Errno::EINVAL));
        assert_eq!(NumSet::new(0, 3, 4).err(), Some(Errno::EINVAL));
        assert_eq!(NumSet::new(i32::MAX - 1, 4, 1).err(), Some(Errno::EINVAL));
    }

    #[test]
    fn test_exhaustion() {
        let set = NumSet::new(0, 4, 1).unwrap();
        let numbers = (0..4).map(|_| set.allocate().unwrap()).collect::<BTreeSet<_>>();
        assert_eq!(numbers, BTreeSet::from([0, 1, 2, 3]));
        assert_eq!(set.allocate(), Err(Errno::ENOSPC));
        assert_eq!(set.available(), 0);
    }

    #[test]
    fn test_free_makes_number_reusable() {
        let set = NumSet::new(0, 4, 1).unwrap();
        for _ in 0..4 {
            set.allocate().unwrap();
        }

        set.free(2).unwrap();
        assert_eq!(set.check_free(2), Ok(NumState::Free));
        assert_eq!(set.allocate(), Ok(2));
        assert_eq!(set.check_free(2), Ok(NumState::Used));
        assert_eq!(set.allocate(), Err(Errno::ENOSPC));
    }

    #[test]
    fn test_width_and_base() {
        let set = NumSet::new(100, 10, 2).unwrap();
        assert_eq!(set.capacity(), 5);
        assert_eq!(set.range(), 100..110);

        let numbers = (0..5).map(|_| set.allocate().unwrap()).collect::<BTreeSet<_>>();
        assert_eq!(numbers, BTreeSet::from([100, 102, 104, 106, 108]));
    }

    #[test]
    fn test_free_rejects_foreign_numbers() {
        let set = NumSet::new(8, 8, 2).unwrap();
        let number = set.allocate().unwrap();

        assert_eq!(set.free(7), Err(Errno::EUCLEAN));
        assert_eq!(set.free(16), Err(Errno::EUCLEAN));
        assert_eq!(set.free(9), Err(Errno::EUCLEAN));
        assert_eq!(set.check_free(9), Err(Errno::EUCLEAN));
        assert_eq!(set.check_free(number), Ok(NumState::Used));
    }

    #[test]
    fn test_double_free_rejected() {
        let set = NumSet::new(0, 4, 1).unwrap();
        let a = set.allocate().unwrap();
        let b = set.allocate().unwrap();

        set.free(a).unwrap();
        assert_eq!(set.free(a), Err(Errno::EUCLEAN));
        // A number that was never handed out is not freeable either.
        assert_eq!(set.free(3), Err(Errno::EUCLEAN));

        set.free(b).unwrap();
        assert_eq!(set.available(), 4);

        let again = (0..4).map(|_| set.allocate().unwrap()).collect::<BTreeSet<_>>();
        assert_eq!(again.len(), 4);
    }

    #[test]
    fn test_destroy() {
        let set = NumSet::new(0, 4, 1).unwrap();
        let n = set.allocate().unwrap();
        set.destroy().unwrap();

        assert_eq!(set.allocate(), Err(Errno::EFAULT));
        assert_eq!(set.free(n), Err(Errno::EFAULT));
        assert_eq!(set.check_free(n), Err(Errno::EFAULT));
        assert_eq!(set.destroy(), Err(Errno::EFAULT));
        assert_eq!(set.available(), 0);
    }

    #[test]
    fn test_owned_number() {
        let set = Arc::new(NumSet::new(0, 2, 1).unwrap());
        let a = set.allocate_owned().unwrap();
        let b = set.allocate_owned().unwrap();
        assert_ne!(a.value(), b.value());
        assert_eq!(set.allocate(), Err(Errno::ENOSPC));

        let value = a.value();
        drop(a);
        assert_eq!(set.check_free(value), Ok(NumState::Free));
        assert_eq!(set.available(), 1);
    }

    #[test]
    fn test_concurrent_allocation() {
        let set = Arc::new(NumSet::new(0, 1024, 1).unwrap());
        let handles = (0..8)
            .map(|_| {
                let set = set.clone();
                thread::spawn(move || {
                    let mut taken = Vec::new();
                    while let Ok(n) = set.allocate() {
                        taken.push(n);
                    }
                    taken
                })
            })
            .collect::<Vec<_>>();

        let mut all = Vec::new();
        for handle in handles {
            all.extend(handle.join().unwrap());
        }

        let unique = all.iter().copied().collect::<BTreeSet<_>>();
        assert_eq!(all.len(), 1024);
        assert_eq!(unique, (0..1024).collect::<BTreeSet<_>>());
    }
}
