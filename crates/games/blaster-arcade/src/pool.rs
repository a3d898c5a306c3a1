/// Identity of one pooled item. Stable for the pool's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PoolHandle(usize);

impl PoolHandle {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Fixed-capacity pool, fully built at construction.
///
/// Every item is either free or active, never both, and
/// `active_count() + free_count() == capacity()` holds after every call.
/// The free and active lists are sized up front, so acquire and release
/// never allocate.
#[derive(Debug, Clone)]
pub struct FixedPool<T> {
    items: Vec<T>,
    free: Vec<usize>,
    active: Vec<usize>,
    is_active: Vec<bool>,
}

impl<T> FixedPool<T> {
    /// Build `size` items by calling `factory` exactly `size` times.
    pub fn create(size: usize, mut factory: impl FnMut() -> T) -> Self {
        let mut items = Vec::with_capacity(size);
        for _ in 0..size {
            items.push(factory());
        }
        let mut free = Vec::with_capacity(size);
        free.extend(0..size);
        Self {
            items,
            free,
            active: Vec::with_capacity(size),
            is_active: vec![false; size],
        }
    }

    /// Take a free item, or `None` when all items are active.
    pub fn acquire(&mut self) -> Option<PoolHandle> {
        let index = self.free.pop()?;
        self.is_active[index] = true;
        self.active.push(index);
        Some(PoolHandle(index))
    }

    /// Return an active item. Returns false (and does nothing) if the item
    /// is not currently active.
    pub fn release(&mut self, handle: PoolHandle) -> bool {
        let index = handle.0;
        if !self.is_active.get(index).copied().unwrap_or(false) {
            return false;
        }
        if let Some(pos) = self.active.iter().position(|&i| i == index) {
            self.active.swap_remove(pos);
        }
        self.is_active[index] = false;
        self.free.push(index);
        true
    }

    /// Release every active item for which `release` returns true.
    pub fn release_where(&mut self, mut release: impl FnMut(&mut T) -> bool) -> usize {
        let mut released = 0;
        let mut pos = self.active.len();
        while pos > 0 {
            pos -= 1;
            let index = self.active[pos];
            if release(&mut self.items[index]) {
                self.active.swap_remove(pos);
                self.is_active[index] = false;
                self.free.push(index);
                released += 1;
            }
        }
        released
    }

    /// Force every active item back to free.
    pub fn clear(&mut self) {
        for index in self.active.drain(..) {
            self.is_active[index] = false;
            self.free.push(index);
        }
    }

    pub fn is_active(&self, handle: PoolHandle) -> bool {
        self.is_active.get(handle.0).copied().unwrap_or(false)
    }

    pub fn get(&self, handle: PoolHandle) -> Option<&T> {
        self.items.get(handle.0)
    }

    pub fn get_mut(&mut self, handle: PoolHandle) -> Option<&mut T> {
        self.items.get_mut(handle.0)
    }

    /// Active items with their handles, in no particular order.
    pub fn iter_active(&self) -> impl Iterator<Item = (PoolHandle, &T)> + '_ {
        self.active
            .iter()
            .map(move |&index| (PoolHandle(index), &self.items[index]))
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    pub fn capacity(&self) -> usize {
        self.items.len()
    }
}
