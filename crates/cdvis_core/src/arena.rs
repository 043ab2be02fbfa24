//! Slot arena keyed by generational handles

use crate::error::HandleError;
use crate::handle::{Handle, HandleAllocator};

/// Values stored behind [`Handle`]s
pub struct Arena<T> {
    allocator: HandleAllocator<T>,
    values: Vec<Option<T>>,
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self {
            allocator: HandleAllocator::new(),
            values: Vec::new(),
        }
    }

    /// Insert a value and get a handle to it
    pub fn insert(&mut self, value: T) -> Handle<T> {
        let handle = self.allocator.allocate();
        let index = handle.index() as usize;
        if index >= self.values.len() {
            self.values.resize_with(index + 1, || None);
        }
        self.values[index] = Some(value);
        handle
    }

    /// Remove a value, invalidating every copy of its handle
    pub fn remove(&mut self, handle: Handle<T>) -> Option<T> {
        if !self.allocator.free(handle) {
            return None;
        }
        self.values[handle.index() as usize].take()
    }

    pub fn get(&self, handle: Handle<T>) -> Option<&T> {
        if !self.allocator.is_valid(handle) {
            return None;
        }
        self.values.get(handle.index() as usize)?.as_ref()
    }

    pub fn get_mut(&mut self, handle: Handle<T>) -> Option<&mut T> {
        if !self.allocator.is_valid(handle) {
            return None;
        }
        self.values.get_mut(handle.index() as usize)?.as_mut()
    }

    /// Like [`Arena::get`] but reports why the lookup failed
    pub fn try_get(&self, handle: Handle<T>) -> Result<&T, HandleError> {
        if handle.is_null() {
            return Err(HandleError::Null);
        }
        self.get(handle).ok_or(HandleError::Stale)
    }

    pub fn try_get_mut(&mut self, handle: Handle<T>) -> Result<&mut T, HandleError> {
        if handle.is_null() {
            return Err(HandleError::Null);
        }
        self.get_mut(handle).ok_or(HandleError::Stale)
    }

    pub fn contains(&self, handle: Handle<T>) -> bool {
        self.allocator.is_valid(handle)
    }

    pub fn len(&self) -> usize {
        self.allocator.len()
    }

    pub fn is_empty(&self) -> bool {
        self.allocator.is_empty()
    }

    /// Iterate over live handles and values
    pub fn iter(&self) -> impl Iterator<Item = (Handle<T>, &T)> {
        self.values.iter().enumerate().filter_map(move |(i, slot)| {
            let value = slot.as_ref()?;
            Some((self.allocator.handle_at(i as u32)?, value))
        })
    }

    /// Live handles, in slot order
    pub fn handles(&self) -> Vec<Handle<T>> {
        self.iter().map(|(h, _)| h).collect()
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arena_insert_remove() {
        let mut arena: Arena<String> = Arena::new();
        let h1 = arena.insert("hello".to_string());
        let h2 = arena.insert("world".to_string());

        assert_eq!(arena.get(h1).map(String::as_str), Some("hello"));
        assert_eq!(arena.get(h2).map(String::as_str), Some("world"));

        assert_eq!(arena.remove(h1).as_deref(), Some("hello"));
        assert!(arena.get(h1).is_none());
        assert!(arena.remove(h1).is_none());
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn test_arena_stale_after_reuse() {
        let mut arena: Arena<u32> = Arena::new();
        let h1 = arena.insert(1);
        arena.remove(h1);
        let h2 = arena.insert(2);

        assert_eq!(h1.index(), h2.index());
        assert_eq!(arena.try_get(h1), Err(HandleError::Stale));
        assert_eq!(arena.try_get(Handle::null()), Err(HandleError::Null));
        assert_eq!(arena.try_get(h2), Ok(&2));
    }

    #[test]
    fn test_arena_iter_skips_removed() {
        let mut arena: Arena<u32> = Arena::new();
        let a = arena.insert(10);
        let b = arena.insert(20);
        let c = arena.insert(30);
        arena.remove(b);

        let handles = arena.handles();
        assert_eq!(handles, vec![a, c]);
        let sum: u32 = arena.iter().map(|(_, v)| *v).sum();
        assert_eq!(sum, 40);
    }
}
