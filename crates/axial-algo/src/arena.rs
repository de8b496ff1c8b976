//! Arena allocation context for origin-scoped scratch memory.
//!
//! Each analysis origin needs transient arrays (per-state labels, distance
//! caches, dependency accumulators). They come out of a bumpalo arena that
//! is reset between origins, giving O(1) bulk deallocation and restoring
//! the allocator state on exit so scratch memory never leaks.

use bumpalo::Bump;

/// Arena context for origin-scoped allocations.
///
/// Created once per worker, reset between origins. All temporary
/// allocations during a single traversal use this arena.
///
/// # Example
///
/// ```
/// use axial_algo::arena::ArenaContext;
///
/// let mut ctx = ArenaContext::new();
/// {
///     let mut vec = ctx.alloc_vec::<u32>();
///     vec.push(1);
///     vec.push(2);
/// } // vec dropped here
/// ctx.reset(); // O(1) - all allocations freed
/// ```
pub struct ArenaContext {
    bump: Bump,
}

impl ArenaContext {
    /// Create new arena context.
    pub fn new() -> Self {
        Self { bump: Bump::new() }
    }

    /// Reset arena for reuse (O(1) operation).
    ///
    /// This deallocates all objects allocated from the arena without
    /// running destructors. Safe because arena-allocated types in this
    /// crate are plain data without Drop side effects.
    pub fn reset(&mut self) {
        self.bump.reset();
    }

    /// Allocate a Vec in the arena.
    pub fn alloc_vec<T>(&self) -> bumpalo::collections::Vec<'_, T> {
        bumpalo::collections::Vec::new_in(&self.bump)
    }

    /// Allocate a Vec in the arena with the given length, filled by clone.
    pub fn alloc_vec_filled<T: Clone>(
        &self,
        len: usize,
        value: T,
    ) -> bumpalo::collections::Vec<'_, T> {
        let mut v = bumpalo::collections::Vec::with_capacity_in(len, &self.bump);
        v.resize(len, value);
        v
    }
}

impl Default for ArenaContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arena_vec() {
        let ctx = ArenaContext::new();
        let mut vec = ctx.alloc_vec::<i32>();
        vec.push(1);
        vec.push(2);
        assert_eq!(vec.len(), 2);
    }

    #[test]
    fn test_arena_filled() {
        let ctx = ArenaContext::new();
        let vec = ctx.alloc_vec_filled(4, f64::INFINITY);
        assert_eq!(vec.len(), 4);
        assert!(vec.iter().all(|v| v.is_infinite()));
    }

    #[test]
    fn test_arena_reset() {
        let mut ctx = ArenaContext::new();
        {
            let mut vec = ctx.alloc_vec::<i32>();
            vec.extend(0..1000);
        }
        ctx.reset();
        let mut vec2 = ctx.alloc_vec::<i32>();
        vec2.push(42);
        assert_eq!(vec2[0], 42);
    }

    #[test]
    fn test_arena_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<ArenaContext>();
    }
}
