//! The concurrency boundary (§5): a single explicit fan-out point,
//! `Runtime::map`, used by search passes to instantiate a layer's
//! successors in parallel. Everything above this boundary — frontier
//! management, prefix freezing, pass orchestration — stays single-threaded
//! and sees no concurrency at all.

/// Fans `f` out across `items`, returning results in the same order they
/// were submitted in. Implementations decide how; callers only rely on
/// every item being visited exactly once.
pub trait Runtime: Send + Sync {
    fn map<T, R, F>(&self, items: Vec<T>, f: F) -> Vec<R>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> R + Send + Sync;
}

/// Default runtime: one OS thread per item via a scoped thread pool. Scoped
/// threads let the closure borrow `self`/`target` from the caller's stack
/// instead of requiring `'static` captures.
pub struct ThreadRuntime;

impl Runtime for ThreadRuntime {
    fn map<T, R, F>(&self, items: Vec<T>, f: F) -> Vec<R>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> R + Send + Sync,
    {
        std::thread::scope(|scope| {
            let handles: Vec<_> = items
                .into_iter()
                .map(|item| scope.spawn(|| f(item)))
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().expect("runtime worker thread panicked"))
                .collect()
        })
    }
}

/// Runs everything on the calling thread. Useful for deterministic unit
/// tests and for single-item fan-outs where spawning threads is pure
/// overhead.
pub struct SequentialRuntime;

impl Runtime for SequentialRuntime {
    fn map<T, R, F>(&self, items: Vec<T>, f: F) -> Vec<R>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> R + Send + Sync,
    {
        items.into_iter().map(f).collect()
    }
}
