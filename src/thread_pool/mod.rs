//! Thread pools used by the [`TriplesServer`] to serve connections.
//!
//! Every accepted connection is handed to the pool as one job that lives as long as the
//! connection does. [`NaiveThreadPool`] starts a thread per job, so every client is served
//! independently. The other two pools run at most `threads` connections at a time and queue
//! the rest.
//!
//! [`TriplesServer`]: ../struct.TriplesServer.html
use crate::Result;

mod naive;
mod rayon_pool;
mod shared_queue;

pub use self::naive::NaiveThreadPool;
pub use self::rayon_pool::RayonThreadPool;
pub use self::shared_queue::SharedQueueThreadPool;

/// The trait that all thread pools must implement
pub trait ThreadPool {
    /// Creates a new thread pool, immediately spawning the specified number of threads.
    ///
    /// # Errors
    /// Returns an error if any thread fails to spawn. All previously-spawned threads are
    /// terminated.
    fn new(threads: u32) -> Result<Self>
    where
        Self: Sized;

    /// Spawns a function into the thread pool.
    ///
    /// Spawning always succeeds, but if the function panics the threadpool continues to operate
    /// with the same number of threads. The thread count is not reduced nor is the thread pool
    /// destroyed, corrupted or invalidated.
    fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static;
}
