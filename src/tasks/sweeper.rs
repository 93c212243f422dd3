//! Expiry Sweeper Task
//!
//! Background thread that periodically removes expired cache entries, for
//! callers who prefer proactive cleanup over purely lazy expiry.

use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::cache::CacheEngine;
use crate::storage::StorageBackend;

// == Sweeper Handle ==
/// Handle to a running sweeper thread.
///
/// Call `stop` for an orderly shutdown; dropping the handle stops the
/// thread as well.
pub struct SweeperHandle {
    signal: Arc<(Mutex<bool>, Condvar)>,
    handle: Option<JoinHandle<()>>,
}

impl SweeperHandle {
    /// Signals the sweeper to stop and waits for the thread to finish.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let (stop, cvar) = &*self.signal;
        if let Ok(mut stopped) = stop.lock() {
            *stopped = true;
        }
        cvar.notify_all();

        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Sweeper thread panicked before shutdown");
            }
        }
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Spawns a background thread that sweeps expired entries every `interval`.
///
/// The thread waits on a condvar with a timeout, so a stop signal takes
/// effect promptly instead of after the next full interval.
pub fn spawn_sweeper<V, S>(cache: Arc<CacheEngine<V, S>>, interval: Duration) -> SweeperHandle
where
    V: Clone + Send + 'static,
    S: StorageBackend<V> + Send + 'static,
{
    let signal = Arc::new((Mutex::new(false), Condvar::new()));
    let thread_signal = Arc::clone(&signal);

    let handle = std::thread::spawn(move || {
        info!("Starting expiry sweeper with interval of {:?}", interval);

        let (stop, cvar) = &*thread_signal;
        let mut stopped = match stop.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        while !*stopped {
            let (guard, _timeout) = match cvar.wait_timeout(stopped, interval) {
                Ok(result) => result,
                Err(poisoned) => {
                    stopped = poisoned.into_inner().0;
                    continue;
                }
            };
            stopped = guard;
            if *stopped {
                break;
            }

            match cache.sweep_expired() {
                Ok(removed) if removed > 0 => {
                    info!("Expiry sweep: removed {} expired entries", removed);
                }
                Ok(_) => {
                    debug!("Expiry sweep: no expired entries found");
                }
                Err(e) => {
                    warn!("Expiry sweep failed: {}", e);
                }
            }
        }

        info!("Expiry sweeper stopped");
    });

    SweeperHandle {
        signal,
        handle: Some(handle),
    }
}
