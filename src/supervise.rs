//! Catch-and-retry supervision for the scheduler's long-running tasks
//! (spec §7 "Unexpected exception in a loop task").
//!
//! The original implementation wraps each thread's entry point in a
//! decorator that catches any exception, logs it, and restarts the
//! function body forever. The direct async analogue is to let a panic
//! unwind the spawned task (caught by `tokio::spawn`'s `JoinHandle`
//! rather than `catch_unwind`) and restart the future from a supervisor.

use std::future::Future;

use tracing::error;

/// Runs `make_future()` in a loop on the current task, restarting it if
/// it panics. A clean return ends supervision — used for the `loop_quit`
/// shutdown path.
pub async fn supervise<F, Fut>(name: &str, mut make_future: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    loop {
        let handle = tokio::spawn(make_future());
        match handle.await {
            Ok(()) => {
                tracing::debug!(task = name, "loop task exited cleanly");
                break;
            }
            Err(join_err) => {
                error!(task = name, error = %join_err, "unmanaged error in loop task, restarting");
            }
        }
    }
}
