use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::Duration;

/// Named thread that runs `tick` on a fixed cadence until stopped.
///
/// The sleep between ticks waits on a stop channel, so stopping never has to
/// wait out a full interval.
pub(crate) struct PeriodicWorker {
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl PeriodicWorker {
    pub(crate) fn spawn<F>(name: &str, interval: Duration, mut tick: F) -> std::io::Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let (stop_tx, stop_rx) = bounded::<()>(1);

        let handle = std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || loop {
                tick();
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => continue,
                    // Stop requested or the owner is gone.
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })?;

        Ok(Self {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        })
    }

    /// Signal the thread and block until it has exited.
    pub(crate) fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.try_send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("worker thread panicked before shutdown");
            }
        }
    }
}

impl Drop for PeriodicWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };
    use std::time::Instant;

    #[test]
    fn periodic_worker_ticks_until_stopped() {
        let (tx, rx) = crossbeam_channel::unbounded::<()>();
        let mut worker = PeriodicWorker::spawn("tick-test", Duration::from_millis(5), move || {
            let _ = tx.send(());
        })
        .unwrap();

        for _ in 0..3 {
            rx.recv_timeout(Duration::from_secs(2)).unwrap();
        }
        worker.stop();

        // The closure (and its sender) is gone once stop returns.
        while rx.try_recv().is_ok() {}
        assert!(rx.try_recv().is_err());
        assert!(matches!(
            rx.recv_timeout(Duration::from_millis(20)),
            Err(RecvTimeoutError::Disconnected)
        ));
    }

    #[test]
    fn stop_does_not_wait_for_interval() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let mut worker = PeriodicWorker::spawn("slow-tick-test", Duration::from_secs(60), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        let started = Instant::now();
        worker.stop();
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(count.load(Ordering::SeqCst) >= 1);
    }

    #[test]
    fn drop_joins_cleanly() {
        let worker = PeriodicWorker::spawn("drop-test", Duration::from_millis(1), || {}).unwrap();
        drop(worker);
    }
}
