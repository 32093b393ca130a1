//! Background preview loading.
//!
//! Opening, parsing and decoding happen on one worker thread so an
//! interactive front-end never blocks on them. Only [`LoadTicket`]s go in and
//! only [`LoadResult`]s come out; the session itself stays on the control
//! thread. A request that is superseded by a newer one before the worker
//! gets to it, or while it is being decoded, is dropped.

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::decode::PreviewDecoder;
use crate::preview::{load_preview, Preview, PreviewError};
use crate::session::LoadTicket;

/// Outcome of one load, tagged with the ticket that requested it.
#[derive(Debug)]
pub struct LoadResult {
    pub ticket: LoadTicket,
    pub outcome: Result<Preview, PreviewError>,
}

/// Owns the worker thread. Dropping the loader stops the worker.
pub struct PreviewLoader {
    requests: Option<Sender<LoadTicket>>,
    results: Receiver<LoadResult>,
    latest: Arc<AtomicU64>,
    worker: Option<JoinHandle<()>>,
}

impl PreviewLoader {
    /// Start the worker thread with the decoder chosen at start-up.
    pub fn spawn(decoder: Arc<dyn PreviewDecoder>) -> io::Result<Self> {
        let (request_tx, request_rx) = mpsc::channel::<LoadTicket>();
        let (result_tx, result_rx) = mpsc::channel::<LoadResult>();
        let latest = Arc::new(AtomicU64::new(0));

        let worker_latest = Arc::clone(&latest);
        let worker = thread::Builder::new()
            .name("x3f-preview".to_string())
            .spawn(move || run_worker(request_rx, result_tx, worker_latest, decoder))?;

        Ok(Self {
            requests: Some(request_tx),
            results: result_rx,
            latest,
            worker: Some(worker),
        })
    }

    /// Queue a load. Any older request still pending becomes stale.
    ///
    /// Returns `false` if the worker has stopped.
    pub fn request(&self, ticket: LoadTicket) -> bool {
        self.latest.fetch_max(ticket.generation, Ordering::SeqCst);
        match &self.requests {
            Some(tx) => tx.send(ticket).is_ok(),
            None => false,
        }
    }

    /// A finished load, if one is ready.
    pub fn try_recv(&self) -> Option<LoadResult> {
        self.results.try_recv().ok()
    }

    /// Wait up to `timeout` for a finished load.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<LoadResult> {
        match self.results.recv_timeout(timeout) {
            Ok(result) => Some(result),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }
}

impl Drop for PreviewLoader {
    fn drop(&mut self) {
        // Closing the channel ends the worker loop
        self.requests.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("Preview worker panicked");
            }
        }
    }
}

fn run_worker(
    requests: Receiver<LoadTicket>,
    results: Sender<LoadResult>,
    latest: Arc<AtomicU64>,
    decoder: Arc<dyn PreviewDecoder>,
) {
    while let Ok(mut ticket) = requests.recv() {
        // Only the newest queued request matters
        while let Ok(newer) = requests.try_recv() {
            log::debug!("Skipping superseded load of {}", ticket.path.display());
            ticket = newer;
        }
        if is_stale(&ticket, &latest) {
            log::debug!("Skipping stale load of {}", ticket.path.display());
            continue;
        }

        let outcome = load_preview(&ticket.path, decoder.as_ref());
        if is_stale(&ticket, &latest) {
            log::debug!("Discarding stale result for {}", ticket.path.display());
            continue;
        }
        if results.send(LoadResult { ticket, outcome }).is_err() {
            break;
        }
    }
}

fn is_stale(ticket: &LoadTicket, latest: &AtomicU64) -> bool {
    ticket.generation < latest.load(Ordering::SeqCst)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::X3fBuilder;
    use crate::decode::{DecodeError, DecodedImage, GenericDecoder, MINIMAL_JPEG};
    use crate::session::SessionState;
    use std::path::PathBuf;
    use std::sync::atomic::AtomicUsize;
    use tempfile::TempDir;

    const WAIT: Duration = Duration::from_secs(10);

    /// Counts calls and returns a fixed-size image.
    struct CountingDecoder {
        calls: AtomicUsize,
    }

    impl PreviewDecoder for CountingDecoder {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn decode(&self, _jpeg: &[u8]) -> Result<DecodedImage, DecodeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(DecodedImage::new(2, 2, vec![0u8; 12]))
        }
    }

    fn make_files(dir: &TempDir, n: usize) -> Vec<PathBuf> {
        let bytes = X3fBuilder::new().image_section(2, 18, MINIMAL_JPEG).build();
        (0..n)
            .map(|i| {
                let path = dir.path().join(format!("IMG{}.X3F", i));
                std::fs::write(&path, &bytes).unwrap();
                path
            })
            .collect()
    }

    #[test]
    fn test_loads_requested_file() {
        let dir = TempDir::new().unwrap();
        let files = make_files(&dir, 1);
        let session = SessionState::new(files, (800, 600));
        let loader = PreviewLoader::spawn(Arc::new(GenericDecoder)).unwrap();

        let ticket = session.current_ticket().unwrap();
        assert!(loader.request(ticket.clone()));

        let result = loader.recv_timeout(WAIT).expect("load should finish");
        assert_eq!(result.ticket, ticket);
        assert!(session.is_current(&result.ticket));
        assert_eq!(result.outcome.unwrap().image.dimensions(), (1, 1));
    }

    #[test]
    fn test_latest_request_wins() {
        let dir = TempDir::new().unwrap();
        let files = make_files(&dir, 3);
        let mut session = SessionState::new(files, (800, 600));
        let decoder = Arc::new(CountingDecoder {
            calls: AtomicUsize::new(0),
        });
        let loader = PreviewLoader::spawn(decoder.clone()).unwrap();

        let first = session.next().unwrap();
        let second = session.next().unwrap();
        loader.request(first.clone());
        loader.request(second.clone());

        let mut applied = None;
        while let Some(result) = loader.recv_timeout(WAIT) {
            if session.is_current(&result.ticket) {
                applied = Some(result);
                break;
            }
            // Anything else must be the superseded request
            assert_eq!(result.ticket, first);
        }

        let applied = applied.expect("latest load should finish");
        assert_eq!(applied.ticket, second);
        assert!(applied.outcome.is_ok());
        assert!(decoder.calls.load(Ordering::SeqCst) >= 1);
    }

    #[test]
    fn test_failed_load_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.X3F");
        std::fs::write(&path, b"not an x3f file").unwrap();
        let session = SessionState::new(vec![path], (800, 600));
        let loader = PreviewLoader::spawn(Arc::new(GenericDecoder)).unwrap();

        loader.request(session.current_ticket().unwrap());
        let result = loader.recv_timeout(WAIT).expect("load should finish");
        assert!(result.outcome.is_err());
    }

    #[test]
    fn test_try_recv_empty() {
        let loader = PreviewLoader::spawn(Arc::new(GenericDecoder)).unwrap();
        assert!(loader.try_recv().is_none());
    }
}
