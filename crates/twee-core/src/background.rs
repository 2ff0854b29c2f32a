//! A [`Reconciler`] running on its own thread.

use std::io;
use std::sync::mpsc;
use std::sync::{Arc, RwLock};
use std::thread::{self, JoinHandle};

use crate::document::{TextDocument, TweeDocument};
use crate::reconciler::{DirtyRegionQueue, ProgressMonitor, Reconciler};
use crate::region::DirtyRegion;

/// A document shared between the editing side and the reconciler thread.
pub type SharedDocument = Arc<RwLock<TweeDocument>>;

#[derive(Debug)]
enum ReconcileRequest {
    Dirty(Option<DirtyRegion>),
    Flush(mpsc::Sender<()>),
    Stop,
}

/// Handle to the background reconciler.
///
/// The thread runs the initial pass as soon as it starts, then one partial pass per (coalesced)
/// dirty region it is sent.
pub struct ReconcilerThread {
    tx: mpsc::Sender<ReconcileRequest>,
    monitor: ProgressMonitor,
    handle: Option<JoinHandle<()>>,
}

impl ReconcilerThread {
    /// Start reconciling `document` with `reconciler`.
    pub fn spawn(reconciler: Reconciler, document: SharedDocument) -> io::Result<Self> {
        let monitor = reconciler.monitor().clone();
        let (tx, rx) = mpsc::channel::<ReconcileRequest>();
        let handle = thread::Builder::new()
            .name("twee-reconciler".to_string())
            .spawn(move || reconcile_loop(reconciler, document, rx))?;
        Ok(Self {
            tx,
            monitor,
            handle: Some(handle),
        })
    }

    /// Queue a partial pass; `None` re-analyzes the whole document.
    pub fn dirty(&self, dirty: Option<DirtyRegion>) -> io::Result<()> {
        self.send(ReconcileRequest::Dirty(dirty))
    }

    /// Cancel the running pass, if it polls for cancellation.
    pub fn cancel(&self) {
        self.monitor.cancel();
    }

    /// Block until every request sent so far has been processed.
    pub fn flush(&self) -> io::Result<()> {
        let (ack_tx, ack_rx) = mpsc::channel();
        self.send(ReconcileRequest::Flush(ack_tx))?;
        ack_rx
            .recv()
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "reconciler thread stopped"))
    }

    /// Process pending requests, then stop the thread and wait for it.
    pub fn shutdown(mut self) {
        self.stop_and_join();
    }

    fn send(&self, request: ReconcileRequest) -> io::Result<()> {
        self.tx
            .send(request)
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "reconciler thread stopped"))
    }

    fn stop_and_join(&mut self) {
        let _ = self.tx.send(ReconcileRequest::Stop);
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            tracing::warn!("reconciler thread panicked");
        }
    }
}

impl Drop for ReconcilerThread {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}

fn reconcile_loop(
    mut reconciler: Reconciler,
    document: SharedDocument,
    rx: mpsc::Receiver<ReconcileRequest>,
) {
    match document.read() {
        Ok(doc) => reconciler.initial_pass(&*doc, &*doc),
        Err(_) => return,
    }

    let mut queue = DirtyRegionQueue::new();
    let mut acks: Vec<mpsc::Sender<()>> = Vec::new();
    while let Ok(first) = rx.recv() {
        let mut stop = false;
        for request in std::iter::once(first).chain(rx.try_iter()) {
            match request {
                ReconcileRequest::Dirty(dirty) => queue.add(dirty),
                ReconcileRequest::Flush(ack) => acks.push(ack),
                ReconcileRequest::Stop => stop = true,
            }
        }

        while let Some(dirty) = queue.next() {
            let Ok(doc) = document.read() else {
                return;
            };
            let len = doc.len();
            let dirty = dirty.map(|d| {
                let offset = d.offset.min(len);
                DirtyRegion::new(offset, d.length.min(len - offset))
            });
            reconciler.partial_pass(&*doc, &*doc, dirty.as_ref());
        }

        for ack in acks.drain(..) {
            let _ = ack.send(());
        }
        if stop {
            break;
        }
    }
    tracing::debug!("reconciler thread exiting");
}
