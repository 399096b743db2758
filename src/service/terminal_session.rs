/// A live shell bound to one PTY and one client connection
use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::unix::AsyncFd;
use tokio::process::Child;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

use crate::app_state::{RegisteredSession, SessionRegistry};
use crate::config::SessionConfig;
use crate::protocol::{ClientSink, closing_notification};
use crate::pty::{PtyError, PtyMaster, SpawnedPty, WindowSize};
use crate::service::SessionError;

type SharedMaster = Arc<AsyncFd<PtyMaster>>;

enum MasterState {
    /// Constructed, pumps not running yet
    Idle(PtyMaster),
    /// Registered with the reactor and shared with the pumps
    Live(SharedMaster),
    Closed,
}

#[derive(Default)]
struct Pumps {
    reader: Option<JoinHandle<()>>,
    forwarder: Option<JoinHandle<()>>,
    writer: Option<JoinHandle<()>>,
    monitor: Option<JoinHandle<()>>,
}

/// One shell process, its PTY master descriptor and the client it talks to.
///
/// Built with [`TerminalSession::new`] and brought to life with
/// [`TerminalSession::start`], which registers the descriptor with the reactor
/// and spawns the pumps:
///
/// * reader: waits for readability, reads at most `read_chunk_size` bytes per
///   wakeup and queues the chunk for the forwarder
/// * forwarder: drains that queue in order and sends each chunk to the client
///   as a binary frame
/// * writer: drains the input queue in order and writes each chunk to the PTY
/// * monitor: waits for the shell to exit, runs cleanup, notifies the client
///   and leaves the registry
///
/// Cleanup runs at most once no matter which path triggers it.
pub struct TerminalSession {
    id: Uuid,
    pid: Option<u32>,
    sink: Arc<dyn ClientSink>,
    registry: SessionRegistry,
    read_chunk_size: usize,
    kill_timeout: Duration,
    master: Mutex<MasterState>,
    child: tokio::sync::Mutex<Child>,
    closed: AtomicBool,
    input_tx: UnboundedSender<Bytes>,
    input_rx: Mutex<Option<UnboundedReceiver<Bytes>>>,
    pumps: Mutex<Pumps>,
}

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl TerminalSession {
    pub fn new(
        spawned: SpawnedPty,
        sink: Arc<dyn ClientSink>,
        registry: SessionRegistry,
        config: &SessionConfig,
    ) -> Arc<Self> {
        let SpawnedPty { master, child } = spawned;
        let (input_tx, input_rx) = mpsc::unbounded_channel();

        Arc::new(Self {
            id: Uuid::new_v4(),
            pid: child.id(),
            sink,
            registry,
            read_chunk_size: config.read_chunk_size,
            kill_timeout: config.kill_timeout(),
            master: Mutex::new(MasterState::Idle(master)),
            child: tokio::sync::Mutex::new(child),
            closed: AtomicBool::new(false),
            input_tx,
            input_rx: Mutex::new(Some(input_rx)),
            pumps: Mutex::new(Pumps::default()),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Register the master descriptor with the reactor and spawn the pumps.
    /// Calling it again, or after cleanup, does nothing.
    pub fn start(self: &Arc<Self>) -> Result<(), SessionError> {
        let mut pumps = locked(&self.pumps);
        if self.is_closed() {
            return Ok(());
        }

        let master = {
            let mut state = locked(&self.master);
            match std::mem::replace(&mut *state, MasterState::Closed) {
                MasterState::Idle(master) => {
                    let fd = Arc::new(AsyncFd::new(master).map_err(PtyError::Io)?);
                    *state = MasterState::Live(fd.clone());
                    fd
                }
                other => {
                    *state = other;
                    return Ok(());
                }
            }
        };
        let Some(input_rx) = locked(&self.input_rx).take() else {
            return Ok(());
        };

        let (output_tx, output_rx) = mpsc::unbounded_channel();
        pumps.reader = Some(tokio::spawn(read_pump(
            self.id,
            master.clone(),
            output_tx,
            self.read_chunk_size,
        )));
        pumps.forwarder = Some(tokio::spawn(forward_pump(
            self.id,
            output_rx,
            self.sink.clone(),
        )));
        pumps.writer = Some(tokio::spawn(write_pump(self.id, master, input_rx)));
        pumps.monitor = Some(tokio::spawn(self.clone().monitor()));

        info!("Terminal session {} started (pid {:?})", self.id, self.pid);
        Ok(())
    }

    /// Queue bytes for the shell. Dropped silently once the session is closed.
    pub fn write(&self, data: Bytes) {
        if self.is_closed() {
            debug!("Session {}: dropping {} bytes written after close", self.id, data.len());
            return;
        }
        if self.input_tx.send(data).is_err() {
            debug!("Session {}: write pump is gone, input dropped", self.id);
        }
    }

    /// Apply a new window size right away. No-op after cleanup.
    pub fn resize(&self, size: WindowSize) -> Result<(), SessionError> {
        let state = locked(&self.master);
        match &*state {
            MasterState::Idle(master) => master.resize(size)?,
            MasterState::Live(fd) => fd.get_ref().resize(size)?,
            MasterState::Closed => {
                debug!("Session {}: resize ignored, descriptor closed", self.id);
                return Ok(());
            }
        }
        debug!("Session {}: resized to {}x{}", self.id, size.rows, size.cols);
        Ok(())
    }

    /// Stop the pumps and release the master descriptor. Runs at most once.
    ///
    /// Does not touch the shell process; the descriptor itself is closed when
    /// the last cancelled pump releases its handle.
    fn cleanup(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        let master = std::mem::replace(&mut *locked(&self.master), MasterState::Closed);
        {
            let mut pumps = locked(&self.pumps);
            for handle in [
                pumps.reader.take(),
                pumps.forwarder.take(),
                pumps.writer.take(),
            ]
            .into_iter()
            .flatten()
            {
                handle.abort();
            }
        }
        drop(master);
        debug!("Session {}: I/O cleaned up", self.id);
    }

    async fn monitor(self: Arc<Self>) {
        let status = {
            let mut child = self.child.lock().await;
            child.wait().await
        };
        let code = match status {
            Ok(status) => exit_code(status),
            Err(e) => {
                error!("Session {}: failed to wait for shell: {}", self.id, e);
                -1
            }
        };
        info!("Process finished with return code {}", code);

        self.cleanup();

        if let Err(e) = self.sink.send_binary(closing_notification(code)).await {
            debug!("Could not send close notification, connection lost: {}", e);
        }
        self.registry.remove(self.id);

        if let Err(e) = self.sink.close().await {
            debug!("Session {}: client channel already closed: {}", self.id, e);
        }
    }

    /// Tear the session down and make sure the shell is gone.
    ///
    /// Idempotent: later calls, and calls after the shell exited on its own,
    /// return `Ok(())` without signalling anything.
    pub async fn close(&self) -> Result<(), SessionError> {
        if let Some(monitor) = locked(&self.pumps).monitor.take() {
            monitor.abort();
        }
        self.cleanup();

        let result = self.terminate().await;
        self.registry.remove(self.id);
        result
    }

    async fn terminate(&self) -> Result<(), SessionError> {
        let mut child = self.child.lock().await;
        if child
            .try_wait()
            .map_err(SessionError::KillFailed)?
            .is_some()
        {
            return Ok(());
        }

        child.start_kill().map_err(SessionError::KillFailed)?;
        match tokio::time::timeout(self.kill_timeout, child.wait()).await {
            Ok(Ok(status)) => {
                info!(
                    "Session {}: shell killed, exit code {}",
                    self.id,
                    exit_code(status)
                );
            }
            Ok(Err(e)) => {
                warn!("Session {}: failed to reap killed shell: {}", self.id, e);
            }
            Err(_) => {
                warn!("Process {:?} did not exit after kill", self.pid);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl RegisteredSession for TerminalSession {
    fn id(&self) -> Uuid {
        self.id
    }

    async fn close(&self) -> Result<(), SessionError> {
        TerminalSession::close(self).await
    }
}

/// Exit code of the shell; a signal-terminated shell reports `-signal`
pub fn exit_code(status: ExitStatus) -> i32 {
    status
        .code()
        .unwrap_or_else(|| -status.signal().unwrap_or(0))
}

async fn read_pump(
    id: Uuid,
    master: SharedMaster,
    output_tx: UnboundedSender<Bytes>,
    chunk_size: usize,
) {
    let mut buf = vec![0u8; chunk_size];
    loop {
        let mut guard = match master.readable().await {
            Ok(guard) => guard,
            Err(e) => {
                error!("Session {}: PTY readiness error: {}", id, e);
                return;
            }
        };

        match guard.try_io(|inner| inner.get_ref().read(&mut buf)) {
            Ok(Ok(0)) => {
                debug!("Session {}: PTY reached EOF", id);
                return;
            }
            Ok(Ok(n)) => {
                trace!("Session {}: read {} bytes from PTY", id, n);
                if output_tx.send(Bytes::copy_from_slice(&buf[..n])).is_err() {
                    return;
                }
            }
            Ok(Err(e)) => {
                // EIO once the slave side is gone
                debug!("Session {}: PTY read stopped: {}", id, e);
                return;
            }
            Err(_would_block) => continue,
        }
    }
}

async fn forward_pump(
    id: Uuid,
    mut output_rx: UnboundedReceiver<Bytes>,
    sink: Arc<dyn ClientSink>,
) {
    while let Some(chunk) = output_rx.recv().await {
        if let Err(e) = sink.send_binary(chunk).await {
            error!("Session {}: error in terminal read task: {}", id, e);
            return;
        }
    }
}

async fn write_pump(id: Uuid, master: SharedMaster, mut input_rx: UnboundedReceiver<Bytes>) {
    while let Some(chunk) = input_rx.recv().await {
        if let Err(e) = write_all(&master, &chunk).await {
            error!("Session {}: error in terminal write task: {}", id, e);
            return;
        }
        trace!("Session {}: wrote {} bytes to PTY", id, chunk.len());
    }
}

async fn write_all(master: &AsyncFd<PtyMaster>, mut data: &[u8]) -> std::io::Result<()> {
    while !data.is_empty() {
        let mut guard = master.writable().await?;
        match guard.try_io(|inner| inner.get_ref().write(data)) {
            Ok(Ok(0)) => {
                return Err(std::io::ErrorKind::WriteZero.into());
            }
            Ok(Ok(n)) => data = &data[n..],
            Ok(Err(e)) => return Err(e),
            Err(_would_block) => continue,
        }
    }
    Ok(())
}
