use std::io;
use std::os::fd::{AsRawFd, OwnedFd};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::task::spawn_blocking;
use tracing::{debug, error, info};

use crate::pty::master::set_cloexec;
use crate::pty::pty_trait::{PtyConfig, PtyError, PtyFactory, SpawnedPty, WindowSize};
use crate::pty::PtyMaster;

nix::ioctl_write_int_bad!(set_controlling_terminal, nix::libc::TIOCSCTTY);

/// Both ends of a freshly opened pseudo-terminal
#[derive(Debug)]
pub struct PtyPair {
    pub master: OwnedFd,
    pub slave: OwnedFd,
}

/// Open a PTY pair. Blocking; call it off the async worker threads.
pub fn allocate(size: WindowSize) -> Result<PtyPair, PtyError> {
    let winsize: nix::pty::Winsize = size.into();
    let pair = nix::pty::openpty(Some(&winsize), None)
        .map_err(|errno| PtyError::Allocation(errno.into()))?;

    // Keep this session's descriptors out of shells spawned for other sessions.
    set_cloexec(pair.master.as_raw_fd()).map_err(PtyError::Allocation)?;
    set_cloexec(pair.slave.as_raw_fd()).map_err(PtyError::Allocation)?;

    Ok(PtyPair {
        master: pair.master,
        slave: pair.slave,
    })
}

/// Launch the shell on the slave side of `pair` as a session leader.
///
/// The parent's copy of the slave descriptor is closed before returning,
/// whether or not the spawn succeeded.
pub fn launch(config: &PtyConfig, pair: PtyPair) -> Result<SpawnedPty, PtyError> {
    info!(
        "NativePty: Launching {:?} with args {:?}",
        config.command, config.args
    );

    let PtyPair { master, slave } = pair;

    let mut cmd = tokio::process::Command::new(&config.command);
    cmd.args(&config.args);
    if let Some(cwd) = &config.cwd {
        cmd.current_dir(cwd);
    }
    for (key, value) in &config.env {
        cmd.env(key, value);
    }

    cmd.stdin(Stdio::from(slave.try_clone().map_err(PtyError::Spawn)?))
        .stdout(Stdio::from(slave.try_clone().map_err(PtyError::Spawn)?))
        .stderr(Stdio::from(slave))
        .kill_on_drop(true);

    // Runs in the child between fork and exec: become a session leader and
    // take the PTY (already on fd 0) as the controlling terminal.
    let become_session_leader = || -> io::Result<()> {
        nix::unistd::setsid()?;
        // SAFETY: fd 0 is the PTY slave installed by the stdio setup above.
        unsafe { set_controlling_terminal(0, 0) }?;
        Ok(())
    };
    // SAFETY: the hook only issues async-signal-safe syscalls.
    unsafe {
        cmd.pre_exec(become_session_leader);
    }

    let spawned = cmd.spawn();
    // Dropping the command closes the parent's copies of the slave descriptor.
    drop(cmd);

    let child = spawned.map_err(|e| {
        error!("NativePty: Failed to spawn {:?}: {}", config.command, e);
        PtyError::Spawn(e)
    })?;
    debug!("NativePty: Spawned child with pid {:?}", child.id());

    Ok(SpawnedPty {
        master: PtyMaster::new(master)?,
        child,
    })
}

// ================ 工厂实现 ================

/// PTY factory backed by openpty(3) and a tokio child process
#[derive(Debug, Default, Clone, Copy)]
pub struct NativePtyFactory;

#[async_trait]
impl PtyFactory for NativePtyFactory {
    async fn spawn(&self, config: &PtyConfig) -> Result<SpawnedPty, PtyError> {
        let size = config.size;
        let pair = spawn_blocking(move || allocate(size))
            .await
            .map_err(|e| PtyError::BackgroundTask(e.to_string()))??;

        launch(config, pair)
    }

    fn name(&self) -> &'static str {
        "native-pty"
    }
}
