/// Master side of a pseudo-terminal
use std::fs::File;
use std::io::{self, Read, Write};
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, OwnedFd, RawFd};

use nix::fcntl::{FcntlArg, FdFlag, OFlag, fcntl};

use crate::pty::{PtyError, WindowSize};

nix::ioctl_write_ptr_bad!(set_window_size, nix::libc::TIOCSWINSZ, nix::pty::Winsize);

/// Owned, non-blocking PTY master descriptor.
///
/// The descriptor is closed exactly once, when the value is dropped.
#[derive(Debug)]
pub struct PtyMaster {
    file: File,
}

impl PtyMaster {
    /// Take ownership of a master descriptor and switch it to non-blocking mode
    pub fn new(fd: OwnedFd) -> Result<Self, PtyError> {
        set_cloexec(fd.as_raw_fd()).map_err(PtyError::Allocation)?;
        set_nonblocking(fd.as_raw_fd()).map_err(PtyError::Allocation)?;
        Ok(Self {
            file: File::from(fd),
        })
    }

    /// Apply a new window size (TIOCSWINSZ)
    pub fn resize(&self, size: WindowSize) -> Result<(), PtyError> {
        let winsize: nix::pty::Winsize = size.into();
        // SAFETY: the descriptor is owned by `self` and `winsize` outlives the call.
        unsafe { set_window_size(self.file.as_raw_fd(), &winsize) }
            .map_err(|errno| PtyError::Resize(errno.into()))?;
        Ok(())
    }

    /// Non-blocking read; `WouldBlock` when nothing is buffered
    pub fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        (&self.file).read(buf)
    }

    /// Non-blocking write; `WouldBlock` when the PTY input buffer is full
    pub fn write(&self, buf: &[u8]) -> io::Result<usize> {
        (&self.file).write(buf)
    }
}

impl AsRawFd for PtyMaster {
    fn as_raw_fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }
}

impl AsFd for PtyMaster {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.file.as_fd()
    }
}

pub(crate) fn set_cloexec(fd: RawFd) -> io::Result<()> {
    fcntl(fd, FcntlArg::F_SETFD(FdFlag::FD_CLOEXEC))?;
    Ok(())
}

fn set_nonblocking(fd: RawFd) -> io::Result<()> {
    let flags = fcntl(fd, FcntlArg::F_GETFL)?;
    let flags = OFlag::from_bits_truncate(flags) | OFlag::O_NONBLOCK;
    fcntl(fd, FcntlArg::F_SETFL(flags))?;
    Ok(())
}
