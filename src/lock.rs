//! Single-instance guard.
//!
//! On Windows this is a named kernel mutex; elsewhere an advisory lock on a
//! file in the temp directory stands in for it. Either way the lock lives as
//! long as the returned [`InstanceLock`] or the process, whichever ends first.

use std::io;

pub const MUTEX_NAME: &str = "Global\\ODISAuthMutex";

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("already running")]
    AlreadyRunning,

    #[error("could not create instance lock {0}: {1}")]
    Create(String, #[source] io::Error),
}

#[derive(Debug)]
pub struct InstanceLock {
    inner: imp::Lock,
}

impl InstanceLock {
    pub fn acquire(name: &str) -> Result<Self, LockError> {
        let inner = imp::Lock::acquire(name)?;
        tracing::debug!(name, "instance lock acquired");

        Ok(Self { inner })
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }
}

#[cfg(windows)]
mod imp {
    use std::{ffi::OsStr, io, iter, os::windows::ffi::OsStrExt};

    use windows::{
        core::PCWSTR,
        Win32::{
            Foundation::{CloseHandle, GetLastError, BOOL, ERROR_ALREADY_EXISTS, HANDLE},
            System::Threading::CreateMutexW,
        },
    };

    use super::LockError;

    #[derive(Debug)]
    pub struct Lock {
        name: String,
        handle: HANDLE,
    }

    impl Lock {
        pub fn acquire(name: &str) -> Result<Self, LockError> {
            let name_w: Vec<u16> = OsStr::new(name)
                .encode_wide()
                .chain(iter::once(0))
                .collect();

            // SAFETY: name_w is NUL terminated and outlives the call.
            let handle = unsafe {
                CreateMutexW(None, BOOL::from(false), PCWSTR::from_raw(name_w.as_ptr()))
            }
            .map_err(|e| LockError::Create(name.to_string(), io::Error::other(e)))?;

            // SAFETY: reads the calling thread's last-error value only.
            if unsafe { GetLastError() } == ERROR_ALREADY_EXISTS {
                // SAFETY: handle was just returned by CreateMutexW.
                let _ = unsafe { CloseHandle(handle) };
                return Err(LockError::AlreadyRunning);
            }

            Ok(Self {
                name: name.to_string(),
                handle,
            })
        }

        pub fn name(&self) -> &str {
            &self.name
        }
    }

    impl Drop for Lock {
        fn drop(&mut self) {
            // SAFETY: the handle is owned by this lock and closed exactly once.
            let _ = unsafe { CloseHandle(self.handle) };
        }
    }
}

#[cfg(not(windows))]
mod imp {
    use std::{
        env,
        fs::{File, OpenOptions},
        io::{self, Write},
        path::PathBuf,
    };

    use fs2::FileExt;

    use super::LockError;

    /// The file is never removed; only the advisory lock on it matters, and
    /// the kernel drops that when the holder exits for any reason.
    #[derive(Debug)]
    pub struct Lock {
        name: String,
        _file: File,
    }

    pub(super) fn lock_path(name: &str) -> PathBuf {
        let file_name: String = name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();

        env::temp_dir().join(format!("{file_name}.lock"))
    }

    impl Lock {
        pub fn acquire(name: &str) -> Result<Self, LockError> {
            let create = |e: io::Error| LockError::Create(name.to_string(), e);

            let mut file = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false)
                .open(lock_path(name))
                .map_err(create)?;

            file.try_lock_exclusive().map_err(|e| {
                if e.kind() == fs2::lock_contended_error().kind() {
                    LockError::AlreadyRunning
                } else {
                    create(e)
                }
            })?;

            // pid is informational only
            let _ = file.set_len(0);
            let _ = writeln!(file, "{}", std::process::id());

            Ok(Self {
                name: name.to_string(),
                _file: file,
            })
        }

        pub fn name(&self) -> &str {
            &self.name
        }
    }
}
