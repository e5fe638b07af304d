//! Named two-byte regions shared with other processes.

use crate::{AffineIoError, AffineIoResult};
use affine_protocol::PublishedState;
use std::sync::atomic::{AtomicU8, Ordering};

/// Storage behind a [`crate::StatePublisher`].
///
/// The two bytes are stored independently, so a reader in another process
/// may observe a record whose halves come from different updates.
pub trait SharedRegion: Send + Sync {
    fn store(&self, bytes: [u8; PublishedState::SIZE]);

    fn load(&self) -> [u8; PublishedState::SIZE];

    fn name(&self) -> &str;
}

/// Process-local region, used when cross-process publication is unavailable
/// and in tests.
#[derive(Debug, Default)]
pub struct LocalRegion {
    name: String,
    bytes: [AtomicU8; PublishedState::SIZE],
}

impl LocalRegion {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bytes: Default::default(),
        }
    }
}

impl SharedRegion for LocalRegion {
    fn store(&self, bytes: [u8; PublishedState::SIZE]) {
        for (cell, byte) in self.bytes.iter().zip(bytes) {
            cell.store(byte, Ordering::Release);
        }
    }

    fn load(&self) -> [u8; PublishedState::SIZE] {
        let [a, b] = &self.bytes;
        [a.load(Ordering::Acquire), b.load(Ordering::Acquire)]
    }

    fn name(&self) -> &str {
        &self.name
    }
}

pub use shmem::ShmemRegion;

mod shmem {
    #![expect(unsafe_code, reason = "maps a named OS shared memory section")]

    use super::*;
    use shared_memory::{Shmem, ShmemConf, ShmemError};
    use tracing::debug;

    /// OS shared memory section of exactly two bytes.
    ///
    /// The section is created if it does not exist yet, otherwise the
    /// existing one is opened, so publisher and readers can start in any
    /// order.
    pub struct ShmemRegion {
        shmem: Shmem,
        name: String,
    }

    // SAFETY: `Shmem` is only a mapping handle. All access to the mapped bytes
    // goes through `AtomicU8`, so sharing the handle between threads cannot
    // produce a data race inside this process.
    unsafe impl Send for ShmemRegion {}
    // SAFETY: see the `Send` impl above.
    unsafe impl Sync for ShmemRegion {}

    impl ShmemRegion {
        /// Creates or opens the section called `name`.
        ///
        /// # Errors
        ///
        /// Returns [`AffineIoError::SharedRegion`] if the section cannot be
        /// mapped or is smaller than two bytes.
        pub fn create_or_open(name: &str) -> AffineIoResult<Self> {
            let os_id = os_id(name);
            let shmem = match ShmemConf::new()
                .size(PublishedState::SIZE)
                .os_id(&os_id)
                .create()
            {
                Ok(shmem) => shmem,
                Err(ShmemError::MappingIdExists) => {
                    debug!("Shared region {} exists, opening", name);
                    ShmemConf::new()
                        .os_id(&os_id)
                        .open()
                        .map_err(|e| region_error(name, &e))?
                }
                Err(e) => return Err(region_error(name, &e)),
            };

            if shmem.len() < PublishedState::SIZE {
                return Err(AffineIoError::SharedRegion {
                    name: name.to_string(),
                    reason: format!("mapping is only {} bytes", shmem.len()),
                });
            }

            Ok(Self {
                shmem,
                name: name.to_string(),
            })
        }

        fn cell(&self, index: usize) -> &AtomicU8 {
            let ptr = self.shmem.as_ptr().wrapping_add(index);
            // SAFETY: `index < PublishedState::SIZE <= shmem.len()` (checked at
            // construction), the mapping outlives `&self`, and `AtomicU8` has
            // the size and alignment of `u8`.
            unsafe { AtomicU8::from_ptr(ptr) }
        }
    }

    impl SharedRegion for ShmemRegion {
        fn store(&self, bytes: [u8; PublishedState::SIZE]) {
            for (index, byte) in bytes.into_iter().enumerate() {
                self.cell(index).store(byte, Ordering::Release);
            }
        }

        fn load(&self) -> [u8; PublishedState::SIZE] {
            [
                self.cell(0).load(Ordering::Acquire),
                self.cell(1).load(Ordering::Acquire),
            ]
        }

        fn name(&self) -> &str {
            &self.name
        }
    }

    fn region_error(name: &str, err: &ShmemError) -> AffineIoError {
        AffineIoError::SharedRegion {
            name: name.to_string(),
            reason: err.to_string(),
        }
    }

    #[cfg(unix)]
    fn os_id(name: &str) -> String {
        format!("/{name}")
    }

    #[cfg(not(unix))]
    fn os_id(name: &str) -> String {
        name.to_string()
    }
}
