//! Serial transport traits

use crate::{PortInfo, SerialError, SerialResult, SerialSettings};

/// An open serial connection to one board.
pub trait SerialPort: Send {
    fn name(&self) -> &str;

    /// Reads whatever arrives within the read timeout into `buf`.
    ///
    /// Returns `Ok(0)` if nothing arrived. Any error means the link is gone.
    fn read(&mut self, buf: &mut [u8]) -> SerialResult<usize>;

    /// Writes the whole of `data` within the write deadline or fails.
    fn write_all(&mut self, data: &[u8]) -> SerialResult<()>;

    /// Opens a second handle to the same port so reads and writes can be
    /// issued from different threads.
    fn try_clone(&self) -> SerialResult<Box<dyn SerialPort>>;
}

/// Enumerates and opens serial ports.
pub trait PortProvider: Send + Sync {
    fn list_ports(&self) -> SerialResult<Vec<PortInfo>>;

    fn open(&self, port: &PortInfo, settings: &SerialSettings)
    -> SerialResult<Box<dyn SerialPort>>;

    /// Returns the first port whose USB IDs match.
    fn find(&self, vendor_id: u16, product_id: u16) -> SerialResult<PortInfo> {
        self.list_ports()?
            .into_iter()
            .find(|port| port.matches(vendor_id, product_id))
            .ok_or(SerialError::PortNotFound {
                vendor_id,
                product_id,
            })
    }
}

pub mod mock {
    //! In-memory transport for tests.
    //!
    //! A [`MockBoard`] is the test-side handle of a simulated device: bytes
    //! queued on it are returned by reads, and every frame written by the
    //! code under test is recorded.

    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Default)]
    struct Link {
        rx: Mutex<VecDeque<u8>>,
        writes: Mutex<Vec<Vec<u8>>>,
        unplugged: AtomicBool,
        fail_writes: AtomicBool,
        opens: AtomicUsize,
    }

    /// Test-side handle of a simulated board.
    #[derive(Clone)]
    pub struct MockBoard {
        info: PortInfo,
        link: Arc<Link>,
    }

    impl MockBoard {
        pub fn new(info: PortInfo) -> Self {
            Self {
                info,
                link: Arc::new(Link::default()),
            }
        }

        pub fn info(&self) -> &PortInfo {
            &self.info
        }

        /// Queues bytes to be returned by subsequent reads.
        pub fn queue_read(&self, data: &[u8]) {
            let mut rx = self.link.rx.lock().unwrap_or_else(|e| e.into_inner());
            rx.extend(data.iter().copied());
        }

        pub fn pending_reads(&self) -> usize {
            self.link.rx.lock().unwrap_or_else(|e| e.into_inner()).len()
        }

        /// Every frame written so far, oldest first.
        pub fn written(&self) -> Vec<Vec<u8>> {
            let writes = self.link.writes.lock().unwrap_or_else(|e| e.into_inner());
            writes.clone()
        }

        /// Written frames whose command byte equals `command`.
        pub fn written_commands(&self, command: u8) -> Vec<Vec<u8>> {
            self.written()
                .into_iter()
                .filter(|frame| frame.get(1) == Some(&command))
                .collect()
        }

        pub fn clear_written(&self) {
            self.link
                .writes
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .clear();
        }

        /// Simulates pulling the cable: open handles fail and the port
        /// disappears from enumeration.
        pub fn unplug(&self) {
            self.link.unplugged.store(true, Ordering::SeqCst);
            self.link
                .rx
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .clear();
        }

        pub fn plug(&self) {
            self.link.unplugged.store(false, Ordering::SeqCst);
        }

        pub fn is_plugged(&self) -> bool {
            !self.link.unplugged.load(Ordering::SeqCst)
        }

        /// Makes writes fail while the board still enumerates.
        pub fn set_fail_writes(&self, fail: bool) {
            self.link.fail_writes.store(fail, Ordering::SeqCst);
        }

        /// Number of successful opens through a provider.
        pub fn open_count(&self) -> usize {
            self.link.opens.load(Ordering::SeqCst)
        }

        fn handle(&self) -> MockSerialPort {
            MockSerialPort {
                name: self.info.port_name.clone(),
                link: Arc::clone(&self.link),
            }
        }
    }

    /// Code-side handle returned by [`MockPortProvider::open`].
    pub struct MockSerialPort {
        name: String,
        link: Arc<Link>,
    }

    impl MockSerialPort {
        fn check_plugged(&self) -> SerialResult<()> {
            if self.link.unplugged.load(Ordering::SeqCst) {
                return Err(SerialError::Disconnected);
            }
            Ok(())
        }
    }

    impl SerialPort for MockSerialPort {
        fn name(&self) -> &str {
            &self.name
        }

        fn read(&mut self, buf: &mut [u8]) -> SerialResult<usize> {
            self.check_plugged()?;
            let count = {
                let mut rx = self.link.rx.lock().unwrap_or_else(|e| e.into_inner());
                let count = buf.len().min(rx.len());
                for (slot, byte) in buf.iter_mut().zip(rx.drain(..count)) {
                    *slot = byte;
                }
                count
            };
            if count == 0 {
                // Stand-in for the driver's read timeout.
                std::thread::sleep(Duration::from_millis(1));
            }
            Ok(count)
        }

        fn write_all(&mut self, data: &[u8]) -> SerialResult<()> {
            self.check_plugged()?;
            if self.link.fail_writes.load(Ordering::SeqCst) {
                return Err(SerialError::WriteFailed("injected failure".to_string()));
            }
            let mut writes = self.link.writes.lock().unwrap_or_else(|e| e.into_inner());
            writes.push(data.to_vec());
            Ok(())
        }

        fn try_clone(&self) -> SerialResult<Box<dyn SerialPort>> {
            self.check_plugged()?;
            Ok(Box::new(MockSerialPort {
                name: self.name.clone(),
                link: Arc::clone(&self.link),
            }))
        }
    }

    /// Provider over a fixed set of simulated boards.
    #[derive(Default)]
    pub struct MockPortProvider {
        boards: Mutex<Vec<MockBoard>>,
        last_settings: Mutex<Option<SerialSettings>>,
    }

    impl MockPortProvider {
        pub fn new() -> Self {
            Self::default()
        }

        /// Registers a board and returns its test-side handle.
        pub fn add_board(&self, info: PortInfo) -> MockBoard {
            let board = MockBoard::new(info);
            self.boards
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(board.clone());
            board
        }

        pub fn board_count(&self) -> usize {
            self.boards.lock().unwrap_or_else(|e| e.into_inner()).len()
        }

        /// Settings passed to the most recent successful open.
        pub fn last_settings(&self) -> Option<SerialSettings> {
            self.last_settings
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .clone()
        }
    }

    impl PortProvider for MockPortProvider {
        fn list_ports(&self) -> SerialResult<Vec<PortInfo>> {
            let boards = self.boards.lock().unwrap_or_else(|e| e.into_inner());
            Ok(boards
                .iter()
                .filter(|board| board.is_plugged())
                .map(|board| board.info.clone())
                .collect())
        }

        fn open(
            &self,
            port: &PortInfo,
            settings: &SerialSettings,
        ) -> SerialResult<Box<dyn SerialPort>> {
            let board = {
                let boards = self.boards.lock().unwrap_or_else(|e| e.into_inner());
                boards
                    .iter()
                    .find(|board| board.info.port_name == port.port_name && board.is_plugged())
                    .cloned()
            };
            let board = board.ok_or_else(|| SerialError::OpenFailed {
                port: port.port_name.clone(),
                reason: "no such device".to_string(),
            })?;

            board.link.opens.fetch_add(1, Ordering::SeqCst);
            *self
                .last_settings
                .lock()
                .unwrap_or_else(|e| e.into_inner()) = Some(settings.clone());
            Ok(Box::new(board.handle()))
        }
    }
}
