//! Operating system serial ports via the `serialport` crate.

use crate::{PortInfo, PortProvider, SerialError, SerialPort, SerialResult, SerialSettings};
use std::io::{ErrorKind, Read, Write};
use std::time::Instant;
use tracing::{debug, trace};

/// Enumerates USB serial devices and opens them with `serialport`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemPortProvider;

impl SystemPortProvider {
    pub fn new() -> Self {
        Self
    }
}

impl PortProvider for SystemPortProvider {
    fn list_ports(&self) -> SerialResult<Vec<PortInfo>> {
        let ports = serialport::available_ports()
            .map_err(|e| SerialError::Enumeration(e.to_string()))?;

        Ok(ports
            .into_iter()
            .filter_map(|port| match port.port_type {
                serialport::SerialPortType::UsbPort(usb) => {
                    let mut info = PortInfo::new(port.port_name, usb.vid, usb.pid);
                    info.serial_number = usb.serial_number;
                    info.manufacturer = usb.manufacturer;
                    info.product_name = usb.product;
                    Some(info)
                }
                _ => None,
            })
            .collect())
    }

    fn open(
        &self,
        port: &PortInfo,
        settings: &SerialSettings,
    ) -> SerialResult<Box<dyn SerialPort>> {
        let open_failed = |e: serialport::Error| SerialError::OpenFailed {
            port: port.port_name.clone(),
            reason: e.to_string(),
        };

        let mut inner = serialport::new(&port.port_name, settings.baud_rate)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .timeout(settings.read_timeout())
            .open()
            .map_err(open_failed)?;

        if settings.assert_dtr {
            inner.write_data_terminal_ready(true).map_err(open_failed)?;
        }
        if settings.assert_rts {
            inner.write_request_to_send(true).map_err(open_failed)?;
        }
        if let Err(e) = inner.clear(serialport::ClearBuffer::All) {
            debug!(port = %port.port_name, error = %e, "Failed to purge serial buffers");
        }

        debug!(port = %port.port_name, baud = settings.baud_rate, "Serial port opened");
        Ok(Box::new(SystemSerialPort {
            name: port.port_name.clone(),
            inner,
            settings: settings.clone(),
        }))
    }
}

/// A port opened by [`SystemPortProvider`].
pub struct SystemSerialPort {
    name: String,
    inner: Box<dyn serialport::SerialPort>,
    settings: SerialSettings,
}

impl SerialPort for SystemSerialPort {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&mut self, buf: &mut [u8]) -> SerialResult<usize> {
        match self.inner.read(buf) {
            Ok(n) => Ok(n),
            Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::Interrupted) => Ok(0),
            Err(e) => Err(SerialError::ReadFailed(e.to_string())),
        }
    }

    fn write_all(&mut self, data: &[u8]) -> SerialResult<()> {
        let deadline = Instant::now() + self.settings.write_timeout(data.len());
        let mut written = 0;

        while let Some(rest) = data.get(written..).filter(|rest| !rest.is_empty()) {
            match self.inner.write(rest) {
                Ok(0) => return Err(SerialError::Disconnected),
                Ok(n) => written += n,
                Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::Interrupted) => {
                    trace!(port = %self.name, written, "Serial write stalled");
                }
                Err(e) => return Err(SerialError::WriteFailed(e.to_string())),
            }
            if written < data.len() && Instant::now() >= deadline {
                return Err(SerialError::WriteTimeout {
                    written,
                    total: data.len(),
                });
            }
        }

        self.inner
            .flush()
            .map_err(|e| SerialError::WriteFailed(e.to_string()))
    }

    fn try_clone(&self) -> SerialResult<Box<dyn SerialPort>> {
        let inner = self
            .inner
            .try_clone()
            .map_err(|e| SerialError::OpenFailed {
                port: self.name.clone(),
                reason: e.to_string(),
            })?;
        Ok(Box::new(SystemSerialPort {
            name: self.name.clone(),
            inner,
            settings: self.settings.clone(),
        }))
    }
}
