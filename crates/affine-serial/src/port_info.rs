//! Enumerated serial port descriptions.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortInfo {
    /// OS name of the port (`COM7`, `/dev/ttyACM0`).
    pub port_name: String,
    pub vendor_id: u16,
    pub product_id: u16,
    pub serial_number: Option<String>,
    pub manufacturer: Option<String>,
    pub product_name: Option<String>,
}

impl PortInfo {
    pub fn new(port_name: impl Into<String>, vendor_id: u16, product_id: u16) -> Self {
        Self {
            port_name: port_name.into(),
            vendor_id,
            product_id,
            serial_number: None,
            manufacturer: None,
            product_name: None,
        }
    }

    pub fn with_serial(mut self, serial: impl Into<String>) -> Self {
        self.serial_number = Some(serial.into());
        self
    }

    pub fn with_manufacturer(mut self, manufacturer: impl Into<String>) -> Self {
        self.manufacturer = Some(manufacturer.into());
        self
    }

    pub fn with_product_name(mut self, name: impl Into<String>) -> Self {
        self.product_name = Some(name.into());
        self
    }

    pub fn matches(&self, vendor_id: u16, product_id: u16) -> bool {
        self.vendor_id == vendor_id && self.product_id == product_id
    }

    pub fn display_name(&self) -> String {
        let label = self
            .product_name
            .clone()
            .or_else(|| self.manufacturer.clone())
            .unwrap_or_else(|| format!("{:04X}:{:04X}", self.vendor_id, self.product_id));
        format!("{} ({label})", self.port_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_info_matches() {
        let info = PortInfo::new("COM7", 0xAFF1, 0x52A5);
        assert!(info.matches(0xAFF1, 0x52A5));
        assert!(!info.matches(0xAFF1, 0x52A6));
    }

    #[test]
    fn test_display_name_fallbacks() {
        let info = PortInfo::new("COM7", 0xAFF1, 0x52A5).with_product_name("Affine P1");
        assert_eq!(info.display_name(), "COM7 (Affine P1)");

        let info = PortInfo::new("COM8", 0xAFF1, 0x52A6).with_manufacturer("Affine");
        assert_eq!(info.display_name(), "COM8 (Affine)");

        let info = PortInfo::new("/dev/ttyACM0", 0xAFF1, 0x52A6);
        assert_eq!(info.display_name(), "/dev/ttyACM0 (AFF1:52A6)");
    }
}
