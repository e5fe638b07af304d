//! Board info (firmware identification) payload.

use crate::{ProtocolError, ProtocolResult};

/// Longest version string kept for display.
pub const VERSION_DISPLAY_MAX: usize = 31;

/// Firmware identification returned by a board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardInfo {
    pub version: String,
}

impl BoardInfo {
    /// Parses a board info payload: `[ver_len][version bytes]...`.
    ///
    /// Trailing bytes after the version are ignored. Versions longer than
    /// [`VERSION_DISPLAY_MAX`] are truncated.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is empty, the declared version length
    /// is zero, or the version runs past the end of the payload.
    pub fn parse(payload: &[u8]) -> ProtocolResult<Self> {
        let (&declared, rest) = payload
            .split_first()
            .ok_or(ProtocolError::EmptyBoardInfo)?;
        let declared = usize::from(declared);
        if declared == 0 {
            return Err(ProtocolError::ZeroLengthVersion);
        }
        let raw = rest.get(..declared).ok_or(ProtocolError::BoardInfoOverrun {
            declared,
            available: rest.len(),
        })?;
        let shown = raw.get(..VERSION_DISPLAY_MAX).unwrap_or(raw);
        Ok(Self {
            version: String::from_utf8_lossy(shown).into_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_version() -> ProtocolResult<()> {
        let info = BoardInfo::parse(&[4, b'1', b'.', b'2', b'3'])?;
        assert_eq!(info.version, "1.23");
        Ok(())
    }

    #[test]
    fn test_parse_ignores_trailing_bytes() -> ProtocolResult<()> {
        let info = BoardInfo::parse(&[2, b'v', b'9', 0xAA, 0xBB])?;
        assert_eq!(info.version, "v9");
        Ok(())
    }

    #[test]
    fn test_parse_truncates_long_version() -> ProtocolResult<()> {
        let mut payload = vec![40u8];
        payload.extend(std::iter::repeat_n(b'x', 40));
        let info = BoardInfo::parse(&payload)?;
        assert_eq!(info.version.len(), VERSION_DISPLAY_MAX);
        Ok(())
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert_eq!(BoardInfo::parse(&[]), Err(ProtocolError::EmptyBoardInfo));
        assert_eq!(BoardInfo::parse(&[0, b'a']), Err(ProtocolError::ZeroLengthVersion));
        assert_eq!(
            BoardInfo::parse(&[5, b'a', b'b']),
            Err(ProtocolError::BoardInfoOverrun {
                declared: 5,
                available: 2
            })
        );
    }
}
