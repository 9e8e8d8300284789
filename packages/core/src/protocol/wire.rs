// Wire format: примитивы бинарной раскладки сообщений
// LEB128 varint для счётчиков и id, курсор для разбора входящих байт

use crate::crypto::keys::{PublicKey, KEY_LENGTH};
use crate::error::{Result, SessionError};

/// Дописать u32 как LEB128 varint (1..=5 байт)
pub fn write_varint(buffer: &mut Vec<u8>, mut value: u32) {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            buffer.push(byte);
            return;
        }
        buffer.push(byte | 0x80);
    }
}

/// Курсор по входящему сообщению; любая нехватка байт это `InvalidMessage`
pub struct ByteReader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let byte = *self
            .data
            .get(self.position)
            .ok_or_else(|| truncated("byte"))?;
        self.position += 1;
        Ok(byte)
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .position
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| truncated("bytes"))?;
        let slice = &self.data[self.position..end];
        self.position = end;
        Ok(slice)
    }

    pub fn read_public_key(&mut self) -> Result<PublicKey> {
        PublicKey::from_bytes(self.read_bytes(KEY_LENGTH)?)
    }

    pub fn read_varint(&mut self) -> Result<u32> {
        let mut value: u32 = 0;
        for shift in (0..35).step_by(7) {
            let byte = self.read_u8()?;
            let bits = (byte & 0x7F) as u32;
            if shift == 28 && bits > 0x0F {
                return Err(SessionError::InvalidMessage("varint overflows u32".to_string()));
            }
            value |= bits << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(SessionError::InvalidMessage("varint too long".to_string()))
    }

    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.position..]
    }
}

fn truncated(what: &str) -> SessionError {
    SessionError::InvalidMessage(format!("truncated message: expected more {}", what))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_varint_encoding() {
        let mut buffer = Vec::new();
        write_varint(&mut buffer, 0);
        write_varint(&mut buffer, 300);
        write_varint(&mut buffer, u32::MAX);
        assert_eq!(&buffer[..3], &[0x00, 0xAC, 0x02]);
        assert_eq!(buffer.len(), 1 + 2 + 5);

        let mut reader = ByteReader::new(&buffer);
        assert_eq!(reader.read_varint().unwrap(), 0);
        assert_eq!(reader.read_varint().unwrap(), 300);
        assert_eq!(reader.read_varint().unwrap(), u32::MAX);
        assert!(reader.remaining().is_empty());
    }

    #[test]
    fn test_varint_rejects_overflow_and_truncation() {
        let mut reader = ByteReader::new(&[0xFF, 0xFF, 0xFF, 0xFF, 0x7F]);
        assert!(matches!(reader.read_varint(), Err(SessionError::InvalidMessage(_))));

        let mut reader = ByteReader::new(&[0x80, 0x80]);
        assert!(matches!(reader.read_varint(), Err(SessionError::InvalidMessage(_))));
    }

    #[test]
    fn test_read_bytes_bounds() {
        let data = [1u8, 2, 3];
        let mut reader = ByteReader::new(&data);
        assert_eq!(reader.read_bytes(2).unwrap(), &[1, 2]);
        assert!(reader.read_bytes(2).is_err());
        assert_eq!(reader.read_u8().unwrap(), 3);
        assert!(reader.read_u8().is_err());
    }
}
