use super::{checked_range, ByteSource};
use crate::error::Result;

/// In-memory backend over an owned buffer.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    data: Vec<u8>,
}

impl MemoryBackend {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self { data: data.into() }
    }
}

impl ByteSource for MemoryBackend {
    fn len(&self) -> u64 {
        self.data.len() as u64
    }

    fn view(&self, offset: u64, length: u64) -> Result<&[u8]> {
        let range = checked_range(offset, length, self.len())?;
        Ok(&self.data[range])
    }
}
