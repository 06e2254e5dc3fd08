//! Checksummed reader/writer over the locked staging-index file.
//!
//! Every byte read or written passes through a running SHA-1 digest, so the
//! index file can carry a 20-byte integrity trailer that is verified on load
//! and refreshed on every write.

use crate::artifacts::index::CHECKSUM_SIZE;
use crate::error::{Error, Result};
use bytes::Bytes;
use file_guard::FileGuard;
use sha1::{Digest, Sha1};
use std::io::{Read, Write};
use std::ops::DerefMut;

#[derive(Debug)]
pub struct Checksum<'f> {
    file: FileGuard<&'f mut std::fs::File>,
    digest: Sha1,
}

impl<'f> Checksum<'f> {
    pub fn new(file: FileGuard<&'f mut std::fs::File>) -> Self {
        Checksum {
            file,
            digest: Sha1::new(),
        }
    }

    pub fn read(&mut self, size: usize) -> Result<Bytes> {
        let mut buffer = vec![0; size];
        self.file
            .deref_mut()
            .read_exact(&mut buffer)
            .map_err(|_| Error::storage("unexpected end of staging-index file"))?;

        self.digest.update(&buffer);
        Ok(Bytes::from(buffer))
    }

    pub fn write(&mut self, data: &[u8]) -> Result<()> {
        self.file.deref_mut().write_all(data)?;
        self.digest.update(data);

        Ok(())
    }

    /// Append the SHA-1 of everything written so far.
    pub fn write_checksum(&mut self) -> Result<()> {
        let checksum = self.digest.clone().finalize();
        self.file.deref_mut().write_all(checksum.as_slice())?;

        Ok(())
    }

    /// Compare the trailer against the SHA-1 of everything read so far.
    pub fn verify(&mut self) -> Result<()> {
        let mut stored = [0u8; CHECKSUM_SIZE];
        self.file.deref_mut().read_exact(&mut stored)?;

        let computed = self.digest.clone().finalize();
        if stored != computed.as_slice() {
            return Err(Error::storage(
                "staging-index checksum does not match its contents",
            ));
        }

        Ok(())
    }
}
