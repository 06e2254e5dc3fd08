//! Object identifier (SHA-1 digest).
//!
//! Object ids are 40-character hexadecimal strings over a typed, serialized
//! payload. Identical content always yields the identical id; the id is the
//! sole addressing mechanism between objects.
//!
//! On disk, objects live at `objects/<first-2-chars>/<remaining-38-chars>`.

use crate::artifacts::objects::OBJECT_ID_LENGTH;
use crate::error::{Error, Result};
use std::io;
use std::path::PathBuf;

/// A validated 40-hex-character object id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct ObjectId(String);

impl ObjectId {
    /// Parse and validate an object id from its hexadecimal form.
    pub fn try_parse(id: String) -> Result<Self> {
        if id.len() != OBJECT_ID_LENGTH {
            return Err(Error::storage(format!(
                "object id has length {}, expected {OBJECT_ID_LENGTH}",
                id.len()
            )));
        }
        if !id.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::storage(format!("object id '{id}' is not hexadecimal")));
        }
        Ok(Self(id))
    }

    /// Write the id in binary form (20 bytes), as used inside tree and
    /// commit payloads.
    pub fn write_binary_to<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        for i in (0..OBJECT_ID_LENGTH).step_by(2) {
            let byte = u8::from_str_radix(&self.0[i..i + 2], 16)
                .map_err(|_| Error::storage("object id contains an invalid hex pair"))?;
            writer.write_all(&[byte])?;
        }

        Ok(())
    }

    /// Read a binary (20-byte) id back into hexadecimal form.
    pub fn read_binary_from<R: io::Read + ?Sized>(reader: &mut R) -> Result<Self> {
        let mut raw = [0u8; OBJECT_ID_LENGTH / 2];
        reader.read_exact(&mut raw)?;

        let mut hex = String::with_capacity(OBJECT_ID_LENGTH);
        for byte in raw {
            hex.push_str(&format!("{byte:02x}"));
        }

        Self::try_parse(hex)
    }

    /// The storage path of this id: `XX/YYYY...` with `XX` the first two
    /// characters.
    pub fn to_path(&self) -> PathBuf {
        let (dir, file) = self.0.split_at(2);
        PathBuf::from(dir).join(file)
    }

    /// Abbreviated (7-character) form.
    pub fn to_short_oid(&self) -> String {
        self.0.split_at(7).0.to_string()
    }
}

impl AsRef<str> for ObjectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Cursor;

    proptest! {
        #[test]
        fn binary_round_trip(hex in "[0-9a-f]{40}") {
            let oid = ObjectId::try_parse(hex).unwrap();
            let mut buffer = Vec::new();
            oid.write_binary_to(&mut buffer).unwrap();
            prop_assert_eq!(buffer.len(), 20);

            let back = ObjectId::read_binary_from(&mut Cursor::new(buffer)).unwrap();
            prop_assert_eq!(back, oid);
        }

        #[test]
        fn rejects_wrong_length(hex in "[0-9a-f]{0,39}") {
            prop_assert!(ObjectId::try_parse(hex).is_err());
        }

        #[test]
        fn rejects_non_hex(id in "[g-z]{40}") {
            prop_assert!(ObjectId::try_parse(id).is_err());
        }
    }

    #[test]
    fn path_splits_first_two_characters() {
        let oid = ObjectId::try_parse("ab".to_string() + &"c".repeat(38)).unwrap();
        assert_eq!(oid.to_path(), PathBuf::from("ab").join("c".repeat(38)));
    }

    #[test]
    fn short_form_is_seven_characters() {
        let oid = ObjectId::try_parse("0123456789".repeat(4)).unwrap();
        assert_eq!(oid.to_short_oid(), "0123456");
    }
}
