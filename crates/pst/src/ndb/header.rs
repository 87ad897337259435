//! [HEADER](https://learn.microsoft.com/en-us/openspecs/office_file_formats/ms-pst/c9876f5a-664b-46a3-9887-ba63f113abf5)

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Cursor, Read, Seek, SeekFrom};
use tracing::debug;

use super::{block_id::BlockId, root::Root, *};
use crate::crc::compute_crc;

/// `dwMagic`
///
/// ### See also
/// [Header]
pub(crate) const HEADER_MAGIC: u32 = u32::from_be_bytes(*b"NDB!");

/// `wMagicClient`
pub(crate) const HEADER_MAGIC_CLIENT: u16 = u16::from_be_bytes(*b"MS");

pub(crate) const NDB_SENTINEL: u8 = 0x80;

pub(crate) const ANSI_HEADER_SIZE: usize = 512;
pub(crate) const UNICODE_HEADER_SIZE: usize = 564;

/// `dwCRCPartial` covers this many bytes starting at `wMagicClient`.
pub(crate) const PARTIAL_CRC_SIZE: usize = 471;

/// `dwCRCFull` covers this many bytes starting at `wMagicClient`.
pub(crate) const FULL_CRC_SIZE: usize = 516;

/// `wVer`
///
/// ### See also
/// [Header]
#[repr(u16)]
#[derive(Copy, Clone, PartialEq, Eq, Default, Debug)]
pub enum NdbVersion {
    Ansi = 15,
    #[default]
    Unicode = 23,
}

impl TryFrom<u16> for NdbVersion {
    type Error = NdbError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            14..=15 => Ok(NdbVersion::Ansi),
            23 => Ok(NdbVersion::Unicode),
            _ => Err(NdbError::InvalidNdbVersion(value)),
        }
    }
}

impl NdbVersion {
    /// Size of a `BID`, `IB` or widened `NID` field.
    pub fn id_size(self) -> usize {
        match self {
            NdbVersion::Ansi => 4,
            NdbVersion::Unicode => 8,
        }
    }

    /// Size of a `PAGETRAILER`.
    pub fn page_trailer_size(self) -> usize {
        match self {
            NdbVersion::Ansi => 12,
            NdbVersion::Unicode => 16,
        }
    }

    /// Size of a `BLOCKTRAILER`.
    pub fn block_trailer_size(self) -> usize {
        match self {
            NdbVersion::Ansi => 12,
            NdbVersion::Unicode => 16,
        }
    }
}

/// `bCryptMethod`
///
/// ### See also
/// [Header]
#[repr(u8)]
#[derive(Copy, Clone, PartialEq, Eq, Default, Debug)]
pub enum NdbCryptMethod {
    /// `NDB_CRYPT_NONE`: Data blocks are not encoded
    #[default]
    None = 0x00,
    /// `NDB_CRYPT_PERMUTE`: Encoded with the [Permutation algorithm](https://learn.microsoft.com/en-us/openspecs/office_file_formats/ms-pst/5faf4800-645d-49d1-9457-2ac40eb467bd)
    Permute = 0x01,
    /// `NDB_CRYPT_CYCLIC`: Encoded with the [Cyclic algorithm](https://learn.microsoft.com/en-us/openspecs/office_file_formats/ms-pst/9979fc01-0a3e-496f-900f-a6a867951f23)
    Cyclic = 0x02,
}

impl TryFrom<u8> for NdbCryptMethod {
    type Error = NdbError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(NdbCryptMethod::None),
            0x01 => Ok(NdbCryptMethod::Permute),
            0x02 => Ok(NdbCryptMethod::Cyclic),
            _ => Err(NdbError::InvalidNdbCryptMethod(value)),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Header {
    version: NdbVersion,
    client_version: u16,
    next_block: BlockId,
    next_page: BlockId,
    unique: u32,
    root: Root,
    crypt_method: NdbCryptMethod,
}

impl Header {
    /// Read and validate the HEADER at the start of `f`. Everything that can be wrong with the
    /// first 564 bytes is reported as a format error before any B-tree is touched.
    pub fn read(f: &mut dyn Read) -> NdbResult<Self> {
        let mut buffer = Vec::with_capacity(UNICODE_HEADER_SIZE);
        f.take(UNICODE_HEADER_SIZE as u64).read_to_end(&mut buffer)?;

        let mut cursor = Cursor::new(buffer.as_slice());

        // dwMagic
        let magic = cursor.read_u32::<LittleEndian>().unwrap_or_default();
        if magic != HEADER_MAGIC {
            return Err(NdbError::InvalidNdbHeaderMagicValue(magic));
        }
        if buffer.len() < ANSI_HEADER_SIZE {
            return Err(NdbError::TruncatedHeader(buffer.len()));
        }

        // dwCRCPartial
        let crc_partial = cursor.read_u32::<LittleEndian>()?;

        // wMagicClient
        let magic = cursor.read_u16::<LittleEndian>()?;
        if magic != HEADER_MAGIC_CLIENT {
            return Err(NdbError::InvalidNdbHeaderMagicClientValue(magic));
        }

        // wVer
        let version = NdbVersion::try_from(cursor.read_u16::<LittleEndian>()?)?;
        if version == NdbVersion::Unicode && buffer.len() < UNICODE_HEADER_SIZE {
            return Err(NdbError::TruncatedHeader(buffer.len()));
        }

        if crc_partial != compute_crc(0, &buffer[8..8 + PARTIAL_CRC_SIZE]) {
            return Err(NdbError::InvalidNdbHeaderPartialCrc(crc_partial));
        }

        // wVerClient
        let client_version = cursor.read_u16::<LittleEndian>()?;

        // bPlatformCreate, bPlatformAccess, dwReserved1, dwReserved2
        cursor.seek(SeekFrom::Current(10))?;

        let header = match version {
            NdbVersion::Unicode => {
                // bidUnused
                cursor.read_u64::<LittleEndian>()?;

                // bidNextP
                let next_page = BlockId::read(version, &mut cursor)?;

                // dwUnique
                let unique = cursor.read_u32::<LittleEndian>()?;

                // rgnid, qwUnused
                cursor.seek(SeekFrom::Current(128 + 8))?;

                // root
                let root = Root::read(version, &mut cursor)?;

                // dwAlign, rgbFM, rgbFP
                cursor.seek(SeekFrom::Current(4 + 128 + 128))?;

                let (crypt_method, next_block) = Self::read_trailing_fields(&mut cursor, |c| {
                    // bidNextB
                    BlockId::read(version, c)
                })?;

                // dwCRCFull
                let crc_full = cursor.read_u32::<LittleEndian>()?;
                if crc_full != compute_crc(0, &buffer[8..8 + FULL_CRC_SIZE]) {
                    return Err(NdbError::InvalidNdbHeaderFullCrc(crc_full));
                }

                Self {
                    version,
                    client_version,
                    next_block,
                    next_page,
                    unique,
                    root,
                    crypt_method,
                }
            }
            NdbVersion::Ansi => {
                // bidNextB
                let next_block = BlockId::read(version, &mut cursor)?;

                // bidNextP
                let next_page = BlockId::read(version, &mut cursor)?;

                // dwUnique
                let unique = cursor.read_u32::<LittleEndian>()?;

                // rgnid
                cursor.seek(SeekFrom::Current(128))?;

                // root
                let root = Root::read(version, &mut cursor)?;

                // rgbFM, rgbFP
                cursor.seek(SeekFrom::Current(128 + 128))?;

                let (crypt_method, _) = Self::read_trailing_fields(&mut cursor, |_| Ok(()))?;

                Self {
                    version,
                    client_version,
                    next_block,
                    next_page,
                    unique,
                    root,
                    crypt_method,
                }
            }
        };

        debug!(
            version = ?header.version,
            crypt_method = ?header.crypt_method,
            node_btree = ?header.root.node_btree(),
            block_btree = ?header.root.block_btree(),
            "read PST header"
        );

        Ok(header)
    }

    fn read_trailing_fields<T>(
        cursor: &mut Cursor<&[u8]>,
        read_after_reserved: impl FnOnce(&mut Cursor<&[u8]>) -> std::io::Result<T>,
    ) -> NdbResult<(NdbCryptMethod, T)> {
        // bSentinel
        let sentinel = cursor.read_u8()?;
        if sentinel != NDB_SENTINEL {
            return Err(NdbError::InvalidNdbHeaderSentinelValue(sentinel));
        }

        // bCryptMethod
        let crypt_method = NdbCryptMethod::try_from(cursor.read_u8()?)?;

        // rgbReserved
        cursor.read_u16::<LittleEndian>()?;

        let value = read_after_reserved(cursor)?;
        Ok((crypt_method, value))
    }

    pub fn version(&self) -> NdbVersion {
        self.version
    }

    pub fn client_version(&self) -> u16 {
        self.client_version
    }

    pub fn crypt_method(&self) -> NdbCryptMethod {
        self.crypt_method
    }

    pub fn next_block(&self) -> BlockId {
        self.next_block
    }

    pub fn next_page(&self) -> BlockId {
        self.next_page
    }

    pub fn unique(&self) -> u32 {
        self.unique
    }

    pub fn root(&self) -> &Root {
        &self.root
    }
}
