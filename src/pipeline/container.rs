//! Single-entry zip container writer.
//!
//! Output containers carry their entry name in the legacy cp866 codepage —
//! a compatibility constraint from the consumers of existing library
//! trees, which predate the UTF-8 filename flag. The `zip` crate (used on
//! the reading side) only writes UTF-8 names, so the one-entry archive is
//! assembled here directly: local file header, raw-deflate data, central
//! directory, end-of-central-directory. The general-purpose flag stays 0,
//! marking the name as non-UTF-8 for readers.
//!
//! The format subset is deliberately minimal: exactly one entry, deflate
//! method, no extra fields, no zip64 (books are nowhere near 4 GiB).

use std::io::{self, Write};

use flate2::write::DeflateEncoder;
use flate2::{Compression, Crc};

const LOCAL_HEADER_SIG: u32 = 0x0403_4b50;
const CENTRAL_HEADER_SIG: u32 = 0x0201_4b50;
const EOCD_SIG: u32 = 0x0605_4b50;

/// Version 2.0 — the minimum that understands deflate.
const VERSION: u16 = 20;
const METHOD_DEFLATE: u16 = 8;

/// Fixed DOS timestamp (1980-01-01 00:00:00) for byte-reproducible output.
const DOS_TIME: u16 = 0;
const DOS_DATE: u16 = (1 << 5) | 1;

/// Write a zip archive with exactly one deflate-compressed entry.
///
/// `entry_name` is written byte-for-byte — the caller decides the
/// encoding (cp866 for library containers).
pub fn write_single_entry_zip<W: Write>(
    mut out: W,
    entry_name: &[u8],
    data: &[u8],
) -> io::Result<()> {
    let mut crc = Crc::new();
    crc.update(data);
    let crc32 = crc.sum();

    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    let compressed = encoder.finish()?;

    let name_len = u16::try_from(entry_name.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "entry name too long"))?;
    let compressed_len = u32::try_from(compressed.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "entry too large for zip32"))?;
    let data_len = u32::try_from(data.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "entry too large for zip32"))?;

    // ── Local file header + data ─────────────────────────────────────────
    out.write_all(&LOCAL_HEADER_SIG.to_le_bytes())?;
    out.write_all(&VERSION.to_le_bytes())?;
    out.write_all(&0u16.to_le_bytes())?; // flags: bit 11 clear, name is not UTF-8
    out.write_all(&METHOD_DEFLATE.to_le_bytes())?;
    out.write_all(&DOS_TIME.to_le_bytes())?;
    out.write_all(&DOS_DATE.to_le_bytes())?;
    out.write_all(&crc32.to_le_bytes())?;
    out.write_all(&compressed_len.to_le_bytes())?;
    out.write_all(&data_len.to_le_bytes())?;
    out.write_all(&name_len.to_le_bytes())?;
    out.write_all(&0u16.to_le_bytes())?; // extra field length
    out.write_all(entry_name)?;
    out.write_all(&compressed)?;

    let local_header_len = 30 + entry_name.len() as u32;
    let central_offset = local_header_len + compressed_len;

    // ── Central directory ────────────────────────────────────────────────
    out.write_all(&CENTRAL_HEADER_SIG.to_le_bytes())?;
    out.write_all(&VERSION.to_le_bytes())?; // version made by
    out.write_all(&VERSION.to_le_bytes())?; // version needed
    out.write_all(&0u16.to_le_bytes())?; // flags
    out.write_all(&METHOD_DEFLATE.to_le_bytes())?;
    out.write_all(&DOS_TIME.to_le_bytes())?;
    out.write_all(&DOS_DATE.to_le_bytes())?;
    out.write_all(&crc32.to_le_bytes())?;
    out.write_all(&compressed_len.to_le_bytes())?;
    out.write_all(&data_len.to_le_bytes())?;
    out.write_all(&name_len.to_le_bytes())?;
    out.write_all(&0u16.to_le_bytes())?; // extra field length
    out.write_all(&0u16.to_le_bytes())?; // comment length
    out.write_all(&0u16.to_le_bytes())?; // disk number start
    out.write_all(&0u16.to_le_bytes())?; // internal attributes
    out.write_all(&0u32.to_le_bytes())?; // external attributes
    out.write_all(&0u32.to_le_bytes())?; // local header offset
    out.write_all(entry_name)?;

    let central_len = 46 + entry_name.len() as u32;

    // ── End of central directory ─────────────────────────────────────────
    out.write_all(&EOCD_SIG.to_le_bytes())?;
    out.write_all(&0u16.to_le_bytes())?; // this disk
    out.write_all(&0u16.to_le_bytes())?; // central directory disk
    out.write_all(&1u16.to_le_bytes())?; // entries on this disk
    out.write_all(&1u16.to_le_bytes())?; // entries total
    out.write_all(&central_len.to_le_bytes())?;
    out.write_all(&central_offset.to_le_bytes())?;
    out.write_all(&0u16.to_le_bytes())?; // comment length

    out.flush()
}
