//! Binary format definitions for Brush film files.

use std::io::{self, Read, Write};

/// Magic bytes identifying a Brush film file.
pub const FILM_MAGIC: &[u8; 4] = b"BRSH";

/// Current format version.
pub const FILM_VERSION: u16 = 1;

/// Compression type for frame data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum CompressionType {
    /// No compression (raw f32 data).
    #[default]
    None = 0,
    /// LZ4 fast compression.
    Lz4 = 1,
}

impl CompressionType {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(CompressionType::None),
            1 => Some(CompressionType::Lz4),
            _ => None,
        }
    }

    /// Whether this build can read and write the compression type.
    pub fn is_available(self) -> bool {
        match self {
            CompressionType::None => true,
            CompressionType::Lz4 => cfg!(feature = "lz4"),
        }
    }
}

/// Film file header flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilmFlags {
    /// Compression type (lower 4 bits).
    pub compression: CompressionType,
}

impl FilmFlags {
    pub fn to_u16(self) -> u16 {
        self.compression as u16
    }

    pub fn from_u16(v: u16) -> io::Result<Self> {
        let compression = CompressionType::from_u8((v & 0x0F) as u8).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Unknown compression type in flags {:#06x}", v),
            )
        })?;
        Ok(Self { compression })
    }
}

/// File header for the Brush film format.
#[derive(Debug, Clone, PartialEq)]
pub struct FilmHeader {
    /// Canvas width.
    pub width: u32,
    /// Canvas height.
    pub height: u32,
    /// Total number of frames.
    pub frame_count: u64,
    /// Playback frame rate.
    pub fps: f32,
    pub flags: FilmFlags,
}

impl FilmHeader {
    /// Size of header in bytes.
    /// Magic(4) + Version(2) + Flags(2) + Width(4) + Height(4) +
    /// FrameCount(8) + Fps(4) + Reserved(16) = 44
    pub const SIZE: usize = 44;

    /// Compute size of one uncompressed frame in bytes.
    pub fn frame_size(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }

    /// Pixels per frame.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Write header to output.
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(FILM_MAGIC)?;
        w.write_all(&FILM_VERSION.to_le_bytes())?;
        w.write_all(&self.flags.to_u16().to_le_bytes())?;
        w.write_all(&self.width.to_le_bytes())?;
        w.write_all(&self.height.to_le_bytes())?;
        w.write_all(&self.frame_count.to_le_bytes())?;
        w.write_all(&self.fps.to_le_bytes())?;
        // Reserved bytes
        w.write_all(&[0u8; 16])?;
        Ok(())
    }

    /// Read header from input.
    pub fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        let mut magic = [0u8; 4];
        r.read_exact(&mut magic)?;
        if &magic != FILM_MAGIC {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "Invalid BRSH magic bytes",
            ));
        }

        let mut buf2 = [0u8; 2];
        let mut buf4 = [0u8; 4];
        let mut buf8 = [0u8; 8];

        r.read_exact(&mut buf2)?;
        let version = u16::from_le_bytes(buf2);
        if version != FILM_VERSION {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Unsupported BRSH version: {}", version),
            ));
        }

        r.read_exact(&mut buf2)?;
        let flags = FilmFlags::from_u16(u16::from_le_bytes(buf2))?;

        r.read_exact(&mut buf4)?;
        let width = u32::from_le_bytes(buf4);

        r.read_exact(&mut buf4)?;
        let height = u32::from_le_bytes(buf4);

        r.read_exact(&mut buf8)?;
        let frame_count = u64::from_le_bytes(buf8);

        r.read_exact(&mut buf4)?;
        let fps = f32::from_le_bytes(buf4);

        // Skip reserved bytes
        let mut reserved = [0u8; 16];
        r.read_exact(&mut reserved)?;

        Ok(Self {
            width,
            height,
            frame_count,
            fps,
            flags,
        })
    }
}

/// Index entry for a single frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameIndex {
    /// Byte offset from start of file.
    pub offset: u64,
    /// Stored size in bytes (equals uncompressed if no compression).
    pub size: u64,
    /// Generation the frame was taken from.
    pub generation: u64,
    /// Fitness of the recorded pattern; NaN when it was unscored.
    pub fitness: f32,
}

impl FrameIndex {
    /// Size of one index entry in bytes.
    pub const SIZE: usize = 28;

    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(&self.offset.to_le_bytes())?;
        w.write_all(&self.size.to_le_bytes())?;
        w.write_all(&self.generation.to_le_bytes())?;
        w.write_all(&self.fitness.to_le_bytes())?;
        Ok(())
    }

    pub fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        let mut buf8 = [0u8; 8];
        let mut buf4 = [0u8; 4];

        r.read_exact(&mut buf8)?;
        let offset = u64::from_le_bytes(buf8);

        r.read_exact(&mut buf8)?;
        let size = u64::from_le_bytes(buf8);

        r.read_exact(&mut buf8)?;
        let generation = u64::from_le_bytes(buf8);

        r.read_exact(&mut buf4)?;
        let fitness = f32::from_le_bytes(buf4);

        Ok(Self {
            offset,
            size,
            generation,
            fitness,
        })
    }
}

/// Encode f32 slice to bytes.
pub fn encode_frame(data: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(data.len() * 4);
    for v in data {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode bytes to f32 slice.
pub fn decode_frame(bytes: &[u8], output: &mut [f32]) -> io::Result<()> {
    if bytes.len() != output.len() * 4 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "Frame size mismatch: {} bytes vs {} floats",
                bytes.len(),
                output.len()
            ),
        ));
    }
    for (v, b) in output.iter_mut().zip(bytes.chunks_exact(4)) {
        *v = f32::from_le_bytes([b[0], b[1], b[2], b[3]]);
    }
    Ok(())
}

/// Compress data using LZ4.
#[cfg(feature = "lz4")]
pub fn compress_lz4(data: &[u8]) -> io::Result<Vec<u8>> {
    Ok(lz4_flex::compress_prepend_size(data))
}

/// Decompress LZ4 data.
#[cfg(feature = "lz4")]
pub fn decompress_lz4(data: &[u8]) -> io::Result<Vec<u8>> {
    lz4_flex::decompress_size_prepended(data)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

#[cfg(not(feature = "lz4"))]
pub fn compress_lz4(_data: &[u8]) -> io::Result<Vec<u8>> {
    Err(lz4_unavailable())
}

#[cfg(not(feature = "lz4"))]
pub fn decompress_lz4(_data: &[u8]) -> io::Result<Vec<u8>> {
    Err(lz4_unavailable())
}

#[cfg(not(feature = "lz4"))]
fn lz4_unavailable() -> io::Error {
    io::Error::new(
        io::ErrorKind::Unsupported,
        "LZ4 film frames require the `lz4` feature",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_header_roundtrip() {
        let header = FilmHeader {
            width: 64,
            height: 48,
            frame_count: 1000,
            fps: 5.0,
            flags: FilmFlags {
                compression: CompressionType::Lz4,
            },
        };

        let mut buf = Vec::new();
        header.write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), FilmHeader::SIZE);

        let mut cursor = Cursor::new(&buf);
        let decoded = FilmHeader::read_from(&mut cursor).unwrap();
        assert_eq!(decoded, header);
        assert_eq!(decoded.frame_size(), 64 * 48 * 4);
    }

    #[test]
    fn test_bad_magic_rejected() {
        let mut buf = vec![0u8; FilmHeader::SIZE];
        buf[..4].copy_from_slice(b"FLWA");
        let err = FilmHeader::read_from(&mut Cursor::new(&buf)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_frame_encode_decode() {
        let data: Vec<f32> = (0..100).map(|i| i as f32 * 0.1).collect();
        let encoded = encode_frame(&data);
        assert_eq!(encoded.len(), data.len() * 4);

        let mut decoded = vec![0.0f32; 100];
        decode_frame(&encoded, &mut decoded).unwrap();
        assert_eq!(decoded, data);

        let mut short = vec![0.0f32; 99];
        assert!(decode_frame(&encoded, &mut short).is_err());
    }

    #[test]
    fn test_frame_index_roundtrip() {
        let index = FrameIndex {
            offset: 12345678,
            size: 8192,
            generation: 17,
            fitness: 0.625,
        };

        let mut buf = Vec::new();
        index.write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), FrameIndex::SIZE);

        let mut cursor = Cursor::new(&buf);
        let decoded = FrameIndex::read_from(&mut cursor).unwrap();
        assert_eq!(decoded, index);
    }
}
