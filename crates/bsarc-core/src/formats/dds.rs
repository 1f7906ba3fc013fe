//! DDS header synthesis for BA2 texture archives.
//!
//! `DX10` archives store only the pixel data of each texture, split into
//! mip chunks. The header is rebuilt from the record's dimensions, mip count
//! and DXGI format so that the extracted file is a loadable `.dds`.

use std::io::Write;

/// `"DDS "`
const DDS_MAGIC: [u8; 4] = *b"DDS ";

const DDSD_CAPS: u32 = 0x1;
const DDSD_HEIGHT: u32 = 0x2;
const DDSD_WIDTH: u32 = 0x4;
const DDSD_PITCH: u32 = 0x8;
const DDSD_PIXELFORMAT: u32 = 0x1000;
const DDSD_MIPMAPCOUNT: u32 = 0x2_0000;
const DDSD_LINEARSIZE: u32 = 0x8_0000;

const DDPF_FOURCC: u32 = 0x4;

const DDSCAPS_COMPLEX: u32 = 0x8;
const DDSCAPS_TEXTURE: u32 = 0x1000;
const DDSCAPS_MIPMAP: u32 = 0x40_0000;
const DDSCAPS2_CUBEMAP_ALLFACES: u32 = 0xFE00;

const DX10_DIMENSION_TEXTURE2D: u32 = 3;
const DX10_MISC_TEXTURECUBE: u32 = 0x4;

/// Length of magic plus the base header.
pub const DDS_HEADER_LEN: usize = 4 + 124;

/// Length of the extended header that follows for `DX10` pixel formats.
pub const DX10_HEADER_LEN: usize = 20;

/// Texture parameters stored in a BA2 `DX10` record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureInfo {
    /// Width of the top mip in pixels.
    pub width: u16,
    /// Height of the top mip in pixels.
    pub height: u16,
    /// Number of mip levels.
    pub mip_count: u8,
    /// `DXGI_FORMAT` value.
    pub dxgi_format: u8,
    /// Six-face cube map.
    pub cubemap: bool,
}

/// How a DXGI format is laid out, for pitch computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    /// 4x4 block compression with this many bytes per block.
    Block(u32),
    /// Uncompressed with this many bytes per pixel.
    Pixel(u32),
    Unknown,
}

impl TextureInfo {
    /// Legacy four-character code, for formats old readers understand.
    fn legacy_fourcc(self) -> Option<[u8; 4]> {
        match self.dxgi_format {
            71 | 72 => Some(*b"DXT1"),
            74 | 75 => Some(*b"DXT3"),
            77 | 78 => Some(*b"DXT5"),
            80 => Some(*b"ATI1"),
            83 => Some(*b"ATI2"),
            _ => None,
        }
    }

    fn layout(self) -> Layout {
        match self.dxgi_format {
            // BC1, BC4
            70..=72 | 79..=81 => Layout::Block(8),
            // BC2, BC3, BC5, BC6H, BC7
            73..=78 | 82..=84 | 94..=99 => Layout::Block(16),
            // R8G8B8A8, B8G8R8A8, B8G8R8X8
            27..=32 | 87..=93 => Layout::Pixel(4),
            // R8G8
            48..=52 => Layout::Pixel(2),
            // R8
            60..=65 => Layout::Pixel(1),
            _ => Layout::Unknown,
        }
    }

    /// Total header length, including the `DX10` extension when present.
    #[must_use]
    pub fn header_len(&self) -> usize {
        if self.legacy_fourcc().is_some() {
            DDS_HEADER_LEN
        } else {
            DDS_HEADER_LEN + DX10_HEADER_LEN
        }
    }

    /// Builds the complete header.
    ///
    /// # Examples
    ///
    /// ```
    /// use bsarc_core::formats::dds::TextureInfo;
    ///
    /// let info = TextureInfo { width: 256, height: 128, mip_count: 9, dxgi_format: 71, cubemap: false };
    /// let header = info.header();
    /// assert_eq!(&header[..4], b"DDS ");
    /// assert_eq!(&header[84..88], b"DXT1");
    /// assert_eq!(header.len(), info.header_len());
    /// ```
    #[must_use]
    pub fn header(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.header_len());
        // Writing into a Vec cannot fail.
        let _ = self.write_header(&mut out);
        out
    }

    /// Writes the complete header to `writer`.
    ///
    /// # Errors
    ///
    /// Returns any error from `writer`.
    pub fn write_header<W: Write + ?Sized>(&self, writer: &mut W) -> std::io::Result<()> {
        let width = u32::from(self.width);
        let height = u32::from(self.height);

        let mut flags = DDSD_CAPS | DDSD_HEIGHT | DDSD_WIDTH | DDSD_PIXELFORMAT | DDSD_MIPMAPCOUNT;
        let pitch = match self.layout() {
            Layout::Block(bytes) => {
                flags |= DDSD_LINEARSIZE;
                width.div_ceil(4).max(1) * height.div_ceil(4).max(1) * bytes
            }
            Layout::Pixel(bytes) => {
                flags |= DDSD_PITCH;
                width * bytes
            }
            Layout::Unknown => 0,
        };

        let mut caps = DDSCAPS_TEXTURE;
        if self.mip_count > 1 {
            caps |= DDSCAPS_MIPMAP | DDSCAPS_COMPLEX;
        }
        let mut caps2 = 0;
        if self.cubemap {
            caps |= DDSCAPS_COMPLEX;
            caps2 |= DDSCAPS2_CUBEMAP_ALLFACES;
        }

        let fourcc = self.legacy_fourcc().unwrap_or(*b"DX10");

        writer.write_all(&DDS_MAGIC)?;
        for value in [124, flags, height, width, pitch, 0, u32::from(self.mip_count.max(1))] {
            writer.write_all(&value.to_le_bytes())?;
        }
        writer.write_all(&[0u8; 44])?;

        // Pixel format
        writer.write_all(&32u32.to_le_bytes())?;
        writer.write_all(&DDPF_FOURCC.to_le_bytes())?;
        writer.write_all(&fourcc)?;
        writer.write_all(&[0u8; 20])?;

        for value in [caps, caps2, 0, 0, 0] {
            writer.write_all(&u32::to_le_bytes(value))?;
        }

        if self.legacy_fourcc().is_none() {
            let misc = if self.cubemap { DX10_MISC_TEXTURECUBE } else { 0 };
            for value in [
                u32::from(self.dxgi_format),
                DX10_DIMENSION_TEXTURE2D,
                misc,
                1,
                0,
            ] {
                writer.write_all(&value.to_le_bytes())?;
            }
        }

        Ok(())
    }
}
