//! Receipt image format sniffing
//!
//! The core accepts raw image bytes and distinguishes formats by magic
//! bytes; anything unrecognized is treated as JPEG.

/// Supported receipt image formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Gif,
    Webp,
    Jpeg,
}

impl ImageFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Gif => "image/gif",
            Self::Webp => "image/webp",
            Self::Jpeg => "image/jpeg",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Gif => "gif",
            Self::Webp => "webp",
            Self::Jpeg => "jpg",
        }
    }
}

/// Sniff an image format from leading magic bytes
pub fn sniff_format(data: &[u8]) -> ImageFormat {
    if data.starts_with(b"\x89PNG") {
        ImageFormat::Png
    } else if data.starts_with(b"GIF") {
        ImageFormat::Gif
    } else if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
        ImageFormat::Webp
    } else {
        ImageFormat::Jpeg
    }
}
