//! Compression codecs for written files.
//!
//! `COMPRESSION_CODEC` 옵션 값(대소문자 무시)을 Parquet 코덱으로 매핑합니다.
//!
//! | Option value | Parquet codec |
//! |--------------|---------------|
//! | `NONE` | UNCOMPRESSED |
//! | `ZLIB` (default) | GZIP |
//! | `SNAPPY` | SNAPPY |
//! | `LZ4` | LZ4_RAW |
//! | `ZSTD` | ZSTD (default level) |
//! | `LZO` | not available |

use crate::error::{PxfError, PxfResult};
use parquet::basic::{Compression, GzipLevel, ZstdLevel};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Compression codec selected for a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CompressionKind {
    None,
    #[default]
    Zlib,
    Snappy,
    Lzo,
    Lz4,
    Zstd,
}

impl fmt::Display for CompressionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "NONE"),
            Self::Zlib => write!(f, "ZLIB"),
            Self::Snappy => write!(f, "SNAPPY"),
            Self::Lzo => write!(f, "LZO"),
            Self::Lz4 => write!(f, "LZ4"),
            Self::Zstd => write!(f, "ZSTD"),
        }
    }
}

impl FromStr for CompressionKind {
    type Err = PxfError;

    fn from_str(value: &str) -> PxfResult<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.to_string().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| {
                PxfError::InvalidArguments(format!(
                    "Invalid compression codec '{}'. Supported codecs are NONE, ZLIB, SNAPPY, LZO, LZ4, ZSTD",
                    value
                ))
            })
    }
}

impl CompressionKind {
    pub const ALL: &'static [CompressionKind] = &[
        CompressionKind::None,
        CompressionKind::Zlib,
        CompressionKind::Snappy,
        CompressionKind::Lzo,
        CompressionKind::Lz4,
        CompressionKind::Zstd,
    ];

    /// Parquet codec for `WriterProperties`.
    pub fn to_parquet_compression(&self) -> PxfResult<Compression> {
        Ok(match self {
            Self::None => Compression::UNCOMPRESSED,
            Self::Zlib => Compression::GZIP(GzipLevel::default()),
            Self::Snappy => Compression::SNAPPY,
            Self::Lz4 => Compression::LZ4_RAW,
            Self::Zstd => Compression::ZSTD(ZstdLevel::default()),
            Self::Lzo => {
                return Err(PxfError::InvalidArguments(format!(
                    "Compression codec {} is not supported",
                    self
                )));
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_zlib() {
        assert_eq!(CompressionKind::default(), CompressionKind::Zlib);
    }

    #[test]
    fn parse_ignores_case() {
        assert_eq!("snappy".parse::<CompressionKind>().unwrap(), CompressionKind::Snappy);
        assert_eq!(" Zstd ".parse::<CompressionKind>().unwrap(), CompressionKind::Zstd);
        assert_eq!("NONE".parse::<CompressionKind>().unwrap(), CompressionKind::None);
        assert!("brotli".parse::<CompressionKind>().is_err());
    }

    #[test]
    fn parquet_compression_mapping() {
        assert_eq!(
            CompressionKind::None.to_parquet_compression().unwrap(),
            Compression::UNCOMPRESSED
        );
        assert_eq!(
            CompressionKind::Snappy.to_parquet_compression().unwrap(),
            Compression::SNAPPY
        );
        assert_eq!(
            CompressionKind::Lz4.to_parquet_compression().unwrap(),
            Compression::LZ4_RAW
        );
        assert!(matches!(
            CompressionKind::Zlib.to_parquet_compression().unwrap(),
            Compression::GZIP(_)
        ));
        assert!(matches!(
            CompressionKind::Zstd.to_parquet_compression().unwrap(),
            Compression::ZSTD(_)
        ));
    }

    #[test]
    fn lzo_is_rejected() {
        let err = CompressionKind::Lzo.to_parquet_compression().unwrap_err();
        assert_eq!(err.to_string(), "Compression codec LZO is not supported");
    }

    #[test]
    fn display_round_trips() {
        for kind in CompressionKind::ALL {
            assert_eq!(kind.to_string().parse::<CompressionKind>().unwrap(), *kind);
        }
    }
}
