//! Server-side configuration properties.
//!
//! 프로퍼티는 세 가지 경로로 로드됩니다: dotted key 맵, `PXF_*` 환경 변수, JSON 파일.

use crate::error::{PxfError, PxfResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

/// Default number of rows per columnar batch.
pub const DEFAULT_BATCH_SIZE: usize = 1024;

/// Configuration property 정의
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Property {
    /// Write timestamps in UTC rather than the local zone
    OrcWriteTimezoneUtc,

    /// Build a search argument for Hive reads
    HivePredicatePushdown,

    /// Allow `=` / `<>` partition pushdown on integral partition keys
    HiveIntegralPushdown,

    /// Rows per columnar batch
    BatchSize,

    /// Fail instead of nulling decimals that exceed the representable precision
    StrictDecimalOverflow,
}

impl Property {
    pub const ALL: [Property; 5] = [
        Property::OrcWriteTimezoneUtc,
        Property::HivePredicatePushdown,
        Property::HiveIntegralPushdown,
        Property::BatchSize,
        Property::StrictDecimalOverflow,
    ];

    /// Dotted property key
    pub fn key(&self) -> &'static str {
        match self {
            Property::OrcWriteTimezoneUtc => "pxf.orc.write.timezone.utc",
            Property::HivePredicatePushdown => "pxf.ppd.hive",
            Property::HiveIntegralPushdown => "hive.metastore.integral.jdo.pushdown",
            Property::BatchSize => "pxf.orc.batch.size",
            Property::StrictDecimalOverflow => "pxf.decimal.overflow.strict",
        }
    }

    /// 문자열에서 Property 파싱
    pub fn parse_property(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.key() == key)
    }

    /// 환경 변수 이름
    pub fn env_var_name(&self) -> String {
        let key = self.key();
        let key = key.strip_prefix("pxf.").unwrap_or(key);
        format!("PXF_{}", key.replace('.', "_").to_uppercase())
    }
}

/// Resolved configuration for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PxfConfig {
    pub orc_write_timezone_utc: bool,
    pub hive_predicate_pushdown: bool,
    pub hive_integral_pushdown: bool,
    pub batch_size: usize,
    pub strict_decimal_overflow: bool,
}

impl Default for PxfConfig {
    fn default() -> Self {
        Self {
            orc_write_timezone_utc: true,
            hive_predicate_pushdown: true,
            hive_integral_pushdown: false,
            batch_size: DEFAULT_BATCH_SIZE,
            strict_decimal_overflow: false,
        }
    }
}

impl PxfConfig {
    /// Apply a single textual property value.
    pub fn set(&mut self, property: Property, value: &str) -> PxfResult<()> {
        match property {
            Property::OrcWriteTimezoneUtc => {
                self.orc_write_timezone_utc = parse_strict_bool(property, value)?
            }
            // lenient: anything but "true" disables
            Property::HivePredicatePushdown => {
                self.hive_predicate_pushdown = value.trim().eq_ignore_ascii_case("true")
            }
            Property::HiveIntegralPushdown => {
                self.hive_integral_pushdown = value.trim().eq_ignore_ascii_case("true")
            }
            Property::BatchSize => {
                self.batch_size = value
                    .trim()
                    .parse::<usize>()
                    .ok()
                    .filter(|size| *size > 0)
                    .ok_or_else(|| invalid_value(property, value))?
            }
            Property::StrictDecimalOverflow => {
                self.strict_decimal_overflow = parse_strict_bool(property, value)?
            }
        }
        Ok(())
    }

    /// Build a config from dotted keys; unknown keys are ignored.
    pub fn from_properties<I, K, V>(properties: I) -> PxfResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut config = Self::default();
        for (key, value) in properties {
            if let Some(property) = Property::parse_property(key.as_ref()) {
                config.set(property, value.as_ref())?;
            }
        }
        Ok(config)
    }

    /// 환경 변수에서 로드
    pub fn load_from_env(&mut self) -> PxfResult<()> {
        for property in Property::ALL {
            if let Ok(value) = env::var(property.env_var_name()) {
                self.set(property, &value)?;
            }
        }
        Ok(())
    }

    /// 파일에서 로드
    pub fn load_from_file(path: &Path) -> PxfResult<Self> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// 파일에 저장
    pub fn save_to_file(&self, path: &Path) -> PxfResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, json)?;
        Ok(())
    }
}

fn parse_strict_bool(property: Property, value: &str) -> PxfResult<bool> {
    let trimmed = value.trim();
    if trimmed.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if trimmed.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(invalid_value(property, value))
    }
}

fn invalid_value(property: Property, value: &str) -> PxfError {
    PxfError::Config(format!(
        "Property {} has invalid value {}",
        property.key(),
        value
    ))
}
