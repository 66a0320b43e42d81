//! Per-request context: tuple description, filter, options and plugin metadata.
//!
//! 요청마다 하나씩 생성되며 accessor와 resolver가 함께 사용합니다. 옵션 키는
//! 대소문자를 구분하지 않습니다.

use crate::config::PxfConfig;
use crate::error::{PxfError, PxfResult};
use crate::orc::TypeDescription;
use crate::storage::CompressionKind;
use crate::types::ColumnDescriptor;
use ahash::AHashMap;

/// Settings handed from the write accessor to the resolver.
#[derive(Debug, Clone, PartialEq)]
pub struct WriterOptions {
    pub schema: TypeDescription,
    pub compression: CompressionKind,
    pub use_utc_timestamp: bool,
}

/// State one plugin leaves for the next in the same request.
#[derive(Debug, Clone, PartialEq)]
pub enum Metadata {
    /// Schema of the batches returned by the read accessor
    ReadSchema(TypeDescription),
    WriterOptions(WriterOptions),
}

#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    columns: Vec<ColumnDescriptor>,
    filter: Option<String>,
    options: AHashMap<String, String>,
    data_source: String,
    fragment_index: usize,
    fragment_properties: AHashMap<String, String>,
    config: PxfConfig,
    metadata: Option<Metadata>,
}

impl RequestContext {
    pub fn new(columns: Vec<ColumnDescriptor>) -> Self {
        Self {
            columns,
            ..Self::default()
        }
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_option(mut self, key: &str, value: impl Into<String>) -> Self {
        self.options.insert(key.to_uppercase(), value.into());
        self
    }

    pub fn with_data_source(mut self, data_source: impl Into<String>) -> Self {
        self.data_source = data_source.into();
        self
    }

    pub fn with_fragment_index(mut self, index: usize) -> Self {
        self.fragment_index = index;
        self
    }

    /// Properties the fragmenter attached to this fragment.
    pub fn with_fragment_properties<I, K, V>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.fragment_properties = properties
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }

    pub fn with_config(mut self, config: PxfConfig) -> Self {
        self.config = config;
        self
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn column(&self, index: usize) -> PxfResult<&ColumnDescriptor> {
        self.columns.get(index).ok_or_else(|| {
            PxfError::InvalidArguments(format!(
                "column index {} is out of range, the tuple description has {} columns",
                index,
                self.columns.len()
            ))
        })
    }

    /// Some filter string that is not blank.
    pub fn has_filter(&self) -> bool {
        self.filter.as_deref().is_some_and(|f| !f.trim().is_empty())
    }

    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(&key.to_uppercase()).map(String::as_str)
    }

    /// Boolean option; anything but `true` (any case) is false.
    pub fn option_bool(&self, key: &str, default: bool) -> bool {
        self.option(key)
            .map(|v| v.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(default)
    }

    pub fn data_source(&self) -> &str {
        &self.data_source
    }

    pub fn fragment_index(&self) -> usize {
        self.fragment_index
    }

    pub fn fragment_property(&self, key: &str) -> Option<&str> {
        self.fragment_properties.get(key).map(String::as_str)
    }

    pub fn config(&self) -> &PxfConfig {
        &self.config
    }

    /// Rows per batch: the `BATCH_SIZE` option, else the configured size.
    pub fn batch_size(&self) -> PxfResult<usize> {
        match self.option("BATCH_SIZE") {
            Some(value) => value
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|size| *size > 0)
                .ok_or_else(|| {
                    PxfError::InvalidArguments(format!(
                        "Property BATCH_SIZE has invalid value {}",
                        value
                    ))
                }),
            None => Ok(self.config.batch_size),
        }
    }

    pub fn metadata(&self) -> Option<&Metadata> {
        self.metadata.as_ref()
    }

    pub fn set_metadata(&mut self, metadata: Metadata) {
        self.metadata = Some(metadata);
    }

    pub fn read_schema(&self) -> Option<&TypeDescription> {
        match &self.metadata {
            Some(Metadata::ReadSchema(schema)) => Some(schema),
            _ => None,
        }
    }

    pub fn writer_options(&self) -> Option<&WriterOptions> {
        match &self.metadata {
            Some(Metadata::WriterOptions(options)) => Some(options),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DataType;

    fn context() -> RequestContext {
        RequestContext::new(vec![
            ColumnDescriptor::new("id", DataType::Integer, 0),
            ColumnDescriptor::new("name", DataType::Text, 1),
        ])
    }

    #[test]
    fn options_ignore_case() {
        let ctx = context()
            .with_option("map_by_position", "TRUE")
            .with_option("Compression_Codec", "snappy");
        assert!(ctx.option_bool("MAP_BY_POSITION", false));
        assert_eq!(ctx.option("compression_codec"), Some("snappy"));
        assert!(!ctx.option_bool("missing", false));
        assert!(ctx.option_bool("missing", true));
    }

    #[test]
    fn blank_filter_is_no_filter() {
        assert!(!context().has_filter());
        assert!(!context().with_filter("  ").has_filter());
        assert!(context().with_filter("a0c23s1d1o5").has_filter());
    }

    #[test]
    fn column_lookup() {
        let ctx = context();
        assert_eq!(ctx.column(1).unwrap().name, "name");
        assert!(ctx.column(2).is_err());
    }

    #[test]
    fn batch_size_option_overrides_config() {
        assert_eq!(context().batch_size().unwrap(), 1024);
        assert_eq!(context().with_option("BATCH_SIZE", "16").batch_size().unwrap(), 16);
        assert!(context().with_option("BATCH_SIZE", "0").batch_size().is_err());
    }

    #[test]
    fn metadata_slots() {
        let mut ctx = context();
        assert!(ctx.read_schema().is_none());
        ctx.set_metadata(Metadata::ReadSchema("struct<id:int>".parse().unwrap()));
        assert!(ctx.read_schema().is_some());
        assert!(ctx.writer_options().is_none());
        ctx.set_metadata(Metadata::WriterOptions(WriterOptions {
            schema: TypeDescription::create_struct(),
            compression: CompressionKind::Snappy,
            use_utc_timestamp: false,
        }));
        assert!(ctx.read_schema().is_none());
        assert_eq!(ctx.writer_options().map(|o| o.compression), Some(CompressionKind::Snappy));
    }
}
