//! Resolution of keyspace configuration strings for new indexes.
//!
//! The create string for an index keyspace is layered, with later items
//! overriding earlier ones:
//!
//! 1. built-in defaults
//! 2. the system-wide index configuration
//! 3. the collection's index configuration
//! 4. `storageEngine.<engine>.configString` from the index descriptor
//! 5. fixed formats and `app_metadata` carrying the key format version and
//!    the descriptor itself
//!
//! Only the grammar is checked here. The engine may still reject a string
//! this module accepts when the keyspace is created.

use ordix_core::encoding::KEY_FORMAT_VERSION;
use ordix_storage::engine::{parse_config, strip_group};

use crate::descriptor::IndexDescriptor;
use crate::error::{IndexError, IndexResult};

/// Built-in defaults, applied before any user configuration.
pub const DEFAULT_INDEX_CONFIG: &str = "type=file,internal_page_max=16k,leaf_page_max=16k,\
                                        checksum=on,prefix_compression=true,block_compressor=,";

/// Field of the per-engine options object that carries a configuration string.
const CONFIG_STRING_FIELD: &str = "configString";

/// Extract the configuration string from a per-engine options object.
///
/// The object may contain nothing but an optional `configString` string.
///
/// # Errors
///
/// Returns [`IndexError::ConfigurationInvalid`] for a non-object, an unknown
/// field, or a `configString` that is not a string.
pub fn parse_index_options(options: &serde_json::Value) -> IndexResult<String> {
    let object = options.as_object().ok_or_else(|| {
        IndexError::ConfigurationInvalid(format!("index storage options must be an object: {options}"))
    })?;

    let mut config = String::new();
    for (field, value) in object {
        if field != CONFIG_STRING_FIELD {
            return Err(IndexError::ConfigurationInvalid(format!(
                "{field:?} is not a supported option"
            )));
        }
        let s = value.as_str().ok_or_else(|| {
            IndexError::ConfigurationInvalid(format!(
                "{CONFIG_STRING_FIELD} must be a string, got {value}"
            ))
        })?;
        config = s.to_owned();
    }
    Ok(config)
}

/// Build the keyspace create string for an index.
///
/// # Errors
///
/// Returns [`IndexError::ConfigurationInvalid`] if the descriptor's engine
/// options are malformed or the assembled string does not parse.
pub fn generate_create_string(
    engine_name: &str,
    sys_index_config: &str,
    coll_index_config: &str,
    descriptor: &IndexDescriptor,
) -> IndexResult<String> {
    let mut config = String::from(DEFAULT_INDEX_CONFIG);

    for layer in [sys_index_config, coll_index_config] {
        if !layer.is_empty() {
            config.push_str(layer);
            config.push(',');
        }
    }

    if let Some(options) = descriptor.storage_engine.get(engine_name) {
        let index_config = parse_index_options(options)?;
        if !index_config.is_empty() {
            config.push_str(&index_config);
            config.push(',');
        }
    }

    let info = serde_json::to_string(descriptor)
        .map_err(|e| IndexError::ConfigurationInvalid(e.to_string()))?;
    config.push_str(&format!(
        "key_format=u,value_format=u,app_metadata=(formatVersion={KEY_FORMAT_VERSION},infoObj={info})"
    ));

    parse_config(&config).map_err(|e| IndexError::ConfigurationInvalid(e.to_string()))?;
    Ok(config)
}

#[allow(clippy::needless_pass_by_value)]
fn invalid(e: impl std::fmt::Display) -> IndexError {
    IndexError::ConfigurationInvalid(e.to_string())
}

/// The last `key` item inside the last `app_metadata` group of `config`.
fn app_metadata_item(config: &str, key: &str) -> IndexResult<Option<String>> {
    let Some(metadata) = parse_config(config)
        .map_err(invalid)?
        .into_iter()
        .rev()
        .find(|item| item.key == "app_metadata")
    else {
        return Ok(None);
    };

    let inner = strip_group(&metadata.value).unwrap_or(&metadata.value);
    Ok(parse_config(inner)
        .map_err(invalid)?
        .into_iter()
        .rev()
        .find(|item| item.key == key)
        .map(|item| item.value))
}

/// Read `app_metadata.formatVersion` from a keyspace configuration string.
///
/// Returns `Ok(None)` when the string carries no version.
///
/// # Errors
///
/// Returns [`IndexError::ConfigurationInvalid`] if the string is malformed or
/// the version is not a number.
pub fn format_version(config: &str) -> IndexResult<Option<u32>> {
    app_metadata_item(config, "formatVersion")?
        .map(|value| {
            value.parse::<u32>().map_err(|_| invalid(format!("bad formatVersion {value:?}")))
        })
        .transpose()
}

/// Read the descriptor stored as `app_metadata.infoObj`.
///
/// Returns `Ok(None)` when the string carries none.
///
/// # Errors
///
/// Returns [`IndexError::ConfigurationInvalid`] if the string is malformed or
/// `infoObj` is not a descriptor.
pub fn stored_descriptor(config: &str) -> IndexResult<Option<IndexDescriptor>> {
    app_metadata_item(config, "infoObj")?
        .map(|value| {
            serde_json::from_str(&value).map_err(|e| invalid(format!("bad infoObj: {e}")))
        })
        .transpose()
}
