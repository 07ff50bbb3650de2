//! JSON cache files
//!
//! One UTF-8 document per collection, array-of-objects at the root. A
//! missing writable file is seeded from a same-named bundled asset when
//! one exists; missing both simply yields an empty collection. Writes
//! replace the whole document; the last successful write wins.

use std::fs;
use std::io::{BufReader, BufWriter};

use serde_json::Value;
use tracing::{debug, warn};

use crate::core::config::Settings;
use crate::core::error::StoreError;
use crate::core::map::DataMap;

/// Read a collection cache into a list of maps.
pub fn read_collection(settings: &Settings, file_name: &str) -> Result<Vec<DataMap>, StoreError> {
    let path = settings.data_path(file_name);
    if !path.exists() {
        match settings.asset_path(file_name) {
            Some(asset) if asset.exists() => {
                if let Err(e) = fs::create_dir_all(&settings.data_dir) {
                    return Err(StoreError::io(&settings.data_dir, e));
                }
                if let Err(e) = fs::copy(&asset, &path) {
                    debug!("cannot copy asset {} to data path: {e}", asset.display());
                    // no cache, no usable asset - empty list
                    return Ok(Vec::new());
                }
                debug!("seeded {file_name} from bundled asset");
            }
            _ => {
                // no cache, no asset - empty list
                return Ok(Vec::new());
            }
        }
    }

    let file = fs::File::open(&path).map_err(|e| StoreError::io(&path, e))?;
    let root: Value = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| StoreError::json(file_name, e))?;
    let items = match root {
        Value::Array(items) => items,
        _ => {
            warn!("cache {file_name} is not an array, treating as empty");
            return Ok(Vec::new());
        }
    };
    let mut maps = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::Object(m) => maps.push(m),
            other => warn!("skipping non-object entry in {file_name}: {other}"),
        }
    }
    Ok(maps)
}

/// Write a collection cache as one JSON array document.
pub fn write_collection(
    settings: &Settings,
    file_name: &str,
    maps: Vec<DataMap>,
) -> Result<(), StoreError> {
    fs::create_dir_all(&settings.data_dir).map_err(|e| StoreError::io(&settings.data_dir, e))?;
    let path = settings.data_path(file_name);
    let file = fs::File::create(&path).map_err(|e| StoreError::io(&path, e))?;
    let list = Value::Array(maps.into_iter().map(Value::Object).collect());
    serde_json::to_writer(BufWriter::new(file), &list)
        .map_err(|e| StoreError::json(file_name, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn settings(data: &std::path::Path, assets: Option<&std::path::Path>) -> Settings {
        let mut s = Settings::new(data);
        if let Some(a) = assets {
            s = s.with_assets_dir(a);
        }
        s
    }

    #[test]
    fn test_missing_file_and_asset_yields_empty() {
        let data = tempfile::tempdir().unwrap();
        let s = settings(data.path(), None);
        let maps = read_collection(&s, "cacheOrder.json").unwrap();
        assert!(maps.is_empty());
    }

    #[test]
    fn test_seed_from_asset() {
        let data = tempfile::tempdir().unwrap();
        let assets = tempfile::tempdir().unwrap();
        fs::write(
            assets.path().join("cacheTag.json"),
            r##"[{"uuid":"t1","name":"a","value":1,"color":"#fff"}]"##,
        )
        .unwrap();

        let s = settings(data.path(), Some(assets.path()));
        let maps = read_collection(&s, "cacheTag.json").unwrap();
        assert_eq!(maps.len(), 1);
        // the asset was copied into the writable location
        assert!(data.path().join("cacheTag.json").exists());
    }

    #[test]
    fn test_round_trip() {
        let data = tempfile::tempdir().unwrap();
        let s = settings(data.path(), None);
        let mut m = DataMap::new();
        m.insert("uuid".into(), json!("u1"));
        write_collection(&s, "cacheXtras.json", vec![m.clone()]).unwrap();

        let back = read_collection(&s, "cacheXtras.json").unwrap();
        assert_eq!(back, vec![m]);
    }

    #[test]
    fn test_non_array_root_is_empty() {
        let data = tempfile::tempdir().unwrap();
        fs::write(data.path().join("cacheOrder.json"), r#"{"not":"a list"}"#).unwrap();
        let s = settings(data.path(), None);
        assert!(read_collection(&s, "cacheOrder.json").unwrap().is_empty());
    }

    #[test]
    fn test_broken_json_is_an_error() {
        let data = tempfile::tempdir().unwrap();
        fs::write(data.path().join("cacheOrder.json"), "[{").unwrap();
        let s = settings(data.path(), None);
        assert!(read_collection(&s, "cacheOrder.json").is_err());
    }
}
