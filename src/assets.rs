use include_dir::{include_dir, Dir};
use serde::de::DeserializeOwned;
use std::io;

use crate::error::Result;

static DATA_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/src/data");

/// Deserialize one of the JSON files bundled into the binary.
pub fn read_embedded<T: DeserializeOwned>(file_name: &str) -> Result<T> {
    let file = DATA_DIR.get_file(file_name).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("embedded file `{file_name}` not found"),
        )
    })?;

    let contents = file.contents_utf8().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("embedded file `{file_name}` is not UTF-8"),
        )
    })?;

    Ok(serde_json::from_str(contents)?)
}
