//! Typed access to JSON-valued image labels.

use bp_rename_core::error::{RenameError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::image::OciImage;

impl OciImage {
    /// Get a label that must be present.
    pub fn required_label(&self, key: &str) -> Result<&str> {
        self.label(key)
            .ok_or_else(|| RenameError::LabelMissing(key.to_string()))
    }

    /// Decode a JSON label into `T`.
    ///
    /// Fails with `LabelMissing` if the label is absent and `Decode` if its
    /// value does not parse as `T`.
    pub fn get_label<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let raw = self.required_label(key)?;
        serde_json::from_str(raw).map_err(|e| RenameError::decode(key, e))
    }

    /// Store each value as compact JSON under its key, replacing any
    /// existing label with the same key.
    pub fn set_labels<K, V, I>(&mut self, labels: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Serialize,
    {
        for (key, value) in labels {
            let json = serde_json::to_string(&value)?;
            self.set_label(key, json);
        }
        Ok(())
    }
}
