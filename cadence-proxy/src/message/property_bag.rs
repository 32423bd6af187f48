/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */

//! Typed access to the string-keyed payload every message is built on.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::common::ProxyError;

/// Mapping from property names to optional values in their canonical wire form.
///
/// Every value is held as the string that goes on the wire: integers in base
/// 10, booleans as `"true"`/`"false"`, durations as integer nanoseconds, and
/// structured values as JSON text. Conversion happens at access time, so the
/// bag round-trips through the codec without loss.
///
/// A key can be in one of three states, and the distinction survives encoding:
///
/// * absent: never set, or [`remove`](Self::remove)d;
/// * null: explicitly set to no value (`set_string(key, None)`);
/// * present with a value.
///
/// Typed getters report both absent and null as `Ok(None)`. The exception is
/// [`get_bool`](Self::get_bool), which defaults to `false`.
#[derive(Debug, Clone, Default)]
pub struct PropertyBag {
    entries: HashMap<String, Option<String>>,
}

impl PropertyBag {
    /// Creates an empty bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys, null entries included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no key has been set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `true` if the key has been set, even to null.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns `true` if the key has been explicitly set to null.
    #[must_use]
    pub fn is_null(&self, key: &str) -> bool {
        matches!(self.entries.get(key), Some(None))
    }

    /// Removes a key entirely, returning its previous state.
    pub fn remove(&mut self, key: &str) -> Option<Option<String>> {
        self.entries.remove(key)
    }

    /// Wire-level read: `None` when absent, `Some(None)` when null.
    #[must_use]
    pub fn get_raw(&self, key: &str) -> Option<Option<&str>> {
        self.entries.get(key).map(Option::as_deref)
    }

    /// Wire-level write of an already canonical value.
    pub fn insert_raw(&mut self, key: impl Into<String>, value: Option<String>) {
        self.entries.insert(key.into(), value);
    }

    /// Iterates over `(key, value)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> + '_ {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_deref()))
    }

    /// Reads a string property.
    #[must_use]
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.entries.get(key).and_then(Option::as_deref)
    }

    /// Writes a string property; `None` stores an explicit null.
    pub fn set_string(&mut self, key: &str, value: Option<&str>) {
        self.insert_raw(key, value.map(str::to_string));
    }

    /// Reads a 32-bit integer property.
    pub fn get_i32(&self, key: &str) -> Result<Option<i32>, ProxyError> {
        self.parse(key, "i32")
    }

    /// Writes a 32-bit integer property.
    pub fn set_i32(&mut self, key: &str, value: i32) {
        self.insert_raw(key, Some(value.to_string()));
    }

    /// Reads a 64-bit integer property.
    pub fn get_i64(&self, key: &str) -> Result<Option<i64>, ProxyError> {
        self.parse(key, "i64")
    }

    /// Writes a 64-bit integer property.
    pub fn set_i64(&mut self, key: &str, value: i64) {
        self.insert_raw(key, Some(value.to_string()));
    }

    /// Reads a boolean property, `false` when absent or null.
    pub fn get_bool(&self, key: &str) -> Result<bool, ProxyError> {
        match self.get_string(key) {
            None => Ok(false),
            Some(value) if value.eq_ignore_ascii_case("true") => Ok(true),
            Some(value) if value.eq_ignore_ascii_case("false") => Ok(false),
            Some(_) => Err(mismatch(key, "bool")),
        }
    }

    /// Writes a boolean property.
    pub fn set_bool(&mut self, key: &str, value: bool) {
        self.insert_raw(key, Some(value.to_string()));
    }

    /// Reads a duration stored as integer nanoseconds.
    pub fn get_duration(&self, key: &str) -> Result<Option<Duration>, ProxyError> {
        Ok(self
            .parse::<u64>(key, "duration")?
            .map(Duration::from_nanos))
    }

    /// Writes a duration as integer nanoseconds, saturating at `u64::MAX`.
    pub fn set_duration(&mut self, key: &str, value: Duration) {
        let nanos = u64::try_from(value.as_nanos()).unwrap_or(u64::MAX);
        self.insert_raw(key, Some(nanos.to_string()));
    }

    /// Reads a structured property from its JSON text.
    pub fn get_json<T>(&self, key: &str) -> Result<Option<T>, ProxyError>
    where
        T: DeserializeOwned,
    {
        self.get_string(key)
            .map(|text| {
                serde_json::from_str(text).map_err(|_| mismatch(key, std::any::type_name::<T>()))
            })
            .transpose()
    }

    /// Writes a structured property as JSON text; `None` stores an explicit null.
    pub fn set_json<T>(&mut self, key: &str, value: Option<&T>) -> Result<(), ProxyError>
    where
        T: Serialize + ?Sized,
    {
        let text = value.map(serde_json::to_string).transpose()?;
        self.insert_raw(key, text);
        Ok(())
    }

    fn parse<T: FromStr>(&self, key: &str, expected: &'static str) -> Result<Option<T>, ProxyError> {
        self.get_string(key)
            .map(|text| text.trim().parse::<T>().map_err(|_| mismatch(key, expected)))
            .transpose()
    }
}

fn mismatch(key: &str, expected: &'static str) -> ProxyError {
    ProxyError::TypeMismatch {
        key: key.to_string(),
        expected,
    }
}

/// Two values are equal when their text matches or when both are JSON
/// documents with the same content, so the key order of an embedded object
/// does not matter.
fn values_equivalent(left: Option<&str>, right: Option<&str>) -> bool {
    match (left, right) {
        (None, None) => true,
        (Some(left), Some(right)) => {
            left == right
                || matches!(
                    (
                        serde_json::from_str::<serde_json::Value>(left),
                        serde_json::from_str::<serde_json::Value>(right),
                    ),
                    (Ok(a), Ok(b)) if a == b
                )
        }
        _ => false,
    }
}

impl PartialEq for PropertyBag {
    fn eq(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len()
            && self.entries.iter().all(|(key, value)| {
                other
                    .entries
                    .get(key)
                    .is_some_and(|other_value| values_equivalent(value.as_deref(), other_value.as_deref()))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Options {
        task_list: String,
        timeout: String,
    }

    #[test]
    fn test_absent_and_null_are_distinguishable() {
        let mut bag = PropertyBag::new();
        assert!(!bag.contains_key("Name"));
        assert_eq!(bag.get_raw("Name"), None);

        bag.set_string("Name", None);
        assert!(bag.contains_key("Name"));
        assert!(bag.is_null("Name"));
        assert_eq!(bag.get_raw("Name"), Some(None));
        assert_eq!(bag.get_string("Name"), None);

        bag.set_string("Name", Some("orders"));
        assert!(!bag.is_null("Name"));
        assert_eq!(bag.get_string("Name"), Some("orders"));

        assert_eq!(bag.remove("Name"), Some(Some("orders".to_string())));
        assert!(!bag.contains_key("Name"));
    }

    #[test]
    fn test_integers() {
        let mut bag = PropertyBag::new();
        assert_eq!(bag.get_i32("RetentionDays").unwrap(), None);

        bag.set_i32("RetentionDays", 30);
        assert_eq!(bag.get_raw("RetentionDays"), Some(Some("30")));
        assert_eq!(bag.get_i32("RetentionDays").unwrap(), Some(30));

        bag.set_i64("RequestId", i64::MAX);
        assert_eq!(bag.get_i64("RequestId").unwrap(), Some(i64::MAX));
    }

    #[test]
    fn test_type_mismatch() {
        let mut bag = PropertyBag::new();
        bag.set_string("RetentionDays", Some("thirty"));

        let err = bag.get_i32("RetentionDays").unwrap_err();
        assert_eq!(
            err,
            ProxyError::TypeMismatch {
                key: "RetentionDays".into(),
                expected: "i32"
            }
        );

        bag.set_string("EmitMetrics", Some("yes"));
        assert!(matches!(bag.get_bool("EmitMetrics"), Err(ProxyError::TypeMismatch { .. })));
    }

    #[test]
    fn test_bool_defaults_to_false() {
        let mut bag = PropertyBag::new();
        assert!(!bag.get_bool("EmitMetrics").unwrap());

        bag.set_bool("EmitMetrics", true);
        assert_eq!(bag.get_raw("EmitMetrics"), Some(Some("true")));
        assert!(bag.get_bool("EmitMetrics").unwrap());

        bag.set_string("EmitMetrics", Some("True"));
        assert!(bag.get_bool("EmitMetrics").unwrap());
    }

    #[test]
    fn test_duration() {
        let mut bag = PropertyBag::new();
        bag.set_duration("DecisionTimeout", Duration::from_secs(120 * 60));
        assert_eq!(
            bag.get_duration("DecisionTimeout").unwrap(),
            Some(Duration::from_secs(7200))
        );
    }

    #[test]
    fn test_json_values() {
        let mut bag = PropertyBag::new();
        let options = Options {
            task_list: "my-list".into(),
            timeout: "100s".into(),
        };

        bag.set_json("Options", Some(&options)).unwrap();
        assert_eq!(bag.get_json::<Options>("Options").unwrap(), Some(options));

        bag.set_json::<Options>("Options", None).unwrap();
        assert!(bag.is_null("Options"));
        assert_eq!(bag.get_json::<Options>("Options").unwrap(), None);

        bag.set_string("Options", Some("{not json"));
        assert!(bag.get_json::<Options>("Options").is_err());
    }

    #[test]
    fn test_equality_ignores_json_layout() {
        let mut left = PropertyBag::new();
        left.set_string("Args", Some(r#"{"a":1,"b":2}"#));
        left.set_string("Name", None);

        let mut right = PropertyBag::new();
        right.set_string("Name", None);
        right.set_string("Args", Some(r#"{ "b": 2, "a": 1 }"#));

        assert_eq!(left, right);

        right.set_string("Name", Some(""));
        assert_ne!(left, right);
    }
}
