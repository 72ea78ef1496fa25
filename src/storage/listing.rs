//! Listing semantics shared by the object store implementations.

use crate::storage::client::ListedObject;
use std::collections::BTreeMap;

const DELIMITER: &str = "/";

/// Turn `(key, size)` pairs into the entries a listing of `prefix` returns.
///
/// Keys outside `prefix` are dropped. Recursive listings return every object;
/// non-recursive listings group deeper keys into common prefixes, the way S3
/// does when a `/` delimiter is supplied.
pub fn group_listing<I>(prefix: &str, objects: I, recursive: bool) -> Vec<ListedObject>
where
    I: IntoIterator<Item = (String, u64)>,
{
    let mut entries: BTreeMap<String, ListedObject> = BTreeMap::new();
    for (key, size) in objects {
        if !key.starts_with(prefix) {
            continue;
        }
        if !recursive {
            if let Some(common) = compute_common_prefix(&key, prefix, DELIMITER) {
                entries.entry(common.clone()).or_insert(ListedObject {
                    key: common,
                    size: 0,
                    is_dir: true,
                });
                continue;
            }
        }
        let is_dir = key.ends_with(DELIMITER);
        entries.insert(key.clone(), ListedObject { key, size, is_dir });
    }
    entries.into_values().collect()
}

/// Compute a synthetic "common prefix" for S3 list semantics.
///
/// Returns `Some(prefix)` when `key` continues past `requested_prefix` with
/// another delimiter, i.e. it lives in a sub-directory of the listed prefix.
fn compute_common_prefix(key: &str, requested_prefix: &str, delimiter: &str) -> Option<String> {
    let after_prefix = key.strip_prefix(requested_prefix)?;
    let pos = after_prefix.find(delimiter)?;
    let mut combined = String::with_capacity(requested_prefix.len() + pos + delimiter.len());
    combined.push_str(requested_prefix);
    combined.push_str(&after_prefix[..pos + delimiter.len()]);
    Some(combined)
}
