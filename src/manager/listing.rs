//! Read-time projections of backend listings, plus search and sort.

use crate::storage::ObjectMeta;
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::cmp::Reverse;

const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const UNKNOWN: &str = "Unknown";

/// A file in the active namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    pub name: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub file_type: String,
    #[serde(rename = "date_modified", serialize_with = "serialize_timestamp")]
    pub modified_at: Option<DateTime<Utc>>,
}

/// A file sitting in the trash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrashEntry {
    pub name: String,
    pub size: u64,
    #[serde(rename = "date_deleted", serialize_with = "serialize_timestamp")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl From<ObjectMeta> for FileEntry {
    fn from(meta: ObjectMeta) -> Self {
        Self {
            file_type: file_type(&meta.name),
            name: meta.name,
            size: meta.size,
            modified_at: meta.modified,
        }
    }
}

impl From<ObjectMeta> for TrashEntry {
    fn from(meta: ObjectMeta) -> Self {
        Self {
            name: meta.name,
            size: meta.size,
            deleted_at: meta.modified,
        }
    }
}

fn serialize_timestamp<S: Serializer>(
    value: &Option<DateTime<Utc>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(t) => serializer.collect_str(&t.with_timezone(&Local).format(DISPLAY_FORMAT)),
        None => serializer.serialize_str(UNKNOWN),
    }
}

/// Text after the last `.` of a name, verbatim, or `"Unknown"`.
pub fn file_type(name: &str) -> String {
    match name.rsplit_once('.') {
        Some((_, ext)) => ext.to_string(),
        None => UNKNOWN.to_string(),
    }
}

/// Sort order for listings. Unrecognized values fall back to `Name`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    #[default]
    Name,
    Size,
    DateModified,
}

impl From<&str> for SortKey {
    fn from(s: &str) -> Self {
        match s {
            "size" => SortKey::Size,
            "date_modified" => SortKey::DateModified,
            _ => SortKey::Name,
        }
    }
}

/// Query parameters accepted by listings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    pub search: Option<String>,
    pub sort_by: Option<String>,
}

impl ListQuery {
    pub fn sort_key(&self) -> SortKey {
        self.sort_by.as_deref().map(SortKey::from).unwrap_or_default()
    }
}

/// Common view over listed entries for filtering and sorting.
pub trait Listed {
    fn name(&self) -> &str;
    fn size(&self) -> u64;
    fn timestamp(&self) -> Option<DateTime<Utc>>;
}

impl Listed for FileEntry {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.modified_at
    }
}

impl Listed for TrashEntry {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }
}

/// Keep entries whose name contains `search`, case-insensitively.
pub fn filter_entries<T: Listed>(entries: &mut Vec<T>, search: Option<&str>) {
    let Some(query) = search.map(str::to_lowercase).filter(|q| !q.is_empty()) else {
        return;
    };
    entries.retain(|e| e.name().to_lowercase().contains(&query));
}

/// Sort in place. Returns `false`, leaving the order untouched, when the key
/// cannot be evaluated for every entry.
pub fn sort_entries<T: Listed>(entries: &mut [T], key: SortKey) -> bool {
    match key {
        SortKey::Name => entries.sort_by_cached_key(|e| e.name().to_lowercase()),
        SortKey::Size => entries.sort_by_key(|e| e.size()),
        SortKey::DateModified => {
            if let Some(bad) = entries.iter().find(|e| e.timestamp().is_none()) {
                log::warn!(
                    "cannot sort by date_modified: '{}' has no timestamp, returning unsorted",
                    bad.name()
                );
                return false;
            }
            entries.sort_by_key(|e| Reverse(e.timestamp()));
        }
    }
    true
}

/// Project, filter and sort a raw backend listing.
pub fn build_listing<T>(raw: Vec<ObjectMeta>, query: &ListQuery) -> Vec<T>
where
    T: Listed + From<ObjectMeta>,
{
    let mut entries: Vec<T> = raw.into_iter().map(T::from).collect();
    filter_entries(&mut entries, query.search.as_deref());
    sort_entries(&mut entries, query.sort_key());
    entries
}
