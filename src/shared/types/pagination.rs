//! Page/limit resolution and pagination metadata

use std::collections::BTreeMap;

use serde::Serialize;
use utoipa::ToSchema;

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 10;

/// Pagination metadata returned with a page of results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMetadata {
    pub current_page: u64,
    pub items_per_page: u64,
    pub total_items: u64,
    pub total_pages: u64,
}

impl PaginationMetadata {
    pub fn new(page: u64, limit: u64, total_items: u64) -> Self {
        Self {
            current_page: page,
            items_per_page: limit,
            total_items,
            total_pages: total_items.div_ceil(limit.max(1)),
        }
    }

    /// Number of records preceding this page
    pub fn offset(&self) -> u64 {
        (self.current_page - 1).saturating_mul(self.items_per_page)
    }
}

/// Paginated response wrapper
#[derive(Debug, Clone, PartialEq)]
pub struct Paginated<T> {
    pub results: Vec<T>,
    pub metadata: PaginationMetadata,
}

/// Data handed to [`paginate`]: a list, or a keyed collection whose values
/// are taken in key order.
#[derive(Debug, Clone, PartialEq)]
pub enum PageSource<T> {
    List(Vec<T>),
    Keyed(Vec<(String, T)>),
}

impl<T> PageSource<T> {
    pub fn into_items(self) -> Vec<T> {
        match self {
            Self::List(items) => items,
            Self::Keyed(entries) => entries.into_iter().map(|(_, v)| v).collect(),
        }
    }
}

impl<T> From<Vec<T>> for PageSource<T> {
    fn from(items: Vec<T>) -> Self {
        Self::List(items)
    }
}

impl<K: ToString, T> From<BTreeMap<K, T>> for PageSource<T> {
    fn from(map: BTreeMap<K, T>) -> Self {
        Self::Keyed(map.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }
}

/// Base-10 integer-prefix parse: leading whitespace, optional sign, then
/// digits. Trailing garbage is ignored, so `"0x1A"` reads as `0`; no digits
/// gives `None`.
pub fn parse_int_prefix(raw: &str) -> Option<i64> {
    let s = raw.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }

    let magnitude = digits[..end]
        .bytes()
        .map(|b| i64::from(b - b'0'))
        .fold(0i64, |acc, d| acc.saturating_mul(10).saturating_add(d));
    Some(if negative { -magnitude } else { magnitude })
}

fn resolve(raw: Option<&str>, default: u64) -> u64 {
    match raw.and_then(parse_int_prefix) {
        Some(n) if n > 0 => n as u64,
        _ => default,
    }
}

/// Validated page number; missing, non-numeric or non-positive input gives 1.
pub fn resolve_page(raw: Option<&str>) -> u64 {
    resolve(raw, DEFAULT_PAGE)
}

/// Validated page size; missing, non-numeric or non-positive input gives 10.
pub fn resolve_limit(raw: Option<&str>) -> u64 {
    resolve(raw, DEFAULT_LIMIT)
}

/// Resolve page/limit and build metadata for `total_items` records.
///
/// With `slice_in_place` the items are cut down to the requested page;
/// otherwise they are assumed to be pre-sliced and returned as they are.
pub fn paginate<T>(
    data: impl Into<PageSource<T>>,
    page: Option<&str>,
    limit: Option<&str>,
    total_items: u64,
    slice_in_place: bool,
) -> Paginated<T> {
    let metadata = PaginationMetadata::new(resolve_page(page), resolve_limit(limit), total_items);
    let mut results = data.into().into_items();

    if slice_in_place {
        let start = usize::try_from(metadata.offset()).unwrap_or(usize::MAX);
        let take = usize::try_from(metadata.items_per_page).unwrap_or(usize::MAX);
        results = results.into_iter().skip(start).take(take).collect();
    }

    Paginated { results, metadata }
}
