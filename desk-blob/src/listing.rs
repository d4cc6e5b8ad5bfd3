//! Classification, filtering, sorting and pagination of blob listings.
//!
//! Everything here is a pure function over a slice of [`Blob`]s; the
//! output is recomputed from scratch whenever the query changes.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::Blob;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "webp"];
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "mkv", "webm"];

pub const DEFAULT_VISIBLE_COUNT: usize = 10;
pub const LOAD_MORE_STEP: usize = 5;

/// Lowercased extension after the last `.`, if any.
pub fn extension(name: &str) -> Option<String> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaCategory {
    Image,
    Video,
    Other,
}

impl MediaCategory {
    pub fn classify(name: &str) -> Self {
        match extension(name) {
            Some(ext) if IMAGE_EXTENSIONS.contains(&ext.as_str()) => MediaCategory::Image,
            Some(ext) if VIDEO_EXTENSIONS.contains(&ext.as_str()) => MediaCategory::Video,
            _ => MediaCategory::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaCategory::Image => "image",
            MediaCategory::Video => "video",
            MediaCategory::Other => "other",
        }
    }
}

/// MIME type guessed from the extension, for serving and uploads.
pub fn content_type_for(name: &str) -> &'static str {
    match extension(name).as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        Some("webp") => "image/webp",
        Some("mp4") => "video/mp4",
        Some("mov") => "video/quicktime",
        Some("avi") => "video/x-msvideo",
        Some("mkv") => "video/x-matroska",
        Some("webm") => "video/webm",
        Some("txt") => "text/plain",
        Some("json") => "application/json",
        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}

#[derive(Debug)]
pub struct ParseQueryError(String);

impl fmt::Display for ParseQueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ParseQueryError {}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeFilter {
    #[default]
    All,
    Image,
    Video,
}

impl TypeFilter {
    pub fn matches(&self, category: MediaCategory) -> bool {
        match self {
            TypeFilter::All => true,
            TypeFilter::Image => category == MediaCategory::Image,
            TypeFilter::Video => category == MediaCategory::Video,
        }
    }
}

impl FromStr for TypeFilter {
    type Err = ParseQueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "all" => Ok(TypeFilter::All),
            "image" | "images" => Ok(TypeFilter::Image),
            "video" | "videos" => Ok(TypeFilter::Video),
            other => Err(ParseQueryError(format!("unknown type filter: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Ascending,
    Descending,
    /// Newest `createdAt` first
    Recent,
}

impl FromStr for SortOrder {
    type Err = ParseQueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortOrder::Ascending),
            "desc" | "descending" => Ok(SortOrder::Descending),
            "recent" | "newest" => Ok(SortOrder::Recent),
            other => Err(ParseQueryError(format!("unknown sort order: {other}"))),
        }
    }
}

/// Case-insensitive comparison, falling back to byte order for ties.
pub fn collate(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Inclusive `createdAt` bounds in epoch millis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start_ms: Option<i64>,
    pub end_ms: Option<i64>,
}

impl DateRange {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn from_millis(start_ms: Option<i64>, end_ms: Option<i64>) -> Self {
        Self { start_ms, end_ms }
    }

    /// `[start 00:00:00.000, end 23:59:59.999]` in UTC.
    pub fn from_dates(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        let start_ms = start.map(|d| Utc.from_utc_datetime(&d.and_time(NaiveTime::MIN)).timestamp_millis());
        let end_ms = end.map(|d| {
            let next_midnight = d
                .succ_opt()
                .map(|n| Utc.from_utc_datetime(&n.and_time(NaiveTime::MIN)).timestamp_millis())
                .unwrap_or(i64::MAX);
            next_midnight.saturating_sub(1)
        });
        Self { start_ms, end_ms }
    }

    /// Parse `YYYY-MM-DD` bounds; empty strings mean open.
    pub fn parse(start: Option<&str>, end: Option<&str>) -> Result<Self, ParseQueryError> {
        fn date(raw: Option<&str>) -> Result<Option<NaiveDate>, ParseQueryError> {
            match raw.map(str::trim) {
                None | Some("") => Ok(None),
                Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .map(Some)
                    .map_err(|e| ParseQueryError(format!("invalid date {s:?}: {e}"))),
            }
        }
        Ok(Self::from_dates(date(start)?, date(end)?))
    }

    pub fn is_bounded(&self) -> bool {
        self.start_ms.is_some() || self.end_ms.is_some()
    }

    /// Blobs without a timestamp only pass an unbounded range.
    pub fn contains(&self, created_at: Option<i64>) -> bool {
        if !self.is_bounded() {
            return true;
        }
        let Some(ts) = created_at else {
            return false;
        };
        self.start_ms.map_or(true, |s| ts >= s) && self.end_ms.map_or(true, |e| ts <= e)
    }
}

/// Filter + sort specification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingQuery {
    pub type_filter: TypeFilter,
    pub date_range: DateRange,
    pub search: Option<String>,
    /// `None` keeps the input order.
    pub order: Option<SortOrder>,
}

impl ListingQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_type(mut self, filter: TypeFilter) -> Self {
        self.type_filter = filter;
        self
    }

    pub fn with_date_range(mut self, range: DateRange) -> Self {
        self.date_range = range;
        self
    }

    pub fn with_search<S: Into<String>>(mut self, term: S) -> Self {
        let term = term.into();
        self.search = if term.trim().is_empty() { None } else { Some(term) };
        self
    }

    pub fn with_order(mut self, order: SortOrder) -> Self {
        self.order = Some(order);
        self
    }

    pub fn matches(&self, blob: &Blob) -> bool {
        if !self.type_filter.matches(blob.category) {
            return false;
        }
        if !self.date_range.contains(blob.created_at) {
            return false;
        }
        match &self.search {
            Some(term) => blob
                .stored_name
                .to_lowercase()
                .contains(&term.to_lowercase()),
            None => true,
        }
    }

    pub fn apply(&self, blobs: &[Blob]) -> Vec<Blob> {
        let mut out: Vec<Blob> = blobs.iter().filter(|b| self.matches(b)).cloned().collect();

        match self.order {
            Some(SortOrder::Ascending) => {
                out.sort_by(|a, b| collate(&a.stored_name, &b.stored_name))
            }
            Some(SortOrder::Descending) => {
                out.sort_by(|a, b| collate(&b.stored_name, &a.stored_name))
            }
            Some(SortOrder::Recent) => out.sort_by(|a, b| {
                // untimestamped entries sink to the end
                match (a.created_at, b.created_at) {
                    (Some(x), Some(y)) => y.cmp(&x),
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                }
                .then_with(|| collate(&a.stored_name, &b.stored_name))
            }),
            None => {}
        }
        out
    }

    pub fn apply_paged(&self, blobs: &[Blob], pagination: &Pagination) -> Page {
        let all = self.apply(blobs);
        let total = all.len();
        let shown = pagination.visible_count.min(total);
        let mut items = all;
        items.truncate(shown);
        Page {
            items,
            total,
            visible_count: shown,
            has_more: pagination.has_more(total),
        }
    }
}

/// "Load more" pagination: the first `visible_count` items are shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub visible_count: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            visible_count: DEFAULT_VISIBLE_COUNT,
        }
    }
}

impl Pagination {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_more(&mut self) {
        self.visible_count += LOAD_MORE_STEP;
    }

    pub fn reset(&mut self) {
        self.visible_count = DEFAULT_VISIBLE_COUNT;
    }

    pub fn visible<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        &items[..self.visible_count.min(items.len())]
    }

    pub fn has_more(&self, total: usize) -> bool {
        total > self.visible_count
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub items: Vec<Blob>,
    pub total: usize,
    /// Items actually shown, never more than `total`.
    pub visible_count: usize,
    pub has_more: bool,
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::naming::parse_stored_name;

    pub(crate) fn blob(name: &str) -> Blob {
        let (created_at, original) = parse_stored_name(name);
        Blob {
            stored_name: name.to_string(),
            original_name: original.to_string(),
            created_at,
            size_bytes: 1,
            access_url: format!("/uploads/{name}"),
            category: MediaCategory::classify(name),
            display_name: None,
            description: None,
        }
    }

    fn names(blobs: &[Blob]) -> Vec<&str> {
        blobs.iter().map(|b| b.stored_name.as_str()).collect()
    }

    #[test]
    fn classify_by_extension() {
        assert_eq!(MediaCategory::classify("a.png"), MediaCategory::Image);
        assert_eq!(MediaCategory::classify("A.JPEG"), MediaCategory::Image);
        assert_eq!(MediaCategory::classify("a.mp4"), MediaCategory::Video);
        assert_eq!(MediaCategory::classify("clip.WebM"), MediaCategory::Video);
        assert_eq!(MediaCategory::classify("a.txt"), MediaCategory::Other);
        assert_eq!(MediaCategory::classify("png"), MediaCategory::Other);
        assert_eq!(MediaCategory::classify(".png"), MediaCategory::Other);
    }

    #[test]
    fn type_filter_excludes_other() {
        let blobs = vec![blob("1-a.png"), blob("2-a.mp4"), blob("3-a.txt")];

        let images = ListingQuery::new().with_type(TypeFilter::Image).apply(&blobs);
        assert_eq!(names(&images), vec!["1-a.png"]);

        let videos = ListingQuery::new().with_type(TypeFilter::Video).apply(&blobs);
        assert_eq!(names(&videos), vec!["2-a.mp4"]);

        let all = ListingQuery::new().apply(&blobs);
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn millis_range_is_inclusive() {
        let blobs = vec![blob("1000-a.png"), blob("2000-b.png"), blob("2500-c.png")];
        let q = ListingQuery::new().with_date_range(DateRange::from_millis(Some(1500), Some(2500)));
        assert_eq!(names(&q.apply(&blobs)), vec!["2000-b.png", "2500-c.png"]);

        let q = ListingQuery::new().with_date_range(DateRange::from_millis(Some(1500), Some(2499)));
        assert_eq!(names(&q.apply(&blobs)), vec!["2000-b.png"]);
    }

    #[test]
    fn calendar_days_cover_whole_day() {
        // 2024-03-10T00:00:00Z = 1710028800000
        let day_start = 1_710_028_800_000i64;
        let blobs = vec![
            blob(&format!("{}-early.png", day_start - 1)),
            blob(&format!("{}-midnight.png", day_start)),
            blob(&format!("{}-late.png", day_start + 86_400_000 - 1)),
            blob(&format!("{}-next.png", day_start + 86_400_000)),
            blob("nodate.png"),
        ];
        let range = DateRange::parse(Some("2024-03-10"), Some("2024-03-10")).unwrap();
        let got = ListingQuery::new().with_date_range(range).apply(&blobs);
        assert_eq!(got.len(), 2);
        assert!(got[0].stored_name.ends_with("midnight.png"));
        assert!(got[1].stored_name.ends_with("late.png"));
    }

    #[test]
    fn unparsable_prefix_only_passes_open_range() {
        let blobs = vec![blob("cat.png")];
        assert_eq!(ListingQuery::new().apply(&blobs).len(), 1);
        let q = ListingQuery::new().with_date_range(DateRange::from_millis(Some(0), None));
        assert!(q.apply(&blobs).is_empty());
        assert!(DateRange::parse(Some("10/03/2024"), None).is_err());
    }

    #[test]
    fn search_is_case_insensitive_on_stored_name() {
        let blobs = vec![blob("1-Holiday.PNG"), blob("2-work.png")];
        let q = ListingQuery::new().with_search("holiday");
        assert_eq!(names(&q.apply(&blobs)), vec!["1-Holiday.PNG"]);
        assert_eq!(ListingQuery::new().with_search("  ").apply(&blobs).len(), 2);
    }

    #[test]
    fn sort_orders() {
        let blobs = vec![blob("b.png"), blob("a.png"), blob("c.png")];
        let asc = ListingQuery::new().with_order(SortOrder::Ascending).apply(&blobs);
        assert_eq!(names(&asc), vec!["a.png", "b.png", "c.png"]);
        let desc = ListingQuery::new().with_order(SortOrder::Descending).apply(&blobs);
        assert_eq!(names(&desc), vec!["c.png", "b.png", "a.png"]);

        let mixed = vec![blob("B.png"), blob("a.png"), blob("b.png")];
        let asc = ListingQuery::new().with_order(SortOrder::Ascending).apply(&mixed);
        assert_eq!(names(&asc), vec!["a.png", "B.png", "b.png"]);

        let timed = vec![blob("1000-z.png"), blob("x.png"), blob("3000-a.png")];
        let recent = ListingQuery::new().with_order(SortOrder::Recent).apply(&timed);
        assert_eq!(names(&recent), vec!["3000-a.png", "1000-z.png", "x.png"]);
    }

    #[test]
    fn load_more_reveals_five_at_a_time() {
        let blobs: Vec<Blob> = (0..12).map(|i| blob(&format!("{i}-f.png"))).collect();
        let q = ListingQuery::new();
        let mut pages = Pagination::new();

        let page = q.apply_paged(&blobs, &pages);
        assert_eq!(page.items.len(), 10);
        assert_eq!(page.total, 12);
        assert!(page.has_more);

        pages.load_more();
        let page = q.apply_paged(&blobs, &pages);
        assert_eq!(page.items.len(), 12);
        assert_eq!(page.visible_count, 12);
        assert!(!page.has_more);

        // the window stays at 15 even though only 12 exist
        assert_eq!(pages.visible_count, 15);
        let page = q.apply_paged(&blobs[..3], &pages);
        assert_eq!(page.visible_count, 3);

        pages.reset();
        assert_eq!(pages.visible(&blobs).len(), 10);
    }

    #[test]
    fn query_strings() {
        assert_eq!("IMAGE".parse::<TypeFilter>().unwrap(), TypeFilter::Image);
        assert_eq!("".parse::<TypeFilter>().unwrap(), TypeFilter::All);
        assert_eq!("desc".parse::<SortOrder>().unwrap(), SortOrder::Descending);
        assert!("sideways".parse::<SortOrder>().is_err());
        assert_eq!(content_type_for("1-a.MOV"), "video/quicktime");
    }
}
