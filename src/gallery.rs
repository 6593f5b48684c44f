// Paged listing of generated images.
// Unlike the front-page sections there is no demo fallback here: a failed
// page is returned as an error and the caller shows it.
use std::cmp::Ordering;
use std::sync::Arc;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::content::{encode_query, endpoints, get_json};
use crate::error::Result;
use crate::transport::{Request, Response, Transport};

pub const DEFAULT_LIMIT: usize = 12;
pub const DEFAULT_SORT: &str = "-mtime";
/// Sort keys the listing understands; a leading `-` means descending.
pub const SORT_KEYS: [&str; 4] = ["-mtime", "mtime", "name", "-name"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GalleryQuery {
    pub limit: usize,
    pub offset: usize,
    pub sort: String,
}

impl Default for GalleryQuery {
    fn default() -> Self {
        Self { limit: DEFAULT_LIMIT, offset: 0, sort: DEFAULT_SORT.to_string() }
    }
}

impl GalleryQuery {
    pub fn query_string(&self) -> String {
        encode_query(&[("limit", &self.limit.to_string()), ("offset", &self.offset.to_string()), ("sort", &self.sort)])
    }

    pub fn path(&self) -> String {
        format!("{}?{}", endpoints::GENERATED_IMAGES, self.query_string())
    }

    pub fn next_page(&self) -> Self {
        Self { offset: self.offset + self.limit, ..self.clone() }
    }

    pub fn prev_page(&self) -> Self {
        Self { offset: self.offset.saturating_sub(self.limit), ..self.clone() }
    }

    /// New sort order, back to the first page.
    pub fn with_sort(&self, sort: impl Into<String>) -> Self {
        Self { sort: sort.into(), offset: 0, ..self.clone() }
    }

    /// New page size, back to the first page.
    pub fn with_limit(&self, limit: usize) -> Self {
        Self { limit, offset: 0, ..self.clone() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageItem {
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relative_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytes: Option<u64>,
    /// ISO-8601 modification time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mtime: Option<String>,
}

impl ImageItem {
    /// Same-origin URL first, absolute URL otherwise.
    pub fn src(&self) -> Option<&str> {
        self.relative_url.as_deref().or(self.url.as_deref())
    }

    pub fn size_label(&self) -> String {
        self.bytes.map(format_bytes).unwrap_or_default()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GalleryPage {
    pub count: usize,
    pub offset: usize,
    pub limit: usize,
    pub results: Vec<ImageItem>,
}

impl GalleryPage {
    pub fn can_prev(&self) -> bool {
        self.offset > 0
    }

    pub fn can_next(&self) -> bool {
        self.offset + self.limit < self.count
    }

    /// 1-based `(first, last, total)` for "Showing a–b of n".
    pub fn showing(&self) -> (usize, usize, usize) {
        let total = self.count;
        (total.min(self.offset + 1), total.min(self.offset + self.results.len()), total)
    }
}

/// `1536` → `"1.5 KB"`; whole bytes below 1 KiB.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 { format!("{size:.0} {}", UNITS[unit]) } else { format!("{size:.1} {}", UNITS[unit]) }
}

#[derive(Clone)]
pub struct GalleryClient {
    transport: Arc<dyn Transport>,
}

impl GalleryClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub fn fetch(&self, query: &GalleryQuery) -> Result<GalleryPage> {
        let path = query.path();
        debug!("GET {path}");
        get_json(self.transport.as_ref(), &path)
    }
}

/// Serves the listing endpoint from an in-memory item set. Sorting is
/// stable, so paging over it is consistent.
#[derive(Clone, Debug, Default)]
pub struct DemoGallery {
    items: Vec<ImageItem>,
}

impl DemoGallery {
    pub fn new(items: Vec<ImageItem>) -> Self {
        Self { items }
    }

    fn sorted(&self, sort: &str) -> Option<Vec<&ImageItem>> {
        let (descending, key) = match sort.strip_prefix('-') {
            Some(key) => (true, key),
            None => (false, sort),
        };
        let compare: fn(&ImageItem, &ImageItem) -> Ordering = match key {
            "mtime" => |a: &ImageItem, b: &ImageItem| a.mtime.cmp(&b.mtime),
            "name" => |a: &ImageItem, b: &ImageItem| a.filename.cmp(&b.filename),
            _ => return None,
        };
        let mut items: Vec<&ImageItem> = self.items.iter().collect();
        if descending {
            items.sort_by(|a, b| compare(b, a));
        } else {
            items.sort_by(|a, b| compare(a, b));
        }
        Some(items)
    }

    fn page(&self, query: &GalleryQuery) -> Option<GalleryPage> {
        let items = self.sorted(&query.sort)?;
        let results = items.into_iter().skip(query.offset).take(query.limit).cloned().collect();
        Some(GalleryPage { count: self.items.len(), offset: query.offset, limit: query.limit, results })
    }
}

/// Parse `limit`, `offset` and `sort` from a listing query string. Missing
/// keys take the defaults; malformed numbers are `None`.
fn parse_query(query: &str) -> Option<GalleryQuery> {
    let mut parsed = GalleryQuery::default();
    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        match key {
            "limit" => parsed.limit = value.parse().ok()?,
            "offset" => parsed.offset = value.parse().ok()?,
            "sort" => parsed.sort = value.to_string(),
            _ => {}
        }
    }
    Some(parsed)
}

impl Transport for DemoGallery {
    fn get(&self, request: &Request) -> Result<Response> {
        let (path, query) = request.path.split_once('?').unwrap_or((request.path.as_str(), ""));
        if path != endpoints::GENERATED_IMAGES {
            return Ok(Response { status: 404, body: Vec::new() });
        }
        let Some(page) = parse_query(query).and_then(|q| self.page(&q)) else {
            return Ok(Response { status: 400, body: b"bad listing query".to_vec() });
        };
        let body = serde_json::to_vec(&page)?;
        Ok(Response { status: 200, body })
    }
}
