//! Cursor pagination over an integer ordering key.
//!
//! Cursors are `base64url(key:value:hmac)` tokens. The HMAC-SHA256 signature
//! binds the value to the ordering key so a token issued for another key, or
//! edited by hand, is rejected as a validation error instead of silently
//! moving the window.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::{ApiError, ApiResult};
use crate::models::Tutorial;

type HmacSha256 = Hmac<Sha256>;

/// Ordering column used by the published listing.
pub const ORDERING_KEY: &str = "id";
pub const DEFAULT_PAGE_LIMIT: i64 = 10;
pub const MAX_PAGE_LIMIT: i64 = 100;

/// Items that can be positioned by a cursor.
pub trait CursorKey {
    fn cursor_key(&self) -> i32;
}

impl CursorKey for Tutorial {
    fn cursor_key(&self) -> i32 {
        self.id
    }
}

/// Encodes and decodes signed cursors for one ordering key.
#[derive(Clone)]
pub struct CursorCodec {
    key: String,
    mac: HmacSha256,
}

impl std::fmt::Debug for CursorCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CursorCodec").field("key", &self.key).finish()
    }
}

impl CursorCodec {
    pub fn new(key: impl Into<String>, secret: &[u8]) -> anyhow::Result<Self> {
        let mac = HmacSha256::new_from_slice(secret)
            .map_err(|_| anyhow::anyhow!("cursor secret has an invalid length"))?;
        Ok(Self {
            key: key.into(),
            mac,
        })
    }

    /// Codec with a 32-byte secret drawn at start-up. Cursors do not survive a restart.
    pub fn with_random_secret(key: impl Into<String>) -> anyhow::Result<Self> {
        let mut secret = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut secret);
        Self::new(key, &secret)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    fn sign(&self, payload: &str) -> HmacSha256 {
        let mut mac = self.mac.clone();
        mac.update(payload.as_bytes());
        mac
    }

    pub fn encode(&self, value: i32) -> String {
        let payload = format!("{}:{}", self.key, value);
        let signature = hex::encode(self.sign(&payload).finalize().into_bytes());
        URL_SAFE_NO_PAD.encode(format!("{}:{}", payload, signature))
    }

    /// Decodes `cursor`, reporting failures against the query parameter `field`.
    pub fn decode(&self, field: &str, cursor: &str) -> ApiResult<i32> {
        let invalid = |reason: &str| ApiError::validation(field, reason);

        let bytes = URL_SAFE_NO_PAD
            .decode(cursor.trim())
            .map_err(|_| invalid("Invalid cursor"))?;
        let text = String::from_utf8(bytes).map_err(|_| invalid("Invalid cursor encoding"))?;

        // key:value:signature
        let mut parts = text.rsplitn(3, ':');
        let (signature, value, key) = match (parts.next(), parts.next(), parts.next()) {
            (Some(signature), Some(value), Some(key)) => (signature, value, key),
            _ => return Err(invalid("Malformed cursor")),
        };

        if key != self.key {
            return Err(invalid(&format!(
                "Cursor was not issued for ordering key '{}'",
                self.key
            )));
        }

        let provided = hex::decode(signature).map_err(|_| invalid("Invalid cursor signature"))?;
        self.sign(&format!("{}:{}", key, value))
            .verify_slice(&provided)
            .map_err(|_| invalid("Cursor integrity check failed"))?;

        value.parse::<i32>().map_err(|_| invalid("Invalid cursor value"))
    }
}

/// Query string of the paginated listing.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub after: Option<String>,
    pub before: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    After(i32),
    Before(i32),
}

/// A decoded, bounded request for one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub position: Option<Position>,
    pub limit: i64,
}

impl Default for PageWindow {
    fn default() -> Self {
        Self {
            position: None,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl PageWindow {
    pub fn from_query(query: &PageQuery, codec: &CursorCodec) -> ApiResult<Self> {
        let limit = query.limit.unwrap_or(DEFAULT_PAGE_LIMIT);
        if !(1..=MAX_PAGE_LIMIT).contains(&limit) {
            return Err(ApiError::validation(
                "limit",
                format!("limit must be between 1 and {}", MAX_PAGE_LIMIT),
            ));
        }

        let position = match (non_blank(&query.after), non_blank(&query.before)) {
            (Some(_), Some(_)) => {
                return Err(ApiError::validation(
                    "before",
                    "after and before can not be combined",
                ))
            }
            (Some(after), None) => Some(Position::After(codec.decode("after", after)?)),
            (None, Some(before)) => Some(Position::Before(codec.decode("before", before)?)),
            (None, None) => None,
        };

        Ok(Self { position, limit })
    }
}

/// Raw result of a windowed query, as returned by a store.
///
/// `items` are in ascending key order. `cursor_count` counts the matching rows
/// on the cursor side of the window, or all matching rows without a cursor.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowRows<T> {
    pub items: Vec<T>,
    pub total_count: i64,
    pub cursor_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    pub has_previous_page: bool,
    pub start_cursor: Option<String>,
    pub end_cursor: Option<String>,
}

/// Response body of the paginated listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub data: Vec<T>,
    pub total_count: i64,
    pub page_info: PageInfo,
}

impl<T: CursorKey> Page<T> {
    pub fn assemble(window: &PageWindow, rows: WindowRows<T>, codec: &CursorCodec) -> Self {
        let remaining = rows.cursor_count - rows.items.len() as i64;
        let outside = rows.total_count - rows.cursor_count;

        let (has_next_page, has_previous_page) = match window.position {
            Some(Position::Before(_)) => (outside > 0, remaining > 0),
            Some(Position::After(_)) | None => (remaining > 0, outside > 0),
        };

        let page_info = PageInfo {
            has_next_page,
            has_previous_page,
            start_cursor: rows.items.first().map(|item| codec.encode(item.cursor_key())),
            end_cursor: rows.items.last().map(|item| codec.encode(item.cursor_key())),
        };

        Page {
            data: rows.items,
            total_count: rows.total_count,
            page_info,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Row(i32);

    impl CursorKey for Row {
        fn cursor_key(&self) -> i32 {
            self.0
        }
    }

    fn codec() -> CursorCodec {
        CursorCodec::new(ORDERING_KEY, b"pagination-test-secret").unwrap()
    }

    fn field_of(err: ApiError) -> String {
        match err {
            ApiError::Validation(errors) => errors[0].field.clone(),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_cursor_round_trip() {
        let codec = codec();
        for value in [1, 42, i32::MAX, -3] {
            let cursor = codec.encode(value);
            assert_eq!(codec.decode("after", &cursor).unwrap(), value);
        }
        assert_eq!(codec.encode(5), codec.encode(5));
    }

    #[test]
    fn test_cursor_from_other_key_is_rejected() {
        let other = CursorCodec::new("title", b"pagination-test-secret").unwrap();
        let cursor = other.encode(5);
        assert_eq!(field_of(codec().decode("after", &cursor).unwrap_err()), "after");
    }

    #[test]
    fn test_tampered_cursor_is_rejected() {
        let codec = codec();
        let text = String::from_utf8(URL_SAFE_NO_PAD.decode(codec.encode(5)).unwrap()).unwrap();
        let forged = URL_SAFE_NO_PAD.encode(text.replacen("id:5", "id:6", 1));

        assert!(codec.decode("before", &forged).is_err());
        assert!(codec.decode("before", "not a cursor!").is_err());
        assert!(codec.decode("before", &URL_SAFE_NO_PAD.encode("id:5")).is_err());

        let foreign = CursorCodec::new(ORDERING_KEY, b"another-secret").unwrap();
        assert!(codec.decode("before", &foreign.encode(5)).is_err());
    }

    #[test]
    fn test_window_from_query() {
        let codec = codec();

        let window = PageWindow::from_query(&PageQuery::default(), &codec).unwrap();
        assert_eq!(window, PageWindow::default());

        let query = PageQuery {
            after: Some(codec.encode(4)),
            limit: Some(2),
            ..Default::default()
        };
        let window = PageWindow::from_query(&query, &codec).unwrap();
        assert_eq!(window.position, Some(Position::After(4)));
        assert_eq!(window.limit, 2);

        let blank = PageQuery {
            after: Some(String::new()),
            before: Some(codec.encode(9)),
            ..Default::default()
        };
        let window = PageWindow::from_query(&blank, &codec).unwrap();
        assert_eq!(window.position, Some(Position::Before(9)));
    }

    #[test]
    fn test_window_rejects_bad_queries() {
        let codec = codec();

        let both = PageQuery {
            after: Some(codec.encode(1)),
            before: Some(codec.encode(3)),
            limit: None,
        };
        assert_eq!(field_of(PageWindow::from_query(&both, &codec).unwrap_err()), "before");

        for limit in [0, -1, MAX_PAGE_LIMIT + 1] {
            let query = PageQuery {
                limit: Some(limit),
                ..Default::default()
            };
            assert_eq!(field_of(PageWindow::from_query(&query, &codec).unwrap_err()), "limit");
        }
    }

    #[test]
    fn test_assemble_first_page() {
        let codec = codec();
        let window = PageWindow { position: None, limit: 2 };
        let rows = WindowRows {
            items: vec![Row(1), Row(2)],
            total_count: 5,
            cursor_count: 5,
        };

        let page = Page::assemble(&window, rows, &codec);
        assert_eq!(page.total_count, 5);
        assert!(page.page_info.has_next_page);
        assert!(!page.page_info.has_previous_page);
        assert_eq!(page.page_info.start_cursor, Some(codec.encode(1)));
        assert_eq!(page.page_info.end_cursor, Some(codec.encode(2)));
    }

    #[test]
    fn test_assemble_last_page_after_cursor() {
        let codec = codec();
        let window = PageWindow { position: Some(Position::After(4)), limit: 2 };
        let rows = WindowRows {
            items: vec![Row(5)],
            total_count: 5,
            cursor_count: 1,
        };

        let page = Page::assemble(&window, rows, &codec);
        assert!(!page.page_info.has_next_page);
        assert!(page.page_info.has_previous_page);
    }

    #[test]
    fn test_assemble_before_cursor() {
        let codec = codec();
        let window = PageWindow { position: Some(Position::Before(4)), limit: 2 };
        let rows = WindowRows {
            items: vec![Row(2), Row(3)],
            total_count: 5,
            cursor_count: 3,
        };

        let page = Page::assemble(&window, rows, &codec);
        assert!(page.page_info.has_next_page);
        assert!(page.page_info.has_previous_page);
    }

    #[test]
    fn test_assemble_empty_page() {
        let codec = codec();
        let rows: WindowRows<Row> = WindowRows {
            items: vec![],
            total_count: 0,
            cursor_count: 0,
        };

        let page = Page::assemble(&PageWindow::default(), rows, &codec);
        assert!(page.data.is_empty());
        assert_eq!(page.page_info.start_cursor, None);
        assert_eq!(page.page_info.end_cursor, None);
        assert!(!page.page_info.has_next_page);
        assert!(!page.page_info.has_previous_page);
    }

    #[test]
    fn test_page_serialization_shape() {
        let codec = codec();
        let rows = WindowRows {
            items: vec![Row(1)],
            total_count: 1,
            cursor_count: 1,
        };
        let page = Page::assemble(&PageWindow::default(), rows, &codec);
        let page = Page {
            data: page.data.into_iter().map(|r| r.0).collect::<Vec<_>>(),
            total_count: page.total_count,
            page_info: page.page_info,
        };

        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["data"], serde_json::json!([1]));
        assert_eq!(json["totalCount"], 1);
        assert_eq!(json["pageInfo"]["hasNextPage"], false);
        assert!(json["pageInfo"]["startCursor"].is_string());
    }
}
