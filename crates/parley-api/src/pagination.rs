use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use url::Url;

use parley_types::api::Page;

use crate::auth::AppState;
use crate::error::ApiError;

const LIMIT_PARAM: &str = "limit";
const OFFSET_PARAM: &str = "offset";

#[derive(Debug, Clone, Copy)]
pub struct PaginationSettings {
    /// Page size when the request gives no usable `limit`.
    pub default_limit: u64,
    pub max_limit: u64,
}

impl Default for PaginationSettings {
    fn default() -> Self {
        Self {
            default_limit: 10,
            max_limit: 100,
        }
    }
}

/// Limit-offset window resolved from the query string, plus the absolute
/// request URL used to build `next`/`previous` links.
#[derive(Debug, Clone)]
pub struct PageRequest {
    pub limit: u64,
    pub offset: u64,
    url: Option<Url>,
}

impl PageRequest {
    pub fn new(settings: PaginationSettings, host: Option<&str>, path_and_query: &str) -> Self {
        let url = Url::parse(&format!("http://{}{}", host.unwrap_or("localhost"), path_and_query))
            .or_else(|_| Url::parse(&format!("http://localhost{}", path_and_query)))
            .ok();

        let (mut limit_raw, mut offset_raw) = (None, None);
        for (key, value) in url.iter().flat_map(Url::query_pairs) {
            match &*key {
                LIMIT_PARAM => limit_raw = Some(value.into_owned()),
                OFFSET_PARAM => offset_raw = Some(value.into_owned()),
                _ => {}
            }
        }

        let limit = limit_raw
            .and_then(|v| v.trim().parse::<i64>().ok())
            .filter(|&v| v > 0)
            .map(|v| (v as u64).min(settings.max_limit))
            .unwrap_or(settings.default_limit);

        let offset = offset_raw
            .and_then(|v| v.trim().parse::<i64>().ok())
            .filter(|&v| v >= 0)
            .map(|v| v as u64)
            .unwrap_or(0);

        Self { limit, offset, url }
    }

    pub fn into_page<T>(self, count: u64, results: Vec<T>) -> Page<T> {
        Page {
            count,
            next: self.next_link(count),
            previous: self.previous_link(),
            results,
        }
    }

    fn next_link(&self, count: u64) -> Option<String> {
        if self.offset + self.limit >= count {
            return None;
        }
        self.link(Some(self.offset + self.limit))
    }

    fn previous_link(&self) -> Option<String> {
        if self.offset == 0 {
            return None;
        }
        if self.offset <= self.limit {
            return self.link(None);
        }
        self.link(Some(self.offset - self.limit))
    }

    /// Current URL with `limit` pinned and `offset` set, or dropped when
    /// `None`. Query parameters come out sorted by key.
    fn link(&self, offset: Option<u64>) -> Option<String> {
        let mut url = self.url.clone()?;

        let mut pairs: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(k, _)| k != LIMIT_PARAM && k != OFFSET_PARAM)
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        pairs.push((LIMIT_PARAM.to_string(), self.limit.to_string()));
        if let Some(offset) = offset {
            pairs.push((OFFSET_PARAM.to_string(), offset.to_string()));
        }
        pairs.sort_by(|a, b| a.0.cmp(&b.0));

        url.query_pairs_mut().clear().extend_pairs(pairs);
        Some(url.to_string())
    }
}

impl FromRequestParts<AppState> for PageRequest {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let host = parts
            .headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok());
        let path_and_query = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        Ok(PageRequest::new(state.pagination, host, path_and_query))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> PaginationSettings {
        PaginationSettings {
            default_limit: 10,
            max_limit: 50,
        }
    }

    fn request(pq: &str) -> PageRequest {
        PageRequest::new(settings(), Some("chat.test"), pq)
    }

    #[test]
    fn defaults_when_params_absent_or_invalid() {
        for pq in ["/threads/", "/threads/?limit=0&offset=-3", "/threads/?limit=abc&offset=x"] {
            let page = request(pq);
            assert_eq!((page.limit, page.offset), (10, 0), "{pq}");
        }
    }

    #[test]
    fn limit_capped_at_max() {
        let page = request("/threads/?limit=500&offset=20");
        assert_eq!((page.limit, page.offset), (50, 20));
    }

    #[test]
    fn first_page_links() {
        let page = request("/messages/1/?limit=2").into_page(5, vec![(), ()]);
        assert_eq!(page.next.as_deref(), Some("http://chat.test/messages/1/?limit=2&offset=2"));
        assert_eq!(page.previous, None);
    }

    #[test]
    fn middle_page_links() {
        let page = request("/messages/1/?offset=4&limit=2").into_page(7, vec![(), ()]);
        assert_eq!(page.next.as_deref(), Some("http://chat.test/messages/1/?limit=2&offset=6"));
        assert_eq!(page.previous.as_deref(), Some("http://chat.test/messages/1/?limit=2&offset=2"));
    }

    #[test]
    fn previous_drops_offset_when_reaching_start() {
        let page = request("/messages/1/?limit=2&offset=2").into_page(3, vec![()]);
        assert_eq!(page.next, None);
        assert_eq!(page.previous.as_deref(), Some("http://chat.test/messages/1/?limit=2"));
    }

    #[test]
    fn other_query_params_preserved() {
        let page = request("/threads/?limit=1&format=json").into_page(2, vec![()]);
        assert_eq!(
            page.next.as_deref(),
            Some("http://chat.test/threads/?format=json&limit=1&offset=1")
        );
    }

    #[test]
    fn missing_host_falls_back_to_localhost() {
        let page = PageRequest::new(settings(), None, "/threads/?limit=1").into_page(2, vec![()]);
        assert_eq!(page.next.as_deref(), Some("http://localhost/threads/?limit=1&offset=1"));
    }
}
