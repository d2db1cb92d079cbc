//! Link-header pagination.
//!
//! List endpoints return a `Link` header such as
//! `<https://acme.freshservice.com/api/v2/tickets?page=2>; rel="next"` while
//! more pages exist. [`Pages`] walks those links one page at a time. Each
//! page is a complete exchange (including any 429 retries), and the next URL
//! is only known once the previous page returned, so pages are strictly
//! sequential.

use reqwest::header::{HeaderMap, LINK};
use url::Url;

use crate::client::ApiClient;
use crate::envelope::Normalized;
use crate::error::SluiceError;
use crate::request::ApiRequest;

/// Extracts the first `<url>` from a `Link` header value.
pub fn parse_link_header(value: &str) -> Option<String> {
    let start = value.find('<')? + 1;
    let len = value[start..].find('>')?;
    let link = value[start..start + len].trim();
    if link.is_empty() {
        None
    } else {
        Some(link.to_string())
    }
}

/// Returns the continuation link from response headers, if any.
pub fn next_link(headers: &HeaderMap) -> Option<String> {
    headers
        .get(LINK)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_link_header)
}

/// One fetched page.
#[derive(Debug, Clone)]
pub struct Page {
    /// 1-based position in the walk.
    pub number: usize,
    /// URL this page was fetched from.
    pub url: Url,
    /// Records of this page, in server order.
    pub records: Normalized,
    /// Where the next page lives, if anywhere.
    pub next: Option<Url>,
}

/// Lazy, finite walk over a paginated listing.
///
/// Dropping the walker stops it; nothing is held open between pages. A
/// failed page ends the walk, and a walk cannot be resumed, only restarted
/// from the original request.
pub struct Pages<'a> {
    client: &'a ApiClient,
    pending: Option<ApiRequest>,
    expected: Option<(&'static str, &'static str)>,
    fetched: usize,
}

impl<'a> Pages<'a> {
    pub(crate) fn new(client: &'a ApiClient, request: ApiRequest) -> Self {
        Self {
            client,
            pending: Some(request),
            expected: None,
            fetched: 0,
        }
    }

    /// Requires every page's envelope key to be one of the given names.
    pub fn expecting(mut self, singular: &'static str, plural: &'static str) -> Self {
        self.expected = Some((singular, plural));
        self
    }

    /// Number of pages fetched so far.
    pub fn pages_fetched(&self) -> usize {
        self.fetched
    }

    /// Fetches the next page.
    ///
    /// Returns `None` once the last page was yielded or after an error.
    pub async fn next_page(&mut self) -> Option<Result<Page, SluiceError>> {
        let request = self.pending.take()?;
        Some(self.fetch(request).await)
    }

    async fn fetch(&mut self, request: ApiRequest) -> Result<Page, SluiceError> {
        let response = self.client.send(request.clone()).await?;
        let records = self
            .client
            .normalize_response(&request, &response, self.expected)?;
        self.fetched += 1;

        let next = match response.next_link() {
            Some(link) => Some(self.resolve_link(&request.url, &link)?),
            None => None,
        };

        tracing::debug!(
            page = self.fetched,
            records = records.len(),
            has_next = next.is_some(),
            "Fetched page"
        );

        if let Some(next_url) = &next {
            self.pending = Some(request.with_url(next_url.clone()));
        }

        Ok(Page {
            number: self.fetched,
            url: request.url,
            records,
            next,
        })
    }

    /// Resolves a possibly relative link and keeps it on the account host.
    fn resolve_link(&self, current: &Url, link: &str) -> Result<Url, SluiceError> {
        let url = current.join(link).map_err(|_| SluiceError::ForeignLink {
            link: link.to_string(),
        })?;
        if !self.client.is_same_origin(&url) {
            return Err(SluiceError::ForeignLink {
                link: link.to_string(),
            });
        }
        Ok(url)
    }

    /// Walks every remaining page and flattens the records in order.
    pub async fn collect_all(mut self) -> Result<Normalized, SluiceError> {
        let mut all = Normalized::default();
        while let Some(page) = self.next_page().await {
            all.extend(page?.records);
        }
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_parse_link_header_next() {
        let value = r#"<https://acme.freshservice.com/api/v2/tickets?page=2>; rel="next""#;
        assert_eq!(
            parse_link_header(value).as_deref(),
            Some("https://acme.freshservice.com/api/v2/tickets?page=2")
        );
    }

    #[test]
    fn test_parse_link_header_uses_first_match() {
        let value = r#"<https://a.example/p2>; rel="next", <https://a.example/p9>; rel="last""#;
        assert_eq!(parse_link_header(value).as_deref(), Some("https://a.example/p2"));
    }

    #[test]
    fn test_parse_link_header_rejects_malformed() {
        assert_eq!(parse_link_header(""), None);
        assert_eq!(parse_link_header("https://a.example/p2"), None);
        assert_eq!(parse_link_header("<https://a.example/p2"), None);
        assert_eq!(parse_link_header("<>; rel=\"next\""), None);
    }

    #[test]
    fn test_next_link_reads_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(next_link(&headers), None);
        headers.insert(
            LINK,
            HeaderValue::from_static("<https://a.example/tickets?page=3>; rel=\"next\""),
        );
        assert_eq!(
            next_link(&headers).as_deref(),
            Some("https://a.example/tickets?page=3")
        );
    }
}
