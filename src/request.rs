//! Request and response values exchanged with the engine.
//!
//! An [`ApiRequest`] fully describes one logical call. It is cloneable and
//! carries no transport state, so the retry loop can rebuild an identical
//! wire request for every attempt and the pagination walker can swap the
//! URL between pages.

use std::fmt;

use reqwest::header::HeaderMap;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use url::Url;

use crate::config::Credential;
use crate::error::SluiceError;
use crate::pagination;
use crate::throttle::RateState;

/// Content type used for JSON bodies unless the caller declares another.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// HTTP methods the upstream understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Read.
    Get,
    /// Create.
    Post,
    /// Replace.
    Put,
    /// Partial update.
    Patch,
    /// Delete.
    Delete,
}

impl Method {
    /// Converts to the `reqwest` method.
    pub fn as_reqwest(self) -> reqwest::Method {
        match self {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        }
    }

    /// Returns the uppercase method name.
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One part of a multipart form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormPart {
    /// A plain text field.
    Text {
        /// Field name (e.g., `subject` or `cc_emails[]`).
        name: String,
        /// Field value.
        value: String,
    },
    /// A file upload.
    File {
        /// Field name (e.g., `attachments[]`).
        name: String,
        /// File name reported to the server.
        file_name: String,
        /// File contents.
        bytes: Vec<u8>,
        /// MIME type, if known.
        mime: Option<String>,
    },
}

/// A multipart form that can be rebuilt for every attempt.
///
/// `reqwest::multipart::Form` is consumed on send, so the engine keeps this
/// description and converts it right before each attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartForm {
    parts: Vec<FormPart>,
}

impl MultipartForm {
    /// Creates an empty form.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a text field.
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push(FormPart::Text {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Adds a file part without a declared MIME type.
    pub fn file(
        mut self,
        name: impl Into<String>,
        file_name: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        self.parts.push(FormPart::File {
            name: name.into(),
            file_name: file_name.into(),
            bytes: bytes.into(),
            mime: None,
        });
        self
    }

    /// Adds a file part with a MIME type.
    pub fn file_with_mime(
        mut self,
        name: impl Into<String>,
        file_name: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
        mime: impl Into<String>,
    ) -> Self {
        self.parts.push(FormPart::File {
            name: name.into(),
            file_name: file_name.into(),
            bytes: bytes.into(),
            mime: Some(mime.into()),
        });
        self
    }

    /// Returns the parts in insertion order.
    pub fn parts(&self) -> &[FormPart] {
        &self.parts
    }

    /// Returns true if no parts were added.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Builds a fresh `reqwest` form.
    ///
    /// # Errors
    ///
    /// Returns `SluiceError::Validation` if a MIME type is malformed.
    pub fn to_form(&self) -> Result<Form, SluiceError> {
        let mut form = Form::new();
        for part in &self.parts {
            form = match part {
                FormPart::Text { name, value } => form.text(name.clone(), value.clone()),
                FormPart::File {
                    name,
                    file_name,
                    bytes,
                    mime,
                } => {
                    let mut file = Part::bytes(bytes.clone()).file_name(file_name.clone());
                    if let Some(mime) = mime {
                        file = file.mime_str(mime).map_err(|e| {
                            SluiceError::validation(format!("invalid MIME type {:?}: {}", mime, e))
                        })?;
                    }
                    form.part(name.clone(), file)
                }
            };
        }
        Ok(form)
    }
}

/// Request body. JSON and multipart are mutually exclusive by construction.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Payload {
    /// No body.
    #[default]
    Empty,
    /// A JSON document, serialized as UTF-8.
    Json(serde_json::Value),
    /// A multipart form.
    Multipart(MultipartForm),
}

/// A fully formed call against the API.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    /// HTTP method.
    pub method: Method,
    /// Fully qualified URL, query included.
    pub url: Url,
    /// Body.
    pub payload: Payload,
    /// Extra headers, in insertion order. Only set through [`header`](Self::header).
    headers: Vec<(String, String)>,
    /// Declared content type. Ignored for multipart bodies.
    pub content_type: String,
    /// Credential override for this call only.
    pub credential: Option<Credential>,
}

impl ApiRequest {
    /// Creates a request with no body.
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            payload: Payload::Empty,
            headers: Vec::new(),
            content_type: JSON_CONTENT_TYPE.to_string(),
            credential: None,
        }
    }

    /// Creates a GET request.
    pub fn get(url: Url) -> Self {
        Self::new(Method::Get, url)
    }

    /// Creates a POST request.
    pub fn post(url: Url) -> Self {
        Self::new(Method::Post, url)
    }

    /// Creates a PUT request.
    pub fn put(url: Url) -> Self {
        Self::new(Method::Put, url)
    }

    /// Creates a PATCH request.
    pub fn patch(url: Url) -> Self {
        Self::new(Method::Patch, url)
    }

    /// Creates a DELETE request.
    pub fn delete(url: Url) -> Self {
        Self::new(Method::Delete, url)
    }

    /// Sets a JSON body, replacing any multipart form.
    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.payload = Payload::Json(body);
        self
    }

    /// Sets a multipart form, replacing any JSON body.
    pub fn multipart(mut self, form: MultipartForm) -> Self {
        self.payload = Payload::Multipart(form);
        self
    }

    /// Adds a header, replacing an earlier one of the same name.
    ///
    /// `Content-Type` is routed to [`content_type`](Self::content_type).
    /// `Authorization`, `Accept` and `Accept-Charset` belong to the client and
    /// are dropped when the request is sent.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        if name.eq_ignore_ascii_case("content-type") {
            self.content_type = value.into();
        } else {
            self.headers.retain(|(existing, _)| !existing.eq_ignore_ascii_case(&name));
            self.headers.push((name, value.into()));
        }
        self
    }

    /// Returns the extra headers.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Declares the content type of the body.
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// Overrides the configured credential for this call.
    pub fn credential(mut self, credential: Credential) -> Self {
        self.credential = Some(credential);
        self
    }

    /// Returns the same request aimed at another URL.
    pub fn with_url(&self, url: Url) -> Self {
        Self {
            url,
            ..self.clone()
        }
    }

    /// Returns `"<METHOD> <path>"` for logs and errors.
    pub fn describe(&self) -> String {
        format!("{} {}", self.method, self.url.path())
    }
}

/// A completed exchange with a 2xx status.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    /// HTTP status.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Raw body text.
    pub body: String,
}

impl ApiResponse {
    /// Returns true if the body has no content.
    pub fn is_empty(&self) -> bool {
        self.body.trim().is_empty()
    }

    /// Returns the continuation link, if the server sent one.
    pub fn next_link(&self) -> Option<String> {
        pagination::next_link(&self.headers)
    }

    /// Returns the rate limit window reported with this response.
    pub fn rate_state(&self) -> Option<RateState> {
        RateState::from_headers(&self.headers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url() -> Url {
        Url::parse("https://acme.freshservice.com/api/v2/tickets").unwrap()
    }

    #[test]
    fn test_json_and_multipart_replace_each_other() {
        let request = ApiRequest::post(url())
            .json(serde_json::json!({"subject": "x"}))
            .multipart(MultipartForm::new().text("subject", "x"));
        assert!(matches!(request.payload, Payload::Multipart(_)));

        let request = request.json(serde_json::json!({}));
        assert!(matches!(request.payload, Payload::Json(_)));
    }

    #[test]
    fn test_content_type_header_is_routed() {
        let request = ApiRequest::post(url())
            .header("Content-Type", "text/plain")
            .header("X-Trace", "1");
        assert_eq!(request.content_type, "text/plain");
        assert_eq!(request.headers, vec![("X-Trace".to_string(), "1".to_string())]);
    }

    #[test]
    fn test_repeated_header_replaces_earlier_value() {
        let request = ApiRequest::get(url())
            .header("X-Trace", "1")
            .header("x-trace", "2");
        assert_eq!(request.headers(), &[("x-trace".to_string(), "2".to_string())]);
    }

    #[test]
    fn test_with_url_preserves_identity() {
        let request = ApiRequest::put(url()).json(serde_json::json!({"status": 5}));
        let next = Url::parse("https://acme.freshservice.com/api/v2/tickets?page=2").unwrap();
        let moved = request.with_url(next.clone());
        assert_eq!(moved.url, next);
        assert_eq!(moved.method, Method::Put);
        assert_eq!(moved.payload, request.payload);
    }

    #[test]
    fn test_describe() {
        assert_eq!(ApiRequest::get(url()).describe(), "GET /api/v2/tickets");
    }

    #[test]
    fn test_multipart_to_form_rejects_bad_mime() {
        let form = MultipartForm::new().file_with_mime("attachments[]", "a.txt", b"hi".to_vec(), "not a mime");
        assert!(form.to_form().is_err());

        let form = MultipartForm::new()
            .text("subject", "Printer")
            .file_with_mime("attachments[]", "a.txt", b"hi".to_vec(), "text/plain");
        assert!(form.to_form().is_ok());
        assert_eq!(form.parts().len(), 2);
    }
}
