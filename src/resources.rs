//! Per-resource operations.
//!
//! Each resource is a path plus the singular and plural envelope keys the
//! server wraps it in. [`Resource`] shapes list/get/create/update/delete/
//! restore requests for one kind and hands them to the engine.

use serde_json::Value;

use crate::client::ApiClient;
use crate::envelope::Normalized;
use crate::error::SluiceError;
use crate::models::{CannedResponse, OnboardingRequest, Release, Ticket};
use crate::pagination::Pages;
use crate::request::{ApiRequest, MultipartForm};

/// Largest page size the server accepts.
pub const MAX_PER_PAGE: u32 = 100;

/// A resource collection exposed by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceKind {
    /// Envelope key for one record.
    pub singular: &'static str,
    /// Envelope key for many records.
    pub plural: &'static str,
    /// Path below the API root.
    pub path: &'static str,
    /// Whether soft-deleted records can be restored.
    pub restorable: bool,
}

impl ResourceKind {
    /// Incidents and service requests.
    pub const TICKET: Self = Self::new("ticket", "tickets", "/tickets", true);
    /// Problems.
    pub const PROBLEM: Self = Self::new("problem", "problems", "/problems", true);
    /// Changes.
    pub const CHANGE: Self = Self::new("change", "changes", "/changes", true);
    /// Releases.
    pub const RELEASE: Self = Self::new("release", "releases", "/releases", true);
    /// Assets.
    pub const ASSET: Self = Self::new("asset", "assets", "/assets", true);
    /// Requesters.
    pub const REQUESTER: Self = Self::new("requester", "requesters", "/requesters", false);
    /// Agents.
    pub const AGENT: Self = Self::new("agent", "agents", "/agents", false);
    /// Canned responses.
    pub const CANNED_RESPONSE: Self =
        Self::new("canned_response", "canned_responses", "/canned_responses", false);
    /// Canned response folders.
    pub const CANNED_RESPONSE_FOLDER: Self = Self::new(
        "canned_response_folder",
        "canned_response_folders",
        "/canned_response_folders",
        false,
    );
    /// Onboarding requests.
    pub const ONBOARDING_REQUEST: Self = Self::new(
        "onboarding_request",
        "onboarding_requests",
        "/onboarding_requests",
        false,
    );
    /// Offboarding requests.
    pub const OFFBOARDING_REQUEST: Self = Self::new(
        "offboarding_request",
        "offboarding_requests",
        "/offboarding_requests",
        false,
    );
    /// Service catalog items.
    pub const SERVICE_ITEM: Self =
        Self::new("service_item", "service_items", "/service_catalog/items", false);
    /// Solution articles.
    pub const SOLUTION_ARTICLE: Self =
        Self::new("article", "articles", "/solutions/articles", false);

    /// Every known kind.
    pub const ALL: &'static [ResourceKind] = &[
        Self::TICKET,
        Self::PROBLEM,
        Self::CHANGE,
        Self::RELEASE,
        Self::ASSET,
        Self::REQUESTER,
        Self::AGENT,
        Self::CANNED_RESPONSE,
        Self::CANNED_RESPONSE_FOLDER,
        Self::ONBOARDING_REQUEST,
        Self::OFFBOARDING_REQUEST,
        Self::SERVICE_ITEM,
        Self::SOLUTION_ARTICLE,
    ];

    const fn new(
        singular: &'static str,
        plural: &'static str,
        path: &'static str,
        restorable: bool,
    ) -> Self {
        Self {
            singular,
            plural,
            path,
            restorable,
        }
    }

    /// Looks a kind up by its singular or plural name.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.singular == name || kind.plural == name)
    }
}

/// Parameters for list calls.
#[derive(Debug, Clone, Default)]
pub struct ListParams {
    per_page: Option<u32>,
    page: Option<u32>,
    updated_since: Option<String>,
    include: Option<String>,
    order_by: Option<String>,
    order_type: Option<String>,
    extra: Vec<(String, String)>,
    single_page: bool,
}

impl ListParams {
    /// Creates empty parameters (all pages, server default page size).
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the page size (1..=100).
    pub fn with_per_page(mut self, per_page: u32) -> Self {
        self.per_page = Some(per_page);
        self
    }

    /// Sets the first page to fetch.
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    /// Only returns records updated since this ISO 8601 timestamp.
    pub fn with_updated_since(mut self, since: impl Into<String>) -> Self {
        self.updated_since = Some(since.into());
        self
    }

    /// Embeds related data (e.g., `requester,stats`).
    pub fn with_include(mut self, include: impl Into<String>) -> Self {
        self.include = Some(include.into());
        self
    }

    /// Sorts by a field, ascending or descending.
    pub fn with_order(mut self, field: impl Into<String>, descending: bool) -> Self {
        self.order_by = Some(field.into());
        self.order_type = Some(if descending { "desc" } else { "asc" }.to_string());
        self
    }

    /// Adds an arbitrary query parameter.
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.push((name.into(), value.into()));
        self
    }

    /// Fetches only one page and ignores continuation links.
    pub fn single_page(mut self) -> Self {
        self.single_page = true;
        self
    }

    /// Returns true if pagination is disabled.
    pub fn is_single_page(&self) -> bool {
        self.single_page
    }

    /// Converts to query pairs.
    fn to_query(&self) -> Result<Vec<(&str, String)>, SluiceError> {
        let mut query = Vec::new();
        if let Some(per_page) = self.per_page {
            if per_page == 0 || per_page > MAX_PER_PAGE {
                return Err(SluiceError::validation(format!(
                    "per_page must be between 1 and {}, got {}",
                    MAX_PER_PAGE, per_page
                )));
            }
            query.push(("per_page", per_page.to_string()));
        }
        if let Some(page) = self.page {
            if page == 0 {
                return Err(SluiceError::validation("page numbers start at 1"));
            }
            query.push(("page", page.to_string()));
        }
        if let Some(ref since) = self.updated_since {
            query.push(("updated_since", since.clone()));
        }
        if let Some(ref include) = self.include {
            query.push(("include", include.clone()));
        }
        if let Some(ref order_by) = self.order_by {
            query.push(("order_by", order_by.clone()));
        }
        if let Some(ref order_type) = self.order_type {
            query.push(("order_type", order_type.clone()));
        }
        for (name, value) in &self.extra {
            query.push((name.as_str(), value.clone()));
        }
        Ok(query)
    }
}

/// Validates that an ID is a positive numeric string.
///
/// IDs are interpolated into URL paths, so anything else could redirect the
/// call to another endpoint.
fn validate_id(id: &str, field_name: &str) -> Result<(), SluiceError> {
    if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) || id.bytes().all(|b| b == b'0') {
        return Err(SluiceError::validation(format!(
            "{} must be a positive numeric string, got: {:?}",
            field_name,
            id.chars().take(50).collect::<String>()
        )));
    }
    Ok(())
}

/// Operations on one resource kind.
pub struct Resource<'a> {
    client: &'a ApiClient,
    kind: ResourceKind,
}

impl<'a> Resource<'a> {
    pub(crate) fn new(client: &'a ApiClient, kind: ResourceKind) -> Self {
        Self { client, kind }
    }

    /// Returns the kind this handle operates on.
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    fn member_path(&self, id: &str) -> Result<String, SluiceError> {
        validate_id(id, "id")?;
        Ok(format!("{}/{}", self.kind.path, id))
    }

    /// Starts a lazy walk over the listing.
    pub fn pages(&self, params: &ListParams) -> Result<Pages<'a>, SluiceError> {
        let url = self.client.url(self.kind.path, &params.to_query()?)?;
        Ok(self
            .client
            .paginate(ApiRequest::get(url))
            .expecting(self.kind.singular, self.kind.plural))
    }

    /// Lists records, following continuation links unless `single_page` is set.
    pub async fn list(&self, params: ListParams) -> Result<Normalized, SluiceError> {
        if params.is_single_page() {
            let url = self.client.url(self.kind.path, &params.to_query()?)?;
            return self.fetch_expecting(ApiRequest::get(url)).await;
        }
        self.pages(&params)?.collect_all().await
    }

    /// Runs a filter query (e.g., `priority:4 AND status:2`) over every page.
    pub async fn filter(&self, query: &str) -> Result<Normalized, SluiceError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SluiceError::validation("filter query must not be empty"));
        }
        let path = format!("{}/filter", self.kind.path);
        let url = self
            .client
            .url(&path, &[("query", format!("\"{}\"", query))])?;
        self.client
            .paginate(ApiRequest::get(url))
            .expecting(self.kind.singular, self.kind.plural)
            .collect_all()
            .await
    }

    /// Fetches one record by ID. Never paginates.
    pub async fn get(&self, id: &str) -> Result<Value, SluiceError> {
        let url = self.client.url(&self.member_path(id)?, &[])?;
        self.fetch_expecting(ApiRequest::get(url))
            .await?
            .into_single()
    }

    /// Creates a record from a JSON body and returns it.
    pub async fn create(&self, body: Value) -> Result<Value, SluiceError> {
        let url = self.client.url(self.kind.path, &[])?;
        self.fetch_expecting(ApiRequest::post(url).json(body))
            .await?
            .into_single()
    }

    /// Creates a record from a multipart form (fields plus attachments).
    pub async fn create_with_attachments(&self, form: MultipartForm) -> Result<Value, SluiceError> {
        if form.is_empty() {
            return Err(SluiceError::validation("multipart form must not be empty"));
        }
        let url = self.client.url(self.kind.path, &[])?;
        self.fetch_expecting(ApiRequest::post(url).multipart(form))
            .await?
            .into_single()
    }

    /// Replaces fields of a record and returns the updated record.
    pub async fn update(&self, id: &str, body: Value) -> Result<Value, SluiceError> {
        let url = self.client.url(&self.member_path(id)?, &[])?;
        self.fetch_expecting(ApiRequest::put(url).json(body))
            .await?
            .into_single()
    }

    /// Deletes a record. The server answers 204.
    pub async fn delete(&self, id: &str) -> Result<(), SluiceError> {
        let url = self.client.url(&self.member_path(id)?, &[])?;
        self.expect_no_content(ApiRequest::delete(url)).await
    }

    /// Restores a soft-deleted record. The server answers 204.
    pub async fn restore(&self, id: &str) -> Result<(), SluiceError> {
        if !self.kind.restorable {
            return Err(SluiceError::validation(format!(
                "{} records cannot be restored",
                self.kind.plural
            )));
        }
        let path = format!("{}/restore", self.member_path(id)?);
        let url = self.client.url(&path, &[])?;
        self.expect_no_content(ApiRequest::put(url)).await
    }

    async fn fetch_expecting(&self, request: ApiRequest) -> Result<Normalized, SluiceError> {
        let response = self.client.send(request.clone()).await?;
        self.client.normalize_response(
            &request,
            &response,
            Some((self.kind.singular, self.kind.plural)),
        )
    }

    async fn expect_no_content(&self, request: ApiRequest) -> Result<(), SluiceError> {
        let response = self.client.send(request).await?;
        if response.status != reqwest::StatusCode::NO_CONTENT {
            return Err(SluiceError::Upstream {
                status: response.status,
                body: format!("expected 204 No Content, got {}", response.status),
            });
        }
        Ok(())
    }
}

impl ApiClient {
    /// Lists tickets as typed records.
    pub async fn list_tickets(&self, params: ListParams) -> Result<Vec<Ticket>, SluiceError> {
        self.resource(ResourceKind::TICKET)
            .list(params)
            .await?
            .into_typed()
    }

    /// Gets one ticket as a typed record.
    pub async fn get_ticket(&self, id: &str) -> Result<Ticket, SluiceError> {
        let record = self.resource(ResourceKind::TICKET).get(id).await?;
        serde_json::from_value(record).map_err(SluiceError::Serialization)
    }

    /// Lists releases as typed records.
    pub async fn list_releases(&self, params: ListParams) -> Result<Vec<Release>, SluiceError> {
        self.resource(ResourceKind::RELEASE)
            .list(params)
            .await?
            .into_typed()
    }

    /// Lists canned responses as typed records.
    pub async fn list_canned_responses(
        &self,
        params: ListParams,
    ) -> Result<Vec<CannedResponse>, SluiceError> {
        self.resource(ResourceKind::CANNED_RESPONSE)
            .list(params)
            .await?
            .into_typed()
    }

    /// Lists onboarding requests as typed records.
    pub async fn list_onboarding_requests(
        &self,
        params: ListParams,
    ) -> Result<Vec<OnboardingRequest>, SluiceError> {
        self.resource(ResourceKind::ONBOARDING_REQUEST)
            .list(params)
            .await?
            .into_typed()
    }

    /// Lists offboarding requests as typed records.
    pub async fn list_offboarding_requests(
        &self,
        params: ListParams,
    ) -> Result<Vec<OnboardingRequest>, SluiceError> {
        self.resource(ResourceKind::OFFBOARDING_REQUEST)
            .list(params)
            .await?
            .into_typed()
    }
}
