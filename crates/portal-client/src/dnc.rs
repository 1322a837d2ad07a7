//! DNC check and removal-request endpoints.
//!
//! # Purpose
//! Typed wrappers for the endpoints the gated views call once a role is known:
//! checking numbers against the do-not-call list, submitting removal requests
//! and listing an organization's request history.
//!
//! # Key invariants
//! - Every number is normalized to its 10-digit national form before it is sent.
//! - Submissions are split into batches of at most `submit_batch_size` numbers.
//! - History pagination stops on an empty cursor and fails on a repeated one.
use crate::http::PortalHttp;
use crate::{ClientConfig, ClientError, ClientResult, Credentials};
use portal_authz::{OrganizationId, UserId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

pub const CHECK_PATH: &str = "/api/v1/dnc/check";

/// A US phone number in 10-digit national form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Strip formatting and accept 10 digits, or 11 with a leading country code 1.
    pub fn parse(raw: &str) -> ClientResult<Self> {
        let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
        let has_letters = raw.chars().any(char::is_alphabetic);
        let national = match digits.len() {
            10 => Some(digits.as_str()),
            11 if digits.starts_with('1') => Some(&digits[1..]),
            _ => None,
        };
        match national {
            Some(national) if !has_letters => Ok(Self(national.to_string())),
            _ => Err(ClientError::InvalidPhoneNumber(raw.trim().to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of normalizing a batch of user-entered numbers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedNumbers {
    /// Unique valid numbers, in first-seen order.
    pub valid: Vec<PhoneNumber>,
    /// Inputs that could not be normalized, as entered (trimmed).
    pub rejected: Vec<String>,
}

/// Normalize every input, dropping blanks and duplicates.
pub fn normalize_numbers<I, S>(inputs: I) -> NormalizedNumbers
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut normalized = NormalizedNumbers::default();
    for input in inputs {
        let input = input.as_ref();
        if input.trim().is_empty() {
            continue;
        }
        match PhoneNumber::parse(input) {
            Ok(number) => {
                if seen.insert(number.clone()) {
                    normalized.valid.push(number);
                }
            }
            Err(_) => normalized.rejected.push(input.trim().to_string()),
        }
    }
    normalized
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DncCheckResult {
    pub phone_number: PhoneNumber,
    #[serde(default)]
    pub is_dnc: bool,
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DncRequest {
    pub id: i64,
    pub phone_number: PhoneNumber,
    pub status: RequestStatus,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub requested_by: Option<UserId>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestPage {
    #[serde(default)]
    pub items: Vec<DncRequest>,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

#[derive(Serialize)]
struct CheckBody<'a> {
    phone_numbers: &'a [PhoneNumber],
}

#[derive(Deserialize)]
struct CheckResponse {
    #[serde(default)]
    results: Vec<DncCheckResult>,
}

#[derive(Serialize)]
struct SubmitBody<'a> {
    phone_numbers: &'a [PhoneNumber],
    #[serde(skip_serializing_if = "Option::is_none")]
    notes: Option<&'a str>,
}

#[derive(Deserialize)]
struct SubmitResponse {
    #[serde(default)]
    requests: Vec<DncRequest>,
}

#[derive(Debug, Clone)]
pub struct DncClient {
    http: PortalHttp,
    credentials: Option<Credentials>,
    submit_batch_size: usize,
    history_page_size: usize,
}

impl DncClient {
    pub fn new(config: &ClientConfig, credentials: Option<Credentials>) -> ClientResult<Self> {
        Ok(Self::with_http(PortalHttp::new(config)?, credentials, config))
    }

    pub fn with_http(
        http: PortalHttp,
        credentials: Option<Credentials>,
        config: &ClientConfig,
    ) -> Self {
        Self {
            http,
            credentials,
            submit_batch_size: config.submit_batch_size.max(1),
            history_page_size: config.history_page_size.max(1),
        }
    }

    pub async fn check_numbers(
        &self,
        numbers: &[PhoneNumber],
    ) -> ClientResult<Vec<DncCheckResult>> {
        if numbers.is_empty() {
            return Ok(Vec::new());
        }
        let response: CheckResponse = self
            .http
            .post_json(
                CHECK_PATH,
                &CheckBody {
                    phone_numbers: numbers,
                },
                self.credentials.as_ref(),
            )
            .await?;
        let listed = response.results.iter().filter(|result| result.is_dnc).count();
        metrics::counter!("portal_dnc_checks_total").increment(numbers.len() as u64);
        tracing::debug!(checked = numbers.len(), listed, "dnc check completed");
        Ok(response.results)
    }

    /// Submit removal requests, one POST per batch; stops at the first failed batch.
    pub async fn submit_removal_requests(
        &self,
        org_id: OrganizationId,
        numbers: &[PhoneNumber],
        notes: Option<&str>,
    ) -> ClientResult<Vec<DncRequest>> {
        let path = requests_path(org_id);
        let notes = notes.map(str::trim).filter(|notes| !notes.is_empty());
        let mut created = Vec::with_capacity(numbers.len());
        for (batch_index, batch) in numbers.chunks(self.submit_batch_size).enumerate() {
            let response: SubmitResponse = self
                .http
                .post_json(
                    &path,
                    &SubmitBody {
                        phone_numbers: batch,
                        notes,
                    },
                    self.credentials.as_ref(),
                )
                .await
                .inspect_err(|err| {
                    tracing::warn!(
                        org_id = %org_id,
                        batch_index,
                        submitted = created.len(),
                        error = %err,
                        "removal request batch failed"
                    );
                })?;
            metrics::counter!("portal_dnc_requests_submitted_total")
                .increment(batch.len() as u64);
            created.extend(response.requests);
        }
        tracing::info!(org_id = %org_id, created = created.len(), "removal requests submitted");
        Ok(created)
    }

    pub async fn request_page(
        &self,
        org_id: OrganizationId,
        cursor: Option<&str>,
    ) -> ClientResult<RequestPage> {
        let mut query = vec![("limit", self.history_page_size.to_string())];
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor.to_string()));
        }
        self.http
            .get_json(&requests_path(org_id), &query, self.credentials.as_ref())
            .await
    }

    /// Walk every page of the organization's request history.
    pub async fn request_history(&self, org_id: OrganizationId) -> ClientResult<Vec<DncRequest>> {
        let mut items = Vec::new();
        let mut seen = BTreeSet::new();
        let mut cursor: Option<String> = None;
        loop {
            let page = self.request_page(org_id, cursor.as_deref()).await?;
            items.extend(page.items);
            match page.next_cursor.filter(|next| !next.is_empty()) {
                None => break,
                Some(next) => {
                    if !seen.insert(next.clone()) {
                        return Err(ClientError::CursorLoop(next));
                    }
                    cursor = Some(next);
                }
            }
        }
        tracing::debug!(
            org_id = %org_id,
            pages = seen.len() + 1,
            items = items.len(),
            "request history loaded"
        );
        Ok(items)
    }
}

fn requests_path(org_id: OrganizationId) -> String {
    format!("/api/v1/tenants/{org_id}/dnc/requests")
}
