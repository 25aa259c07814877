use crate::config::ApiConfig;
use crate::patreon::auth::Credentials;
use crate::patreon::members::MembersPage;
use thiserror::Error;
use tracing::{debug, error, info};
use url::Url;

pub mod auth;
pub mod members;
#[cfg(test)]
pub mod mock;

const MEMBER_FIELDS: &str =
    "full_name,patron_status,last_charge_date,last_charge_status,currently_entitled_amount_cents";
const USER_FIELDS: &str = "full_name";

/// An active supporter as reported by the members endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patron {
    pub member_id: String,
    pub displayed_name: String,
    pub last_payment_timestamp: String,
    pub pledge_amount_cents: u64,
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

pub struct PatreonClient {
    client: reqwest::Client,
    base_url: String,
}

impl PatreonClient {
    pub fn new(api: &ApiConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().timeout(api.timeout()).build()?;
        Ok(Self {
            client,
            base_url: api.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetches every active patron of the campaign.
    ///
    /// Missing credentials or any failed page yield an empty list; earlier pages are
    /// discarded when a later one fails.
    #[tracing::instrument(skip(self))]
    pub async fn fetch_patrons(&self, credentials: &Credentials) -> Vec<Patron> {
        if credentials.access_token.is_empty() {
            error!("PATREON_ACCESS_TOKEN not set.");
            return Vec::new();
        }
        if credentials.campaign_id.is_empty() {
            error!("PATREON_CAMPAIGN_ID not set.");
            return Vec::new();
        }

        match self.try_fetch_patrons(credentials).await {
            Ok(patrons) => {
                info!("Successfully fetched {} active patrons", patrons.len());
                patrons
            }
            Err(e) => {
                error!("Error fetching patrons: {e}");
                Vec::new()
            }
        }
    }

    async fn try_fetch_patrons(&self, credentials: &Credentials) -> Result<Vec<Patron>, FetchError> {
        let mut next = Some(self.members_url(&credentials.campaign_id)?);
        let mut patrons = Vec::new();
        let mut pages = 0;

        while let Some(url) = next {
            let page = self.fetch_page(url, &credentials.access_token).await?;
            pages += 1;
            let active = page.active_patrons();
            debug!(
                page = pages,
                members = page.data.len(),
                active = active.len(),
                "fetched members page"
            );
            patrons.extend(active);
            next = page.next_url().map(Url::parse).transpose()?;
        }
        Ok(patrons)
    }

    fn members_url(&self, campaign_id: &str) -> Result<Url, FetchError> {
        let mut url = Url::parse(&format!("{}/campaigns/{}/members", self.base_url, campaign_id))?;
        url.query_pairs_mut()
            .append_pair("include", "user")
            .append_pair("fields[member]", MEMBER_FIELDS)
            .append_pair("fields[user]", USER_FIELDS);
        Ok(url)
    }

    async fn fetch_page(&self, url: Url, token: &str) -> Result<MembersPage, FetchError> {
        debug!(url = %url, "requesting members page");
        let resp = self.client.get(url).bearer_auth(token).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(FetchError::Server {
                status: status.as_u16(),
                body,
            });
        }
        let body = resp.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}
