//! Fitbit weight sync plumbing.
//!
//! The flow is a plain OAuth2 authorization-code round trip:
//! 1. Send the user to [`authorize_url`]
//! 2. Trade the returned code for a token through a [`TokenExchange`]
//! 3. Read a window of weigh-ins through a [`WeightSource`]
//!
//! This program never holds the client secret. [`BrokerTokenExchange`]
//! hands the code to a trusted backend that performs the real exchange.

use crate::clock::month_day_label;
use crate::config::FitbitConfig;
use crate::store::{keys, KeyValueStore};
use crate::{Error, Result, WeightRecord};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

pub const AUTHORIZE_URL: &str = "https://www.fitbit.com/oauth2/authorize";
pub const API_BASE_URL: &str = "https://api.fitbit.com";
pub const SCOPE: &str = "weight";

static HTTP_CLIENT: Lazy<reqwest::blocking::Client> = Lazy::new(reqwest::blocking::Client::new);

/// Build the page the user visits to grant weight access
pub fn authorize_url(config: &FitbitConfig) -> Result<String> {
    if config.client_id.is_empty() {
        return Err(Error::Config("fitbit.client_id is not set".into()));
    }

    let url = url::Url::parse_with_params(
        AUTHORIZE_URL,
        &[
            ("response_type", "code"),
            ("client_id", config.client_id.as_str()),
            ("redirect_uri", config.redirect_uri.as_str()),
            ("scope", SCOPE),
        ],
    )
    .map_err(|e| Error::Config(format!("Invalid authorize URL: {}", e)))?;

    Ok(url.into())
}

/// Pull the authorization code out of the redirect the user landed on
///
/// An `error` parameter means the user declined; a redirect with neither
/// parameter is rejected as invalid.
pub fn parse_callback(redirect: &str) -> Result<String> {
    let url = url::Url::parse(redirect)
        .map_err(|e| Error::Sync(format!("invalid callback URL: {}", e)))?;

    let mut code = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "error" => {
                return Err(Error::Sync(format!(
                    "authorization failed: {}",
                    value
                )))
            }
            "code" if !value.is_empty() => code = Some(value.into_owned()),
            _ => {}
        }
    }

    code.ok_or_else(|| Error::Sync("invalid callback: no authorization code".into()))
}

// ============================================================================
// Token exchange
// ============================================================================

/// Token payload returned by the exchange
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Seconds until the access token expires
    pub expires_in: i64,
}

/// Stored token triple
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OAuthToken {
    pub access_token: String,
    pub refresh_token: String,
    /// Epoch milliseconds
    pub expires_at: i64,
}

/// Trades an authorization code for a token
pub trait TokenExchange {
    fn exchange(&self, code: &str) -> Result<TokenResponse>;
}

/// Exchange performed by a backend that holds the client secret
#[derive(Clone, Debug)]
pub struct BrokerTokenExchange {
    broker_url: String,
    redirect_uri: String,
}

#[derive(Serialize)]
struct BrokerRequest<'a> {
    code: &'a str,
    redirect_uri: &'a str,
}

impl BrokerTokenExchange {
    pub fn from_config(config: &FitbitConfig) -> Result<Self> {
        let broker_url = config
            .token_broker_url
            .clone()
            .ok_or_else(|| Error::Config("fitbit.token_broker_url is not set".into()))?;
        Ok(Self {
            broker_url,
            redirect_uri: config.redirect_uri.clone(),
        })
    }
}

impl TokenExchange for BrokerTokenExchange {
    fn exchange(&self, code: &str) -> Result<TokenResponse> {
        if code.trim().is_empty() {
            return Err(Error::Sync("authorization was denied (no code)".into()));
        }

        tracing::debug!("Exchanging authorization code via {}", self.broker_url);
        let response = HTTP_CLIENT
            .post(&self.broker_url)
            .json(&BrokerRequest {
                code,
                redirect_uri: &self.redirect_uri,
            })
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Sync(format!("token exchange returned {}", status)));
        }

        Ok(response.json::<TokenResponse>()?)
    }
}

/// Persist a fresh token triple
///
/// A negative or out-of-range `expires_in` is rejected before anything is
/// written.
pub fn save_token<S: KeyValueStore + ?Sized>(
    store: &mut S,
    response: &TokenResponse,
    now_millis: i64,
) -> Result<OAuthToken> {
    if response.expires_in < 0 {
        return Err(Error::Sync(format!(
            "token response has negative expires_in ({})",
            response.expires_in
        )));
    }

    let expires_at = response
        .expires_in
        .checked_mul(1000)
        .and_then(|ms| now_millis.checked_add(ms))
        .ok_or_else(|| {
            Error::Sync(format!(
                "token response expires_in out of range ({})",
                response.expires_in
            ))
        })?;

    let token = OAuthToken {
        access_token: response.access_token.clone(),
        refresh_token: response.refresh_token.clone(),
        expires_at,
    };

    store.set(keys::FITBIT_TOKEN, &token.access_token)?;
    store.set(keys::FITBIT_REFRESH_TOKEN, &token.refresh_token)?;
    store.set(keys::FITBIT_TOKEN_EXPIRES, &token.expires_at.to_string())?;

    tracing::info!("Stored Fitbit token expiring at {}", token.expires_at);
    Ok(token)
}

/// Whether a stored token has not yet expired
pub fn has_valid_token<S: KeyValueStore + ?Sized>(store: &S, now_millis: i64) -> bool {
    store
        .get(keys::FITBIT_TOKEN_EXPIRES)
        .and_then(|raw| raw.trim().parse::<i64>().ok())
        .is_some_and(|expires_at| expires_at > now_millis)
}

/// The stored access token, only while it is valid
pub fn stored_token<S: KeyValueStore + ?Sized>(store: &S, now_millis: i64) -> Option<String> {
    if has_valid_token(store, now_millis) {
        store.get(keys::FITBIT_TOKEN)
    } else {
        None
    }
}

// ============================================================================
// Weight data
// ============================================================================

/// Reads weigh-ins for a window ending on `end_date`
pub trait WeightSource {
    /// Entries ordered by date ascending
    fn fetch_weight(&self, token: &str, end_date: NaiveDate, period: &str)
        -> Result<Vec<WeightRecord>>;
}

#[derive(Debug, Deserialize)]
struct WeightResponse {
    #[serde(default)]
    weight: Vec<WeightEntry>,
}

#[derive(Debug, Deserialize)]
struct WeightEntry {
    #[serde(alias = "dateTime")]
    date: String,
    weight: f64,
}

/// Map a weight API response body to date-ordered records
///
/// Entries with unparseable dates are skipped with a warning.
pub fn parse_weight_response(body: &str) -> Result<Vec<WeightRecord>> {
    let response: WeightResponse = serde_json::from_str(body)?;

    let mut dated: Vec<(NaiveDate, f64)> = Vec::with_capacity(response.weight.len());
    for entry in response.weight {
        match NaiveDate::parse_from_str(&entry.date, "%Y-%m-%d") {
            Ok(date) => dated.push((date, entry.weight)),
            Err(e) => tracing::warn!("Skipping weight entry dated {:?}: {}", entry.date, e),
        }
    }
    dated.sort_by_key(|(date, _)| *date);

    Ok(dated
        .into_iter()
        .map(|(date, weight)| WeightRecord::new(month_day_label(date), weight))
        .collect())
}

/// Bearer-authenticated client for the Fitbit body weight endpoint
#[derive(Clone, Debug)]
pub struct FitbitWeightApi {
    base_url: String,
}

impl Default for FitbitWeightApi {
    fn default() -> Self {
        Self::new(API_BASE_URL)
    }
}

impl FitbitWeightApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    fn endpoint(&self, end_date: NaiveDate, period: &str) -> String {
        format!(
            "{}/1/user/-/body/weight/date/{}/{}.json",
            self.base_url.trim_end_matches('/'),
            end_date.format("%Y-%m-%d"),
            period
        )
    }
}

impl WeightSource for FitbitWeightApi {
    fn fetch_weight(
        &self,
        token: &str,
        end_date: NaiveDate,
        period: &str,
    ) -> Result<Vec<WeightRecord>> {
        let url = self.endpoint(end_date, period);
        tracing::debug!("Fetching weight data from {}", url);

        let response = HTTP_CLIENT.get(&url).bearer_auth(token).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Sync(format!("weight request returned {}", status)));
        }

        parse_weight_response(&response.text()?)
    }
}
