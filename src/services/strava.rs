// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava API client.
//!
//! Handles:
//! - OAuth code exchange and token refresh
//! - Fetching one activity / the full activity history
//! - Push subscription management
//!
//! Strava field names stay in this module: everything it returns is already
//! translated into the canonical [`Activity`] / [`Credential`] models.

use crate::config::DEFAULT_STRAVA_BASE_URL;
use crate::error::ProviderError;
use crate::models::{Activity, Credential};
use crate::time_utils::parse_rfc3339_or_epoch;
use async_trait::async_trait;
use chrono::Duration;
use serde::Deserialize;

/// Largest page Strava serves for the activity list.
pub const ACTIVITIES_PER_PAGE: u32 = 200;

/// Hard stop for the activity list pagination.
const MAX_ACTIVITY_PAGES: u32 = 100;

/// Outbound calls to the activity provider. Stateless request/response.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Exchange a one-time authorization code for a credential.
    async fn exchange_code(&self, code: &str) -> Result<Credential, ProviderError>;

    /// Trade a refresh token for a new credential.
    async fn refresh_token(&self, refresh_token: &str) -> Result<Credential, ProviderError>;

    async fn get_activity(
        &self,
        access_token: &str,
        activity_id: u64,
    ) -> Result<Activity, ProviderError>;

    /// Every activity of the authenticated athlete, all pages.
    async fn list_activities(&self, access_token: &str) -> Result<Vec<Activity>, ProviderError>;

    /// Register a push subscription, returning its ID.
    async fn create_subscription(
        &self,
        callback_url: &str,
        verify_token: &str,
    ) -> Result<u64, ProviderError>;

    /// IDs of the subscriptions Strava currently knows for this app.
    async fn list_subscriptions(&self) -> Result<Vec<u64>, ProviderError>;

    async fn delete_subscription(&self, subscription_id: u64) -> Result<(), ProviderError>;
}

/// Strava API client.
#[derive(Clone)]
pub struct StravaClient {
    http: reqwest::Client,
    base_url: String,
    client_id: String,
    client_secret: String,
}

impl StravaClient {
    /// Create a new Strava client with OAuth credentials.
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self::with_base_url(DEFAULT_STRAVA_BASE_URL, client_id, client_secret)
    }

    /// Client talking to another host (tests, proxies).
    pub fn with_base_url(base_url: &str, client_id: String, client_secret: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            client_id,
            client_secret,
        }
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/api/v3{}", self.base_url, path)
    }

    async fn token_request(&self, grant: &[(&str, &str)]) -> Result<Credential, ProviderError> {
        let mut form = vec![
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];
        form.extend_from_slice(grant);

        let response = self
            .http
            .post(format!("{}/oauth/token", self.base_url))
            .form(&form)
            .send()
            .await?;

        let token: TokenResponse = check_response_json(response).await?;
        Ok(token.into_credential())
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        access_token: &str,
        query: &[(&str, String)],
    ) -> Result<T, ProviderError> {
        let response = self
            .http
            .get(url)
            .bearer_auth(access_token)
            .query(query)
            .send()
            .await?;

        check_response_json(response).await
    }

    fn app_credentials(&self) -> [(&str, &str); 2] {
        [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ]
    }
}

#[async_trait]
impl ProviderClient for StravaClient {
    async fn exchange_code(&self, code: &str) -> Result<Credential, ProviderError> {
        self.token_request(&[("code", code), ("grant_type", "authorization_code")])
            .await
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<Credential, ProviderError> {
        self.token_request(&[
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ])
        .await
    }

    async fn get_activity(
        &self,
        access_token: &str,
        activity_id: u64,
    ) -> Result<Activity, ProviderError> {
        let url = self.api_url(&format!("/activities/{}", activity_id));
        let raw: RawActivity = self.get_json(&url, access_token, &[]).await?;
        Ok(raw.into_activity())
    }

    async fn list_activities(&self, access_token: &str) -> Result<Vec<Activity>, ProviderError> {
        let url = self.api_url("/athlete/activities");
        let mut activities = Vec::new();

        for page in 1..=MAX_ACTIVITY_PAGES {
            let batch: Vec<RawActivity> = self
                .get_json(
                    &url,
                    access_token,
                    &[
                        ("page", page.to_string()),
                        ("per_page", ACTIVITIES_PER_PAGE.to_string()),
                    ],
                )
                .await?;

            let short_page = batch.len() < ACTIVITIES_PER_PAGE as usize;
            activities.extend(batch.into_iter().map(RawActivity::into_activity));
            tracing::debug!(page, total = activities.len(), "Fetched activity page");

            if short_page {
                return Ok(activities);
            }
        }

        tracing::warn!(
            pages = MAX_ACTIVITY_PAGES,
            total = activities.len(),
            "Activity pagination cap reached, older activities not fetched"
        );
        Ok(activities)
    }

    async fn create_subscription(
        &self,
        callback_url: &str,
        verify_token: &str,
    ) -> Result<u64, ProviderError> {
        let mut form = self.app_credentials().to_vec();
        form.push(("callback_url", callback_url));
        form.push(("verify_token", verify_token));

        let response = self
            .http
            .post(self.api_url("/push_subscriptions"))
            .form(&form)
            .send()
            .await?;

        let created: SubscriptionResponse = check_response_json(response).await?;
        Ok(created.id)
    }

    async fn list_subscriptions(&self) -> Result<Vec<u64>, ProviderError> {
        let response = self
            .http
            .get(self.api_url("/push_subscriptions"))
            .query(&self.app_credentials())
            .send()
            .await?;

        let subscriptions: Vec<SubscriptionResponse> = check_response_json(response).await?;
        Ok(subscriptions.into_iter().map(|s| s.id).collect())
    }

    async fn delete_subscription(&self, subscription_id: u64) -> Result<(), ProviderError> {
        let response = self
            .http
            .delete(self.api_url(&format!("/push_subscriptions/{}", subscription_id)))
            .query(&self.app_credentials())
            .send()
            .await?;

        check_response(response).await
    }
}

/// URL the user is sent to for authorizing this app.
pub fn authorize_url(base_url: &str, client_id: &str, redirect_uri: &str, state: &str) -> String {
    format!(
        "{}/oauth/authorize?\
         client_id={}&\
         response_type=code&\
         redirect_uri={}&\
         approval_prompt=auto&\
         scope=activity:read_all&\
         state={}",
        base_url.trim_end_matches('/'),
        urlencoding::encode(client_id),
        urlencoding::encode(redirect_uri),
        urlencoding::encode(state)
    )
}

/// Map a non-success response to the matching error.
async fn error_for(response: reqwest::Response) -> ProviderError {
    let status = response.status();

    match status.as_u16() {
        429 => {
            tracing::warn!("Strava rate limit hit (429)");
            ProviderError::RateLimited
        }
        401 => ProviderError::Unauthorized,
        code => ProviderError::Status {
            status: code,
            body: response.text().await.unwrap_or_default(),
        },
    }
}

/// Check response status and return error if not successful.
async fn check_response(response: reqwest::Response) -> Result<(), ProviderError> {
    if response.status().is_success() {
        return Ok(());
    }
    Err(error_for(response).await)
}

/// Check response and parse JSON body.
async fn check_response_json<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, ProviderError> {
    if !response.status().is_success() {
        return Err(error_for(response).await);
    }

    response
        .json()
        .await
        .map_err(|e| ProviderError::Decode(e.to_string()))
}

/// Token exchange/refresh response (athlete and expires_in are ignored).
#[derive(Debug, Clone, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_at: i64,
}

impl TokenResponse {
    fn into_credential(self) -> Credential {
        Credential {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at: self.expires_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct SubscriptionResponse {
    id: u64,
}

/// Activity as Strava serves it (summary and detailed shapes both fit).
#[derive(Debug, Clone, Deserialize)]
pub struct RawActivity {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub distance: f64,
    #[serde(default)]
    pub total_elevation_gain: f64,
    #[serde(default)]
    pub elapsed_time: i64,
    #[serde(default)]
    pub average_speed: f64,
    #[serde(default)]
    pub average_watts: Option<f64>,
    #[serde(default)]
    pub average_cadence: Option<f64>,
    #[serde(default)]
    pub timezone: String,
    #[serde(default)]
    pub sport_type: String,
    #[serde(default)]
    pub start_date: Option<String>,
}

impl RawActivity {
    /// Translate into the canonical model.
    pub fn into_activity(self) -> Activity {
        let start_time = parse_rfc3339_or_epoch(self.start_date.as_deref());
        let elapsed = self.elapsed_time.max(0);

        Activity {
            id: self.id,
            name: self.name,
            distance: self.distance,
            elevation_gain: self.total_elevation_gain,
            elapsed_time_secs: elapsed,
            average_speed: self.average_speed,
            average_watts: self.average_watts.unwrap_or_default(),
            average_cadence: self.average_cadence.unwrap_or_default(),
            timezone: self.timezone,
            activity_type: format_activity_type(&self.sport_type),
            start_time,
            end_time: Duration::try_seconds(elapsed)
                .and_then(|d| start_time.checked_add_signed(d))
                .unwrap_or(start_time),
        }
    }
}

/// Human-readable label for a Strava `sport_type` code; unknown codes pass through.
pub fn format_activity_type(sport_type: &str) -> String {
    let label = match sport_type {
        "AlpineSki" => "Alpine Ski",
        "BackcountrySki" => "Backcountry Ski",
        "Badminton" => "Badminton",
        "Canoeing" => "Canoeing",
        "Crossfit" => "Crossfit",
        "EBikeRide" => "E-Bike Ride",
        "Elliptical" => "Elliptical",
        "EMountainBikeRide" => "E-Mountain Bike Ride",
        "Golf" => "Golf",
        "GravelRide" => "Gravel Ride",
        "Handcycle" => "Handcycle",
        "HighIntensityIntervalTraining" => "High Intensity Interval Training",
        "Hike" => "Hike",
        "IceSkate" => "Ice Skate",
        "InlineSkate" => "Inline Skate",
        "Kayaking" => "Kayaking",
        "Kitesurf" => "Kitesurf",
        "MountainBikeRide" => "Mountain Bike Ride",
        "NordicSki" => "Nordic Ski",
        "Pickleball" => "Pickleball",
        "Pilates" => "Pilates",
        "Racquetball" => "Racquetball",
        "Ride" => "Ride",
        "RockClimbing" => "Rock Climbing",
        "RollerSki" => "Roller Ski",
        "Rowing" => "Rowing",
        "Run" => "Run",
        "Sail" => "Sail",
        "Skateboard" => "Skateboard",
        "Snowboard" => "Snowboard",
        "Snowshoe" => "Snowshoe",
        "Soccer" => "Soccer",
        "Squash" => "Squash",
        "StairStepper" => "Stair Stepper",
        "StandUpPaddling" => "Stand Up Paddling",
        "Surfing" => "Surfing",
        "Swim" => "Swim",
        "TableTennis" => "Table Tennis",
        "Tennis" => "Tennis",
        "TrailRun" => "Trail Run",
        "Velomobile" => "Velomobile",
        "VirtualRide" => "Virtual Ride",
        "VirtualRow" => "Virtual Row",
        "VirtualRun" => "Virtual Run",
        "Walk" => "Walk",
        "WeightTraining" => "Weight Training",
        "Wheelchair" => "Wheelchair",
        "Windsurf" => "Windsurf",
        "Workout" => "Workout",
        "Yoga" => "Yoga",
        other => other,
    };
    label.to_string()
}
