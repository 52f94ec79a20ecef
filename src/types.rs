use std::collections::BTreeMap;

use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Dashboard developer identifier.
#[derive(
    Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into,
)]
#[serde(transparent)]
pub struct DeveloperId(pub String);

/// Policy identifier. Each catalogue entry is bound to exactly one policy.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, From, Into,
)]
#[serde(transparent)]
pub struct PolicyId(pub String);

/// API key granted to a developer for a policy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into)]
#[serde(transparent)]
pub struct KeyId(pub String);

/// Access request identifier, as returned in the creation response's `Message`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into)]
#[serde(transparent)]
pub struct RequestId(pub String);

/// Developer record owned by the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[non_exhaustive]
pub struct Developer {
    #[serde(default)]
    pub id: DeveloperId,
    pub email: String,
    #[serde(default)]
    pub fields: DeveloperFields,
    #[serde(default)]
    pub subscriptions: BTreeMap<PolicyId, KeyId>,
    #[serde(default)]
    pub inactive: bool,
}

impl Developer {
    #[must_use]
    pub fn is_subscribed_to(&self, policy_id: &PolicyId) -> bool {
        self.subscriptions.contains_key(policy_id)
    }

    /// Subscription keys joined for the activity endpoint, trailing separator included.
    #[must_use]
    pub fn activity_key_list(&self) -> String {
        let mut keys = self
            .subscriptions
            .values()
            .map(|k| k.0.as_str())
            .collect::<Vec<_>>()
            .join(",");
        keys.push(',');
        keys
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeveloperFields {
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "Location", default)]
    pub location: String,
}

/// Registration payload for `POST /api/portal/developers`.
#[derive(Debug, Clone, Serialize)]
pub struct NewDeveloper {
    pub email: String,
    pub password: String,
    pub inactive: bool,
    pub fields: DeveloperFields,
}

impl NewDeveloper {
    #[must_use]
    pub fn new(
        email: impl Into<String>,
        password: impl Into<String>,
        name: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            inactive: false,
            fields: DeveloperFields {
                name: name.into(),
                location: location.into(),
            },
        }
    }
}

/// The set of APIs developers can subscribe to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalogue {
    #[serde(default)]
    pub apis: Vec<CatalogueApi>,
}

impl Catalogue {
    #[must_use]
    pub fn find(&self, policy_id: &PolicyId) -> Option<&CatalogueApi> {
        self.apis.iter().find(|api| &api.policy_id == policy_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogueApi {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub short_description: String,
    #[serde(default)]
    pub long_description: String,
    pub policy_id: PolicyId,
}

/// Portal-wide settings kept in the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortalConfig {
    #[serde(default)]
    pub require_key_approval: bool,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, JsonValue>,
}

/// Key request payload for `POST /api/portal/requests`.
#[derive(Debug, Clone, Serialize)]
pub struct AccessRequest {
    pub by_user: DeveloperId,
    pub fields: AccessRequestFields,
    pub date_created: String,
    pub version: &'static str,
    pub for_plan: PolicyId,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccessRequestFields {
    pub usecase: String,
    pub traffic: String,
}

/// Generic write response of the dashboard API.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiMessage {
    #[serde(rename = "Status", default)]
    pub status: String,
    #[serde(rename = "Message", default)]
    pub message: String,
    #[serde(rename = "Meta", default)]
    pub meta: JsonValue,
}

/// One page of aggregated key analytics.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActivityPage {
    #[serde(default)]
    pub data: Vec<JsonValue>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ActivityTotals {
    pub hits: i64,
    pub success: i64,
    pub error: i64,
}

impl ActivityTotals {
    /// Sums `hits`, `success` and `error` over analytics rows.
    ///
    /// Missing fields count as zero and values are read with [`leading_integer`].
    /// Sums saturate at the `i64` bounds.
    #[must_use]
    pub fn from_rows(rows: &[JsonValue]) -> Self {
        rows.iter().fold(Self::default(), |mut total, row| {
            total.hits = total.hits.saturating_add(leading_integer(row.get("hits")));
            total.success = total
                .success
                .saturating_add(leading_integer(row.get("success")));
            total.error = total.error.saturating_add(leading_integer(row.get("error")));
            total
        })
    }
}

/// Reads a counter the way the analytics rows are loosely typed:
/// numbers are truncated, strings contribute their leading signed digits,
/// everything else is zero.
#[must_use]
pub fn leading_integer(value: Option<&JsonValue>) -> i64 {
    match value {
        Some(JsonValue::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Some(JsonValue::String(s)) => {
            let s = s.trim_start();
            let (sign, digits) = match s.as_bytes().first() {
                Some(b'-') => (-1, &s[1..]),
                Some(b'+') => (1, &s[1..]),
                _ => (1, s),
            };
            let end = digits
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(digits.len());
            digits[..end].parse::<i64>().map(|n| sign * n).unwrap_or(0)
        }
        _ => 0,
    }
}
