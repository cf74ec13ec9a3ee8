//! Wire types for the gallery backend.
//!
//! Field names follow the backend's camelCase JSON. Required fields are the
//! ones the client cannot work without (`_id`, `type`, `email`); everything
//! shown only for display is optional or defaulted.

use std::fmt;

use serde::{Deserialize, Serialize};

// =============================================================================
// IDENTITY
// =============================================================================

/// Role discriminant carried in the identity record's `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    User,
    Photographer,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Photographer => "Photographer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub country: String,
}

/// The authenticated account as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub email: String,
    #[serde(rename = "type")]
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<ShippingAddress>,
}

impl Identity {
    /// `"First Last"`, trimmed; empty when neither name is set.
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_owned()
    }

    /// `"City, Country"` from the shipping address, skipping empty parts.
    #[must_use]
    pub fn location(&self) -> Option<String> {
        let addr = self.shipping_address.as_ref()?;
        let parts: Vec<&str> = [addr.city.as_str(), addr.country.as_str()]
            .into_iter()
            .filter(|p| !p.is_empty())
            .collect();
        if parts.is_empty() { None } else { Some(parts.join(", ")) }
    }
}

/// Body of `GET /api/user/get-user-profile-by-token`.
#[derive(Debug, Deserialize)]
pub(crate) struct ProfileEnvelope {
    pub user: Identity,
}

// =============================================================================
// LOGIN
// =============================================================================

#[derive(Debug, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Successful body of `POST /api/photographer/login`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub photographer: Identity,
}

/// Error body the backend sends with non-2xx responses.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}

// =============================================================================
// DASHBOARD
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct PhotographerStats {
    #[serde(default)]
    pub downloads: u64,
    #[serde(default)]
    pub views: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ImageLinks {
    #[serde(default)]
    pub original: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct ImageAnalytics {
    #[serde(default)]
    pub views: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Photo {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub image_links: ImageLinks,
    #[serde(default)]
    pub image_analytics: Option<ImageAnalytics>,
}

impl Photo {
    #[must_use]
    pub fn views(&self) -> u64 {
        self.image_analytics.map_or(0, |a| a.views)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Catalogue {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Blog {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct PhotosPage {
    #[serde(default)]
    pub photos: Vec<Photo>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PendingPhotosPage {
    #[serde(default)]
    pub pending_images: Vec<Photo>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct CataloguesPage {
    #[serde(default)]
    pub catalogues: Vec<Catalogue>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct BlogsPage {
    #[serde(default)]
    pub blogs: Vec<Blog>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ActiveSubscriptionBody {
    #[serde(default)]
    pub subscription: Option<Subscription>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    #[serde(default)]
    pub plan_id: Option<Plan>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Plan {
    #[serde(default)]
    pub name: Option<String>,
}

impl Subscription {
    /// Lowercased plan name, if the subscription carries one.
    #[must_use]
    pub fn plan_name(&self) -> Option<String> {
        self.plan_id
            .as_ref()
            .and_then(|p| p.name.as_deref())
            .map(str::to_lowercase)
    }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
