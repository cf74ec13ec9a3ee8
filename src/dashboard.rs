//! Photographer dashboard — stats, gallery, catalogues, blogs, and plan.
//!
//! Each section is an independent GET. They run concurrently and a failing
//! section degrades to empty instead of failing the whole dashboard, the way
//! the profile screen renders whatever it managed to load.

use tracing::{debug, warn};

use crate::net::types::{Blog, Catalogue, Photo, PhotographerStats, Subscription};
use crate::net::{ApiError, Identity, PhotographerApi};

/// Upload allowance attached to a subscription plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanTier {
    Basic,
    Intermediate,
    Premium,
}

impl PlanTier {
    /// Allowance when no recognized plan is active.
    pub const DEFAULT_UPLOAD_LIMIT: u32 = 1;

    /// Map a plan name (case-insensitive) to a tier.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "basic" => Some(Self::Basic),
            "intermediate" => Some(Self::Intermediate),
            "premium" => Some(Self::Premium),
            _ => None,
        }
    }

    #[must_use]
    pub fn upload_limit(self) -> u32 {
        match self {
            Self::Basic => 1,
            Self::Intermediate => 5,
            Self::Premium => 999_999,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Dashboard {
    pub stats: PhotographerStats,
    pub photos: Vec<Photo>,
    pub pending_photos: Vec<Photo>,
    pub catalogues: Vec<Catalogue>,
    pub blogs: Vec<Blog>,
    pub plan: Option<PlanTier>,
}

impl Dashboard {
    /// Fetch every section for `photographer`.
    pub async fn load(api: &dyn PhotographerApi, photographer: &Identity) -> Self {
        let id = photographer.id.as_str();
        let (stats, photos, pending, catalogues, blogs, subscription) = tokio::join!(
            api.photographer_stats(id),
            api.photos(id),
            api.pending_photos(id),
            api.catalogues(id),
            api.blogs(id),
            api.active_subscription(id),
        );

        let plan = settle("subscription", subscription)
            .flatten()
            .as_ref()
            .and_then(Subscription::plan_name)
            .and_then(|name| PlanTier::from_name(&name));

        let dashboard = Self {
            stats: settle("stats", stats).unwrap_or_default(),
            photos: settle("photos", photos).unwrap_or_default(),
            pending_photos: settle("pending photos", pending).unwrap_or_default(),
            catalogues: settle("catalogues", catalogues).unwrap_or_default(),
            blogs: settle("blogs", blogs).unwrap_or_default(),
            plan,
        };
        debug!(photographer = id, photos = dashboard.photos.len(), "dashboard loaded");
        dashboard
    }

    /// Number of published gallery items.
    #[must_use]
    pub fn gallery_count(&self) -> usize {
        self.photos.len()
    }

    /// Sum of per-photo view counts.
    #[must_use]
    pub fn impressions(&self) -> u64 {
        self.photos.iter().map(Photo::views).sum()
    }

    #[must_use]
    pub fn downloads(&self) -> u64 {
        self.stats.downloads
    }

    #[must_use]
    pub fn upload_limit(&self) -> u32 {
        self.plan
            .map_or(PlanTier::DEFAULT_UPLOAD_LIMIT, PlanTier::upload_limit)
    }
}

fn settle<T>(section: &'static str, result: Result<T, ApiError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(section, error = %e, "dashboard section unavailable");
            None
        }
    }
}

#[cfg(test)]
#[path = "dashboard_test.rs"]
mod tests;
