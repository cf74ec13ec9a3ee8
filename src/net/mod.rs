//! Backend REST API — typed records and the HTTP client.

pub mod api;
pub mod types;

pub use api::{ApiClient, ApiError, LoginApi, PhotographerApi, ProfileApi};
pub use types::{Identity, LoginResponse, Role, ShippingAddress};
