//! API handlers organized by resource type.
//!
//! Each submodule contains handlers for one surface (catalog, reseller passthrough,
//! settings). Error conversions are defined here and shared across modules.

mod products;
mod reseller;
mod settings;

pub use products::*;
pub use reseller::*;
pub use settings::*;

// ----- Shared error conversions -----

use std::error::Error as StdError;

use axum::http::StatusCode;

use crate::application::products::{ProductServiceError, RefreshError};
use crate::application::reseller::{UpstreamError, UpstreamErrorKind};
use crate::domain::error::DomainError;

use super::error::{ApiError, codes};

pub(crate) fn upstream_to_api(err: UpstreamError) -> ApiError {
    let hint = Some(err.to_string());
    match err.kind() {
        UpstreamErrorKind::Configuration => ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            codes::UPSTREAM_UNCONFIGURED,
            "Reseller credentials are not configured",
            hint,
        ),
        UpstreamErrorKind::Throttled => ApiError::new(
            StatusCode::TOO_MANY_REQUESTS,
            codes::RATE_LIMITED,
            "Reseller rate limit reached",
            hint,
        ),
        UpstreamErrorKind::Transport { .. }
        | UpstreamErrorKind::Business { .. }
        | UpstreamErrorKind::Request(_)
        | UpstreamErrorKind::Decode(_) => ApiError::new(
            StatusCode::BAD_GATEWAY,
            codes::UPSTREAM,
            "Reseller request failed",
            hint,
        ),
    }
}

pub(crate) fn domain_to_api(err: DomainError) -> ApiError {
    match err {
        DomainError::NotFound { entity } => ApiError::new(
            StatusCode::NOT_FOUND,
            codes::NOT_FOUND,
            "Resource not found",
            Some(format!("{entity} not found")),
        ),
        DomainError::Validation { message } => ApiError::bad_request("Invalid input", Some(message)),
    }
}

pub(crate) fn products_to_api(err: ProductServiceError) -> ApiError {
    match err {
        ProductServiceError::Domain(err) => domain_to_api(err),
        ProductServiceError::Refresh(RefreshError::Upstream(err)) => upstream_to_api(err),
        ProductServiceError::Refresh(err) => {
            internal_error(codes::CACHE, "Product refresh failed", &err)
        }
        ProductServiceError::Store(err) => {
            internal_error(codes::CACHE, "Product cache could not be updated", &err)
        }
        ProductServiceError::Metadata(err) => {
            internal_error(codes::METADATA, "Developer metadata unavailable", &err)
        }
    }
}

fn internal_error(code: &'static str, message: &'static str, err: &dyn StdError) -> ApiError {
    ApiError::new(
        StatusCode::INTERNAL_SERVER_ERROR,
        code,
        message,
        Some(err.to_string()),
    )
    .caused_by(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_kinds_map_to_distinct_statuses() {
        let unconfigured = upstream_to_api(UpstreamErrorKind::Configuration.into());
        assert_eq!(unconfigured.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(unconfigured.code(), codes::UPSTREAM_UNCONFIGURED);

        let throttled = upstream_to_api(UpstreamErrorKind::Throttled.into());
        assert_eq!(throttled.status(), StatusCode::TOO_MANY_REQUESTS);

        let transport = upstream_to_api(
            UpstreamErrorKind::Transport {
                status: 500,
                body: "oops".to_string(),
            }
            .into(),
        );
        assert_eq!(transport.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(transport.code(), codes::UPSTREAM);
    }

    #[test]
    fn refresh_failures_unwrap_to_upstream_mapping() {
        let err = ProductServiceError::Refresh(RefreshError::Upstream(
            UpstreamErrorKind::Throttled.into(),
        ));
        assert_eq!(products_to_api(err).status(), StatusCode::TOO_MANY_REQUESTS);

        let missing = ProductServiceError::Domain(DomainError::not_found("product"));
        assert_eq!(products_to_api(missing).code(), codes::NOT_FOUND);
    }
}
