use std::sync::Arc;

use crate::application::products::ProductService;
use crate::application::reseller::{ResellerGateway, SharedCredentials};

#[derive(Clone)]
pub struct ApiState {
    pub products: Arc<ProductService>,
    pub reseller: Arc<dyn ResellerGateway>,
    /// Credentials the reseller client signs with; replaced by the settings endpoint.
    pub credentials: SharedCredentials,
}
