//! Application services: the product catalog and the reseller gateway seam.

pub mod error;
pub mod products;
pub mod reseller;
