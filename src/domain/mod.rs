pub mod errors;
pub mod order;
pub mod ports;
pub mod preview;
pub mod pricing;
pub mod product;
