pub mod draft_store;
pub mod order_builder;
pub mod preview;
pub mod registry;
