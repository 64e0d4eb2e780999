pub mod module;
pub mod resource;
