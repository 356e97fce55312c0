pub mod models;
pub mod transform;
