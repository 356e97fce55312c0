mod import;

pub use import::{import, ImportError};
