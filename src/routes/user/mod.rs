mod handler;
pub mod model;

pub use handler::{get_profile, update_profile, upload_avatar};
