mod handler;
mod model;

pub use handler::{create, list_for_album};
