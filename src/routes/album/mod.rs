mod handler;
mod model;

pub use handler::{get_album, get_albums, search};
