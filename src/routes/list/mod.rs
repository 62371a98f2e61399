mod handler;
mod model;

pub use handler::{add_item, create, get_list, reorder, update};
