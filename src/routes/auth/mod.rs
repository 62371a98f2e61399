mod handler;
mod model;

pub use handler::{callback, login, logout, session};
