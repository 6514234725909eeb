mod shortened_url;

pub use shortened_url::{redirect_handler, shorten_handler};
