mod shortened_url;

pub use shortened_url::validate_url;
