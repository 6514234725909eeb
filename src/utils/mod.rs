pub mod base62;
pub mod id_generator;
