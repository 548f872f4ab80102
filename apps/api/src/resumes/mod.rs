// Resume records: persistence in the key-value store and the read API.

pub mod handlers;
pub mod repository;
