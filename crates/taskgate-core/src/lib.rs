pub mod principal;

pub use principal::{UNKNOWN_PRINCIPAL, principal_key, todos_cache_key};
