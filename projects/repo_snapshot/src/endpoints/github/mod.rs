pub mod authorize;
pub mod callback;
