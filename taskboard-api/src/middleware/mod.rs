/// Custom tower middleware
///
/// Authentication lives in [`crate::app`] because it needs the application
/// state.

pub mod security;
