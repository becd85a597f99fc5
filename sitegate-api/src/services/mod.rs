//! Service Layer
//!
//! Write paths that touch the access store and must keep the subscription
//! cache consistent with it.

mod subscription_service;

pub use subscription_service::*;
