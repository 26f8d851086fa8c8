//! Services Layer
//!
//! Business logic behind the HTTP handlers. The rental lifecycle lives in
//! `rental_service`; everything else collaborates around it.

pub mod analytics_service;
pub mod invoice_service;
pub mod item_service;
pub mod notification_service;
pub mod otp_service;
pub mod rental_service;
pub mod verification_service;
