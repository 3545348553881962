//! sea-orm entities backing the kiosk's local directory.

pub mod employees;
