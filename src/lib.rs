pub mod components;
pub mod config;
pub mod error;
pub mod ical;
pub mod shutdown;
pub mod startup;
