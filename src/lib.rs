pub mod accounting;
pub mod backup;
pub mod config;
pub mod dates;
pub mod import;
pub mod numeric;
pub mod record;
