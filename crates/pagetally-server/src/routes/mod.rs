pub mod health;
pub mod properties;
pub mod reports;
pub mod track;
pub mod tracker_script;
