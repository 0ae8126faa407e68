pub mod convert;
pub mod currencies;
pub mod history;
pub mod interactive;
pub mod setup;
pub mod ui;
