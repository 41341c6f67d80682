pub mod dashboard;
pub mod history;
pub mod login;
pub mod profile;
pub mod register;
