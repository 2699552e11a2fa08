pub mod document;
pub mod email;
pub mod job;
pub mod profile;
