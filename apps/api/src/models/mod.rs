pub mod credential;
pub mod resume;
