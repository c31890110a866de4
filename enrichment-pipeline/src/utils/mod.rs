pub mod keywords;
pub mod source;
