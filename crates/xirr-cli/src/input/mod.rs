pub mod file;
pub mod rows;
pub mod stdin;
