pub mod csv;
pub mod file;
pub mod stdin;
