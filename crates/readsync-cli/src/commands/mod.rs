pub mod book;
pub mod read_time;
