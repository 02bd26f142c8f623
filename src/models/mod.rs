pub mod catalog;
pub mod request;
pub mod technician;
