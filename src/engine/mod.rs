pub mod lifecycle;
pub mod normalize;
pub mod ratings;
pub mod technicians;
