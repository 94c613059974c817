pub mod application;
pub mod candidate;
pub mod email;
pub mod normalize;
