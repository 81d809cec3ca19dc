pub mod models;
pub mod shot;
