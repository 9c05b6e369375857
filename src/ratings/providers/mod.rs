// src/ratings/providers/mod.rs
pub mod letterboxd;
pub mod omdb;
pub mod rotten_tomatoes;
