pub mod cost;
pub mod geo;
pub mod heuristic;
pub mod mask;
pub mod models;
pub mod physics;
pub mod polar;
pub mod router;
pub mod waypoints;
pub mod wind;
