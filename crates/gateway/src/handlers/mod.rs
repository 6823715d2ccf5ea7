pub mod graphs;
pub mod health;
pub mod search;
pub mod works;
