pub mod check;
pub mod form;
pub mod repository;
pub mod stats;
pub mod tree;
