//! Bookshelf server library
//!
//! Books and Author REST resources mounted on the bookshelf kernel.

pub mod modules;

pub use modules::register_all;
