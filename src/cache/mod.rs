pub mod store;

pub use store::SearchCache;
