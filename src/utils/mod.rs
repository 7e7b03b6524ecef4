pub mod collection_ext;

pub use collection_ext::unique_ordered;
