pub mod http;
pub mod store;

pub use http::HttpQuizAdapter;
pub use store::FileStore;
