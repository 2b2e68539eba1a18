pub mod db;
pub mod gemini;
pub mod mem;

pub use db::PgStorage;
pub use gemini::GeminiAdapter;
pub use mem::MemStorage;
