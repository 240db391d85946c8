pub mod completion;
pub mod db;
pub mod memory;
pub mod vision;

pub use completion::OpenAiCompletionAdapter;
pub use db::PgDocumentStore;
pub use memory::InMemoryDocumentStore;
pub use vision::OpenAiVisionAdapter;
