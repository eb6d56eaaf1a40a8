pub mod canned;
pub mod openai;

pub use canned::CannedBackend;
pub use openai::OpenAiBackend;
