pub mod advisor;
pub mod pipeline;
pub mod presenter;
pub mod prompt;
pub mod redactor;
pub mod selector;

pub use advisor::{
    Advisor, AdvisorError, OllamaAdvisor, OpenAiAdvisor, ProviderKind, build_advisor,
};
pub use pipeline::{Pipeline, PipelineError};
pub use presenter::Presenter;
pub use redactor::{RedactionError, Redactor, SENSITIVE_KEYS, SENTINEL};
pub use selector::{MongoQuerySelector, QuerySelector, StoreError};
