pub mod category;
pub mod evaluation;
pub mod posting;

pub use category::{CategoryRegistry, CategorySpec, JobCategory};
pub use evaluation::{
    ClassificationResult, Criterion, EvaluationResult, Grade, JudgeVerdict, PostingRef,
};
pub use posting::{Posting, PostingSet};
