//! Lesson Flow Engine
//!
//! Composes a lesson's content and exercise records into one timeline,
//! validates exercise placement, and applies restructuring plans.

pub mod api;
pub mod config;
pub mod error;
pub mod flow;
pub mod matcher;
pub mod model;
pub mod restructure;
pub mod store;
pub mod validator;

pub use api::{
    create_router, AppState, ErrorResponse, FlowResponse, RestructureRequest, RestructureResponse,
};
pub use config::{Config, ValidatorConfig};
pub use error::{FlowError, Result};
pub use flow::{compose, FlowItem};
pub use matcher::{
    default_keyword_groups, ContextMatch, ContextStrategy, KeywordContextMatcher, KeywordGroup,
};
pub use model::{
    ContentEntry, EntryId, ExerciseConfig, ExerciseEntry, ExerciseKind, Lesson, OrderKey,
    QuizQuestion,
};
pub use restructure::{
    execute, load_plan, Action, ExecutionResult, OperationCounts, OperationError,
    RestructureOperation, RestructureOutcome, RestructureSummary, TargetType,
};
pub use store::{
    MemoryStore, NewContent, NewExercise, RecordFilter, RecordStore, StoreError, StoreResult,
    StoreSnapshot,
};
pub use validator::{IssueKind, PlacementIssue, PlacementValidator, Severity, ValidationResult};
