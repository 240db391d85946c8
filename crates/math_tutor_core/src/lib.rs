pub mod domain;
pub mod ports;
pub mod solver;
pub mod text;
pub mod tutor;

pub use domain::{
    ChatMode, ChatRole, ChatTurn, ImageUpload, NewProblem, ProblemRecord, RecordId, SolveMode,
    TopicCount,
};
pub use ports::{
    CompletionProvider, CompletionRequest, DocumentStore, OcrProvider, PortError, PortResult,
    ResponseFormat,
};
pub use solver::{solve_equation, NotApplicable, SymbolicOutcome};
pub use tutor::{Calculation, MathTutor, SolutionSource};
