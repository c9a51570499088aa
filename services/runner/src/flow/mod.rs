pub mod pipeline;
pub mod present;
pub mod state;
pub mod timer;

// Re-export the pieces the binary wires together.
pub use pipeline::{submit, SubmissionOutcome};
pub use present::{prepare, recover, render, ResultsScreen};
pub use state::AppState;
pub use timer::SessionTimer;
