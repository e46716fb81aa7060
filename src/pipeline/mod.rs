pub mod runner;
pub mod session;

pub use runner::SelectionRunner;
pub use session::PipelineSession;
