pub mod chromosome;
pub mod fitness;
pub mod operators;
pub mod population;
pub mod progress;
pub mod selector;

pub use chromosome::Chromosome;
pub use fitness::{FitnessEvaluator, FitnessRecord, WORST_FITNESS};
pub use population::{next_generation, FitnessCache, Population};
pub use progress::{ChannelProgressCallback, LogProgressCallback, ProgressMessage, SilentProgress};
pub use selector::{select, GenerationStats, GeneticSelector, ProgressCallback, SelectionResult};
