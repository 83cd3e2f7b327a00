pub mod use_cases;

pub use use_cases::pipeline::{Pipeline, PipelineOutcome, SequentialChain};
pub use use_cases::table_session::{ResultTable, TableSession};
