pub mod results;
pub mod round;

pub use results::{query_results, ResultsQuery};
pub use round::{run_consensus_round, ConsensusRoundReport};
