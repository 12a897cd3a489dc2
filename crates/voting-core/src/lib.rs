pub mod ballot;
pub mod block;
pub mod chain;
pub mod clock;
pub mod config;
pub mod error;
pub mod pki;
pub mod state;
pub mod ticket;
pub mod transaction;
pub mod voter;

pub use ballot::{BallotItem, BallotSelection, BallotTemplate};
pub use block::Block;
pub use chain::Chain;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::ElectionConfig;
pub use error::{Result, VotingError};
pub use pki::{PeerHandle, Pki};
pub use state::StateSnapshot;
pub use ticket::BallotClaimTicket;
pub use transaction::{Transaction, TransactionPayload};
pub use voter::{Voter, VoterId, VoterRecord, VoterRoll};
