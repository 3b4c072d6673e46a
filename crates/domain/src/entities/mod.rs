//! Domain entities - Records produced by the upstream search endpoints

mod line;
mod stop;

pub use line::{LineCandidate, LineDirection};
pub use stop::StopCandidate;
