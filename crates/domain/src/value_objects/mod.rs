//! Value Objects - Immutable, identity-less domain primitives

mod line_code;
mod stop_code;

pub use line_code::LineCode;
pub use stop_code::StopCode;
