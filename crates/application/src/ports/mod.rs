//! Port definitions for application layer
//!
//! Ports are interfaces that define how the application interacts with
//! external systems. Adapters in the infrastructure layer implement these ports.

mod classifier_port;
mod route_planner_port;
mod transit_port;

pub use classifier_port::ClassifierPort;
#[cfg(test)]
pub use classifier_port::MockClassifierPort;
pub use route_planner_port::RoutePlannerPort;
#[cfg(test)]
pub use route_planner_port::MockRoutePlannerPort;
#[cfg(test)]
pub use transit_port::MockTransitPort;
pub use transit_port::TransitPort;
