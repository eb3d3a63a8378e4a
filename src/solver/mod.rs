mod sequential_impulse;
mod shock_propagation;

pub use sequential_impulse::{SequentialImpulseSolver, SolverConfig};
pub use shock_propagation::build_layers;
