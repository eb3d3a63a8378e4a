mod contact_constraint;

pub use contact_constraint::{
    normal_velocity, prepare_point, restitution_target, shock_friction, shock_normal, shock_pseudo, solve_friction,
    solve_normal, solve_pseudo,
};
