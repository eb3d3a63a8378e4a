use tracing::{debug, instrument, trace, warn};

use crate::collision::{collide, BoundsTree, ContactManifold, ContactPatch, ContactStore};
use crate::dynamics::{integrate_body, Body, BodyDesc, BodyHandle};
use crate::error::{PhysicsError, Result};
use crate::geometry::Shape;
use crate::math::{consts::EPSILON, Vec3};
use crate::solver::{SequentialImpulseSolver, SolverConfig};

/// Configuration for the physics world
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WorldConfig {
    pub gravity: Vec3,
    /// Factor applied to the velocities every step
    pub damping: f32,
    /// Still steps before a group falls asleep
    pub sleep_time: u32,
    pub sleep_velocity: f32,
    pub sleep_angular_velocity: f32,
    /// Merge sweeps over the manifolds at the end of a step
    pub collision_group_iterations: usize,
    pub solver: SolverConfig,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, -9.81, 0.0),
            damping: 0.99,
            sleep_time: 60,
            sleep_velocity: 0.1,
            sleep_angular_velocity: 0.1,
            collision_group_iterations: 150, // long chains need many sweeps to share one group
            solver: SolverConfig::default(),
        }
    }
}

impl WorldConfig {
    /// Checks every value against its allowed range.
    pub fn validate(&self) -> Result<()> {
        let problem = if !self.gravity.is_finite() {
            Some("gravity must be finite".to_string())
        } else if !(self.damping > 0.0 && self.damping <= 1.0) {
            Some(format!("damping must be in (0, 1], got {}", self.damping))
        } else if !(self.sleep_velocity > 0.0 && self.sleep_angular_velocity > 0.0) {
            Some("sleep thresholds must be positive".to_string())
        } else if self.solver.velocity_iterations == 0 {
            Some("at least one velocity iteration is required".to_string())
        } else if !(self.solver.erp_velocity > 0.0 && self.solver.erp_velocity <= 1.0) {
            Some(format!("erp_velocity must be in (0, 1], got {}", self.solver.erp_velocity))
        } else if !(self.solver.erp_position > 0.0 && self.solver.erp_position <= 1.0) {
            Some(format!("erp_position must be in (0, 1], got {}", self.solver.erp_position))
        } else if !(self.solver.slop >= 0.0) {
            Some(format!("slop must not be negative, got {}", self.solver.slop))
        } else if !(self.solver.restitution_threshold >= 0.0) {
            Some("restitution threshold must not be negative".to_string())
        } else {
            None
        };

        match problem {
            Some(message) => {
                warn!(%message, "rejected world configuration");
                Err(PhysicsError::InvalidConfig(message))
            }
            None => Ok(()),
        }
    }
}

/// The simulation: bodies, their contacts and the solver.
///
/// Bodies are addressed by their position in the body list. Removing a body
/// shifts every later body down by one and renumbers its handle.
#[derive(Debug)]
pub struct World {
    config: WorldConfig,
    bodies: Vec<Body>,
    contacts: ContactStore,
    solver: SequentialImpulseSolver,
    /// Scratch list of patches for one body pair
    patches: Vec<ContactPatch>,
}

impl Default for World {
    fn default() -> Self {
        Self::new(WorldConfig::default())
    }
}

impl World {
    /// Creates a world without checking the configuration
    pub fn new(config: WorldConfig) -> Self {
        let solver = config.solver;
        Self {
            contacts: ContactStore::new(solver.erp_velocity, solver.erp_position, solver.slop),
            solver: SequentialImpulseSolver::new(solver),
            config,
            bodies: Vec::new(),
            patches: Vec::new(),
        }
    }

    /// Creates a world after validating the configuration
    pub fn try_new(config: WorldConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(config))
    }

    /// Builds a body from `desc` and registers it
    pub fn create_body(&mut self, desc: BodyDesc) -> BodyHandle {
        self.add_body(desc.build())
    }

    /// Registers `body`; its handle is the current body count.
    pub fn add_body(&mut self, mut body: Body) -> BodyHandle {
        let handle = BodyHandle::new(self.bodies.len() as u32);
        body.set_handle(handle);
        body.reset_collision_group();
        self.bodies.push(body);
        trace!(index = handle.index(), "body added");
        handle
    }

    /// Unregisters a body and hands it back with its shapes.
    ///
    /// Later bodies move down one slot. The warm-start history is dropped
    /// since it refers to the old indices.
    pub fn remove_body(&mut self, handle: BodyHandle) -> Result<Body> {
        let index = handle.index();
        if index >= self.bodies.len() {
            return Err(PhysicsError::BodyNotFound { index });
        }

        let mut body = self.bodies.remove(index);
        for (i, later) in self.bodies.iter_mut().enumerate().skip(index) {
            later.set_handle(BodyHandle::new(i as u32));
        }
        body.set_handle(BodyHandle::INVALID);
        body.reset_collision_group();
        self.contacts.clear();

        trace!(index, remaining = self.bodies.len(), "body removed");
        Ok(body)
    }

    /// Gives `shape` to a body and wakes it. Returns the shape index.
    pub fn attach_shape(&mut self, handle: BodyHandle, shape: Shape) -> Result<usize> {
        let body = self.get_body_mut(handle)?;
        body.wake_up();
        Ok(body.add_shape(shape))
    }

    /// Takes shape `index` back from a body
    pub fn detach_shape(&mut self, handle: BodyHandle, index: usize) -> Result<Shape> {
        let body = self.get_body_mut(handle)?;
        let shape = body.remove_shape(index)?;
        body.wake_up();
        Ok(shape)
    }

    fn get_body_mut(&mut self, handle: BodyHandle) -> Result<&mut Body> {
        self.bodies
            .get_mut(handle.index())
            .ok_or(PhysicsError::BodyNotFound { index: handle.index() })
    }

    #[inline]
    pub fn body(&self, handle: BodyHandle) -> Option<&Body> {
        self.bodies.get(handle.index())
    }

    #[inline]
    pub fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut Body> {
        self.bodies.get_mut(handle.index())
    }

    #[inline]
    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    #[inline]
    pub fn num_bodies(&self) -> usize {
        self.bodies.len()
    }

    /// Manifolds produced by the last step
    #[inline]
    pub fn contact_manifolds(&self) -> &[ContactManifold] {
        self.contacts.manifolds()
    }

    #[inline]
    pub fn contacts(&self) -> &ContactStore {
        &self.contacts
    }

    /// Previous-step points reused and dropped by the last warm start
    pub fn contact_stats(&self) -> (usize, usize) {
        self.contacts.contact_stats()
    }

    /// Number of enabled dynamic bodies that are not asleep
    pub fn awake_bodies(&self) -> usize {
        self.bodies.iter().filter(|b| is_awake(b)).count()
    }

    #[inline]
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    #[inline]
    pub fn gravity(&self) -> Vec3 {
        self.config.gravity
    }

    pub fn set_gravity(&mut self, gravity: Vec3) {
        self.config.gravity = gravity;
    }

    pub fn set_damping(&mut self, damping: f32) {
        self.config.damping = damping;
    }

    pub fn set_sleep_time(&mut self, steps: u32) {
        self.config.sleep_time = steps;
    }

    pub fn set_sleep_velocity(&mut self, velocity: f32) {
        self.config.sleep_velocity = velocity;
    }

    pub fn set_sleep_angular_velocity(&mut self, velocity: f32) {
        self.config.sleep_angular_velocity = velocity;
    }

    pub fn set_collision_group_iterations(&mut self, iterations: usize) {
        self.config.collision_group_iterations = iterations;
    }

    /// Sets the velocity and split-impulse iteration counts
    pub fn set_iterations(&mut self, velocity: usize, position: usize) {
        self.config.solver.velocity_iterations = velocity;
        self.config.solver.position_iterations = position;
        self.solver.set_config(self.config.solver);
    }

    /// Sets the error reduction of the velocity and split-impulse passes
    pub fn set_erp(&mut self, velocity: f32, position: f32) {
        self.config.solver.erp_velocity = velocity;
        self.config.solver.erp_position = position;
        self.solver.set_config(self.config.solver);
    }

    pub fn set_shock_propagation(&mut self, enabled: bool) {
        self.config.solver.enable_shock_propagation = enabled;
        self.solver.set_config(self.config.solver);
    }

    pub fn set_solver_config(&mut self, config: SolverConfig) {
        self.config.solver = config;
        self.solver.set_config(config);
    }

    /// Advances the simulation by `dt` seconds.
    #[instrument(level = "trace", skip(self))]
    pub fn update(&mut self, dt: f32) -> Result<()> {
        if !(dt > EPSILON) {
            return Err(PhysicsError::InvalidTimeStep { dt, min: EPSILON });
        }

        self.integrate_and_sleep(dt);

        let solver = self.config.solver;
        self.contacts.set_parameters(solver.erp_velocity, solver.erp_position, solver.slop);
        self.contacts.begin_step(self.bodies.len());
        self.detect_contacts(1.0 / dt);

        self.solver.solve(self.contacts.manifolds_mut(), &mut self.bodies);
        self.solver.solve_shock_propagation(self.contacts.manifolds_mut(), &mut self.bodies);

        for _ in 0..self.config.collision_group_iterations {
            self.contacts.merge_groups(&mut self.bodies);
        }

        let (used, unused) = self.contacts.contact_stats();
        debug!(
            bodies = self.bodies.len(),
            manifolds = self.contacts.manifold_count(),
            awake = self.awake_bodies(),
            used,
            unused,
            "step"
        );
        Ok(())
    }

    /// Sleep bookkeeping, then integration of the bodies still awake.
    fn integrate_and_sleep(&mut self, dt: f32) {
        let config = &self.config;
        for body in self.bodies.iter_mut().filter(|b| b.is_enabled() && b.is_dynamic()) {
            body.track_stillness(config.sleep_velocity, config.sleep_angular_velocity);
        }
        for body in self.bodies.iter_mut().filter(|b| b.is_enabled() && b.is_dynamic()) {
            if body.settle_sleep_state(config.sleep_time) {
                integrate_body(body, dt, config.gravity, config.damping);
            }
        }
    }

    /// Runs the narrow phase on every body pair with an awake dynamic body
    /// and stores the resulting manifolds.
    fn detect_contacts(&mut self, inv_dt: f32) {
        let count = self.bodies.len();
        for i in 0..count {
            for j in (i + 1)..count {
                let (a, b) = (&self.bodies[i], &self.bodies[j]);
                if !a.is_enabled() || !b.is_enabled() || !(is_awake(a) || is_awake(b)) {
                    continue;
                }

                let patches = &mut self.patches;
                BoundsTree::collide(a.bounds_tree(), b.bounds_tree(), |sa, sb| {
                    if let Some(patch) = collide(&a.shapes()[sa], &b.shapes()[sb]) {
                        patches.push(patch.with_shapes(sa, sb));
                    }
                });

                for patch in self.patches.drain(..) {
                    self.contacts.add_patch(&mut self.bodies, i, j, patch, inv_dt);
                }
            }
        }
    }
}

fn is_awake(body: &Body) -> bool {
    body.is_enabled() && body.is_dynamic() && body.non_sleeping()
}
