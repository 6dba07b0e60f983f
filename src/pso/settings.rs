use crate::error::ConfigurationError;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Velocity update rule
///
/// Both rules move particle velocity towards its personal best and its neighbourhood best:
/// `v = omega * v + c_p * r_p * (p - x) + c_g * r_g * (g - x)` with `r_p, r_g ~ U[0, 1)`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[non_exhaustive]
pub enum UpdateRule {
    /// Clerc-Kennedy constriction: `v = kappa * (v + phi_p r_p (p - x) + phi_g r_g (g - x))`
    /// with `kappa = 2 / |2 - phi - sqrt(phi^2 - 4 phi)|`, `phi = phi_p + phi_g > 4`
    Constriction { phi_p: f64, phi_g: f64 },
    /// Inertia weight form with explicit coefficients
    Inertia { omega: f64, c1: f64, c2: f64 },
}

impl UpdateRule {
    #[inline]
    pub fn default_phi_p() -> f64 {
        2.8
    }

    #[inline]
    pub fn default_phi_g() -> f64 {
        1.3
    }

    fn validate(&self) -> Result<(), ConfigurationError> {
        match *self {
            Self::Constriction { phi_p, phi_g } => {
                if !(phi_p.is_finite() && phi_g.is_finite() && phi_p >= 0.0 && phi_g >= 0.0) {
                    return Err(ConfigurationError::Optimizer(
                        "constriction coefficients must be finite and non-negative",
                    ));
                }
                if phi_p + phi_g <= 4.0 {
                    return Err(ConfigurationError::Optimizer(
                        "constriction requires phi_p + phi_g > 4",
                    ));
                }
            }
            Self::Inertia { omega, c1, c2 } => {
                if ![omega, c1, c2].iter().all(|x| x.is_finite() && *x >= 0.0) {
                    return Err(ConfigurationError::Optimizer(
                        "inertia coefficients must be finite and non-negative",
                    ));
                }
            }
        }
        Ok(())
    }

    /// `(omega, c_p, c_g)` of the equivalent inertia form
    pub fn coefficients(&self) -> (f64, f64, f64) {
        match *self {
            Self::Constriction { phi_p, phi_g } => {
                let phi = phi_p + phi_g;
                let kappa = 2.0 / (2.0 - phi - (phi * phi - 4.0 * phi).sqrt()).abs();
                (kappa, kappa * phi_p, kappa * phi_g)
            }
            Self::Inertia { omega, c1, c2 } => (omega, c1, c2),
        }
    }
}

impl Default for UpdateRule {
    fn default() -> Self {
        Self::Constriction {
            phi_p: Self::default_phi_p(),
            phi_g: Self::default_phi_g(),
        }
    }
}

/// Which best position a particle is attracted to, besides its own
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Topology {
    /// Best personal best of the whole swarm
    #[default]
    GlobalBest,
    /// Best personal best among particles `i - neighbours ..= i + neighbours` (cyclic)
    Ring { neighbours: usize },
}

/// Where the swarm of each restart is centred
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum RestartCentre {
    /// Every restart samples around the caller's seed
    #[default]
    Seed,
    /// Restarts after the first sample around the best position found so far
    RunningBest,
}

/// Particle-swarm optimizer settings
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct PsoSettings {
    pub swarm_size: usize,
    pub max_iterations: usize,
    /// Stop a restart when the norm of the swarm's per-coefficient extent drops below this
    pub delta_coeff_termination: f64,
    /// Improvements of the best fitness below this count as stalled generations
    pub fitness_tolerance: f64,
    /// Stop a restart after this many stalled generations in a row
    pub stall_generations: usize,
    pub restarts: usize,
    pub update_rule: UpdateRule,
    pub topology: Topology,
    pub restart_centre: RestartCentre,
    pub seed: u64,
}

impl PsoSettings {
    /// Create new [PsoSettings] with default update rule, topology and termination
    ///
    /// # Arguments
    /// - `swarm_size`: number of particles, positive
    /// - `max_iterations`: generation limit of every restart, positive
    /// - `restarts`: number of independent swarms, positive
    /// - `seed`: random generator seed
    pub fn new(
        swarm_size: usize,
        max_iterations: usize,
        restarts: usize,
        seed: u64,
    ) -> Result<Self, ConfigurationError> {
        let settings = Self {
            swarm_size,
            max_iterations,
            restarts,
            seed,
            ..Self::default()
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.swarm_size == 0 {
            return Err(ConfigurationError::Optimizer("swarm size must be positive"));
        }
        if self.max_iterations == 0 {
            return Err(ConfigurationError::Optimizer("max iterations must be positive"));
        }
        if self.restarts == 0 {
            return Err(ConfigurationError::Optimizer("restart count must be positive"));
        }
        if self.stall_generations == 0 {
            return Err(ConfigurationError::Optimizer("stall generations must be positive"));
        }
        for value in [self.delta_coeff_termination, self.fitness_tolerance] {
            if !(value >= 0.0 && value.is_finite()) {
                return Err(ConfigurationError::Optimizer(
                    "termination tolerances must be finite and non-negative",
                ));
            }
        }
        if let Topology::Ring { neighbours: 0 } = self.topology {
            return Err(ConfigurationError::Optimizer("ring topology needs at least one neighbour"));
        }
        self.update_rule.validate()
    }

    #[inline]
    pub fn default_swarm_size() -> usize {
        64
    }

    #[inline]
    pub fn default_max_iterations() -> usize {
        300
    }

    #[inline]
    pub fn default_delta_coeff_termination() -> f64 {
        1e-3
    }

    #[inline]
    pub fn default_fitness_tolerance() -> f64 {
        1e-7
    }

    #[inline]
    pub fn default_stall_generations() -> usize {
        50
    }

    #[inline]
    pub fn default_restarts() -> usize {
        1
    }

    #[inline]
    pub fn default_seed() -> u64 {
        0
    }
}

impl Default for PsoSettings {
    fn default() -> Self {
        Self {
            swarm_size: Self::default_swarm_size(),
            max_iterations: Self::default_max_iterations(),
            delta_coeff_termination: Self::default_delta_coeff_termination(),
            fitness_tolerance: Self::default_fitness_tolerance(),
            stall_generations: Self::default_stall_generations(),
            restarts: Self::default_restarts(),
            update_rule: UpdateRule::default(),
            topology: Topology::default(),
            restart_centre: RestartCentre::default(),
            seed: Self::default_seed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    #[test]
    fn default_is_valid() {
        PsoSettings::default().validate().unwrap();
    }

    #[test]
    fn constriction_factor() {
        let (kappa, c_p, c_g) = UpdateRule::default().coefficients();
        assert_relative_eq!(kappa, 0.729843788, epsilon = 1e-8);
        assert_relative_eq!(c_p, kappa * 2.8);
        assert_relative_eq!(c_g, kappa * 1.3);
    }

    #[test]
    fn invalid_settings_are_rejected() {
        assert!(PsoSettings::new(0, 10, 1, 0).is_err());
        assert!(PsoSettings::new(10, 0, 1, 0).is_err());
        assert!(PsoSettings::new(10, 10, 0, 0).is_err());
        let mut settings = PsoSettings::default();
        settings.update_rule = UpdateRule::Constriction { phi_p: 2.0, phi_g: 2.0 };
        assert!(settings.validate().is_err());
        settings.update_rule = UpdateRule::Inertia {
            omega: f64::NAN,
            c1: 1.0,
            c2: 1.0,
        };
        assert!(settings.validate().is_err());
        let settings = PsoSettings {
            topology: Topology::Ring { neighbours: 0 },
            ..PsoSettings::default()
        };
        assert!(settings.validate().is_err());
        let settings = PsoSettings {
            delta_coeff_termination: -1.0,
            ..PsoSettings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn serde_round_trip() {
        let settings = PsoSettings {
            topology: Topology::Ring { neighbours: 2 },
            update_rule: UpdateRule::Inertia {
                omega: 0.7,
                c1: 1.5,
                c2: 1.5,
            },
            restart_centre: RestartCentre::RunningBest,
            ..PsoSettings::default()
        };
        let json = serde_json::to_string(&settings).unwrap();
        let back: PsoSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(settings, back);
    }
}
