use thiserror::Error;

#[derive(Error, Debug)]
pub enum CryoError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error(
        "{property} of material '{material}' queried at T={temperature} K, \
         outside its valid range [{t_min}, {t_max}] K"
    )]
    OutOfRange {
        material: String,
        property: &'static str,
        temperature: f64,
        t_min: f64,
        t_max: f64,
    },

    #[error("Solver did not converge after {iterations} iterations (residual {residual:e})")]
    Convergence { iterations: usize, residual: f64 },

    #[error("Critical surface exceeded at B={field} T, T={temperature} K (Jc <= 0)")]
    CriticalSurfaceExceeded { field: f64, temperature: f64 },

    #[error(
        "Linear solve failed after {iterations} iterations (residual {residual:e}); \
         system may be near-singular"
    )]
    SolverNumerical { iterations: usize, residual: f64 },

    #[error("Solve cancelled at step {step}")]
    Cancelled { step: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CryoError {
    /// True for failures detected before any numerical work began.
    pub fn is_validation(&self) -> bool {
        matches!(self, CryoError::Validation(_))
    }
}

pub type CryoResult<T> = Result<T, CryoError>;
