mod engine;
pub mod format;
mod types;
pub mod wizard;

pub use engine::{
    deductible_annual_contribution, project, run_projection, summarize,
    sustainable_monthly_income,
};
pub use types::{
    ILLUSTRATIVE_TAX_RATE, PILLAR_3A_ANNUAL_CAP, Projection, ProjectionSummary, ProjectionYear,
    SAFETY_FACTOR, SimulationInput, YearFigures,
};
