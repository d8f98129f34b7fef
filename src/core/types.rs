use serde::Serialize;

/// Statutory yearly maximum for 3a contributions (employees affiliated to a
/// 2nd pillar fund, 2024).
pub const PILLAR_3A_ANNUAL_CAP: f64 = 7_056.0;

/// Haircut applied to the straight-line income estimate.
pub const SAFETY_FACTOR: f64 = 0.85;

/// Marginal rate used for the tax-saving illustration. Not a tax computation.
pub const ILLUSTRATIVE_TAX_RATE: f64 = 0.25;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationInput {
    pub current_age: u32,
    pub retirement_age: u32,
    pub life_expectancy: u32,
    pub start_year: i32,
    pub annual_income: f64,
    pub current_savings_a: f64,
    pub current_savings_b: f64,
    pub monthly_contribution_a: f64,
    pub monthly_contribution_b: f64,
    pub expected_return_a: f64,
    pub expected_return_b: f64,
    pub inflation_rate: f64,
    pub target_monthly_income: f64,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "phase", rename_all = "lowercase")]
pub enum YearFigures {
    #[serde(rename_all = "camelCase")]
    Accumulation {
        balance_a: f64,
        balance_b: f64,
        total_capital: f64,
    },
    #[serde(rename_all = "camelCase")]
    Decumulation {
        withdrawal: f64,
        remaining_capital_real: f64,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionYear {
    pub age: u32,
    pub calendar_year: i32,
    #[serde(flatten)]
    pub figures: YearFigures,
}

impl ProjectionYear {
    pub fn is_accumulation(&self) -> bool {
        matches!(self.figures, YearFigures::Accumulation { .. })
    }

    /// Total capital for accumulation years, `None` once withdrawals start.
    pub fn total_capital(&self) -> Option<f64> {
        match self.figures {
            YearFigures::Accumulation { total_capital, .. } => Some(total_capital),
            YearFigures::Decumulation { .. } => None,
        }
    }

    pub fn remaining_capital_real(&self) -> Option<f64> {
        match self.figures {
            YearFigures::Accumulation { .. } => None,
            YearFigures::Decumulation {
                remaining_capital_real,
                ..
            } => Some(remaining_capital_real),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionSummary {
    pub capital_at_retirement: f64,
    pub estimated_monthly_income: f64,
    pub income_gap: f64,
    pub annual_tax_saving: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Projection {
    pub summary: ProjectionSummary,
    pub years: Vec<ProjectionYear>,
}
