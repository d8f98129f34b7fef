use super::types::{
    ILLUSTRATIVE_TAX_RATE, PILLAR_3A_ANNUAL_CAP, Projection, ProjectionSummary, ProjectionYear,
    SAFETY_FACTOR, SimulationInput, YearFigures,
};

#[derive(Debug, Clone, Copy)]
struct Balances {
    a: f64,
    b: f64,
}

impl Balances {
    fn total(self) -> f64 {
        self.a + self.b
    }
}

pub fn project(input: &SimulationInput) -> Projection {
    let years = run_projection(input);
    let summary = summarize(&years, input);
    Projection { summary, years }
}

/// Builds the full year series: accumulation records from `current_age` up to
/// and including `retirement_age`, then one decumulation record per year until
/// `life_expectancy`.
pub fn run_projection(input: &SimulationInput) -> Vec<ProjectionYear> {
    let accumulation_years = input.retirement_age.saturating_sub(input.current_age);
    let boundary_age = input.current_age + accumulation_years;
    let retirement_years = input.life_expectancy.saturating_sub(boundary_age);
    let record_count = (accumulation_years as usize)
        .saturating_add(retirement_years as usize)
        .saturating_add(1);
    let mut years = Vec::with_capacity(record_count);

    let mut balances = Balances {
        a: input.current_savings_a,
        b: input.current_savings_b,
    };
    years.push(accumulation_record(input, 0, balances));
    for y in 1..=accumulation_years {
        balances = apply_contributions(input, balances);
        balances = apply_accumulation_growth(input, balances);
        years.push(accumulation_record(input, y, balances));
    }

    let withdrawal = annual_withdrawal(input);
    let growth = 1.0 + average_return(input) / 100.0;
    let inflation = 1.0 + input.inflation_rate / 100.0;

    let mut capital = balances.total();
    let mut price_index = 1.0;
    for y in 1..=retirement_years {
        // Nominal capital is carried unfloored; only the reported figure is clamped.
        capital = (capital - withdrawal) * growth;
        price_index *= inflation;
        years.push(ProjectionYear {
            age: boundary_age + y,
            calendar_year: calendar_year(input, accumulation_years + y),
            figures: YearFigures::Decumulation {
                withdrawal,
                remaining_capital_real: real_terms(capital, price_index),
            },
        });
    }

    years
}

pub fn summarize(years: &[ProjectionYear], input: &SimulationInput) -> ProjectionSummary {
    let capital_at_retirement = years
        .iter()
        .rev()
        .find_map(ProjectionYear::total_capital)
        .unwrap_or_else(|| input.current_savings_a + input.current_savings_b);

    let estimated_monthly_income = sustainable_monthly_income(
        capital_at_retirement,
        input.life_expectancy.saturating_sub(input.retirement_age),
    );

    ProjectionSummary {
        capital_at_retirement,
        estimated_monthly_income,
        income_gap: input.target_monthly_income - estimated_monthly_income,
        annual_tax_saving: deductible_annual_contribution(input) * ILLUSTRATIVE_TAX_RATE,
    }
}

/// Straight-line depletion over the retirement horizon, with the safety
/// haircut. Zero when there is no horizon to spread the capital over.
pub fn sustainable_monthly_income(capital: f64, retirement_years: u32) -> f64 {
    if retirement_years == 0 {
        return 0.0;
    }
    let months = f64::from(retirement_years) * 12.0;
    capital / months * SAFETY_FACTOR
}

/// Only 3a contributions are deductible, and only up to the statutory cap.
pub fn deductible_annual_contribution(input: &SimulationInput) -> f64 {
    (input.monthly_contribution_a * 12.0).min(PILLAR_3A_ANNUAL_CAP)
}

fn accumulation_record(input: &SimulationInput, offset: u32, balances: Balances) -> ProjectionYear {
    ProjectionYear {
        age: input.current_age + offset,
        calendar_year: calendar_year(input, offset),
        figures: YearFigures::Accumulation {
            balance_a: balances.a,
            balance_b: balances.b,
            total_capital: balances.total(),
        },
    }
}

fn apply_contributions(input: &SimulationInput, balances: Balances) -> Balances {
    Balances {
        a: balances.a + input.monthly_contribution_a * 12.0,
        b: balances.b + input.monthly_contribution_b * 12.0,
    }
}

fn apply_accumulation_growth(input: &SimulationInput, balances: Balances) -> Balances {
    Balances {
        a: balances.a * (1.0 + input.expected_return_a / 100.0),
        b: balances.b * (1.0 + input.expected_return_b / 100.0),
    }
}

fn annual_withdrawal(input: &SimulationInput) -> f64 {
    input.target_monthly_income * 12.0
}

fn average_return(input: &SimulationInput) -> f64 {
    (input.expected_return_a + input.expected_return_b) / 2.0
}

fn real_terms(nominal: f64, price_index: f64) -> f64 {
    let real = nominal / price_index;
    // NaN (e.g. a -100% inflation rate) also reports as zero.
    if real > 0.0 { real } else { 0.0 }
}

/// Saturates at `i32::MAX` instead of wrapping.
fn calendar_year(input: &SimulationInput, offset: u32) -> i32 {
    let offset = i32::try_from(offset).unwrap_or(i32::MAX);
    input.start_year.saturating_add(offset)
}
