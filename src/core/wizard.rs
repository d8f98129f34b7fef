//! Step wizard that collects a [`SimulationInput`].
//!
//! The wizard is a fixed sequence of steps. Moving forward validates the
//! fields owned by the current step; moving back never validates. Both
//! directions clamp at the ends of the sequence, and the collected
//! [`WizardData`] survives every move.
//!
//! ```text
//! PersonalInfo -> IncomeSavings -> RetirementGoals -> ProjectionParams -> Results
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::engine::project;
use super::types::{PILLAR_3A_ANNUAL_CAP, Projection, SimulationInput};

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WizardStep {
    #[default]
    PersonalInfo,
    IncomeSavings,
    RetirementGoals,
    ProjectionParams,
    Results,
}

impl WizardStep {
    pub const ALL: [Self; 5] = [
        Self::PersonalInfo,
        Self::IncomeSavings,
        Self::RetirementGoals,
        Self::ProjectionParams,
        Self::Results,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn title(self) -> &'static str {
        match self {
            Self::PersonalInfo => "Informations personnelles",
            Self::IncomeSavings => "Revenus et épargne",
            Self::RetirementGoals => "Objectifs de retraite",
            Self::ProjectionParams => "Paramètres de projection",
            Self::Results => "Résultats",
        }
    }

    pub const fn next(self) -> Option<Self> {
        match self {
            Self::PersonalInfo => Some(Self::IncomeSavings),
            Self::IncomeSavings => Some(Self::RetirementGoals),
            Self::RetirementGoals => Some(Self::ProjectionParams),
            Self::ProjectionParams => Some(Self::Results),
            Self::Results => None,
        }
    }

    pub const fn previous(self) -> Option<Self> {
        match self {
            Self::PersonalInfo => None,
            Self::IncomeSavings => Some(Self::PersonalInfo),
            Self::RetirementGoals => Some(Self::IncomeSavings),
            Self::ProjectionParams => Some(Self::RetirementGoals),
            Self::Results => Some(Self::ProjectionParams),
        }
    }

    /// Position along the progress bar, 0 for the first step and 100 for the last.
    pub fn progress_percent(self) -> f64 {
        self.index() as f64 / (Self::ALL.len() - 1) as f64 * 100.0
    }
}

impl fmt::Display for WizardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title())
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

/// Retirement lifestyle, expressed as a share of the current gross income.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifestyle {
    Basic,
    Moderate,
    Comfortable,
    Luxury,
}

impl Lifestyle {
    pub const ALL: [Self; 4] = [Self::Basic, Self::Moderate, Self::Comfortable, Self::Luxury];

    pub const fn income_share(self) -> f64 {
        match self {
            Self::Basic => 0.5,
            Self::Moderate => 0.7,
            Self::Comfortable => 0.85,
            Self::Luxury => 1.0,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Basic => "Basique",
            Self::Moderate => "Modéré",
            Self::Comfortable => "Confortable",
            Self::Luxury => "Luxueux",
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::Basic => "Couvre les besoins essentiels sans extra",
            Self::Moderate => "Mode de vie confortable avec quelques loisirs",
            Self::Comfortable => "Confort complet avec voyages et activités régulières",
            Self::Luxury => "Style de vie privilégié sans restrictions financières",
        }
    }

    pub fn monthly_target(self, annual_income: f64) -> f64 {
        annual_income * self.income_share() / 12.0
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvestmentProfile {
    Conservative,
    Balanced,
    Dynamic,
}

impl InvestmentProfile {
    pub const ALL: [Self; 3] = [Self::Conservative, Self::Balanced, Self::Dynamic];

    /// Expected annual return in percent.
    pub const fn expected_return(self) -> f64 {
        match self {
            Self::Conservative => 2.0,
            Self::Balanced => 3.5,
            Self::Dynamic => 5.0,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Conservative => "Conservateur",
            Self::Balanced => "Équilibré",
            Self::Dynamic => "Dynamique",
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::Conservative => {
                "Privilégie la sécurité avec des rendements stables mais modérés"
            }
            Self::Balanced => "Balance entre sécurité et performance",
            Self::Dynamic => "Vise des rendements plus élevés avec plus de risques",
        }
    }
}

/// Everything the wizard has collected so far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WizardData {
    pub age: u32,
    pub retirement_age: u32,
    pub life_expectancy: u32,
    pub gender: Gender,

    pub annual_income: f64,
    pub current_savings_a: f64,
    pub current_savings_b: f64,
    pub monthly_contribution_a: f64,
    pub monthly_contribution_b: f64,

    pub lifestyle: Lifestyle,
    pub target_monthly_income: f64,

    pub investment_profile: InvestmentProfile,
    pub expected_return_a: f64,
    pub expected_return_b: f64,
    pub inflation_rate: f64,
}

impl Default for WizardData {
    fn default() -> Self {
        Self {
            age: 30,
            retirement_age: 65,
            life_expectancy: 85,
            gender: Gender::Male,
            annual_income: 80_000.0,
            current_savings_a: 10_000.0,
            current_savings_b: 5_000.0,
            monthly_contribution_a: 500.0,
            monthly_contribution_b: 250.0,
            lifestyle: Lifestyle::Moderate,
            target_monthly_income: 5_000.0,
            investment_profile: InvestmentProfile::Balanced,
            expected_return_a: 2.5,
            expected_return_b: 4.0,
            inflation_rate: 1.0,
        }
    }
}

impl WizardData {
    /// Selects a lifestyle and resets the target income to its share of income.
    pub fn with_lifestyle(mut self, lifestyle: Lifestyle) -> Self {
        self.lifestyle = lifestyle;
        self.target_monthly_income = lifestyle.monthly_target(self.annual_income);
        self
    }

    /// Selects a profile and applies its return to both accounts.
    pub fn with_investment_profile(mut self, profile: InvestmentProfile) -> Self {
        self.investment_profile = profile;
        self.expected_return_a = profile.expected_return();
        self.expected_return_b = profile.expected_return();
        self
    }

    pub fn recommended_monthly_income(&self) -> f64 {
        Lifestyle::Moderate.monthly_target(self.annual_income)
    }

    pub fn to_input(&self, start_year: i32) -> SimulationInput {
        SimulationInput {
            current_age: self.age,
            retirement_age: self.retirement_age,
            life_expectancy: self.life_expectancy,
            start_year,
            annual_income: self.annual_income,
            current_savings_a: self.current_savings_a,
            current_savings_b: self.current_savings_b,
            monthly_contribution_a: self.monthly_contribution_a,
            monthly_contribution_b: self.monthly_contribution_b,
            expected_return_a: self.expected_return_a,
            expected_return_b: self.expected_return_b,
            inflation_rate: self.inflation_rate,
            target_monthly_income: self.target_monthly_income,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WizardError {
    #[error("{field}: {message}")]
    InvalidField {
        field: &'static str,
        message: String,
    },

    #[error("Results are not available before the last step (current step: {step})")]
    NotAtResults { step: WizardStep },
}

fn invalid(field: &'static str, message: impl Into<String>) -> WizardError {
    WizardError::InvalidField {
        field,
        message: message.into(),
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), WizardError> {
    if !value.is_finite() || value < 0.0 {
        return Err(invalid(field, "Le montant doit être positif ou nul"));
    }
    Ok(())
}

/// Checks the fields collected by `step`. `Results` owns no fields.
pub fn validate_step(step: WizardStep, data: &WizardData) -> Result<(), WizardError> {
    match step {
        WizardStep::PersonalInfo => {
            if data.age < 18 {
                return Err(invalid("age", "Vous devez avoir au moins 18 ans"));
            }
            if data.age > 70 {
                return Err(invalid("age", "L'âge maximum est de 70 ans"));
            }
            if data.retirement_age < 58 {
                return Err(invalid(
                    "retirementAge",
                    "L'âge de retraite minimum est de 58 ans",
                ));
            }
            if data.retirement_age > 75 {
                return Err(invalid(
                    "retirementAge",
                    "L'âge de retraite maximum est de 75 ans",
                ));
            }
            if data.retirement_age <= data.age {
                return Err(invalid(
                    "retirementAge",
                    "L'âge de retraite doit être supérieur à l'âge actuel",
                ));
            }
            if data.life_expectancy <= data.retirement_age {
                return Err(invalid(
                    "lifeExpectancy",
                    "L'espérance de vie doit être supérieure à l'âge de retraite",
                ));
            }
            if data.life_expectancy > 110 {
                return Err(invalid(
                    "lifeExpectancy",
                    "L'espérance de vie maximum est de 110 ans",
                ));
            }
        }
        WizardStep::IncomeSavings => {
            non_negative("annualIncome", data.annual_income)?;
            non_negative("currentSavingsA", data.current_savings_a)?;
            non_negative("currentSavingsB", data.current_savings_b)?;
            non_negative("monthlyContributionA", data.monthly_contribution_a)?;
            non_negative("monthlyContributionB", data.monthly_contribution_b)?;
            if data.monthly_contribution_a * 12.0 > PILLAR_3A_ANNUAL_CAP {
                return Err(invalid(
                    "monthlyContributionA",
                    "Le montant maximum déductible pour le pilier 3a est de CHF 7'056 par an",
                ));
            }
        }
        WizardStep::RetirementGoals => {
            let target = data.target_monthly_income;
            if !target.is_finite() || target < 1_000.0 {
                return Err(invalid(
                    "targetMonthlyIncome",
                    "Le revenu mensuel visé doit être d'au moins 1'000 CHF",
                ));
            }
            if target > 50_000.0 {
                return Err(invalid(
                    "targetMonthlyIncome",
                    "Le revenu mensuel visé ne peut pas dépasser 50'000 CHF",
                ));
            }
        }
        WizardStep::ProjectionParams => {
            for (field, rate) in [
                ("expectedReturnA", data.expected_return_a),
                ("expectedReturnB", data.expected_return_b),
            ] {
                if !rate.is_finite() || rate <= -100.0 || rate >= 100.0 {
                    return Err(invalid(
                        field,
                        "Le rendement doit être compris entre -100 % et 100 %",
                    ));
                }
            }
            if !(-10.0..=20.0).contains(&data.inflation_rate) {
                return Err(invalid(
                    "inflationRate",
                    "L'inflation doit être comprise entre -10 % et 20 %",
                ));
            }
        }
        WizardStep::Results => {}
    }
    Ok(())
}

#[derive(Debug, Clone, Default)]
pub struct Wizard {
    step: WizardStep,
    data: WizardData,
}

impl Wizard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resumes at `step` with previously collected data. Every step before
    /// `step` must accept `data`, so a caller cannot skip validation by
    /// starting further along.
    pub fn resume(step: WizardStep, data: WizardData) -> Result<Self, WizardError> {
        for earlier in &WizardStep::ALL[..step.index()] {
            validate_step(*earlier, &data)?;
        }
        Ok(Self { step, data })
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn data(&self) -> &WizardData {
        &self.data
    }

    pub fn into_data(self) -> WizardData {
        self.data
    }

    /// Validates the current step and moves forward. Stays on `Results`.
    pub fn next(&mut self) -> Result<WizardStep, WizardError> {
        validate_step(self.step, &self.data)?;
        if let Some(next) = self.step.next() {
            self.step = next;
        }
        Ok(self.step)
    }

    /// Moves backward without validating. Stays on the first step.
    pub fn back(&mut self) -> WizardStep {
        if let Some(previous) = self.step.previous() {
            self.step = previous;
        }
        self.step
    }

    pub fn results(&self, start_year: i32) -> Result<Projection, WizardError> {
        if self.step != WizardStep::Results {
            return Err(WizardError::NotAtResults { step: self.step });
        }
        Ok(project(&self.data.to_input(start_year)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn field_of(err: WizardError) -> &'static str {
        match err {
            WizardError::InvalidField { field, .. } => field,
            other => panic!("expected a field error, got {other:?}"),
        }
    }

    #[test]
    fn default_data_walks_through_every_step() {
        let mut wizard = Wizard::new();
        let mut visited = vec![wizard.step()];
        while wizard.step() != WizardStep::Results {
            visited.push(wizard.next().expect("defaults are valid"));
        }
        assert_eq!(visited, WizardStep::ALL.to_vec());
    }

    #[test]
    fn next_and_back_clamp_at_the_ends() {
        let mut wizard = Wizard::new();
        assert_eq!(wizard.back(), WizardStep::PersonalInfo);

        let mut wizard =
            Wizard::resume(WizardStep::Results, WizardData::default()).expect("defaults are valid");
        assert_eq!(wizard.next(), Ok(WizardStep::Results));
        assert_eq!(wizard.back(), WizardStep::ProjectionParams);
    }

    #[test]
    fn invalid_field_blocks_forward_but_not_back() {
        let mut data = WizardData::default();
        data.target_monthly_income = 500.0;
        let mut wizard =
            Wizard::resume(WizardStep::RetirementGoals, data).expect("earlier steps are valid");

        let err = wizard.next().expect_err("target below minimum");
        assert_eq!(field_of(err), "targetMonthlyIncome");
        assert_eq!(wizard.step(), WizardStep::RetirementGoals);
        assert_eq!(wizard.back(), WizardStep::IncomeSavings);
        assert_approx(wizard.data().target_monthly_income, 500.0);
    }

    #[test]
    fn personal_info_enforces_age_ranges_and_ordering() {
        let cases: [(u32, u32, u32, &str); 6] = [
            (17, 65, 85, "age"),
            (71, 75, 85, "age"),
            (30, 57, 85, "retirementAge"),
            (30, 76, 85, "retirementAge"),
            (66, 62, 85, "retirementAge"),
            (30, 65, 65, "lifeExpectancy"),
        ];
        for (age, retirement_age, life_expectancy, field) in cases {
            let data = WizardData {
                age,
                retirement_age,
                life_expectancy,
                ..WizardData::default()
            };
            let err = validate_step(WizardStep::PersonalInfo, &data).expect_err("must reject");
            assert_eq!(field_of(err), field, "case ({age}, {retirement_age})");
        }
    }

    #[test]
    fn income_step_rejects_contribution_above_3a_cap() {
        let mut data = WizardData::default();
        data.monthly_contribution_a = 588.0;
        assert!(validate_step(WizardStep::IncomeSavings, &data).is_ok());

        data.monthly_contribution_a = 589.0;
        let err = validate_step(WizardStep::IncomeSavings, &data).expect_err("above cap");
        assert_eq!(field_of(err), "monthlyContributionA");
    }

    #[test]
    fn income_step_rejects_negative_amounts() {
        let mut data = WizardData::default();
        data.current_savings_b = -1.0;
        let err = validate_step(WizardStep::IncomeSavings, &data).expect_err("negative");
        assert_eq!(field_of(err), "currentSavingsB");
    }

    #[test]
    fn projection_params_reject_out_of_range_rates() {
        let mut data = WizardData::default();
        data.expected_return_b = -100.0;
        let err = validate_step(WizardStep::ProjectionParams, &data).expect_err("rate");
        assert_eq!(field_of(err), "expectedReturnB");

        let mut data = WizardData::default();
        data.inflation_rate = 25.0;
        let err = validate_step(WizardStep::ProjectionParams, &data).expect_err("inflation");
        assert_eq!(field_of(err), "inflationRate");
    }

    #[test]
    fn lifestyle_sets_target_from_income_share() {
        let data = WizardData::default();
        assert_approx(data.recommended_monthly_income(), 80_000.0 * 0.7 / 12.0);

        let basic = data.clone().with_lifestyle(Lifestyle::Basic);
        assert_eq!(basic.lifestyle, Lifestyle::Basic);
        assert_approx(basic.target_monthly_income, 80_000.0 * 0.5 / 12.0);

        let luxury = data.with_lifestyle(Lifestyle::Luxury);
        assert_approx(luxury.target_monthly_income, 80_000.0 / 12.0);
    }

    #[test]
    fn investment_profile_sets_both_returns() {
        let data = WizardData::default().with_investment_profile(InvestmentProfile::Dynamic);
        assert_approx(data.expected_return_a, 5.0);
        assert_approx(data.expected_return_b, 5.0);
        assert_eq!(data.investment_profile, InvestmentProfile::Dynamic);
    }

    #[test]
    fn results_require_last_step() {
        let wizard = Wizard::new();
        assert_eq!(
            wizard.results(2025),
            Err(WizardError::NotAtResults {
                step: WizardStep::PersonalInfo
            })
        );

        let wizard =
            Wizard::resume(WizardStep::Results, WizardData::default()).expect("defaults are valid");
        let projection = wizard.results(2025).expect("results step");
        assert_eq!(projection.years.len(), 56);
        assert_eq!(projection.years[0].calendar_year, 2025);
    }

    #[test]
    fn progress_runs_from_zero_to_hundred() {
        assert_approx(WizardStep::PersonalInfo.progress_percent(), 0.0);
        assert_approx(WizardStep::RetirementGoals.progress_percent(), 50.0);
        assert_approx(WizardStep::Results.progress_percent(), 100.0);
    }

    #[test]
    fn wizard_data_parses_partial_camel_case_json() {
        let data: WizardData = serde_json::from_str(
            r#"{"age": 40, "gender": "female", "lifestyle": "luxury", "investmentProfile": "dynamic"}"#,
        )
        .expect("partial data should parse");
        assert_eq!(data.age, 40);
        assert_eq!(data.gender, Gender::Female);
        assert_eq!(data.lifestyle, Lifestyle::Luxury);
        assert_eq!(data.investment_profile, InvestmentProfile::Dynamic);
        assert_eq!(data.retirement_age, 65);
    }

    #[test]
    fn resume_validates_every_earlier_step() {
        let data = WizardData {
            age: 80,
            retirement_age: 20,
            life_expectancy: 10,
            target_monthly_income: -5.0,
            ..WizardData::default()
        };
        let err = Wizard::resume(WizardStep::Results, data.clone()).expect_err("skipped checks");
        assert_eq!(field_of(err), "age");

        // The step being resumed is only checked on the next forward move.
        assert!(Wizard::resume(WizardStep::PersonalInfo, data).is_ok());

        let mut data = WizardData::default();
        data.target_monthly_income = 500.0;
        let err = Wizard::resume(WizardStep::ProjectionParams, data).expect_err("target");
        assert_eq!(field_of(err), "targetMonthlyIncome");
    }

    #[test]
    fn step_ids_are_kebab_case() {
        let ids: Vec<String> = WizardStep::ALL
            .iter()
            .map(|step| serde_json::to_string(step).expect("serialize"))
            .collect();
        assert_eq!(
            ids,
            [
                "\"personal-info\"",
                "\"income-savings\"",
                "\"retirement-goals\"",
                "\"projection-params\"",
                "\"results\"",
            ]
        );
    }
}
