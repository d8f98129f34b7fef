use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use chrono::Datelike;
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::net::SocketAddr;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::core::format::{format_chf, format_percent};
use crate::core::wizard::{InvestmentProfile, Lifestyle, Wizard, WizardData, WizardError, WizardStep};
use crate::core::{
    PILLAR_3A_ANNUAL_CAP, Projection, ProjectionSummary, ProjectionYear, SimulationInput,
    YearFigures, project,
};

const INDEX_HTML: &str = include_str!("../../web/index.html");
const STYLES_CSS: &str = include_str!("../../web/styles.css");
const APP_JS: &str = include_str!("../../web/app.js");

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliLifestyle {
    Basic,
    Moderate,
    Comfortable,
    Luxury,
}

impl From<CliLifestyle> for Lifestyle {
    fn from(value: CliLifestyle) -> Self {
        match value {
            CliLifestyle::Basic => Lifestyle::Basic,
            CliLifestyle::Moderate => Lifestyle::Moderate,
            CliLifestyle::Comfortable => Lifestyle::Comfortable,
            CliLifestyle::Luxury => Lifestyle::Luxury,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliInvestmentProfile {
    Conservative,
    Balanced,
    Dynamic,
}

impl From<CliInvestmentProfile> for InvestmentProfile {
    fn from(value: CliInvestmentProfile) -> Self {
        match value {
            CliInvestmentProfile::Conservative => InvestmentProfile::Conservative,
            CliInvestmentProfile::Balanced => InvestmentProfile::Balanced,
            CliInvestmentProfile::Dynamic => InvestmentProfile::Dynamic,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "pillar3 project",
    about = "Swiss 3rd pillar (3a + 3b) retirement savings projection"
)]
struct Cli {
    #[arg(long, default_value_t = 30)]
    current_age: u32,
    #[arg(long, default_value_t = 65)]
    retirement_age: u32,
    #[arg(long, default_value_t = 85, help = "Age the projection runs to")]
    life_expectancy: u32,
    #[arg(long, help = "Calendar year of the first projected year, defaults to this year")]
    start_year: Option<i32>,
    #[arg(long, default_value_t = 80_000.0, help = "Gross annual income in CHF")]
    annual_income: f64,
    #[arg(long, default_value_t = 10_000.0, help = "Current 3a balance in CHF")]
    savings_a: f64,
    #[arg(long, default_value_t = 5_000.0, help = "Current 3b balance in CHF")]
    savings_b: f64,
    #[arg(long, default_value_t = 500.0, help = "Monthly 3a contribution in CHF")]
    contribution_a: f64,
    #[arg(long, default_value_t = 250.0, help = "Monthly 3b contribution in CHF")]
    contribution_b: f64,
    #[arg(long, default_value_t = 2.5, help = "Expected annual 3a return in percent")]
    return_a: f64,
    #[arg(long, default_value_t = 4.0, help = "Expected annual 3b return in percent")]
    return_b: f64,
    #[arg(
        long,
        default_value_t = 1.0,
        help = "Annual inflation in percent, applied after retirement"
    )]
    inflation_rate: f64,
    #[arg(
        long,
        default_value_t = 5_000.0,
        help = "Desired monthly income in retirement in CHF"
    )]
    target_monthly_income: f64,
    #[arg(
        long,
        value_enum,
        help = "Derive the target income from a lifestyle instead of --target-monthly-income"
    )]
    lifestyle: Option<CliLifestyle>,
    #[arg(
        long,
        value_enum,
        help = "Apply an investment profile's return to both accounts"
    )]
    investment_profile: Option<CliInvestmentProfile>,
    #[arg(long, help = "Print the JSON response instead of a text report")]
    json: bool,
}

const MAX_AGE: u32 = 110;
const START_YEARS: std::ops::RangeInclusive<i32> = 1900..=2200;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum InputError {
    #[error("{flag} must be <= {max}")]
    AgeAboveMaximum { flag: &'static str, max: u32 },
    #[error("--start-year must be between {min} and {max}")]
    StartYearOutOfRange { min: i32, max: i32 },
    #[error("--retirement-age must be >= --current-age")]
    RetirementBeforeCurrentAge,
    #[error("--life-expectancy must be >= --retirement-age")]
    LifeExpectancyBeforeRetirement,
    #[error("{flag} must be a finite amount >= 0")]
    InvalidAmount { flag: &'static str },
    #[error("--contribution-a exceeds the 3a cap of CHF {cap} per year")]
    AboveAnnualCap { cap: f64 },
    #[error("{flag} must be > -100")]
    InvalidRate { flag: &'static str },
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Args(#[from] clap::Error),
    #[error(transparent)]
    Input(#[from] InputError),
    #[error("failed to serialize projection: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SimulatePayload {
    current_age: Option<u32>,
    retirement_age: Option<u32>,
    life_expectancy: Option<u32>,
    start_year: Option<i32>,

    annual_income: Option<f64>,
    current_savings_a: Option<f64>,
    current_savings_b: Option<f64>,
    monthly_contribution_a: Option<f64>,
    monthly_contribution_b: Option<f64>,

    expected_return_a: Option<f64>,
    expected_return_b: Option<f64>,
    inflation_rate: Option<f64>,
    target_monthly_income: Option<f64>,

    lifestyle: Option<Lifestyle>,
    investment_profile: Option<InvestmentProfile>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum WizardAction {
    Next,
    Back,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct WizardPayload {
    step: WizardStep,
    action: Option<WizardAction>,
    data: WizardData,
    select_lifestyle: Option<Lifestyle>,
    select_investment_profile: Option<InvestmentProfile>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SimulateResponse {
    input: SimulationInput,
    summary: ProjectionSummary,
    years: Vec<ProjectionYear>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WizardResponse {
    step: WizardStep,
    title: &'static str,
    progress_percent: f64,
    recommended_monthly_income: f64,
    data: WizardData,
    projection: Option<Projection>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StepPreset {
    id: WizardStep,
    title: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LifestylePreset {
    id: Lifestyle,
    label: &'static str,
    description: &'static str,
    income_share: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProfilePreset {
    id: InvestmentProfile,
    label: &'static str,
    description: &'static str,
    expected_return: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PresetsResponse {
    pillar3a_annual_cap: f64,
    steps: Vec<StepPreset>,
    lifestyles: Vec<LifestylePreset>,
    investment_profiles: Vec<ProfilePreset>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn current_year() -> i32 {
    chrono::Local::now().year()
}

fn check_amount(flag: &'static str, value: f64) -> Result<(), InputError> {
    if !value.is_finite() || value < 0.0 {
        return Err(InputError::InvalidAmount { flag });
    }
    Ok(())
}

fn check_rate(flag: &'static str, value: f64) -> Result<(), InputError> {
    if !value.is_finite() || value <= -100.0 {
        return Err(InputError::InvalidRate { flag });
    }
    Ok(())
}

fn build_inputs(cli: &Cli) -> Result<SimulationInput, InputError> {
    for (flag, age) in [
        ("--current-age", cli.current_age),
        ("--retirement-age", cli.retirement_age),
        ("--life-expectancy", cli.life_expectancy),
    ] {
        if age > MAX_AGE {
            return Err(InputError::AgeAboveMaximum { flag, max: MAX_AGE });
        }
    }

    let start_year = cli.start_year.unwrap_or_else(current_year);
    if !START_YEARS.contains(&start_year) {
        return Err(InputError::StartYearOutOfRange {
            min: *START_YEARS.start(),
            max: *START_YEARS.end(),
        });
    }

    if cli.retirement_age < cli.current_age {
        return Err(InputError::RetirementBeforeCurrentAge);
    }

    if cli.life_expectancy < cli.retirement_age {
        return Err(InputError::LifeExpectancyBeforeRetirement);
    }

    for (flag, value) in [
        ("--annual-income", cli.annual_income),
        ("--savings-a", cli.savings_a),
        ("--savings-b", cli.savings_b),
        ("--contribution-a", cli.contribution_a),
        ("--contribution-b", cli.contribution_b),
        ("--target-monthly-income", cli.target_monthly_income),
    ] {
        check_amount(flag, value)?;
    }

    if cli.contribution_a * 12.0 > PILLAR_3A_ANNUAL_CAP {
        return Err(InputError::AboveAnnualCap {
            cap: PILLAR_3A_ANNUAL_CAP,
        });
    }

    check_rate("--return-a", cli.return_a)?;
    check_rate("--return-b", cli.return_b)?;
    check_rate("--inflation-rate", cli.inflation_rate)?;

    let target_monthly_income = cli
        .lifestyle
        .map(|lifestyle| Lifestyle::from(lifestyle).monthly_target(cli.annual_income))
        .unwrap_or(cli.target_monthly_income);
    let (expected_return_a, expected_return_b) = match cli.investment_profile {
        Some(profile) => {
            let rate = InvestmentProfile::from(profile).expected_return();
            (rate, rate)
        }
        None => (cli.return_a, cli.return_b),
    };

    Ok(SimulationInput {
        current_age: cli.current_age,
        retirement_age: cli.retirement_age,
        life_expectancy: cli.life_expectancy,
        start_year,
        annual_income: cli.annual_income,
        current_savings_a: cli.savings_a,
        current_savings_b: cli.savings_b,
        monthly_contribution_a: cli.contribution_a,
        monthly_contribution_b: cli.contribution_b,
        expected_return_a,
        expected_return_b,
        inflation_rate: cli.inflation_rate,
        target_monthly_income,
    })
}

/// Parses `project` arguments (the first item is the program name) and
/// renders either a text report or the JSON body `/api/simulate` returns.
pub fn run_project_command<I, T>(args: I) -> Result<String, CliError>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = Cli::try_parse_from(args)?;
    let inputs = build_inputs(&cli)?;
    let projection = project(&inputs);
    log::debug!(
        "projected {} years, capital at retirement {:.2}",
        projection.years.len(),
        projection.summary.capital_at_retirement
    );

    if cli.json {
        let response = build_simulate_response(inputs, projection);
        return Ok(serde_json::to_string_pretty(&response)?);
    }
    Ok(render_text_report(&inputs, &projection))
}

fn render_text_report(inputs: &SimulationInput, projection: &Projection) -> String {
    let summary = &projection.summary;
    let mut out = String::new();

    let _ = writeln!(
        out,
        "Capital at retirement (age {}): {}",
        inputs.retirement_age,
        format_chf(summary.capital_at_retirement)
    );
    let _ = writeln!(
        out,
        "Estimated monthly income:       {}",
        format_chf(summary.estimated_monthly_income)
    );
    let _ = writeln!(
        out,
        "Target monthly income:          {}",
        format_chf(inputs.target_monthly_income)
    );
    let _ = writeln!(
        out,
        "Income gap:                     {}",
        format_chf(summary.income_gap)
    );
    let _ = writeln!(
        out,
        "Annual tax saving (3a):         {}",
        format_chf(summary.annual_tax_saving)
    );
    let _ = writeln!(
        out,
        "Returns 3a / 3b: {} / {}, inflation {}",
        format_percent(inputs.expected_return_a),
        format_percent(inputs.expected_return_b),
        format_percent(inputs.inflation_rate)
    );
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "{:>4}  {:>4}  {:<12}  {:>16}  {:>16}  {:>16}",
        "Age", "Year", "Phase", "3a / Withdrawal", "3b", "Total / Real"
    );

    for year in &projection.years {
        let (phase, first, second, last) = match year.figures {
            YearFigures::Accumulation {
                balance_a,
                balance_b,
                total_capital,
            } => (
                "accumulation",
                format_chf(balance_a),
                format_chf(balance_b),
                format_chf(total_capital),
            ),
            YearFigures::Decumulation {
                withdrawal,
                remaining_capital_real,
            } => (
                "decumulation",
                format_chf(withdrawal),
                String::new(),
                format_chf(remaining_capital_real),
            ),
        };
        let _ = writeln!(
            out,
            "{:>4}  {:>4}  {:<12}  {:>16}  {:>16}  {:>16}",
            year.age, year.calendar_year, phase, first, second, last
        );
    }

    out
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route("/", get(index_handler))
        .route("/index.html", get(index_handler))
        .route("/styles.css", get(styles_handler))
        .route("/app.js", get(app_js_handler))
        .route(
            "/api/simulate",
            get(simulate_get_handler).post(simulate_post_handler),
        )
        .route("/api/wizard", post(wizard_handler))
        .route("/api/presets", get(presets_handler))
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    log::info!("3rd pillar simulator listening on http://{addr}");
    log::info!("Local access: http://127.0.0.1:{port}/");

    axum::serve(listener, app).await
}

async fn index_handler() -> impl IntoResponse {
    with_cache_control(Html(INDEX_HTML))
}

async fn styles_handler() -> impl IntoResponse {
    with_cache_control((
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        STYLES_CSS,
    ))
}

async fn app_js_handler() -> impl IntoResponse {
    with_cache_control((
        [(
            header::CONTENT_TYPE,
            "application/javascript; charset=utf-8",
        )],
        APP_JS,
    ))
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn simulate_get_handler(Query(payload): Query<SimulatePayload>) -> Response {
    simulate_handler_impl(payload)
}

async fn simulate_post_handler(Json(payload): Json<SimulatePayload>) -> Response {
    simulate_handler_impl(payload)
}

fn simulate_handler_impl(payload: SimulatePayload) -> Response {
    let inputs = match inputs_from_payload(payload) {
        Ok(inputs) => inputs,
        Err(err) => {
            log::warn!("rejected simulation request: {err}");
            return error_response(StatusCode::BAD_REQUEST, &err.to_string());
        }
    };

    let projection = project(&inputs);
    log::debug!(
        "simulated ages {}..={}, gap {:.2}",
        inputs.current_age,
        inputs.life_expectancy,
        projection.summary.income_gap
    );
    json_response(StatusCode::OK, build_simulate_response(inputs, projection))
}

async fn wizard_handler(Json(payload): Json<WizardPayload>) -> Response {
    match wizard_response_from_payload(payload, current_year()) {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(err) => {
            log::warn!("wizard step rejected: {err}");
            error_response(StatusCode::BAD_REQUEST, &err.to_string())
        }
    }
}

async fn presets_handler() -> Response {
    json_response(StatusCode::OK, build_presets_response())
}

fn with_cache_control<R: IntoResponse>(response: R) -> Response {
    let mut response = response.into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        "no-store".parse().expect("valid header"),
    );
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        "no-store".parse().expect("valid header"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
fn inputs_from_json(json: &str) -> Result<SimulationInput, String> {
    let payload = serde_json::from_str::<SimulatePayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    inputs_from_payload(payload).map_err(|e| e.to_string())
}

fn inputs_from_payload(payload: SimulatePayload) -> Result<SimulationInput, InputError> {
    let mut cli = default_cli_for_api();

    if let Some(v) = payload.current_age {
        cli.current_age = v;
    }
    if let Some(v) = payload.retirement_age {
        cli.retirement_age = v;
    }
    if let Some(v) = payload.life_expectancy {
        cli.life_expectancy = v;
    }
    if let Some(v) = payload.start_year {
        cli.start_year = Some(v);
    }

    if let Some(v) = payload.annual_income {
        cli.annual_income = v;
    }
    if let Some(v) = payload.current_savings_a {
        cli.savings_a = v;
    }
    if let Some(v) = payload.current_savings_b {
        cli.savings_b = v;
    }
    if let Some(v) = payload.monthly_contribution_a {
        cli.contribution_a = v;
    }
    if let Some(v) = payload.monthly_contribution_b {
        cli.contribution_b = v;
    }

    if let Some(v) = payload.expected_return_a {
        cli.return_a = v;
    }
    if let Some(v) = payload.expected_return_b {
        cli.return_b = v;
    }
    if let Some(v) = payload.inflation_rate {
        cli.inflation_rate = v;
    }
    if let Some(v) = payload.target_monthly_income {
        cli.target_monthly_income = v;
    }

    if let Some(v) = payload.lifestyle {
        cli.lifestyle = Some(cli_lifestyle(v));
    }
    if let Some(v) = payload.investment_profile {
        cli.investment_profile = Some(cli_investment_profile(v));
    }

    build_inputs(&cli)
}

fn cli_lifestyle(value: Lifestyle) -> CliLifestyle {
    match value {
        Lifestyle::Basic => CliLifestyle::Basic,
        Lifestyle::Moderate => CliLifestyle::Moderate,
        Lifestyle::Comfortable => CliLifestyle::Comfortable,
        Lifestyle::Luxury => CliLifestyle::Luxury,
    }
}

fn cli_investment_profile(value: InvestmentProfile) -> CliInvestmentProfile {
    match value {
        InvestmentProfile::Conservative => CliInvestmentProfile::Conservative,
        InvestmentProfile::Balanced => CliInvestmentProfile::Balanced,
        InvestmentProfile::Dynamic => CliInvestmentProfile::Dynamic,
    }
}

fn default_cli_for_api() -> Cli {
    let data = WizardData::default();
    Cli {
        current_age: data.age,
        retirement_age: data.retirement_age,
        life_expectancy: data.life_expectancy,
        start_year: None,
        annual_income: data.annual_income,
        savings_a: data.current_savings_a,
        savings_b: data.current_savings_b,
        contribution_a: data.monthly_contribution_a,
        contribution_b: data.monthly_contribution_b,
        return_a: data.expected_return_a,
        return_b: data.expected_return_b,
        inflation_rate: data.inflation_rate,
        target_monthly_income: data.target_monthly_income,
        lifestyle: None,
        investment_profile: None,
        json: true,
    }
}

fn build_simulate_response(inputs: SimulationInput, projection: Projection) -> SimulateResponse {
    SimulateResponse {
        input: inputs,
        summary: projection.summary,
        years: projection.years,
    }
}

fn wizard_response_from_payload(
    payload: WizardPayload,
    start_year: i32,
) -> Result<WizardResponse, WizardError> {
    let mut data = payload.data;
    if let Some(lifestyle) = payload.select_lifestyle {
        data = data.with_lifestyle(lifestyle);
    }
    if let Some(profile) = payload.select_investment_profile {
        data = data.with_investment_profile(profile);
    }

    let mut wizard = Wizard::resume(payload.step, data)?;
    match payload.action {
        Some(WizardAction::Next) => {
            wizard.next()?;
        }
        Some(WizardAction::Back) => {
            wizard.back();
        }
        None => {}
    }

    let step = wizard.step();
    let projection = match step {
        WizardStep::Results => Some(wizard.results(start_year)?),
        _ => None,
    };
    let data = wizard.into_data();

    Ok(WizardResponse {
        step,
        title: step.title(),
        progress_percent: step.progress_percent(),
        recommended_monthly_income: data.recommended_monthly_income(),
        data,
        projection,
    })
}

fn build_presets_response() -> PresetsResponse {
    PresetsResponse {
        pillar3a_annual_cap: PILLAR_3A_ANNUAL_CAP,
        steps: WizardStep::ALL
            .iter()
            .map(|&step| StepPreset {
                id: step,
                title: step.title(),
            })
            .collect(),
        lifestyles: Lifestyle::ALL
            .iter()
            .map(|&lifestyle| LifestylePreset {
                id: lifestyle,
                label: lifestyle.label(),
                description: lifestyle.description(),
                income_share: lifestyle.income_share(),
            })
            .collect(),
        investment_profiles: InvestmentProfile::ALL
            .iter()
            .map(|&profile| ProfilePreset {
                id: profile,
                label: profile.label(),
                description: profile.description(),
                expected_return: profile.expected_return(),
            })
            .collect(),
    }
}
