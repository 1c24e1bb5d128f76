//! Heston engines against each other, and a round trip through calibration.

use std::sync::Arc;

use approx::assert_abs_diff_eq;
use ql_core::Handle;
use ql_instruments::{
    DividendSchedule, Exercise, OptionType, Payoff, PricingEngine, VanillaOption, VanillaOptionArguments,
};
use ql_math::optimization::{EndCriteria, LevenbergMarquardt};
use ql_methods::{FdConfig, FdmSchemeDesc};
use ql_models::{
    calibrate, CalibrationErrorType, CalibrationHelper, HestonCharacteristic, HestonModel,
    PiecewiseHestonParameters, PiecewiseTimeDependentHestonModel,
};
use ql_pricingengines::{
    AnalyticHestonEngine, CosConfig, CosHestonEngine, FdHestonVanillaEngine, HestonIntegration, HestonModelHelper,
};
use ql_processes::{HestonDiscretization, HestonProcess};
use ql_quotes::{Quote, SimpleQuote};
use ql_termstructures::{FlatForward, YieldTermStructure};
use ql_time::{Actual365Fixed, Date};
use tracing_subscriber::EnvFilter;

/// Route engine and calibration events to the test output; filter with
/// `RUST_LOG`.
fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn today() -> Date {
    Date::from_ymd(2025, 1, 2).unwrap()
}

struct Market {
    spot: Handle<dyn Quote>,
    r: Handle<dyn YieldTermStructure>,
    q: Handle<dyn YieldTermStructure>,
}

fn market() -> Market {
    let dc = Arc::new(Actual365Fixed);
    let r: Arc<dyn YieldTermStructure> = Arc::new(FlatForward::with_rate(today(), 0.04, dc.clone()));
    let q: Arc<dyn YieldTermStructure> = Arc::new(FlatForward::with_rate(today(), 0.01, dc));
    let spot: Arc<dyn Quote> = SimpleQuote::shared(100.0);
    Market {
        spot: Handle::new(spot),
        r: Handle::new(r),
        q: Handle::new(q),
    }
}

/// `(v0, κ, θ, σ, ρ)`
fn heston(m: &Market, params: (f64, f64, f64, f64, f64)) -> HestonModel {
    let (v0, kappa, theta, sigma, rho) = params;
    let process = HestonProcess::new(
        m.r.clone(),
        m.q.clone(),
        m.spot.clone(),
        v0,
        kappa,
        theta,
        sigma,
        rho,
        HestonDiscretization::default(),
    )
    .unwrap();
    HestonModel::new(process)
}

fn european(option_type: OptionType, strike: f64, days: i32) -> VanillaOptionArguments {
    VanillaOptionArguments {
        payoff: Payoff::plain_vanilla(option_type, strike),
        exercise: Exercise::european(today() + days),
        dividends: DividendSchedule::new(),
    }
}

const PARAMS: (f64, f64, f64, f64, f64) = (0.04, 1.5, 0.05, 0.5, -0.6);

#[test]
fn integration_rules_agree() {
    let model = Arc::new(heston(&market(), PARAMS));
    let args = european(OptionType::Call, 105.0, 365);
    let reference = AnalyticHestonEngine::new(model.clone())
        .unwrap()
        .calculate(&args)
        .unwrap()
        .value;
    for integration in [
        HestonIntegration::GaussLegendre { order: 256 },
        HestonIntegration::GaussChebyshev { order: 512 },
        HestonIntegration::GaussChebyshev2nd { order: 512 },
        HestonIntegration::DiscreteSimpson { evaluations: 4001 },
        HestonIntegration::DiscreteTrapezoid { evaluations: 4001 },
        HestonIntegration::GaussLobatto {
            absolute_accuracy: 1e-8,
            relative_accuracy: None,
            max_evaluations: 100_000,
        },
        HestonIntegration::GaussKronrod {
            tolerance: 1e-8,
            max_evaluations: 100_000,
        },
    ] {
        let engine = AnalyticHestonEngine::with_integration(model.clone(), integration).unwrap();
        let value = engine.calculate(&args).unwrap().value;
        assert_abs_diff_eq!(value, reference, epsilon = 1e-3);
    }
}

#[test]
fn cosine_expansion_matches_the_integral() {
    let model = Arc::new(heston(&market(), PARAMS));
    let analytic = AnalyticHestonEngine::new(model.clone()).unwrap();
    let cos = CosHestonEngine::new(model, CosConfig::default()).unwrap();
    for (option_type, strike, days) in [
        (OptionType::Call, 90.0, 180),
        (OptionType::Put, 100.0, 365),
        (OptionType::Call, 120.0, 730),
    ] {
        let args = european(option_type, strike, days);
        assert_abs_diff_eq!(
            cos.calculate(&args).unwrap().value,
            analytic.calculate(&args).unwrap().value,
            epsilon = 1e-3
        );
    }
}

#[test]
fn flat_piecewise_model_prices_like_the_constant_one() {
    let m = market();
    let (v0, kappa, theta, sigma, rho) = PARAMS;
    let piecewise = PiecewiseTimeDependentHestonModel::new(
        m.r.clone(),
        m.q.clone(),
        m.spot.clone(),
        vec![0.25, 0.5, 1.0],
        PiecewiseHestonParameters::flat(4, v0, kappa, theta, sigma, rho),
    )
    .unwrap();
    let constant = AnalyticHestonEngine::new(Arc::new(heston(&m, PARAMS))).unwrap();
    let time_dependent = AnalyticHestonEngine::new(Arc::new(piecewise)).unwrap();
    for strike in [80.0, 100.0, 125.0] {
        let args = european(OptionType::Put, strike, 550);
        assert_abs_diff_eq!(
            time_dependent.calculate(&args).unwrap().value,
            constant.calculate(&args).unwrap().value,
            epsilon = 1e-10
        );
    }
}

#[test]
fn finite_differences_agree_with_the_integral() {
    let model = Arc::new(heston(&market(), PARAMS));
    let config = FdConfig::default()
        .with_t_grid(100)
        .with_x_grid(100)
        .with_v_grid(40)
        .with_damping_steps(2)
        .with_scheme(FdmSchemeDesc::modified_craig_sneyd());
    let mut option = VanillaOption::european(OptionType::Call, 100.0, today() + 365);
    option.set_pricing_engine(Arc::new(FdHestonVanillaEngine::new(model.clone(), config).unwrap()));
    let fd = option.npv().unwrap();
    option.set_pricing_engine(Arc::new(AnalyticHestonEngine::new(model).unwrap()));
    assert_abs_diff_eq!(fd, option.npv().unwrap(), epsilon = 5e-2);
}

#[test]
fn calibration_recovers_the_generating_model() {
    init_logging();
    let m = market();
    let target = heston(&m, PARAMS);
    let quote = |vol: f64| -> Handle<dyn Quote> {
        let q: Arc<dyn Quote> = SimpleQuote::shared(vol);
        Handle::new(q)
    };
    let helper = |days: i32, strike: f64, vol: f64| {
        HestonModelHelper::new(
            today() + days,
            strike,
            quote(vol),
            m.spot.clone(),
            m.r.clone(),
            m.q.clone(),
            CalibrationErrorType::RelativePriceError,
        )
        .unwrap()
    };

    // quotes: the target model's own implied volatilities
    let mut helpers = Vec::new();
    for days in [91, 182, 365, 730] {
        for strike in [80.0, 90.0, 100.0, 110.0, 120.0] {
            let reference = HestonModelHelper::new(
                today() + days,
                strike,
                quote(0.2),
                m.spot.clone(),
                m.r.clone(),
                m.q.clone(),
                CalibrationErrorType::ImpliedVolError,
            )
            .unwrap();
            let vol = 0.2 + reference.calibration_error(&target).unwrap();
            helpers.push(helper(days, strike, vol));
        }
    }
    for h in &helpers {
        assert_abs_diff_eq!(h.calibration_error(&target).unwrap(), 0.0, epsilon = 1e-8);
    }

    let mut model = heston(&m, (0.03, 1.0, 0.04, 0.4, -0.4));
    let end = EndCriteria::new(400, 40, 1e-12, 1e-16, 1e-14);
    let report = calibrate(&mut model, &helpers, &LevenbergMarquardt::default(), &end, None).unwrap();
    assert!(report.sum_of_squared_errors < 1e-6, "{report:?}");
    assert_abs_diff_eq!(model.v0(), 0.04, epsilon = 2e-3);
    assert_abs_diff_eq!(model.rho(), -0.6, epsilon = 0.1);
    assert_abs_diff_eq!(model.sigma(), 0.5, epsilon = 0.1);
}

#[test]
fn flat_volatility_calibrates_to_black_scholes() {
    init_logging();
    let m = market();
    let vol = 0.1;
    let quote: Arc<dyn Quote> = SimpleQuote::shared(vol);
    let quote = Handle::new(quote);
    let mut helpers = Vec::new();
    for days in [30, 91, 182, 365, 730] {
        let t = days as f64 / 365.0;
        for moneyness in [-1.0, -0.5, 0.0, 0.5, 1.0] {
            let strike = 100.0 * (moneyness * vol * t.sqrt()).exp();
            helpers.push(
                HestonModelHelper::new(
                    today() + days,
                    strike,
                    quote.clone(),
                    m.spot.clone(),
                    m.r.clone(),
                    m.q.clone(),
                    CalibrationErrorType::RelativePriceError,
                )
                .unwrap(),
            );
        }
    }

    let tolerance = 3e-3;
    for sigma in [0.1, 0.3, 0.5] {
        let mut model = heston(&m, (0.01, 0.2, 0.02, sigma, -0.75));
        let end = EndCriteria::new(400, 40, 1e-12, 1e-16, 1e-14);
        calibrate(&mut model, &helpers, &LevenbergMarquardt::default(), &end, None).unwrap();
        assert!(model.sigma() < tolerance, "vol of vol {} from {sigma}", model.sigma());
        assert!(
            (model.kappa() * (model.theta() - vol * vol)).abs() < tolerance,
            "kappa {} theta {}",
            model.kappa(),
            model.theta()
        );
        assert!((model.v0() - vol * vol).abs() < tolerance, "v0 {}", model.v0());
    }
}
