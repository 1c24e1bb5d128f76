//! Market-data driven repricing across engines through the facade.

use std::sync::Arc;

use approx::assert_abs_diff_eq;
use qlengine::core::{Error, Handle};
use qlengine::instruments::{DividendSchedule, Exercise, OptionType, Payoff, VanillaOption, VanillaOptionArguments};
use qlengine::methods::{FdConfig, McConfig, TreeKind};
use qlengine::pricingengines::{
    AnalyticEuropeanEngine, BinomialVanillaEngine, FdBlackScholesVanillaEngine, ImpliedVolatility, McEuropeanEngine,
};
use qlengine::processes::GeneralizedBlackScholesProcess;
use qlengine::quotes::{Quote, SimpleQuote};
use qlengine::termstructures::{
    BlackConstantVol, BlackVolTermStructure, FlatForward, ReferenceDate, YieldTermStructure,
};
use qlengine::time::{Actual365Fixed, Date};
use tracing_subscriber::EnvFilter;

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

struct Setup {
    spot: Arc<SimpleQuote>,
    vol: Arc<SimpleQuote>,
    process: Arc<GeneralizedBlackScholesProcess>,
}

fn setup(today: Date) -> Setup {
    let dc = Arc::new(Actual365Fixed);
    let spot = SimpleQuote::shared(100.0);
    let vol = SimpleQuote::shared(0.2);
    let r: Arc<dyn YieldTermStructure> = Arc::new(FlatForward::with_rate(today, 0.03, dc.clone()));
    let q: Arc<dyn YieldTermStructure> = Arc::new(FlatForward::with_rate(today, 0.01, dc.clone()));
    let surface: Arc<dyn BlackVolTermStructure> = Arc::new(BlackConstantVol::new(
        ReferenceDate::Fixed(today),
        Handle::new(vol.clone() as Arc<dyn Quote>),
        dc,
    ));
    let process = Arc::new(GeneralizedBlackScholesProcess::black_scholes_merton(
        Handle::new(spot.clone() as Arc<dyn Quote>),
        Handle::new(q),
        Handle::new(r),
        Handle::new(surface),
    ));
    Setup { spot, vol, process }
}

#[test]
fn engines_follow_the_quotes() {
    init_logging();
    let today = Date::from_ymd(2025, 1, 2).unwrap();
    let s = setup(today);
    let put = || VanillaOption::european(OptionType::Put, 100.0, today + 365);

    let mut analytic = put();
    analytic.set_pricing_engine(Arc::new(AnalyticEuropeanEngine::new(s.process.clone())));
    let mut tree = put();
    tree.set_pricing_engine(Arc::new(
        BinomialVanillaEngine::new(s.process.clone(), TreeKind::LeisenReimer, 201).unwrap(),
    ));
    let mut fd = put();
    let config = FdConfig::default().with_t_grid(200).with_x_grid(200).with_damping_steps(2);
    fd.set_pricing_engine(Arc::new(FdBlackScholesVanillaEngine::new(s.process.clone(), config).unwrap()));

    for (spot, vol) in [(100.0, 0.2), (90.0, 0.3), (115.0, 0.15)] {
        s.spot.set_value(spot);
        s.vol.set_value(vol);
        let exact = analytic.npv().unwrap();
        assert_abs_diff_eq!(tree.npv().unwrap(), exact, epsilon = 1e-2);
        assert_abs_diff_eq!(fd.npv().unwrap(), exact, epsilon = 2e-2);
        // the quoted volatility is recovered from the analytic price
        let implied = analytic.implied_volatility(exact, &s.process, 1e-10, 100, 1e-3, 3.0).unwrap();
        assert_abs_diff_eq!(implied, vol, epsilon = 1e-6);
    }
}

#[test]
fn monte_carlo_runs_are_reproducible() {
    let today = Date::from_ymd(2025, 1, 2).unwrap();
    let s = setup(today);
    let mut option = VanillaOption::new(VanillaOptionArguments {
        payoff: Payoff::cash_or_nothing(OptionType::Call, 100.0, 10.0),
        exercise: Exercise::european(today + 180),
        dividends: DividendSchedule::new(),
    });
    let config = McConfig::default().with_samples(4096).with_seed(7);
    option.set_pricing_engine(Arc::new(McEuropeanEngine::new(s.process.clone(), config.clone()).unwrap()));
    let first = option.npv().unwrap();
    option.set_pricing_engine(Arc::new(McEuropeanEngine::new(s.process.clone(), config).unwrap()));
    assert_eq!(option.npv().unwrap(), first);
}

#[test]
fn missing_engine_is_a_runtime_error() {
    let option = VanillaOption::european(OptionType::Call, 100.0, Date::from_ymd(2026, 1, 2).unwrap());
    assert!(matches!(option.npv(), Err(Error::Runtime(_))));
}
