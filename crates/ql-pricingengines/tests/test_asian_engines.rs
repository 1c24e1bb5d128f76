//! Asian options through the instrument interface, with fixing history.

use std::sync::Arc;

use ql_core::{Error, Handle};
use ql_instruments::{AsianOption, AverageType, Exercise, OptionType, Payoff};
use ql_methods::McConfig;
use ql_pricingengines::{AnalyticDiscreteGeometricAsianEngine, McDiscreteArithmeticAsianEngine};
use ql_processes::GeneralizedBlackScholesProcess;
use ql_quotes::{Quote, SimpleQuote};
use ql_termstructures::{BlackConstantVol, BlackVolTermStructure, FlatForward, YieldTermStructure};
use ql_time::{Actual360, Date};

fn today() -> Date {
    Date::from_ymd(2025, 1, 2).unwrap()
}

fn process() -> Arc<GeneralizedBlackScholesProcess> {
    let dc = Arc::new(Actual360);
    let r: Arc<dyn YieldTermStructure> = Arc::new(FlatForward::with_rate(today(), 0.06, dc.clone()));
    let q: Arc<dyn YieldTermStructure> = Arc::new(FlatForward::with_rate(today(), 0.03, dc.clone()));
    let vol: Arc<dyn BlackVolTermStructure> = Arc::new(BlackConstantVol::with_vol(today(), 0.2, dc));
    let spot: Arc<dyn Quote> = SimpleQuote::shared(100.0);
    Arc::new(GeneralizedBlackScholesProcess::black_scholes_merton(
        Handle::new(spot),
        Handle::new(q),
        Handle::new(r),
        Handle::new(vol),
    ))
}

/// Monthly fixings, two of them already past.
fn seasoned(average_type: AverageType) -> AsianOption {
    let fixings = (-2..=9).map(|i| today() + 30 * i + 15).collect();
    AsianOption::asian(
        average_type,
        Payoff::plain_vanilla(OptionType::Call, 100.0),
        Exercise::european(today() + 300),
        fixings,
    )
}

#[test]
fn missing_history_is_reported() {
    let mut option = seasoned(AverageType::Geometric);
    option.set_pricing_engine(Arc::new(AnalyticDiscreteGeometricAsianEngine::new(process())));
    assert!(matches!(option.npv(), Err(Error::MissingData(_))));

    option.add_fixing(today() - 45, 98.0);
    assert!(matches!(option.npv(), Err(Error::MissingData(_))));
    option.add_fixing(today() - 15, 101.0);
    assert!(option.npv().unwrap() > 0.0);
}

#[test]
fn history_above_the_strike_raises_the_price() {
    let price = |fixing: f64| {
        let mut option = seasoned(AverageType::Geometric);
        option.add_fixing(today() - 45, fixing);
        option.add_fixing(today() - 15, fixing);
        option.set_pricing_engine(Arc::new(AnalyticDiscreteGeometricAsianEngine::new(process())));
        option.npv().unwrap()
    };
    assert!(price(110.0) > price(90.0));
}

#[test]
fn arithmetic_monte_carlo_brackets_the_geometric_price() {
    let mut geometric = seasoned(AverageType::Geometric);
    let mut arithmetic = seasoned(AverageType::Arithmetic);
    for option in [&mut geometric, &mut arithmetic] {
        option.add_fixing(today() - 45, 98.0);
        option.add_fixing(today() - 15, 101.0);
    }
    geometric.set_pricing_engine(Arc::new(AnalyticDiscreteGeometricAsianEngine::new(process())));
    let config = McConfig::default().with_samples(20_000).with_control_variate(true);
    arithmetic.set_pricing_engine(Arc::new(McDiscreteArithmeticAsianEngine::new(process(), config).unwrap()));

    let (g, a) = (geometric.npv().unwrap(), arithmetic.npv().unwrap());
    assert!(a > g, "{a} vs {g}");
    assert!(a < g + 0.5);
    assert!(arithmetic.error_estimate().unwrap() < 0.02);
}

#[test]
fn engines_reject_the_other_average() {
    let mut option = seasoned(AverageType::Arithmetic);
    option.add_fixing(today() - 45, 98.0);
    option.add_fixing(today() - 15, 101.0);
    option.set_pricing_engine(Arc::new(AnalyticDiscreteGeometricAsianEngine::new(process())));
    assert!(matches!(option.npv(), Err(Error::Domain(_))));
    assert_eq!(option.arguments().past_fixings.len(), 2);
}
