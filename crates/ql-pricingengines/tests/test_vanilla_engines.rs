//! Vanilla options priced through the instrument interface, with every
//! Black-Scholes engine checked against the closed form or against each
//! other.

use std::sync::Arc;

use approx::assert_abs_diff_eq;
use proptest::prelude::*;
use ql_core::{Error, Handle};
use ql_instruments::{
    DividendSchedule, Exercise, OptionType, Payoff, PricingEngine, VanillaOption, VanillaOptionArguments,
};
use ql_methods::{FdConfig, FdmSchemeDesc, McConfig, TreeKind};
use ql_pricingengines::{
    AnalyticEuropeanEngine, BaroneAdesiWhaleyEngine, BinomialVanillaEngine, FdBlackScholesVanillaEngine,
    McEuropeanEngine, TrinomialVanillaEngine,
};
use ql_processes::GeneralizedBlackScholesProcess;
use ql_quotes::{Quote, SimpleQuote};
use ql_termstructures::{BlackConstantVol, BlackVolTermStructure, FlatForward, ReferenceDate, YieldTermStructure};
use ql_time::{Actual360, Actual365Fixed, Date, DayCounter};

fn today() -> Date {
    Date::from_ymd(2025, 1, 2).unwrap()
}

/// Market quotes behind a Black-Scholes process.
struct Market {
    spot: Arc<SimpleQuote>,
    q: Arc<SimpleQuote>,
    r: Arc<SimpleQuote>,
    vol: Arc<SimpleQuote>,
    process: Arc<GeneralizedBlackScholesProcess>,
}

fn market(spot: f64, q: f64, r: f64, vol: f64, dc: Arc<dyn DayCounter>) -> Market {
    let (spot, q, r, vol) = (
        SimpleQuote::shared(spot),
        SimpleQuote::shared(q),
        SimpleQuote::shared(r),
        SimpleQuote::shared(vol),
    );
    let curve = |quote: &Arc<SimpleQuote>| -> Handle<dyn YieldTermStructure> {
        let quote: Arc<dyn Quote> = quote.clone();
        let curve: Arc<dyn YieldTermStructure> =
            Arc::new(FlatForward::new(ReferenceDate::Fixed(today()), Handle::new(quote), dc.clone()));
        Handle::new(curve)
    };
    let vol_quote: Arc<dyn Quote> = vol.clone();
    let surface: Arc<dyn BlackVolTermStructure> = Arc::new(BlackConstantVol::new(
        ReferenceDate::Fixed(today()),
        Handle::new(vol_quote),
        dc.clone(),
    ));
    let spot_quote: Arc<dyn Quote> = spot.clone();
    let process = Arc::new(GeneralizedBlackScholesProcess::black_scholes_merton(
        Handle::new(spot_quote),
        curve(&q),
        curve(&r),
        Handle::new(surface),
    ));
    Market {
        spot,
        q,
        r,
        vol,
        process,
    }
}

fn standard() -> Market {
    market(100.0, 0.02, 0.05, 0.25, Arc::new(Actual365Fixed))
}

fn vanilla(option_type: OptionType, strike: f64, exercise: Exercise) -> VanillaOptionArguments {
    VanillaOptionArguments {
        payoff: Payoff::plain_vanilla(option_type, strike),
        exercise,
        dividends: DividendSchedule::new(),
    }
}

fn american_put() -> VanillaOptionArguments {
    vanilla(
        OptionType::Put,
        100.0,
        Exercise::american(today(), today() + 365, false).unwrap(),
    )
}

#[test]
fn haug_reference_call() {
    // Haug, "The Complete Guide to Option Pricing Formulas", p. 2
    let m = market(60.0, 0.0, 0.08, 0.30, Arc::new(Actual360));
    let mut option = VanillaOption::european(OptionType::Call, 65.0, today() + 90);
    option.set_pricing_engine(Arc::new(AnalyticEuropeanEngine::new(m.process)));
    assert_abs_diff_eq!(option.npv().unwrap(), 2.1334, epsilon = 1e-4);
}

#[test]
fn analytic_greeks_match_bump_and_revalue() {
    let m = standard();
    let engine = AnalyticEuropeanEngine::new(m.process.clone());
    for option_type in [OptionType::Call, OptionType::Put] {
        let args = vanilla(option_type, 105.0, Exercise::european(today() + 270));
        let results = engine.calculate(&args).unwrap();
        let bumped = |quote: &SimpleQuote, base: f64, h: f64| {
            quote.set_value(base + h);
            let up = engine.calculate(&args).unwrap().value;
            quote.set_value(base - h);
            let down = engine.calculate(&args).unwrap().value;
            quote.set_value(base);
            (up, down)
        };

        let (up, down) = bumped(&m.spot, 100.0, 1e-2);
        assert_abs_diff_eq!(results.greeks.delta.unwrap(), (up - down) / 2e-2, epsilon = 1e-6);
        assert_abs_diff_eq!(
            results.greeks.gamma.unwrap(),
            (up - 2.0 * results.value + down) / 1e-4,
            epsilon = 1e-5
        );
        let (up, down) = bumped(&m.vol, 0.25, 1e-4);
        assert_abs_diff_eq!(results.greeks.vega.unwrap(), (up - down) / 2e-4, epsilon = 1e-5);
        let (up, down) = bumped(&m.r, 0.05, 1e-4);
        assert_abs_diff_eq!(results.greeks.rho.unwrap(), (up - down) / 2e-4, epsilon = 1e-5);
        let (up, down) = bumped(&m.q, 0.02, 1e-4);
        assert_abs_diff_eq!(results.greeks.dividend_rho.unwrap(), (up - down) / 2e-4, epsilon = 1e-5);
    }
}

/// Difference scaled by the spot level, as Greeks are compared across the
/// grid.
fn spot_relative_error(calculated: f64, expected: f64, spot: f64) -> f64 {
    (calculated - expected).abs() / spot
}

#[test]
fn analytic_greeks_over_the_market_grid() {
    let spot = 100.0;
    for option_type in [OptionType::Call, OptionType::Put] {
        for strike in [90.0, 100.0, 110.0] {
            for r in [0.01, 0.05, 0.15] {
                for vol in [0.11, 0.5, 1.2] {
                    for days in [365, 730] {
                        let m = market(spot, 0.04, r, vol, Arc::new(Actual365Fixed));
                        let engine = AnalyticEuropeanEngine::new(m.process.clone());
                        let price = |days: i32| {
                            engine
                                .calculate(&vanilla(option_type, strike, Exercise::european(today() + days)))
                                .unwrap()
                        };
                        let results = price(days);
                        let value = || price(days).value;
                        let bumped = |quote: &SimpleQuote, base: f64| {
                            let h = base * 1e-4;
                            quote.set_value(base + h);
                            let up = value();
                            quote.set_value(base - h);
                            let down = value();
                            quote.set_value(base);
                            (up, down, h)
                        };

                        let (up, down, h) = bumped(&m.spot, spot);
                        let delta = (up - down) / (2.0 * h);
                        let gamma = (up - 2.0 * results.value + down) / (h * h);
                        let (up, down, h) = bumped(&m.vol, vol);
                        let vega = (up - down) / (2.0 * h);
                        let (up, down, h) = bumped(&m.r, r);
                        let rho = (up - down) / (2.0 * h);
                        // a stationary market: one day less to expiry is one day later
                        let dt = 1.0 / 365.0;
                        let theta = (price(days - 1).value - price(days + 1).value) / (2.0 * dt);

                        let g = &results.greeks;
                        for (name, calculated, expected) in [
                            ("delta", g.delta.unwrap(), delta),
                            ("gamma", g.gamma.unwrap(), gamma),
                            ("vega", g.vega.unwrap(), vega),
                            ("rho", g.rho.unwrap(), rho),
                            ("theta", g.theta.unwrap(), theta),
                        ] {
                            let error = spot_relative_error(calculated, expected, spot);
                            assert!(
                                error < 1e-5,
                                "{name} of {option_type:?} K={strike} r={r} vol={vol} days={days}: \
                                 {calculated} vs {expected}"
                            );
                        }
                    }
                }
            }
        }
    }
}

proptest! {
    #[test]
    fn put_call_parity(
        spot in 50.0..150.0_f64,
        strike in 50.0..150.0_f64,
        q in 0.0..0.08_f64,
        r in 0.0..0.1_f64,
        vol in 0.05..0.8_f64,
        days in 30..1000_i32,
    ) {
        let m = market(spot, q, r, vol, Arc::new(Actual365Fixed));
        let engine = AnalyticEuropeanEngine::new(m.process.clone());
        let expiry = today() + days;
        let call = engine.calculate(&vanilla(OptionType::Call, strike, Exercise::european(expiry))).unwrap();
        let put = engine.calculate(&vanilla(OptionType::Put, strike, Exercise::european(expiry))).unwrap();
        let t = m.process.time(expiry).unwrap();
        let forward_value = spot * (-q * t).exp() - strike * (-r * t).exp();
        prop_assert!((call.value - put.value - forward_value).abs() < 1e-9 * spot.max(strike));
        prop_assert!((call.greeks.delta.unwrap() - put.greeks.delta.unwrap() - (-q * t).exp()).abs() < 1e-10);
    }
}

#[test]
fn cox_ross_rubinstein_converges() {
    let m = standard();
    let args = vanilla(OptionType::Call, 95.0, Exercise::european(today() + 365));
    let exact = AnalyticEuropeanEngine::new(m.process.clone()).calculate(&args).unwrap().value;
    let tree = BinomialVanillaEngine::new(m.process.clone(), TreeKind::CoxRossRubinstein, 501)
        .unwrap()
        .calculate(&args)
        .unwrap()
        .value;
    assert_abs_diff_eq!(tree, exact, epsilon = 0.02);
}

#[test]
fn finite_difference_schemes_agree_with_the_closed_form() {
    let m = standard();
    let args = vanilla(OptionType::Put, 100.0, Exercise::european(today() + 365));
    let exact = AnalyticEuropeanEngine::new(m.process.clone()).calculate(&args).unwrap();
    for (scheme, tolerance) in [
        (FdmSchemeDesc::douglas(), 2e-2),
        (FdmSchemeDesc::crank_nicolson(), 2e-2),
        (FdmSchemeDesc::ImplicitEuler, 5e-2),
    ] {
        let config = FdConfig::default()
            .with_t_grid(200)
            .with_x_grid(200)
            .with_damping_steps(2)
            .with_scheme(scheme);
        let fd = FdBlackScholesVanillaEngine::new(m.process.clone(), config)
            .unwrap()
            .calculate(&args)
            .unwrap();
        assert_abs_diff_eq!(fd.value, exact.value, epsilon = tolerance);
        assert_abs_diff_eq!(fd.greeks.delta.unwrap(), exact.greeks.delta.unwrap(), epsilon = 5e-3);
    }
}

#[test]
fn fine_grid_reaches_the_closed_form() {
    let m = standard();
    let args = vanilla(OptionType::Put, 100.0, Exercise::european(today() + 365));
    let exact = AnalyticEuropeanEngine::new(m.process.clone()).calculate(&args).unwrap().value;
    let config = FdConfig::default()
        .with_t_grid(800)
        .with_x_grid(800)
        .with_damping_steps(2)
        .with_scheme(FdmSchemeDesc::douglas());
    let fd = FdBlackScholesVanillaEngine::new(m.process.clone(), config)
        .unwrap()
        .calculate(&args)
        .unwrap()
        .value;
    assert_abs_diff_eq!(fd, exact, epsilon = 1e-4);
}

#[test]
fn american_engines_agree() {
    let m = standard();
    let args = american_put();
    let tree = BinomialVanillaEngine::new(m.process.clone(), TreeKind::CoxRossRubinstein, 801)
        .unwrap()
        .calculate(&args)
        .unwrap()
        .value;
    let trinomial = TrinomialVanillaEngine::new(m.process.clone(), 801)
        .unwrap()
        .calculate(&args)
        .unwrap()
        .value;
    let config = FdConfig::default().with_t_grid(200).with_x_grid(200).with_damping_steps(2);
    let fd = FdBlackScholesVanillaEngine::new(m.process.clone(), config)
        .unwrap()
        .calculate(&args)
        .unwrap()
        .value;
    let baw = BaroneAdesiWhaleyEngine::new(m.process.clone()).calculate(&args).unwrap().value;
    let european = AnalyticEuropeanEngine::new(m.process.clone())
        .calculate(&vanilla(OptionType::Put, 100.0, Exercise::european(today() + 365)))
        .unwrap()
        .value;

    assert!(tree > european);
    assert_abs_diff_eq!(trinomial, tree, epsilon = 0.03);
    assert_abs_diff_eq!(fd, tree, epsilon = 0.03);
    assert_abs_diff_eq!(baw, tree, epsilon = 0.1);
}

#[test]
fn monte_carlo_error_estimate_is_honest() {
    let m = standard();
    let args = vanilla(OptionType::Call, 100.0, Exercise::european(today() + 365));
    let exact = AnalyticEuropeanEngine::new(m.process.clone()).calculate(&args).unwrap().value;
    let within = (1..=10_u64)
        .filter(|&seed| {
            let config = McConfig::default().with_samples(10_000).with_seed(seed);
            let results = McEuropeanEngine::new(m.process.clone(), config)
                .unwrap()
                .calculate(&args)
                .unwrap();
            (results.value - exact).abs() < 2.34 * results.error_estimate.unwrap()
        })
        .count();
    assert!(within >= 7, "{within} of 10 seeds within 2.34 standard errors");
}

#[test]
fn monte_carlo_rejects_early_exercise() {
    let m = standard();
    let engine = McEuropeanEngine::new(m.process.clone(), McConfig::default().with_samples(100)).unwrap();
    assert!(matches!(engine.calculate(&american_put()), Err(Error::Domain(_))));
}

#[test]
fn instrument_reprices_after_a_quote_moves() {
    let m = standard();
    let mut option = VanillaOption::european(OptionType::Call, 100.0, today() + 180);
    option.set_pricing_engine(Arc::new(AnalyticEuropeanEngine::new(m.process.clone())));
    let before = option.npv().unwrap();
    m.spot.set_value(110.0);
    let after = option.npv().unwrap();
    assert!(after > before);
    let direct = AnalyticEuropeanEngine::new(m.process.clone())
        .calculate(option.arguments())
        .unwrap()
        .value;
    assert_abs_diff_eq!(after, direct, epsilon = 1e-12);
}
