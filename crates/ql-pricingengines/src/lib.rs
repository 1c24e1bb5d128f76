//! # ql-pricingengines
//!
//! Pricing engines for vanilla, barrier and Asian options: closed-form,
//! lattice, finite-difference, Monte Carlo and Fourier methods.  Every
//! engine implements [`PricingEngine`](ql_instruments::PricingEngine) for
//! the argument type it prices and rejects terms it cannot handle with
//! [`Error::Domain`](ql_core::Error::Domain).
//!
//! ## Engines
//!
//! | engine | method | exercise |
//! |---|---|---|
//! | [`AnalyticEuropeanEngine`] | Black-Scholes-Merton | European |
//! | [`AnalyticBarrierEngine`] | Reiner-Rubinstein | European |
//! | [`BaroneAdesiWhaleyEngine`] | quadratic approximation | American |
//! | [`BinomialVanillaEngine`] | binomial tree | European, American, Bermudan |
//! | [`TrinomialVanillaEngine`] | trinomial tree | European, American, Bermudan |
//! | [`FdBlackScholesVanillaEngine`] | finite differences | European, American, Bermudan |
//! | [`FdBlackScholesBarrierEngine`] | finite differences | European |
//! | [`FdHestonVanillaEngine`] | ADI finite differences | European, American, Bermudan |
//! | [`AnalyticHestonEngine`] | characteristic function | European |
//! | [`CosHestonEngine`] | cosine expansion | European |
//! | [`McEuropeanEngine`] | Monte Carlo | European |
//! | [`McEuropeanHestonEngine`] | Monte Carlo | European |
//! | [`McDiscreteArithmeticAsianEngine`] | Monte Carlo | European |
//! | [`AnalyticDiscreteGeometricAsianEngine`] | closed form | European |
//!
//! [`implied_volatility`] inverts the Black-Scholes engines and
//! [`HestonModelHelper`] quotes options for Heston calibration.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// ── Formulas ─────────────────────────────────────────────────────────────

/// Black formula, its Greeks and its inverse.
pub mod black_formula;

// ── Black-Scholes engines ────────────────────────────────────────────────
pub mod analytic_barrier_engine;
pub mod analytic_european_engine;
pub mod barone_adesi_whaley_engine;
pub mod binomial_engine;
pub mod fd_black_scholes_barrier_engine;
pub mod fd_black_scholes_vanilla_engine;
pub mod mc_european_engine;
pub mod trinomial_engine;

// ── Asian engines ────────────────────────────────────────────────────────
pub mod analytic_discrete_geometric_asian_engine;
pub mod mc_discrete_arithmetic_asian_engine;

// ── Heston engines ───────────────────────────────────────────────────────
pub mod analytic_heston_engine;
pub mod cos_heston_engine;
pub mod fd_heston_vanilla_engine;
pub mod mc_european_heston_engine;

// ── Inversion and calibration ────────────────────────────────────────────
pub mod heston_model_helper;
pub mod implied_volatility;

// ── Re-exports ───────────────────────────────────────────────────────────
pub use analytic_barrier_engine::{analytic_barrier_price, AnalyticBarrierEngine, BarrierInputs};
pub use analytic_discrete_geometric_asian_engine::AnalyticDiscreteGeometricAsianEngine;
pub use analytic_european_engine::AnalyticEuropeanEngine;
pub use analytic_heston_engine::{heston_price, AnalyticHestonEngine, HestonIntegration, HestonIntegrator};
pub use barone_adesi_whaley_engine::{barone_adesi_whaley, critical_price, BaroneAdesiWhaleyEngine};
pub use binomial_engine::BinomialVanillaEngine;
pub use black_formula::{black_formula, black_formula_implied_std_dev, BlackCalculator};
pub use cos_heston_engine::{CosConfig, CosHestonEngine};
pub use fd_black_scholes_barrier_engine::FdBlackScholesBarrierEngine;
pub use fd_black_scholes_vanilla_engine::FdBlackScholesVanillaEngine;
pub use fd_heston_vanilla_engine::FdHestonVanillaEngine;
pub use heston_model_helper::HestonModelHelper;
pub use implied_volatility::{implied_volatility, ImpliedVolatility};
pub use mc_discrete_arithmetic_asian_engine::McDiscreteArithmeticAsianEngine;
pub use mc_european_engine::McEuropeanEngine;
pub use mc_european_heston_engine::McEuropeanHestonEngine;
pub use trinomial_engine::TrinomialVanillaEngine;
