//! The generic instrument and the pricing engine interface.
//!
//! An [`Instrument`] owns the arguments of a contract and at most one
//! pricing engine.  Results are cached against the combined version of the
//! instrument and the engine (whose version covers its process, curves,
//! quotes and evaluation context), so asking twice for the NPV without any
//! market change runs the engine once.

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::Arc;

use ql_core::errors::{Error, Result};
use ql_core::{latest_version, LazyCache, Real, Version, VersionStamp, Versioned};
use tracing::trace;

/// Sensitivities produced by an engine; `None` where not computed.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Greeks {
    /// ∂V/∂S.
    pub delta: Option<Real>,
    /// ∂²V/∂S².
    pub gamma: Option<Real>,
    /// ∂V/∂σ.
    pub vega: Option<Real>,
    /// ∂V/∂t (per year).
    pub theta: Option<Real>,
    /// ∂V/∂r.
    pub rho: Option<Real>,
    /// ∂V/∂q.
    pub dividend_rho: Option<Real>,
}

/// Output of a pricing engine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PricingResults {
    /// Present value.
    pub value: Real,
    /// Standard error of a sampled value.
    pub error_estimate: Option<Real>,
    /// Sensitivities.
    pub greeks: Greeks,
    /// Engine-specific named results.
    pub additional_results: BTreeMap<String, Real>,
}

impl PricingResults {
    /// Results holding only a value.
    pub fn from_value(value: Real) -> Self {
        Self {
            value,
            ..Self::default()
        }
    }

    /// Attach an error estimate.
    pub fn with_error_estimate(mut self, error: Real) -> Self {
        self.error_estimate = Some(error);
        self
    }

    /// Attach Greeks.
    pub fn with_greeks(mut self, greeks: Greeks) -> Self {
        self.greeks = greeks;
        self
    }

    /// Add a named result.
    pub fn with_result(mut self, key: impl Into<String>, value: Real) -> Self {
        self.additional_results.insert(key.into(), value);
        self
    }
}

/// A numerical method pricing contracts described by arguments `A`.
///
/// Engines hold their process or model; their version must cover every
/// market input they read.
pub trait PricingEngine<A>: Versioned + Debug + Send + Sync {
    /// Price the contract described by `args`.
    fn calculate(&self, args: &A) -> Result<PricingResults>;
}

/// Contract arguments handed to an engine.
pub trait InstrumentArguments: Debug + Send + Sync {
    /// Check internal consistency before pricing.
    fn validate(&self) -> Result<()>;
}

/// A priceable contract.
#[derive(Debug)]
pub struct Instrument<A> {
    arguments: A,
    engine: Option<Arc<dyn PricingEngine<A>>>,
    stamp: VersionStamp,
    cache: LazyCache<PricingResults>,
}

impl<A: InstrumentArguments> Instrument<A> {
    /// Instrument without an engine.
    pub fn new(arguments: A) -> Self {
        Self {
            arguments,
            engine: None,
            stamp: VersionStamp::new(),
            cache: LazyCache::new(),
        }
    }

    /// The contract arguments.
    pub fn arguments(&self) -> &A {
        &self.arguments
    }

    /// Replace the contract arguments.
    pub fn set_arguments(&mut self, arguments: A) {
        self.arguments = arguments;
        self.stamp.touch();
        self.cache.invalidate();
    }

    /// Mutable access to the arguments; cached results are dropped.
    pub fn arguments_mut(&mut self) -> &mut A {
        self.stamp.touch();
        self.cache.invalidate();
        &mut self.arguments
    }

    /// Attach `engine`, replacing any previous one.
    pub fn set_pricing_engine(&mut self, engine: Arc<dyn PricingEngine<A>>) {
        self.engine = Some(engine);
        self.stamp.touch();
        self.cache.invalidate();
    }

    /// The attached engine, if any.
    pub fn pricing_engine(&self) -> Option<&Arc<dyn PricingEngine<A>>> {
        self.engine.as_ref()
    }

    /// `true` if results at the current market state are cached.
    pub fn is_calculated(&self) -> bool {
        self.cache.is_calculated(self.version())
    }

    /// Full engine output, recomputed if any input changed.
    pub fn results(&self) -> Result<PricingResults> {
        let engine = self
            .engine
            .as_ref()
            .ok_or_else(|| Error::Runtime("null pricing engine".into()))?;
        let version = self.version();
        self.cache.get_or_try_compute(version, || {
            trace!(version, "recalculating instrument");
            self.arguments.validate()?;
            engine.calculate(&self.arguments)
        })
    }

    /// Present value.
    pub fn npv(&self) -> Result<Real> {
        Ok(self.results()?.value)
    }

    /// Standard error of a sampled NPV.
    pub fn error_estimate(&self) -> Result<Real> {
        self.results()?
            .error_estimate
            .ok_or_else(|| Error::MissingResult("error estimate".into()))
    }

    /// ∂V/∂S.
    pub fn delta(&self) -> Result<Real> {
        self.greek("delta", |g| g.delta)
    }

    /// ∂²V/∂S².
    pub fn gamma(&self) -> Result<Real> {
        self.greek("gamma", |g| g.gamma)
    }

    /// ∂V/∂σ.
    pub fn vega(&self) -> Result<Real> {
        self.greek("vega", |g| g.vega)
    }

    /// ∂V/∂t.
    pub fn theta(&self) -> Result<Real> {
        self.greek("theta", |g| g.theta)
    }

    /// ∂V/∂r.
    pub fn rho(&self) -> Result<Real> {
        self.greek("rho", |g| g.rho)
    }

    /// ∂V/∂q.
    pub fn dividend_rho(&self) -> Result<Real> {
        self.greek("dividend rho", |g| g.dividend_rho)
    }

    /// An engine-specific named result.
    pub fn additional_result(&self, key: &str) -> Result<Real> {
        self.results()?
            .additional_results
            .get(key)
            .copied()
            .ok_or_else(|| Error::MissingResult(key.to_string()))
    }

    /// Keep serving the current results until [`unfreeze`][Self::unfreeze].
    pub fn freeze(&self) {
        self.cache.freeze();
    }

    /// Resume recalculating on market changes.
    pub fn unfreeze(&self) {
        self.cache.unfreeze();
    }

    fn greek(&self, name: &str, pick: impl Fn(&Greeks) -> Option<Real>) -> Result<Real> {
        pick(&self.results()?.greeks).ok_or_else(|| Error::MissingResult(name.to_string()))
    }
}

impl<A> Versioned for Instrument<A> {
    fn version(&self) -> Version {
        latest_version([self.stamp.get(), self.engine.version()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct Notional(Real);

    impl InstrumentArguments for Notional {
        fn validate(&self) -> Result<()> {
            ql_core::ensure!(self.0 >= 0.0, "negative notional");
            Ok(())
        }
    }

    #[derive(Debug, Default)]
    struct CountingEngine {
        stamp: VersionStamp,
        calls: AtomicUsize,
    }

    impl Versioned for CountingEngine {
        fn version(&self) -> Version {
            self.stamp.get()
        }
    }

    impl PricingEngine<Notional> for CountingEngine {
        fn calculate(&self, args: &Notional) -> Result<PricingResults> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(PricingResults::from_value(2.0 * args.0)
                .with_greeks(Greeks {
                    delta: Some(2.0),
                    ..Greeks::default()
                })
                .with_result("notional", args.0))
        }
    }

    #[test]
    fn missing_engine_is_an_error() {
        let inst = Instrument::new(Notional(1.0));
        assert!(matches!(inst.npv(), Err(Error::Runtime(_))));
    }

    #[test]
    fn results_are_cached_until_engine_changes() {
        let engine = Arc::new(CountingEngine::default());
        let mut inst = Instrument::new(Notional(5.0));
        inst.set_pricing_engine(engine.clone());
        assert_eq!(inst.npv(), Ok(10.0));
        assert_eq!(inst.delta(), Ok(2.0));
        assert_eq!(engine.calls.load(Ordering::SeqCst), 1);
        assert!(inst.is_calculated());

        engine.stamp.touch();
        assert!(!inst.is_calculated());
        assert_eq!(inst.npv(), Ok(10.0));
        assert_eq!(engine.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn swapping_engines_invalidates() {
        let first = Arc::new(CountingEngine::default());
        let second = Arc::new(CountingEngine::default());
        let mut inst = Instrument::new(Notional(1.0));
        inst.set_pricing_engine(first.clone());
        inst.npv().unwrap();
        inst.set_pricing_engine(second.clone());
        inst.npv().unwrap();
        inst.set_pricing_engine(first.clone());
        inst.npv().unwrap();
        assert_eq!(first.calls.load(Ordering::SeqCst), 2);
        assert_eq!(second.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn missing_greeks_are_reported() {
        let mut inst = Instrument::new(Notional(1.0));
        inst.set_pricing_engine(Arc::new(CountingEngine::default()));
        assert_eq!(inst.gamma(), Err(Error::MissingResult("gamma".into())));
        assert!(inst.error_estimate().is_err());
        assert_eq!(inst.additional_result("notional"), Ok(1.0));
        assert!(inst.additional_result("strike").is_err());
    }

    #[test]
    fn arguments_are_validated() {
        let mut inst = Instrument::new(Notional(-1.0));
        inst.set_pricing_engine(Arc::new(CountingEngine::default()));
        assert!(matches!(inst.npv(), Err(Error::Precondition(_))));
        inst.arguments_mut().0 = 3.0;
        assert_eq!(inst.npv(), Ok(6.0));
    }

    #[test]
    fn frozen_instrument_keeps_results() {
        let engine = Arc::new(CountingEngine::default());
        let mut inst = Instrument::new(Notional(1.0));
        inst.set_pricing_engine(engine.clone());
        inst.npv().unwrap();
        inst.freeze();
        engine.stamp.touch();
        inst.npv().unwrap();
        assert_eq!(engine.calls.load(Ordering::SeqCst), 1);
        inst.unfreeze();
        inst.npv().unwrap();
        assert_eq!(engine.calls.load(Ordering::SeqCst), 2);
    }
}
