//! Generation orchestrator.
//!
//! Resolves a loosely-typed [`GenerationRequest`] into a [`GenerationPlan`],
//! builds users and transactions with their sharing edges, uploads them
//! through a [`BatchLoader`], and reports a [`GenerationSummary`].

use std::num::NonZeroUsize;

use rand::{Rng, SeedableRng, rngs::SmallRng};
use serde::{Deserialize, Serialize};
use tracing::{Span, field, info, instrument, warn};

use crate::{
    density::DensityScales,
    edges::SharedEdge,
    entity::{Transaction, User},
    error::{GenerationError, Result},
    factory::{TransactionFactory, UserFactory},
    loader::{BatchLoader, DEFAULT_BATCH_SIZE, LoadReport, LoadStrategy},
    sharing::{MAX_GROUP_SIZE, SharingEngine},
    store::GraphStore,
};

/// Caller-supplied knobs. Every field is optional and untrusted.
///
/// # Examples
/// ```
/// use fraudnet_core::GenerationRequest;
///
/// let request: GenerationRequest =
///     serde_json::from_str(r#"{"usersCount": 50, "density": 0.2}"#).expect("valid JSON");
/// assert_eq!(request.users_count, Some(50.0));
/// assert_eq!(request.transaction_density, None);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerationRequest {
    /// Requested number of users.
    pub users_count: Option<f64>,
    /// Requested number of transactions.
    pub transactions_count: Option<f64>,
    /// Requested user sharing density.
    pub user_density: Option<f64>,
    /// Requested transaction sharing density.
    pub transaction_density: Option<f64>,
    /// Fallback for either specific density.
    pub density: Option<f64>,
}

/// Bounds and defaults applied while resolving a request.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GenerationLimits {
    /// Users generated when the request gives no usable count.
    pub default_users: usize,
    /// Lower bound on generated users.
    pub min_users: usize,
    /// Upper bound on generated users.
    pub max_users: usize,
    /// Transactions generated when the request gives no usable count.
    pub default_transactions: usize,
    /// Lower bound on generated transactions.
    pub min_transactions: usize,
    /// Upper bound on generated transactions.
    pub max_transactions: usize,
    /// User density used when neither `userDensity` nor `density` is usable.
    pub default_user_density: f64,
    /// Transaction density used when neither `transactionDensity` nor
    /// `density` is usable.
    pub default_transaction_density: f64,
}

impl Default for GenerationLimits {
    fn default() -> Self {
        Self {
            default_users: 20_000,
            min_users: 10,
            max_users: 20_000,
            default_transactions: 100_000,
            min_transactions: 100_000,
            max_transactions: 2_000_000,
            default_user_density: 0.001,
            default_transaction_density: 0.05,
        }
    }
}

impl GenerationLimits {
    fn validate(&self) -> Result<()> {
        if self.min_users < 2 {
            return Err(invalid("min_users", "must be at least 2"));
        }
        if self.min_users > self.max_users {
            return Err(invalid("users", "minimum exceeds maximum"));
        }
        if self.min_transactions > self.max_transactions {
            return Err(invalid("transactions", "minimum exceeds maximum"));
        }
        for (parameter, density) in [
            ("default_user_density", self.default_user_density),
            ("default_transaction_density", self.default_transaction_density),
        ] {
            if !(0.0..=1.0).contains(&density) {
                return Err(invalid(parameter, "must be within [0, 1]"));
            }
        }
        Ok(())
    }
}

/// A request after clamping: exact counts and densities in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GenerationPlan {
    /// Users to generate.
    pub users: usize,
    /// Transactions to generate.
    pub transactions: usize,
    /// Requested user density.
    pub user_density: f64,
    /// Requested transaction density.
    pub transaction_density: f64,
}

/// Everything produced by one run before it is loaded.
#[derive(Clone, Debug, PartialEq)]
pub struct SyntheticDataset {
    pub(crate) users: Vec<User>,
    pub(crate) transactions: Vec<Transaction>,
    pub(crate) shared_edges: Vec<SharedEdge>,
    pub(crate) transaction_edges: Vec<SharedEdge>,
    pub(crate) effective_user_probability: f64,
    pub(crate) effective_transaction_probability: f64,
}

impl SyntheticDataset {
    /// Generated users in index order.
    #[must_use]
    #[rustfmt::skip]
    pub fn users(&self) -> &[User] { &self.users }

    /// Generated transactions in index order.
    #[must_use]
    #[rustfmt::skip]
    pub fn transactions(&self) -> &[Transaction] { &self.transactions }

    /// Deduplicated user sharing edges.
    #[must_use]
    #[rustfmt::skip]
    pub fn shared_edges(&self) -> &[SharedEdge] { &self.shared_edges }

    /// Deduplicated transaction sharing edges.
    #[must_use]
    #[rustfmt::skip]
    pub fn transaction_edges(&self) -> &[SharedEdge] { &self.transaction_edges }

    /// Sharing probability applied to every user dimension.
    #[must_use]
    #[rustfmt::skip]
    pub fn effective_user_probability(&self) -> f64 { self.effective_user_probability }

    /// Sharing probability applied to every transaction dimension.
    #[must_use]
    #[rustfmt::skip]
    pub fn effective_transaction_probability(&self) -> f64 { self.effective_transaction_probability }
}

/// Counts and densities reported after a successful run.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationSummary {
    /// Users written.
    pub users_generated: usize,
    /// Transactions written.
    pub transactions_generated: usize,
    /// Distinct user sharing edges.
    pub shared_edge_count: usize,
    /// Distinct transaction sharing edges.
    pub transaction_edge_count: usize,
    /// Requested user density after clamping.
    pub user_density: f64,
    /// Requested transaction density after clamping.
    pub transaction_density: f64,
    /// Sharing probability used for users.
    pub effective_user_density: f64,
    /// Sharing probability used for transactions.
    pub effective_transaction_density: f64,
}

impl GenerationSummary {
    /// Summarises `dataset` as built from `plan`.
    #[must_use]
    pub fn from_dataset(plan: &GenerationPlan, dataset: &SyntheticDataset) -> Self {
        Self {
            users_generated: dataset.users.len(),
            transactions_generated: dataset.transactions.len(),
            shared_edge_count: dataset.shared_edges.len(),
            transaction_edge_count: dataset.transaction_edges.len(),
            user_density: plan.user_density,
            transaction_density: plan.transaction_density,
            effective_user_density: dataset.effective_user_probability,
            effective_transaction_density: dataset.effective_transaction_probability,
        }
    }
}

/// Configures and constructs [`Generator`] instances.
///
/// # Examples
/// ```
/// use fraudnet_core::{GeneratorBuilder, LoadStrategy};
///
/// let generator = GeneratorBuilder::new()
///     .with_batch_size(1_000)
///     .with_strategy(LoadStrategy::Sequential)
///     .with_seed(7)
///     .build()
///     .expect("builder configuration is valid");
/// assert_eq!(generator.loader().batch_size().get(), 1_000);
/// ```
#[derive(Clone, Debug)]
pub struct GeneratorBuilder {
    limits: GenerationLimits,
    batch_size: usize,
    strategy: LoadStrategy,
    max_group_size: usize,
    seed: Option<u64>,
    user_scales: DensityScales,
    transaction_scales: DensityScales,
}

impl Default for GeneratorBuilder {
    fn default() -> Self {
        Self {
            limits: GenerationLimits::default(),
            batch_size: DEFAULT_BATCH_SIZE,
            strategy: LoadStrategy::default(),
            max_group_size: MAX_GROUP_SIZE,
            seed: None,
            user_scales: DensityScales::USER,
            transaction_scales: DensityScales::TRANSACTION,
        }
    }
}

impl GeneratorBuilder {
    /// Creates a builder populated with default parameters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides request bounds and defaults.
    #[must_use]
    pub fn with_limits(mut self, limits: GenerationLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Overrides the number of records per bulk operation.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Overrides how batches within a phase are issued.
    #[must_use]
    pub fn with_strategy(mut self, strategy: LoadStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Overrides the cap on sharing group membership.
    #[must_use]
    pub fn with_max_group_size(mut self, max_group_size: usize) -> Self {
        self.max_group_size = max_group_size;
        self
    }

    /// Fixes the random seed so runs are reproducible.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Overrides the user family's density scales.
    #[must_use]
    pub fn with_user_scales(mut self, scales: DensityScales) -> Self {
        self.user_scales = scales;
        self
    }

    /// Overrides the transaction family's density scales.
    #[must_use]
    pub fn with_transaction_scales(mut self, scales: DensityScales) -> Self {
        self.transaction_scales = scales;
        self
    }

    /// Returns the configured limits.
    #[must_use]
    #[rustfmt::skip]
    pub fn limits(&self) -> &GenerationLimits { &self.limits }

    /// Validates the configuration and constructs a [`Generator`].
    ///
    /// # Errors
    /// Returns [`GenerationError::InvalidConfiguration`] for a zero batch
    /// size or group cap, inconsistent limits, or invalid density scales,
    /// and [`GenerationError::StrategyUnavailable`] when the strategy is not
    /// compiled in.
    pub fn build(self) -> Result<Generator> {
        let batch_size = NonZeroUsize::new(self.batch_size)
            .ok_or_else(|| invalid("batch_size", "must be greater than zero"))?;
        let max_group_size = NonZeroUsize::new(self.max_group_size)
            .ok_or_else(|| invalid("max_group_size", "must be greater than zero"))?;
        self.limits.validate()?;
        if !self.user_scales.is_valid() {
            return Err(invalid("user_scales", "must be finite and non-negative"));
        }
        if !self.transaction_scales.is_valid() {
            return Err(invalid(
                "transaction_scales",
                "must be finite and non-negative",
            ));
        }
        if !self.strategy.is_available() {
            return Err(GenerationError::StrategyUnavailable {
                requested: self.strategy,
            });
        }
        Ok(Generator {
            limits: self.limits,
            loader: BatchLoader::new(batch_size, self.strategy),
            max_group_size,
            seed: self.seed,
            user_scales: self.user_scales,
            transaction_scales: self.transaction_scales,
        })
    }
}

fn invalid(parameter: &'static str, reason: &'static str) -> GenerationError {
    GenerationError::InvalidConfiguration { parameter, reason }
}

/// Generates synthetic fraud networks and loads them into a [`GraphStore`].
///
/// # Examples
/// ```
/// use fraudnet_core::{GenerationRequest, GeneratorBuilder, MemoryGraphStore};
///
/// let generator = GeneratorBuilder::new()
///     .with_seed(11)
///     .build()
///     .expect("builder configuration is valid");
/// let request = GenerationRequest {
///     users_count: Some(10.0),
///     ..GenerationRequest::default()
/// };
/// let plan = generator.plan(&request);
/// assert_eq!(plan.users, 10);
/// assert_eq!(plan.transactions, 100_000);
/// let dataset = generator.build_dataset(&plan).expect("ten users suffice");
/// assert_eq!(dataset.users().len(), 10);
/// ```
#[derive(Clone, Debug)]
pub struct Generator {
    limits: GenerationLimits,
    loader: BatchLoader,
    max_group_size: NonZeroUsize,
    seed: Option<u64>,
    user_scales: DensityScales,
    transaction_scales: DensityScales,
}

impl Generator {
    /// Loader used by [`Generator::run`].
    #[must_use]
    #[rustfmt::skip]
    pub fn loader(&self) -> &BatchLoader { &self.loader }

    /// Limits applied by [`Generator::plan`].
    #[must_use]
    #[rustfmt::skip]
    pub fn limits(&self) -> &GenerationLimits { &self.limits }

    /// Resolves a request into exact counts and densities.
    ///
    /// Counts that are missing, non-finite or not positive fall back to the
    /// defaults; others are truncated and clamped into the limits. Densities
    /// that are missing or non-finite are ignored, the specific density wins
    /// over `density`, and the result is clamped into `[0, 1]`.
    #[must_use]
    pub fn plan(&self, request: &GenerationRequest) -> GenerationPlan {
        let limits = &self.limits;
        GenerationPlan {
            users: resolve_count(
                request.users_count,
                limits.default_users,
                limits.min_users,
                limits.max_users,
            ),
            transactions: resolve_count(
                request.transactions_count,
                limits.default_transactions,
                limits.min_transactions,
                limits.max_transactions,
            ),
            user_density: resolve_density(
                request.user_density,
                request.density,
                limits.default_user_density,
            ),
            transaction_density: resolve_density(
                request.transaction_density,
                request.density,
                limits.default_transaction_density,
            ),
        }
    }

    /// Builds a dataset for `plan` using the configured seed, or entropy
    /// when none was set.
    ///
    /// # Errors
    /// Returns [`GenerationError::InsufficientUsers`] when the plan asks for
    /// transactions but has fewer than two users.
    pub fn build_dataset(&self, plan: &GenerationPlan) -> Result<SyntheticDataset> {
        let mut rng = match self.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        self.build_dataset_with_rng(plan, &mut rng)
    }

    /// Builds a dataset for `plan` drawing from `rng`.
    ///
    /// # Errors
    /// Returns [`GenerationError::InsufficientUsers`] when the plan asks for
    /// transactions but has fewer than two users.
    #[instrument(
        name = "generator.build_dataset",
        err,
        skip(self, plan, rng),
        fields(users = plan.users, transactions = plan.transactions),
    )]
    pub fn build_dataset_with_rng<R: Rng + ?Sized>(
        &self,
        plan: &GenerationPlan,
        rng: &mut R,
    ) -> Result<SyntheticDataset> {
        let user_probability =
            family_probability("users", self.user_scales, plan.user_density, plan.users);
        let mut users_factory = UserFactory::new(SharingEngine::new(
            user_probability,
            self.max_group_size,
        ));
        let users: Vec<User> = (0..plan.users)
            .map(|index| users_factory.create(index, rng))
            .collect();
        let mut engine = users_factory.into_engine();
        if engine.seed_if_disconnected(
            users.first().map(|user| &user.id),
            users.get(1).map(|user| &user.id),
            plan.user_density,
        ) {
            warn!(family = "users", "sharing produced no edges, seeded one");
        }
        let shared_edges = engine.finish();

        let (transactions, transaction_edges, transaction_probability) =
            if plan.transactions == 0 {
                (Vec::new(), Vec::new(), 0.0)
            } else {
                self.build_transactions(plan, rng)?
            };

        Ok(SyntheticDataset {
            users,
            transactions,
            shared_edges,
            transaction_edges,
            effective_user_probability: user_probability,
            effective_transaction_probability: transaction_probability,
        })
    }

    fn build_transactions<R: Rng + ?Sized>(
        &self,
        plan: &GenerationPlan,
        rng: &mut R,
    ) -> Result<(Vec<Transaction>, Vec<SharedEdge>, f64)> {
        let probability = family_probability(
            "transactions",
            self.transaction_scales,
            plan.transaction_density,
            plan.transactions,
        );
        let mut factory = TransactionFactory::new(
            SharingEngine::new(probability, self.max_group_size),
            plan.users,
        )?;
        let transactions: Vec<Transaction> = (0..plan.transactions)
            .map(|index| factory.create(index, rng))
            .collect();
        let mut engine = factory.into_engine();
        if engine.seed_if_disconnected(
            transactions.first().map(|transaction| &transaction.id),
            transactions.get(1).map(|transaction| &transaction.id),
            plan.transaction_density,
        ) {
            warn!(family = "transactions", "sharing produced no edges, seeded one");
        }
        Ok((transactions, engine.finish(), probability))
    }

    /// Plans, builds, loads and summarises one run.
    ///
    /// # Errors
    /// Returns [`GenerationError::InsufficientUsers`] when transactions are
    /// planned for fewer than two users and [`GenerationError::Store`] when a
    /// batch fails.
    pub fn run<S>(&self, request: &GenerationRequest, store: &S) -> Result<GenerationSummary>
    where
        S: GraphStore + Sync + ?Sized,
    {
        self.run_with_report(request, store)
            .map(|(summary, _report)| summary)
    }

    /// Like [`Generator::run`], also returning the per-phase batch counts.
    ///
    /// # Errors
    /// See [`Generator::run`].
    #[instrument(
        name = "generator.run",
        err,
        skip(self, request, store),
        fields(users = field::Empty, transactions = field::Empty),
    )]
    pub fn run_with_report<S>(
        &self,
        request: &GenerationRequest,
        store: &S,
    ) -> Result<(GenerationSummary, LoadReport)>
    where
        S: GraphStore + Sync + ?Sized,
    {
        let plan = self.plan(request);
        let span = Span::current();
        span.record("users", plan.users);
        span.record("transactions", plan.transactions);
        let dataset = self.build_dataset(&plan)?;
        let report = self.loader.load(store, &dataset)?;
        let summary = GenerationSummary::from_dataset(&plan, &dataset);
        info!(
            users = summary.users_generated,
            transactions = summary.transactions_generated,
            shared_edges = summary.shared_edge_count,
            transaction_edges = summary.transaction_edge_count,
            batches = report.store_operations(),
            "generation completed"
        );
        Ok((summary, report))
    }
}

#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "counts are finite, positive and truncated on purpose"
)]
fn resolve_count(raw: Option<f64>, default: usize, min: usize, max: usize) -> usize {
    let requested = match raw {
        Some(value) if value.is_finite() && value > 0.0 => value.trunc() as usize,
        _ => default,
    };
    requested.clamp(min, max)
}

fn resolve_density(specific: Option<f64>, fallback: Option<f64>, default: f64) -> f64 {
    [specific, fallback]
        .into_iter()
        .flatten()
        .find(|value| value.is_finite())
        .unwrap_or(default)
        .clamp(0.0, 1.0)
}

fn family_probability(
    family: &'static str,
    scales: DensityScales,
    density: f64,
    count: usize,
) -> f64 {
    let probability = scales.probability(density, count);
    let by_density = density.clamp(0.0, 1.0) * scales.density_scale;
    if probability < by_density {
        warn!(
            family,
            requested = density,
            effective = probability,
            "volume cap lowered the sharing probability"
        );
    }
    probability
}
