//! User and transaction factories.
//!
//! Factories derive deterministic default attributes from the entity index
//! and route every shareable attribute through the family's
//! [`SharingEngine`].

use rand::{Rng, distributions::Standard};

use crate::{
    edges::ReasonTag,
    entity::{EntityId, EntityKind, Transaction, User},
    error::{GenerationError, Result},
    sharing::SharingEngine,
};

/// Payment methods cycled through by default, indexed by `i % 4`.
pub const PAYMENT_METHODS: [&str; 4] = ["credit_card", "debit_card", "bank_transfer", "UPI"];

/// Builds users `u_0`, `u_1`, … sharing email, phone, address and payment
/// method through one engine.
#[derive(Debug)]
pub struct UserFactory {
    engine: SharingEngine,
}

impl UserFactory {
    /// Wraps the engine that will drive user attribute sharing.
    #[must_use]
    pub fn new(engine: SharingEngine) -> Self {
        Self { engine }
    }

    /// Builds the `index`-th user.
    pub fn create<R: Rng + ?Sized>(&mut self, index: usize, rng: &mut R) -> User {
        let id = EntityId::for_index(EntityKind::User, index);
        let email = self.engine.assign_value(
            rng,
            &id,
            default_email(index),
            ReasonTag::Email,
        );
        let phone = self.engine.assign_value(
            rng,
            &id,
            default_phone(index),
            ReasonTag::Phone,
        );
        let address = self.engine.assign_value(
            rng,
            &id,
            format!("Address {index}"),
            ReasonTag::Address,
        );
        let payment_methods = self.engine.assign_value(
            rng,
            &id,
            default_payment_method(index).to_owned(),
            ReasonTag::PaymentMethods,
        );
        User {
            id,
            name: format!("User{index}"),
            email,
            phone,
            address,
            payment_methods,
        }
    }

    /// Returns the engine holding the accumulated user edges.
    #[must_use]
    pub fn into_engine(self) -> SharingEngine {
        self.engine
    }
}

/// Builds transactions `t_0`, `t_1`, … between distinct users, sharing IP and
/// device identifiers through one engine.
#[derive(Debug)]
pub struct TransactionFactory {
    engine: SharingEngine,
    user_count: usize,
}

impl TransactionFactory {
    /// Wraps the engine and fixes the user population senders and receivers
    /// are drawn from.
    ///
    /// # Errors
    /// Returns [`GenerationError::InsufficientUsers`] when fewer than two
    /// users exist, since sender and receiver must differ.
    pub fn new(engine: SharingEngine, user_count: usize) -> Result<Self> {
        if user_count < 2 {
            return Err(GenerationError::InsufficientUsers { users: user_count });
        }
        Ok(Self { engine, user_count })
    }

    /// Builds the `index`-th transaction.
    pub fn create<R: Rng + ?Sized>(&mut self, index: usize, rng: &mut R) -> Transaction {
        let id = EntityId::for_index(EntityKind::Transaction, index);
        let sender = rng.gen_range(0..self.user_count);
        let mut receiver = rng.gen_range(0..self.user_count);
        if receiver == sender {
            receiver = (receiver + 1) % self.user_count;
        }
        let amount = random_amount(rng);
        let ip = self
            .engine
            .assign_value(rng, &id, default_ip(index), ReasonTag::Ip);
        let device_id = self.engine.assign_value(
            rng,
            &id,
            format!("dev_{}", index / 10),
            ReasonTag::DeviceId,
        );
        Transaction {
            id,
            sender_id: EntityId::for_index(EntityKind::User, sender),
            receiver_id: EntityId::for_index(EntityKind::User, receiver),
            amount,
            ip,
            device_id,
        }
    }

    /// Returns the engine holding the accumulated transaction edges.
    #[must_use]
    pub fn into_engine(self) -> SharingEngine {
        self.engine
    }
}

fn default_email(index: usize) -> String {
    format!("user{index}@example.com")
}

/// Last seven digits of the zero-padded index.
fn default_phone(index: usize) -> String {
    format!("+1-555-{:07}", index % 10_000_000)
}

fn default_payment_method(index: usize) -> &'static str {
    PAYMENT_METHODS[index % PAYMENT_METHODS.len()]
}

fn default_ip(index: usize) -> String {
    format!(
        "10.{}.{}.{}",
        index / 10_000,
        (index / 100) % 100,
        index % 100
    )
}

/// Uniform amount in `[0, 1000)` rounded to cents.
#[expect(
    clippy::float_arithmetic,
    reason = "amounts are rounded to two decimal places"
)]
fn random_amount<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let draw: f64 = rng.sample(Standard);
    let cents = (draw * 100_000.0).floor().min(99_999.0);
    cents / 100.0
}
