//! Fraudnet core library.
//!
//! Generates synthetic fraud networks (users, transactions and the sparse
//! attribute-sharing edges between them) and loads them into a graph store
//! in idempotent batches.
#![cfg_attr(docsrs, feature(doc_cfg))]

mod density;
mod edges;
mod entity;
mod error;
mod factory;
mod generator;
mod loader;
mod sharing;
mod store;

#[cfg(test)]
mod test_utils;

pub use crate::{
    density::{DensityScales, effective_probability},
    edges::{EdgeAccumulator, EdgeError, ReasonTag, SharedEdge},
    entity::{EntityId, EntityKind, Transaction, User},
    error::{GenerationError, GenerationErrorCode, Result, StoreError, StoreErrorCode},
    factory::{PAYMENT_METHODS, TransactionFactory, UserFactory},
    generator::{
        GenerationLimits, GenerationPlan, GenerationRequest, GenerationSummary, Generator,
        GeneratorBuilder, SyntheticDataset,
    },
    loader::{BatchLoader, DEFAULT_BATCH_SIZE, LoadPhase, LoadReport, LoadStrategy},
    sharing::{Assignment, GroupList, MAX_GROUP_SIZE, SharingEngine, SharingGroup},
    store::{
        GraphStore, LinkRecord, MemoryGraphStore, RelationshipKind, RelationshipRecord,
        StoreResult, StoreSnapshot,
    },
};
