//! Immutable run model shared by the engine, the transport and the aggregator.
pub mod run;
