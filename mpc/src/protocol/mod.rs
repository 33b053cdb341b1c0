//! Circuits as graphs of atomic gates grouped into sequential and parallel nodes.

mod builder;
mod gates;
mod graph;
mod round;
mod wires;

pub use builder::{Circuit, CircuitBuilder, ScopeKind, DEFAULT_SECURITY_PARAMETER};
pub use gates::{Gate, LocalFn, PublicFn};
pub use graph::{NodeId, ProtocolGraph};
pub use round::RoundMessages;
pub use wires::{MpcOutputs, PublicSlot, PublicWire, SecretWire, WireStore};
