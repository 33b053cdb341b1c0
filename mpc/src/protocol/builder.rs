use ff::Field;

use crate::suite::ProtocolSuite;

use super::{
    gates::{
        CheckpointGate, InputGate, LinearGate, LocalGate, MulGate, OpenGate, OutputGate,
        PublicMapGate, RandomBitGate,
    },
    Gate, NodeId, ProtocolGraph, PublicWire, SecretWire,
};

/// Statistical security parameter used when not configured explicitly.
pub const DEFAULT_SECURITY_PARAMETER: usize = 80;

/// Kind of composite node created by a scope.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ScopeKind {
    Sequential,
    Parallel,
}

struct Scope {
    kind: ScopeKind,
    children: Vec<NodeId>,
}

/// Circuit ready to be evaluated by [`crate::executor::MpcExecutor`].
pub struct Circuit<S: ProtocolSuite> {
    pub(crate) graph: ProtocolGraph<S>,
    pub(crate) root: NodeId,
    pub(crate) num_secret_wires: usize,
    pub(crate) num_public_wires: usize,
}

impl<S: ProtocolSuite> Circuit<S> {
    /// Total number of nodes, including composite ones.
    pub fn num_nodes(&self) -> usize {
        self.graph.len()
    }
}

/// Builder of circuits with lexically scoped ordering constraints.
///
/// Gates are attached to the innermost open scope. The outermost scope is sequential,
/// so gates added without any explicit scope are evaluated one after another.
pub struct CircuitBuilder<S: ProtocolSuite> {
    graph: ProtocolGraph<S>,
    scopes: Vec<Scope>,
    num_secret_wires: usize,
    num_public_wires: usize,
    security_parameter: usize,
}

impl<S: ProtocolSuite> CircuitBuilder<S> {
    /// Create builder with default security parameter.
    pub fn new() -> Self {
        Self::with_security_parameter(DEFAULT_SECURITY_PARAMETER)
    }

    /// Create builder whose derived protocols use given statistical security parameter.
    pub fn with_security_parameter(security_parameter: usize) -> Self {
        Self {
            graph: ProtocolGraph::new(),
            scopes: vec![Scope {
                kind: ScopeKind::Sequential,
                children: Vec::new(),
            }],
            num_secret_wires: 0,
            num_public_wires: 0,
            security_parameter,
        }
    }

    /// Statistical security parameter for masking protocols.
    pub fn security_parameter(&self) -> usize {
        self.security_parameter
    }

    pub fn begin_sequential_scope(&mut self) {
        self.begin_scope(ScopeKind::Sequential);
    }

    pub fn begin_parallel_scope(&mut self) {
        self.begin_scope(ScopeKind::Parallel);
    }

    fn begin_scope(&mut self, kind: ScopeKind) {
        self.scopes.push(Scope {
            kind,
            children: Vec::new(),
        });
    }

    /// Seal innermost scope into a composite node and attach it to the enclosing scope.
    pub fn end_scope(&mut self) -> NodeId {
        if self.scopes.len() <= 1 {
            panic!("end_scope called without matching begin");
        }
        let id = self.seal_innermost();
        self.attach(id);
        id
    }

    fn seal_innermost(&mut self) -> NodeId {
        let scope = self.scopes.pop().expect("Scope stack is empty");
        match scope.kind {
            ScopeKind::Sequential => self.graph.add_sequential(scope.children),
            ScopeKind::Parallel => self.graph.add_parallel(scope.children),
        }
    }

    fn attach(&mut self, id: NodeId) {
        self.scopes
            .last_mut()
            .expect("Scope stack is empty")
            .children
            .push(id);
    }

    /// Build part of circuit inside a sequential scope.
    pub fn seq<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        self.begin_sequential_scope();
        let result = f(self);
        self.end_scope();
        result
    }

    /// Build part of circuit inside a parallel scope.
    pub fn par<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        self.begin_parallel_scope();
        let result = f(self);
        self.end_scope();
        result
    }

    /// Finish construction.
    pub fn build(mut self) -> Circuit<S> {
        if self.scopes.len() != 1 {
            panic!("{} scope(s) left open", self.scopes.len() - 1);
        }
        let root = self.seal_innermost();
        Circuit {
            graph: self.graph,
            root,
            num_secret_wires: self.num_secret_wires,
            num_public_wires: self.num_public_wires,
        }
    }

    /// Attach custom atomic gate to current scope.
    pub fn push_gate(&mut self, gate: impl Gate<S> + 'static) -> NodeId {
        let id = self.graph.add_atomic(Box::new(gate));
        self.attach(id);
        id
    }

    /// Allocate a new secret wire.
    pub fn secret_wire(&mut self) -> SecretWire {
        self.num_secret_wires += 1;
        SecretWire(self.num_secret_wires - 1)
    }

    /// Allocate a new public wire.
    pub fn public_wire(&mut self) -> PublicWire {
        self.num_public_wires += 1;
        PublicWire(self.num_public_wires - 1)
    }

    /// Share private input of party `owner`.
    /// If `party_id() != owner`, then `value` should be None.
    pub fn input(&mut self, owner: usize, value: Option<S::Field>) -> SecretWire {
        let out = self.secret_wire();
        self.push_gate(InputGate::<S> {
            owner,
            value,
            out,
            state: None,
        });
        out
    }

    /// Sharing of a public constant.
    pub fn known(&mut self, value: S::Field) -> SecretWire {
        self.linear(&[], value)
    }

    /// Public linear combination of shared values plus constant. No communication.
    pub fn linear(&mut self, terms: &[(S::Field, SecretWire)], constant: S::Field) -> SecretWire {
        let out = self.secret_wire();
        self.push_gate(LinearGate::<S> {
            terms: terms.to_vec(),
            constant,
            out,
        });
        out
    }

    pub fn add(&mut self, a: SecretWire, b: SecretWire) -> SecretWire {
        self.linear(&[(S::Field::one(), a), (S::Field::one(), b)], S::Field::zero())
    }

    pub fn sub(&mut self, a: SecretWire, b: SecretWire) -> SecretWire {
        self.linear(&[(S::Field::one(), a), (-S::Field::one(), b)], S::Field::zero())
    }

    /// Multiply shared value by public constant.
    pub fn scale(&mut self, a: SecretWire, k: S::Field) -> SecretWire {
        self.linear(&[(k, a)], S::Field::zero())
    }

    /// Add public constant to shared value.
    pub fn add_public(&mut self, a: SecretWire, k: S::Field) -> SecretWire {
        self.linear(&[(S::Field::one(), a)], k)
    }

    /// Add value of public wire to shared value.
    pub fn add_opened(&mut self, a: SecretWire, k: PublicWire) -> SecretWire {
        self.local(&[a], &[k], |suite, secrets, publics| {
            suite.add_public(secrets[0], publics[0])
        })
    }

    /// Multiply shared values. Cost: 1 Beaver triple, 1 communication round.
    pub fn mul(&mut self, a: SecretWire, b: SecretWire) -> SecretWire {
        let out = self.secret_wire();
        self.push_gate(MulGate::<S> {
            a,
            b,
            out,
            state: None,
        });
        out
    }

    /// Sharing of a preprocessed random bit.
    pub fn random_bit(&mut self) -> SecretWire {
        let out = self.secret_wire();
        self.push_gate(RandomBitGate { out });
        out
    }

    /// Open shared value to all parties. Requires communication.
    /// Warning: integrity of opened value is checked only at the next checkpoint.
    pub fn open(&mut self, a: SecretWire) -> PublicWire {
        let out = self.public_wire();
        self.push_gate(OpenGate::<S> {
            input: a,
            out,
            share: None,
        });
        out
    }

    /// Open shared value to `receiver` only. Requires communication.
    pub fn open_to(&mut self, receiver: usize, a: SecretWire) -> PublicWire {
        let out = self.public_wire();
        self.push_gate(OutputGate::<S> {
            receiver,
            input: a,
            out,
            state: None,
        });
        out
    }

    /// Arbitrary local computation over shared and public values.
    pub fn local<F>(&mut self, secrets: &[SecretWire], publics: &[PublicWire], func: F) -> SecretWire
    where
        F: Fn(&S, &[S::Share], &[S::Field]) -> S::Share + 'static,
    {
        let out = self.secret_wire();
        self.push_gate(LocalGate::<S> {
            secrets: secrets.to_vec(),
            publics: publics.to_vec(),
            func: Box::new(func),
            out,
        });
        out
    }

    /// Local computation over public values.
    pub fn map_public<F>(&mut self, inputs: &[PublicWire], func: F) -> PublicWire
    where
        F: Fn(&[S::Field]) -> S::Field + 'static,
    {
        let out = self.public_wire();
        self.push_gate(PublicMapGate::<S> {
            inputs: inputs.to_vec(),
            func: Box::new(func),
            out,
        });
        out
    }

    /// Verify integrity of all values opened so far before continuing.
    pub fn ensure_integrity(&mut self) {
        self.push_gate(CheckpointGate);
    }
}

impl<S: ProtocolSuite> Default for CircuitBuilder<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockSuite;

    #[test]
    fn test_scopes_are_nested() {
        let mut b = CircuitBuilder::<MockSuite>::new();
        let x = b.par(|b| {
            let x = b.random_bit();
            b.seq(|b| {
                b.random_bit();
                b.random_bit();
            });
            x
        });
        b.add(x, x);
        let circuit = b.build();
        // 4 gates + 2 scopes + root
        assert_eq!(circuit.num_nodes(), 7);
        assert_eq!(circuit.num_secret_wires, 4);
    }

    #[test]
    #[should_panic(expected = "end_scope called without matching begin")]
    fn test_unmatched_end_scope() {
        let mut b = CircuitBuilder::<MockSuite>::new();
        b.random_bit();
        b.end_scope();
    }

    #[test]
    #[should_panic(expected = "scope(s) left open")]
    fn test_unclosed_scope() {
        let mut b = CircuitBuilder::<MockSuite>::new();
        b.begin_parallel_scope();
        b.random_bit();
        b.build();
    }
}
