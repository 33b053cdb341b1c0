use tracing::{debug, info};

use crate::{
    config::RunConfig,
    protocol::{Circuit, MpcOutputs, RoundMessages, WireStore},
    suite::ProtocolSuite,
    MpcError, PreprocessingStats,
};

/// Statistics of a single circuit evaluation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MpcExecutionStats {
    /// Scheduler rounds, i.e. evaluated batches.
    pub rounds: usize,
    /// Rounds that required network exchange.
    pub network_rounds: usize,
    /// Atomic gates evaluated.
    pub gates: usize,
    /// Integrity checks performed, including the final one.
    pub integrity_checks: usize,
    /// Preprocessed material consumed during evaluation.
    pub preprocessing: PreprocessingStats,
}

/// MPC circuit executor.
///
/// Evaluation proceeds in rounds. Each round pulls a batch of ready gates, starts all of them,
/// performs at most one network exchange and finishes all of them before pulling the next batch.
#[derive(Clone, Debug)]
pub struct MpcExecutor {
    batch_size: usize,
}

impl MpcExecutor {
    /// Create executor that evaluates up to `batch_size` gates per round.
    pub fn new(batch_size: usize) -> Self {
        if batch_size == 0 {
            panic!("Batch size must be positive");
        }
        Self { batch_size }
    }

    /// Create executor from run configuration.
    pub fn from_config(config: &RunConfig) -> Self {
        Self::new(config.batch_size)
    }

    /// Evaluate circuit with given protocol suite.
    /// Outputs are returned only after all opened values passed the integrity check.
    pub async fn run<S: ProtocolSuite>(
        &self,
        circuit: Circuit<S>,
        suite: &mut S,
    ) -> Result<(MpcOutputs<S::Field>, MpcExecutionStats), MpcError> {
        let Circuit {
            mut graph,
            root,
            num_secret_wires,
            num_public_wires,
        } = circuit;

        let mut wires = WireStore::new(num_secret_wires, num_public_wires);
        let mut stats = MpcExecutionStats::default();
        let preprocessing_before = suite.preprocessing_stats();

        while !graph.is_done(root) {
            let batch = graph.pull(root, self.batch_size);
            if batch.is_empty() {
                panic!("Circuit execution stalled");
            }

            let mut round = RoundMessages::new(suite.party_id(), suite.num_parties());
            for &id in &batch {
                graph.gate_mut(id).begin(suite, &wires, &mut round)?;
            }

            if round.uses_network() {
                suite.exchange(&mut round).await?;
                stats.network_rounds += 1;
            }

            let mut needs_verification = false;
            for &id in &batch {
                let gate = graph.gate_mut(id);
                gate.finish(suite, &mut wires, &mut round)?;
                needs_verification |= gate.requests_verification();
                graph.mark_done(id);
            }

            if needs_verification {
                suite.verify().await?;
                stats.integrity_checks += 1;
            }

            debug!(round = stats.rounds, gates = batch.len(), "round finished");
            stats.rounds += 1;
            stats.gates += batch.len();
        }

        suite.verify().await?;
        stats.integrity_checks += 1;
        stats.preprocessing = consumed_since(&preprocessing_before, &suite.preprocessing_stats());

        info!(
            party_id = suite.party_id(),
            rounds = stats.rounds,
            network_rounds = stats.network_rounds,
            gates = stats.gates,
            "circuit evaluated"
        );
        Ok((wires.into_outputs(), stats))
    }
}

impl Default for MpcExecutor {
    fn default() -> Self {
        Self::from_config(&RunConfig::default())
    }
}

fn consumed_since(before: &PreprocessingStats, after: &PreprocessingStats) -> PreprocessingStats {
    PreprocessingStats {
        triples: after.triples - before.triples,
        bits: after.bits - before.bits,
        exp_pipes: after.exp_pipes - before.exp_pipes,
        input_masks: after
            .input_masks
            .iter()
            .zip(before.input_masks.iter().chain(std::iter::repeat(&0)))
            .map(|(after, before)| after - before)
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use ff::Field;

    use crate::{
        protocol::CircuitBuilder,
        testing::{test_circuit, MockField, MockSuite},
    };

    use super::*;

    #[tokio::test]
    async fn test_parallel_multiplications_share_round() {
        let run = test_circuit(|b| {
            let (x, y) = (b.known(3.into()), b.known(5.into()));
            let products = b.par(|b| (0..10).map(|_| b.mul(x, y)).collect::<Vec<_>>());
            b.par(|b| products.iter().map(|&p| b.open(p)).collect::<Vec<_>>())
        })
        .await;

        for &wire in &run.wires {
            assert_eq!(run.outputs.get(wire), Some(MockField::from(15)));
        }
        // mul round, open round
        assert_eq!(run.stats.network_rounds, 2);
        assert_eq!(run.stats.preprocessing.triples, 10);
        assert_eq!(run.stats.integrity_checks, 1);
    }

    #[tokio::test]
    async fn test_sequential_multiplications_take_separate_rounds() {
        let run = test_circuit(|b| {
            let x = b.known(2.into());
            let mut acc = b.known(MockField::one());
            for _ in 0..5 {
                acc = b.mul(acc, x);
            }
            b.open(acc)
        })
        .await;

        assert_eq!(run.outputs.get(run.wires), Some(MockField::from(32)));
        assert_eq!(run.stats.network_rounds, 6);
    }

    #[tokio::test]
    async fn test_batch_size_bounds_round() {
        let mut b = CircuitBuilder::<MockSuite>::new();
        let x = b.known(7.into());
        let opened = b.par(|b| (0..10).map(|_| b.open(x)).collect::<Vec<_>>());
        let circuit = b.build();

        let mut suite = MockSuite::new();
        let (outputs, stats) = MpcExecutor::new(4).run(circuit, &mut suite).await.unwrap();
        assert!(outputs.get_all(&opened).iter().all(|x| *x == Some(7.into())));
        // 1 local round, then 10 openings in batches of 4
        assert_eq!(stats.rounds, 4);
        assert_eq!(stats.network_rounds, 3);
    }

    #[tokio::test]
    async fn test_checkpoint_requests_verification() {
        let run = test_circuit(|b| {
            let x = b.known(7.into());
            let opened = b.open(x);
            b.ensure_integrity();
            opened
        })
        .await;
        assert_eq!(run.stats.integrity_checks, 2);
    }

    #[tokio::test]
    async fn test_unresolved_wire_is_error() {
        let mut b = CircuitBuilder::<MockSuite>::new();
        // Dependent gates placed in a parallel scope.
        b.par(|b| {
            let x = b.known(1.into());
            b.open(x);
        });
        let circuit = b.build();

        let mut suite = MockSuite::new();
        let result = MpcExecutor::default().run(circuit, &mut suite).await;
        assert!(matches!(result, Err(MpcError::UnresolvedWire(_))));
    }
}
