//! Helpers for testing circuits, either in plain on a single node or with SPDZ over mock channels.

use futures::future::join_all;

use crate::{
    executor::{MpcExecutionStats, MpcExecutor},
    fields::Fp255,
    plaintext::PlainSuite,
    protocol::{CircuitBuilder, MpcOutputs, DEFAULT_SECURITY_PARAMETER},
    spdz::{FakeSpdzDealer, SpdzResourcePool},
    transport::{mock_multiparty_channels, BincodeDuplex, MultipartyTransport},
    MpcError,
};

pub type MockField = Fp255;
pub type MockSuite = PlainSuite<MockField>;
pub type MockNetwork = MultipartyTransport<Vec<u8>, BincodeDuplex<Vec<u8>>>;
pub type SpdzTestPool = SpdzResourcePool<MockField, FakeSpdzDealer<MockField>, MockNetwork>;

const MOCK_CHANNEL_BUFFER: usize = 1 << 16;
const FAKE_DEALER_SEED: u8 = 123;

/// Result of a plaintext test run.
pub struct TestRun<T> {
    /// Value returned by the circuit-building closure.
    pub wires: T,
    pub outputs: MpcOutputs<MockField>,
    pub stats: MpcExecutionStats,
    pub suite: MockSuite,
}

/// Result of a single party in a multiparty test run.
pub struct PartyRun<T> {
    pub wires: T,
    pub outputs: MpcOutputs<MockField>,
    pub stats: MpcExecutionStats,
}

/// Build circuit and evaluate it in plain.
pub async fn test_circuit<T>(build: impl FnOnce(&mut CircuitBuilder<MockSuite>) -> T) -> TestRun<T> {
    let mut builder = CircuitBuilder::new();
    let wires = build(&mut builder);
    let mut suite = MockSuite::new();
    let (outputs, stats) = MpcExecutor::default()
        .run(builder.build(), &mut suite)
        .await
        .expect("Circuit evaluation failed");
    TestRun {
        wires,
        outputs,
        stats,
        suite,
    }
}

/// Evaluate circuit with SPDZ on `num_parties` parties connected with in-process channels.
/// Circuit of each party is built by `build(party_id, builder)`. Results are indexed by party ID.
pub async fn run_spdz_parties<T, F>(num_parties: usize, build: F) -> Vec<Result<PartyRun<T>, MpcError>>
where
    F: Fn(usize, &mut CircuitBuilder<SpdzTestPool>) -> T,
{
    let executor = MpcExecutor::default();
    let transports = mock_multiparty_channels::<Vec<u8>>(num_parties, MOCK_CHANNEL_BUFFER);
    let parties = transports.into_iter().enumerate().map(|(id, network)| {
        let mut builder = CircuitBuilder::new();
        let wires = build(id, &mut builder);
        let circuit = builder.build();
        let executor = &executor;
        async move {
            let dealer = FakeSpdzDealer::new(num_parties, id, FAKE_DEALER_SEED);
            let mut pool = SpdzResourcePool::new(dealer, network, DEFAULT_SECURITY_PARAMETER)?;
            let (outputs, stats) = executor.run(circuit, &mut pool).await?;
            Ok::<_, MpcError>(PartyRun {
                wires,
                outputs,
                stats,
            })
        }
    });
    join_all(parties).await
}
