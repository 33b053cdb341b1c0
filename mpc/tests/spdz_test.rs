use ff::Field;
use futures::future::join_all;
use mpc::{
    circuits,
    executor::MpcExecutor,
    protocol::CircuitBuilder,
    spdz::{
        generate_preprocessing, PreprocessingCounts, SpdzDataSupplier, SpdzResourcePool,
        SpdzShare,
    },
    storage::InMemoryStorage,
    testing::{run_spdz_parties, MockField, MockNetwork},
    transport::mock_multiparty_channels,
    MpcError,
};
use rand::{rngs::StdRng, SeedableRng};
use tracing_subscriber::EnvFilter;

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[tokio::test]
async fn test_inputs_of_all_parties() {
    init_logging();
    let runs = run_spdz_parties(3, |id, b| {
        let inputs = b.par(|b| {
            (0..3)
                .map(|owner| {
                    let value = (owner == id).then(|| MockField::from(10 * (owner as u64 + 1)));
                    b.input(owner, value)
                })
                .collect::<Vec<_>>()
        });
        let total = circuits::sum(b, &inputs);
        b.open(total)
    })
    .await;

    for run in runs {
        let run = run.unwrap();
        assert_eq!(run.outputs.get(run.wires), Some(MockField::from(60)));
        assert_eq!(run.stats.preprocessing.input_masks, vec![1, 1, 1]);
    }
}

#[tokio::test]
async fn test_multiply_and_add() {
    init_logging();
    let runs = run_spdz_parties(3, |id, b| {
        let x = b.input(0, (id == 0).then(|| MockField::from(10)));
        let y = b.input(1, (id == 1).then(|| MockField::from(4)));
        let (sum, product) = b.par(|b| (b.add(x, y), b.mul(x, y)));
        b.par(|b| (b.open(sum), b.open(product)))
    })
    .await;

    for run in runs {
        let run = run.unwrap();
        let (sum, product) = run.wires;
        assert_eq!(run.outputs.get(sum), Some(MockField::from(14)));
        assert_eq!(run.outputs.get(product), Some(MockField::from(40)));
        assert_eq!(run.stats.preprocessing.triples, 1);
        assert_eq!(run.stats.integrity_checks, 1);
    }
}

#[tokio::test]
async fn test_parallel_multiplications_use_one_triple_each() {
    init_logging();
    let runs = run_spdz_parties(3, |id, b| {
        let (x, y) = b.par(|b| {
            (
                b.input(0, (id == 0).then(|| MockField::from(3))),
                b.input(2, (id == 2).then(|| MockField::from(5))),
            )
        });
        let products = b.par(|b| (0..10).map(|_| b.mul(x, y)).collect::<Vec<_>>());
        b.par(|b| products.iter().map(|&p| b.open(p)).collect::<Vec<_>>())
    })
    .await;

    for run in runs {
        let run = run.unwrap();
        for result in run.outputs.get_all(&run.wires) {
            assert_eq!(result, Some(MockField::from(15)));
        }
        assert_eq!(run.stats.preprocessing.triples, 10);
        // inputs, multiplications, openings
        assert_eq!(run.stats.network_rounds, 3);
    }
}

#[tokio::test]
async fn test_unknown_party_is_error() {
    init_logging();
    let inputs = run_spdz_parties(3, |_, b| b.input(5, None)).await;
    for run in inputs {
        assert!(matches!(run, Err(MpcError::UnknownParty(5))));
    }

    let outputs = run_spdz_parties(3, |_, b| {
        let x = b.known(MockField::one());
        b.open_to(7, x)
    })
    .await;
    for run in outputs {
        assert!(matches!(run, Err(MpcError::UnknownParty(7))));
    }
}

#[tokio::test]
async fn test_output_to_single_party() {
    init_logging();
    let runs = run_spdz_parties(3, |id, b| {
        let secret = b.input(2, (id == 2).then(|| MockField::from(1337)));
        b.open_to(1, secret)
    })
    .await;

    let outputs: Vec<_> = runs
        .into_iter()
        .map(|run| {
            let run = run.unwrap();
            run.outputs.get(run.wires)
        })
        .collect();
    assert_eq!(outputs, vec![None, Some(MockField::from(1337)), None]);
}

#[tokio::test]
async fn test_tampered_share_is_detected() {
    init_logging();
    let runs = run_spdz_parties(3, |id, b| {
        let x = b.input(0, (id == 0).then(|| MockField::from(5)));
        let x = b.local(&[x], &[], move |_, secrets, _| {
            if id == 1 {
                secrets[0] + SpdzShare::new(MockField::one(), MockField::zero())
            } else {
                secrets[0]
            }
        });
        b.open(x)
    })
    .await;

    for run in runs {
        assert!(matches!(run, Err(MpcError::MacCheckFailed { openings: 1 })));
    }
}

#[tokio::test]
async fn test_checkpoint_runs_mac_check() {
    init_logging();
    let runs = run_spdz_parties(2, |id, b| {
        let x = b.input(1, (id == 1).then(|| MockField::from(9)));
        let first = b.open(x);
        b.ensure_integrity();
        let y = b.mul(x, x);
        (first, b.open(y))
    })
    .await;

    for run in runs {
        let run = run.unwrap();
        let (first, second) = run.wires;
        assert_eq!(run.outputs.get(first), Some(MockField::from(9)));
        assert_eq!(run.outputs.get(second), Some(MockField::from(81)));
        assert_eq!(run.stats.integrity_checks, 2);
    }
}

type StoragePool =
    SpdzResourcePool<MockField, SpdzDataSupplier<MockField, InMemoryStorage>, MockNetwork>;

fn generated_storages(num_parties: usize, triples: usize) -> Vec<InMemoryStorage> {
    let counts = PreprocessingCounts {
        triples,
        input_masks: 2,
        ..Default::default()
    };
    generate_preprocessing::<MockField, _>(num_parties, "test_", &counts, StdRng::seed_from_u64(5))
        .unwrap()
}

async fn run_with_storages(
    storages: Vec<InMemoryStorage>,
) -> Vec<Result<Option<MockField>, MpcError>> {
    let num_parties = storages.len();
    let transports = mock_multiparty_channels::<Vec<u8>>(num_parties, 1 << 16);
    let parties = storages
        .into_iter()
        .zip(transports)
        .enumerate()
        .map(|(id, (storage, network))| async move {
            let mut b = CircuitBuilder::<StoragePool>::new();
            let x = b.input(0, (id == 0).then(|| MockField::from(6)));
            let y = b.input(1, (id == 1).then(|| MockField::from(7)));
            let product = b.mul(x, y);
            let opened = b.open(product);

            let supplier = SpdzDataSupplier::new(storage, "test_", num_parties, id);
            let mut pool = SpdzResourcePool::new(supplier, network, 80)?;
            let (outputs, _) = MpcExecutor::default().run(b.build(), &mut pool).await?;
            Ok::<_, MpcError>(outputs.get(opened))
        });
    join_all(parties).await
}

#[tokio::test]
async fn test_preprocessed_storage() {
    init_logging();
    for result in run_with_storages(generated_storages(2, 1)).await {
        assert_eq!(result.unwrap(), Some(MockField::from(42)));
    }
}

#[tokio::test]
async fn test_exhausted_storage_aborts_run() {
    init_logging();
    for result in run_with_storages(generated_storages(2, 0)).await {
        assert!(matches!(
            result,
            Err(MpcError::PreprocessingExhausted { index: 0, .. })
        ));
    }
}
