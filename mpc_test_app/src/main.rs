mod circuits;

use std::{error::Error, path::PathBuf};

use argh::FromArgs;
use futures::future::join_all;
use mpc::{
    config::RunConfig,
    executor::{MpcExecutionStats, MpcExecutor},
    fields::Fp255,
    protocol::CircuitBuilder,
    spdz::{FakeSpdzDealer, SpdzDataSupplier, SpdzDealer, SpdzResourcePool, SpdzShare},
    storage::InMemoryStorage,
    transport::{mock_multiparty_channels, Network},
    MpcError, MpcField,
};
use mpc_numeric::DivisionParams;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::circuits::{check_operands, private_division, DIVIDEND_OWNER, DIVISOR_OWNER};

type Fp = Fp255;

const CHANNEL_BUFFER: usize = 1 << 16;
const FAKE_DEALER_SEED: u8 = 123;

#[derive(FromArgs)]
/// Private division between parties running in a single process.
struct Options {
    /// number of parties, at least 2
    #[argh(option, default = "3")]
    parties: usize,

    /// dividend provided by party 0
    #[argh(option, default = "313222110")]
    dividend: u64,

    /// divisor provided by party 1
    #[argh(option, default = "1110")]
    divisor: u64,

    /// run configuration (JSON)
    #[argh(option)]
    config: Option<PathBuf>,

    /// preprocessing files generated by the dealer ('#' is replaced with party ID);
    /// insecure fake dealer is used if not provided
    #[argh(option)]
    preprocessing: Option<String>,
}

/// Outcome of a single party: quotient and remainder if revealed, execution stats.
type PartyResult = (Option<Fp>, Option<Fp>, MpcExecutionStats);

async fn run_party<D, N>(
    options: &Options,
    config: &RunConfig,
    params: DivisionParams,
    dealer: D,
    network: N,
) -> Result<PartyResult, MpcError>
where
    D: SpdzDealer<Field = Fp, Share = SpdzShare<Fp>> + 'static,
    N: Network + 'static,
{
    let party_id = network.party_id();
    let mut builder = CircuitBuilder::with_security_parameter(config.security_parameter);
    let wires = private_division(
        &mut builder,
        (party_id == DIVIDEND_OWNER).then(|| options.dividend.into()),
        (party_id == DIVISOR_OWNER).then(|| options.divisor.into()),
        params,
    );
    let circuit = builder.build();

    let mut pool = SpdzResourcePool::new(dealer, network, config.security_parameter)?;
    let (outputs, stats) = MpcExecutor::from_config(config).run(circuit, &mut pool).await?;

    Ok((outputs.get(wires.quotient), outputs.get(wires.remainder), stats))
}

async fn run_all(
    options: &Options,
    config: &RunConfig,
    params: DivisionParams,
) -> Result<Vec<PartyResult>, Box<dyn Error>> {
    let networks = mock_multiparty_channels::<Vec<u8>>(options.parties, CHANNEL_BUFFER);

    let results = match &options.preprocessing {
        Some(pattern) => {
            let mut parties = Vec::with_capacity(options.parties);
            for network in networks {
                let party_id = network.party_id();
                let storage = InMemoryStorage::load_file(pattern.replace('#', &format!("{party_id}")))?;
                let dealer = SpdzDataSupplier::<Fp, _>::new(
                    storage,
                    config.storage_prefix.clone(),
                    options.parties,
                    party_id,
                );
                parties.push(run_party(options, config, params, dealer, network));
            }
            join_all(parties).await
        }
        None => {
            warn!("using insecure fake dealer");
            let parties = networks.into_iter().map(|network| {
                let dealer = FakeSpdzDealer::new(options.parties, network.party_id(), FAKE_DEALER_SEED);
                run_party(options, config, params, dealer, network)
            });
            join_all(parties).await
        }
    };

    Ok(results.into_iter().collect::<Result<_, _>>()?)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let options: Options = argh::from_env();
    if options.parties < 2 {
        return Err("at least 2 parties are required".into());
    }
    let params = DivisionParams::default();
    check_operands(options.dividend, options.divisor, &params)?;
    let config = match &options.config {
        Some(path) => RunConfig::load(path)?,
        None => RunConfig::default(),
    };

    let results = run_all(&options, &config, params).await?;
    for (party_id, (quotient, remainder, stats)) in results.iter().enumerate() {
        info!(
            party_id,
            quotient = ?quotient.map(|q| q.to_u128()),
            remainder = ?remainder.map(|r| r.to_u128()),
            rounds = stats.rounds,
            network_rounds = stats.network_rounds,
            triples = stats.preprocessing.triples,
            bits = stats.preprocessing.bits,
            "party finished"
        );
    }

    let (quotient, _, _) = &results[0];
    if quotient.is_none() || results.iter().any(|(other, _, _)| other != quotient) {
        return Err("parties disagree on quotient".into());
    }
    Ok(())
}
