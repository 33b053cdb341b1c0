use std::str::FromStr;

use argh::FromArgs;
use mpc::{
    fields::{Fp255, Mersenne127},
    spdz::{generate_preprocessing, PreprocessingCounts},
    storage::StorageError,
    MpcField,
};
use rand::{prelude::StdRng, SeedableRng};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Field type for preprocessing.
enum FieldType {
    Mersenne127,
    Fp255,
}

impl FromStr for FieldType {
    type Err = &'static str;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "127" => Ok(FieldType::Mersenne127),
            "255" => Ok(FieldType::Fp255),
            _ => Err("Unsupported field type. Available options: 127, 255"),
        }
    }
}

#[derive(FromArgs)]
/// SPDZ offline preprocessing tool.
struct Options {
    /// number of parties participating in protocol
    #[argh(option)]
    parties: usize,

    /// output path pattern ('#' is replaced with party ID)
    #[argh(option)]
    output: String,

    /// target field
    #[argh(option, default = "FieldType::Mersenne127")]
    field: FieldType,

    /// prefix of storage keys, shared with run configuration
    #[argh(option, default = "String::new()")]
    prefix: String,

    /// number of beaver triples to be generated
    #[argh(option)]
    beaver_triples: usize,

    /// number of random bits to be generated
    #[argh(option)]
    random_bits: usize,

    /// number of input masks to be generated for each party
    #[argh(option)]
    input_masks: usize,

    /// number of exponentiation pipes to be generated
    #[argh(option, default = "0")]
    exp_pipes: usize,

    /// highest power contained in exponentiation pipes
    #[argh(option, default = "8")]
    exp_pipe_length: usize,
}

fn run<T: MpcField>(options: Options) -> Result<(), StorageError> {
    info!(parties = options.parties, "generating preprocessed data");
    let counts = PreprocessingCounts {
        triples: options.beaver_triples,
        bits: options.random_bits,
        input_masks: options.input_masks,
        exp_pipes: options.exp_pipes,
        exp_pipe_length: options.exp_pipe_length,
    };
    let storages = generate_preprocessing::<T, _>(
        options.parties,
        &options.prefix,
        &counts,
        StdRng::from_entropy(),
    )?;

    for (id, storage) in storages.into_iter().enumerate() {
        let output_path = options.output.replace('#', &format!("{id}"));
        info!(party_id = id, path = %output_path, "saving");
        storage.save_file(output_path)?;
    }
    Ok(())
}

fn main() -> Result<(), StorageError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let options: Options = argh::from_env();
    match options.field {
        FieldType::Mersenne127 => run::<Mersenne127>(options),
        FieldType::Fp255 => run::<Fp255>(options),
    }
}
