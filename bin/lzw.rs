#![forbid(unsafe_code)]
use std::path::PathBuf;
use std::{env, ffi, fs, io, process};

use trielzw::{compression_ratio, decode, encode, CodeWidth};

fn main() -> CodingResult {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    CodingResult::catch_panic(|| {
        let flags = Flags::from_args(env::args_os()).unwrap_or_else(|ParamError| explain());
        run_coding(flags)
    })
}

fn run_coding(flags: Flags) -> Result<(), io::Error> {
    let mut files = flags.files;
    let input = files.pop().unwrap_or_else(explain);
    if !files.is_empty() {
        return explain();
    }
    let operation = flags.operation.unwrap_or_else(explain);
    let max_bits = flags.max_bits;
    let width = flags.width;

    let out = io::stdout();
    let out = io::BufWriter::new(out.lock());

    let input: Box<dyn io::BufRead> = match input {
        Input::File(file) => {
            let data = fs::File::open(file)?;
            Box::new(io::BufReader::with_capacity(1 << 20, data))
        }
        Input::Stdin => Box::new(io::BufReader::with_capacity(1 << 20, io::stdin())),
    };

    let result = match operation {
        Operation::Encode => {
            let mut encoder = encode::Encoder::new(width, max_bits);
            let result = encoder.into_stream(out).encode_all(input);
            log::info!(
                "original: {} bytes, compressed: {} bytes, codes: {}, ratio: {:.3}",
                result.bytes_read,
                result.bytes_written,
                result.codes,
                compression_ratio(result.bytes_read, result.bytes_written)
            );
            result
        }
        Operation::Decode => {
            let mut decoder = decode::Decoder::new(width, max_bits);
            let result = decoder.into_stream(out).decode_all(input);
            log::info!(
                "compressed: {} bytes, decompressed: {} bytes, codes: {}, ratio: {:.3}",
                result.bytes_read,
                result.bytes_written,
                result.codes,
                compression_ratio(result.bytes_written, result.bytes_read)
            );
            result
        }
    };

    result.status.map_err(io::Error::from)
}

struct Flags {
    files: Vec<Input>,
    operation: Option<Operation>,
    max_bits: u8,
    width: CodeWidth,
}

struct ParamError;

#[derive(Debug)]
enum Input {
    File(PathBuf),
    Stdin,
}

#[derive(Debug)]
enum Operation {
    Encode,
    Decode,
}

fn explain<T>() -> T {
    println!(
        "Usage: lzw [-e|-d] [-w <bits>] [-a] <file>\n\
        Arguments:\n\
        -e\t operation encode\n\
        -d\t operation decode\n\
        -w\t maximum code size in bits, 9 to 24 (default 12)\n\
        -a\t adaptive code width\n\
        <file>\tfilepath or '-' for stdin"
    );
    process::exit(1);
}

impl Default for Flags {
    fn default() -> Flags {
        Flags {
            files: vec![],
            operation: None,
            max_bits: 12,
            width: CodeWidth::Fixed,
        }
    }
}

fn command() -> clap::Command<'static> {
    clap::Command::new("trielzw")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Compress and decompress with LZW")
        .arg(
            clap::Arg::new("decode")
                .short('d')
                .long("decode")
                .takes_value(false),
        )
        .arg(
            clap::Arg::new("encode")
                .short('e')
                .long("encode")
                .takes_value(false),
        )
        .group(
            clap::ArgGroup::new("operation")
                .args(&["decode", "encode"])
                .multiple(false)
                .required(true),
        )
        .arg(
            clap::Arg::new("max_bits")
                .short('w')
                .long("max-bits")
                .takes_value(true)
                .value_parser(clap::value_parser!(u8).range(9..=24)),
        )
        .arg(
            clap::Arg::new("adaptive")
                .short('a')
                .long("adaptive")
                .takes_value(false),
        )
        .arg(
            clap::Arg::new("file")
                .default_value("-")
                .value_parser(clap::builder::ValueParser::path_buf()),
        )
}

impl Flags {
    fn from_args(mut args: impl Iterator<Item = ffi::OsString>) -> Result<Self, ParamError> {
        let mut flags = Flags::default();
        let matches = command().get_matches_from(args.by_ref());

        if matches.contains_id("decode") {
            flags.operation = Some(Operation::Decode);
        } else if matches.contains_id("encode") {
            flags.operation = Some(Operation::Encode);
        }

        if let Some(&m) = matches.get_one::<u8>("max_bits") {
            flags.max_bits = m;
        }

        if matches.contains_id("adaptive") {
            flags.width = CodeWidth::Adaptive;
        }

        match matches.get_one::<PathBuf>("file") {
            None => flags.files = vec![Input::Stdin],
            Some(p) if *p == PathBuf::from("-") => flags.files = vec![Input::Stdin],
            Some(p) => flags.files = vec![Input::File(p.clone())],
        }

        Ok(flags)
    }
}

enum CodingResult {
    Ok,
    Err(io::Error),
    Panic,
}

impl CodingResult {
    fn catch_panic(op: fn() -> Result<(), io::Error>) -> Self {
        std::panic::catch_unwind(|| match op() {
            Ok(()) => CodingResult::Ok,
            Err(err) => CodingResult::Err(err),
        })
        .unwrap_or(CodingResult::Panic)
    }
}

impl std::process::Termination for CodingResult {
    fn report(self) -> std::process::ExitCode {
        match self {
            CodingResult::Ok => std::process::ExitCode::SUCCESS,
            CodingResult::Err(err) => {
                log::error!("{}", err);
                std::process::ExitCode::FAILURE
            }
            CodingResult::Panic => {
                log::error!(
                    "The process failed irrecoverably! This should never happen and is a bug."
                );
                std::process::ExitCode::from(128)
            }
        }
    }
}
