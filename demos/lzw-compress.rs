//! Compresses the input from stdin and writes the result to stdout.

use std::io::{self, BufWriter};
use trielzw::{encode::Encoder, CodeWidth};

fn main() {
    match (|| -> io::Result<()> {
        let mut encoder = Encoder::new(CodeWidth::Adaptive, 12);
        let stdin = io::stdin();
        let stdin = stdin.lock();
        let stdout = io::stdout();
        let stdout = BufWriter::new(stdout.lock());
        encoder.into_stream(stdout).encode_all(stdin).status?;
        Ok(())
    })() {
        Ok(()) => (),
        Err(err) => eprintln!("{}", err),
    }
}
