//! Decompresses the input from stdin and writes the result to stdout.

use std::io::{self, BufReader, BufWriter};
use trielzw::{decode::Decoder, CodeWidth};

fn main() {
    match (|| -> io::Result<()> {
        let mut decoder = Decoder::new(CodeWidth::Adaptive, 12);
        let stdout = io::stdout();
        let stdout = BufWriter::new(stdout.lock());
        let stdin = io::stdin();
        let stdin = BufReader::new(stdin.lock());
        decoder.into_stream(stdout).decode_all(stdin).status?;
        Ok(())
    })() {
        Ok(()) => (),
        Err(err) => eprintln!("{}", err),
    }
}
