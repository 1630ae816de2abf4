//! A module for all decoding needs.
use crate::bits::BitReader;
use crate::{
    assert_code_size, AllResult, Code, CodeSize, CodeWidth, LzwError, MAX_CODESIZE, MIN_CODESIZE,
    RESERVED,
};

use std::io::{Read, Write};

/// The configuration of a decoding pass.
///
/// Each call to [`IntoStream::decode_all`] starts from a fresh table.
///
/// [`IntoStream::decode_all`]: struct.IntoStream.html#method.decode_all
pub struct Decoder {
    width: CodeWidth,
    max_size: u8,
    /// Table sizes after each new entry of the last pass, if requested.
    growth: Option<Vec<Code>>,
}

/// A decoding stream sink.
///
/// See [`Decoder::into_stream`] on how to create this type and more information.
///
/// [`Decoder::into_stream`]: struct.Decoder.html#method.into_stream
pub struct IntoStream<'d, W> {
    decoder: &'d mut Decoder,
    writer: W,
}

struct DecodeState<R, W> {
    table: Table,
    /// The code read last, together with its bytes in `buffer`.
    last: Option<Code>,
    /// The bytes of the last code.
    buffer: Vec<u8>,
    /// The bytes of the code being decoded.
    entry: Vec<u8>,
    /// The size of the next code read.
    code_size: CodeSize,
    reader: BitReader<R>,
    writer: W,
    codes: usize,
    bytes_written: usize,
    growth: Option<Vec<Code>>,
}

#[derive(Clone, Copy)]
struct Link {
    prefix: Code,
    byte: u8,
}

/// The table of decoded codes.
///
/// Each entry links to the code of its prefix and adds one byte, sequences are reconstructed
/// by walking the links backwards.
pub struct Table {
    inner: Vec<Link>,
    depths: Vec<u32>,
    max_entries: Code,
}

impl Decoder {
    /// Create a new decoder with the given code width policy and maximum code size.
    ///
    /// Both must match the encoder. The stream header is checked against `max_size`.
    ///
    /// # Panics
    ///
    /// The `max_size` must be between 9 and 24, inclusive.
    pub fn new(width: CodeWidth, max_size: u8) -> Self {
        assert_code_size(max_size);
        Decoder {
            width,
            max_size,
            growth: None,
        }
    }

    /// Record the table size after each new entry of the following passes.
    pub fn trace_growth(&mut self) -> &mut Self {
        self.growth.get_or_insert_with(Vec::new);
        self
    }

    /// The table sizes recorded during the last pass.
    pub fn growth(&self) -> &[Code] {
        self.growth.as_deref().unwrap_or(&[])
    }

    /// Construct a decoder into a writer.
    pub fn into_stream<W: Write>(&mut self, writer: W) -> IntoStream<'_, W> {
        IntoStream {
            decoder: self,
            writer,
        }
    }
}

impl<W: Write> IntoStream<'_, W> {
    /// Decode all data from a reader.
    ///
    /// The data must start with the header and ends with the last code, possibly followed by
    /// up to seven bits of zero padding. Any other ending is an [`LzwError::InvalidCode`].
    ///
    /// [`LzwError::InvalidCode`]: ../enum.LzwError.html#variant.InvalidCode
    pub fn decode_all(self, read: impl Read) -> AllResult {
        let IntoStream { decoder, writer } = self;
        let mut growth = decoder.growth.take();
        if let Some(growth) = growth.as_mut() {
            growth.clear();
        }

        let mut state = DecodeState {
            table: Table::new(decoder.max_size),
            last: None,
            buffer: Vec::new(),
            entry: Vec::new(),
            code_size: CodeSize::new(decoder.width, decoder.max_size),
            reader: BitReader::new(read),
            writer,
            codes: 0,
            bytes_written: 0,
            growth,
        };

        let status = state
            .read_header(decoder.max_size)
            .and_then(|()| state.advance());

        match &status {
            Ok(()) => log::debug!(
                "decoded {} codes into {} bytes, table at {} entries",
                state.codes,
                state.bytes_written,
                state.table.next_code()
            ),
            Err(err) => log::debug!("decoding failed after {} codes: {}", state.codes, err),
        }

        decoder.growth = state.growth;
        AllResult {
            bytes_read: state.reader.bytes_read(),
            bytes_written: state.bytes_written,
            codes: state.codes,
            status,
        }
    }
}

impl<R: Read, W: Write> DecodeState<R, W> {
    fn read_header(&mut self, expected: u8) -> Result<(), LzwError> {
        let found = match self.reader.read_bits(8)? {
            Some(header) => header as u8,
            None => return Err(LzwError::MissingHeader),
        };

        if found < MIN_CODESIZE || found > MAX_CODESIZE {
            return Err(LzwError::InvalidHeader(found));
        }

        if found != expected {
            return Err(LzwError::HeaderMismatch { found, expected });
        }

        Ok(())
    }

    fn advance(&mut self) -> Result<(), LzwError> {
        while let Some(code) = self.next_symbol()? {
            self.decode_code(code)?;
            self.writer.write_all(&self.buffer)?;
            self.bytes_written += self.buffer.len();
            self.codes += 1;
        }

        Ok(())
    }

    /// Read the next code, `None` at a clean end of the stream.
    fn next_symbol(&mut self) -> Result<Option<Code>, LzwError> {
        match self.reader.read_bits(self.code_size.get())? {
            Some(code) => Ok(Some(code)),
            None if self.reader.ended_on_padding() => Ok(None),
            None => Err(LzwError::InvalidCode),
        }
    }

    /// Decode `code` into `buffer`, deriving the new table entry from the previous code.
    fn decode_code(&mut self, code: Code) -> Result<(), LzwError> {
        let last = match self.last {
            Some(last) => last,
            None => {
                // The first code has no predecessor, thus it must be a single byte.
                if code >= RESERVED {
                    return Err(LzwError::InvalidCode);
                }

                self.table.reconstruct(code, &mut self.buffer);
                self.last = Some(code);
                return Ok(());
            }
        };

        self.entry.clear();
        if code < self.table.next_code() {
            self.table.reconstruct(code, &mut self.entry);
        } else if code == self.table.next_code() {
            // The encoder used this code in the same step it created it. It must be the last
            // sequence extended by its own first byte.
            self.entry.extend_from_slice(&self.buffer);
            self.entry.push(self.buffer[0]);
        } else {
            return Err(LzwError::InvalidCode);
        }

        if !self.table.is_full() {
            self.table.extend(last, self.entry[0]);
            self.inserted();
        }

        core::mem::swap(&mut self.buffer, &mut self.entry);
        self.last = Some(code);
        Ok(())
    }

    fn inserted(&mut self) {
        let entries = self.table.next_code();
        if let Some(growth) = self.growth.as_mut() {
            growth.push(entries);
        }

        // The encoder already holds one more entry when it writes the next code.
        if self.code_size.grow(entries + 1) {
            log::debug!(
                "code size grows to {} bits after code {}",
                self.code_size.get(),
                entries
            );
        }
    }
}

impl Table {
    /// Create a table holding the 256 single byte sequences.
    ///
    /// # Panics
    ///
    /// The `max_size` must be between 9 and 24, inclusive.
    pub fn new(max_size: u8) -> Self {
        assert_code_size(max_size);
        let max_entries: Code = 1 << max_size;
        let capacity = max_entries.min(1 << 16) as usize;
        let mut table = Table {
            inner: Vec::with_capacity(capacity),
            depths: Vec::with_capacity(capacity),
            max_entries,
        };

        for byte in 0..=u8::max_value() {
            table.inner.push(Link::base(byte));
            table.depths.push(1);
        }

        table
    }

    /// The code the next entry will receive.
    pub fn next_code(&self) -> Code {
        self.inner.len() as Code
    }

    pub fn is_full(&self) -> bool {
        self.next_code() >= self.max_entries
    }

    /// Add the sequence of `prefix` followed by `byte` as the next code.
    ///
    /// Does nothing and returns `None` once the table is full.
    pub fn extend(&mut self, prefix: Code, byte: u8) -> Option<Code> {
        if self.is_full() {
            return None;
        }

        debug_assert!(prefix < self.next_code());
        let code = self.next_code();
        let depth = self.depths[prefix as usize] + 1;
        self.inner.push(Link { prefix, byte });
        self.depths.push(depth);
        Some(code)
    }

    /// The sequence bound to `code`.
    pub fn get(&self, code: Code) -> Option<Vec<u8>> {
        if code >= self.next_code() {
            return None;
        }

        let mut seq = Vec::new();
        self.reconstruct(code, &mut seq);
        Some(seq)
    }

    /// Replace the contents of `out` with the sequence of a bound `code`.
    fn reconstruct(&self, code: Code, out: &mut Vec<u8>) {
        let depth = self.depths[code as usize] as usize;
        out.clear();
        out.resize(depth, 0);

        let mut code_iter = code;
        for ch in out.iter_mut().rev() {
            let entry = self.inner[code_iter as usize];
            *ch = entry.byte;
            code_iter = entry.prefix;
        }
    }
}

impl Link {
    fn base(byte: u8) -> Self {
        Link {
            prefix: Code::from(byte),
            byte,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Decoder, Table};
    use crate::{CodeWidth, LzwError};

    #[test]
    fn table_starts_with_single_bytes() {
        let table = Table::new(12);
        assert_eq!(table.next_code(), 256);
        assert_eq!(table.get(0), Some(vec![0]));
        assert_eq!(table.get(65), Some(b"A".to_vec()));
        assert_eq!(table.get(255), Some(vec![255]));
        assert_eq!(table.get(256), None);
    }

    #[test]
    fn extend_chains_prefixes() {
        let mut table = Table::new(12);
        assert_eq!(table.extend(u32::from(b'T'), b'O'), Some(256));
        assert_eq!(table.extend(256, b'B'), Some(257));
        assert_eq!(table.extend(257, b'E'), Some(258));
        assert_eq!(table.get(258), Some(b"TOBE".to_vec()));
        assert_eq!(table.get(256), Some(b"TO".to_vec()));
        assert_eq!(table.next_code(), 259);
    }

    #[test]
    fn full_table_is_frozen() {
        let mut table = Table::new(9);
        for byte in 0..=255u8 {
            assert!(table.extend(u32::from(byte), byte).is_some());
        }
        assert!(table.is_full());
        assert_eq!(table.extend(0, 0), None);
        assert_eq!(table.next_code(), 512);
        assert_eq!(table.get(511), Some(vec![255, 255]));
    }

    #[test]
    fn first_code_must_be_a_byte() {
        // Header for 9 bits, then the code 256 and padding.
        let data = [9u8, 0b1000_0000, 0];
        let mut decoder = Decoder::new(CodeWidth::Fixed, 9);
        let mut out: Vec<u8> = vec![];
        let result = decoder.into_stream(&mut out).decode_all(&data[..]);
        assert!(matches!(result.status, Err(LzwError::InvalidCode)));
        assert!(out.is_empty());
    }

    #[test]
    fn header_is_checked() {
        let mut decoder = Decoder::new(CodeWidth::Fixed, 12);

        let result = decoder.into_stream(Vec::<u8>::new()).decode_all(&[0u8; 0][..]);
        assert!(matches!(result.status, Err(LzwError::MissingHeader)));

        let result = decoder.into_stream(Vec::<u8>::new()).decode_all(&[8u8][..]);
        assert!(matches!(result.status, Err(LzwError::InvalidHeader(8))));

        let result = decoder.into_stream(Vec::<u8>::new()).decode_all(&[10u8][..]);
        assert!(matches!(
            result.status,
            Err(LzwError::HeaderMismatch {
                found: 10,
                expected: 12
            })
        ));

        let result = decoder.into_stream(Vec::<u8>::new()).decode_all(&[12u8][..]);
        assert!(result.status.is_ok());
        assert_eq!(result.codes, 0);
    }

    #[test]
    fn traces_table_growth() {
        let (data, _) = crate::compress(b"ABABABA", 12, false);
        let mut decoder = Decoder::new(CodeWidth::Fixed, 12);
        decoder.trace_growth();
        let mut out: Vec<u8> = vec![];
        let result = decoder.into_stream(&mut out).decode_all(data.as_slice());
        result.status.unwrap();
        assert_eq!(out, b"ABABABA");
        assert_eq!(result.codes, 4);
        assert_eq!(decoder.growth(), [257, 258, 259]);
    }
}
