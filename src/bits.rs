//! Bit level reading and writing of codes, most significant bit first.
use crate::Code;

use std::io::{self, Read, Write};

/// Packs codes of arbitrary width into bytes.
///
/// Holds at most seven pending bits, every completed byte is written to the sink right away.
pub(crate) struct BitWriter<W> {
    inner: W,
    /// The pending bits, right aligned.
    buffer: u8,
    /// The number of valid buffer bits.
    bits_in_buffer: u8,
    bytes_written: usize,
}

/// Unpacks codes of arbitrary width from bytes.
pub(crate) struct BitReader<R> {
    inner: R,
    /// The current byte, with consumed bits masked out.
    current: u8,
    /// The number of unconsumed bits in `current`.
    bits_remaining: u8,
    bytes_read: usize,
    /// Bits gathered by the read that ran out of data.
    dangling: Dangling,
}

#[derive(Clone, Copy, Default)]
struct Dangling {
    bits: u8,
    value: Code,
}

impl<W: Write> BitWriter<W> {
    pub(crate) fn new(inner: W) -> Self {
        BitWriter {
            inner,
            buffer: 0,
            bits_in_buffer: 0,
            bytes_written: 0,
        }
    }

    /// Append the low `width` bits of `value`.
    pub(crate) fn write_bits(&mut self, value: Code, width: u8) -> io::Result<()> {
        debug_assert!(u32::from(width) <= Code::BITS);
        let mut remaining = width;
        while remaining > 0 {
            let take = (8 - self.bits_in_buffer).min(remaining);
            let chunk = (value >> (remaining - take)) & ((1 << take) - 1);
            self.buffer = ((u32::from(self.buffer) << take) | chunk) as u8;
            self.bits_in_buffer += take;
            remaining -= take;

            if self.bits_in_buffer == 8 {
                self.push_byte(self.buffer)?;
                self.buffer = 0;
                self.bits_in_buffer = 0;
            }
        }

        Ok(())
    }

    /// Pad a pending partial byte with zeros and write it.
    ///
    /// Without pending bits this does nothing, in particular a second call has no effect.
    pub(crate) fn flush(&mut self) -> io::Result<()> {
        if self.bits_in_buffer == 0 {
            return Ok(());
        }

        let byte = (u32::from(self.buffer) << (8 - self.bits_in_buffer)) as u8;
        self.push_byte(byte)?;
        self.buffer = 0;
        self.bits_in_buffer = 0;
        Ok(())
    }

    pub(crate) fn bytes_written(&self) -> usize {
        self.bytes_written
    }

    fn push_byte(&mut self, byte: u8) -> io::Result<()> {
        self.inner.write_all(&[byte])?;
        self.bytes_written += 1;
        Ok(())
    }
}

impl<R: Read> BitReader<R> {
    pub(crate) fn new(inner: R) -> Self {
        BitReader {
            inner,
            current: 0,
            bits_remaining: 0,
            bytes_read: 0,
            dangling: Dangling::default(),
        }
    }

    /// Read the next `width` bits.
    ///
    /// Returns `None` when the source ends before all bits could be gathered. The bits that
    /// were gathered are remembered, see [`ended_on_padding`].
    ///
    /// [`ended_on_padding`]: #method.ended_on_padding
    pub(crate) fn read_bits(&mut self, width: u8) -> io::Result<Option<Code>> {
        debug_assert!(u32::from(width) <= Code::BITS);
        let mut value: Code = 0;
        let mut remaining = width;
        while remaining > 0 {
            if self.bits_remaining == 0 && !self.refill()? {
                self.dangling = Dangling {
                    bits: width - remaining,
                    value,
                };
                return Ok(None);
            }

            let take = self.bits_remaining.min(remaining);
            let shift = self.bits_remaining - take;
            let chunk = (Code::from(self.current) >> shift) & ((1 << take) - 1);
            value = (value << take) | chunk;
            self.bits_remaining -= take;
            self.current &= ((1u32 << self.bits_remaining) - 1) as u8;
            remaining -= take;
        }

        Ok(Some(value))
    }

    /// If the last read ran out of data on the zero padding of a final partial byte.
    ///
    /// This is also true when the data ended exactly on a byte boundary.
    pub(crate) fn ended_on_padding(&self) -> bool {
        self.dangling.bits < 8 && self.dangling.value == 0
    }

    pub(crate) fn bytes_read(&self) -> usize {
        self.bytes_read
    }

    fn refill(&mut self) -> io::Result<bool> {
        let mut byte = [0u8];
        loop {
            match self.inner.read(&mut byte) {
                Ok(0) => return Ok(false),
                Ok(_) => break,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }

        self.current = byte[0];
        self.bits_remaining = 8;
        self.bytes_read += 1;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::{BitReader, BitWriter};

    #[test]
    fn packs_across_byte_boundaries() {
        let mut out: Vec<u8> = vec![];
        let mut writer = BitWriter::new(&mut out);
        writer.write_bits(0b1_0000_0001, 9).unwrap();
        writer.write_bits(0b111, 3).unwrap();
        writer.write_bits(0xABC, 12).unwrap();
        writer.flush().unwrap();
        assert_eq!(writer.bytes_written(), 3);
        assert_eq!(out, [0b1000_0000, 0b1111_1010, 0b1011_1100]);
    }

    #[test]
    fn flush_pads_and_is_idempotent() {
        let mut out: Vec<u8> = vec![];
        let mut writer = BitWriter::new(&mut out);
        writer.write_bits(0b101, 3).unwrap();
        writer.flush().unwrap();
        writer.flush().unwrap();
        assert_eq!(writer.bytes_written(), 1);
        assert_eq!(out, [0b1010_0000]);
    }

    #[test]
    fn zero_width_writes_nothing() {
        let mut out: Vec<u8> = vec![];
        let mut writer = BitWriter::new(&mut out);
        writer.write_bits(0xff, 0).unwrap();
        writer.flush().unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn reads_what_was_written() {
        let input = [0b1000_0000u8, 0b1111_1010, 0b1011_1100];
        let mut reader = BitReader::new(&input[..]);
        assert_eq!(reader.read_bits(9).unwrap(), Some(0b1_0000_0001));
        assert_eq!(reader.read_bits(3).unwrap(), Some(0b111));
        assert_eq!(reader.read_bits(12).unwrap(), Some(0xABC));
        assert_eq!(reader.read_bits(1).unwrap(), None);
        assert!(reader.ended_on_padding());
        assert_eq!(reader.bytes_read(), 3);
    }

    #[test]
    fn distinguishes_padding_from_truncation() {
        // One 12 bit code followed by four bits of padding.
        let mut reader = BitReader::new(&[0x12u8, 0x30][..]);
        assert_eq!(reader.read_bits(12).unwrap(), Some(0x123));
        assert_eq!(reader.read_bits(12).unwrap(), None);
        assert!(reader.ended_on_padding());

        // A 12 bit code cut after its first byte.
        let mut reader = BitReader::new(&[0x12u8, 0x34][..]);
        assert_eq!(reader.read_bits(12).unwrap(), Some(0x123));
        assert_eq!(reader.read_bits(4).unwrap(), Some(0x4));
        let mut reader = BitReader::new(&[0x12u8][..]);
        assert_eq!(reader.read_bits(12).unwrap(), None);
        assert!(!reader.ended_on_padding());

        // Padding bits that are not zero.
        let mut reader = BitReader::new(&[0x12u8, 0x31][..]);
        assert_eq!(reader.read_bits(12).unwrap(), Some(0x123));
        assert_eq!(reader.read_bits(12).unwrap(), None);
        assert!(!reader.ended_on_padding());
    }

    #[test]
    fn zero_bytes_are_data() {
        let mut reader = BitReader::new(&[0u8, 0][..]);
        assert_eq!(reader.read_bits(9).unwrap(), Some(0));
        assert_eq!(reader.read_bits(9).unwrap(), None);
    }
}
