//! A module for all encoding needs.
use crate::bits::BitWriter;
use crate::{assert_code_size, AllResult, Code, CodeSize, CodeWidth, LzwError, RESERVED};

use std::io::{BufRead, Write};

/// The configuration of an encoding pass.
///
/// Each call to [`IntoStream::encode_all`] starts from a fresh dictionary, so an `Encoder` can
/// be reused for any number of independent streams.
///
/// [`IntoStream::encode_all`]: struct.IntoStream.html#method.encode_all
pub struct Encoder {
    width: CodeWidth,
    max_size: u8,
    /// Dictionary sizes after each insertion of the last pass, if requested.
    growth: Option<Vec<Code>>,
}

/// A encoding stream sink.
///
/// See [`Encoder::into_stream`] on how to create this type and more information.
///
/// [`Encoder::into_stream`]: struct.Encoder.html#method.into_stream
pub struct IntoStream<'d, W> {
    encoder: &'d mut Encoder,
    writer: W,
}

struct EncodeState<W: Write> {
    /// The current encoding symbol tree.
    tree: Trie,
    /// The node and code of the longest match so far, `None` before the first byte.
    current: Option<(NodeId, Code)>,
    /// The size of the next code written.
    code_size: CodeSize,
    writer: BitWriter<W>,
    /// The number of codes written so far.
    codes: usize,
    growth: Option<Vec<Code>>,
}

/// Index of a node in the tree arena.
type NodeId = u32;

const ROOT: NodeId = 0;

/// A prefix tree over byte sequences, with one arena for all nodes.
///
/// To avoid using too much memory we keep nodes with few successors in optimized form. This
/// form doesn't offer lookup by indexing but instead does a linear search.
pub struct Trie {
    nodes: Vec<Node>,
    simples: Vec<Simple>,
    complex: Vec<Full>,
    next_code: Code,
    max_entries: Code,
}

#[derive(Clone, Copy)]
struct Node {
    /// The code bound to the sequence ending in this node.
    code: Option<Code>,
    successors: Successors,
}

#[derive(Clone, Copy)]
enum Successors {
    None,
    Simple(u32),
    Full(u32),
}

const SHORT: usize = 16;

#[derive(Clone, Copy)]
struct Simple {
    nodes: [NodeId; SHORT],
    bytes: [u8; SHORT],
    count: u8,
}

/// Successors indexed by byte. The root is never a successor so `ROOT` marks a missing one.
#[derive(Clone, Copy)]
struct Full {
    byte_continuation: [NodeId; 256],
}

impl Encoder {
    /// Create a new encoder with the given code width policy and maximum code size.
    ///
    /// # Panics
    ///
    /// The `max_size` must be between 9 and 24, inclusive.
    pub fn new(width: CodeWidth, max_size: u8) -> Self {
        assert_code_size(max_size);
        Encoder {
            width,
            max_size,
            growth: None,
        }
    }

    /// Record the dictionary size after each insertion of the following passes.
    pub fn trace_growth(&mut self) -> &mut Self {
        self.growth.get_or_insert_with(Vec::new);
        self
    }

    /// The dictionary sizes recorded during the last pass.
    ///
    /// Empty unless [`trace_growth`] was called before the pass.
    ///
    /// [`trace_growth`]: #method.trace_growth
    pub fn growth(&self) -> &[Code] {
        self.growth.as_deref().unwrap_or(&[])
    }

    /// Construct an encoder into a writer.
    pub fn into_stream<W: Write>(&mut self, writer: W) -> IntoStream<'_, W> {
        IntoStream {
            encoder: self,
            writer,
        }
    }
}

impl<W: Write> IntoStream<'_, W> {
    /// Encode all data from a reader, including the header, and pad the last byte.
    ///
    /// The writer receives each byte as soon as it is complete. Wrap it in a `BufWriter` when
    /// it is unbuffered.
    pub fn encode_all(self, mut read: impl BufRead) -> AllResult {
        let IntoStream { encoder, writer } = self;
        let mut growth = encoder.growth.take();
        if let Some(growth) = growth.as_mut() {
            growth.clear();
        }

        log::debug!(
            "encoding with {:?} code width of at most {} bits",
            encoder.width,
            encoder.max_size
        );

        let mut state = EncodeState {
            tree: Trie::new(encoder.max_size),
            current: None,
            code_size: CodeSize::new(encoder.width, encoder.max_size),
            writer: BitWriter::new(writer),
            codes: 0,
            growth,
        };

        let mut bytes_read = 0;
        let status = (|| -> Result<(), LzwError> {
            state.write_header(encoder.max_size)?;
            loop {
                let data = read.fill_buf()?;
                if data.is_empty() {
                    break;
                }

                for &byte in data {
                    state.push_byte(byte)?;
                }

                let len = data.len();
                bytes_read += len;
                read.consume(len);
            }

            state.finish()
        })();

        log::debug!(
            "encoded {} bytes into {} codes, {} bytes, dictionary at {} entries",
            bytes_read,
            state.codes,
            state.writer.bytes_written(),
            state.tree.next_code()
        );

        encoder.growth = state.growth;
        AllResult {
            bytes_read,
            bytes_written: state.writer.bytes_written(),
            codes: state.codes,
            status,
        }
    }
}

impl<W: Write> EncodeState<W> {
    fn write_header(&mut self, max_size: u8) -> Result<(), LzwError> {
        self.writer.write_bits(Code::from(max_size), 8)?;
        Ok(())
    }

    fn push_byte(&mut self, byte: u8) -> Result<(), LzwError> {
        let (node, code) = match self.current {
            Some(current) => current,
            None => {
                self.current = Some(Trie::singleton(byte));
                return Ok(());
            }
        };

        if let Some(next) = self.tree.step(node, byte) {
            self.current = Some(next);
            return Ok(());
        }

        self.buffer_code(code)?;
        if !self.tree.is_full() {
            self.tree.append(node, byte);
            self.inserted();
        }

        self.current = Some(Trie::singleton(byte));
        Ok(())
    }

    fn finish(&mut self) -> Result<(), LzwError> {
        if let Some((_, code)) = self.current.take() {
            self.buffer_code(code)?;
        }

        self.writer.flush()?;
        Ok(())
    }

    fn buffer_code(&mut self, code: Code) -> Result<(), LzwError> {
        debug_assert!(code < 1 << self.code_size.get());
        self.writer.write_bits(code, self.code_size.get())?;
        self.codes += 1;
        Ok(())
    }

    fn inserted(&mut self) {
        let entries = self.tree.next_code();
        if let Some(growth) = self.growth.as_mut() {
            growth.push(entries);
        }

        if self.code_size.grow(entries) {
            log::debug!(
                "code size grows to {} bits after code {}",
                self.code_size.get(),
                entries - 1
            );
        }
    }
}

impl Trie {
    /// Create a tree holding the 256 single byte sequences.
    ///
    /// At most `1 << max_size` codes are ever bound.
    ///
    /// # Panics
    ///
    /// The `max_size` must be between 9 and 24, inclusive.
    pub fn new(max_size: u8) -> Self {
        assert_code_size(max_size);
        let mut tree = Trie {
            nodes: Vec::with_capacity(1 << max_size.min(16)),
            simples: Vec::new(),
            complex: Vec::new(),
            next_code: RESERVED,
            max_entries: 1 << max_size,
        };

        // The root maps every byte to its single byte sequence, which is node `1 + byte`.
        let mut map_of_begin = Full {
            byte_continuation: [ROOT; 256],
        };
        for (ch, node) in map_of_begin.byte_continuation.iter_mut().enumerate() {
            *node = ch as NodeId + 1;
        }
        tree.complex.push(map_of_begin);
        tree.nodes.push(Node {
            code: None,
            successors: Successors::Full(0),
        });
        for ch in 0..RESERVED {
            tree.nodes.push(Node {
                code: Some(ch),
                successors: Successors::None,
            });
        }

        tree
    }

    /// The node and code of a single byte sequence.
    fn singleton(byte: u8) -> (NodeId, Code) {
        (NodeId::from(byte) + 1, Code::from(byte))
    }

    /// The code the next insertion will bind.
    pub fn next_code(&self) -> Code {
        self.next_code
    }

    pub fn is_full(&self) -> bool {
        self.next_code >= self.max_entries
    }

    /// Bind `seq` to the next code unless it already has one or the tree is full.
    ///
    /// Returns the newly bound code.
    pub fn insert(&mut self, seq: &[u8]) -> Option<Code> {
        if seq.is_empty() || self.is_full() {
            return None;
        }

        let (&last, init) = seq.split_last()?;
        let node = init
            .iter()
            .fold(ROOT, |node, &ch| self.child_or_insert(node, ch));
        self.append(node, last)
    }

    /// The code bound to exactly `seq`.
    pub fn lookup(&self, seq: &[u8]) -> Option<Code> {
        let node = seq
            .iter()
            .try_fold(ROOT, |node, &ch| self.child(node, ch))?;
        if node == ROOT {
            return None;
        }

        self.nodes[node as usize].code
    }

    /// Follow one byte from `node` to a successor that has a code.
    fn step(&self, node: NodeId, ch: u8) -> Option<(NodeId, Code)> {
        let next = self.child(node, ch)?;
        let code = self.nodes[next as usize].code?;
        Some((next, code))
    }

    /// Bind the sequence of `node` extended by `ch`, creating the node as needed.
    fn append(&mut self, node: NodeId, ch: u8) -> Option<Code> {
        if self.is_full() {
            return None;
        }

        let next = self.child_or_insert(node, ch);
        let slot = &mut self.nodes[next as usize].code;
        if slot.is_some() {
            return None;
        }

        let code = self.next_code;
        *slot = Some(code);
        self.next_code += 1;
        Some(code)
    }

    fn child(&self, node: NodeId, ch: u8) -> Option<NodeId> {
        match self.nodes[node as usize].successors {
            Successors::None => None,
            Successors::Simple(idx) => {
                let nexts = &self.simples[idx as usize];
                nexts
                    .bytes
                    .iter()
                    .zip(nexts.nodes.iter())
                    .take(usize::from(nexts.count))
                    .find(|&(&sch, _)| sch == ch)
                    .map(|(_, &snode)| snode)
            }
            Successors::Full(idx) => {
                let next = self.complex[idx as usize].byte_continuation[usize::from(ch)];
                if next == ROOT {
                    None
                } else {
                    Some(next)
                }
            }
        }
    }

    fn child_or_insert(&mut self, node: NodeId, ch: u8) -> NodeId {
        if let Some(next) = self.child(node, ch) {
            return next;
        }

        let next = self.nodes.len() as NodeId;
        self.nodes.push(Node {
            code: None,
            successors: Successors::None,
        });

        let successors = self.nodes[node as usize].successors;
        match successors {
            Successors::None => {
                let mut simple = Simple::default();
                simple.nodes[0] = next;
                simple.bytes[0] = ch;
                simple.count = 1;
                self.nodes[node as usize].successors =
                    Successors::Simple(self.simples.len() as u32);
                self.simples.push(simple);
            }
            Successors::Simple(idx) if usize::from(self.simples[idx as usize].count) < SHORT => {
                let nexts = &mut self.simples[idx as usize];
                let nidx = usize::from(nexts.count);
                nexts.bytes[nidx] = ch;
                nexts.nodes[nidx] = next;
                nexts.count += 1;
            }
            Successors::Simple(idx) => {
                let simple = &self.simples[idx as usize];
                let mut full = Full {
                    byte_continuation: [ROOT; 256],
                };
                for (&sch, &snode) in simple.bytes.iter().zip(simple.nodes.iter()) {
                    full.byte_continuation[usize::from(sch)] = snode;
                }
                full.byte_continuation[usize::from(ch)] = next;
                self.nodes[node as usize].successors =
                    Successors::Full(self.complex.len() as u32);
                self.complex.push(full);
            }
            Successors::Full(idx) => {
                self.complex[idx as usize].byte_continuation[usize::from(ch)] = next;
            }
        }

        next
    }
}

impl Default for Simple {
    fn default() -> Self {
        Simple {
            nodes: [ROOT; SHORT],
            bytes: [0; SHORT],
            count: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Encoder, Trie};
    use crate::CodeWidth;

    #[test]
    fn trie_starts_with_single_bytes() {
        let tree = Trie::new(12);
        assert_eq!(tree.next_code(), 256);
        assert_eq!(tree.lookup(b"A"), Some(65));
        assert_eq!(tree.lookup(&[0]), Some(0));
        assert_eq!(tree.lookup(&[255]), Some(255));
        assert_eq!(tree.lookup(b""), None);
        assert_eq!(tree.lookup(b"AB"), None);
    }

    #[test]
    fn insert_binds_sequential_codes_once() {
        let mut tree = Trie::new(12);
        assert_eq!(tree.insert(b""), None);
        assert_eq!(tree.insert(b"AB"), Some(256));
        assert_eq!(tree.insert(b"ABC"), Some(257));
        assert_eq!(tree.insert(b"AB"), None);
        assert_eq!(tree.insert(b"A"), None);
        assert_eq!(tree.next_code(), 258);
        assert_eq!(tree.lookup(b"AB"), Some(256));
        assert_eq!(tree.lookup(b"ABC"), Some(257));
    }

    #[test]
    fn intermediate_nodes_are_not_bound() {
        let mut tree = Trie::new(12);
        assert_eq!(tree.insert(b"XYZ"), Some(256));
        assert_eq!(tree.lookup(b"XY"), None);
        assert_eq!(tree.lookup(b"XYZ"), Some(256));
        assert_eq!(tree.insert(b"XY"), Some(257));
        assert_eq!(tree.lookup(b"XY"), Some(257));
    }

    #[test]
    fn many_successors_switch_to_full_nodes() {
        let mut tree = Trie::new(12);
        for ch in 0..=255u8 {
            assert_eq!(tree.insert(&[b'q', ch]), Some(256 + u32::from(ch)));
        }
        for ch in 0..=255u8 {
            assert_eq!(tree.lookup(&[b'q', ch]), Some(256 + u32::from(ch)));
        }
        assert_eq!(tree.lookup(&[b'q', 0, 0]), None);
    }

    #[test]
    fn full_tree_stops_binding() {
        let mut tree = Trie::new(9);
        for ch in 0..=255u8 {
            assert!(tree.insert(&[ch, ch]).is_some());
        }
        assert!(tree.is_full());
        assert_eq!(tree.next_code(), 512);
        assert_eq!(tree.insert(b"new"), None);
        assert_eq!(tree.lookup(b"new"), None);
        assert_eq!(tree.next_code(), 512);
    }

    #[test]
    fn traces_dictionary_growth() {
        let mut encoder = Encoder::new(CodeWidth::Fixed, 12);
        encoder.trace_growth();
        let mut out: Vec<u8> = vec![];
        let result = encoder.into_stream(&mut out).encode_all(&b"ABABABA"[..]);
        result.status.unwrap();
        // A, B, AB, ABA are written; AB, BA, ABA are inserted.
        assert_eq!(result.codes, 4);
        assert_eq!(encoder.growth(), [257, 258, 259]);
    }
}
