//! A fixed-universe set over the 256 byte values.

/// The reserved end-of-input sentinel. It never appears in parsed input and
/// stands for "epsilon" inside FIRST sets.
pub const EOS: u8 = 0;

type Word = u64;

const WORD_BITS: usize = Word::BITS as usize;
const WORDS: usize = 256 / WORD_BITS;

/// A 256-bit bitmap, one bit per byte value.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ByteSet {
    words: [Word; WORDS],
}

impl ByteSet {
    pub const fn new() -> Self {
        Self { words: [0; WORDS] }
    }

    #[inline]
    fn locate(byte: u8) -> (usize, Word) {
        let byte = byte as usize;
        (byte / WORD_BITS, 1 << (byte % WORD_BITS))
    }

    /// Adds a byte to the set, returning true if it was not already present.
    pub fn add(&mut self, byte: u8) -> bool {
        let (word, mask) = Self::locate(byte);
        let absent = self.words[word] & mask == 0;
        self.words[word] |= mask;

        absent
    }

    /// Removes a byte from the set, returning true if it was present.
    pub fn remove(&mut self, byte: u8) -> bool {
        let (word, mask) = Self::locate(byte);
        let present = self.words[word] & mask != 0;
        self.words[word] &= !mask;

        present
    }

    #[inline]
    pub fn contains(&self, byte: u8) -> bool {
        let (word, mask) = Self::locate(byte);
        self.words[word] & mask != 0
    }

    pub fn union(&self, other: &ByteSet) -> ByteSet {
        let mut words = self.words;
        for (word, other) in words.iter_mut().zip(other.words.iter()) {
            *word |= other;
        }

        ByteSet { words }
    }

    /// Sets self to the union of self and `other`, returning whether the set
    /// has changed.
    pub fn union_with(&mut self, other: &ByteSet) -> bool {
        let mut changed = false;
        for (word, other) in self.words.iter_mut().zip(other.words.iter()) {
            let old = *word;
            *word |= other;
            changed |= old != *word;
        }

        changed
    }

    pub fn is_superset(&self, other: &ByteSet) -> bool {
        self.words
            .iter()
            .zip(other.words.iter())
            .all(|(word, other)| word & other == *other)
    }

    /// Returns a copy of the set with `byte` removed.
    pub fn without(&self, byte: u8) -> ByteSet {
        let mut set = *self;
        set.remove(byte);
        set
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|word| *word == 0)
    }

    pub fn len(&self) -> usize {
        self.words.iter().map(|word| word.count_ones() as usize).sum()
    }

    /// Iterates the members of the set in ascending order.
    pub fn bytes(&self) -> Bytes {
        Bytes {
            words: self.words,
            index: 0,
        }
    }
}

impl FromIterator<u8> for ByteSet {
    fn from_iter<T: IntoIterator<Item = u8>>(iter: T) -> Self {
        let mut set = ByteSet::new();
        for byte in iter {
            set.add(byte);
        }
        set
    }
}

impl<'a> IntoIterator for &'a ByteSet {
    type Item = u8;
    type IntoIter = Bytes;

    fn into_iter(self) -> Self::IntoIter {
        self.bytes()
    }
}

/// An ascending iterator over the members of a [ByteSet].
#[derive(Debug, Clone)]
pub struct Bytes {
    words: [Word; WORDS],
    index: usize,
}

impl Iterator for Bytes {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        while self.index < WORDS {
            let word = self.words[self.index];
            if word != 0 {
                let bit = word.trailing_zeros() as usize;
                // clear the lowest set bit so the next call moves past it.
                self.words[self.index] = word & (word - 1);
                return Some((self.index * WORD_BITS + bit) as u8);
            }
            self.index += 1;
        }

        None
    }
}

/// Renders a single byte for diagnostics, e.g. `'a' (97)` or `EOS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRepr(pub u8);

impl std::fmt::Display for ByteRepr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            EOS => write!(f, "EOS"),
            byte => write!(f, "'{}' ({})", (byte as char).escape_default(), byte),
        }
    }
}

impl std::fmt::Debug for ByteSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.bytes().map(ByteRepr)).finish()
    }
}

impl std::fmt::Display for ByteSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let members = self
            .bytes()
            .map(|byte| match byte {
                EOS => "EOS".to_string(),
                byte => format!("'{}'", (byte as char).escape_default()),
            })
            .collect::<Vec<_>>();

        write!(f, "{{{}}}", members.join(", "))
    }
}
