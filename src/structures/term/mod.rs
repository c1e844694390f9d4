/*!
Typed bit-vector terms, interned in an [arena](TermArena).

A term is one of:
- A *variable*, identified by its origin --- a 32-bit register name or a memory
  location `(address, byte_size)`.
- A *literal constant* with an explicit bit width, taken from its spelling
  (`4·hex_digits` for `0x…`, the digit count for `0b…`).
- A *byte slice* or *bit slice* of a variable.
  Byte slices of memory variables are memory variables at the offset address.
- A *zero extension*, used to width-normalize the narrower operand of a relation.
- A *binary atom* over equality, disequality, or signed less-than.
- A *boolean connective* (conjunction, disjunction) or the negation of a conjunction.

Every term carries a bit width; relations and connectives report width 0.

Terms are interned so that syntactic equality is identifier equality, and sets of terms
are cheap.
The identifier of a term is stable for the lifetime of the arena.

# Example

```rust
# use abduce::structures::term::{Relation, TermArena};
let mut arena = TermArena::default();

let word = arena.declare_var("0x08000000:4").unwrap();
let three = arena.declare_const("0x3").unwrap();

// The constant is re-interned at the width of the word.
let atom = arena.binary(Relation::Equal, word, three).unwrap();
assert_eq!(arena.render(atom), "(@[0x08000000,4] = 0x00000003)");

// Interning: the same atom yields the same identifier.
let again = arena.binary(Relation::Equal, word, three).unwrap();
assert_eq!(atom, again);
```
*/

mod arena;
pub use arena::{parse_int_token, TermArena};

/// The identifier of an interned term: an index into the arena.
pub type TermId = u32;

/// Binary relations over bit-vector operands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Relation {
    /// Bit-vector equality, `=`.
    Equal,

    /// Bit-vector disequality, `<>`.
    Distinct,

    /// Signed less-than, `<s`.
    SignedLess,
}

impl Relation {
    /// Whether operand order is irrelevant.
    pub fn symmetric(self) -> bool {
        !matches!(self, Relation::SignedLess)
    }
}

impl std::fmt::Display for Relation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Equal => write!(f, "="),
            Self::Distinct => write!(f, "<>"),
            Self::SignedLess => write!(f, "<s"),
        }
    }
}

/// Boolean junctions over collections of terms.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Junction {
    /// Conjunction, `&`.
    And,

    /// Disjunction, `|`.
    Or,
}

impl std::fmt::Display for Junction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::And => write!(f, "&"),
            Self::Or => write!(f, "|"),
        }
    }
}

/// The origin of a variable.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum VarOrigin {
    /// A 32-bit register, by name.
    Register(String),

    /// A memory location: base address and size in bytes.
    Memory { address: u64, bytes: u32 },
}

/// An interned term.
///
/// Child terms are referenced by [TermId], so the representation is acyclic by
/// construction and hashable for interning.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Term {
    /// A variable, with its origin and width in bits.
    Variable(VarOrigin),

    /// A literal constant with an explicit width.
    Constant { value: u128, width: u32 },

    /// A single byte of a (register) variable.
    ByteSlice { base: TermId, index: u32 },

    /// A single bit of a variable.
    BitSlice { base: TermId, index: u32 },

    /// Zero extension of a term by `extra` bits.
    ZeroExtend { term: TermId, extra: u32 },

    /// A binary atom over two operands of equal width.
    Binary {
        op: Relation,
        lhs: TermId,
        rhs: TermId,
    },

    /// A conjunction or disjunction over a collection of terms.
    Connective { op: Junction, terms: Vec<TermId> },

    /// The negation of a conjunction.
    Negation { terms: Vec<TermId> },
}
