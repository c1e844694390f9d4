use std::collections::HashMap;
use std::collections::{BTreeMap, BTreeSet};

use crate::types::err::{ConfigError, ErrorKind, TermError};

use super::{Junction, Relation, Term, TermId, VarOrigin};

/// Mask `value` to `width` bits.
fn mask_value(value: u128, width: u32) -> u128 {
    if width >= 128 {
        value
    } else {
        value & ((1_u128 << width) - 1)
    }
}

/// The interning arena for terms.
///
/// Adding a term which is syntactically equal to a present term returns the identifier
/// of the present term, so identifier equality is syntactic equality.
///
/// Variables are additionally registered by canonical identifier, as required for model
/// normalization and candidate coverage checks.
#[derive(Default)]
pub struct TermArena {
    /// Interned terms, in insertion order.
    terms: Vec<Term>,

    /// The interning index.
    index: HashMap<Term, TermId>,

    /// Registered variables, canonical identifier to term.
    vars: BTreeMap<String, TermId>,
}

impl TermArena {
    /// Interns a term, returning a stable identifier.
    fn intern(&mut self, term: Term) -> TermId {
        if let Some(id) = self.index.get(&term) {
            return *id;
        }
        let id = self.terms.len() as TermId;
        self.terms.push(term.clone());
        self.index.insert(term, id);
        id
    }

    /// The term behind an identifier.
    ///
    /// # Panics
    /// If the identifier was not produced by this arena.
    pub fn term(&self, id: TermId) -> &Term {
        &self.terms[id as usize]
    }

    /// The count of interned terms.
    pub fn term_count(&self) -> usize {
        self.terms.len()
    }

    /// An iterator over registered variables as (canonical identifier, term identifier).
    pub fn variables(&self) -> impl Iterator<Item = (&String, &TermId)> {
        self.vars.iter()
    }

    /// The identifier of a registered variable, if any.
    pub fn var_id(&self, identifier: &str) -> Option<TermId> {
        match Self::parse_var_token(identifier) {
            Ok(origin) => self.vars.get(&Self::canonical_name(&origin)).copied(),
            Err(_) => None,
        }
    }

    /// Whether some identifier names a registered variable.
    pub fn is_registered(&self, identifier: &str) -> bool {
        self.var_id(identifier).is_some()
    }

    // Declarations

    /// Parses a variable token.
    ///
    /// The grammar is `<reg>` (alphabetic), `<hexaddr>`, or `<hexaddr>:<bytes>` /
    /// `<hexaddr>/<bytes>` for sized memory references.
    fn parse_var_token(token: &str) -> Result<VarOrigin, ErrorKind> {
        let token = token.trim();
        if token.is_empty() {
            return Err(ConfigError::Identifier(token.to_owned()).into());
        }

        if token.starts_with("0x") || token.starts_with("0X") {
            let (addr_part, size_part) = match token.split_once([':', '/']) {
                Some((a, s)) => (a, Some(s)),
                None => (token, None),
            };
            let address = u64::from_str_radix(&addr_part[2..], 16)
                .map_err(|_| ConfigError::Identifier(token.to_owned()))?;
            let bytes = match size_part {
                Some(s) => s
                    .trim()
                    .parse::<u32>()
                    .map_err(|_| ConfigError::Identifier(token.to_owned()))?,
                None => 1,
            };
            if bytes == 0 || bytes > 16 {
                return Err(ConfigError::Identifier(token.to_owned()).into());
            }
            Ok(VarOrigin::Memory { address, bytes })
        } else if token.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
            && token.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            Ok(VarOrigin::Register(token.to_owned()))
        } else {
            Err(ConfigError::Identifier(token.to_owned()).into())
        }
    }

    /// The canonical identifier of a variable origin.
    ///
    /// Single-byte memory references use the bare address form, matching the keys of
    /// engine models.
    pub fn canonical_name(origin: &VarOrigin) -> String {
        match origin {
            VarOrigin::Register(name) => name.clone(),
            VarOrigin::Memory { address, bytes: 1 } => format!("0x{address:08x}"),
            VarOrigin::Memory { address, bytes } => format!("0x{address:08x}:{bytes}"),
        }
    }

    /// Declares a variable from its textual identifier.
    /// Idempotent: re-declaration returns the present identifier.
    pub fn declare_var(&mut self, token: &str) -> Result<TermId, ErrorKind> {
        let origin = Self::parse_var_token(token)?;
        let name = Self::canonical_name(&origin);
        if let Some(id) = self.vars.get(&name) {
            return Ok(*id);
        }
        let id = self.intern(Term::Variable(origin));
        self.vars.insert(name, id);
        Ok(id)
    }

    /// Parses a constant spelling to its value and width.
    ///
    /// Hex constants are `4·hex_digits` wide, binary constants are as wide as their
    /// digit count, and decimal constants take the width of their minimal hex spelling.
    pub fn parse_const_token(token: &str) -> Result<(u128, u32), ErrorKind> {
        let token = token.trim();
        let (value, width) = if let Some(hex) = token.strip_prefix("0x") {
            let value = u128::from_str_radix(hex, 16)
                .map_err(|_| TermError::ConstantTooWide(token.to_owned()))?;
            (value, 4 * hex.len() as u32)
        } else if let Some(bin) = token.strip_prefix("0b") {
            let value = u128::from_str_radix(bin, 2)
                .map_err(|_| TermError::ConstantTooWide(token.to_owned()))?;
            (value, bin.len() as u32)
        } else {
            let value = token
                .parse::<u128>()
                .map_err(|_| ConfigError::Constant(token.to_owned()))?;
            let width = 4 * format!("{value:x}").len() as u32;
            (value, width)
        };
        if width == 0 || width > 128 {
            return Err(TermError::ConstantTooWide(token.to_owned()).into());
        }
        Ok((value, width))
    }

    /// Declares a constant from its spelling. Idempotent.
    pub fn declare_const(&mut self, token: &str) -> Result<TermId, ErrorKind> {
        let (value, width) = Self::parse_const_token(token)?;
        Ok(self.declare_const_value(value, width))
    }

    /// Declares a constant from a value and a target width.
    /// The value is masked to the width.
    pub fn declare_const_value(&mut self, value: u128, width: u32) -> TermId {
        self.intern(Term::Constant {
            value: mask_value(value, width),
            width,
        })
    }

    /// Declares byte `index` of a variable. Idempotent.
    ///
    /// For memory variables the byte is the memory variable at the offset address; for
    /// registers, a byte-slice term.
    pub fn declare_byte(&mut self, var: TermId, index: u32) -> Result<TermId, ErrorKind> {
        match self.term(var) {
            Term::Variable(VarOrigin::Memory { address, bytes }) => {
                if index >= *bytes {
                    return Err(TermError::SliceOutOfRange.into());
                }
                let address = *address + index as u64;
                self.declare_var(&format!("0x{address:08x}"))
            }
            Term::Variable(VarOrigin::Register(_)) => {
                if index >= self.width(var) / 8 {
                    return Err(TermError::SliceOutOfRange.into());
                }
                Ok(self.intern(Term::ByteSlice { base: var, index }))
            }
            _ => Err(TermError::SliceOutOfRange.into()),
        }
    }

    /// Declares bit `index` of a variable. Idempotent.
    pub fn declare_bit(&mut self, var: TermId, index: u32) -> Result<TermId, ErrorKind> {
        match self.term(var) {
            Term::Variable(_) => {
                if index >= self.width(var) {
                    return Err(TermError::SliceOutOfRange.into());
                }
                Ok(self.intern(Term::BitSlice { base: var, index }))
            }
            _ => Err(TermError::SliceOutOfRange.into()),
        }
    }

    /// All bytes of a variable, low to high.
    pub fn bytes_of(&mut self, var: TermId) -> Result<Vec<TermId>, ErrorKind> {
        let count = self.width(var) / 8;
        (0..count).map(|i| self.declare_byte(var, i)).collect()
    }

    /// All bits of a variable, low to high.
    pub fn bits_of(&mut self, var: TermId) -> Result<Vec<TermId>, ErrorKind> {
        let count = self.width(var);
        (0..count).map(|i| self.declare_bit(var, i)).collect()
    }

    // Compound terms

    /// Creates a binary atom, width-normalizing operands.
    ///
    /// When operand widths differ: a constant operand is re-interned at the width of
    /// the other operand; otherwise the narrower operand is zero-extended.
    pub fn binary(&mut self, op: Relation, lhs: TermId, rhs: TermId) -> Result<TermId, ErrorKind> {
        let (lhs, rhs) = self.normalize_widths(lhs, rhs)?;
        Ok(self.intern(Term::Binary { op, lhs, rhs }))
    }

    fn normalize_widths(&mut self, a: TermId, b: TermId) -> Result<(TermId, TermId), ErrorKind> {
        let (wa, wb) = (self.width(a), self.width(b));
        if wa == wb {
            return Ok((a, b));
        }
        if wa == 0 || wb == 0 {
            // A boolean operand in a bit-vector relation.
            return Err(TermError::WidthMismatch(wa, wb).into());
        }
        let (narrow, wide, target) = if wa < wb { (a, b, wb) } else { (b, a, wa) };
        let widened = match *self.term(narrow) {
            Term::Constant { value, .. } => self.declare_const_value(value, target),
            _ => self.intern(Term::ZeroExtend {
                term: narrow,
                extra: target - self.width(narrow),
            }),
        };
        if wa < wb {
            Ok((widened, wide))
        } else {
            Ok((wide, widened))
        }
    }

    /// Creates a junction over a collection of terms.
    ///
    /// Terms are deduplicated and ordered by their rendering, so the result is
    /// independent of insertion order.
    /// A single term is returned as-is.
    pub fn junction(
        &mut self,
        op: Junction,
        terms: impl IntoIterator<Item = TermId>,
    ) -> Result<TermId, ErrorKind> {
        let ordered = self.ordered_distinct(terms);
        match ordered.len() {
            0 => Err(TermError::EmptyConnective.into()),
            1 => Ok(ordered[0]),
            _ => Ok(self.intern(Term::Connective { op, terms: ordered })),
        }
    }

    /// Creates the negation of a conjunction of terms.
    ///
    /// An empty collection negates the trivially true conjunction.
    pub fn negation(&mut self, terms: impl IntoIterator<Item = TermId>) -> TermId {
        let ordered = self.ordered_distinct(terms);
        self.intern(Term::Negation { terms: ordered })
    }

    fn ordered_distinct(&self, terms: impl IntoIterator<Item = TermId>) -> Vec<TermId> {
        let mut ordered: Vec<TermId> = terms.into_iter().collect::<BTreeSet<_>>().into_iter().collect();
        ordered.sort_by(|a, b| self.render(*a).cmp(&self.render(*b)));
        ordered
    }

    /// An equality-style atom binding a variable identifier to a constant spelling.
    ///
    /// The constant is interned at the width of the variable.
    pub fn var_assignment(
        &mut self,
        op: Relation,
        identifier: &str,
        value: &str,
    ) -> Result<TermId, ErrorKind> {
        let var = self.declare_var(identifier)?;
        let parsed = parse_int_token(value).ok_or(ConfigError::Constant(value.to_owned()))?;
        let constant = self.declare_const_value(parsed, self.width(var));
        self.binary(op, var, constant)
    }

    // Inspection

    /// The width of a term, in bits. Relations and connectives report 0.
    pub fn width(&self, id: TermId) -> u32 {
        match self.term(id) {
            Term::Variable(VarOrigin::Register(_)) => 32,
            Term::Variable(VarOrigin::Memory { bytes, .. }) => 8 * bytes,
            Term::Constant { width, .. } => *width,
            Term::ByteSlice { .. } => 8,
            Term::BitSlice { .. } => 1,
            Term::ZeroExtend { term, extra } => self.width(*term) + extra,
            Term::Binary { .. } | Term::Connective { .. } | Term::Negation { .. } => 0,
        }
    }

    /// Whether the term is a literal constant.
    pub fn is_const(&self, id: TermId) -> bool {
        matches!(self.term(id), Term::Constant { .. })
    }

    /// Whether the term is a registered variable.
    pub fn is_variable(&self, id: TermId) -> bool {
        matches!(self.term(id), Term::Variable(_))
    }

    /// Whether the term is a memory variable, and if so its address and byte size.
    pub fn memory_origin(&self, id: TermId) -> Option<(u64, u32)> {
        match self.term(id) {
            Term::Variable(VarOrigin::Memory { address, bytes }) => Some((*address, *bytes)),
            _ => None,
        }
    }

    /// The canonical identifier of a variable term.
    pub fn var_canonical_name(&self, id: TermId) -> Option<String> {
        match self.term(id) {
            Term::Variable(origin) => Some(Self::canonical_name(origin)),
            _ => None,
        }
    }

    /// Whether the term is a byte or bit slice.
    pub fn is_slice(&self, id: TermId) -> bool {
        matches!(
            self.term(id),
            Term::ByteSlice { .. } | Term::BitSlice { .. }
        )
    }

    /// Base variables occurring in a term, collected into `out`.
    ///
    /// Slices and extensions are transparent: their base variable is collected.
    pub fn collect_base_vars(&self, id: TermId, out: &mut BTreeSet<TermId>) {
        match self.term(id) {
            Term::Variable(_) => {
                out.insert(id);
            }
            Term::Constant { .. } => {}
            Term::ByteSlice { base, .. } | Term::BitSlice { base, .. } => {
                self.collect_base_vars(*base, out)
            }
            Term::ZeroExtend { term, .. } => self.collect_base_vars(*term, out),
            Term::Binary { lhs, rhs, .. } => {
                self.collect_base_vars(*lhs, out);
                self.collect_base_vars(*rhs, out);
            }
            Term::Connective { terms, .. } | Term::Negation { terms } => {
                for t in terms {
                    self.collect_base_vars(*t, out);
                }
            }
        }
    }

    /// The syntactic complexity of a term.
    ///
    /// Leaves are free; slices, extensions, atoms, and connectives each cost one.
    pub fn complexity(&self, id: TermId) -> usize {
        match self.term(id) {
            Term::Variable(_) | Term::Constant { .. } => 0,
            Term::ByteSlice { base, .. } | Term::BitSlice { base, .. } => {
                1 + self.complexity(*base)
            }
            Term::ZeroExtend { term, .. } => 1 + self.complexity(*term),
            Term::Binary { lhs, rhs, .. } => 1 + self.complexity(*lhs) + self.complexity(*rhs),
            Term::Connective { terms, .. } | Term::Negation { terms } => {
                1 + terms.iter().map(|t| self.complexity(*t)).sum::<usize>()
            }
        }
    }

    // Rendering

    /// The spelling of a constant at a width: hex when the width is a multiple of four
    /// bits, binary otherwise, zero-padded to the width.
    pub fn const_spelling(value: u128, width: u32) -> String {
        if width % 4 == 0 {
            format!("0x{:0>width$x}", value, width = (width / 4) as usize)
        } else {
            format!("0b{:0>width$b}", value, width = width as usize)
        }
    }

    /// Renders a term in the concrete script syntax.
    ///
    /// Memory variables render as `@[0xADDR,N]`, registers as `name<32>`, constants in
    /// their padded spelling, atoms as `(lhs op rhs)`, and negations as `!(…)`.
    pub fn render(&self, id: TermId) -> String {
        match self.term(id) {
            Term::Variable(VarOrigin::Register(name)) => format!("{name}<32>"),
            Term::Variable(VarOrigin::Memory { address, bytes }) => {
                format!("@[0x{address:08x},{bytes}]")
            }
            Term::Constant { value, width } => Self::const_spelling(*value, *width),
            Term::ByteSlice { base, index } => {
                format!("{}{{{}..{}}}", self.render(*base), 8 * index, 8 * index + 7)
            }
            Term::BitSlice { base, index } => format!("{}{{{index}}}", self.render(*base)),
            Term::ZeroExtend { term, extra } => {
                let zeros = if extra % 4 == 0 {
                    format!("0x{:0>width$}", "", width = (extra / 4) as usize)
                } else {
                    format!("0b{:0>width$}", "", width = *extra as usize)
                };
                format!("{zeros}::{}", self.render(*term))
            }
            Term::Binary { op, lhs, rhs } => {
                format!("({} {op} {})", self.render(*lhs), self.render(*rhs))
            }
            Term::Connective { op, terms } => {
                let body = terms
                    .iter()
                    .map(|t| self.render(*t))
                    .collect::<Vec<_>>()
                    .join(&format!(" {op} "));
                format!("({body})")
            }
            Term::Negation { terms } => {
                if terms.is_empty() {
                    // The trivially true conjunction.
                    "!(0x0 = 0x0)".to_owned()
                } else {
                    let body = terms
                        .iter()
                        .map(|t| self.render(*t))
                        .collect::<Vec<_>>()
                        .join(" & ");
                    format!("!({body})")
                }
            }
        }
    }
}

/// Parses an integer spelling in hex (`0x`), binary (`0b`), or decimal form.
pub fn parse_int_token(token: &str) -> Option<u128> {
    let token = token.trim();
    if let Some(hex) = token.strip_prefix("0x") {
        u128::from_str_radix(hex, 16).ok()
    } else if let Some(bin) = token.strip_prefix("0b") {
        u128::from_str_radix(bin, 2).ok()
    } else {
        token.parse::<u128>().ok()
    }
}
