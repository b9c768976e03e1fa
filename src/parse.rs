//! Text format for strategies.
//!
//! One term per line, three factors separated by `*`:
//!
//! ```text
//! (a21+a22)*(b11)*(c21-c22)
//! a12*b22*c12
//! ```
//!
//! Entries are 1-indexed `a{row}{col}`, `b{row}{col}`, `c{row}{col}`; the C
//! subscripts are transposed relative to the output matrix and preserved
//! verbatim. Input coefficients are implicitly `+1`/`-1` (signs are parity
//! over GF(2)); whitespace is ignored everywhere. Lifted strategies render
//! with explicit signed coefficients (`3*a11`) and `0` for an empty factor.

use fixedbitset::FixedBitSet;

use crate::{
    common::{Dims, Error},
    strategy::{signed, LiftedStrategy, Strategy, Term},
};

/// Parses a GF(2) strategy, one term per non-empty line.
///
/// Repeated entries within a factor cancel modulo 2.
///
/// # Errors
///
/// [`Error::Parse`] with a 1-based line number on any malformed line:
/// wrong factor count, unknown entry name, out-of-range subscript, or a
/// non-unit coefficient.
pub fn parse(text: &str, dims: Dims) -> Result<Strategy, Error> {
    let mut terms = Vec::new();
    for (lineno, raw) in text.lines().enumerate() {
        let line: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
        if line.is_empty() {
            continue;
        }
        let term = parse_term(&line, dims).map_err(|reason| Error::Parse {
            line: lineno + 1,
            reason,
        })?;
        terms.push(term);
    }
    // Lengths are correct by construction, but keep the single checked entry
    // point for strategies.
    Strategy::new(dims, terms)
}

fn parse_term(line: &str, dims: Dims) -> Result<Term, String> {
    let factors = split_factors(line)?;
    let [fa, fb, fc] = factors;
    Ok(Term {
        u: parse_factor(&fa, 'a', dims.m, dims.n, |r, c| dims.a_index(r, c))?,
        v: parse_factor(&fb, 'b', dims.n, dims.k, |r, c| dims.b_index(r, c))?,
        // c{x}{y} is transposed: stored index is (x-1)*m + (y-1)
        w: parse_factor(&fc, 'c', dims.k, dims.m, |r, c| r * dims.m + c)?,
    })
}

/// Splits a line at the two `*` separators outside parentheses.
fn split_factors(line: &str) -> Result<[String; 3], String> {
    let mut parts = vec![String::new()];
    let mut depth = 0usize;
    for ch in line.chars() {
        match ch {
            '(' => {
                depth += 1;
                parts.last_mut().expect("nonempty").push(ch);
            }
            ')' => {
                depth = depth.checked_sub(1).ok_or("unbalanced parentheses")?;
                parts.last_mut().expect("nonempty").push(ch);
            }
            '*' if depth == 0 => parts.push(String::new()),
            _ => parts.last_mut().expect("nonempty").push(ch),
        }
    }
    if depth != 0 {
        return Err("unbalanced parentheses".into());
    }
    let n = parts.len();
    <[String; 3]>::try_from(parts).map_err(|_| format!("expected 3 factors, found {n}"))
}

/// Parses one signed sum of entries into a coefficient bit vector.
fn parse_factor(
    factor: &str,
    letter: char,
    rows: usize,
    cols: usize,
    index: impl Fn(usize, usize) -> usize,
) -> Result<FixedBitSet, String> {
    let mut bits = FixedBitSet::with_capacity(rows * cols);
    let inner = factor
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .unwrap_or(factor);
    if inner.is_empty() {
        return Err(format!("empty {letter} factor"));
    }
    if inner == "0" {
        return Ok(bits);
    }
    for atom in split_signed(inner) {
        let atom = atom.strip_prefix(['+', '-']).unwrap_or(&atom);
        let mut chars = atom.chars();
        let (got, r, c) = match (chars.next(), chars.next(), chars.next(), chars.next()) {
            (Some(l), Some(r), Some(c), None) if r.is_ascii_digit() && c.is_ascii_digit() => {
                (l, r as usize - '0' as usize, c as usize - '0' as usize)
            }
            _ => return Err(format!("malformed entry {atom:?}")),
        };
        if got != letter {
            return Err(format!("expected {letter} entry, found {atom:?}"));
        }
        if !(1..=rows).contains(&r) || !(1..=cols).contains(&c) {
            return Err(format!("entry {atom:?} out of range"));
        }
        // +1 and -1 are the same coefficient mod 2; duplicates cancel.
        bits.toggle(index(r - 1, c - 1));
    }
    Ok(bits)
}

/// Splits `a11+a12-a21` into signed atoms, keeping the leading sign.
fn split_signed(inner: &str) -> Vec<String> {
    let mut atoms = vec![String::new()];
    for ch in inner.chars() {
        if matches!(ch, '+' | '-') && !atoms.last().expect("nonempty").is_empty() {
            atoms.push(String::new());
        }
        atoms.last_mut().expect("nonempty").push(ch);
    }
    atoms.retain(|a| !a.is_empty() && a != "+");
    atoms
}

/// Renders a GF(2) strategy in the input format, one term per line.
#[must_use]
pub fn render(s: &Strategy) -> String {
    let dims = s.dims();
    s.terms()
        .iter()
        .map(|t| {
            let fa = render_factor(t.u.ones().map(|i| name('a', i, dims.n)));
            let fb = render_factor(t.v.ones().map(|i| name('b', i, dims.k)));
            let fc = render_factor(t.w.ones().map(|i| name('c', i, dims.m)));
            format!("{fa}*{fb}*{fc}")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Renders a lifted strategy with explicit signed coefficients.
#[must_use]
pub fn render_lifted(s: &LiftedStrategy) -> String {
    let dims = s.dims();
    let e = s.modexp();
    let part = |coeffs: &[u64], letter: char, cols: usize| {
        render_factor(coeffs.iter().enumerate().filter_map(|(i, &x)| {
            let x = signed(x, e);
            match x {
                0 => None,
                1 => Some(name(letter, i, cols)),
                -1 => Some(format!("-{}", name(letter, i, cols))),
                _ => Some(format!("{x}*{}", name(letter, i, cols))),
            }
        }))
    };
    s.terms()
        .iter()
        .map(|t| {
            let fa = part(&t.u, 'a', dims.n);
            let fb = part(&t.v, 'b', dims.k);
            let fc = part(&t.w, 'c', dims.m);
            format!("{fa}*{fb}*{fc}")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn name(letter: char, index: usize, cols: usize) -> String {
    format!("{letter}{}{}", index / cols + 1, index % cols + 1)
}

fn render_factor(parts: impl Iterator<Item = String>) -> String {
    let mut out = String::new();
    let mut count = 0usize;
    for part in parts {
        if !out.is_empty() && !part.starts_with('-') {
            out.push('+');
        }
        out.push_str(&part);
        count += 1;
    }
    match count {
        0 => "0".into(),
        1 => out,
        _ => format!("({out})"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{tensor::BitTensor, test_utils::MASKED_222};

    const MASKED_222_TEXT: &str = "\
        a12*b21*c11\n\
        a12*b22*c21\n\
        a21*b11*c12\n\
        a21*b12*c22\n\
        a22*b21*c12\n\
        a22*b22*c22\n";

    #[test]
    fn test_parse_masked_222() {
        let dims = Dims::new(2, 2, 2);
        let s = parse(MASKED_222_TEXT, dims).unwrap();
        assert_eq!(s, *MASKED_222);
    }

    #[test]
    fn test_parse_whitespace_and_signs() {
        let dims = Dims::new(2, 2, 2);
        let text = " ( a11 + a22 ) * ( b11 + b22 ) * ( c11 + c22 )\n\
                    (a21 - a11) * (b11 + b12) * c22\n";
        let s = parse(text, dims).unwrap();
        assert_eq!(s.rank(), 2);
        assert_eq!(s.terms()[0].u.count_ones(..), 2);
        // -a11 is the same as +a11 over GF(2)
        assert!(s.terms()[1].u[dims.a_index(0, 0)]);
        assert!(s.terms()[1].u[dims.a_index(1, 0)]);
    }

    #[test]
    fn test_parse_duplicates_cancel() {
        let dims = Dims::new(2, 2, 2);
        let s = parse("(a11+a11)*b11*c11\n", dims).unwrap();
        assert_eq!(s.terms()[0].u.count_ones(..), 0);
    }

    #[test]
    fn test_parse_errors() {
        let dims = Dims::new(2, 2, 2);
        for bad in [
            "a11*b11",          // missing factor
            "a11*b11*c11*c11",  // extra factor
            "a31*b11*c11",      // subscript out of range
            "b11*b11*c11",      // wrong operand letter
            "(2*a11)*b11*c11",  // non-unit coefficient
            "(a11*b11*c11",     // unbalanced parens
        ] {
            let err = parse(bad, dims).unwrap_err();
            assert!(matches!(err, Error::Parse { line: 1, .. }), "{bad}");
        }
    }

    #[test]
    fn test_render_roundtrip() {
        let dims = Dims::new(3, 3, 3);
        let s = Strategy::schoolbook(dims).masked(&mask![(0, 0)]);
        let text = render(&s);
        let back = parse(&text, dims).unwrap();
        assert_eq!(back, s);
        assert!(back.is_valid(&BitTensor::matmul_masked(dims, &mask![(0, 0)])));
    }

    #[test]
    fn test_render_lifted_signs() {
        use crate::strategy::LiftedStrategy;
        let s = &*MASKED_222;
        let lifted = LiftedStrategy::from_bits(s);
        // Mod 2 every coefficient renders as +1.
        assert_eq!(render_lifted(&lifted), render(s));
    }
}
