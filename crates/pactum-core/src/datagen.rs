//! Random value helpers used by scalar pattern generation

use base64::Engine;
use rand::Rng;

/// Upper bound on generated string lengths.
pub(crate) const MAX_STRING_LEN: usize = 256;

pub(crate) fn random_alnum(rng: &mut impl Rng, len: usize) -> String {
    const CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    (0..len)
        .map(|_| CHARS[rng.gen_range(0..CHARS.len())] as char)
        .collect()
}

pub(crate) fn random_email(rng: &mut impl Rng) -> String {
    format!("user{}@example.com", rng.gen_range(1..9999_u32))
}

pub(crate) fn random_uuid() -> String {
    uuid::Uuid::new_v4().to_string()
}

pub(crate) fn random_date(rng: &mut impl Rng) -> String {
    let days = rng.gen_range(0..3650_i64);
    let date = chrono::NaiveDate::from_ymd_opt(2020, 1, 1)
        .and_then(|base| base.checked_add_signed(chrono::Duration::days(days)));
    date.map_or_else(|| "2024-01-15".to_string(), |d| d.format("%Y-%m-%d").to_string())
}

pub(crate) fn random_datetime(rng: &mut impl Rng) -> String {
    let seconds = rng.gen_range(0..86_400_i64 * 3650);
    chrono::DateTime::from_timestamp(1_577_836_800 + seconds, 0).map_or_else(
        || "2024-01-15T12:00:00Z".to_string(),
        |dt| dt.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
    )
}

pub(crate) fn random_base64(rng: &mut impl Rng) -> String {
    let len = rng.gen_range(4..24);
    let raw = random_alnum(rng, len);
    base64::engine::general_purpose::STANDARD.encode(raw)
}

// ── Regex-driven strings ──
//
// Covers literals, escapes (\d \w \s and escaped punctuation), classes with
// ranges, `.`, groups and the quantifiers ? * + {n} {n,m}. Anything else
// (alternation, lookaround, backreferences) returns None and the caller
// falls back to sampling.

#[derive(Debug, Clone)]
enum Atom {
    Literal(char),
    Class(Vec<(char, char)>),
    Group(Vec<Piece>),
}

#[derive(Debug, Clone)]
struct Piece {
    atom: Atom,
    min: usize,
    max: usize,
}

const UNBOUNDED_REPEAT: usize = 4;

pub(crate) fn from_regex(pattern: &str, rng: &mut impl Rng) -> Option<String> {
    let trimmed = pattern.strip_prefix('^').unwrap_or(pattern);
    let trimmed = trimmed.strip_suffix('$').unwrap_or(trimmed);
    let chars: Vec<char> = trimmed.chars().collect();
    let mut pos = 0;
    let pieces = parse_sequence(&chars, &mut pos)?;
    if pos != chars.len() {
        return None;
    }
    let mut out = String::new();
    render(&pieces, rng, &mut out);
    Some(out)
}

fn parse_sequence(chars: &[char], pos: &mut usize) -> Option<Vec<Piece>> {
    let mut pieces = Vec::new();
    while *pos < chars.len() {
        let atom = match chars[*pos] {
            ')' => break,
            '|' | '^' | '$' => return None,
            '(' => {
                *pos += 1;
                if chars.get(*pos) == Some(&'?') {
                    if chars.get(*pos + 1) != Some(&':') {
                        return None;
                    }
                    *pos += 2;
                }
                let inner = parse_sequence(chars, pos)?;
                if chars.get(*pos) != Some(&')') {
                    return None;
                }
                *pos += 1;
                Atom::Group(inner)
            }
            '[' => {
                *pos += 1;
                parse_class(chars, pos)?
            }
            '\\' => {
                *pos += 1;
                let escaped = *chars.get(*pos)?;
                *pos += 1;
                escape_atom(escaped)?
            }
            '.' => {
                *pos += 1;
                Atom::Class(vec![('a', 'z'), ('A', 'Z'), ('0', '9')])
            }
            c => {
                *pos += 1;
                Atom::Literal(c)
            }
        };
        let (min, max) = parse_quantifier(chars, pos)?;
        pieces.push(Piece { atom, min, max });
    }
    Some(pieces)
}

fn escape_atom(c: char) -> Option<Atom> {
    Some(match c {
        'd' => Atom::Class(vec![('0', '9')]),
        'w' => Atom::Class(vec![('a', 'z'), ('A', 'Z'), ('0', '9'), ('_', '_')]),
        's' => Atom::Literal(' '),
        c if c.is_ascii_punctuation() => Atom::Literal(c),
        _ => return None,
    })
}

fn parse_class(chars: &[char], pos: &mut usize) -> Option<Atom> {
    if chars.get(*pos) == Some(&'^') {
        return None;
    }
    let mut ranges = Vec::new();
    while *pos < chars.len() && chars[*pos] != ']' {
        let start = if chars[*pos] == '\\' {
            *pos += 1;
            match escape_atom(*chars.get(*pos)?)? {
                Atom::Literal(c) => c,
                Atom::Class(mut class) => {
                    ranges.append(&mut class);
                    *pos += 1;
                    continue;
                }
                Atom::Group(_) => return None,
            }
        } else {
            chars[*pos]
        };
        *pos += 1;
        if chars.get(*pos) == Some(&'-') && chars.get(*pos + 1).is_some_and(|c| *c != ']') {
            let end = chars[*pos + 1];
            *pos += 2;
            ranges.push((start, end));
        } else {
            ranges.push((start, start));
        }
    }
    if chars.get(*pos) != Some(&']') || ranges.is_empty() {
        return None;
    }
    *pos += 1;
    Some(Atom::Class(ranges))
}

fn parse_quantifier(chars: &[char], pos: &mut usize) -> Option<(usize, usize)> {
    let bounds = match chars.get(*pos) {
        Some('?') => (0, 1),
        Some('*') => (0, UNBOUNDED_REPEAT),
        Some('+') => (1, UNBOUNDED_REPEAT),
        Some('{') => {
            let close = chars[*pos..].iter().position(|c| *c == '}')? + *pos;
            let body: String = chars[*pos + 1..close].iter().collect();
            *pos = close;
            match body.split_once(',') {
                Some((lo, "")) => {
                    let lo = lo.trim().parse().ok()?;
                    (lo, lo + UNBOUNDED_REPEAT)
                }
                Some((lo, hi)) => (lo.trim().parse().ok()?, hi.trim().parse().ok()?),
                None => {
                    let n = body.trim().parse().ok()?;
                    (n, n)
                }
            }
        }
        _ => return Some((1, 1)),
    };
    *pos += 1;
    (bounds.0 <= bounds.1).then_some(bounds)
}

fn render(pieces: &[Piece], rng: &mut impl Rng, out: &mut String) {
    for piece in pieces {
        let count = rng.gen_range(piece.min..=piece.max);
        for _ in 0..count {
            match &piece.atom {
                Atom::Literal(c) => out.push(*c),
                Atom::Class(ranges) => {
                    let (lo, hi) = ranges[rng.gen_range(0..ranges.len())];
                    let picked = rng.gen_range(u32::from(lo)..=u32::from(hi.max(lo)));
                    out.push(char::from_u32(picked).unwrap_or(lo));
                }
                Atom::Group(inner) => render(inner, rng, out),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn rng() -> SmallRng {
        SmallRng::seed_from_u64(42)
    }

    #[test]
    fn regex_strings_match_their_regex() {
        let mut rng = rng();
        for pattern in [
            "^[A-Z]{3}-\\d{4}$",
            "[a-z]+@[a-z]+\\.com",
            "(ab)?c*",
            "\\w{2,5}",
            "v[0-9]\\.[0-9]",
        ] {
            let generated = from_regex(pattern, &mut rng).unwrap();
            let re = regex::Regex::new(&format!("^(?:{pattern})$")).unwrap();
            assert!(re.is_match(&generated), "{generated} vs {pattern}");
        }
    }

    #[test]
    fn unsupported_regex_returns_none() {
        assert!(from_regex("a|b", &mut rng()).is_none());
        assert!(from_regex("[^a]", &mut rng()).is_none());
    }

    #[test]
    fn formats_are_well_formed() {
        let mut rng = rng();
        assert!(chrono::NaiveDate::parse_from_str(&random_date(&mut rng), "%Y-%m-%d").is_ok());
        assert!(chrono::DateTime::parse_from_rfc3339(&random_datetime(&mut rng)).is_ok());
        assert!(uuid::Uuid::parse_str(&random_uuid()).is_ok());
        assert!(random_email(&mut rng).contains('@'));
        let encoded = random_base64(&mut rng);
        assert!(base64::engine::general_purpose::STANDARD.decode(encoded).is_ok());
    }
}
