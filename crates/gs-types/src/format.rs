//! Python-compatible format specs for placeholder values.
//!
//! Templates and naming patterns are written for Python's `str.format`, so
//! `{pa:.2f}` must produce exactly what Python would produce. This module
//! implements the standard format-spec mini-language:
//!
//! ```text
//! [[fill]align][sign][#][0][width][,][.precision][type]
//! ```
//!
//! with presentation types `f F e E g G d s %` (or none).

use thiserror::Error;

use crate::value::ParameterValue;

/// Largest precision accepted in a spec. The std formatter caps precision at
/// `u16::MAX`, and `g` asks for up to four more decimals than requested.
pub const MAX_PRECISION: usize = u16::MAX as usize - 4;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormatError {
    #[error("{0}")]
    InvalidSpec(String),

    #[error("{0}")]
    Incompatible(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
    Center,
    /// Padding goes between the sign and the digits (`=`).
    AfterSign,
}

impl Align {
    fn from_char(c: char) -> Option<Self> {
        match c {
            '<' => Some(Self::Left),
            '>' => Some(Self::Right),
            '^' => Some(Self::Center),
            '=' => Some(Self::AfterSign),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Sign {
    #[default]
    Minus,
    Plus,
    Space,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatType {
    Fixed,
    FixedUpper,
    Exponent,
    ExponentUpper,
    General,
    GeneralUpper,
    Decimal,
    Str,
    Percent,
}

impl FormatType {
    fn from_char(c: char) -> Option<Self> {
        match c {
            'f' => Some(Self::Fixed),
            'F' => Some(Self::FixedUpper),
            'e' => Some(Self::Exponent),
            'E' => Some(Self::ExponentUpper),
            'g' => Some(Self::General),
            'G' => Some(Self::GeneralUpper),
            'd' => Some(Self::Decimal),
            's' => Some(Self::Str),
            '%' => Some(Self::Percent),
            _ => None,
        }
    }

    pub fn code(self) -> char {
        match self {
            Self::Fixed => 'f',
            Self::FixedUpper => 'F',
            Self::Exponent => 'e',
            Self::ExponentUpper => 'E',
            Self::General => 'g',
            Self::GeneralUpper => 'G',
            Self::Decimal => 'd',
            Self::Str => 's',
            Self::Percent => '%',
        }
    }

    fn is_upper(self) -> bool {
        matches!(
            self,
            Self::FixedUpper | Self::ExponentUpper | Self::GeneralUpper
        )
    }
}

/// A parsed format spec.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FormatSpec {
    pub fill: Option<char>,
    pub align: Option<Align>,
    pub sign: Sign,
    pub alternate: bool,
    pub zero_pad: bool,
    pub width: Option<usize>,
    pub grouping: bool,
    pub precision: Option<usize>,
    pub kind: Option<FormatType>,
}

impl std::str::FromStr for FormatSpec {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl FormatSpec {
    pub fn parse(spec: &str) -> Result<Self, FormatError> {
        let chars: Vec<char> = spec.chars().collect();
        let mut out = Self::default();
        let mut i = 0;

        if chars.len() >= 2 {
            if let Some(align) = Align::from_char(chars[1]) {
                out.fill = Some(chars[0]);
                out.align = Some(align);
                i = 2;
            }
        }
        if out.align.is_none() {
            if let Some(align) = chars.first().and_then(|c| Align::from_char(*c)) {
                out.align = Some(align);
                i = 1;
            }
        }

        match chars.get(i) {
            Some('+') => {
                out.sign = Sign::Plus;
                i += 1;
            }
            Some(' ') => {
                out.sign = Sign::Space;
                i += 1;
            }
            Some('-') => i += 1,
            _ => {}
        }

        if chars.get(i) == Some(&'#') {
            out.alternate = true;
            i += 1;
        }
        if chars.get(i) == Some(&'0') {
            out.zero_pad = true;
            i += 1;
        }

        let (width, next) = read_number(&chars, i)?;
        out.width = width;
        i = next;

        if chars.get(i) == Some(&',') {
            out.grouping = true;
            i += 1;
        }

        if chars.get(i) == Some(&'.') {
            let (precision, next) = read_number(&chars, i + 1)?;
            match precision {
                Some(p) if p > MAX_PRECISION => {
                    return Err(FormatError::InvalidSpec(format!(
                        "precision {p} exceeds the maximum of {MAX_PRECISION}"
                    )))
                }
                Some(p) => out.precision = Some(p),
                None => {
                    return Err(FormatError::InvalidSpec(
                        "format specifier missing precision".to_string(),
                    ))
                }
            }
            i = next;
        }

        if let Some(&c) = chars.get(i) {
            let kind = FormatType::from_char(c)
                .ok_or_else(|| FormatError::InvalidSpec(format!("unknown format code '{c}'")))?;
            out.kind = Some(kind);
            i += 1;
        }

        if i < chars.len() {
            return Err(FormatError::InvalidSpec("invalid format specifier".to_string()));
        }

        Ok(out)
    }

    /// Format a value the way Python's `format(value, spec)` would.
    pub fn apply(&self, value: &ParameterValue) -> Result<String, FormatError> {
        if let Some(p) = self.precision.filter(|p| *p > MAX_PRECISION) {
            return Err(FormatError::InvalidSpec(format!(
                "precision {p} exceeds the maximum of {MAX_PRECISION}"
            )));
        }
        match value {
            ParameterValue::Text(s) => self.format_text(s),
            ParameterValue::Int(v) => self.format_int(*v),
            ParameterValue::Float(v) => self.format_float(*v),
        }
    }

    fn format_text(&self, s: &str) -> Result<String, FormatError> {
        if let Some(kind) = self.kind.filter(|k| *k != FormatType::Str) {
            return Err(incompatible(kind, "str"));
        }
        if self.sign != Sign::Minus {
            return Err(FormatError::Incompatible(
                "sign not allowed in string format specifier".to_string(),
            ));
        }
        if self.alternate {
            return Err(FormatError::Incompatible(
                "alternate form (#) not allowed in string format specifier".to_string(),
            ));
        }
        if self.grouping {
            return Err(FormatError::Incompatible("cannot specify ',' with 's'".to_string()));
        }
        if self.align == Some(Align::AfterSign) {
            return Err(FormatError::Incompatible(
                "'=' alignment not allowed in string format specifier".to_string(),
            ));
        }

        let body: String = match self.precision {
            Some(p) => s.chars().take(p).collect(),
            None => s.to_string(),
        };
        Ok(self.pad("", &body, Align::Left, false))
    }

    fn format_int(&self, v: i64) -> Result<String, FormatError> {
        match self.kind {
            None | Some(FormatType::Decimal) => {
                if self.precision.is_some() {
                    return Err(FormatError::InvalidSpec(
                        "precision not allowed in integer format specifier".to_string(),
                    ));
                }
                let sign = self.sign_str(v < 0);
                let mut digits = v.unsigned_abs().to_string();
                if self.grouping {
                    digits = self.group(sign, &digits);
                }
                Ok(self.pad(sign, &digits, Align::Right, true))
            }
            Some(FormatType::Str) => Err(incompatible(FormatType::Str, "int")),
            Some(_) => self.format_float(v as f64),
        }
    }

    fn format_float(&self, v: f64) -> Result<String, FormatError> {
        if let Some(kind @ (FormatType::Decimal | FormatType::Str)) = self.kind {
            return Err(incompatible(kind, "float"));
        }

        let negative = v.is_sign_negative() && !v.is_nan();
        let abs = v.abs();
        let upper = self.kind.is_some_and(FormatType::is_upper);

        let mut body = if !abs.is_finite() {
            let text = if abs.is_nan() { "nan" } else { "inf" };
            if upper {
                text.to_uppercase()
            } else {
                text.to_string()
            }
        } else {
            match self.kind {
                Some(FormatType::Fixed | FormatType::FixedUpper) => {
                    fixed(abs, self.precision.unwrap_or(6), self.alternate)
                }
                Some(FormatType::Exponent | FormatType::ExponentUpper) => {
                    exponent(abs, self.precision.unwrap_or(6), self.alternate, upper)
                }
                Some(FormatType::General | FormatType::GeneralUpper) => {
                    general(abs, self.precision.unwrap_or(6), self.alternate, upper, false)
                }
                Some(FormatType::Percent) => {
                    fixed(abs * 100.0, self.precision.unwrap_or(6), self.alternate)
                }
                Some(FormatType::Decimal | FormatType::Str) => unreachable!("rejected above"),
                None => match self.precision {
                    Some(p) => general(abs, p, self.alternate, false, true),
                    None => python_float_str(abs),
                },
            }
        };

        if self.kind == Some(FormatType::Percent) {
            body.push('%');
        }
        let sign = self.sign_str(negative);
        if self.grouping {
            body = self.group(sign, &body);
        }

        Ok(self.pad(sign, &body, Align::Right, true))
    }

    /// Insert thousands separators into the integer digits of `body`. Zero
    /// padding after the sign is grouped as well (`0,001,234.50`).
    fn group(&self, sign: &str, body: &str) -> String {
        let split = body.find(|c: char| !c.is_ascii_digit()).unwrap_or(body.len());
        let (int_part, rest) = body.split_at(split);
        let min_width = if self.pads_with_zeros() && !int_part.is_empty() {
            self.width
                .unwrap_or(0)
                .saturating_sub(sign.chars().count() + rest.chars().count())
        } else {
            0
        };
        format!("{}{rest}", group_thousands(int_part, min_width))
    }

    fn pads_with_zeros(&self) -> bool {
        let fill = self.fill.unwrap_or(if self.zero_pad { '0' } else { ' ' });
        let align = self
            .align
            .or(if self.zero_pad { Some(Align::AfterSign) } else { None });
        fill == '0' && align == Some(Align::AfterSign)
    }

    fn sign_str(&self, negative: bool) -> &'static str {
        if negative {
            return "-";
        }
        match self.sign {
            Sign::Minus => "",
            Sign::Plus => "+",
            Sign::Space => " ",
        }
    }

    fn pad(&self, sign: &str, body: &str, default_align: Align, numeric: bool) -> String {
        let len = sign.chars().count() + body.chars().count();
        let width = self.width.unwrap_or(0);
        if len >= width {
            return format!("{sign}{body}");
        }

        let fill = self
            .fill
            .unwrap_or(if self.zero_pad { '0' } else { ' ' });
        let align = match self.align {
            Some(align) => align,
            None if self.zero_pad && numeric => Align::AfterSign,
            None => default_align,
        };

        let n = width - len;
        let fills = |k: usize| std::iter::repeat(fill).take(k).collect::<String>();
        match align {
            Align::Left => format!("{sign}{body}{}", fills(n)),
            Align::Right => format!("{}{sign}{body}", fills(n)),
            Align::Center => {
                let left = n / 2;
                format!("{}{sign}{body}{}", fills(left), fills(n - left))
            }
            Align::AfterSign => format!("{sign}{}{body}", fills(n)),
        }
    }
}

fn incompatible(kind: FormatType, type_name: &str) -> FormatError {
    FormatError::Incompatible(format!(
        "unknown format code '{}' for object of type '{type_name}'",
        kind.code()
    ))
}

fn read_number(chars: &[char], start: usize) -> Result<(Option<usize>, usize), FormatError> {
    let end = chars[start.min(chars.len())..]
        .iter()
        .position(|c| !c.is_ascii_digit())
        .map_or(chars.len(), |p| start + p);
    if end <= start {
        return Ok((None, start));
    }
    let digits: String = chars[start..end].iter().collect();
    let n = digits
        .parse()
        .map_err(|_| FormatError::InvalidSpec("too many decimal digits in format string".to_string()))?;
    Ok((Some(n), end))
}

fn fixed(abs: f64, precision: usize, alternate: bool) -> String {
    let mut s = format!("{abs:.precision$}");
    if precision == 0 && alternate {
        s.push('.');
    }
    s
}

fn exponent(abs: f64, precision: usize, alternate: bool, upper: bool) -> String {
    let s = format!("{abs:.precision$e}");
    let (mantissa, exp) = split_exponent(&s);
    let mut mantissa = mantissa.to_string();
    if precision == 0 && alternate {
        mantissa.push('.');
    }
    join_exponent(&mantissa, exp, upper)
}

/// `g` presentation; with `repr_style` it follows the no-type rules instead
/// (scientific from `exp >= p - 1`, and always a digit after the point).
fn general(abs: f64, precision: usize, alternate: bool, upper: bool, repr_style: bool) -> String {
    let p = precision.max(1);
    let sci = format!("{abs:.prec$e}", prec = p - 1);
    let (mantissa, exp) = split_exponent(&sci);
    let exp = if abs == 0.0 { 0 } else { exp };
    let limit = if repr_style { p as i32 - 1 } else { p as i32 };

    if (-4..limit).contains(&exp) {
        let decimals = (p as i32 - 1 - exp) as usize;
        let mut s = format!("{abs:.decimals$}");
        if !alternate {
            s = strip_trailing_zeros(&s);
        }
        if repr_style && !s.contains('.') {
            s.push_str(".0");
        }
        s
    } else {
        let mantissa = if alternate {
            mantissa.to_string()
        } else {
            strip_trailing_zeros(mantissa)
        };
        join_exponent(&mantissa, exp, upper)
    }
}

fn split_exponent(s: &str) -> (&str, i32) {
    match s.split_once('e') {
        Some((mantissa, exp)) => (mantissa, exp.parse().unwrap_or(0)),
        None => (s, 0),
    }
}

fn join_exponent(mantissa: &str, exp: i32, upper: bool) -> String {
    let e = if upper { 'E' } else { 'e' };
    let sign = if exp < 0 { '-' } else { '+' };
    format!("{mantissa}{e}{sign}{:02}", exp.unsigned_abs())
}

fn strip_trailing_zeros(s: &str) -> String {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s.to_string()
    }
}

/// Group `digits` in threes, left-padding with zeros until the result is at
/// least `min_width` long. A separator never leads, so the result may come out
/// one character wider.
fn group_thousands(digits: &str, min_width: usize) -> String {
    let digits: Vec<char> = digits.chars().collect();
    let mut remaining = digits.len();
    let mut emitted = 0;
    let mut reversed: Vec<char> = Vec::with_capacity(min_width.max(digits.len() * 4 / 3 + 1));
    while remaining > 0 || reversed.len() < min_width {
        if emitted > 0 && emitted % 3 == 0 {
            reversed.push(',');
        }
        if remaining > 0 {
            remaining -= 1;
            reversed.push(digits[remaining]);
        } else {
            reversed.push('0');
        }
        emitted += 1;
    }
    reversed.into_iter().rev().collect()
}

/// Python's `str(float)`: shortest round-trip digits, scientific notation
/// outside `1e-4 <= |v| < 1e16`.
pub fn python_float_str(v: f64) -> String {
    if v.is_nan() {
        return "nan".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if v == 0.0 {
        return if v.is_sign_negative() { "-0.0" } else { "0.0" }.to_string();
    }

    let sci = format!("{v:e}");
    let (mantissa, exp) = split_exponent(&sci);
    let sign = if mantissa.starts_with('-') { "-" } else { "" };
    let digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();

    if (-4..16).contains(&exp) {
        let point = exp + 1;
        let body = if point <= 0 {
            format!("0.{}{digits}", "0".repeat(point.unsigned_abs() as usize))
        } else if point as usize >= digits.len() {
            format!("{digits}{}.0", "0".repeat(point as usize - digits.len()))
        } else {
            let (int_part, frac) = digits.split_at(point as usize);
            format!("{int_part}.{frac}")
        };
        format!("{sign}{body}")
    } else {
        let (lead, rest) = digits.split_at(1);
        let mantissa = if rest.is_empty() {
            lead.to_string()
        } else {
            format!("{lead}.{rest}")
        };
        format!("{sign}{}", join_exponent(&mantissa, exp, false))
    }
}
