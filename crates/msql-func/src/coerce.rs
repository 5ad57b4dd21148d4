//! Comparison-domain selection and exact cross-type comparison.
//!
//! Comparison functions never compare raw [`Value`]s. They first pick one
//! [`Domain`] for the whole operand set, then lower every operand into a
//! [`CompareKey`] of that domain and compare keys. Selection is a fold of
//! each operand's [`OperandClass`] into a [`DomainSummary`] followed by
//! [`Domain::resolve`]; both steps are pure.
//!
//! Exactness rules:
//! - integers are compared as integers; mixed signed/unsigned sets widen to
//!   `i128`, so a negative value always sorts below every unsigned value.
//! - two or more exact operands at or above 2^53 escalate to `Decimal`,
//!   where doubles cannot merge distinct integers. `Decimal` keys are
//!   arbitrary precision: finite doubles lift by their exact binary value,
//!   and numeric strings keep every digit.
//! - `Float` is the fallback, never the first choice for exact operands.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;

use bigdecimal::BigDecimal;
use msql_error::{MsqlError, Result};
use msql_types::{Decimal, EvalType, FieldType, NumericStr, Value, parse_exact};
use num_bigint::BigInt;

/// Smallest magnitude at which doubles stop representing every integer.
const FLOAT_EXACT_LIMIT: u64 = 1 << 53;

/// Representation every operand of one comparison is lowered to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
    SignedInt,
    UnsignedInt,
    Float,
    Decimal,
    String,
}

/// Which rule set [`Domain::resolve`] applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareContext {
    /// `GREATEST`/`LEAST`: non-numeric strings force a byte-wise string
    /// comparison.
    General,
    /// `INTERVAL`: every operand is read as a number; strings convert
    /// through their longest numeric prefix and select `Float`.
    Numeric,
}

/// Range of a clean integer string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntRange {
    /// Fits `i64`.
    Signed,
    /// Above `i64::MAX`, fits `u64`.
    Unsigned,
    /// Outside both 64-bit ranges.
    Beyond64,
}

impl IntRange {
    fn of(i: i128) -> Self {
        if i64::try_from(i).is_ok() {
            Self::Signed
        } else if u64::try_from(i).is_ok() {
            Self::Unsigned
        } else {
            Self::Beyond64
        }
    }
}

/// Closed tag set describing one non-null operand.
///
/// `big` marks exact values whose magnitude is at or above 2^53.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandClass {
    SignedInt { big: bool },
    UnsignedInt { above_signed: bool, big: bool },
    /// `finite` is false for infinities and NaN, which have no decimal key.
    Float { finite: bool },
    Decimal { big: bool },
    IntString { range: IntRange, big: bool },
    /// Any other clean number with an exact reading, however many digits.
    DecimalString { big: bool },
    /// Numeric syntax whose exponent is too large to expand (`"1e5000"`);
    /// the `Decimal` domain keys it by its double value.
    InexactString,
    /// Anything else.
    Text,
}

impl OperandClass {
    /// Classify a value; `NULL` has no class.
    pub fn of(value: &Value) -> Option<Self> {
        let class = match value {
            Value::Null => return None,
            Value::Int(i) => Self::SignedInt {
                big: i.unsigned_abs() >= FLOAT_EXACT_LIMIT,
            },
            Value::UInt(u) => Self::UnsignedInt {
                above_signed: i64::try_from(*u).is_err(),
                big: *u >= FLOAT_EXACT_LIMIT,
            },
            Value::Float(f) => Self::Float {
                finite: f.is_finite(),
            },
            Value::Decimal(d) => Self::Decimal {
                big: decimal_is_big(d),
            },
            Value::Text(_) | Value::Bytes(_) => match value.string_numeric() {
                NumericStr::Int(i) => Self::IntString {
                    range: IntRange::of(i),
                    big: i.unsigned_abs() >= u128::from(FLOAT_EXACT_LIMIT),
                },
                NumericStr::Decimal(d) => Self::DecimalString {
                    big: decimal_is_big(&d),
                },
                NumericStr::Inexact => match parse_exact(&value.string_bytes()) {
                    Some(exact) => Self::DecimalString {
                        big: exact_is_big(&exact),
                    },
                    None => Self::InexactString,
                },
                NumericStr::NotNumeric => Self::Text,
            },
        };
        Some(class)
    }
}

fn decimal_is_big(d: &Decimal) -> bool {
    d.abs() >= Decimal::from(FLOAT_EXACT_LIMIT)
}

fn exact_is_big(d: &BigDecimal) -> bool {
    d.abs() >= BigDecimal::new(BigInt::from(FLOAT_EXACT_LIMIT), 0)
}

fn int_to_exact(i: impl Into<BigInt>) -> BigDecimal {
    BigDecimal::new(i.into(), 0)
}

fn decimal_to_exact(d: &Decimal) -> BigDecimal {
    BigDecimal::new(BigInt::from(d.mantissa()), i64::from(d.scale()))
}

/// The exact decimal value of a finite double: `m * 2^e` expands to
/// `m * 5^-e` at scale `-e` when `e` is negative.
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
fn float_to_exact(f: f64) -> Option<BigDecimal> {
    if !f.is_finite() {
        return None;
    }
    let bits = f.to_bits();
    let biased = ((bits >> 52) & 0x7ff) as i32;
    let fraction = bits & ((1 << 52) - 1);
    let (mantissa, exp2) = if biased == 0 {
        (fraction, -1074)
    } else {
        (fraction | (1 << 52), biased - 1075)
    };
    let mut int = BigInt::from(mantissa);
    if f.is_sign_negative() {
        int = -int;
    }
    Some(if exp2 >= 0 {
        BigDecimal::new(int << exp2.unsigned_abs(), 0)
    } else {
        let k = exp2.unsigned_abs();
        BigDecimal::new(int * BigInt::from(5_u8).pow(k), i64::from(k))
    })
}

/// Counts folded from the [`OperandClass`] of every non-null operand.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DomainSummary {
    pub operands: usize,
    pub strings: usize,
    /// Strings that are not clean numbers.
    pub text: usize,
    pub floats: usize,
    pub native_decimals: usize,
    /// Operands that are not exact integers (floats excluded).
    pub non_integers: usize,
    /// Integers above `i64::MAX` that still fit `u64`.
    pub above_signed: usize,
    /// Integers outside `[i64::MIN, u64::MAX]`.
    pub beyond_64_bit: usize,
    /// Exact operands at or above 2^53 in magnitude.
    pub big_exact: usize,
    /// Operands without a decimal key: non-finite doubles and text.
    pub not_decimal: usize,
}

impl DomainSummary {
    pub fn add(&mut self, class: OperandClass) {
        self.operands += 1;
        match class {
            OperandClass::SignedInt { big } => self.big_exact += usize::from(big),
            OperandClass::UnsignedInt { above_signed, big } => {
                self.above_signed += usize::from(above_signed);
                self.big_exact += usize::from(big);
            }
            OperandClass::Float { finite } => {
                self.floats += 1;
                self.not_decimal += usize::from(!finite);
            }
            OperandClass::Decimal { big } => {
                self.native_decimals += 1;
                self.non_integers += 1;
                self.big_exact += usize::from(big);
            }
            OperandClass::IntString { range, big } => {
                self.strings += 1;
                self.big_exact += usize::from(big);
                match range {
                    IntRange::Signed => {}
                    IntRange::Unsigned => self.above_signed += 1,
                    IntRange::Beyond64 => self.beyond_64_bit += 1,
                }
            }
            OperandClass::DecimalString { big } => {
                self.strings += 1;
                self.non_integers += 1;
                self.big_exact += usize::from(big);
            }
            OperandClass::InexactString => {
                self.strings += 1;
                self.non_integers += 1;
            }
            OperandClass::Text => {
                self.strings += 1;
                self.text += 1;
                self.non_integers += 1;
                self.not_decimal += 1;
            }
        }
    }

    /// Every operand is an exact integer, native or string.
    pub const fn all_integers(&self) -> bool {
        self.floats == 0 && self.non_integers == 0
    }
}

impl Domain {
    /// Pick the domain for a summarised operand set.
    pub const fn resolve(summary: &DomainSummary, ctx: CompareContext) -> Self {
        let s = summary;
        match ctx {
            CompareContext::General if s.text > 0 => return Self::String,
            CompareContext::Numeric if s.strings > 0 => return Self::Float,
            _ => {}
        }
        if s.all_integers() && s.beyond_64_bit == 0 {
            return if s.above_signed == 0 {
                Self::SignedInt
            } else {
                Self::UnsignedInt
            };
        }
        let exact_pair = s.big_exact >= 2;
        let decimal_without_float = s.native_decimals > 0 && s.floats == 0;
        if (exact_pair || decimal_without_float) && s.not_decimal == 0 {
            Self::Decimal
        } else {
            Self::Float
        }
    }

    /// Domain decided from static argument types alone, when that is
    /// possible without looking at values.
    ///
    /// Only native integer and all-float sets qualify: any string or decimal
    /// operand needs per-row classification. Unsigned sets use
    /// [`Domain::UnsignedInt`] even when every value would fit `i64`; the
    /// ordering is the same.
    pub fn for_types(types: &[FieldType]) -> Option<Self> {
        let (mut ints, mut uints, mut floats) = (0_usize, 0_usize, 0_usize);
        for ft in types {
            match ft.eval_type() {
                EvalType::Null => {}
                EvalType::Int => ints += 1,
                EvalType::UInt => uints += 1,
                EvalType::Float => floats += 1,
                EvalType::Decimal | EvalType::String => return None,
            }
        }
        match (ints + uints, floats) {
            (0, 0) => None,
            (_, 0) if uints > 0 => Some(Self::UnsignedInt),
            (_, 0) => Some(Self::SignedInt),
            (0, _) => Some(Self::Float),
            _ => None,
        }
    }

    /// Lower `value` into this domain.
    pub fn key<'a>(self, value: &'a Value) -> Result<CompareKey<'a>> {
        let mismatch = || MsqlError::coercion(format!("{value} in {self} domain"));
        match self {
            Self::SignedInt => {
                let i = match value {
                    Value::Int(i) => Some(*i),
                    Value::UInt(u) => i64::try_from(*u).ok(),
                    Value::Text(_) | Value::Bytes(_) => match value.string_numeric() {
                        NumericStr::Int(i) => i64::try_from(i).ok(),
                        _ => None,
                    },
                    _ => None,
                };
                i.map(CompareKey::Signed).ok_or_else(mismatch)
            }
            Self::UnsignedInt => {
                let i = match value {
                    Value::Int(i) => Some(i128::from(*i)),
                    Value::UInt(u) => Some(i128::from(*u)),
                    Value::Text(_) | Value::Bytes(_) => match value.string_numeric() {
                        NumericStr::Int(i)
                            if i >= i128::from(i64::MIN) && i <= i128::from(u64::MAX) =>
                        {
                            Some(i)
                        }
                        _ => None,
                    },
                    _ => None,
                };
                i.map(CompareKey::Wide).ok_or_else(mismatch)
            }
            Self::Decimal => {
                let d = match value {
                    Value::Int(i) => Some(int_to_exact(*i)),
                    Value::UInt(u) => Some(int_to_exact(*u)),
                    Value::Decimal(d) => Some(decimal_to_exact(d)),
                    Value::Float(f) => float_to_exact(*f),
                    Value::Text(_) | Value::Bytes(_) => match value.string_numeric() {
                        NumericStr::Int(i) => Some(int_to_exact(i)),
                        NumericStr::Decimal(d) => Some(decimal_to_exact(&d)),
                        NumericStr::Inexact => parse_exact(&value.string_bytes())
                            .or_else(|| float_to_exact(value.to_f64())),
                        NumericStr::NotNumeric => None,
                    },
                    Value::Null => None,
                };
                d.map(CompareKey::Decimal).ok_or_else(mismatch)
            }
            Self::Float => {
                if value.is_null() {
                    return Err(mismatch());
                }
                let f = value.to_f64();
                if f.is_nan() {
                    Err(mismatch())
                } else {
                    Ok(CompareKey::Float(f))
                }
            }
            Self::String => {
                if value.is_null() {
                    Err(mismatch())
                } else {
                    Ok(CompareKey::Bytes(value.string_bytes()))
                }
            }
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::SignedInt => "signed integer",
            Self::UnsignedInt => "unsigned integer",
            Self::Float => "float",
            Self::Decimal => "decimal",
            Self::String => "string",
        })
    }
}

/// An operand lowered into a comparison domain.
///
/// Keys built by one [`Domain`] share a variant and compare totally.
#[derive(Debug, Clone, PartialEq)]
pub enum CompareKey<'a> {
    Signed(i64),
    /// Mixed signed/unsigned integers.
    Wide(i128),
    /// Arbitrary precision.
    Decimal(BigDecimal),
    /// Never NaN.
    Float(f64),
    Bytes(Cow<'a, [u8]>),
}

impl CompareKey<'_> {
    pub fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Signed(a), Self::Signed(b)) => a.cmp(b),
            (Self::Wide(a), Self::Wide(b)) => a.cmp(b),
            (Self::Decimal(a), Self::Decimal(b)) => a.cmp(b),
            (Self::Float(a), Self::Float(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            (Self::Bytes(a), Self::Bytes(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }

    const fn rank(&self) -> u8 {
        match self {
            Self::Signed(_) => 0,
            Self::Wide(_) => 1,
            Self::Decimal(_) => 2,
            Self::Float(_) => 3,
            Self::Bytes(_) => 4,
        }
    }
}

/// Pick the domain for a set of values; `NULL`s are ignored.
pub fn choose_domain<'a, I>(values: I, ctx: CompareContext) -> Domain
where
    I: IntoIterator<Item = &'a Value>,
{
    let mut summary = DomainSummary::default();
    for class in values.into_iter().filter_map(OperandClass::of) {
        summary.add(class);
    }
    Domain::resolve(&summary, ctx)
}

/// Compare two values in `domain`.
pub fn compare(a: &Value, b: &Value, domain: Domain) -> Result<Ordering> {
    Ok(domain.key(a)?.compare(&domain.key(b)?))
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn general(values: &[Value]) -> Domain {
        choose_domain(values, CompareContext::General)
    }

    fn numeric(values: &[Value]) -> Domain {
        choose_domain(values, CompareContext::Numeric)
    }

    fn dec(s: &str) -> Value {
        Value::Decimal(Decimal::from_str(s).unwrap())
    }

    // ── domain selection ────────────────────────────────────────────────

    #[test]
    fn test_empty_and_null_sets() {
        assert_eq!(general(&[]), Domain::SignedInt);
        assert_eq!(general(&[Value::Null, Value::Null]), Domain::SignedInt);
        assert_eq!(numeric(&[Value::Null]), Domain::SignedInt);
    }

    #[test]
    fn test_non_numeric_string_wins() {
        assert_eq!(general(&[Value::Int(1), Value::from("abc")]), Domain::String);
        assert_eq!(
            general(&[Value::Float(1.5), Value::from("1x"), dec("2.5")]),
            Domain::String
        );
        assert_eq!(general(&[Value::from(""), Value::Int(0)]), Domain::String);
    }

    #[test]
    fn test_integer_sets() {
        assert_eq!(general(&[Value::Int(2), Value::Int(0)]), Domain::SignedInt);
        assert_eq!(
            general(&[Value::Int(2), Value::from(" -7 ")]),
            Domain::SignedInt
        );
        assert_eq!(
            general(&[Value::UInt(1), Value::Int(-1)]),
            Domain::SignedInt
        );
        assert_eq!(
            general(&[Value::UInt(u64::MAX), Value::Int(-1)]),
            Domain::UnsignedInt
        );
        assert_eq!(
            general(&[Value::from("18446744073709551615"), Value::Int(i64::MIN)]),
            Domain::UnsignedInt
        );
    }

    #[test]
    fn test_large_exact_escalates_to_decimal() {
        assert_eq!(
            general(&[Value::Int(9_007_199_254_740_992), Value::from("9007199254740993.0")]),
            Domain::Decimal
        );
        assert_eq!(
            general(&[dec("9007199254740993"), Value::Float(9_007_199_254_740_992.0)]),
            Domain::Float
        );
        assert_eq!(
            general(&[
                Value::Int(9_007_199_254_740_992),
                Value::from("9007199254740993.5"),
                Value::Float(0.5),
            ]),
            Domain::Decimal
        );
    }

    #[test]
    fn test_native_decimal_without_float() {
        assert_eq!(general(&[dec("1.5"), Value::Int(2)]), Domain::Decimal);
        assert_eq!(general(&[dec("1.5"), Value::Float(2.0)]), Domain::Float);
    }

    #[test]
    fn test_float_fallback() {
        assert_eq!(general(&[Value::Int(1), Value::Float(1.5)]), Domain::Float);
        assert_eq!(general(&[Value::Int(1), Value::from("0.5")]), Domain::Float);
        assert_eq!(general(&[Value::Int(1), Value::from("1e400")]), Domain::Float);
        // A single large operand cannot be confused with a small one.
        assert_eq!(
            general(&[Value::Int(9_007_199_254_740_993), Value::Float(1.5)]),
            Domain::Float
        );
    }

    #[test]
    fn test_wide_integer_strings() {
        let wide = Value::from("100000000000000000000000");
        assert_eq!(
            general(&[wide.clone(), Value::from("100000000000000000000001")]),
            Domain::Decimal
        );
        assert_eq!(general(&[wide, Value::Int(1)]), Domain::Float);
        let beyond_decimal = Value::from("100000000000000000000000000000000");
        assert_eq!(
            general(&[beyond_decimal, Value::from("100000000000000000000000000000001")]),
            Domain::Decimal
        );
        let beyond_i128 = Value::from("1234567890123456789012345678901234567890");
        assert_eq!(
            general(&[beyond_i128, Value::Int(9_007_199_254_740_993)]),
            Domain::Decimal
        );
    }

    #[test]
    fn test_long_numeric_strings_keep_large_integers_exact() {
        let big = [
            Value::from("9007199254740992"),
            Value::from("9007199254740993"),
        ];
        for extra in [
            "0.1234567890123456789012345678901",
            "1e300",
            "-1e-300",
            "1e5000",
        ] {
            let mut values = big.to_vec();
            values.push(Value::from(extra));
            assert_eq!(general(&values), Domain::Decimal, "{extra}");
            assert_eq!(
                compare(&values[0], &values[1], Domain::Decimal).unwrap(),
                Ordering::Less,
                "{extra}"
            );
        }
        assert_eq!(
            compare(&Value::from("1e5000"), &Value::Float(f64::MAX), Domain::Decimal).unwrap(),
            Ordering::Equal
        );
        assert_eq!(
            general(&[big[0].clone(), big[1].clone(), Value::Float(f64::INFINITY)]),
            Domain::Float
        );
    }

    #[test]
    fn test_numeric_context_reads_strings_as_floats() {
        assert_eq!(
            numeric(&[Value::Int(9_007_199_254_740_992), Value::from("9007199254740993")]),
            Domain::Float
        );
        assert_eq!(numeric(&[Value::Int(0), Value::from("b")]), Domain::Float);
        assert_eq!(
            numeric(&[Value::Int(9_007_199_254_740_992), Value::Int(9_007_199_254_740_993)]),
            Domain::SignedInt
        );
        assert_eq!(
            numeric(&[Value::UInt(9_223_372_036_854_775_808), Value::Int(-1)]),
            Domain::UnsignedInt
        );
        assert_eq!(numeric(&[dec("1.5"), Value::Int(1)]), Domain::Decimal);
    }

    #[test]
    fn test_static_domain() {
        let i = FieldType::long_long();
        let u = FieldType::unsigned_long_long();
        let d = FieldType::double();
        assert_eq!(Domain::for_types(&[i, i]), Some(Domain::SignedInt));
        assert_eq!(Domain::for_types(&[i, u]), Some(Domain::UnsignedInt));
        assert_eq!(Domain::for_types(&[d, d, FieldType::null()]), Some(Domain::Float));
        assert_eq!(Domain::for_types(&[i, d]), None);
        assert_eq!(Domain::for_types(&[i, FieldType::varchar()]), None);
        assert_eq!(Domain::for_types(&[FieldType::new_decimal(), i]), None);
        assert_eq!(Domain::for_types(&[FieldType::null()]), None);
    }

    // ── comparison ─────────────────────────────────────────────────────

    #[test]
    fn test_signed_unsigned_compare() {
        let d = Domain::UnsignedInt;
        assert_eq!(
            compare(&Value::Int(-1), &Value::UInt(u64::MAX), d).unwrap(),
            Ordering::Less
        );
        assert_eq!(
            compare(&Value::Int(i64::MIN), &Value::UInt(0), d).unwrap(),
            Ordering::Less
        );
        assert_eq!(
            compare(&Value::UInt(5), &Value::from("5"), d).unwrap(),
            Ordering::Equal
        );
    }

    #[test]
    fn test_decimal_compare_is_exact() {
        let d = Domain::Decimal;
        assert_eq!(
            compare(
                &Value::Int(9_007_199_254_740_992),
                &Value::from("9007199254740993"),
                d
            )
            .unwrap(),
            Ordering::Less
        );
        assert_eq!(
            compare(&Value::Float(0.5), &dec("0.50"), d).unwrap(),
            Ordering::Equal
        );
    }

    #[test]
    fn test_float_compare() {
        let d = Domain::Float;
        assert_eq!(
            compare(&Value::Float(-0.0), &Value::Float(0.0), d).unwrap(),
            Ordering::Equal
        );
        assert_eq!(
            compare(&Value::from("12abc"), &Value::Int(11), d).unwrap(),
            Ordering::Greater
        );
        assert!(compare(&Value::Float(f64::NAN), &Value::Int(1), d).is_err());
    }

    #[test]
    fn test_string_compare_is_bytewise() {
        let d = Domain::String;
        assert_eq!(
            compare(&Value::from("B"), &Value::from("a"), d).unwrap(),
            Ordering::Less
        );
        assert_eq!(
            compare(&Value::Int(10), &Value::from("9"), d).unwrap(),
            Ordering::Less
        );
        assert_eq!(
            compare(&Value::from("ab"), &Value::Bytes(b"ab".to_vec()), d).unwrap(),
            Ordering::Equal
        );
    }

    #[test]
    fn test_unplaceable_values_error() {
        let err = Domain::SignedInt.key(&Value::Float(1.5)).unwrap_err();
        assert!(matches!(err, MsqlError::TypeCoercion { .. }));
        assert!(Domain::SignedInt.key(&Value::UInt(u64::MAX)).is_err());
        assert!(Domain::UnsignedInt.key(&Value::from("-9223372036854775809")).is_err());
        assert!(Domain::Decimal.key(&Value::Float(f64::INFINITY)).is_err());
        for domain in [
            Domain::SignedInt,
            Domain::UnsignedInt,
            Domain::Float,
            Domain::Decimal,
            Domain::String,
        ] {
            assert!(domain.key(&Value::Null).is_err(), "{domain}");
        }
    }

    #[test]
    fn test_float_to_exact_expands_binary_value() {
        let exact = |s: &str| BigDecimal::from_str(s).unwrap();
        assert_eq!(float_to_exact(0.5), Some(exact("0.5")));
        assert_eq!(float_to_exact(-2.25), Some(exact("-2.25")));
        assert_eq!(
            float_to_exact(0.1),
            Some(exact("0.1000000000000000055511151231257827021181583404541015625"))
        );
        assert_eq!(
            float_to_exact(9_007_199_254_740_992.0),
            Some(exact("9007199254740992"))
        );
        assert_eq!(float_to_exact(1e300).map(|d| d > exact("9.9e299")), Some(true));
        assert_eq!(float_to_exact(0.0), Some(exact("0")));
        assert!(float_to_exact(f64::MIN_POSITIVE / 4.0).is_some());
        assert!(float_to_exact(f64::NAN).is_none());
        assert!(float_to_exact(f64::INFINITY).is_none());
    }
}
