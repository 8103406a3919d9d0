use std::collections::BTreeMap;

/// Dynamically typed document value.
///
/// Mirrors the shapes a property list can hold. Dictionary keys are unique and
/// their order carries no meaning, so they are kept sorted.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// UTF-8 string.
    String(String),
    /// Signed integer.
    Integer(i64),
    /// Floating point number.
    Real(f64),
    /// Boolean flag.
    Boolean(bool),
    /// Opaque binary blob.
    Data(Vec<u8>),
    /// Date in property-list XML form (`YYYY-MM-DDTHH:MM:SSZ`).
    Date(String),
    /// Ordered sequence of values.
    Array(Vec<Value>),
    /// String-keyed mapping.
    Dictionary(BTreeMap<String, Value>),
}

impl Value {
    /// Returns the string content, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the elements, if this is an array.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the entries, if this is a dictionary.
    pub fn as_dictionary(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Dictionary(map) => Some(map),
            _ => None,
        }
    }

    /// Mutable access to the entries, if this is a dictionary.
    pub fn as_dictionary_mut(&mut self) -> Option<&mut BTreeMap<String, Value>> {
        match self {
            Value::Dictionary(map) => Some(map),
            _ => None,
        }
    }

    /// Looks up `key` when this value is a dictionary.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_dictionary().and_then(|map| map.get(key))
    }

    /// Short tag naming the variant, used in error messages.
    pub fn type_tag(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Integer(_) => "integer",
            Value::Real(_) => "real",
            Value::Boolean(_) => "boolean",
            Value::Data(_) => "data",
            Value::Date(_) => "date",
            Value::Array(_) => "array",
            Value::Dictionary(_) => "dictionary",
        }
    }

    /// Flattens the tree into its order-independent signature bytes.
    ///
    /// Dictionary pairs render as `key=>value`; pairs and array elements are
    /// sorted bytewise before concatenation, so neither key insertion order nor
    /// element order influences the result. Non-string scalars are rendered
    /// followed by their runtime class name (`1Integer`, `1.5Float`,
    /// `trueTrueClass`), which keeps identities equal to the ones already
    /// issued for deployed profiles.
    pub fn signature(&self) -> Vec<u8> {
        match self {
            Value::Dictionary(map) => {
                let mut pairs: Vec<Vec<u8>> = map
                    .iter()
                    .map(|(key, value)| {
                        let mut pair = key.as_bytes().to_vec();
                        pair.extend_from_slice(b"=>");
                        pair.extend(value.signature());
                        pair
                    })
                    .collect();
                pairs.sort();
                pairs.concat()
            }
            Value::Array(items) => {
                let mut parts: Vec<Vec<u8>> = items.iter().map(Value::signature).collect();
                parts.sort();
                parts.concat()
            }
            Value::String(s) => s.as_bytes().to_vec(),
            Value::Integer(i) => format!("{}Integer", i).into_bytes(),
            Value::Real(r) => format!("{}Float", float_text(*r)).into_bytes(),
            Value::Boolean(true) => b"trueTrueClass".to_vec(),
            Value::Boolean(false) => b"falseFalseClass".to_vec(),
            Value::Data(bytes) => {
                let mut flat = bytes.clone();
                flat.extend_from_slice(b"CFPropertyList::Blob");
                flat
            }
            Value::Date(d) => format!("{}Time", date_text(d)).into_bytes(),
        }
    }
}

/// Renders a float the way the identity scheme expects: shortest round-trip
/// digits, always with a fractional part, exponent form outside `1e-4..1e16`.
fn float_text(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }

    let scientific = format!("{:e}", value);
    let (mantissa, exponent) = scientific.split_once('e').unwrap_or((scientific.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let (sign, mantissa) = match mantissa.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", mantissa),
    };
    let digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();
    let decpt = exponent + 1;
    let ndigits = digits.len() as i32;

    let body = if decpt > 0 && decpt <= 16 {
        if decpt < ndigits {
            format!("{}.{}", &digits[..decpt as usize], &digits[decpt as usize..])
        } else {
            format!("{}{}.0", digits, "0".repeat((decpt - ndigits) as usize))
        }
    } else if decpt <= 0 && decpt > -4 {
        format!("0.{}{}", "0".repeat((-decpt) as usize), digits)
    } else {
        let fraction = if digits.len() > 1 { &digits[1..] } else { "0" };
        let exp = decpt - 1;
        format!(
            "{}.{}e{}{:02}",
            &digits[..1],
            fraction,
            if exp < 0 { '-' } else { '+' },
            exp.abs()
        )
    };
    format!("{}{}", sign, body)
}

/// `YYYY-MM-DDTHH:MM:SSZ` as `YYYY-MM-DD HH:MM:SS UTC`.
fn date_text(xml: &str) -> String {
    match xml.strip_suffix('Z').and_then(|rest| rest.split_once('T')) {
        Some((day, time)) => format!("{} {} UTC", day, time),
        None => xml.to_string(),
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::Array(value)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(value: BTreeMap<String, Value>) -> Self {
        Value::Dictionary(value)
    }
}

/// Builds a [`Value::Dictionary`] from `key => value` pairs.
///
/// ```rust
/// use macprofile_canonical::{dict, Value};
///
/// let value = dict! { "PayloadIdentifier" => "com.example", "PayloadVersion" => 1i64 };
/// assert_eq!(value.get("PayloadVersion"), Some(&Value::Integer(1)));
/// ```
#[macro_export]
macro_rules! dict {
    () => {
        $crate::Value::Dictionary(::std::collections::BTreeMap::new())
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut map = ::std::collections::BTreeMap::new();
        $(map.insert(::std::string::String::from($key), $crate::Value::from($value));)+
        $crate::Value::Dictionary(map)
    }};
}
