//! The XPath 1.0 core function library, per spec §6.3.
//!
//! Dispatched by name from `engine::eval_expr`'s `Expr::Call` arm; each
//! entry below implements exactly the conversion and arity rules XPath
//! 1.0 §4 specifies. `id()` is the one deliberate extension: it tokenizes
//! its argument's whole string value on any whitespace rather than
//! requiring the attribute that produced it to be declared `IDREFS` in a
//! DTD, since this crate's validator is optional and many callers query
//! documents with no DTD at all (an Open Question this crate resolves in
//! favor of usefulness over strict conformance; see DESIGN.md).

use crate::dom::NodeKind;

use super::engine::{sort_unique_nodeset, EvalContext, Value};
use super::XPathError;

/// A function's accepted argument count, per the XPath 1.0 core function
/// library (spec §6.3/§4.8: "arity is checked at compile time against a
/// fixed table").
enum Arity {
    Exact(usize),
    Range(usize, usize),
    AtLeast(usize),
}

impl Arity {
    fn accepts(&self, n: usize) -> bool {
        match *self {
            Arity::Exact(k) => n == k,
            Arity::Range(lo, hi) => n >= lo && n <= hi,
            Arity::AtLeast(lo) => n >= lo,
        }
    }
}

/// The fixed name/arity table `xpath::parser` consults at parse time so a
/// bad call (`count()`, `bogus(1)`) fails `XPath::compile` immediately
/// rather than the first time it happens to be evaluated.
const ARITY_TABLE: &[(&str, Arity)] = &[
    ("last", Arity::Exact(0)),
    ("position", Arity::Exact(0)),
    ("count", Arity::Exact(1)),
    ("id", Arity::Exact(1)),
    ("local-name", Arity::Range(0, 1)),
    ("namespace-uri", Arity::Range(0, 1)),
    ("name", Arity::Range(0, 1)),
    ("string", Arity::Range(0, 1)),
    ("concat", Arity::AtLeast(2)),
    ("starts-with", Arity::Exact(2)),
    ("contains", Arity::Exact(2)),
    ("substring-before", Arity::Exact(2)),
    ("substring-after", Arity::Exact(2)),
    ("substring", Arity::Range(2, 3)),
    ("string-length", Arity::Range(0, 1)),
    ("normalize-space", Arity::Range(0, 1)),
    ("translate", Arity::Exact(3)),
    ("boolean", Arity::Exact(1)),
    ("not", Arity::Exact(1)),
    ("true", Arity::Exact(0)),
    ("false", Arity::Exact(0)),
    ("lang", Arity::Exact(1)),
    ("number", Arity::Range(0, 1)),
    ("sum", Arity::Exact(1)),
    ("floor", Arity::Exact(1)),
    ("ceiling", Arity::Exact(1)),
    ("round", Arity::Exact(1)),
];

/// Looks `name` up in `ARITY_TABLE` and checks `argc` against it, returning
/// a message suitable for `XPathError::Syntax`. Called from
/// `xpath::parser` while building a `Call` node, so an unknown function or
/// a wrong argument count is rejected at compile time.
pub(crate) fn check_call(name: &str, argc: usize) -> Result<(), String> {
    match ARITY_TABLE.iter().find(|(n, _)| *n == name) {
        None => Err(format!("unknown function '{}'", name)),
        Some((_, arity)) if !arity.accepts(argc) => Err(format!("{}() does not accept {} argument(s)", name, argc)),
        Some(_) => Ok(()),
    }
}

pub fn call(name: &str, ctx: &EvalContext, args: &[Value]) -> Result<Value, XPathError> {
    match name {
        "last" => {
            arity0(args, name)?;
            Ok(Value::Number(ctx.size as f64))
        }
        "position" => {
            arity0(args, name)?;
            Ok(Value::Number(ctx.position as f64))
        }
        "count" => {
            let nodes = arg(args, 0, name)?.clone().into_node_set()?;
            Ok(Value::Number(nodes.len() as f64))
        }
        "id" => Ok(Value::NodeSet(id(ctx, arg(args, 0, name)?))),
        "local-name" => Ok(Value::String(name_part(ctx, args, NamePart::Local)?)),
        "namespace-uri" => Ok(Value::String(name_part(ctx, args, NamePart::Uri)?)),
        "name" => Ok(Value::String(name_part(ctx, args, NamePart::Qualified)?)),
        "string" => {
            let v = args.first().cloned().unwrap_or_else(|| Value::NodeSet(vec![ctx.node]));
            Ok(Value::String(v.to_xpath_string(ctx.doc)))
        }
        "concat" => {
            if args.len() < 2 {
                return Err(XPathError::Type("concat() requires at least 2 arguments".into()));
            }
            Ok(Value::String(args.iter().map(|a| a.to_xpath_string(ctx.doc)).collect()))
        }
        "starts-with" => {
            let (a, b) = two_strings(ctx, args, name)?;
            Ok(Value::Boolean(a.starts_with(&b)))
        }
        "contains" => {
            let (a, b) = two_strings(ctx, args, name)?;
            Ok(Value::Boolean(a.contains(&b)))
        }
        "substring-before" => {
            let (a, b) = two_strings(ctx, args, name)?;
            Ok(Value::String(a.find(&b).map(|i| a[..i].to_string()).unwrap_or_default()))
        }
        "substring-after" => {
            let (a, b) = two_strings(ctx, args, name)?;
            Ok(Value::String(a.find(&b).map(|i| a[i + b.len()..].to_string()).unwrap_or_default()))
        }
        "substring" => {
            let s = arg(args, 0, name)?.to_xpath_string(ctx.doc);
            let start = arg(args, 1, name)?.to_number(ctx.doc);
            let length = args.get(2).map(|v| v.to_number(ctx.doc));
            Ok(Value::String(substring(&s, start, length)))
        }
        "string-length" => {
            let s = args.first().map(|v| v.to_xpath_string(ctx.doc)).unwrap_or_else(|| ctx.doc.str(ctx.node));
            Ok(Value::Number(s.chars().count() as f64))
        }
        "normalize-space" => {
            let s = args.first().map(|v| v.to_xpath_string(ctx.doc)).unwrap_or_else(|| ctx.doc.str(ctx.node));
            Ok(Value::String(s.split_whitespace().collect::<Vec<_>>().join(" ")))
        }
        "translate" => {
            let s = arg(args, 0, name)?.to_xpath_string(ctx.doc);
            let from: Vec<char> = arg(args, 1, name)?.to_xpath_string(ctx.doc).chars().collect();
            let to: Vec<char> = arg(args, 2, name)?.to_xpath_string(ctx.doc).chars().collect();
            let out: String = s
                .chars()
                .filter_map(|c| match from.iter().position(|&f| f == c) {
                    Some(i) => to.get(i).copied(),
                    None => Some(c),
                })
                .collect();
            Ok(Value::String(out))
        }
        "boolean" => Ok(Value::Boolean(arg(args, 0, name)?.to_boolean())),
        "not" => Ok(Value::Boolean(!arg(args, 0, name)?.to_boolean())),
        "true" => {
            arity0(args, name)?;
            Ok(Value::Boolean(true))
        }
        "false" => {
            arity0(args, name)?;
            Ok(Value::Boolean(false))
        }
        "lang" => {
            let wanted = arg(args, 0, name)?.to_xpath_string(ctx.doc).to_ascii_lowercase();
            let actual = ctx.doc.lang(ctx.node).to_ascii_lowercase();
            Ok(Value::Boolean(actual == wanted || actual.starts_with(&format!("{}-", wanted))))
        }
        "number" => {
            let v = args.first().cloned().unwrap_or_else(|| Value::NodeSet(vec![ctx.node]));
            Ok(Value::Number(v.to_number(ctx.doc)))
        }
        "sum" => {
            let nodes = arg(args, 0, name)?.clone().into_node_set()?;
            Ok(Value::Number(nodes.iter().map(|&n| ctx.doc.str(n).trim().parse::<f64>().unwrap_or(f64::NAN)).sum()))
        }
        "floor" => Ok(Value::Number(arg(args, 0, name)?.to_number(ctx.doc).floor())),
        "ceiling" => Ok(Value::Number(arg(args, 0, name)?.to_number(ctx.doc).ceil())),
        "round" => Ok(Value::Number((arg(args, 0, name)?.to_number(ctx.doc) + 0.5).floor())),
        other => Err(XPathError::UndefinedFunction(other.to_string())),
    }
}

fn arg<'a>(args: &'a [Value], i: usize, fname: &str) -> Result<&'a Value, XPathError> {
    args.get(i).ok_or_else(|| XPathError::Type(format!("{}() is missing an argument", fname)))
}

fn arity0(args: &[Value], fname: &str) -> Result<(), XPathError> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(XPathError::Type(format!("{}() takes no arguments", fname)))
    }
}

fn two_strings(ctx: &EvalContext, args: &[Value], fname: &str) -> Result<(String, String), XPathError> {
    Ok((arg(args, 0, fname)?.to_xpath_string(ctx.doc), arg(args, 1, fname)?.to_xpath_string(ctx.doc)))
}

fn id(ctx: &EvalContext, arg: &Value) -> Vec<crate::dom::NodeId> {
    let tokens: Vec<String> = match arg {
        Value::NodeSet(nodes) => {
            nodes.iter().flat_map(|&n| ctx.doc.str(n).split_whitespace().map(str::to_string).collect::<Vec<_>>()).collect()
        }
        other => other.to_xpath_string(ctx.doc).split_whitespace().map(str::to_string).collect(),
    };
    let nodes = tokens.iter().filter_map(|t| ctx.doc.get_id(t)).collect();
    sort_unique_nodeset(ctx.doc, nodes)
}

enum NamePart {
    Local,
    Uri,
    Qualified,
}

fn name_part(ctx: &EvalContext, args: &[Value], part: NamePart) -> Result<String, XPathError> {
    let node = match args.first() {
        Some(v) => match v.clone().into_node_set()?.first() {
            Some(&n) => n,
            None => return Ok(String::new()),
        },
        None => ctx.node,
    };
    match ctx.doc.kind(node) {
        NodeKind::Element { qname, uri, .. } => Ok(match part {
            NamePart::Local => qname.local.clone(),
            NamePart::Uri => uri.clone(),
            NamePart::Qualified => qname.to_string(),
        }),
        NodeKind::Attribute(a) => Ok(match part {
            NamePart::Local => a.qname.local.clone(),
            NamePart::Uri => a.uri.clone(),
            NamePart::Qualified => a.qname.to_string(),
        }),
        NodeKind::ProcessingInstruction { target, .. } => Ok(match part {
            NamePart::Local | NamePart::Qualified => target.clone(),
            NamePart::Uri => String::new(),
        }),
        NodeKind::Namespace { prefix, .. } => Ok(match part {
            NamePart::Local | NamePart::Qualified => prefix.clone().unwrap_or_default(),
            NamePart::Uri => String::new(),
        }),
        _ => Ok(String::new()),
    }
}

/// XPath 1.0 §4.2's defined algorithm: `start`/`length` round to the
/// nearest integer (ties away from zero toward `+Infinity`, matching
/// `round()`) before clamping against the string's 1-based character
/// range. `NaN` anywhere in the inputs yields an empty string, since every
/// comparison against `NaN` is false.
fn substring(s: &str, start: f64, length: Option<f64>) -> String {
    if start.is_nan() || length.map_or(false, |l| l.is_nan()) {
        return String::new();
    }
    let chars: Vec<char> = s.chars().collect();
    let round = |x: f64| (x + 0.5).floor();
    let begin = round(start);
    let end = match length {
        Some(l) => begin + round(l),
        None => f64::INFINITY,
    };
    let begin = begin.max(1.0);
    let end = end.min(chars.len() as f64 + 1.0);
    if !(end > begin) {
        return String::new();
    }
    let begin_idx = (begin - 1.0) as usize;
    let end_idx = (end - 1.0) as usize;
    chars[begin_idx..end_idx].iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substring_matches_the_xpath_1_0_examples() {
        assert_eq!(substring("12345", 2.0, Some(3.0)), "234");
        assert_eq!(substring("12345", 2.0, None), "2345");
        assert_eq!(substring("12345", 1.5, Some(2.6)), "234");
        assert_eq!(substring("12345", 0.0, Some(3.0)), "12");
        assert_eq!(substring("12345", 5.0, Some(-3.0)), "");
        assert_eq!(substring("12345", -42.0, Some(1.0)), "");
    }
}
