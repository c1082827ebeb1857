//! Named-placeholder templates for bar text and tooltips.
//!
//! A template such as `"{icon} {usage:>5.1f}%"` is rendered against a list
//! of [`FormatArg`]s. The placeholder grammar is the familiar
//! `{name}` / `{name:spec}` form where `spec` is
//! `[[fill]align][0][width][.precision][type]`:
//!
//! - `align` is `<`, `>` or `^`; numbers default to the right, strings to
//!   the left.
//! - `0` pads numbers with zeros after the sign.
//! - `precision` fixes the decimals of a float or truncates a string.
//! - `type` is `d` (integers), `f` (floats) or `s` (strings).
//!
//! `{{` and `}}` produce literal braces. There are no loops or conditionals.

use crate::logging::Logger;
use std::fmt;
use thiserror::Error;

/// A typed value available to a template.
#[derive(Debug, Clone, PartialEq)]
pub enum FormatValue {
    Int(i64),
    Float(f64),
    Str(String),
}

impl FormatValue {
    /// Short type name used in diagnostics.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Int(_) => "int",
            Self::Float(_) => "double",
            Self::Str(_) => "string",
        }
    }

    const fn is_numeric(&self) -> bool {
        !matches!(self, Self::Str(_))
    }
}

impl fmt::Display for FormatValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Str(v) => write!(f, "'{v}'"),
        }
    }
}

impl From<i64> for FormatValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for FormatValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u32> for FormatValue {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for FormatValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<String> for FormatValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<&str> for FormatValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

impl From<&String> for FormatValue {
    fn from(value: &String) -> Self {
        Self::Str(value.clone())
    }
}

/// One named argument of a rendering pass.
#[derive(Debug, Clone, PartialEq)]
pub struct FormatArg {
    pub name: String,
    pub value: FormatValue,
}

impl FormatArg {
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<FormatValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Why a template could not be rendered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("argument not found: '{name}'")]
    UnknownArgument { name: String },

    #[error("unmatched '}}' at byte {position}")]
    UnmatchedBrace { position: usize },

    #[error("unclosed placeholder starting at byte {position}")]
    UnclosedPlaceholder { position: usize },

    #[error("invalid format specifier '{spec}': {reason}")]
    InvalidSpec { spec: String, reason: &'static str },

    #[error("format specifier '{spec}' does not apply to {type_name} argument '{name}'")]
    TypeMismatch {
        name: String,
        spec: String,
        type_name: &'static str,
    },
}

/// Render `template`, reporting the first problem encountered.
///
/// # Errors
///
/// Fails on unknown argument names, unbalanced braces, malformed specifiers
/// and specifiers that do not fit the argument's type.
pub fn try_render(template: &str, args: &[FormatArg]) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(idx) = rest.find(['{', '}']) {
        let position = template.len() - rest.len() + idx;
        out.push_str(&rest[..idx]);
        let after = &rest[idx + 1..];

        if rest.as_bytes()[idx] == b'}' {
            if let Some(tail) = after.strip_prefix('}') {
                out.push('}');
                rest = tail;
                continue;
            }
            return Err(TemplateError::UnmatchedBrace { position });
        }

        if let Some(tail) = after.strip_prefix('{') {
            out.push('{');
            rest = tail;
            continue;
        }

        let close = after
            .find('}')
            .ok_or(TemplateError::UnclosedPlaceholder { position })?;
        let field = &after[..close];
        if field.contains('{') {
            return Err(TemplateError::UnclosedPlaceholder { position });
        }

        let (name, spec) = field.split_once(':').unwrap_or((field, ""));
        let arg = args
            .iter()
            .find(|arg| arg.name == name)
            .ok_or_else(|| TemplateError::UnknownArgument {
                name: name.to_owned(),
            })?;
        let parsed = Spec::parse(spec)?;
        out.push_str(&parsed.apply(spec, arg)?);

        rest = &after[close + 1..];
    }

    out.push_str(rest);
    Ok(out)
}

/// Render `template`, falling back to the template itself on failure.
///
/// The failure is logged as an error together with every argument's name,
/// type and value.
///
/// # Examples
///
/// ```rust
/// use waygauge_core::logging::MemoryLogger;
/// use waygauge_core::template::{render, FormatArg};
///
/// let logger = MemoryLogger::new();
/// let args = [FormatArg::new("icon", "X"), FormatArg::new("usage", 42.36)];
/// assert_eq!(render("{icon} {usage:.1f}%", &args, &logger), "X 42.4%");
/// assert_eq!(render("{nope}", &args, &logger), "{nope}");
/// ```
pub fn render(template: &str, args: &[FormatArg], logger: &dyn Logger) -> String {
    match try_render(template, args) {
        Ok(rendered) => rendered,
        Err(err) => {
            logger.error(&format!(
                "Error rendering template {template:?}: {err}\n{}",
                dump_args(args)
            ));
            template.to_owned()
        }
    }
}

fn dump_args(args: &[FormatArg]) -> String {
    let mut dump = format!("arguments ({}):", args.len());
    for (i, arg) in args.iter().enumerate() {
        dump.push_str(&format!(
            "\n  [{i}] {} ({}) = {}",
            arg.name,
            arg.value.type_name(),
            arg.value
        ));
    }
    dump
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Right,
    Center,
}

impl Align {
    const fn from_char(c: char) -> Option<Self> {
        match c {
            '<' => Some(Self::Left),
            '>' => Some(Self::Right),
            '^' => Some(Self::Center),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Spec {
    fill: char,
    align: Option<Align>,
    zero: bool,
    width: usize,
    precision: Option<usize>,
    kind: Option<char>,
}

impl Spec {
    fn parse(spec: &str) -> Result<Self, TemplateError> {
        let invalid = |reason| TemplateError::InvalidSpec {
            spec: spec.to_owned(),
            reason,
        };
        let chars: Vec<char> = spec.chars().collect();
        let mut parsed = Self {
            fill: ' ',
            align: None,
            zero: false,
            width: 0,
            precision: None,
            kind: None,
        };
        let mut i = 0;

        if let Some(align) = chars.get(1).and_then(|&c| Align::from_char(c)) {
            parsed.fill = chars[0];
            parsed.align = Some(align);
            i = 2;
        } else if let Some(align) = chars.first().and_then(|&c| Align::from_char(c)) {
            parsed.align = Some(align);
            i = 1;
        }

        if chars.get(i) == Some(&'0') {
            parsed.zero = true;
            i += 1;
        }

        let (width, next) = take_number(&chars, i).map_err(|()| invalid("width too large"))?;
        parsed.width = width.unwrap_or(0);
        i = next;

        if chars.get(i) == Some(&'.') {
            let (precision, next) =
                take_number(&chars, i + 1).map_err(|()| invalid("precision too large"))?;
            parsed.precision = Some(precision.ok_or_else(|| invalid("missing precision"))?);
            i = next;
        }

        if let Some(&kind) = chars.get(i) {
            if !matches!(kind, 'd' | 'f' | 's') {
                return Err(invalid("unknown presentation type"));
            }
            parsed.kind = Some(kind);
            i += 1;
        }

        if i != chars.len() {
            return Err(invalid("unexpected trailing characters"));
        }
        Ok(parsed)
    }

    fn apply(&self, raw: &str, arg: &FormatArg) -> Result<String, TemplateError> {
        let mismatch = || TemplateError::TypeMismatch {
            name: arg.name.clone(),
            spec: raw.to_owned(),
            type_name: arg.value.type_name(),
        };

        let body = match (&arg.value, self.kind) {
            (FormatValue::Int(v), None | Some('d')) if self.precision.is_none() => v.to_string(),
            (FormatValue::Float(v), None) => match self.precision {
                Some(p) => format!("{v:.p$}"),
                None => v.to_string(),
            },
            (FormatValue::Float(v), Some('f')) => format!("{v:.p$}", p = self.precision.unwrap_or(6)),
            (FormatValue::Str(s), None | Some('s')) if !self.zero => match self.precision {
                Some(p) => s.chars().take(p).collect(),
                None => s.clone(),
            },
            _ => return Err(mismatch()),
        };

        let len = body.chars().count();
        if len >= self.width {
            return Ok(body);
        }
        let pad = self.width - len;

        if self.zero && self.align.is_none() {
            let (sign, digits) = match body.strip_prefix('-') {
                Some(digits) => ("-", digits),
                None => ("", body.as_str()),
            };
            return Ok(format!("{sign}{}{digits}", "0".repeat(pad)));
        }

        let default_align = if arg.value.is_numeric() {
            Align::Right
        } else {
            Align::Left
        };
        let fill = |n: usize| self.fill.to_string().repeat(n);
        Ok(match self.align.unwrap_or(default_align) {
            Align::Left => format!("{body}{}", fill(pad)),
            Align::Right => format!("{}{body}", fill(pad)),
            Align::Center => format!("{}{body}{}", fill(pad / 2), fill(pad - pad / 2)),
        })
    }
}

/// Parse a run of ASCII digits starting at `start`.
fn take_number(chars: &[char], start: usize) -> Result<(Option<usize>, usize), ()> {
    let mut end = start;
    let mut value: Option<usize> = None;
    while let Some(digit) = chars.get(end).and_then(|c| c.to_digit(10)) {
        value = Some(
            value
                .unwrap_or(0)
                .checked_mul(10)
                .and_then(|v| v.checked_add(digit as usize))
                .ok_or(())?,
        );
        end += 1;
    }
    Ok((value, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::{Level, MemoryLogger};

    fn args() -> Vec<FormatArg> {
        vec![
            FormatArg::new("icon", "X"),
            FormatArg::new("usage", 42.36),
            FormatArg::new("count", 7),
            FormatArg::new("name", "eth0"),
        ]
    }

    #[test]
    fn test_basic_substitution() {
        let out = try_render("{icon} {usage:.1f}%", &args()).unwrap();
        assert_eq!(out, "X 42.4%");
    }

    #[test]
    fn test_plain_values() {
        assert_eq!(try_render("{usage}", &args()).unwrap(), "42.36");
        assert_eq!(try_render("{count}", &args()).unwrap(), "7");
        assert_eq!(try_render("{name}", &args()).unwrap(), "eth0");
        assert_eq!(
            try_render("{f}", &[FormatArg::new("f", 1.0)]).unwrap(),
            "1"
        );
    }

    #[test]
    fn test_width_and_alignment() {
        assert_eq!(try_render("[{count:>3}]", &args()).unwrap(), "[  7]");
        assert_eq!(try_render("[{count:<3}]", &args()).unwrap(), "[7  ]");
        assert_eq!(try_render("[{count:3}]", &args()).unwrap(), "[  7]");
        assert_eq!(try_render("[{name:6}]", &args()).unwrap(), "[eth0  ]");
        assert_eq!(try_render("[{name:>6}]", &args()).unwrap(), "[  eth0]");
        assert_eq!(try_render("[{name:^8}]", &args()).unwrap(), "[  eth0  ]");
        assert_eq!(try_render("[{name:*<6}]", &args()).unwrap(), "[eth0**]");
        // Width never truncates.
        assert_eq!(try_render("[{name:2}]", &args()).unwrap(), "[eth0]");
    }

    #[test]
    fn test_precision_and_zero_padding() {
        assert_eq!(try_render("{usage:8.3f}", &args()).unwrap(), "  42.360");
        assert_eq!(try_render("{usage:f}", &args()).unwrap(), "42.360000");
        assert_eq!(try_render("{count:03}", &args()).unwrap(), "007");
        assert_eq!(
            try_render("{v:05.1f}", &[FormatArg::new("v", -2.5)]).unwrap(),
            "-02.5"
        );
        assert_eq!(try_render("{name:.3}", &args()).unwrap(), "eth");
    }

    #[test]
    fn test_strings_are_not_converted() {
        let args = [FormatArg::new("usage", " 5.25")];
        assert_eq!(try_render("{usage}%", &args).unwrap(), " 5.25%");
        assert!(matches!(
            try_render("{usage:.1f}", &args),
            Err(TemplateError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_type_mismatches() {
        assert!(matches!(
            try_render("{count:.2f}", &args()),
            Err(TemplateError::TypeMismatch { .. })
        ));
        assert!(matches!(
            try_render("{count:.2}", &args()),
            Err(TemplateError::TypeMismatch { .. })
        ));
        assert!(matches!(
            try_render("{usage:d}", &args()),
            Err(TemplateError::TypeMismatch { .. })
        ));
        assert!(matches!(
            try_render("{name:05}", &args()),
            Err(TemplateError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_repeated_and_unused_arguments() {
        assert_eq!(
            try_render("{name}/{name}", &args()).unwrap(),
            "eth0/eth0"
        );
        assert_eq!(try_render("static", &args()).unwrap(), "static");
    }

    #[test]
    fn test_escaped_braces() {
        assert_eq!(try_render("{{{count}}}", &args()).unwrap(), "{7}");
    }

    #[test]
    fn test_structural_errors() {
        assert_eq!(
            try_render("{missing}", &args()),
            Err(TemplateError::UnknownArgument {
                name: "missing".to_owned()
            })
        );
        assert_eq!(
            try_render("{}", &args()),
            Err(TemplateError::UnknownArgument {
                name: String::new()
            })
        );
        assert_eq!(
            try_render("a}b", &args()),
            Err(TemplateError::UnmatchedBrace { position: 1 })
        );
        assert_eq!(
            try_render("x {count", &args()),
            Err(TemplateError::UnclosedPlaceholder { position: 2 })
        );
        assert!(matches!(
            try_render("{count:>x}", &args()),
            Err(TemplateError::InvalidSpec { .. })
        ));
        assert!(matches!(
            try_render("{usage:.f}", &args()),
            Err(TemplateError::InvalidSpec { .. })
        ));
    }

    #[test]
    fn test_render_falls_back_to_template() {
        let logger = MemoryLogger::new();
        let template = "{icon} {missing}";
        assert_eq!(render(template, &args(), &logger), template);

        let errors = logger.messages(Level::Error);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("argument not found: 'missing'"));
        assert!(errors[0].contains("[1] usage (double) = 42.36"));
        assert!(errors[0].contains("[3] name (string) = 'eth0'"));
    }

    #[test]
    fn test_render_unicode_icon() {
        let logger = MemoryLogger::new();
        let args = [FormatArg::new("icon", "󰾆"), FormatArg::new("usage", "12.5")];
        assert_eq!(
            render("{icon}\u{2004}{usage}%", &args, &logger),
            "󰾆\u{2004}12.5%"
        );
        assert!(logger.is_empty());
    }
}
