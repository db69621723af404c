//! Requirements - boolean expressions over powers and tokens that gate
//! traversal of a transition.
//!
//! Requirements are usually written in a small expression language and
//! compiled with [`Requirement::parse`]:
//!
//! | Syntax      | Meaning                                   |
//! |-------------|-------------------------------------------|
//! | `name`      | the power `name` is held                  |
//! | `'any text'`| the power `any text` is held              |
//! | `name * 3`  | at least 3 tokens of type `name` are held |
//! | `a & b`     | both                                      |
//! | `a \| b`    | either                                    |
//! | `-a`        | not                                       |
//! | `X` / `O`   | never / always satisfied                  |
//!
//! Precedence from loosest to tightest is `|`, `&`, unary `-`, `*`.
//! Chains of `|` or `&` are flattened into a single n-ary node.

mod parser;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::effects::Grant;
use crate::error::{ParseError, RulesError, RulesResult};
use crate::state::{Power, State, Token};

/// A precondition for traversing a transition.
///
/// Requirements are immutable once built and compare structurally.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Requirement {
    /// Always satisfied (`O`). The requirement of a transition with no
    /// explicit requirement.
    #[default]
    Nothing,
    /// Never satisfied (`X`).
    Impossible,
    /// The named power must be held.
    Power { power: Power },
    /// At least `count` tokens of the given type must be held.
    Tokens { token: Token, count: u32 },
    /// Satisfied when any sub-requirement is.
    Any { subs: Vec<Requirement> },
    /// Satisfied when every sub-requirement is.
    All { subs: Vec<Requirement> },
    /// Satisfied when the sub-requirement is not.
    Not { sub: Box<Requirement> },
}

impl Requirement {
    /// Compile a requirement from its textual form.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        parser::parse(text)
    }

    pub fn power(power: impl Into<Power>) -> Self {
        Requirement::Power {
            power: power.into(),
        }
    }

    pub fn tokens(token: impl Into<Token>, count: u32) -> Self {
        Requirement::Tokens {
            token: token.into(),
            count,
        }
    }

    pub fn any(subs: impl IntoIterator<Item = Requirement>) -> Self {
        Requirement::Any {
            subs: subs.into_iter().collect(),
        }
    }

    pub fn all(subs: impl IntoIterator<Item = Requirement>) -> Self {
        Requirement::All {
            subs: subs.into_iter().collect(),
        }
    }

    /// Negate a requirement.
    #[allow(clippy::should_implement_trait)]
    pub fn not(sub: Requirement) -> Self {
        Requirement::Not { sub: Box::new(sub) }
    }

    /// Whether this requirement is the trivial always-satisfied one.
    pub fn is_nothing(&self) -> bool {
        matches!(self, Requirement::Nothing)
    }

    /// Evaluate against a concrete state.
    ///
    /// A negated token requirement holds when strictly fewer than `count`
    /// tokens are held.
    pub fn evaluate(&self, state: &State) -> bool {
        match self {
            Requirement::Nothing => true,
            Requirement::Impossible => false,
            Requirement::Power { power } => state.has_power(power),
            Requirement::Tokens { token, count } => state.token_count(token) >= i64::from(*count),
            Requirement::Any { subs } => subs.iter().any(|sub| sub.evaluate(state)),
            Requirement::All { subs } => subs.iter().all(|sub| sub.evaluate(state)),
            Requirement::Not { sub } => !sub.evaluate(state),
        }
    }

    /// Collect the powers and tokens named by this requirement into a list
    /// suitable for the `gain` slot of transition effects.
    ///
    /// Only power atoms, token atoms, and `|` are allowed; anything else is
    /// a [`RulesError::NotAGainList`].
    pub fn as_gain_list(&self) -> RulesResult<Vec<Grant>> {
        let mut grants = Vec::new();
        self.collect_grants(&mut grants)?;
        Ok(grants)
    }

    fn collect_grants(&self, out: &mut Vec<Grant>) -> RulesResult<()> {
        match self {
            Requirement::Power { power } => out.push(Grant::Power(power.clone())),
            Requirement::Tokens { token, count } => {
                out.push(Grant::Tokens(token.clone(), i64::from(*count)))
            }
            Requirement::Any { subs } => {
                for sub in subs {
                    sub.collect_grants(out)?;
                }
            }
            other => {
                return Err(RulesError::NotAGainList {
                    found: other.kind_name(),
                })
            }
        }
        Ok(())
    }

    /// Short description of the node kind, for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Requirement::Nothing => "an always-satisfied requirement",
            Requirement::Impossible => "an impossible requirement",
            Requirement::Power { .. } => "a power requirement",
            Requirement::Tokens { .. } => "a token requirement",
            Requirement::Any { .. } => "a disjunction",
            Requirement::All { .. } => "a conjunction",
            Requirement::Not { .. } => "a negation",
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Requirement::Any { .. } => 1,
            Requirement::All { .. } => 2,
            Requirement::Not { .. } => 3,
            _ => 4,
        }
    }

    fn fmt_child(&self, child: &Requirement, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if child.precedence() <= self.precedence() && child.precedence() < 3 {
            write!(f, "({})", child)
        } else {
            write!(f, "{}", child)
        }
    }
}

/// Whether a name can be written without quotes.
fn is_bare_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    name != "X" && name != "O" && chars.all(|c| c.is_alphanumeric() || c == '_')
}

fn write_name(name: &str, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if is_bare_name(name) {
        return f.write_str(name);
    }
    f.write_str("'")?;
    for c in name.chars() {
        match c {
            '\\' => f.write_str("\\\\")?,
            '\'' => f.write_str("\\'")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            c => write!(f, "{}", c)?,
        }
    }
    f.write_str("'")
}

/// Renders the requirement back into the expression language.
///
/// Trees shaped like the parser's output re-parse to an equal tree. Other
/// shapes re-parse to an equivalent one: a single-child `Any` or `All` is
/// written as its child, a chain nested in a chain of the same kind comes
/// back flattened, and an empty `Any` or `All` comes back as `X` or `O`.
impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Requirement::Nothing => f.write_str("O"),
            Requirement::Impossible => f.write_str("X"),
            Requirement::Power { power } => write_name(power, f),
            Requirement::Tokens { token, count } => {
                write_name(token, f)?;
                write!(f, "*{}", count)
            }
            Requirement::Any { subs } | Requirement::All { subs } if subs.is_empty() => {
                // Empty disjunction never holds, empty conjunction always does
                f.write_str(if matches!(self, Requirement::Any { .. }) {
                    "X"
                } else {
                    "O"
                })
            }
            Requirement::Any { subs } | Requirement::All { subs } => {
                let op = if matches!(self, Requirement::Any { .. }) {
                    " | "
                } else {
                    " & "
                };
                for (i, sub) in subs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(op)?;
                    }
                    self.fmt_child(sub, f)?;
                }
                Ok(())
            }
            Requirement::Not { sub } => {
                f.write_str("-")?;
                self.fmt_child(sub, f)
            }
        }
    }
}

impl FromStr for Requirement {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Requirement::parse(s)
    }
}
