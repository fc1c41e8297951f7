//! # Argument Source
//!
//! The dispatcher never looks at raw tokens itself. It hands them to an
//! [`ArgumentSource`], which turns them into a [`ParsedArgs`]: an ordered list of
//! positional tokens plus a bag of named options.
//!
//! The source is an injected collaborator. [`FlagParser`] is the stock
//! implementation: the usual minimist conventions, tokenized by clap.
//!
//! ```text
//! cly joke -v --category=pun extra      _ = ["joke", "extra"], category = "pun", v = true
//! cly echo -n5 --no-color -- -raw-      _ = ["echo", "-raw-"], n = 5, color = false
//! ```
//!
//! Anything implementing `Fn(&[String], &ParseOptions) -> ParsedArgs` is also an
//! argument source, which keeps tests free of real parsing when they don't need it.

use clap::{Arg, ArgAction, ArgMatches, Command};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

/// A single parsed value: an option value or a positional token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgValue {
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<ArgValue>),
}

impl ArgValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ArgValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ArgValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ArgValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgValue::Bool(b) => write!(f, "{}", b),
            ArgValue::Number(n) => write!(f, "{}", n),
            ArgValue::String(s) => f.write_str(s),
            ArgValue::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}", item)?;
                }
                Ok(())
            }
        }
    }
}

impl From<&str> for ArgValue {
    fn from(s: &str) -> Self {
        ArgValue::String(s.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(s: String) -> Self {
        ArgValue::String(s)
    }
}

impl From<bool> for ArgValue {
    fn from(b: bool) -> Self {
        ArgValue::Bool(b)
    }
}

impl From<f64> for ArgValue {
    fn from(n: f64) -> Self {
        ArgValue::Number(n)
    }
}

/// The structured result of parsing an argument vector.
///
/// Serializes the conventional way: positionals under `_`, tokens after `--`
/// under `--` (only when collected separately), options flattened alongside.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParsedArgs {
    #[serde(rename = "_")]
    pub positionals: Vec<ArgValue>,

    #[serde(rename = "--", skip_serializing_if = "Option::is_none")]
    pub double_dash: Option<Vec<String>>,

    #[serde(flatten)]
    pub options: BTreeMap<String, ArgValue>,
}

impl ParsedArgs {
    /// Builds a `ParsedArgs` holding only string positionals.
    pub fn from_positionals<I, S>(positionals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            positionals: positionals
                .into_iter()
                .map(|s| ArgValue::String(s.into()))
                .collect(),
            ..Self::default()
        }
    }

    pub fn with_option(mut self, name: &str, value: impl Into<ArgValue>) -> Self {
        self.options.insert(name.to_string(), value.into());
        self
    }

    /// The first positional token, which selects the command.
    pub fn command(&self) -> Option<String> {
        self.positional(0)
    }

    pub fn positional(&self, index: usize) -> Option<String> {
        self.positionals.get(index).map(|v| v.to_string())
    }

    pub fn positionals_as_strings(&self) -> Vec<String> {
        self.positionals.iter().map(|v| v.to_string()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.options.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(ArgValue::as_str)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(ArgValue::as_bool)
    }

    pub fn has(&self, name: &str) -> bool {
        self.options.contains_key(name)
    }
}

/// Options forwarded verbatim to the argument source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Names that are always flags and never consume the next token.
    pub boolean: Vec<String>,
    /// Treat every `--name` without `=` as a flag.
    pub all_booleans: bool,
    /// Names whose values are never converted to numbers. `_` covers positionals.
    pub string: Vec<String>,
    /// Name to alternate names. A value set under any name is set under all of them.
    pub alias: BTreeMap<String, Vec<String>>,
    /// Values for names that were not given.
    pub default: BTreeMap<String, ArgValue>,
    /// Stop option parsing at the first positional token.
    pub stop_early: bool,
    /// Collect tokens after `--` separately instead of appending them to positionals.
    pub double_dash: bool,
}

impl ParseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_boolean(mut self, name: &str) -> Self {
        self.boolean.push(name.to_string());
        self
    }

    pub fn with_all_booleans(mut self, all: bool) -> Self {
        self.all_booleans = all;
        self
    }

    pub fn with_string(mut self, name: &str) -> Self {
        self.string.push(name.to_string());
        self
    }

    pub fn with_alias<I, S>(mut self, name: &str, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.alias
            .entry(name.to_string())
            .or_default()
            .extend(aliases.into_iter().map(Into::into));
        self
    }

    pub fn with_default(mut self, name: &str, value: impl Into<ArgValue>) -> Self {
        self.default.insert(name.to_string(), value.into());
        self
    }

    pub fn with_stop_early(mut self, stop: bool) -> Self {
        self.stop_early = stop;
        self
    }

    pub fn with_double_dash(mut self, collect: bool) -> Self {
        self.double_dash = collect;
        self
    }
}

/// Turns raw tokens into [`ParsedArgs`].
pub trait ArgumentSource {
    fn parse(&self, raw: &[String], options: &ParseOptions) -> ParsedArgs;
}

impl<F> ArgumentSource for F
where
    F: Fn(&[String], &ParseOptions) -> ParsedArgs,
{
    fn parse(&self, raw: &[String], options: &ParseOptions) -> ParsedArgs {
        self(raw, options)
    }
}

/// The default, schema-less argument source.
///
/// Options are not declared up front, so each parse first scans the tokens for
/// flag names and declares a clap argument for every one it finds. Clap then
/// does the tokenizing.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlagParser;

impl ArgumentSource for FlagParser {
    fn parse(&self, raw: &[String], options: &ParseOptions) -> ParsedArgs {
        let (args, after_dash) = match raw.iter().position(|a| a == "--") {
            Some(i) => (&raw[..i], &raw[i + 1..]),
            None => (raw, &raw[raw.len()..]),
        };

        let mut schema = Schema::new(options);
        schema.discover(args);
        let tokens = schema.normalize(args);

        let (mut out, mut positionals) = match schema.command().try_get_matches_from(&tokens) {
            Ok(matches) => schema.collect(&matches),
            Err(err) => {
                warn!(kind = ?err.kind(), "unparseable flags, keeping every token as a positional");
                let positionals = args.iter().map(|a| schema.coerce(POSITIONALS, a)).collect();
                (BTreeMap::new(), positionals)
            }
        };
        schema.fill_defaults(&mut out);

        let double_dash = if options.double_dash {
            Some(after_dash.to_vec())
        } else {
            positionals.extend(after_dash.iter().map(|a| ArgValue::String(a.clone())));
            None
        };

        ParsedArgs {
            positionals,
            double_dash,
            options: out,
        }
    }
}

const POSITIONALS: &str = "_";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    /// Never takes a value: declared booleans and letters inside a short group.
    Switch,
    /// Takes an attached value, or the next token when it is not a flag.
    Value,
}

/// One option and all the names it answers to.
#[derive(Debug, Default)]
struct Key {
    names: Vec<String>,
    boolean: bool,
    string: bool,
    takes_value: bool,
}

impl Key {
    fn kind(&self) -> Kind {
        if self.boolean {
            Kind::Switch
        } else if self.string || self.takes_value {
            Kind::Value
        } else {
            Kind::Switch
        }
    }

    fn arg(&self, id: String, all_booleans: bool) -> Arg {
        let mut arg = Arg::new(id)
            .long(self.names[0].clone())
            .aliases(self.names[1..].to_vec());

        let mut shorts = self.names.iter().filter_map(|name| short_name(name));
        let has_short = match shorts.next() {
            Some(short) => {
                arg = arg.short(short).short_aliases(shorts);
                true
            }
            None => false,
        };

        match self.kind() {
            Kind::Switch => arg.action(ArgAction::Count),
            Kind::Value => arg
                .action(ArgAction::Append)
                .num_args(0..=1)
                .default_missing_value(if self.string { "" } else { "true" })
                // `all_booleans` only stops long names from taking the next token.
                .require_equals(all_booleans && !self.string && !has_short),
        }
    }
}

/// The clap command for one parse, derived from `ParseOptions` and the tokens.
struct Schema<'a> {
    options: &'a ParseOptions,
    keys: Vec<Key>,
    index: BTreeMap<String, usize>,
    /// Names seen as `--no-<name>`.
    negated: Vec<String>,
}

impl<'a> Schema<'a> {
    fn new(options: &'a ParseOptions) -> Self {
        let mut schema = Self {
            options,
            keys: Vec::new(),
            index: BTreeMap::new(),
            negated: Vec::new(),
        };

        for (name, alternates) in &options.alias {
            let Some(key) = schema.intern(name) else {
                continue;
            };
            for alternate in alternates {
                if is_flag_name(alternate) && !schema.index.contains_key(alternate) {
                    schema.index.insert(alternate.clone(), key);
                    schema.keys[key].names.push(alternate.clone());
                }
            }
        }
        for name in &options.boolean {
            if let Some(key) = schema.intern(name) {
                schema.keys[key].boolean = true;
            }
        }
        for name in options.string.iter().filter(|n| *n != POSITIONALS) {
            if let Some(key) = schema.intern(name) {
                schema.keys[key].string = true;
            }
        }

        schema
    }

    fn intern(&mut self, name: &str) -> Option<usize> {
        if !is_flag_name(name) {
            return None;
        }
        if let Some(&key) = self.index.get(name) {
            return Some(key);
        }
        self.keys.push(Key {
            names: vec![name.to_string()],
            ..Key::default()
        });
        let key = self.keys.len() - 1;
        self.index.insert(name.to_string(), key);
        Some(key)
    }

    fn mark_takes_value(&mut self, name: &str) {
        if let Some(key) = self.intern(name) {
            self.keys[key].takes_value = true;
        }
    }

    fn negate(&mut self, name: &str) {
        if !self.negated.iter().any(|n| n == name) {
            self.negated.push(name.to_string());
        }
    }

    /// Declares every flag name found in `args`.
    fn discover(&mut self, args: &[String]) {
        for arg in args {
            if let Some(body) = arg.strip_prefix("--") {
                match body.split_once('=') {
                    Some((name, _)) => self.mark_takes_value(name),
                    None => match body.strip_prefix("no-") {
                        Some(name) if is_flag_name(name) => self.negate(name),
                        _ => self.mark_takes_value(body),
                    },
                }
            } else if let Some(body) = arg.strip_prefix('-') {
                // In `-abc` only the last letter can take a value.
                let letters: Vec<char> = body
                    .chars()
                    .take_while(|c| c.is_ascii_alphabetic())
                    .collect();
                if let Some((last, rest)) = letters.split_last() {
                    for letter in rest {
                        self.intern(&letter.to_string());
                    }
                    self.mark_takes_value(&last.to_string());
                }
            }
        }
    }

    fn is_switch(&self, name: &str) -> bool {
        self.index
            .get(name)
            .is_some_and(|&key| self.keys[key].kind() == Kind::Switch)
    }

    /// Rewrites `--flag=value` for switches, which clap would reject.
    fn normalize(&mut self, args: &[String]) -> Vec<String> {
        let mut tokens = Vec::with_capacity(args.len());
        for arg in args {
            match arg.strip_prefix("--").and_then(|b| b.split_once('=')) {
                Some((name, "false")) if self.is_switch(name) => {
                    self.negate(name);
                    tokens.push(format!("--no-{name}"));
                }
                Some((name, _)) if self.is_switch(name) => tokens.push(format!("--{name}")),
                _ => tokens.push(arg.clone()),
            }
        }
        tokens
    }

    /// `--no-<name>` is only a negation when `no-<name>` is not an option itself.
    fn negation_declared(&self, name: &str) -> bool {
        !self.index.contains_key(&format!("no-{name}"))
    }

    fn command(&self) -> Command {
        let mut positionals = Arg::new(POSITIONALS)
            .action(ArgAction::Append)
            .num_args(1..)
            .allow_negative_numbers(true);
        if self.options.stop_early {
            positionals = positionals.trailing_var_arg(true);
        }

        let mut command = Command::new("cly")
            .no_binary_name(true)
            .disable_help_flag(true)
            .disable_version_flag(true)
            .arg(positionals);

        for (i, key) in self.keys.iter().enumerate() {
            command = command.arg(key.arg(key_id(i), self.options.all_booleans));
        }
        for (i, name) in self.negated.iter().enumerate() {
            if self.negation_declared(name) {
                command = command.arg(
                    Arg::new(negation_id(i))
                        .long(format!("no-{name}"))
                        .action(ArgAction::Count),
                );
            }
        }

        command
    }

    fn collect(&self, matches: &ArgMatches) -> (BTreeMap<String, ArgValue>, Vec<ArgValue>) {
        let mut out = BTreeMap::new();

        for (i, key) in self.keys.iter().enumerate() {
            let id = key_id(i);
            let value = match key.kind() {
                Kind::Switch => (matches.get_count(&id) > 0).then_some(ArgValue::Bool(true)),
                Kind::Value => matches.get_many::<String>(&id).map(|values| {
                    let mut values: Vec<ArgValue> =
                        values.map(|v| self.coerce(&key.names[0], v)).collect();
                    if values.len() == 1 {
                        values.remove(0)
                    } else {
                        ArgValue::List(values)
                    }
                }),
            };
            if let Some(value) = value {
                self.set(&mut out, &key.names[0], value);
            }
        }

        // Negation wins over the positive form, whatever the order.
        for (i, name) in self.negated.iter().enumerate() {
            if self.negation_declared(name) && matches.get_count(&negation_id(i)) > 0 {
                self.set(&mut out, name, ArgValue::Bool(false));
            }
        }

        let positionals = matches
            .get_many::<String>(POSITIONALS)
            .into_iter()
            .flatten()
            .map(|v| self.coerce(POSITIONALS, v))
            .collect();

        (out, positionals)
    }

    fn fill_defaults(&self, out: &mut BTreeMap<String, ArgValue>) {
        for name in &self.options.boolean {
            if !out.contains_key(name) {
                let value = self
                    .options
                    .default
                    .get(name)
                    .cloned()
                    .unwrap_or(ArgValue::Bool(false));
                self.set(out, name, value);
            }
        }
        for (name, value) in &self.options.default {
            if !out.contains_key(name) {
                self.set(out, name, value.clone());
            }
        }
    }

    fn is_string(&self, name: &str) -> bool {
        if name == POSITIONALS {
            return self.options.string.iter().any(|n| n == POSITIONALS);
        }
        self.index.get(name).is_some_and(|&key| self.keys[key].string)
    }

    fn coerce(&self, name: &str, raw: &str) -> ArgValue {
        if self.is_string(name) {
            return ArgValue::String(raw.to_string());
        }
        match raw {
            "true" if name != POSITIONALS => ArgValue::Bool(true),
            "false" if name != POSITIONALS => ArgValue::Bool(false),
            _ => parse_number(raw)
                .map_or_else(|| ArgValue::String(raw.to_string()), ArgValue::Number),
        }
    }

    /// Sets `value` under `name` and every alias of it.
    fn set(&self, out: &mut BTreeMap<String, ArgValue>, name: &str, value: ArgValue) {
        match self.index.get(name) {
            Some(&key) => {
                for alias in &self.keys[key].names {
                    out.insert(alias.clone(), value.clone());
                }
            }
            None => {
                out.insert(name.to_string(), value);
            }
        }
    }
}

fn key_id(i: usize) -> String {
    format!("opt{i}")
}

fn negation_id(i: usize) -> String {
    format!("neg{i}")
}

/// Names clap can take as a long flag.
fn is_flag_name(name: &str) -> bool {
    !name.is_empty() && !name.starts_with('-') && !name.contains('=')
}

fn short_name(name: &str) -> Option<char> {
    let mut chars = name.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c != '-' => Some(c),
        _ => None,
    }
}

/// Decimal (optionally signed, fractional, exponent) or `0x` hex.
fn parse_number(s: &str) -> Option<f64> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        if hex.is_empty() || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        return i64::from_str_radix(hex, 16).ok().map(|n| n as f64);
    }
    let numeric = !s.is_empty()
        && s.chars().any(|c| c.is_ascii_digit())
        && s
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | '+' | '-' | 'e' | 'E'));
    if !numeric {
        return None;
    }
    s.parse::<f64>().ok()
}
