// Threshold rules - ordered, first match wins
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

const DEFAULT_COLOR: &str = "#888";
const NEW_RULE_COLOR: &str = "#ff0000";

/// Opaque display color, passed through to the drawing surface unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColorToken(String);

impl ColorToken {
    pub fn new(color: impl Into<String>) -> Self {
        Self(color.into())
    }

    /// Color used when no rule matches.
    pub fn default_color() -> Self {
        Self(DEFAULT_COLOR.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ColorToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "=")]
    Eq,
}

impl Operator {
    /// NaN on either side never matches.
    pub fn evaluate(self, value: f64, threshold: f64) -> bool {
        match self {
            Operator::Lt => value < threshold,
            Operator::Gt => value > threshold,
            Operator::Le => value <= threshold,
            Operator::Ge => value >= threshold,
            Operator::Eq => value == threshold,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub operator: Operator,
    /// Threshold as typed by the user; parsed on every classification.
    pub value: String,
    pub color: ColorToken,
}

impl Rule {
    pub fn new(operator: Operator, value: impl Into<String>, color: ColorToken) -> Self {
        Self {
            operator,
            value: value.into(),
            color,
        }
    }

    /// `None` when the text is empty or not a number.
    pub fn threshold(&self) -> Option<f64> {
        let text = self.value.trim();
        if text.is_empty() {
            return None;
        }
        text.parse::<f64>().ok()
    }
}

/// Return the color of the first rule that matches `value`, or the default.
pub fn classify(value: f64, rules: &[Rule]) -> ColorToken {
    for (index, rule) in rules.iter().enumerate() {
        let Some(threshold) = rule.threshold() else {
            tracing::debug!(index, value = %rule.value, "Skipping rule with unparseable threshold");
            continue;
        };
        if rule.operator.evaluate(value, threshold) {
            return rule.color.clone();
        }
    }
    ColorToken::default_color()
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no rule at index {index} (rule count {len})")]
pub struct RuleIndexError {
    pub index: usize,
    pub len: usize,
}

/// Partial update from the rule editor.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RuleEdit {
    pub operator: Option<Operator>,
    pub value: Option<String>,
    pub color: Option<ColorToken>,
}

/// Ordered rule list as edited by the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Append a blank `<` rule, matching a freshly added editor row.
    pub fn push_default(&mut self) {
        self.rules
            .push(Rule::new(Operator::Lt, "", ColorToken::new(NEW_RULE_COLOR)));
    }

    pub fn update(&mut self, index: usize, edit: RuleEdit) -> Result<(), RuleIndexError> {
        let len = self.rules.len();
        let rule = self
            .rules
            .get_mut(index)
            .ok_or(RuleIndexError { index, len })?;

        if let Some(operator) = edit.operator {
            rule.operator = operator;
        }
        if let Some(value) = edit.value {
            rule.value = value;
        }
        if let Some(color) = edit.color {
            rule.color = color;
        }
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Result<Rule, RuleIndexError> {
        if index >= self.rules.len() {
            return Err(RuleIndexError {
                index,
                len: self.rules.len(),
            });
        }
        Ok(self.rules.remove(index))
    }

    pub fn replace(&mut self, rules: Vec<Rule>) {
        self.rules = rules;
    }
}

impl Default for RuleSet {
    /// Cold / mild / warm temperature bands.
    fn default() -> Self {
        Self::new(vec![
            Rule::new(Operator::Lt, "10", ColorToken::new("#ff0000")),
            Rule::new(Operator::Lt, "25", ColorToken::new("#00ff00")),
            Rule::new(Operator::Ge, "25", ColorToken::new("#0000ff")),
        ])
    }
}
